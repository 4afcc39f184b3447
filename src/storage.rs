use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{Conversation, ConversationSummary};

/// A single named slot of durable key-value storage
pub trait StorageSlot {
    /// Raw slot contents, or `None` if the slot was never written or can't be read
    fn read(&self) -> Option<String>;

    fn write(&mut self, contents: &str) -> Result<()>;
}

/// Slot backed by `<dir>/<name>.json`
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageSlot for FileSlot {
    fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read chat storage");
                None
            }
        }
    }

    fn write(&mut self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }

        // Write beside the target first so a crash never leaves half a file behind
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).context("Failed to write chat storage")?;
        fs::rename(&tmp_path, &self.path).context("Failed to replace chat storage")?;
        Ok(())
    }
}

/// Slot kept in memory only
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemorySlot {
    contents: Option<String>,
}

#[cfg(test)]
impl MemorySlot {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }
}

#[cfg(test)]
impl StorageSlot for MemorySlot {
    fn read(&self) -> Option<String> {
        self.contents.clone()
    }

    fn write(&mut self, contents: &str) -> Result<()> {
        self.contents = Some(contents.to_string());
        Ok(())
    }
}

/// Owns every conversation and mirrors them into a storage slot
pub struct ConversationStore {
    slot: Box<dyn StorageSlot + Send>,
    conversations: BTreeMap<String, Conversation>,
}

impl ConversationStore {
    /// Open the store, reading whatever the slot currently holds
    pub fn open(slot: impl StorageSlot + Send + 'static) -> Self {
        let mut store = Self {
            slot: Box::new(slot),
            conversations: BTreeMap::new(),
        };
        store.load();
        store
    }

    /// Replace the in-memory mapping with the persisted one.
    ///
    /// Absent or malformed data yields an empty mapping.
    pub fn load(&mut self) {
        self.conversations = match self.slot.read() {
            Some(content) => match serde_json::from_str(&content) {
                Ok(conversations) => conversations,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored chats are malformed, starting empty");
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };
        tracing::debug!(count = self.conversations.len(), "Loaded conversations");
    }

    /// Write the full mapping back to the slot. Failures are logged and otherwise ignored.
    pub fn save(&mut self) {
        if let Err(e) = self.try_save() {
            tracing::warn!(error = %e, "Failed to save chats");
        }
    }

    fn try_save(&mut self) -> Result<()> {
        let content = serde_json::to_string(&self.conversations)
            .context("Failed to serialize chats")?;
        self.slot.write(&content)
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Insert a conversation and persist
    pub fn insert(&mut self, id: String, conversation: Conversation) {
        self.conversations.insert(id, conversation);
        self.save();
    }

    /// Remove a conversation and persist
    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        let removed = self.conversations.remove(id);
        if removed.is_some() {
            self.save();
        }
        removed
    }

    /// Apply `f` to a conversation and persist. Returns `None` if `id` is unknown.
    pub fn update<T>(&mut self, id: &str, f: impl FnOnce(&mut Conversation) -> T) -> Option<T> {
        let conversation = self.conversations.get_mut(id)?;
        let result = f(conversation);
        self.save();
        Some(result)
    }

    /// Summaries sorted by `last_updated`, newest first.
    ///
    /// Ties keep id order, so the listing is stable between calls.
    pub fn list_ordered_by_recency(&self, active_id: Option<&str>) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .map(|(id, conversation)| ConversationSummary {
                id: id.clone(),
                title: conversation.title.clone(),
                active: active_id == Some(id.as_str()),
                last_updated: conversation.last_updated,
                message_count: conversation.messages.len(),
            })
            .collect();
        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        summaries
    }

    /// Id of the conversation updated most recently
    pub fn most_recent(&self) -> Option<String> {
        self.conversations
            .iter()
            .rev()
            .max_by_key(|(_, conversation)| conversation.last_updated)
            .map(|(id, _)| id.clone())
    }
}
