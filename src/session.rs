use thiserror::Error;

use crate::model::{now_millis, Conversation, ConversationSummary, FeedbackTag, Message};
use crate::storage::ConversationStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Conversation not found: {0}")]
    NotFound(String),
}

/// What a confirmed or declined deletion left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The confirmation gate said no, or the id was unknown
    Kept,
    /// Removed a conversation other than the active one
    Removed,
    /// Removed the active conversation; `next` is now active and must be replayed
    Replaced { next: String, created: bool },
}

type Clock = Box<dyn Fn() -> i64 + Send>;

/// Chat session state: the conversation store plus the active-conversation pointer.
///
/// Every mutation goes through the store, which persists after each one.
pub struct ChatSession {
    store: ConversationStore,
    active_id: Option<String>,
    clock: Clock,
    last_issued: i64,
}

impl ChatSession {
    pub fn new(store: ConversationStore) -> Self {
        Self::with_clock(store, now_millis)
    }

    pub fn with_clock(store: ConversationStore, clock: impl Fn() -> i64 + Send + 'static) -> Self {
        Self {
            store,
            active_id: None,
            clock: Box::new(clock),
            last_issued: i64::MIN,
        }
    }

    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    #[cfg(test)]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_id.as_deref().and_then(|id| self.store.get(id))
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.store.get(id)
    }

    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.store.list_ordered_by_recency(self.active_id.as_deref())
    }

    /// Pick the conversation to show at startup, creating one if the store is empty
    pub fn restore(&mut self) -> String {
        match self.store.most_recent() {
            Some(id) => {
                self.select_conversation(&id);
                id
            }
            None => self.create_conversation(),
        }
    }

    /// Return the active id, creating a conversation first if there is none
    pub fn ensure_active(&mut self) -> String {
        match &self.active_id {
            Some(id) if self.store.contains(id) => id.clone(),
            _ => self.create_conversation(),
        }
    }

    /// Create an empty conversation, make it active and return its id
    pub fn create_conversation(&mut self) -> String {
        let timestamp = self.now();
        let id = self.allocate_id(timestamp);
        self.store.insert(id.clone(), Conversation::new(timestamp));
        tracing::debug!(id = %id, "Created conversation");
        self.active_id = Some(id.clone());
        id
    }

    /// Make `id` active and return its messages for replay.
    ///
    /// Unknown ids are ignored and yield `None`.
    pub fn select_conversation(&mut self, id: &str) -> Option<Vec<Message>> {
        if !self.store.contains(id) {
            return None;
        }
        self.active_id = Some(id.to_string());
        self.derive_title(id);
        self.store.get(id).map(|c| c.messages.clone())
    }

    /// Delete `id` if `confirm` approves it.
    ///
    /// Deleting the active conversation selects the most recent remaining one,
    /// or creates a fresh conversation when none remain.
    pub fn delete_conversation(
        &mut self,
        id: &str,
        confirm: impl FnOnce(&Conversation) -> bool,
    ) -> DeleteOutcome {
        let Some(conversation) = self.store.get(id) else {
            return DeleteOutcome::Kept;
        };
        if !confirm(conversation) {
            return DeleteOutcome::Kept;
        }

        self.store.remove(id);
        tracing::debug!(id = %id, "Deleted conversation");

        if self.active_id.as_deref() != Some(id) {
            return DeleteOutcome::Removed;
        }

        self.active_id = None;
        match self.store.most_recent() {
            Some(next) => {
                self.select_conversation(&next);
                DeleteOutcome::Replaced { next, created: false }
            }
            None => DeleteOutcome::Replaced {
                next: self.create_conversation(),
                created: true,
            },
        }
    }

    /// Append a message to `id`, persist, and attempt title derivation
    pub fn record_message(&mut self, id: &str, message: Message) -> Result<(), SessionError> {
        self.store
            .update(id, |conversation| {
                conversation.push(message);
                conversation.derive_title();
            })
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Attach `tag` to the latest assistant message in `id` whose text equals `responded_text`
    pub fn record_feedback(
        &mut self,
        id: &str,
        tag: FeedbackTag,
        responded_text: &str,
    ) -> Result<bool, SessionError> {
        self.store
            .update(id, |conversation| conversation.tag_assistant_message(responded_text, tag))
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Most recent user message of `id`, or an empty string
    pub fn last_user_query(&self, id: &str) -> String {
        self.store
            .get(id)
            .and_then(|c| c.last_user_text())
            .unwrap_or_default()
            .to_string()
    }

    fn derive_title(&mut self, id: &str) {
        let needs_title = self
            .store
            .get(id)
            .is_some_and(|c| c.has_sentinel_title() && c.messages.iter().any(|m| m.is_user));
        if needs_title {
            self.store.update(id, |c| c.derive_title());
        }
    }

    fn allocate_id(&mut self, timestamp: i64) -> String {
        let mut millis = timestamp.max(self.last_issued.saturating_add(1));
        while self.store.contains(&format!("chat_{}", millis)) {
            millis += 1;
        }
        self.last_issued = millis;
        format!("chat_{}", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SENTINEL_TITLE;
    use crate::storage::MemorySlot;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn session_at(start: i64) -> (ChatSession, Arc<AtomicI64>) {
        let clock = Arc::new(AtomicI64::new(start));
        let handle = clock.clone();
        let session = ChatSession::with_clock(
            ConversationStore::open(MemorySlot::default()),
            move || handle.load(Ordering::SeqCst),
        );
        (session, clock)
    }

    #[test]
    fn test_create_on_empty_store() {
        let (mut session, _) = session_at(1_000);
        let id = session.create_conversation();

        assert_eq!(session.store().len(), 1);
        assert_eq!(session.active_id(), Some(id.as_str()));
        let conversation = session.active().unwrap();
        assert_eq!(conversation.title, SENTINEL_TITLE);
        assert!(conversation.messages.is_empty());
        assert_eq!(conversation.created, 1_000);
        assert_eq!(conversation.last_updated, 1_000);
    }

    #[test]
    fn test_ids_are_unique_when_clock_stalls() {
        let (mut session, _) = session_at(1_000);
        let first = session.create_conversation();
        let second = session.create_conversation();
        let third = session.create_conversation();

        assert_eq!(first, "chat_1000");
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(session.store().len(), 3);
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let (mut session, _) = session_at(1_000);
        let id = session.create_conversation();
        assert_eq!(session.select_conversation("chat_missing"), None);
        assert_eq!(session.active_id(), Some(id.as_str()));
    }

    #[test]
    fn test_select_returns_messages_in_order() {
        let (mut session, clock) = session_at(1_000);
        let first = session.create_conversation();
        session.record_message(&first, Message::user("one", 1_001)).unwrap();
        session.record_message(&first, Message::assistant("two", 1_002)).unwrap();
        clock.store(2_000, Ordering::SeqCst);
        session.create_conversation();

        let replay = session.select_conversation(&first).unwrap();
        let texts: Vec<&str> = replay.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(session.active_id(), Some(first.as_str()));
    }

    #[test]
    fn test_reply_scenario() {
        let (mut session, _) = session_at(500);
        let id = session.create_conversation();
        session.record_message(&id, Message::user("Hi", 1_000)).unwrap();
        session.record_message(&id, Message::assistant("Hello", 1_500)).unwrap();

        let conversation = session.conversation(&id).unwrap();
        assert_eq!(
            conversation.messages,
            vec![Message::user("Hi", 1_000), Message::assistant("Hello", 1_500)]
        );
        assert_eq!(conversation.last_updated, 1_500);
        assert_eq!(conversation.title, "Hi");
    }

    #[test]
    fn test_record_message_appends_last_and_advances_time() {
        let (mut session, _) = session_at(0);
        let id = session.create_conversation();
        let mut previous = session.conversation(&id).unwrap().last_updated;
        for (i, ts) in [10, 20, 20, 35].into_iter().enumerate() {
            let message = Message::user(format!("msg {}", i), ts);
            session.record_message(&id, message.clone()).unwrap();
            let conversation = session.conversation(&id).unwrap();
            assert!(conversation.last_updated >= previous);
            assert_eq!(conversation.messages.last(), Some(&message));
            previous = conversation.last_updated;
        }
    }

    #[test]
    fn test_long_title_is_truncated_once() {
        let (mut session, _) = session_at(0);
        let id = session.create_conversation();
        let text = "I want to start running three times a week";
        session.record_message(&id, Message::user(text, 1)).unwrap();
        session.record_message(&id, Message::user("Another question", 2)).unwrap();

        let title = &session.conversation(&id).unwrap().title;
        assert_eq!(title, &format!("{}...", &text[..30]));
    }

    #[test]
    fn test_record_message_unknown_id() {
        let (mut session, _) = session_at(0);
        assert_eq!(
            session.record_message("chat_x", Message::user("Hi", 1)),
            Err(SessionError::NotFound("chat_x".to_string()))
        );
    }

    #[test]
    fn test_delete_declined_keeps_conversation() {
        let (mut session, _) = session_at(0);
        let id = session.create_conversation();
        assert_eq!(session.delete_conversation(&id, |_| false), DeleteOutcome::Kept);
        assert!(session.store().contains(&id));
        assert_eq!(session.active_id(), Some(id.as_str()));
    }

    #[test]
    fn test_delete_only_conversation_creates_replacement() {
        let (mut session, clock) = session_at(1_000);
        let id = session.create_conversation();
        clock.store(2_000, Ordering::SeqCst);

        let outcome = session.delete_conversation(&id, |_| true);
        let DeleteOutcome::Replaced { next, created } = outcome else {
            panic!("expected replacement, got {:?}", outcome);
        };
        assert!(created);
        assert_ne!(next, id);
        assert!(!session.store().contains(&id));
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.active_id(), Some(next.as_str()));
    }

    #[test]
    fn test_delete_active_selects_most_recent_remaining() {
        let (mut session, clock) = session_at(1_000);
        let older = session.create_conversation();
        clock.store(2_000, Ordering::SeqCst);
        let newer = session.create_conversation();
        clock.store(3_000, Ordering::SeqCst);
        let current = session.create_conversation();
        session.record_message(&older, Message::user("bump", 4_000)).unwrap();

        let outcome = session.delete_conversation(&current, |_| true);
        assert_eq!(
            outcome,
            DeleteOutcome::Replaced { next: older.clone(), created: false }
        );
        assert_eq!(session.active_id(), Some(older.as_str()));
        assert!(session.store().contains(&newer));
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let (mut session, clock) = session_at(1_000);
        let first = session.create_conversation();
        clock.store(2_000, Ordering::SeqCst);
        let second = session.create_conversation();

        assert_eq!(session.delete_conversation(&first, |_| true), DeleteOutcome::Removed);
        assert_eq!(session.active_id(), Some(second.as_str()));
    }

    #[test]
    fn test_active_always_valid_across_create_delete_sequences() {
        let (mut session, clock) = session_at(0);
        let mut tick = 0;
        for step in 0..40 {
            tick += 7;
            clock.store(tick, Ordering::SeqCst);
            if step % 3 == 2 {
                let victim = session
                    .summaries()
                    .get(step % 2)
                    .map(|s| s.id.clone())
                    .unwrap_or_else(|| session.ensure_active());
                session.delete_conversation(&victim, |_| true);
            } else {
                session.create_conversation();
            }

            let active = session.active_id().expect("active id set").to_string();
            assert!(session.store().contains(&active));
        }
    }

    #[test]
    fn test_restore_prefers_most_recent() {
        let (mut session, clock) = session_at(1_000);
        let first = session.create_conversation();
        clock.store(2_000, Ordering::SeqCst);
        session.create_conversation();
        session.record_message(&first, Message::user("latest", 3_000)).unwrap();

        assert_eq!(session.restore(), first);
        assert_eq!(session.active_id(), Some(first.as_str()));
    }

    #[test]
    fn test_restore_on_empty_store_creates() {
        let (mut session, _) = session_at(1_000);
        let id = session.restore();
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.active_id(), Some(id.as_str()));
    }

    #[test]
    fn test_feedback_and_last_query() {
        let (mut session, _) = session_at(0);
        let id = session.create_conversation();
        assert_eq!(session.last_user_query(&id), "");
        session.record_message(&id, Message::user("Protein?", 1)).unwrap();
        session.record_message(&id, Message::assistant("Eat beans", 2)).unwrap();

        assert_eq!(session.last_user_query(&id), "Protein?");
        assert_eq!(session.record_feedback(&id, FeedbackTag::Helpful, "Eat beans"), Ok(true));
        assert_eq!(
            session.conversation(&id).unwrap().messages[1].feedback,
            Some(FeedbackTag::Helpful)
        );
        assert_eq!(session.record_feedback(&id, FeedbackTag::Helpful, "nope"), Ok(false));
    }
}
