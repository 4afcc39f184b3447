use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// Placeholder title carried by a conversation until it is derived
pub const SENTINEL_TITLE: &str = "New Chat";

/// Derived titles keep at most this many characters of the first user message
pub const TITLE_MAX_CHARS: usize = 30;

const TITLE_ELLIPSIS: &str = "...";

/// Rating a user can attach to an assistant message
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter,
    AsRefStr, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FeedbackTag {
    Helpful,
    NotHelpful,
}

impl FeedbackTag {
    /// Wire value sent in the `feedback` form field
    pub fn as_wire(self) -> &'static str {
        self.into()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FeedbackTag::Helpful => "👍 Helpful",
            FeedbackTag::NotHelpful => "👎 Not Helpful",
        }
    }
}

/// A single stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    pub is_user: bool,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackTag>,
}

impl Message {
    pub fn user(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            timestamp,
            feedback: None,
        }
    }

    pub fn assistant(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            timestamp,
            feedback: None,
        }
    }
}

/// A named, ordered sequence of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub last_updated: i64,
}

impl Conversation {
    pub fn new(timestamp: i64) -> Self {
        Self {
            title: SENTINEL_TITLE.to_string(),
            messages: Vec::new(),
            created: timestamp,
            last_updated: timestamp,
        }
    }

    /// Append a message at the end and refresh `last_updated`.
    ///
    /// `last_updated` never moves backwards, even if the message carries an
    /// older timestamp than the conversation has seen.
    pub fn push(&mut self, message: Message) {
        self.last_updated = self.last_updated.max(message.timestamp);
        self.messages.push(message);
    }

    pub fn has_sentinel_title(&self) -> bool {
        self.title == SENTINEL_TITLE
    }

    /// Derive the title from the first user message.
    ///
    /// Returns `true` if the title changed. Only applies while the title is
    /// still the sentinel.
    pub fn derive_title(&mut self) -> bool {
        if !self.has_sentinel_title() {
            return false;
        }
        let Some(first) = self.messages.iter().find(|m| m.is_user) else {
            return false;
        };
        let title = truncate_title(&first.text);
        let changed = title != self.title;
        self.title = title;
        changed
    }

    /// Text of the most recent user message, if any
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_user)
            .map(|m| m.text.as_str())
    }

    /// Tag the last assistant message whose text equals `text`.
    ///
    /// Matching is by text, scanning backwards; when two assistant messages
    /// share identical text the later one always receives the tag.
    pub fn tag_assistant_message(&mut self, text: &str, tag: FeedbackTag) -> bool {
        match self
            .messages
            .iter_mut()
            .rev()
            .find(|m| !m.is_user && m.text == text)
        {
            Some(message) => {
                message.feedback = Some(tag);
                true
            }
            None => false,
        }
    }
}

/// Sidebar entry for one conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub active: bool,
    pub last_updated: i64,
    pub message_count: usize,
}

/// Truncate `text` to the title limit, appending an ellipsis when cut
pub fn truncate_title(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}{TITLE_ELLIPSIS}")
    } else {
        head
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Local `HH:MM` label for an epoch-millisecond timestamp
pub fn time_label(timestamp: i64) -> String {
    use chrono::{Local, TimeZone};

    match Local.timestamp_millis_opt(timestamp).single() {
        Some(time) => time.format("%H:%M").to_string(),
        None => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_truncate_title_short_text_is_kept() {
        assert_eq!(truncate_title("Hi"), "Hi");
        let exact = "a".repeat(30);
        assert_eq!(truncate_title(&exact), exact);
    }

    #[test]
    fn test_truncate_title_long_text_gets_ellipsis() {
        let text = "How much water should I drink every day?";
        let title = truncate_title(text);
        assert_eq!(title, format!("{}...", &text[..30]));
    }

    #[test]
    fn test_truncate_title_counts_characters_not_bytes() {
        let text = "é".repeat(31);
        let title = truncate_title(&text);
        assert_eq!(title, format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_derive_title_happens_once() {
        let mut conversation = Conversation::new(1_000);
        conversation.push(Message::assistant("Welcome", 1_001));
        assert!(!conversation.derive_title());
        assert_eq!(conversation.title, SENTINEL_TITLE);

        conversation.push(Message::user("Hi", 1_002));
        assert!(conversation.derive_title());
        assert_eq!(conversation.title, "Hi");

        conversation.push(Message::user("Something else entirely", 1_003));
        assert!(!conversation.derive_title());
        assert_eq!(conversation.title, "Hi");
    }

    #[test]
    fn test_push_keeps_last_updated_monotonic() {
        let mut conversation = Conversation::new(5_000);
        conversation.push(Message::user("late", 7_000));
        conversation.push(Message::user("early", 6_000));
        assert_eq!(conversation.last_updated, 7_000);
        assert_eq!(conversation.messages.last().unwrap().text, "early");
    }

    #[test]
    fn test_tag_assistant_message_prefers_latest_duplicate() {
        let mut conversation = Conversation::new(0);
        conversation.push(Message::assistant("Drink water", 1));
        conversation.push(Message::user("Again?", 2));
        conversation.push(Message::assistant("Drink water", 3));

        assert!(conversation.tag_assistant_message("Drink water", FeedbackTag::Helpful));
        assert_eq!(conversation.messages[0].feedback, None);
        assert_eq!(conversation.messages[2].feedback, Some(FeedbackTag::Helpful));
        assert!(!conversation.tag_assistant_message("Again?", FeedbackTag::NotHelpful));
    }

    #[test]
    fn test_feedback_tag_wire_values() {
        assert_eq!(FeedbackTag::Helpful.as_wire(), "helpful");
        assert_eq!(FeedbackTag::NotHelpful.as_wire(), "not-helpful");
        assert_eq!(FeedbackTag::from_str("not-helpful").unwrap(), FeedbackTag::NotHelpful);
    }

    #[test]
    fn test_message_json_layout() {
        let mut message = Message::assistant("Hello", 42);
        message.feedback = Some(FeedbackTag::NotHelpful);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "text": "Hello",
                "isUser": false,
                "timestamp": 42,
                "feedback": "not-helpful"
            })
        );

        let plain = serde_json::to_value(Message::user("Hi", 1)).unwrap();
        assert!(plain.get("feedback").is_none());
    }

    #[test]
    fn test_conversation_missing_last_updated_reads_as_zero() {
        let conversation: Conversation =
            serde_json::from_str(r#"{"title":"Old","messages":[],"created":10}"#).unwrap();
        assert_eq!(conversation.last_updated, 0);
    }
}
