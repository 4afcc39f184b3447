//! Conversation UI components for chat interface

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod pending;
pub mod sidebar;

pub use commands::{get_help_text, ParsedCommand, SlashCommand};
pub use composer::ConversationComposer;
pub use history::{ConversationHistory, MessageNode};
pub use manager::{ConversationAction, ConversationManager};
pub use pending::PendingIndicator;
pub use sidebar::ChatSidebar;
