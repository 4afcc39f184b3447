use crate::gateway::GatewayError;
use crate::model::FeedbackTag;

/// Completions reported back to the control thread by network tasks
#[derive(Debug)]
pub enum AppEvent {
    /// A chat request finished, successfully or not
    ReplyReceived {
        conversation_id: String,
        result: Result<String, GatewayError>,
    },

    /// A feedback request finished; the outcome is only logged
    FeedbackSent {
        tag: FeedbackTag,
        result: Result<(), GatewayError>,
    },
}
