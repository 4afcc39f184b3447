use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;

use crate::config::Config;
use crate::model::FeedbackTag;

/// Shown in place of a reply when the answering service can't be reached or understood
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed reply: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct AskReply {
    response: String,
}

/// HTTP client for the answering service
#[derive(Clone)]
pub struct ChatGateway {
    client: reqwest::Client,
    url: String,
}

impl ChatGateway {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.ask_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send the user's text and return the service's answer
    pub async fn ask(&self, user_input: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("user_input", user_input)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status()));
        }

        let body = response.bytes().await?;
        let reply: AskReply = serde_json::from_slice(&body)?;
        Ok(reply.response)
    }

    /// Report a rating for the answer to `user_input`. The reply body is ignored.
    pub async fn send_feedback(
        &self,
        user_input: &str,
        tag: FeedbackTag,
    ) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("user_input", user_input), ("feedback", tag.as_wire())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status()));
        }
        Ok(())
    }
}
