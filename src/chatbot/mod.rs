//! Health assistant chat.
//!
//! Anonymous users get a limited canned reply. Logged-in users get a full
//! reply from the configured [`ChatResponder`]; if it fails, the built-in
//! [`RuleResponder`] answers instead.

mod remote;
mod rules;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{ChatProvider, ChatbotConfig};

pub use remote::RemoteResponder;
pub use rules::{limited_reply, RuleResponder, DISCLAIMER};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("responder returned an empty reply")]
    EmptyReply,

    #[error("remote chat provider requires chatbot.api_url")]
    MissingApiUrl,
}

/// Produces an answer to a user's health question
#[async_trait]
pub trait ChatResponder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn respond(&self, message: &str) -> Result<String, ChatError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Limited,
    Full,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub mode: ChatMode,
}

pub struct ChatbotService {
    responder: Arc<dyn ChatResponder>,
    fallback: RuleResponder,
}

impl ChatbotService {
    pub fn from_config(config: &ChatbotConfig) -> Result<Self, ChatError> {
        let responder: Arc<dyn ChatResponder> = match config.provider {
            ChatProvider::Rules => Arc::new(RuleResponder),
            ChatProvider::Remote => {
                let api_url = config.api_url.as_deref().ok_or(ChatError::MissingApiUrl)?;
                Arc::new(RemoteResponder::new(
                    api_url,
                    config.api_key.clone(),
                    config.model.clone(),
                    Duration::from_secs(config.timeout_seconds),
                )?)
            }
        };
        tracing::info!(provider = responder.name(), "Chatbot responder configured");
        Ok(Self::with_responder(responder))
    }

    pub fn with_responder(responder: Arc<dyn ChatResponder>) -> Self {
        Self {
            responder,
            fallback: RuleResponder,
        }
    }

    pub fn limited_reply(&self, message: &str) -> ChatReply {
        ChatReply {
            response: limited_reply(message).to_string(),
            mode: ChatMode::Limited,
        }
    }

    pub async fn full_reply(&self, message: &str) -> ChatReply {
        let response = match self.responder.respond(message).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    responder = self.responder.name(),
                    error = %e,
                    "Chat responder failed, using rule-based reply"
                );
                self.fallback.reply(message)
            }
        };

        ChatReply {
            response,
            mode: ChatMode::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl ChatResponder for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn respond(&self, _message: &str) -> Result<String, ChatError> {
            Err(ChatError::EmptyReply)
        }
    }

    #[tokio::test]
    async fn test_failed_responder_falls_back_to_rules() {
        let service = ChatbotService::with_responder(Arc::new(Broken));
        let reply = service.full_reply("I have a fever").await;
        assert_eq!(reply.mode, ChatMode::Full);
        assert!(reply.response.ends_with(DISCLAIMER));
    }

    #[test]
    fn test_limited_reply_mode() {
        let service = ChatbotService::with_responder(Arc::new(RuleResponder));
        let reply = service.limited_reply("find a hospital");
        assert_eq!(reply.mode, ChatMode::Limited);
        assert_eq!(
            serde_json::to_value(&reply).unwrap()["mode"],
            serde_json::json!("limited")
        );
    }

    #[test]
    fn test_remote_without_url_is_rejected() {
        let config = ChatbotConfig {
            provider: ChatProvider::Remote,
            ..ChatbotConfig::default()
        };
        assert!(matches!(
            ChatbotService::from_config(&config),
            Err(ChatError::MissingApiUrl)
        ));
    }
}
