//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatError, ChatResponder};

const SYSTEM_PROMPT: &str = "You are MediBot, a friendly health assistant. Give clear, practical \
general health information in a few short paragraphs. Never claim to diagnose. Tell the user to \
seek emergency care for urgent symptoms, and recommend consulting a healthcare professional.";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct RemoteResponder {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl RemoteResponder {
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", api_url.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.is_empty()),
            model,
        })
    }
}

#[async_trait]
impl ChatResponder for RemoteResponder {
    fn name(&self) -> &'static str {
        "remote"
    }

    #[tracing::instrument(name = "chatbot::remote", skip_all, fields(model = %self.model))]
    async fn respond(&self, message: &str) -> Result<String, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: message,
                },
            ],
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: CompletionResponse = request.send().await?.error_for_status()?.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ChatError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn responder(uri: &str) -> RemoteResponder {
        RemoteResponder::new(
            &format!("{uri}/v1/"),
            Some("sk-test".into()),
            "test-model".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_reply_from_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "  Drink water.  " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = responder(&server.uri()).respond("thirsty").await.unwrap();
        assert_eq!(reply, "Drink water.");
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = responder(&server.uri()).respond("hi").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyReply));
    }
}
