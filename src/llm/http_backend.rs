use super::Completer;
use crate::backend::{BackendClient, ServiceKind};
use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Completer backed by an OpenAI-compatible `/v1/chat/completions` endpoint
pub struct HttpCompleter {
    client: BackendClient,
    model_id: String,
}

impl HttpCompleter {
    pub fn new(config: &Config, model: &str) -> Result<Self> {
        let client = BackendClient::new(
            &config.completion.url,
            config.completion_api_key(),
            Duration::from_secs(config.completion.timeout_secs),
            ServiceKind::Completion,
        )?;
        Ok(Self {
            client,
            model_id: model.to_string(),
        })
    }
}

#[async_trait]
impl Completer for HttpCompleter {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.model_id,
            prompt.chars().count()
        );

        let request = ChatRequest {
            model: &self.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };
        let response: ChatResponse = self
            .client
            .post_json("/v1/chat/completions", &request)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Completion("Completion returned no content".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
