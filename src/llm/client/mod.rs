//! LLM client for document extraction.
//!
//! Supports Ollama and OpenAI-compatible chat APIs, both as one-shot
//! completions and as token streams.

mod config;
mod ollama;
mod openai;
mod stream;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use config::{LlmConfig, LlmProvider};
pub use stream::ChunkStream;

/// Bound on the reachability check.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// One message in a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A piece of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    /// Text delta carried by this chunk.
    pub content: String,
    /// Set on the provider's end-of-stream marker.
    pub done: bool,
}

/// Token stream returned by [`ChatClient::chat_stream`].
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

/// Errors that can occur during LLM operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// LLM is disabled
    #[error("LLM is disabled")]
    Disabled,
    /// Request was abandoned by the caller
    #[error("cancelled")]
    Cancelled,
}

/// Chat model seam used by the pipeline and the review controller.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Model name used for requests, for display.
    fn model(&self) -> &str;

    /// Send the messages and wait for the whole reply.
    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Send the messages and stream the reply as it is generated.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<ChatStream, LlmError>;
}

/// HTTP chat client for the configured provider.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        // No client-wide timeout: streams run until done or dropped
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Build a client only when extraction via LLM is enabled.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        match Self::new(config.clone()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("LLM client unavailable: {}", e);
                None
            }
        }
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the LLM service answers.
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let url = match self.config.provider {
            LlmProvider::Ollama => format!("{}/api/tags", self.config.endpoint),
            LlmProvider::OpenAI => format!("{}/v1/models", self.config.endpoint),
        };
        let mut req = self.client.get(&url).timeout(STATUS_TIMEOUT);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        match req.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ChatClient for LlmClient {
    fn model(&self) -> &str {
        self.config.effective_model()
    }

    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }
        debug!(
            provider = self.config.provider.as_str(),
            model = self.model(),
            "chat completion"
        );
        match self.config.provider {
            LlmProvider::Ollama => ollama::complete(&self.client, &self.config, messages).await,
            LlmProvider::OpenAI => openai::complete(&self.client, &self.config, messages).await,
        }
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<ChatStream, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }
        debug!(
            provider = self.config.provider.as_str(),
            model = self.model(),
            "chat stream"
        );
        let stream = match self.config.provider {
            LlmProvider::Ollama => ollama::stream(&self.client, &self.config, messages).await?,
            LlmProvider::OpenAI => openai::stream(&self.client, &self.config, messages).await?,
        };
        Ok(Box::pin(stream))
    }
}

/// Turn a non-success response into an API error carrying the body.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Api(format!("HTTP {}: {}", status, body.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_client_refuses() {
        let mut config = LlmConfig::base_default();
        config.enabled = false;
        assert!(LlmClient::from_config(&config).is_none());

        let client = LlmClient::new(config).unwrap();
        let err = client
            .chat_complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err, LlmError::Disabled);
    }

    #[test]
    fn test_model_prefers_extraction_model() {
        let mut config = LlmConfig::base_default().with_model("llama3");
        config.extraction_model = Some("qwen2.5:14b".to_string());
        let client = LlmClient::new(config).unwrap();
        assert_eq!(client.model(), "qwen2.5:14b");
    }
}
