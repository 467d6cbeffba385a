//! Ollama `/api/chat` backend.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, ChatMessage, ChunkStream, LlmConfig, LlmError, StreamChunk};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

fn request<'a>(config: &'a LlmConfig, messages: &'a [ChatMessage], stream: bool) -> ChatRequest<'a> {
    ChatRequest {
        model: config.effective_model(),
        messages,
        stream,
        options: Options {
            temperature: config.temperature,
            num_predict: config.max_tokens,
        },
    }
}

async fn send(
    client: &Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
    stream: bool,
) -> Result<reqwest::Response, LlmError> {
    let url = format!("{}/api/chat", config.endpoint);
    let mut req = client.post(&url).json(&request(config, messages, stream));
    if !stream {
        req = req.timeout(config.request_timeout());
    }
    let resp = req
        .send()
        .await
        .map_err(|e| LlmError::Connection(e.to_string()))?;
    check_status(resp).await
}

pub(super) async fn complete(
    client: &Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
) -> Result<String, LlmError> {
    let resp = send(client, config, messages, false).await?;
    let body: ChatResponse = resp
        .json()
        .await
        .map_err(|e| LlmError::Parse(e.to_string()))?;
    if let Some(error) = body.error {
        return Err(LlmError::Api(error));
    }
    body.message
        .map(|m| m.content)
        .ok_or_else(|| LlmError::Parse("response has no message".to_string()))
}

pub(super) async fn stream(
    client: &Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
) -> Result<ChunkStream, LlmError> {
    let resp = send(client, config, messages, true).await?;
    Ok(ChunkStream::new(resp.bytes_stream(), parse_line))
}

/// One NDJSON object per line.
fn parse_line(line: &str) -> Option<Result<StreamChunk, LlmError>> {
    let parsed = match serde_json::from_str::<ChatResponse>(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            return Some(Err(LlmError::Parse(format!(
                "bad stream line: {} ({})",
                e,
                crate::utils::truncate_chars(line, 200)
            ))))
        }
    };
    if let Some(error) = parsed.error {
        return Some(Err(LlmError::Api(error)));
    }
    Some(Ok(StreamChunk {
        content: parsed.message.map(|m| m.content).unwrap_or_default(),
        done: parsed.done,
    }))
}
