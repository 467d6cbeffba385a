//! OpenAI-compatible `/v1/chat/completions` backend (OpenAI, Groq,
//! Together.ai).

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_status, ChatMessage, ChunkStream, LlmConfig, LlmError, StreamChunk};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunkRaw {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

async fn send(
    client: &Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
    stream: bool,
) -> Result<reqwest::Response, LlmError> {
    let url = format!("{}/v1/chat/completions", config.endpoint);
    let body = ChatRequest {
        model: config.effective_model(),
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        stream,
    };
    let mut req = client.post(&url).json(&body);
    if !stream {
        req = req.timeout(config.request_timeout());
    }
    if let Some(key) = &config.api_key {
        req = req.bearer_auth(key);
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
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::Parse("response has no choices".to_string()))
}

pub(super) async fn stream(
    client: &Client,
    config: &LlmConfig,
    messages: &[ChatMessage],
) -> Result<ChunkStream, LlmError> {
    let resp = send(client, config, messages, true).await?;
    Ok(ChunkStream::new(resp.bytes_stream(), parse_line))
}

/// SSE `data:` lines; `event:`/`id:`/`retry:` lines are skipped.
fn parse_line(line: &str) -> Option<Result<StreamChunk, LlmError>> {
    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(Ok(StreamChunk {
            content: String::new(),
            done: true,
        }));
    }
    match serde_json::from_str::<StreamChunkRaw>(data) {
        Ok(raw) => {
            let content = raw
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .unwrap_or_default();
            Some(Ok(StreamChunk {
                content,
                done: false,
            }))
        }
        Err(e) => Some(Err(LlmError::Parse(format!(
            "bad stream chunk: {} ({})",
            e,
            crate::utils::truncate_chars(data, 200)
        )))),
    }
}
