//! Scripted chat client for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::client::{ChatClient, ChatMessage, ChatStream, LlmError, StreamChunk};

pub(crate) struct FakeChat {
    reply: Result<String, LlmError>,
    chunk_delay: Option<Duration>,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl FakeChat {
    /// Answers every request with `reply`; streams it in 8-char pieces.
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            chunk_delay: None,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// Fails every request with `err`.
    pub fn failing(err: LlmError) -> Self {
        Self {
            reply: Err(err),
            ..Self::replying("")
        }
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Concatenated contents of the last request's messages.
    pub fn last_prompt(&self) -> String {
        self.last_messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn record(&self, messages: &[ChatMessage]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.record(messages);
        self.reply.clone()
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<ChatStream, LlmError> {
        self.record(messages);
        let reply = self.reply.clone()?;
        let chars: Vec<char> = reply.chars().collect();
        let mut chunks: Vec<Result<StreamChunk, LlmError>> = chars
            .chunks(8)
            .map(|c| {
                Ok(StreamChunk {
                    content: c.iter().collect(),
                    done: false,
                })
            })
            .collect();
        chunks.push(Ok(StreamChunk {
            content: String::new(),
            done: true,
        }));

        let delay = self.chunk_delay;
        let stream = futures::stream::iter(chunks).then(move |chunk| async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            chunk
        });
        Ok(Box::pin(stream))
    }
}
