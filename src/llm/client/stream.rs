//! Line-oriented streaming adapter.
//!
//! Both providers stream one JSON document per line (Ollama as NDJSON,
//! OpenAI as SSE `data:` lines). This buffers raw bytes until a full line is
//! available so multi-byte characters split across network chunks survive.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use super::{LlmError, StreamChunk};

/// Parses one non-empty, trimmed line. `None` skips the line.
pub(crate) type LineParser = fn(&str) -> Option<Result<StreamChunk, LlmError>>;

/// Stream adapter that converts a response body into [`StreamChunk`] values.
pub struct ChunkStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: Vec<u8>,
    parse_line: LineParser,
    finished: bool,
}

impl ChunkStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
        parse_line: LineParser,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            parse_line,
            finished: false,
        }
    }
}

impl Stream for ChunkStream {
    type Item = Result<StreamChunk, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            if let Some(item) = next_line(&mut this.buffer, this.parse_line) {
                if matches!(item, Ok(StreamChunk { done: true, .. })) {
                    this.finished = true;
                }
                return Poll::Ready(Some(item));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(LlmError::Connection(e.to_string()))));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    let rest = std::mem::take(&mut this.buffer);
                    let line = String::from_utf8_lossy(&rest);
                    let line = line.trim();
                    if line.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready((this.parse_line)(line));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Pop complete lines off the buffer until one parses to an item.
fn next_line(
    buffer: &mut Vec<u8>,
    parse_line: LineParser,
) -> Option<Result<StreamChunk, LlmError>> {
    loop {
        let pos = buffer.iter().position(|b| *b == b'\n')?;
        let raw: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(item) = parse_line(line) {
            return Some(item);
        }
    }
}
