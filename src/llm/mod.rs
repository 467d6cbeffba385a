//! LLM integration: chat clients, extraction prompts, and reply parsing.

pub mod client;
pub mod hints;
pub mod prompts;

pub use client::{
    ChatClient, ChatMessage, ChatStream, LlmClient, LlmConfig, LlmError, LlmProvider, StreamChunk,
};
pub use hints::{parse_response, HintParseError, LooseValue};
pub use prompts::{build_prompt, PromptInput, DEFAULT_MAX_CONTENT_CHARS};

#[cfg(test)]
pub(crate) mod testing;
