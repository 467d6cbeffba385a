//! Interactive extraction controller.
//!
//! Drives one document through text, OCR, and LLM steps without blocking the
//! caller's event loop. Background work is handed out as [`Cmd`] futures; the
//! caller spawns them and feeds the resulting [`Msg`] back into
//! [`ExtractionController::handle`], which may return the next `Cmd`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{ExtractionState, StepKind, StepStatus};
use crate::llm::{
    build_prompt, parse_response, ChatClient, ChatMessage, ChatStream, LlmError, PromptInput,
    StreamChunk, DEFAULT_MAX_CONTENT_CHARS,
};
use crate::ocr::{Capabilities, OcrPhase, OcrProgress, TesseractOcr};
use crate::repository::{DocumentStore, StoreError};
use crate::utils::{format_size, is_image, is_pdf, truncate_chars};

/// A unit of background work resolving to exactly one message.
pub type Cmd = Pin<Box<dyn Future<Output = Msg> + Send>>;

/// Result of background work, tagged with the session it belongs to.
pub enum Msg {
    /// The stored file was read and OCR started, or reading it failed.
    /// Carries the file size and the progress receiver.
    OcrReady {
        session: u64,
        result: Result<(u64, mpsc::Receiver<OcrProgress>), String>,
    },
    /// An OCR progress event. Carries the receiver so the next read can be
    /// scheduled.
    Ocr {
        session: u64,
        progress: OcrProgress,
        rx: mpsc::Receiver<OcrProgress>,
    },
    /// The OCR channel closed without a final event.
    OcrClosed { session: u64 },
    /// The model accepted (or refused) the streaming request.
    LlmStarted {
        session: u64,
        result: Result<ChatStream, LlmError>,
    },
    /// The next item from the model stream; `None` when the stream ended.
    LlmChunk {
        session: u64,
        chunk: Option<Result<StreamChunk, LlmError>>,
        stream: ChatStream,
    },
}

impl Msg {
    pub fn session(&self) -> u64 {
        match self {
            Msg::OcrReady { session, .. }
            | Msg::Ocr { session, .. }
            | Msg::OcrClosed { session }
            | Msg::LlmStarted { session, .. }
            | Msg::LlmChunk { session, .. } => *session,
        }
    }
}

impl std::fmt::Debug for Msg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Msg::OcrReady { session, result } => f
                .debug_struct("OcrReady")
                .field("session", session)
                .field("ok", &result.is_ok())
                .finish(),
            Msg::Ocr {
                session, progress, ..
            } => f
                .debug_struct("Ocr")
                .field("session", session)
                .field("progress", progress)
                .finish(),
            Msg::OcrClosed { session } => {
                f.debug_struct("OcrClosed").field("session", session).finish()
            }
            Msg::LlmStarted { session, result } => f
                .debug_struct("LlmStarted")
                .field("session", session)
                .field("ok", &result.is_ok())
                .finish(),
            Msg::LlmChunk { session, chunk, .. } => f
                .debug_struct("LlmChunk")
                .field("session", session)
                .field("chunk", chunk)
                .finish(),
        }
    }
}

/// Owns at most one extraction session and the results it holds until the
/// user accepts or discards them.
pub struct ExtractionController {
    store: Arc<dyn DocumentStore>,
    ocr: TesseractOcr,
    caps: Capabilities,
    llm: Option<Arc<dyn ChatClient>>,
    max_content_chars: usize,
    state: Option<ExtractionState>,
    next_session: u64,
}

impl ExtractionController {
    pub fn new(store: Arc<dyn DocumentStore>, ocr: TesseractOcr, caps: Capabilities) -> Self {
        Self {
            store,
            ocr,
            caps,
            llm: None,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            state: None,
            next_session: 1,
        }
    }

    /// Enable the LLM step.
    pub fn with_llm(mut self, llm: Arc<dyn ChatClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    /// The open session, if any.
    pub fn state(&self) -> Option<&ExtractionState> {
        self.state.as_ref()
    }

    /// Start a session for a stored document, replacing any open one.
    ///
    /// The text step is filled from the stored record right away. Returns the
    /// first background command, or `None` when nothing runs asynchronously.
    pub fn open(&mut self, doc_id: i64) -> Result<Option<Cmd>, StoreError> {
        self.discard();

        let doc = self.store.get_document(doc_id)?;
        let session = self.next_session;
        self.next_session += 1;

        let mime = doc.mime_type.clone();
        let mut state = ExtractionState::new(session, doc_id, doc.file_name.clone(), mime.clone());
        state.applies = [
            !is_image(&mime),
            self.caps.ocr_for_mime(&mime),
            self.llm.is_some(),
        ];
        state.stored_text = doc.extracted_text.clone();
        state.size_bytes = doc.size_bytes.max(0) as u64;

        if state.applies(StepKind::Text) {
            let chars = doc.extracted_text.chars().count();
            let step = state.step_mut(StepKind::Text);
            step.start();
            step.metric = format!("{} chars", chars);
            if chars == 0 {
                step.log("no text layer");
            } else {
                step.log(format!("{} chars from stored text", chars));
            }
            step.succeed(if chars == 0 { "empty" } else { "extracted" });
        }

        info!(doc_id, session, file = %doc.file_name, "opened extraction session");
        self.state = Some(state);

        let cmd = if self.applies(StepKind::Ocr) {
            self.start_ocr()
        } else if self.applies(StepKind::Llm) {
            self.start_llm()
        } else {
            None
        };
        Ok(cmd)
    }

    /// Apply one background message. Messages from a replaced or discarded
    /// session are dropped, which also drops the handle they carry.
    pub fn handle(&mut self, msg: Msg) -> Option<Cmd> {
        let current = self.state.as_ref().map(|s| s.session);
        if current != Some(msg.session()) {
            debug!(session = msg.session(), "dropping stale message");
            return None;
        }

        match msg {
            Msg::OcrReady { session, result } => self.on_ocr_ready(session, result),
            Msg::Ocr {
                session,
                progress,
                rx,
            } => self.on_ocr(session, progress, rx),
            Msg::OcrClosed { .. } => {
                let state = self.state.as_mut()?;
                let step = state.step_mut(StepKind::Ocr);
                if step.status.is_settled() {
                    return None;
                }
                step.log("OCR worker stopped without a result");
                step.fail("OCR worker stopped unexpectedly");
                self.after_ocr()
            }
            Msg::LlmStarted { session, result } => match result {
                Ok(stream) => {
                    let model = self.llm.as_ref().map(|l| l.model().to_string());
                    let state = self.state.as_mut()?;
                    state
                        .step_mut(StepKind::Llm)
                        .log(format!("streaming from {}", model.unwrap_or_default()));
                    Some(next_chunk(session, stream, state.cancel.clone()))
                }
                Err(e) => {
                    self.fail_llm(e);
                    None
                }
            },
            Msg::LlmChunk {
                session,
                chunk,
                stream,
            } => self.on_llm_chunk(session, chunk, stream),
        }
    }

    /// Write the held results to the store and close the session.
    ///
    /// Returns the closed session, or `Ok(None)` without touching the store
    /// unless every step has finished without failure. A store error leaves
    /// the session open.
    pub fn accept(&mut self) -> Result<Option<ExtractionState>, StoreError> {
        let Some(state) = self.state.as_ref() else {
            return Ok(None);
        };
        if !state.can_accept() {
            return Ok(None);
        }

        if state.applies(StepKind::Ocr)
            && (!state.ocr_text.is_empty() || !state.ocr_tsv.is_empty())
        {
            self.store
                .update_ocr(state.doc_id, &state.ocr_text, &state.ocr_tsv)?;
        }
        if let Some(hints) = &state.hints {
            let mut doc = self.store.get_document(state.doc_id)?;
            doc.apply_hints(hints);
            self.store.update_document(&doc)?;
        }

        info!(doc_id = state.doc_id, "accepted extraction results");
        let mut closed = self.state.take();
        if let Some(state) = closed.as_mut() {
            state.accepted = true;
        }
        Ok(closed)
    }

    /// Cancel background work and drop the session without writing anything.
    pub fn discard(&mut self) {
        if let Some(state) = self.state.take() {
            state.cancel.cancel();
            debug!(session = state.session, "discarded extraction session");
        }
    }

    /// Run the LLM step again. Only allowed once the session is complete and
    /// the cursor is on the LLM step.
    pub fn rerun_llm(&mut self) -> Option<Cmd> {
        let state = self.state.as_mut()?;
        if !state.can_rerun_llm() {
            return None;
        }
        state.hints = None;
        state.llm_reply.clear();
        state.step_mut(StepKind::Llm).restart();
        self.start_llm()
    }

    pub fn cursor_up(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.move_cursor(-1);
        }
    }

    pub fn cursor_down(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.move_cursor(1);
        }
    }

    /// Flip the expand state of the step under the cursor.
    pub fn toggle_expand(&mut self) {
        if let Some(state) = self.state.as_mut() {
            let kind = state.cursor_step();
            state.toggle_expanded(kind);
        }
    }

    fn applies(&self, kind: StepKind) -> bool {
        self.state.as_ref().is_some_and(|s| s.applies(kind))
    }

    fn start_ocr(&mut self) -> Option<Cmd> {
        let state = self.state.as_mut()?;
        state.step_mut(StepKind::Ocr).start();

        let session = state.session;
        let doc_id = state.doc_id;
        let mime = state.mime.clone();
        let cancel = state.cancel.clone();
        let store = self.store.clone();
        let ocr = self.ocr.clone();
        Some(Box::pin(async move {
            let read = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, StoreError> {
                let path = store.extract_cached_copy(doc_id)?;
                Ok(std::fs::read(path)?)
            })
            .await;
            let result = match read {
                Ok(Ok(data)) => {
                    let bytes = data.len() as u64;
                    Ok((bytes, ocr.ocr_with_progress(data, &mime, cancel)))
                }
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("read task failed: {}", e)),
            };
            Msg::OcrReady { session, result }
        }))
    }

    fn on_ocr_ready(
        &mut self,
        session: u64,
        result: Result<(u64, mpsc::Receiver<OcrProgress>), String>,
    ) -> Option<Cmd> {
        let state = self.state.as_mut()?;
        match result {
            Ok((bytes, rx)) => {
                state
                    .step_mut(StepKind::Ocr)
                    .log(format!("read {}", format_size(bytes)));
                Some(next_ocr(session, rx))
            }
            Err(e) => {
                warn!(doc_id = state.doc_id, "cannot read stored file: {}", e);
                state.step_mut(StepKind::Ocr).fail(e);
                self.after_ocr()
            }
        }
    }

    fn on_ocr(
        &mut self,
        session: u64,
        progress: OcrProgress,
        rx: mpsc::Receiver<OcrProgress>,
    ) -> Option<Cmd> {
        let state = self.state.as_mut()?;

        if progress.done {
            if let Some(err) = progress.error {
                if err.is_cancelled() {
                    return None;
                }
                let step = state.step_mut(StepKind::Ocr);
                step.log(format!("error: {}", err));
                step.fail(err.to_string());
            } else {
                let chars = progress.text.chars().count();
                let step = state.step_mut(StepKind::Ocr);
                step.metric = format!("{} chars", chars);
                step.log(format!("recognized {} chars", chars));
                step.succeed(if chars == 0 { "no text found" } else { "recognized" });
                state.ocr_text = progress.text;
                state.ocr_tsv = progress.tsv;
            }
            return self.after_ocr();
        }

        let step = state.step_mut(StepKind::Ocr);
        match progress.phase {
            OcrPhase::Rasterize => {
                step.metric = format!("0/{} pages", progress.total);
                step.log(format!("rasterized {} pages", progress.total));
            }
            OcrPhase::Ocr => {
                step.metric = format!("{}/{} pages", progress.page, progress.total);
                match progress.page_error {
                    Some(e) => step.log(format!("page {}: skipped ({})", progress.page, e)),
                    None => step.log(format!(
                        "page {}: {} chars",
                        progress.page,
                        progress.text.chars().count()
                    )),
                }
            }
        }
        Some(next_ocr(session, rx))
    }

    /// Continue after the OCR step settled, with or without a result.
    fn after_ocr(&mut self) -> Option<Cmd> {
        if self.applies(StepKind::Llm) {
            self.start_llm()
        } else {
            None
        }
    }

    fn start_llm(&mut self) -> Option<Cmd> {
        let llm = self.llm.clone()?;
        let max_content_chars = self.max_content_chars;
        let state = self.state.as_mut()?;

        let step = state.step_mut(StepKind::Llm);
        if step.status == StepStatus::Pending {
            step.start();
        }
        if state.stored_text.trim().is_empty() && state.ocr_text.trim().is_empty() {
            let step = state.step_mut(StepKind::Llm);
            step.log("skipped: no text to send");
            step.succeed("skipped");
            return None;
        }

        let known = match self.store.list_known_entity_names() {
            Ok(known) => known,
            Err(e) => {
                warn!("cannot load known entity names: {}", e);
                Default::default()
            }
        };
        let pdf_text = if is_pdf(&state.mime) {
            state.stored_text.as_str()
        } else {
            ""
        };
        let messages: Vec<ChatMessage> = build_prompt(&PromptInput {
            filename: &state.filename,
            mime: &state.mime,
            size_bytes: state.size_bytes,
            known: &known,
            pdf_text,
            ocr_text: &state.ocr_text,
            fallback_text: &state.stored_text,
            max_content_chars,
        });
        state
            .step_mut(StepKind::Llm)
            .log(format!("asking {}", llm.model()));

        let session = state.session;
        let cancel = state.cancel.clone();
        Some(Box::pin(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(LlmError::Cancelled),
                result = llm.chat_stream(&messages) => result,
            };
            Msg::LlmStarted { session, result }
        }))
    }

    fn on_llm_chunk(
        &mut self,
        session: u64,
        chunk: Option<Result<StreamChunk, LlmError>>,
        stream: ChatStream,
    ) -> Option<Cmd> {
        let state = self.state.as_mut()?;
        match chunk {
            Some(Ok(chunk)) => {
                state.llm_reply.push_str(&chunk.content);
                let chars = state.llm_reply.chars().count();
                state.step_mut(StepKind::Llm).metric = format!("{} chars", chars);
                if chunk.done {
                    self.finish_llm();
                    None
                } else {
                    Some(next_chunk(session, stream, state.cancel.clone()))
                }
            }
            Some(Err(e)) => {
                self.fail_llm(e);
                None
            }
            None => {
                self.finish_llm();
                None
            }
        }
    }

    fn finish_llm(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        match parse_response(&state.llm_reply) {
            Ok(hints) => {
                let step = state.step_mut(StepKind::Llm);
                let lines = hints.display_lines();
                if lines.is_empty() {
                    step.log("no fields extracted");
                }
                for (label, value) in lines {
                    step.log(format!("{}: {}", label, value));
                }
                step.succeed("hints ready");
                state.hints = Some(hints);
            }
            Err(e) => {
                let raw = truncate_chars(state.llm_reply.trim(), 500);
                let step = state.step_mut(StepKind::Llm);
                step.log(format!("raw reply: {}", raw));
                step.fail(e.to_string());
            }
        }
    }

    fn fail_llm(&mut self, err: LlmError) {
        if err == LlmError::Cancelled {
            return;
        }
        if let Some(state) = self.state.as_mut() {
            let step = state.step_mut(StepKind::Llm);
            step.log(format!("error: {}", err));
            step.fail(err.to_string());
        }
    }
}

fn next_ocr(session: u64, mut rx: mpsc::Receiver<OcrProgress>) -> Cmd {
    Box::pin(async move {
        match rx.recv().await {
            Some(progress) => Msg::Ocr {
                session,
                progress,
                rx,
            },
            None => Msg::OcrClosed { session },
        }
    })
}

fn next_chunk(session: u64, mut stream: ChatStream, cancel: CancellationToken) -> Cmd {
    Box::pin(async move {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => Some(Err(LlmError::Cancelled)),
            chunk = stream.next() => chunk,
        };
        Msg::LlmChunk {
            session,
            chunk,
            stream,
        }
    })
}
