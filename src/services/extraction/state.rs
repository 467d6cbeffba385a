//! Per-document extraction session state.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::models::ExtractionHints;

/// The three extraction steps, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Text,
    Ocr,
    Llm,
}

impl StepKind {
    pub const ALL: [Self; 3] = [Self::Text, Self::Ocr, Self::Llm];

    pub fn index(&self) -> usize {
        match self {
            Self::Text => 0,
            Self::Ocr => 1,
            Self::Llm => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Ocr => "OCR",
            Self::Llm => "LLM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Progress and log of one step.
#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    pub status: StepStatus,
    /// One-line description of the outcome (error text on failure).
    pub detail: String,
    /// Short progress figure, e.g. "3/12 pages".
    pub metric: String,
    pub logs: Vec<String>,
    pub started_at: Option<Instant>,
    /// Set when the step settles.
    pub elapsed: Option<Duration>,
}

impl StepInfo {
    pub(crate) fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
        self.elapsed = None;
    }

    pub(crate) fn succeed(&mut self, detail: impl Into<String>) {
        self.settle(StepStatus::Done);
        self.detail = detail.into();
    }

    pub(crate) fn fail(&mut self, detail: impl Into<String>) {
        self.settle(StepStatus::Failed);
        self.detail = detail.into();
    }

    pub(crate) fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Back to running with no trace of the previous attempt.
    pub(crate) fn restart(&mut self) {
        *self = Self::default();
        self.start();
    }

    fn settle(&mut self, status: StepStatus) {
        // Settled steps stay settled until an explicit restart
        if self.status.is_settled() {
            return;
        }
        self.status = status;
        self.elapsed = self.started_at.map(|t| t.elapsed());
    }

    /// Time spent so far, or in total once settled.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed.or_else(|| self.started_at.map(|t| t.elapsed()))
    }
}

/// One open extraction session.
#[derive(Debug)]
pub struct ExtractionState {
    pub(crate) session: u64,
    pub doc_id: i64,
    pub filename: String,
    pub mime: String,
    pub size_bytes: u64,
    pub steps: [StepInfo; 3],
    /// Which steps apply to this document.
    pub applies: [bool; 3],
    /// Text from the store, used as the text-layer / fallback prompt source.
    pub stored_text: String,
    pub ocr_text: String,
    pub ocr_tsv: String,
    pub hints: Option<ExtractionHints>,
    /// Raw model reply accumulated from the stream.
    pub(crate) llm_reply: String,
    pub accepted: bool,
    pub(crate) cancel: CancellationToken,
    pub cursor: usize,
    expanded: [Option<bool>; 3],
}

impl ExtractionState {
    pub(crate) fn new(session: u64, doc_id: i64, filename: String, mime: String) -> Self {
        Self {
            session,
            doc_id,
            filename,
            mime,
            size_bytes: 0,
            steps: Default::default(),
            applies: [false; 3],
            stored_text: String::new(),
            ocr_text: String::new(),
            ocr_tsv: String::new(),
            hints: None,
            llm_reply: String::new(),
            accepted: false,
            cancel: CancellationToken::new(),
            cursor: 0,
            expanded: [None; 3],
        }
    }

    pub fn step(&self, kind: StepKind) -> &StepInfo {
        &self.steps[kind.index()]
    }

    pub(crate) fn step_mut(&mut self, kind: StepKind) -> &mut StepInfo {
        &mut self.steps[kind.index()]
    }

    pub fn applies(&self, kind: StepKind) -> bool {
        self.applies[kind.index()]
    }

    /// Every applicable step has settled.
    pub fn is_complete(&self) -> bool {
        StepKind::ALL
            .iter()
            .filter(|k| self.applies(**k))
            .all(|k| self.step(*k).status.is_settled())
    }

    pub fn has_failure(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }

    pub fn can_accept(&self) -> bool {
        self.is_complete() && !self.accepted && !self.has_failure()
    }

    pub fn cursor_step(&self) -> StepKind {
        StepKind::ALL[self.cursor.min(StepKind::ALL.len() - 1)]
    }

    pub fn can_rerun_llm(&self) -> bool {
        self.is_complete()
            && !self.accepted
            && self.applies(StepKind::Llm)
            && self.cursor_step() == StepKind::Llm
    }

    /// Whether a step's log is shown. A manual toggle wins; otherwise steps
    /// open while running or failed, and the LLM step stays open once done.
    pub fn is_expanded(&self, kind: StepKind) -> bool {
        if let Some(manual) = self.expanded[kind.index()] {
            return manual;
        }
        match self.step(kind).status {
            StepStatus::Running | StepStatus::Failed => true,
            StepStatus::Done => kind == StepKind::Llm,
            StepStatus::Pending => false,
        }
    }

    pub(crate) fn toggle_expanded(&mut self, kind: StepKind) {
        let open = self.is_expanded(kind);
        self.expanded[kind.index()] = Some(!open);
    }

    pub(crate) fn move_cursor(&mut self, delta: isize) {
        let max = StepKind::ALL.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ExtractionState {
        let mut s = ExtractionState::new(1, 1, "a.pdf".into(), "application/pdf".into());
        s.applies = [true, true, true];
        s
    }

    #[test]
    fn test_status_only_moves_forward() {
        let mut step = StepInfo::default();
        step.start();
        step.succeed("ok");
        step.fail("late error");
        assert_eq!(step.status, StepStatus::Done);
        assert_eq!(step.detail, "ok");
        assert!(step.elapsed.is_some());

        step.log("old");
        step.restart();
        assert_eq!(step.status, StepStatus::Running);
        assert!(step.logs.is_empty());
        assert!(step.detail.is_empty());
    }

    #[test]
    fn test_complete_ignores_inapplicable_steps() {
        let mut s = state();
        s.applies = [true, false, true];
        s.step_mut(StepKind::Text).start();
        s.step_mut(StepKind::Text).succeed("");
        assert!(!s.is_complete());
        s.step_mut(StepKind::Llm).start();
        s.step_mut(StepKind::Llm).fail("boom");
        assert!(s.is_complete());
        assert!(s.has_failure());
        assert!(!s.can_accept());
    }

    #[test]
    fn test_auto_expand() {
        let mut s = state();
        assert!(!s.is_expanded(StepKind::Ocr));
        s.step_mut(StepKind::Ocr).start();
        assert!(s.is_expanded(StepKind::Ocr));
        s.step_mut(StepKind::Ocr).succeed("");
        assert!(!s.is_expanded(StepKind::Ocr));

        s.step_mut(StepKind::Llm).start();
        s.step_mut(StepKind::Llm).succeed("");
        assert!(s.is_expanded(StepKind::Llm));
        s.toggle_expanded(StepKind::Llm);
        assert!(!s.is_expanded(StepKind::Llm));
    }

    #[test]
    fn test_cursor_clamped() {
        let mut s = state();
        s.move_cursor(-1);
        assert_eq!(s.cursor_step(), StepKind::Text);
        s.move_cursor(5);
        assert_eq!(s.cursor_step(), StepKind::Llm);
    }
}
