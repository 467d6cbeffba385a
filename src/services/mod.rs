//! Service layer for document extraction.
//!
//! This module contains domain logic separated from UI concerns.
//! Services can be used by the CLI, the review TUI, or other interfaces.

pub mod extraction;
pub mod pipeline;

pub use extraction::{Cmd, ExtractionController, ExtractionState, Msg, StepKind, StepStatus};
pub use pipeline::{Pipeline, PipelineResult, StageError};
