//! Interactive, resumable document extraction.
//!
//! An [`ExtractionController`] runs the text, OCR, and LLM steps for one
//! stored document at a time, holds their results, and only writes them to
//! the store when the user accepts.

mod controller;
mod state;


pub use controller::{Cmd, ExtractionController, Msg};
pub use state::{ExtractionState, StepInfo, StepKind, StepStatus};
