//! Command-line interface for docintake.

mod commands;
pub mod helpers;
pub mod review;

pub use commands::{is_verbose, run};
