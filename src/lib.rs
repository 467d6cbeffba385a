//! docintake - document intake with text extraction, OCR, and LLM hints.
//!
//! Stored documents go through up to three steps: reading the PDF text
//! layer, OCR of scanned pages and images, and a model pass that suggests
//! metadata. [`services::Pipeline`] runs them in one shot;
//! [`services::ExtractionController`] runs them step by step for review.

pub mod config;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod repository;
pub mod services;
pub mod utils;
