//! ABOUTME: Error types for extraction prompt composition and response parsing

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The model response contained no recoverable JSON object. Carries the
    /// raw response for diagnostics; per spec.md §4.C6 the enclosing learn
    /// must abort without attempting partial writes.
    #[error("extraction response was not valid JSON: {message}\n--- raw response ---\n{raw}")]
    InvalidJson { raw: String, message: String },

    /// The JSON parsed but an entity/relationship failed schema validation.
    #[error("extraction response failed schema validation: {message}\n--- raw response ---\n{raw}")]
    SchemaViolation { raw: String, message: String },

    #[error(transparent)]
    Core(#[from] grag_core::CoreError),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
