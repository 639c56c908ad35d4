//! ABOUTME: Error types shared by every GraphRAG engine crate
//! ABOUTME: Provides CoreError and the crate-local Result alias

use thiserror::Error;

/// Errors that can arise from core data-model construction and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entity label did not match the PascalCase grammar.
    #[error("invalid entity label '{0}': must match ^[A-Z][A-Za-z0-9_]*$")]
    InvalidLabel(String),

    /// A relationship type did not match the UPPERCASE grammar.
    #[error("invalid relationship type '{0}': must match ^[A-Z][A-Z0-9_]*$")]
    InvalidRelationshipType(String),

    /// A relationship endpoint referenced its own id.
    #[error("self-loop relationship rejected: {0} -> {0}")]
    SelfLoop(String),

    /// `_validFrom` was later than `_validTo`.
    #[error("invalid temporal range: validFrom ({valid_from}) is after validTo ({valid_to})")]
    InvalidTemporalRange {
        valid_from: String,
        valid_to: String,
    },

    /// A required scope was not supplied.
    #[error("scope is required for this operation")]
    MissingScope,
}

/// Result alias used throughout `grag-core`.
pub type Result<T> = std::result::Result<T, CoreError>;
