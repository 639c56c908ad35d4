//! ABOUTME: Error types for the graph/vector store provider

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("relationship endpoint not resolvable in scope: {0}")]
    UnresolvedEndpoint(String),

    #[error("maxDepth must be between 1 and 10, got {0}")]
    InvalidDepth(usize),

    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Core(#[from] grag_core::CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
