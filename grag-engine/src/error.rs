//! ABOUTME: Error types for the public engine API (Learn/Ask orchestrators, management, health)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// `Learn`/`Ask` require a scope to be configured on the engine instance.
    #[error("engine has no scope configured; scope is required for this operation")]
    MissingScope,

    /// Subgraph bounds violation and other caller-supplied argument errors.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] grag_store::StoreError),

    #[error(transparent)]
    Provider(#[from] grag_providers::ProviderError),

    #[error(transparent)]
    Extract(#[from] grag_extract::ExtractError),

    #[error(transparent)]
    Core(#[from] grag_core::CoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
