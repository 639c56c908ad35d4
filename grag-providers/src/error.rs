//! ABOUTME: Error types for embedding and LLM provider calls

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("embedding provider '{provider}' failed: {message}")]
    Embedding { provider: String, message: String },

    #[error("LLM provider '{provider}' failed: {message}")]
    Llm { provider: String, message: String },

    #[error("provider configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
