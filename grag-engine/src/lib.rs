//! # grag-engine
//!
//! The public entry point of the GraphRAG engine: [`engine::GraphRagEngine`]
//! ties together the System Metadata Stamper (C4), the Learn Orchestrator
//! (C7), the Ask Orchestrator (C8), the Batch Runner (C10), and the
//! Management API (C11) over a swappable [`grag_store::GraphStore`] /
//! [`grag_providers::EmbeddingProvider`] / [`grag_providers::LlmProvider`]
//! backend.

pub mod ask;
pub mod batch;
pub mod engine;
pub mod error;
pub mod learn;
pub mod management;
pub mod metadata;
pub mod types;

pub mod prelude {
    pub use crate::engine::GraphRagEngine;
    pub use crate::error::{EngineError, Result};
    pub use crate::metadata::MetadataStamper;
    pub use crate::types::{
        AskContext, AskOptions, AskResult, AskStats, BackendHealth, BatchFailure, BatchItem,
        BatchProgress, BatchResult, CreatedCounts, HealthCheckResult, HealthStatus, LearnOptions,
        LearnResult, Strategy, INSUFFICIENT_CONTEXT_ANSWER,
    };

    pub use grag_config::{validate_config, GragConfig, ValidationReport};
}

pub use prelude::*;
