//! # grag-config
//!
//! Configuration types for the GraphRAG engine (spec.md §6 Configuration)
//! and `ValidateConfig` (C11): a pure function reporting missing
//! credentials, missing scope fields, and URI scheme warnings without
//! touching the network.

pub mod error;
pub mod types;
pub mod validate;

pub mod prelude {
    pub use crate::error::{ConfigError, Result};
    pub use crate::types::{
        EmbeddingProviderConfig, GragConfig, LlmProviderConfig, ScopeConfig, StoreConfig,
    };
    pub use crate::validate::{validate_config, ValidationReport};
}

pub use prelude::*;
