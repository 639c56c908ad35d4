//! # grag-core
//!
//! Core data model, error types, and grammar validators for the GraphRAG
//! engine. Every other crate in the workspace depends on this one; it has
//! no dependencies on graph/vector backends, providers, or orchestration.
//!
//! ## Data model
//!
//! [`Entity`], [`Document`], and [`Relationship`] are the three persisted
//! shapes. All three carry a [`SystemMetadata`] envelope (scope, context
//! tags, and bi-temporal validity) stamped by the engine's metadata
//! stamper, never by callers directly.

pub mod error;
pub mod grammar;
pub mod logging;
pub mod types;

pub mod prelude {
    pub use crate::error::{CoreError, Result};
    pub use crate::grammar::{validate_label, validate_relationship_type, CONTAINS_ENTITY};
    pub use crate::types::{
        dedup_context_ids, filter_protected_fields, Document, Embedding, Entity, Properties,
        Relationship, Scope, SystemMetadata,
    };
}

pub use prelude::*;
