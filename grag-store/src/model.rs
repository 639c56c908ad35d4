//! ABOUTME: Request/response shapes used by the GraphStore trait
//! ABOUTME: Kept separate from grag_core::types since these are store-call arguments, not persisted rows

use chrono::{DateTime, Utc};
use grag_core::{Embedding, Entity, Properties, Relationship, SystemMetadata};

/// A not-yet-persisted entity, as produced by the Learn orchestrator before
/// a store-assigned id exists.
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub label: String,
    pub properties: Properties,
    pub metadata: SystemMetadata,
    pub embedding: Option<Embedding>,
}

/// A not-yet-persisted relationship.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub rel_type: String,
    pub from: String,
    pub to: String,
    pub properties: Properties,
    pub metadata: SystemMetadata,
}

/// Parameters for a vector similarity search, common to entities and documents.
#[derive(Debug, Clone)]
pub struct VectorSearchParams {
    pub query_embedding: Embedding,
    pub limit: usize,
    pub threshold: f32,
    pub scope_id: Option<String>,
    pub contexts: Vec<String>,
    pub valid_at: Option<DateTime<Utc>>,
}

/// Parameters for a bounded k-hop subgraph expansion.
#[derive(Debug, Clone)]
pub struct SubgraphQuery {
    /// Entity labels to seed from when `start_ids` is empty.
    pub labels: Vec<String>,
    /// Relationship-type filter; empty means "all types".
    pub rel_types: Vec<String>,
    /// 1..=10.
    pub max_depth: usize,
    /// Bounds the number of expansion paths explored.
    pub limit: usize,
    /// Explicit seed ids; when present, `labels` is ignored for seeding.
    pub start_ids: Vec<String>,
    pub scope_id: String,
}

/// The deduplicated result of a subgraph expansion: touched entities and relationships.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

/// Filter + pagination parameters shared by the `List*` management operations.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub scope_id: Option<String>,
    pub label_or_type: Option<String>,
    pub contexts: Vec<String>,
    pub limit: usize,
    pub offset: usize,
}

impl ListQuery {
    #[must_use]
    pub fn new(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: Some(scope_id.into()),
            label_or_type: None,
            contexts: Vec::new(),
            limit: 50,
            offset: 0,
        }
    }
}

/// Result of a `Delete*` operation: never throws on a missing id.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub deleted: bool,
    pub message: Option<String>,
}

impl DeleteOutcome {
    #[must_use]
    pub fn deleted() -> Self {
        Self {
            deleted: true,
            message: None,
        }
    }

    #[must_use]
    pub fn not_found(id: &str) -> Self {
        Self {
            deleted: false,
            message: Some(format!("no row with id '{id}'")),
        }
    }
}
