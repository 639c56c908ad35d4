//! ABOUTME: Request/response DTOs for Learn, Ask, Batch, and HealthCheck
//! ABOUTME: Kept separate from grag_core::types since these are call-shape, not persisted rows

use chrono::{DateTime, Utc};
use grag_core::{Document, Entity, Relationship};

/// Per-call overrides for `Learn`. `scope_id` is never here: it is taken
/// from the engine instance.
#[derive(Debug, Clone, Default)]
pub struct LearnOptions {
    pub context_id: Option<String>,
    pub context_name: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub include_embeddings: bool,
}

/// Counts of newly created rows for a single `Learn` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreatedCounts {
    /// 0 when the document already existed (dedup hit), 1 when freshly created.
    pub document: usize,
    pub entities: usize,
    pub relationships: usize,
}

/// The result of a single `Learn` call.
#[derive(Debug, Clone)]
pub struct LearnResult {
    pub context_id: String,
    pub context_name: Option<String>,
    pub document: Document,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub summary: String,
    pub created: CreatedCounts,
}

/// Retrieval strategy for `Ask`: which vector indexes to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    Documents,
    Entities,
    #[default]
    Both,
}

impl Strategy {
    #[must_use]
    pub fn searches_documents(self) -> bool {
        matches!(self, Strategy::Documents | Strategy::Both)
    }

    #[must_use]
    pub fn searches_entities(self) -> bool {
        matches!(self, Strategy::Entities | Strategy::Both)
    }
}

/// Per-call options for `Ask`.
#[derive(Debug, Clone)]
pub struct AskOptions {
    pub max_depth: usize,
    pub limit: usize,
    pub contexts: Vec<String>,
    pub strategy: Strategy,
    pub valid_at: Option<DateTime<Utc>>,
    pub similarity_threshold: f32,
    pub include_embeddings: bool,
    pub include_stats: bool,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            limit: 50,
            contexts: Vec::new(),
            strategy: Strategy::Both,
            valid_at: None,
            similarity_threshold: 0.7,
            include_embeddings: false,
            include_stats: false,
        }
    }
}

/// Per-stage timing/count statistics, returned only when `include_stats` is set.
#[derive(Debug, Clone, Default)]
pub struct AskStats {
    pub search_time_ms: u64,
    pub subgraph_time_ms: u64,
    pub llm_time_ms: u64,
    pub total_time_ms: u64,
    pub documents_considered: usize,
    pub entities_considered: usize,
    pub strategy: Strategy,
}

/// The retrieved graph context returned alongside the generated answer.
/// `documents` is `None` when `strategy == Entities`.
#[derive(Debug, Clone, Default)]
pub struct AskContext {
    pub documents: Option<Vec<Document>>,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

/// The result of an `Ask` call.
#[derive(Debug, Clone)]
pub struct AskResult {
    pub answer: String,
    pub context: AskContext,
    pub stats: Option<AskStats>,
}

/// Canned answer returned when no vector hit clears the retrieval threshold.
/// `Ask` never fails open: this is a successful, empty-context response.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I could not find any relevant information to answer your question.";

/// One item of a `LearnBatch` call: either bare text or a per-item record
/// with context/temporal overrides.
#[derive(Debug, Clone)]
pub enum BatchItem {
    Text(String),
    Detailed {
        text: String,
        context_id: Option<String>,
        context_name: Option<String>,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    },
}

impl BatchItem {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            BatchItem::Text(t) => t,
            BatchItem::Detailed { text, .. } => text,
        }
    }

    fn into_learn_options(self, include_embeddings: bool) -> (String, LearnOptions) {
        match self {
            BatchItem::Text(text) => (
                text,
                LearnOptions {
                    include_embeddings,
                    ..Default::default()
                },
            ),
            BatchItem::Detailed {
                text,
                context_id,
                context_name,
                valid_from,
                valid_to,
            } => (
                text,
                LearnOptions {
                    context_id,
                    context_name,
                    valid_from,
                    valid_to,
                    include_embeddings,
                },
            ),
        }
    }
}

pub(crate) fn resolve_batch_item(item: BatchItem, include_embeddings: bool) -> (String, LearnOptions) {
    item.into_learn_options(include_embeddings)
}

/// Progress snapshot pushed to the optional `LearnBatch` callback after every item.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub current_text: String,
    pub estimated_time_remaining_ms: u64,
}

/// A single failed batch item, captured without aborting the remaining items.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub index: usize,
    pub text: String,
    pub error: String,
}

/// Aggregate outcome of a `LearnBatch` call.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub failures: Vec<BatchFailure>,
    pub documents_created: usize,
    pub documents_reused: usize,
    pub entities_created: usize,
    pub relationships_created: usize,
}

/// `HealthCheck` status: degraded when exactly one backend is down,
/// unhealthy when both are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Liveness detail for one backend, with round-trip latency when reachable
/// (grounded in the teacher's `ProviderInstance::validate` pattern; see SPEC_FULL.md §C).
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// The result of a `HealthCheck` call.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub store: BackendHealth,
    pub llm: BackendHealth,
    pub timestamp: DateTime<Utc>,
}
