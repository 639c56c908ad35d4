//! ABOUTME: The GraphStore trait (C3) — the single capability set every backend must satisfy
//! ABOUTME: Swappable across a server-style backend and an embedded backend (spec.md §9)

use crate::error::Result;
use crate::model::{DeleteOutcome, ListQuery, NewEntity, NewRelationship, Subgraph, VectorSearchParams};
use async_trait::async_trait;
use grag_core::{Document, Entity, Properties, Relationship, SystemMetadata};

/// Graph/vector store provider contract. Both a server-style backend (native
/// vector index) and an embedded backend (typed schema, no vector index,
/// in-memory cosine fallback) implement this trait identically from the
/// caller's point of view.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Establish the backend connection. Idempotent.
    async fn connect(&self) -> Result<()>;

    /// Release the backend connection. Idempotent.
    async fn disconnect(&self) -> Result<()>;

    /// Ensure a vector index exists for both node kinds. Idempotent; a no-op
    /// (not an error) on backends without native vector index support —
    /// those backends rely on the in-memory cosine fallback instead.
    async fn ensure_vector_index(&self) -> Result<()>;

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<bool>;

    // -- Documents ---------------------------------------------------------

    async fn create_document(
        &self,
        text: String,
        metadata: SystemMetadata,
        embedding: Option<Vec<f32>>,
    ) -> Result<Document>;

    async fn find_document_by_text(&self, text: &str, scope_id: &str) -> Result<Option<Document>>;

    async fn find_document_by_id(&self, id: &str) -> Result<Option<Document>>;

    async fn update_document_context_ids(&self, id: &str, context_id: &str) -> Result<Document>;

    async fn update_document(&self, id: &str, patch: Properties) -> Result<Document>;

    async fn delete_document(&self, id: &str) -> Result<DeleteOutcome>;

    async fn list_documents(&self, query: ListQuery) -> Result<Vec<Document>>;

    async fn find_documents_by_vector(&self, params: VectorSearchParams) -> Result<Vec<Document>>;

    // -- Entities ------------------------------------------------------------

    async fn create_entities(&self, entities: Vec<NewEntity>) -> Result<Vec<Entity>>;

    async fn find_entity_by_name(&self, name: &str, scope_id: &str) -> Result<Option<Entity>>;

    async fn find_entity_by_id(&self, id: &str) -> Result<Option<Entity>>;

    async fn update_entity_context_ids(&self, id: &str, context_id: &str) -> Result<Entity>;

    async fn update_entity(&self, id: &str, patch: Properties) -> Result<Entity>;

    async fn delete_entity(&self, id: &str) -> Result<DeleteOutcome>;

    async fn list_entities(&self, query: ListQuery) -> Result<Vec<Entity>>;

    async fn find_entities_by_vector(&self, params: VectorSearchParams) -> Result<Vec<Entity>>;

    // -- Relationships ---------------------------------------------------------

    /// Rejects endpoints not resolvable in-scope; MERGE-semantics on `(from, to, type)`.
    async fn create_relationships(&self, edges: Vec<NewRelationship>) -> Result<Vec<Relationship>>;

    /// MERGE of the reserved `CONTAINS_ENTITY` edge type.
    async fn link_entity_to_document(
        &self,
        doc_id: &str,
        entity_id: &str,
        scope_id: &str,
    ) -> Result<Relationship>;

    async fn find_relationship_by_id(&self, id: &str) -> Result<Option<Relationship>>;

    async fn update_relationship(&self, id: &str, patch: Properties) -> Result<Relationship>;

    async fn delete_relationship(&self, id: &str) -> Result<DeleteOutcome>;

    async fn list_relationships(&self, query: ListQuery) -> Result<Vec<Relationship>>;

    /// Entities reachable from a document via `CONTAINS_ENTITY`, scope-bound.
    async fn entities_for_document(&self, doc_id: &str, scope_id: &str) -> Result<Vec<Entity>>;

    // -- Subgraph ---------------------------------------------------------

    /// Undirected k-hop expansion, scope-filtered on both endpoints and
    /// edges, bounded by `limit` paths. `max_depth` in `1..=10`.
    async fn retrieve_subgraph(&self, query: crate::model::SubgraphQuery) -> Result<Subgraph>;
}
