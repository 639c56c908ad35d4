//! ABOUTME: Server-style backend — embedded SurrealDB (RocksDB engine) with a native MTREE vector index
//! ABOUTME: Schema, record mapping and CRUD pattern grounded on the teacher's SurrealDB backend

use crate::error::{Result, StoreError};
use crate::model::{
    DeleteOutcome, ListQuery, NewEntity, NewRelationship, Subgraph, SubgraphQuery, VectorSearchParams,
};
use crate::traits::GraphStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grag_core::{filter_protected_fields, Document, Entity, Properties, Relationship, SystemMetadata};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;
use tracing::{debug, instrument};

mod record;
use record::{DocumentRecord, EntityRecord, RelationshipRecord};

/// Embedded SurrealDB backend. File-based persistence, one `RocksDB` store
/// per data directory, a native MTREE vector index per node table.
#[derive(Debug, Clone)]
pub struct SurrealStore {
    db: Surreal<Db>,
    data_dir: PathBuf,
    embedding_dims: usize,
}

impl SurrealStore {
    /// Open (or create) a `SurrealDB` store at `data_dir`. `embedding_dims`
    /// sizes the MTREE index and must match the configured embedding provider.
    pub async fn new(data_dir: impl AsRef<Path>, embedding_dims: usize) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let db_path = data_dir.join("grag.db");
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        db.use_ns("grag")
            .use_db("graph")
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let store = Self {
            db,
            data_dir,
            embedding_dims,
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Open a store in a freshly created temp directory. Convenient for tests.
    pub async fn new_temp(embedding_dims: usize) -> Result<Self> {
        let dir = std::env::temp_dir().join(format!("grag-store-{}", uuid::Uuid::new_v4()));
        Self::new(dir, embedding_dims).await
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.db
            .query(
                "DEFINE TABLE IF NOT EXISTS documents SCHEMAFULL;
                 DEFINE FIELD IF NOT EXISTS text ON documents TYPE string;
                 DEFINE FIELD IF NOT EXISTS scope_id ON documents TYPE string;
                 DEFINE FIELD IF NOT EXISTS context_ids ON documents TYPE array<string>;
                 DEFINE FIELD IF NOT EXISTS recorded_at ON documents TYPE datetime;
                 DEFINE FIELD IF NOT EXISTS valid_from ON documents TYPE option<datetime>;
                 DEFINE FIELD IF NOT EXISTS valid_to ON documents TYPE option<datetime>;
                 DEFINE FIELD IF NOT EXISTS embedding ON documents TYPE option<array<float>>;
                 DEFINE INDEX IF NOT EXISTS idx_doc_scope ON documents FIELDS scope_id;",
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        self.db
            .query(
                "DEFINE TABLE IF NOT EXISTS entities SCHEMAFULL;
                 DEFINE FIELD IF NOT EXISTS label ON entities TYPE string;
                 DEFINE FIELD IF NOT EXISTS properties ON entities TYPE object;
                 DEFINE FIELD IF NOT EXISTS scope_id ON entities TYPE string;
                 DEFINE FIELD IF NOT EXISTS context_ids ON entities TYPE array<string>;
                 DEFINE FIELD IF NOT EXISTS recorded_at ON entities TYPE datetime;
                 DEFINE FIELD IF NOT EXISTS valid_from ON entities TYPE option<datetime>;
                 DEFINE FIELD IF NOT EXISTS valid_to ON entities TYPE option<datetime>;
                 DEFINE FIELD IF NOT EXISTS embedding ON entities TYPE option<array<float>>;
                 DEFINE INDEX IF NOT EXISTS idx_entity_label ON entities FIELDS label;
                 DEFINE INDEX IF NOT EXISTS idx_entity_scope ON entities FIELDS scope_id;",
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        self.db
            .query(
                "DEFINE TABLE IF NOT EXISTS relationships SCHEMAFULL;
                 DEFINE FIELD IF NOT EXISTS rel_type ON relationships TYPE string;
                 DEFINE FIELD IF NOT EXISTS from_id ON relationships TYPE string;
                 DEFINE FIELD IF NOT EXISTS to_id ON relationships TYPE string;
                 DEFINE FIELD IF NOT EXISTS properties ON relationships TYPE object;
                 DEFINE FIELD IF NOT EXISTS scope_id ON relationships TYPE string;
                 DEFINE FIELD IF NOT EXISTS context_ids ON relationships TYPE array<string>;
                 DEFINE FIELD IF NOT EXISTS recorded_at ON relationships TYPE datetime;
                 DEFINE FIELD IF NOT EXISTS valid_from ON relationships TYPE option<datetime>;
                 DEFINE FIELD IF NOT EXISTS valid_to ON relationships TYPE option<datetime>;
                 DEFINE INDEX IF NOT EXISTS idx_rel_from ON relationships FIELDS from_id;
                 DEFINE INDEX IF NOT EXISTS idx_rel_to ON relationships FIELDS to_id;
                 DEFINE INDEX IF NOT EXISTS idx_rel_type ON relationships FIELDS rel_type;",
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn ensure_mtree_index(&self) -> Result<()> {
        let dims = self.embedding_dims;
        self.db
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS idx_doc_vec ON documents FIELDS embedding MTREE DIMENSION {dims};
                 DEFINE INDEX IF NOT EXISTS idx_entity_vec ON entities FIELDS embedding MTREE DIMENSION {dims};"
            ))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn vector_search<T, R>(
        &self,
        table: &str,
        params: &VectorSearchParams,
        to_domain: impl Fn(R) -> T,
    ) -> Result<Vec<T>>
    where
        R: for<'de> Deserialize<'de>,
    {
        let mut sql = format!(
            "SELECT *, vector::similarity::cosine(embedding, $query) AS score
             FROM {table}
             WHERE embedding != NONE"
        );
        if params.scope_id.is_some() {
            sql.push_str(" AND scope_id = $scope_id");
        }
        if !params.contexts.is_empty() {
            sql.push_str(" AND context_ids CONTAINSANY $contexts");
        }
        if params.valid_at.is_some() {
            sql.push_str(
                " AND (valid_from <= $valid_at OR valid_from = NONE)
                  AND (valid_to >= $valid_at OR valid_to = NONE)",
            );
        }
        sql.push_str(" AND score >= $threshold ORDER BY score DESC LIMIT $limit");

        let mut query = self
            .db
            .query(sql)
            .bind(("query", params.query_embedding.clone()))
            .bind(("threshold", params.threshold))
            .bind(("limit", params.limit as i64));
        if let Some(scope) = &params.scope_id {
            query = query.bind(("scope_id", scope.clone()));
        }
        if !params.contexts.is_empty() {
            query = query.bind(("contexts", params.contexts.clone()));
        }
        if let Some(valid_at) = params.valid_at {
            query = query.bind(("valid_at", valid_at));
        }

        let mut response = query.await.map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<R> = response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows.into_iter().map(to_domain).collect())
    }

    /// Entity/Document delete cascades incident relationships (spec.md §4.C3).
    async fn cascade_delete_incident_relationships(&self, node_id: &str) -> Result<()> {
        let mut response = self
            .db
            .query("SELECT * FROM relationships WHERE from_id = $id OR to_id = $id")
            .bind(("id", node_id.to_string()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<RelationshipRecord> =
            response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        for row in rows {
            let rel: Relationship = row.into();
            let _: Option<RelationshipRecord> = self
                .db
                .delete(("relationships", rel.id))
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for SurrealStore {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_vector_index(&self) -> Result<()> {
        self.ensure_mtree_index().await
    }

    async fn ping(&self) -> Result<bool> {
        self.db
            .query("RETURN 1")
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(true)
    }

    #[instrument(skip(self, metadata, embedding))]
    async fn create_document(
        &self,
        text: String,
        metadata: SystemMetadata,
        embedding: Option<Vec<f32>>,
    ) -> Result<Document> {
        if let Some(existing) = self.find_document_by_text(&text, &metadata.scope_id).await? {
            let merged_ids: Vec<String> = grag_core::dedup_context_ids(
                existing
                    .metadata
                    .context_ids
                    .iter()
                    .cloned()
                    .chain(metadata.context_ids.iter().cloned()),
            );
            if merged_ids.len() != existing.metadata.context_ids.len() {
                let mut updated = existing.clone();
                updated.metadata.context_ids = merged_ids;
                let record: DocumentRecord = (&updated).into();
                let _: Option<DocumentRecord> = self
                    .db
                    .update(("documents", existing.id.clone()))
                    .content(record)
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                return Ok(updated);
            }
            return Ok(existing);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let doc = Document {
            id: id.clone(),
            text,
            metadata,
            embedding,
            similarity: None,
        };
        let record: DocumentRecord = (&doc).into();
        let _: Option<DocumentRecord> = self
            .db
            .create(("documents", id))
            .content(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(doc)
    }

    async fn find_document_by_text(&self, text: &str, scope_id: &str) -> Result<Option<Document>> {
        let mut response = self
            .db
            .query("SELECT * FROM documents WHERE text = $text AND scope_id = $scope_id LIMIT 1")
            .bind(("text", text.to_string()))
            .bind(("scope_id", scope_id.to_string()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<DocumentRecord> = response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn find_document_by_id(&self, id: &str) -> Result<Option<Document>> {
        let rec: Option<DocumentRecord> = self
            .db
            .select(("documents", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rec.map(Into::into))
    }

    async fn update_document_context_ids(&self, id: &str, context_id: &str) -> Result<Document> {
        let mut doc = self
            .find_document_by_id(id)
            .await?
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;
        doc.metadata.add_context_id(context_id.to_string());
        let record: DocumentRecord = (&doc).into();
        let _: Option<DocumentRecord> = self
            .db
            .update(("documents", id))
            .content(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(doc)
    }

    async fn update_document(&self, id: &str, mut patch: Properties) -> Result<Document> {
        filter_protected_fields(&mut patch, Document::protected_fields());
        // Document has no free-form property bag: any surviving key targets
        // `text`, which is protected, so the patch is inert by construction.
        let _ = patch;
        self.find_document_by_id(id)
            .await?
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))
    }

    async fn delete_document(&self, id: &str) -> Result<DeleteOutcome> {
        let existing: Option<DocumentRecord> = self
            .db
            .select(("documents", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if existing.is_none() {
            return Ok(DeleteOutcome::not_found(id));
        }
        let _: Option<DocumentRecord> = self
            .db
            .delete(("documents", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.cascade_delete_incident_relationships(id).await?;
        Ok(DeleteOutcome::deleted())
    }

    async fn list_documents(&self, query: ListQuery) -> Result<Vec<Document>> {
        let mut sql = "SELECT * FROM documents".to_string();
        let mut clauses = Vec::new();
        if query.scope_id.is_some() {
            clauses.push("scope_id = $scope_id");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id LIMIT $limit START $offset");

        let mut q = self
            .db
            .query(sql)
            .bind(("limit", query.limit.max(1) as i64))
            .bind(("offset", query.offset as i64));
        if let Some(scope) = &query.scope_id {
            q = q.bind(("scope_id", scope.clone()));
        }
        let mut response = q.await.map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<DocumentRecord> = response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(Into::into)
            .filter(|d: &Document| d.metadata.matches_contexts(&query.contexts))
            .collect())
    }

    async fn find_documents_by_vector(&self, params: VectorSearchParams) -> Result<Vec<Document>> {
        self.vector_search("documents", &params, |r: DocumentRecord| {
            let mut d: Document = r.into();
            d.similarity = d
                .embedding
                .as_deref()
                .map(|e| grag_providers::cosine_similarity(&params.query_embedding, e));
            d
        })
        .await
    }

    #[instrument(skip(self, entities))]
    async fn create_entities(&self, entities: Vec<NewEntity>) -> Result<Vec<Entity>> {
        let mut out = Vec::with_capacity(entities.len());
        for new in entities {
            let identity = new
                .properties
                .get("name")
                .and_then(|v| v.as_str())
                .or_else(|| new.properties.get("title").and_then(|v| v.as_str()))
                .map(str::to_string);

            if let Some(name) = &identity {
                if let Some(mut existing) = self.find_entity_by_name(name, &new.metadata.scope_id).await? {
                    let mut changed = false;
                    for ctx in &new.metadata.context_ids {
                        changed |= existing.metadata.add_context_id(ctx.clone());
                    }
                    if changed {
                        let record: EntityRecord = (&existing).into();
                        let _: Option<EntityRecord> = self
                            .db
                            .update(("entities", existing.id.clone()))
                            .content(record)
                            .await
                            .map_err(|e| StoreError::Backend(e.to_string()))?;
                    }
                    out.push(existing);
                    continue;
                }
            }

            let id = uuid::Uuid::new_v4().to_string();
            let entity = Entity {
                id: id.clone(),
                label: new.label,
                properties: new.properties,
                metadata: new.metadata,
                embedding: new.embedding,
                similarity: None,
            };
            let record: EntityRecord = (&entity).into();
            let _: Option<EntityRecord> = self
                .db
                .create(("entities", id))
                .content(record)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            out.push(entity);
        }
        Ok(out)
    }

    async fn find_entity_by_name(&self, name: &str, scope_id: &str) -> Result<Option<Entity>> {
        let mut response = self
            .db
            .query(
                "SELECT * FROM entities WHERE scope_id = $scope_id
                 AND (properties.name = $name OR properties.title = $name) LIMIT 1",
            )
            .bind(("name", name.to_string()))
            .bind(("scope_id", scope_id.to_string()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<EntityRecord> = response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn find_entity_by_id(&self, id: &str) -> Result<Option<Entity>> {
        let rec: Option<EntityRecord> = self
            .db
            .select(("entities", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rec.map(Into::into))
    }

    async fn update_entity_context_ids(&self, id: &str, context_id: &str) -> Result<Entity> {
        let mut entity = self
            .find_entity_by_id(id)
            .await?
            .ok_or_else(|| StoreError::EntityNotFound(id.to_string()))?;
        entity.metadata.add_context_id(context_id.to_string());
        let record: EntityRecord = (&entity).into();
        let _: Option<EntityRecord> = self
            .db
            .update(("entities", id))
            .content(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(entity)
    }

    async fn update_entity(&self, id: &str, mut patch: Properties) -> Result<Entity> {
        let mut entity = self
            .find_entity_by_id(id)
            .await?
            .ok_or_else(|| StoreError::EntityNotFound(id.to_string()))?;
        filter_protected_fields(&mut patch, Entity::protected_fields());
        for (k, v) in patch {
            entity.properties.insert(k, v);
        }
        let record: EntityRecord = (&entity).into();
        let _: Option<EntityRecord> = self
            .db
            .update(("entities", id))
            .content(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        entity.similarity = None;
        Ok(entity)
    }

    async fn delete_entity(&self, id: &str) -> Result<DeleteOutcome> {
        let existing: Option<EntityRecord> = self
            .db
            .select(("entities", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if existing.is_none() {
            return Ok(DeleteOutcome::not_found(id));
        }
        let _: Option<EntityRecord> = self
            .db
            .delete(("entities", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.cascade_delete_incident_relationships(id).await?;
        Ok(DeleteOutcome::deleted())
    }

    async fn list_entities(&self, query: ListQuery) -> Result<Vec<Entity>> {
        let mut sql = "SELECT * FROM entities".to_string();
        let mut clauses = Vec::new();
        if query.scope_id.is_some() {
            clauses.push("scope_id = $scope_id");
        }
        if query.label_or_type.is_some() {
            clauses.push("label = $label");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id LIMIT $limit START $offset");

        let mut q = self
            .db
            .query(sql)
            .bind(("limit", query.limit.max(1) as i64))
            .bind(("offset", query.offset as i64));
        if let Some(scope) = &query.scope_id {
            q = q.bind(("scope_id", scope.clone()));
        }
        if let Some(label) = &query.label_or_type {
            q = q.bind(("label", label.clone()));
        }
        let mut response = q.await.map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<EntityRecord> = response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(Into::into)
            .filter(|e: &Entity| e.metadata.matches_contexts(&query.contexts))
            .collect())
    }

    async fn find_entities_by_vector(&self, params: VectorSearchParams) -> Result<Vec<Entity>> {
        self.vector_search("entities", &params, |r: EntityRecord| {
            let mut e: Entity = r.into();
            e.similarity = e
                .embedding
                .as_deref()
                .map(|v| grag_providers::cosine_similarity(&params.query_embedding, v));
            e
        })
        .await
    }

    async fn create_relationships(&self, edges: Vec<NewRelationship>) -> Result<Vec<Relationship>> {
        let mut out = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.find_entity_by_id(&edge.from).await?.is_none() {
                return Err(StoreError::UnresolvedEndpoint(edge.from));
            }
            if self.find_entity_by_id(&edge.to).await?.is_none() {
                return Err(StoreError::UnresolvedEndpoint(edge.to));
            }

            let mut response = self
                .db
                .query(
                    "SELECT * FROM relationships
                     WHERE from_id = $from AND to_id = $to AND rel_type = $rel_type LIMIT 1",
                )
                .bind(("from", edge.from.clone()))
                .bind(("to", edge.to.clone()))
                .bind(("rel_type", edge.rel_type.clone()))
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let existing: Vec<RelationshipRecord> =
                response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;

            if let Some(record) = existing.into_iter().next() {
                let mut rel: Relationship = record.into();
                for ctx in &edge.metadata.context_ids {
                    rel.metadata.add_context_id(ctx.clone());
                }
                for (k, v) in edge.properties {
                    rel.properties.insert(k, v);
                }
                let record: RelationshipRecord = (&rel).into();
                let _: Option<RelationshipRecord> = self
                    .db
                    .update(("relationships", rel.id.clone()))
                    .content(record)
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                out.push(rel);
                continue;
            }

            let id = uuid::Uuid::new_v4().to_string();
            let rel = Relationship {
                id: id.clone(),
                rel_type: edge.rel_type,
                from: edge.from,
                to: edge.to,
                properties: edge.properties,
                metadata: edge.metadata,
            };
            let record: RelationshipRecord = (&rel).into();
            let _: Option<RelationshipRecord> = self
                .db
                .create(("relationships", id))
                .content(record)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            out.push(rel);
        }
        Ok(out)
    }

    async fn link_entity_to_document(
        &self,
        doc_id: &str,
        entity_id: &str,
        scope_id: &str,
    ) -> Result<Relationship> {
        if self.find_document_by_id(doc_id).await?.is_none() {
            return Err(StoreError::UnresolvedEndpoint(doc_id.to_string()));
        }
        if self.find_entity_by_id(entity_id).await?.is_none() {
            return Err(StoreError::UnresolvedEndpoint(entity_id.to_string()));
        }

        let mut response = self
            .db
            .query(
                "SELECT * FROM relationships
                 WHERE from_id = $from AND to_id = $to AND rel_type = $rel_type LIMIT 1",
            )
            .bind(("from", doc_id.to_string()))
            .bind(("to", entity_id.to_string()))
            .bind(("rel_type", grag_core::CONTAINS_ENTITY.to_string()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let existing: Vec<RelationshipRecord> =
            response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        if let Some(record) = existing.into_iter().next() {
            return Ok(record.into());
        }

        let id = uuid::Uuid::new_v4().to_string();
        let rel = Relationship {
            id: id.clone(),
            rel_type: grag_core::CONTAINS_ENTITY.to_string(),
            from: doc_id.to_string(),
            to: entity_id.to_string(),
            properties: Properties::new(),
            metadata: SystemMetadata::new(scope_id, "_system"),
        };
        let record: RelationshipRecord = (&rel).into();
        let _: Option<RelationshipRecord> = self
            .db
            .create(("relationships", id))
            .content(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rel)
    }

    async fn find_relationship_by_id(&self, id: &str) -> Result<Option<Relationship>> {
        let rec: Option<RelationshipRecord> = self
            .db
            .select(("relationships", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rec.map(Into::into))
    }

    async fn update_relationship(&self, id: &str, mut patch: Properties) -> Result<Relationship> {
        let mut rel = self
            .find_relationship_by_id(id)
            .await?
            .ok_or_else(|| StoreError::RelationshipNotFound(id.to_string()))?;
        filter_protected_fields(&mut patch, Relationship::protected_fields());
        for (k, v) in patch {
            rel.properties.insert(k, v);
        }
        let record: RelationshipRecord = (&rel).into();
        let _: Option<RelationshipRecord> = self
            .db
            .update(("relationships", id))
            .content(record)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rel)
    }

    async fn delete_relationship(&self, id: &str) -> Result<DeleteOutcome> {
        let existing: Option<RelationshipRecord> = self
            .db
            .select(("relationships", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if existing.is_none() {
            return Ok(DeleteOutcome::not_found(id));
        }
        let _: Option<RelationshipRecord> = self
            .db
            .delete(("relationships", id))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(DeleteOutcome::deleted())
    }

    async fn list_relationships(&self, query: ListQuery) -> Result<Vec<Relationship>> {
        let mut sql = "SELECT * FROM relationships".to_string();
        let mut clauses = Vec::new();
        if query.scope_id.is_some() {
            clauses.push("scope_id = $scope_id");
        }
        if query.label_or_type.is_some() {
            clauses.push("rel_type = $rel_type");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id LIMIT $limit START $offset");

        let mut q = self
            .db
            .query(sql)
            .bind(("limit", query.limit.max(1) as i64))
            .bind(("offset", query.offset as i64));
        if let Some(scope) = &query.scope_id {
            q = q.bind(("scope_id", scope.clone()));
        }
        if let Some(rel_type) = &query.label_or_type {
            q = q.bind(("rel_type", rel_type.clone()));
        }
        let mut response = q.await.map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<RelationshipRecord> = response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(Into::into)
            .filter(|r: &Relationship| r.metadata.matches_contexts(&query.contexts))
            .collect())
    }

    async fn entities_for_document(&self, doc_id: &str, scope_id: &str) -> Result<Vec<Entity>> {
        let mut response = self
            .db
            .query(
                "SELECT to_id FROM relationships
                 WHERE from_id = $doc_id AND rel_type = $rel_type AND scope_id = $scope_id",
            )
            .bind(("doc_id", doc_id.to_string()))
            .bind(("rel_type", grag_core::CONTAINS_ENTITY.to_string()))
            .bind(("scope_id", scope_id.to_string()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let rows: Vec<RelationshipRecord> = response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(entity) = self.find_entity_by_id(&row.to_id).await? {
                out.push(entity);
            }
        }
        Ok(out)
    }

    async fn retrieve_subgraph(&self, query: SubgraphQuery) -> Result<Subgraph> {
        if !(1..=10).contains(&query.max_depth) {
            return Err(StoreError::InvalidDepth(query.max_depth));
        }

        let seeds: Vec<String> = if !query.start_ids.is_empty() {
            query.start_ids.clone()
        } else {
            // `ListQuery::label_or_type` only matches a single label; the subgraph
            // seed set may span several, so the label filter is re-applied here.
            self.list_entities(ListQuery {
                scope_id: Some(query.scope_id.clone()),
                label_or_type: None,
                contexts: Vec::new(),
                limit: 10_000,
                offset: 0,
            })
            .await?
            .into_iter()
            .filter(|e| query.labels.is_empty() || query.labels.contains(&e.label))
            .take(query.limit.max(1))
            .map(|e| e.id)
            .collect()
        };

        let mut visited: HashSet<String> = seeds.iter().cloned().collect();
        let mut frontier: std::collections::VecDeque<(String, usize)> =
            seeds.into_iter().map(|id| (id, 0)).collect();
        let mut touched_rels = Vec::new();

        while let Some((id, depth)) = frontier.pop_front() {
            if depth >= query.max_depth || touched_rels.len() >= query.limit {
                continue;
            }
            let mut response = self
                .db
                .query(
                    "SELECT * FROM relationships
                     WHERE scope_id = $scope_id AND (from_id = $id OR to_id = $id)",
                )
                .bind(("scope_id", query.scope_id.clone()))
                .bind(("id", id.clone()))
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let rows: Vec<RelationshipRecord> =
                response.take(0).map_err(|e| StoreError::Backend(e.to_string()))?;
            for row in rows {
                if !query.rel_types.is_empty() && !query.rel_types.contains(&row.rel_type) {
                    continue;
                }
                let rel: Relationship = row.into();
                let neighbor = if rel.from == id { rel.to.clone() } else { rel.from.clone() };
                touched_rels.push(rel);
                if visited.insert(neighbor.clone()) {
                    frontier.push_back((neighbor, depth + 1));
                }
                if touched_rels.len() >= query.limit {
                    break;
                }
            }
        }

        touched_rels.truncate(query.limit);
        let mut entities = Vec::with_capacity(visited.len());
        for id in &visited {
            if let Some(e) = self.find_entity_by_id(id).await? {
                entities.push(e);
            }
        }
        debug!(entities = entities.len(), relationships = touched_rels.len(), "subgraph expanded");
        Ok(Subgraph {
            entities,
            relationships: touched_rels,
        })
    }
}
