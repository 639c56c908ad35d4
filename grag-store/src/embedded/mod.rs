//! ABOUTME: Embedded backend — typed schema over sled, no native vector index
//! ABOUTME: Vector search falls back to the in-memory cosine scan in `crate::fallback`

use crate::error::{Result, StoreError};
use crate::fallback::rank;
use crate::model::{
    DeleteOutcome, ListQuery, NewEntity, NewRelationship, Subgraph, SubgraphQuery, VectorSearchParams,
};
use crate::traits::GraphStore;
use async_trait::async_trait;
use grag_core::{filter_protected_fields, Document, Entity, Properties, Relationship, SystemMetadata};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Three sled trees: documents, entities, relationships. Keyed by id,
/// values are JSON-encoded rows. A single embedded database, no server
/// process, no native vector index.
pub struct EmbeddedStore {
    db: sled::Db,
    documents: sled::Tree,
    entities: sled::Tree,
    relationships: sled::Tree,
    // guards id generation races under concurrent writers; sled itself is
    // thread-safe but the "check identity then insert" sequences here are not.
    write_lock: Arc<Mutex<()>>,
}

impl EmbeddedStore {
    /// Open (or create) a sled database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        let documents = db
            .open_tree("documents")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let entities = db
            .open_tree("entities")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let relationships = db
            .open_tree("relationships")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            db,
            documents,
            entities,
            relationships,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn scan_entities(&self) -> Result<Vec<Entity>> {
        self.entities
            .iter()
            .values()
            .map(|v| {
                let bytes = v.map_err(|e| StoreError::Backend(e.to_string()))?;
                serde_json::from_slice(&bytes).map_err(StoreError::from)
            })
            .collect()
    }

    fn scan_documents(&self) -> Result<Vec<Document>> {
        self.documents
            .iter()
            .values()
            .map(|v| {
                let bytes = v.map_err(|e| StoreError::Backend(e.to_string()))?;
                serde_json::from_slice(&bytes).map_err(StoreError::from)
            })
            .collect()
    }

    fn scan_relationships(&self) -> Result<Vec<Relationship>> {
        self.relationships
            .iter()
            .values()
            .map(|v| {
                let bytes = v.map_err(|e| StoreError::Backend(e.to_string()))?;
                serde_json::from_slice(&bytes).map_err(StoreError::from)
            })
            .collect()
    }

    fn put_entity(&self, entity: &Entity) -> Result<()> {
        let bytes = serde_json::to_vec(entity)?;
        self.entities
            .insert(entity.id.as_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn put_document(&self, document: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(document)?;
        self.documents
            .insert(document.id.as_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn put_relationship(&self, rel: &Relationship) -> Result<()> {
        let bytes = serde_json::to_vec(rel)?;
        self.relationships
            .insert(rel.id.as_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn get_entity(&self, id: &str) -> Result<Option<Entity>> {
        match self.entities.get(id.as_bytes()).map_err(|e| StoreError::Backend(e.to_string()))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_document(&self, id: &str) -> Result<Option<Document>> {
        match self.documents.get(id.as_bytes()).map_err(|e| StoreError::Backend(e.to_string()))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Entity/Document delete cascades incident relationships (spec.md §4.C3).
    /// Must be called while holding `write_lock`.
    fn cascade_delete_incident_relationships(&self, node_id: &str) -> Result<()> {
        for rel in self.scan_relationships()? {
            if rel.from == node_id || rel.to == node_id {
                self.relationships
                    .remove(rel.id.as_bytes())
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for EmbeddedStore {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.db.flush_async().await.map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn ensure_vector_index(&self) -> Result<()> {
        debug!("embedded backend has no native vector index; relying on in-memory cosine fallback");
        Ok(())
    }

    async fn ping(&self) -> Result<bool> {
        // No network hop for an embedded database; liveness reduces to
        // whether the sled handle still answers a trivial read.
        self.db.generate_id().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(true)
    }

    #[instrument(skip(self, metadata, embedding))]
    async fn create_document(
        &self,
        text: String,
        metadata: SystemMetadata,
        embedding: Option<Vec<f32>>,
    ) -> Result<Document> {
        let _guard = self.write_lock.lock();
        if let Some(mut existing) = self
            .scan_documents()?
            .into_iter()
            .find(|d| d.text == text && d.metadata.scope_id == metadata.scope_id)
        {
            let mut merged = false;
            for ctx in &metadata.context_ids {
                merged |= existing.metadata.add_context_id(ctx.clone());
            }
            if merged {
                self.put_document(&existing)?;
            }
            return Ok(existing);
        }
        let doc = Document {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            metadata,
            embedding,
            similarity: None,
        };
        self.put_document(&doc)?;
        Ok(doc)
    }

    async fn find_document_by_text(&self, text: &str, scope_id: &str) -> Result<Option<Document>> {
        Ok(self
            .scan_documents()?
            .into_iter()
            .find(|d| d.text == text && d.metadata.scope_id == scope_id))
    }

    async fn find_document_by_id(&self, id: &str) -> Result<Option<Document>> {
        self.get_document(id)
    }

    async fn update_document_context_ids(&self, id: &str, context_id: &str) -> Result<Document> {
        let _guard = self.write_lock.lock();
        let mut doc = self
            .get_document(id)?
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;
        doc.metadata.add_context_id(context_id.to_string());
        self.put_document(&doc)?;
        Ok(doc)
    }

    async fn update_document(&self, id: &str, mut patch: Properties) -> Result<Document> {
        let _guard = self.write_lock.lock();
        let mut doc = self
            .get_document(id)?
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;
        filter_protected_fields(&mut patch, Document::protected_fields());
        // Document carries no free-form properties bag in the data model;
        // any remaining keys describe text, which is protected, so they are no-ops.
        let _ = patch;
        self.put_document(&doc)?;
        doc.similarity = None;
        Ok(doc)
    }

    async fn delete_document(&self, id: &str) -> Result<DeleteOutcome> {
        let _guard = self.write_lock.lock();
        match self.documents.remove(id.as_bytes()).map_err(|e| StoreError::Backend(e.to_string()))? {
            Some(_) => {
                self.cascade_delete_incident_relationships(id)?;
                Ok(DeleteOutcome::deleted())
            }
            None => Ok(DeleteOutcome::not_found(id)),
        }
    }

    async fn list_documents(&self, query: ListQuery) -> Result<Vec<Document>> {
        let mut rows: Vec<Document> = self
            .scan_documents()?
            .into_iter()
            .filter(|d| query.scope_id.as_deref().map_or(true, |s| d.metadata.scope_id == s))
            .filter(|d| d.metadata.matches_contexts(&query.contexts))
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows.into_iter().skip(query.offset).take(query.limit.max(1)).collect())
    }

    async fn find_documents_by_vector(&self, params: VectorSearchParams) -> Result<Vec<Document>> {
        // The in-memory scan always sees every row; over_fetch_count only
        // bounds what a backend with server-side LIMIT pulls before scoring.
        let rows = self.scan_documents()?;
        let idx = rank(&rows, &params);
        Ok(idx
            .into_iter()
            .map(|i| {
                let mut d = rows[i].clone();
                d.similarity = Some(grag_providers::cosine_similarity(&params.query_embedding, d.embedding.as_deref().unwrap_or(&[])));
                d
            })
            .collect())
    }

    #[instrument(skip(self, entities))]
    async fn create_entities(&self, entities: Vec<NewEntity>) -> Result<Vec<Entity>> {
        let _guard = self.write_lock.lock();
        let mut out = Vec::with_capacity(entities.len());
        for new in entities {
            let identity = new
                .properties
                .get("name")
                .and_then(|v| v.as_str())
                .or_else(|| new.properties.get("title").and_then(|v| v.as_str()))
                .map(str::to_string);

            let existing = identity.as_ref().and_then(|name| {
                self.scan_entities().ok()?.into_iter().find(|e| {
                    e.metadata.scope_id == new.metadata.scope_id && e.identity_name() == Some(name.as_str())
                })
            });

            if let Some(mut existing) = existing {
                for ctx in &new.metadata.context_ids {
                    existing.metadata.add_context_id(ctx.clone());
                }
                self.put_entity(&existing)?;
                out.push(existing);
                continue;
            }

            let entity = Entity {
                id: uuid::Uuid::new_v4().to_string(),
                label: new.label,
                properties: new.properties,
                metadata: new.metadata,
                embedding: new.embedding,
                similarity: None,
            };
            self.put_entity(&entity)?;
            out.push(entity);
        }
        Ok(out)
    }

    async fn find_entity_by_name(&self, name: &str, scope_id: &str) -> Result<Option<Entity>> {
        Ok(self
            .scan_entities()?
            .into_iter()
            .find(|e| e.metadata.scope_id == scope_id && e.identity_name() == Some(name)))
    }

    async fn find_entity_by_id(&self, id: &str) -> Result<Option<Entity>> {
        self.get_entity(id)
    }

    async fn update_entity_context_ids(&self, id: &str, context_id: &str) -> Result<Entity> {
        let _guard = self.write_lock.lock();
        let mut entity = self
            .get_entity(id)?
            .ok_or_else(|| StoreError::EntityNotFound(id.to_string()))?;
        entity.metadata.add_context_id(context_id.to_string());
        self.put_entity(&entity)?;
        Ok(entity)
    }

    async fn update_entity(&self, id: &str, mut patch: Properties) -> Result<Entity> {
        let _guard = self.write_lock.lock();
        let mut entity = self
            .get_entity(id)?
            .ok_or_else(|| StoreError::EntityNotFound(id.to_string()))?;
        filter_protected_fields(&mut patch, Entity::protected_fields());
        for (k, v) in patch {
            entity.properties.insert(k, v);
        }
        self.put_entity(&entity)?;
        entity.similarity = None;
        Ok(entity)
    }

    async fn delete_entity(&self, id: &str) -> Result<DeleteOutcome> {
        let _guard = self.write_lock.lock();
        match self.entities.remove(id.as_bytes()).map_err(|e| StoreError::Backend(e.to_string()))? {
            Some(_) => {
                self.cascade_delete_incident_relationships(id)?;
                Ok(DeleteOutcome::deleted())
            }
            None => Ok(DeleteOutcome::not_found(id)),
        }
    }

    async fn list_entities(&self, query: ListQuery) -> Result<Vec<Entity>> {
        let mut rows: Vec<Entity> = self
            .scan_entities()?
            .into_iter()
            .filter(|e| query.scope_id.as_deref().map_or(true, |s| e.metadata.scope_id == s))
            .filter(|e| query.label_or_type.as_deref().map_or(true, |l| e.label == l))
            .filter(|e| e.metadata.matches_contexts(&query.contexts))
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows.into_iter().skip(query.offset).take(query.limit.max(1)).collect())
    }

    async fn find_entities_by_vector(&self, params: VectorSearchParams) -> Result<Vec<Entity>> {
        let rows = self.scan_entities()?;
        let idx = rank(&rows, &params);
        Ok(idx
            .into_iter()
            .map(|i| {
                let mut e = rows[i].clone();
                e.similarity = Some(grag_providers::cosine_similarity(&params.query_embedding, e.embedding.as_deref().unwrap_or(&[])));
                e
            })
            .collect())
    }

    async fn create_relationships(&self, edges: Vec<NewRelationship>) -> Result<Vec<Relationship>> {
        let _guard = self.write_lock.lock();
        let mut out = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.get_entity(&edge.from)?.is_none() {
                return Err(StoreError::UnresolvedEndpoint(edge.from));
            }
            if self.get_entity(&edge.to)?.is_none() {
                return Err(StoreError::UnresolvedEndpoint(edge.to));
            }
            let existing = self.scan_relationships()?.into_iter().find(|r| {
                r.from == edge.from && r.to == edge.to && r.rel_type == edge.rel_type
            });
            if let Some(mut existing) = existing {
                for ctx in &edge.metadata.context_ids {
                    existing.metadata.add_context_id(ctx.clone());
                }
                for (k, v) in edge.properties {
                    existing.properties.insert(k, v);
                }
                self.put_relationship(&existing)?;
                out.push(existing);
                continue;
            }
            let rel = Relationship {
                id: uuid::Uuid::new_v4().to_string(),
                rel_type: edge.rel_type,
                from: edge.from,
                to: edge.to,
                properties: edge.properties,
                metadata: edge.metadata,
            };
            self.put_relationship(&rel)?;
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
        let edge = NewRelationship {
            rel_type: grag_core::CONTAINS_ENTITY.to_string(),
            from: doc_id.to_string(),
            to: entity_id.to_string(),
            properties: Properties::new(),
            metadata: SystemMetadata::new(scope_id, "_system"),
        };
        // CONTAINS_ENTITY edges link into the documents tree, not entities,
        // so the endpoint check in create_relationships would misfire on `from`.
        let _guard = self.write_lock.lock();
        if self.get_document(doc_id)?.is_none() {
            return Err(StoreError::UnresolvedEndpoint(doc_id.to_string()));
        }
        if self.get_entity(entity_id)?.is_none() {
            return Err(StoreError::UnresolvedEndpoint(entity_id.to_string()));
        }
        if let Some(existing) = self
            .scan_relationships()?
            .into_iter()
            .find(|r| r.from == edge.from && r.to == edge.to && r.rel_type == edge.rel_type)
        {
            return Ok(existing);
        }
        let rel = Relationship {
            id: uuid::Uuid::new_v4().to_string(),
            rel_type: edge.rel_type,
            from: edge.from,
            to: edge.to,
            properties: edge.properties,
            metadata: edge.metadata,
        };
        self.put_relationship(&rel)?;
        Ok(rel)
    }

    async fn find_relationship_by_id(&self, id: &str) -> Result<Option<Relationship>> {
        match self.relationships.get(id.as_bytes()).map_err(|e| StoreError::Backend(e.to_string()))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn update_relationship(&self, id: &str, mut patch: Properties) -> Result<Relationship> {
        let _guard = self.write_lock.lock();
        let mut rel = self
            .find_relationship_by_id(id)
            .await?
            .ok_or_else(|| StoreError::RelationshipNotFound(id.to_string()))?;
        filter_protected_fields(&mut patch, Relationship::protected_fields());
        for (k, v) in patch {
            rel.properties.insert(k, v);
        }
        self.put_relationship(&rel)?;
        Ok(rel)
    }

    async fn delete_relationship(&self, id: &str) -> Result<DeleteOutcome> {
        let _guard = self.write_lock.lock();
        match self
            .relationships
            .remove(id.as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            Some(_) => Ok(DeleteOutcome::deleted()),
            None => Ok(DeleteOutcome::not_found(id)),
        }
    }

    async fn list_relationships(&self, query: ListQuery) -> Result<Vec<Relationship>> {
        let mut rows: Vec<Relationship> = self
            .scan_relationships()?
            .into_iter()
            .filter(|r| query.scope_id.as_deref().map_or(true, |s| r.metadata.scope_id == s))
            .filter(|r| query.label_or_type.as_deref().map_or(true, |t| r.rel_type == t))
            .filter(|r| r.metadata.matches_contexts(&query.contexts))
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows.into_iter().skip(query.offset).take(query.limit.max(1)).collect())
    }

    async fn entities_for_document(&self, doc_id: &str, scope_id: &str) -> Result<Vec<Entity>> {
        let entity_ids: HashSet<String> = self
            .scan_relationships()?
            .into_iter()
            .filter(|r| r.rel_type == grag_core::CONTAINS_ENTITY && r.from == doc_id && r.metadata.scope_id == scope_id)
            .map(|r| r.to)
            .collect();
        Ok(self
            .scan_entities()?
            .into_iter()
            .filter(|e| entity_ids.contains(&e.id))
            .collect())
    }

    async fn retrieve_subgraph(&self, query: SubgraphQuery) -> Result<Subgraph> {
        if !(1..=10).contains(&query.max_depth) {
            return Err(StoreError::InvalidDepth(query.max_depth));
        }
        let all_entities = self.scan_entities()?;
        let all_rels = self.scan_relationships()?;

        let seeds: Vec<String> = if !query.start_ids.is_empty() {
            query.start_ids.clone()
        } else {
            all_entities
                .iter()
                .filter(|e| e.metadata.scope_id == query.scope_id)
                .filter(|e| query.labels.is_empty() || query.labels.contains(&e.label))
                .map(|e| e.id.clone())
                .collect()
        };

        let mut visited: HashSet<String> = seeds.iter().cloned().collect();
        let mut frontier: VecDeque<(String, usize)> = seeds.into_iter().map(|id| (id, 0)).collect();
        let mut touched_rels = Vec::new();

        while let Some((id, depth)) = frontier.pop_front() {
            if depth >= query.max_depth {
                continue;
            }
            for rel in &all_rels {
                if rel.metadata.scope_id != query.scope_id {
                    continue;
                }
                if !query.rel_types.is_empty() && !query.rel_types.contains(&rel.rel_type) {
                    continue;
                }
                let neighbor = if rel.from == id {
                    Some(rel.to.clone())
                } else if rel.to == id {
                    Some(rel.from.clone())
                } else {
                    None
                };
                if let Some(neighbor) = neighbor {
                    touched_rels.push(rel.clone());
                    if visited.insert(neighbor.clone()) {
                        frontier.push_back((neighbor, depth + 1));
                    }
                }
                if touched_rels.len() >= query.limit {
                    break;
                }
            }
            if touched_rels.len() >= query.limit {
                break;
            }
        }

        let entities = all_entities
            .into_iter()
            .filter(|e| visited.contains(&e.id))
            .collect();
        touched_rels.truncate(query.limit);
        Ok(Subgraph {
            entities,
            relationships: touched_rels,
        })
    }
}
