//! ABOUTME: Management API (C11) — find/list/update/delete pass-throughs, HealthCheck
//! ABOUTME: ValidateConfig itself is a pure function and lives in grag_config; see crate::prelude re-export

use crate::engine::GraphRagEngine;
use crate::error::Result;
use crate::types::{BackendHealth, HealthCheckResult, HealthStatus};
use chrono::Utc;
use grag_core::{Document, Entity, Properties, Relationship};
use grag_store::{DeleteOutcome, ListQuery};
use std::time::Instant;
use tracing::instrument;

impl GraphRagEngine {
    pub async fn find_entity(&self, id: &str) -> Result<Option<Entity>> {
        Ok(self.store.find_entity_by_id(id).await?)
    }

    pub async fn find_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.store.find_document_by_id(id).await?)
    }

    pub async fn find_relationship(&self, id: &str) -> Result<Option<Relationship>> {
        Ok(self.store.find_relationship_by_id(id).await?)
    }

    pub async fn list_entities(&self, query: ListQuery) -> Result<Vec<Entity>> {
        Ok(self.store.list_entities(query).await?)
    }

    pub async fn list_documents(&self, query: ListQuery) -> Result<Vec<Document>> {
        Ok(self.store.list_documents(query).await?)
    }

    pub async fn list_relationships(&self, query: ListQuery) -> Result<Vec<Relationship>> {
        Ok(self.store.list_relationships(query).await?)
    }

    /// Protected fields (`text`, `label`/`type`/`from`/`to`, scope/temporal/embedding/id) are
    /// silently dropped from `patch` before the update is applied (spec.md §4.C3).
    pub async fn update_entity(&self, id: &str, mut patch: Properties) -> Result<Entity> {
        grag_core::filter_protected_fields(&mut patch, Entity::protected_fields());
        Ok(self.store.update_entity(id, patch).await?)
    }

    pub async fn update_document(&self, id: &str, mut patch: Properties) -> Result<Document> {
        grag_core::filter_protected_fields(&mut patch, Document::protected_fields());
        Ok(self.store.update_document(id, patch).await?)
    }

    pub async fn update_relationship(&self, id: &str, mut patch: Properties) -> Result<Relationship> {
        grag_core::filter_protected_fields(&mut patch, Relationship::protected_fields());
        Ok(self.store.update_relationship(id, patch).await?)
    }

    pub async fn delete_entity(&self, id: &str) -> Result<DeleteOutcome> {
        Ok(self.store.delete_entity(id).await?)
    }

    pub async fn delete_document(&self, id: &str) -> Result<DeleteOutcome> {
        Ok(self.store.delete_document(id).await?)
    }

    pub async fn delete_relationship(&self, id: &str) -> Result<DeleteOutcome> {
        Ok(self.store.delete_relationship(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthCheckResult {
        let store = probe_store(self).await;
        let llm = probe_llm(self).await;

        let status = match (store.connected, llm.connected) {
            (true, true) => HealthStatus::Healthy,
            (false, false) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };

        HealthCheckResult {
            status,
            store,
            llm,
            timestamp: Utc::now(),
        }
    }
}

async fn probe_store(engine: &GraphRagEngine) -> BackendHealth {
    let start = Instant::now();
    match engine.store.ping().await {
        Ok(true) => BackendHealth {
            connected: true,
            latency_ms: Some(elapsed_ms(start)),
        },
        _ => BackendHealth::default(),
    }
}

async fn probe_llm(engine: &GraphRagEngine) -> BackendHealth {
    use grag_providers::CompletionRequest;
    let start = Instant::now();
    let probe = CompletionRequest::new("ping", "ping", 0.0);
    match engine.llm.complete(probe).await {
        Ok(_) => BackendHealth {
            connected: true,
            latency_ms: Some(elapsed_ms(start)),
        },
        Err(_) => BackendHealth::default(),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
