//! ABOUTME: Learn Orchestrator (C7) — document dedup, extraction, entity dedup, linking, relationship creation
//! ABOUTME: A failure before a write leaves nothing partially written; extraction runs before any entity/relationship write

use crate::engine::GraphRagEngine;
use crate::error::{EngineError, Result};
use crate::metadata::MetadataStamper;
use crate::types::{CreatedCounts, LearnOptions, LearnResult};
use grag_core::{Entity, Relationship};
use grag_extract::{parse, ExtractedEntity, MAX_EXTRACTION_TEMPERATURE};
use grag_store::{NewEntity, NewRelationship};
use std::collections::HashMap;
use tracing::{instrument, warn};

const CANONICAL_TEXT_MAX_PROPERTIES: usize = 3;

#[instrument(skip(engine, text), fields(text_len = text.len()))]
pub(crate) async fn learn(engine: &GraphRagEngine, text: String, options: LearnOptions) -> Result<LearnResult> {
    let scope_id = engine.scope_id().ok_or(EngineError::MissingScope)?.to_string();

    let (metadata, context_id) = MetadataStamper::stamp(
        scope_id.clone(),
        options.context_id.clone(),
        options.valid_from,
        options.valid_to,
    )?;

    let (document, document_created) = match engine.store.find_document_by_text(&text, &scope_id).await? {
        Some(existing) => {
            let updated = engine.store.update_document_context_ids(&existing.id, &context_id).await?;
            (updated, false)
        }
        None => {
            let embedding = engine.embedder.embed_one(&text).await?;
            let created = engine
                .store
                .create_document(text.clone(), metadata.clone(), Some(embedding))
                .await?;
            (created, true)
        }
    };

    // Extraction runs unconditionally; abort before any entity/relationship
    // write if the model output does not parse.
    let request = engine.prompt_builder.build_request(&text, MAX_EXTRACTION_TEMPERATURE);
    let raw_response = engine.llm.complete(request).await?;
    let extraction = parse(&raw_response)?;

    let mut name_to_id: HashMap<String, String> = HashMap::new();
    let mut entities = Vec::with_capacity(extraction.entities.len());
    let mut entities_created = 0usize;

    for extracted in &extraction.entities {
        let identity = extracted.identity_name().to_string();
        let entity = match engine.store.find_entity_by_name(&identity, &scope_id).await? {
            Some(existing) => {
                engine
                    .store
                    .update_entity_context_ids(&existing.id, &context_id)
                    .await?
            }
            None => {
                let canonical = canonical_entity_text(extracted);
                let embedding = engine.embedder.embed_one(&canonical).await?;
                let new_entity = NewEntity {
                    label: extracted.label.clone(),
                    properties: extracted.properties.clone(),
                    metadata: metadata.clone(),
                    embedding: Some(embedding),
                };
                let mut created = engine.store.create_entities(vec![new_entity]).await?;
                entities_created += 1;
                created.pop().ok_or_else(|| {
                    EngineError::InvalidArgument("store returned no entity for a one-item create".to_string())
                })?
            }
        };
        name_to_id.insert(identity, entity.id.clone());
        entities.push(entity);
    }

    for entity in &entities {
        if let Err(err) = engine
            .store
            .link_entity_to_document(&document.id, &entity.id, &scope_id)
            .await
        {
            warn!(entity_id = %entity.id, document_id = %document.id, error = %err, "swallowing CONTAINS_ENTITY link failure");
        }
    }

    let mut seen: std::collections::HashSet<(String, String, String)> = std::collections::HashSet::new();
    let mut new_relationships = Vec::with_capacity(extraction.relationships.len());
    for rel in &extraction.relationships {
        let Some(from_id) = name_to_id.get(&rel.from) else {
            warn!(name = %rel.from, "dropping relationship with unresolved `from` endpoint");
            continue;
        };
        let Some(to_id) = name_to_id.get(&rel.to) else {
            warn!(name = %rel.to, "dropping relationship with unresolved `to` endpoint");
            continue;
        };
        if from_id == to_id {
            warn!(entity_id = %from_id, "dropping self-loop relationship after name resolution");
            continue;
        }
        let key = (from_id.clone(), to_id.clone(), rel.rel_type.clone());
        if !seen.insert(key) {
            warn!(from = %from_id, to = %to_id, rel_type = %rel.rel_type, "dropping intra-call duplicate relationship");
            continue;
        }
        new_relationships.push(NewRelationship {
            rel_type: rel.rel_type.clone(),
            from: from_id.clone(),
            to: to_id.clone(),
            properties: rel.properties.clone(),
            metadata: metadata.clone(),
        });
    }

    let relationships: Vec<Relationship> = if new_relationships.is_empty() {
        Vec::new()
    } else {
        engine.store.create_relationships(new_relationships).await?
    };

    let summary = format!(
        "learned {} entities and {} relationships from {} characters of text",
        entities.len(),
        relationships.len(),
        text.len()
    );

    let created = CreatedCounts {
        document: usize::from(document_created),
        entities: entities_created,
        relationships: relationships.len(),
    };

    let (document, entities) = if options.include_embeddings {
        (document, entities)
    } else {
        (strip_document_embedding(document), strip_entity_embeddings(entities))
    };

    Ok(LearnResult {
        context_id,
        context_name: options.context_name,
        document,
        entities,
        relationships,
        summary,
        created,
    })
}

fn canonical_entity_text(extracted: &ExtractedEntity) -> String {
    let mut parts = vec![extracted.label.clone(), extracted.identity_name().to_string()];
    if let Some(description) = extracted.properties.get("description").and_then(|v| v.as_str()) {
        parts.push(description.to_string());
    }
    let mut scalar_count = 0usize;
    for (key, value) in &extracted.properties {
        if scalar_count >= CANONICAL_TEXT_MAX_PROPERTIES {
            break;
        }
        if key == "name" || key == "title" || key == "description" {
            continue;
        }
        if let Some(scalar) = scalar_as_str(value) {
            parts.push(format!("{key}: {scalar}"));
            scalar_count += 1;
        }
    }
    parts.join(". ")
}

fn scalar_as_str(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn strip_document_embedding(mut document: grag_core::Document) -> grag_core::Document {
    document.embedding = None;
    document
}

fn strip_entity_embeddings(entities: Vec<Entity>) -> Vec<Entity> {
    entities
        .into_iter()
        .map(|mut e| {
            e.embedding = None;
            e
        })
        .collect()
}
