//! ABOUTME: Ask Orchestrator / Retrieval Planner (C8) — vector search, doc->entity bridge, subgraph, context pack, answer
//! ABOUTME: Step order follows spec.md §4.C8; the threshold is re-asserted locally regardless of the store's own filtering

use crate::engine::GraphRagEngine;
use crate::error::{EngineError, Result};
use crate::types::{AskContext, AskOptions, AskResult, AskStats, INSUFFICIENT_CONTEXT_ANSWER};
use grag_core::{Document, Entity};
use grag_providers::CompletionRequest;
use grag_store::{SubgraphQuery, VectorSearchParams};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::instrument;

const ANSWER_SYSTEM_PROMPT: &str =
    "You are a precise assistant. Answer the user's question using only the facts in the \
     provided graph context below. If the context does not contain the answer, say so plainly.";
const ANSWER_TEMPERATURE: f32 = 0.2;

#[instrument(skip(engine, query))]
pub(crate) async fn ask(engine: &GraphRagEngine, query: String, options: AskOptions) -> Result<AskResult> {
    if !(1..=10).contains(&options.max_depth) {
        return Err(EngineError::InvalidArgument(format!(
            "maxDepth must be in 1..=10, got {}",
            options.max_depth
        )));
    }
    let scope_id = engine.scope_id().ok_or(EngineError::MissingScope)?.to_string();
    let total_start = Instant::now();

    let query_embedding = engine.embedder.embed_one(&query).await?;

    let search_start = Instant::now();
    let mut passed_documents: Vec<Document> = Vec::new();
    if options.strategy.searches_documents() {
        let params = VectorSearchParams {
            query_embedding: query_embedding.clone(),
            limit: options.limit,
            threshold: options.similarity_threshold,
            scope_id: Some(scope_id.clone()),
            contexts: options.contexts.clone(),
            valid_at: options.valid_at,
        };
        let hits = engine.store.find_documents_by_vector(params).await?;
        passed_documents = hits
            .into_iter()
            .filter(|d| d.similarity.unwrap_or(0.0) >= options.similarity_threshold)
            .collect();
    }

    let mut entities_by_id: HashMap<String, Entity> = HashMap::new();
    if options.strategy.searches_entities() {
        let params = VectorSearchParams {
            query_embedding,
            limit: options.limit,
            threshold: options.similarity_threshold,
            scope_id: Some(scope_id.clone()),
            contexts: options.contexts.clone(),
            valid_at: options.valid_at,
        };
        let hits = engine.store.find_entities_by_vector(params).await?;
        for entity in hits {
            if entity.similarity.unwrap_or(0.0) >= options.similarity_threshold {
                entities_by_id.insert(entity.id.clone(), entity);
            }
        }
    }
    let search_time_ms = elapsed_ms(search_start);

    // Document -> Entity bridge: bridged entities are not re-scored against
    // the threshold (spec.md §4.C8 step 4).
    for document in &passed_documents {
        let bridged = engine.store.entities_for_document(&document.id, &scope_id).await?;
        for entity in bridged {
            entities_by_id.entry(entity.id.clone()).or_insert(entity);
        }
    }

    if passed_documents.is_empty() && entities_by_id.is_empty() {
        let stats = options.include_stats.then(|| AskStats {
            search_time_ms,
            subgraph_time_ms: 0,
            llm_time_ms: 0,
            total_time_ms: elapsed_ms(total_start),
            documents_considered: 0,
            entities_considered: 0,
            strategy: options.strategy,
        });
        return Ok(AskResult {
            answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
            context: AskContext::default(),
            stats,
        });
    }

    let subgraph_start = Instant::now();
    let labels: Vec<String> = entities_by_id
        .values()
        .map(|e| e.label.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let start_ids: Vec<String> = entities_by_id.keys().cloned().collect();

    let subgraph = engine
        .store
        .retrieve_subgraph(SubgraphQuery {
            labels,
            rel_types: Vec::new(),
            max_depth: options.max_depth,
            limit: options.limit,
            start_ids,
            scope_id: scope_id.clone(),
        })
        .await?;
    let subgraph_time_ms = elapsed_ms(subgraph_start);

    for entity in subgraph.entities {
        entities_by_id.entry(entity.id.clone()).or_insert(entity);
    }
    let entities: Vec<Entity> = entities_by_id.into_values().collect();
    let relationships = subgraph.relationships;

    let documents_for_context = if options.strategy.searches_documents() {
        passed_documents.clone()
    } else {
        Vec::new()
    };
    let packed = grag_context::pack(&documents_for_context, &entities, &relationships);

    let llm_start = Instant::now();
    let user_message = format!("Question: {query}\n\nContext:\n{}", packed.text);
    let request = CompletionRequest::new(ANSWER_SYSTEM_PROMPT, user_message, ANSWER_TEMPERATURE);
    let answer = engine.llm.complete(request).await?;
    let llm_time_ms = elapsed_ms(llm_start);

    let documents_considered = documents_for_context.len();
    let entities_considered = entities.len();

    let (entities, relationships, context_documents) = if options.include_embeddings {
        (entities, relationships, documents_for_context)
    } else {
        (
            strip_entity_embeddings(entities),
            relationships,
            strip_document_embeddings(documents_for_context),
        )
    };

    let context = AskContext {
        documents: options
            .strategy
            .searches_documents()
            .then_some(context_documents),
        entities,
        relationships,
    };

    let stats = options.include_stats.then(|| AskStats {
        search_time_ms,
        subgraph_time_ms,
        llm_time_ms,
        total_time_ms: elapsed_ms(total_start),
        documents_considered,
        entities_considered,
        strategy: options.strategy,
    });

    Ok(AskResult { answer, context, stats })
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
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

fn strip_document_embeddings(documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .map(|mut d| {
            d.embedding = None;
            d
        })
        .collect()
}
