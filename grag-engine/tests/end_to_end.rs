//! End-to-end scenarios from spec.md §8, exercised against the embedded
//! (sled) backend with deterministic offline providers so the whole
//! pipeline runs without network credentials.

use chrono::Duration;
use grag_engine::prelude::*;
use grag_providers::{DeterministicEmbeddingProvider, EmbeddingProvider, ScriptedLlmProvider};
use grag_store::{EmbeddedStore, GraphStore};
use std::sync::Arc;

const EMBEDDING_DIMENSIONS: usize = 16;

fn engine_with_scope(scope_id: &str, llm_responses: Vec<String>) -> GraphRagEngine {
    let path = tempfile::tempdir().expect("tempdir").into_path();
    let store = EmbeddedStore::open(path).expect("open embedded store");
    let embedder = DeterministicEmbeddingProvider::new(EMBEDDING_DIMENSIONS);
    let llm = ScriptedLlmProvider::new(llm_responses);
    GraphRagEngine::new(
        Arc::new(store),
        Arc::new(embedder),
        Arc::new(llm),
        Some(scope_id.to_string()),
    )
}

fn shared_store_engine(store: Arc<EmbeddedStore>, scope_id: &str, llm_responses: Vec<String>) -> GraphRagEngine {
    let embedder = DeterministicEmbeddingProvider::new(EMBEDDING_DIMENSIONS);
    let llm = ScriptedLlmProvider::new(llm_responses);
    GraphRagEngine::new(store, Arc::new(embedder), Arc::new(llm), Some(scope_id.to_string()))
}

/// Deterministic embeddings carry no semantic content, so a test asserting
/// pipeline wiring (rather than retrieval quality) disables the similarity
/// floor to make vector search deterministic regardless of text content.
fn permissive_ask_options() -> AskOptions {
    AskOptions {
        similarity_threshold: 0.0,
        ..AskOptions::default()
    }
}

const ALICE_ACME_EXTRACTION: &str = r#"{
    "entities": [
        {"label": "Person", "properties": {"name": "Alice"}},
        {"label": "Company", "properties": {"name": "Acme Corp"}}
    ],
    "relationships": [
        {"from": "Alice", "to": "Acme Corp", "type": "WORKS_FOR"}
    ]
}"#;

#[tokio::test]
async fn single_learn_single_ask() {
    let engine = engine_with_scope(
        "scope-1",
        vec![
            ALICE_ACME_EXTRACTION.to_string(),
            "Alice works at Acme Corp.".to_string(),
        ],
    );
    engine.initialize().await.unwrap();

    let learn_result = engine
        .learn("Alice works for Acme Corp.", LearnOptions::default())
        .await
        .unwrap();
    assert_eq!(learn_result.created.document, 1);
    assert_eq!(learn_result.entities.len(), 2);
    assert_eq!(learn_result.relationships.len(), 1);
    assert_eq!(learn_result.relationships[0].rel_type, "WORKS_FOR");
    assert!(learn_result.entities.iter().all(|e| e.embedding.is_none()));

    let ask_result = engine
        .ask("Where does Alice work?", permissive_ask_options())
        .await
        .unwrap();
    assert!(ask_result.answer.contains("Acme"));
    assert!(!ask_result.context.entities.is_empty());
}

#[tokio::test]
async fn document_dedup_across_contexts() {
    let text = "Quarterly revenue grew by ten percent.";
    let engine = engine_with_scope(
        "scope-1",
        vec![
            r#"{"entities":[],"relationships":[]}"#.to_string(),
            r#"{"entities":[],"relationships":[]}"#.to_string(),
        ],
    );

    let first = engine
        .learn(
            text,
            LearnOptions {
                context_id: Some("c1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(first.created.document, 1);

    let second = engine
        .learn(
            text,
            LearnOptions {
                context_id: Some("c2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.created.document, 0);
    assert_eq!(first.document.id, second.document.id);

    let stored = engine.find_document(&second.document.id).await.unwrap().unwrap();
    let mut contexts = stored.metadata.context_ids.clone();
    contexts.sort();
    assert_eq!(contexts, vec!["c1".to_string(), "c2".to_string()]);
}

#[tokio::test]
async fn entity_dedup_across_documents() {
    let engine = engine_with_scope(
        "scope-1",
        vec![
            ALICE_ACME_EXTRACTION.to_string(),
            r#"{
                "entities": [
                    {"label": "Person", "properties": {"name": "Alice"}},
                    {"label": "Person", "properties": {"name": "Bob"}}
                ],
                "relationships": [
                    {"from": "Alice", "to": "Bob", "type": "KNOWS"}
                ]
            }"#
            .to_string(),
        ],
    );

    let first = engine
        .learn("Alice works for Acme Corp.", LearnOptions::default())
        .await
        .unwrap();
    let second = engine.learn("Alice knows Bob.", LearnOptions::default()).await.unwrap();

    let alice_first = first.entities.iter().find(|e| e.display_name() == "Alice").unwrap();
    let alice_second = second.entities.iter().find(|e| e.display_name() == "Alice").unwrap();
    assert_eq!(alice_first.id, alice_second.id);

    let bob = second.entities.iter().find(|e| e.display_name() == "Bob").unwrap();
    assert_ne!(bob.id, alice_first.id);

    let bridged_to_first_doc = engine
        .store()
        .entities_for_document(&first.document.id, "scope-1")
        .await
        .unwrap();
    assert!(bridged_to_first_doc.iter().any(|e| e.id == alice_first.id));
    assert!(!bridged_to_first_doc.iter().any(|e| e.id == bob.id));
}

#[tokio::test]
async fn tenant_isolation() {
    let store = Arc::new(EmbeddedStore::open(tempfile::tempdir().unwrap().into_path()).unwrap());

    let tenant_one = shared_store_engine(
        store.clone(),
        "T1",
        vec![r#"{
            "entities": [{"label": "Person", "properties": {"name": "Charlie"}}],
            "relationships": []
        }"#
        .to_string()],
    );
    let tenant_two = shared_store_engine(
        store.clone(),
        "T2",
        vec![
            r#"{
                "entities": [{"label": "Person", "properties": {"name": "Diana"}}],
                "relationships": []
            }"#
            .to_string(),
            "No developers found.".to_string(),
        ],
    );

    tenant_one
        .learn("Charlie is a developer at StartupCo.", LearnOptions::default())
        .await
        .unwrap();
    tenant_two
        .learn("Diana is a manager at BigCorp.", LearnOptions::default())
        .await
        .unwrap();

    let ask_from_tenant_two = tenant_two
        .ask("Who is a developer?", permissive_ask_options())
        .await
        .unwrap();
    assert!(!ask_from_tenant_two
        .context
        .entities
        .iter()
        .any(|e| e.display_name() == "Charlie"));
}

#[tokio::test]
async fn context_filtering_union_semantics() {
    let engine = engine_with_scope(
        "scope-1",
        vec![
            r#"{"entities":[{"label":"Person","properties":{"name":"A"}}],"relationships":[]}"#.to_string(),
            r#"{"entities":[{"label":"Person","properties":{"name":"B"}}],"relationships":[]}"#.to_string(),
            r#"{"entities":[{"label":"Person","properties":{"name":"C"}}],"relationships":[]}"#.to_string(),
        ],
    );

    engine
        .learn(
            "First fact.",
            LearnOptions {
                context_id: Some("c1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine
        .learn(
            "Second fact.",
            LearnOptions {
                context_id: Some("c2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine
        .learn(
            "Third fact.",
            LearnOptions {
                context_id: Some("c3".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let only_c1 = engine
        .list_entities(grag_store::ListQuery {
            contexts: vec!["c1".to_string()],
            ..grag_store::ListQuery::new("scope-1")
        })
        .await
        .unwrap();
    assert_eq!(only_c1.len(), 1);
    assert_eq!(only_c1[0].display_name(), "A");

    let union_c1_c2 = engine
        .list_entities(grag_store::ListQuery {
            contexts: vec!["c1".to_string(), "c2".to_string()],
            ..grag_store::ListQuery::new("scope-1")
        })
        .await
        .unwrap();
    assert_eq!(union_c1_c2.len(), 2);

    let all = engine
        .list_entities(grag_store::ListQuery::new("scope-1"))
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn vector_fallback_respects_threshold_and_scope() {
    let store = Arc::new(EmbeddedStore::open(tempfile::tempdir().unwrap().into_path()).unwrap());
    let embedder = DeterministicEmbeddingProvider::new(EMBEDDING_DIMENSIONS);

    let engine_s = shared_store_engine(
        store.clone(),
        "S",
        vec![r#"{"entities":[{"label":"Person","properties":{"name":"InScope"}}],"relationships":[]}"#.to_string()],
    );
    let engine_other = shared_store_engine(
        store.clone(),
        "OTHER",
        vec![r#"{"entities":[{"label":"Person","properties":{"name":"OutOfScope"}}],"relationships":[]}"#.to_string()],
    );

    engine_s.learn("In scope fact.", LearnOptions::default()).await.unwrap();
    engine_other.learn("Other scope fact.", LearnOptions::default()).await.unwrap();

    let query_embedding = embedder.embed_one("In scope fact.").await.unwrap();
    let hits = store
        .find_entities_by_vector(grag_store::VectorSearchParams {
            query_embedding,
            limit: 10,
            threshold: 0.7,
            scope_id: Some("S".to_string()),
            contexts: Vec::new(),
            valid_at: None,
        })
        .await
        .unwrap();

    assert!(hits.iter().all(|e| e.metadata.scope_id == "S"));
    assert!(hits.iter().all(|e| e.similarity.unwrap_or(0.0) >= 0.7));
}

#[tokio::test]
async fn temporal_filter_excludes_rows_outside_validity_window() {
    let store = EmbeddedStore::open(tempfile::tempdir().unwrap().into_path()).unwrap();
    let embedder = DeterministicEmbeddingProvider::new(EMBEDDING_DIMENSIONS);

    let now = chrono::Utc::now();
    let embedding = embedder.embed_one("A fact that expired last week.").await.unwrap();
    let mut metadata = grag_core::SystemMetadata::new("scope-1", "c1");
    metadata.valid_from = Some(now - Duration::days(14));
    metadata.valid_to = Some(now - Duration::days(7));
    store
        .create_document("A fact that expired last week.".to_string(), metadata, Some(embedding.clone()))
        .await
        .unwrap();

    let still_valid_embedding = embedder.embed_one("A fact that is still valid.").await.unwrap();
    let still_valid_metadata = grag_core::SystemMetadata::new("scope-1", "c1");
    store
        .create_document(
            "A fact that is still valid.".to_string(),
            still_valid_metadata,
            Some(still_valid_embedding.clone()),
        )
        .await
        .unwrap();

    let query_embedding = embedder.embed_one("fact").await.unwrap();
    let hits = store
        .find_documents_by_vector(grag_store::VectorSearchParams {
            query_embedding,
            limit: 10,
            threshold: 0.0,
            scope_id: Some("scope-1".to_string()),
            contexts: Vec::new(),
            valid_at: Some(now),
        })
        .await
        .unwrap();

    assert!(hits.iter().any(|d| d.text == "A fact that is still valid."));
    assert!(!hits.iter().any(|d| d.text == "A fact that expired last week."));
}
