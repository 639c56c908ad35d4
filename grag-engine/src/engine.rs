//! ABOUTME: GraphRagEngine — the public entry point tying together C1-C11
//! ABOUTME: Holds the process-wide store connection and stateless providers; safe to share across calls

use crate::error::Result;
use crate::types::{AskOptions, AskResult, BatchItem, BatchResult, LearnOptions, LearnResult};
use grag_extract::{ExtractionPromptBuilder, PromptTemplate, PromptTemplateOverride};
use grag_providers::{EmbeddingProvider, LlmProvider};
use grag_store::GraphStore;
use std::sync::Arc;
use tracing::instrument;

/// The engine instance. Cheap to clone (everything is behind an `Arc`);
/// clones share the same store connection.
#[derive(Clone)]
pub struct GraphRagEngine {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) llm: Arc<dyn LlmProvider>,
    pub(crate) prompt_builder: ExtractionPromptBuilder,
    scope_id: Option<String>,
}

impl GraphRagEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        scope_id: Option<String>,
    ) -> Self {
        Self::with_prompt_override(store, embedder, llm, scope_id, PromptTemplateOverride::default())
    }

    #[must_use]
    pub fn with_prompt_override(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        scope_id: Option<String>,
        override_template: PromptTemplateOverride,
    ) -> Self {
        let prompt_builder = ExtractionPromptBuilder::new(override_template.merge_onto(PromptTemplate::default()));
        Self {
            store,
            embedder,
            llm,
            prompt_builder,
            scope_id,
        }
    }

    #[must_use]
    pub fn scope_id(&self) -> Option<&str> {
        self.scope_id.as_deref()
    }

    /// Direct access to the underlying store, for callers that need an
    /// operation the management API does not wrap (e.g. admin tooling).
    #[must_use]
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Acquire the store connection and ensure the vector index exists
    /// (idempotent no-op on backends without native vector support).
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.store.connect().await?;
        self.store.ensure_vector_index().await?;
        Ok(())
    }

    /// Release the store connection. Idempotent.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<()> {
        self.store.disconnect().await?;
        Ok(())
    }

    pub async fn learn(&self, text: impl Into<String>, options: LearnOptions) -> Result<LearnResult> {
        crate::learn::learn(self, text.into(), options).await
    }

    pub async fn learn_batch(
        &self,
        items: Vec<BatchItem>,
        include_embeddings: bool,
        on_progress: Option<&mut crate::batch::ProgressCallback<'_>>,
    ) -> Result<BatchResult> {
        crate::batch::learn_batch(self, items, include_embeddings, on_progress).await
    }

    pub async fn ask(&self, query: impl Into<String>, options: AskOptions) -> Result<AskResult> {
        crate::ask::ask(self, query.into(), options).await
    }
}
