//! ABOUTME: LLM provider trait (C2) and test/offline implementations
//! ABOUTME: Concrete vendor SDKs (OpenAI, Anthropic, ...) are out of scope; see SPEC_FULL.md

use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

/// A single LLM completion request: system + user message and a sampling
/// temperature. No streaming, no tool-calling, no conversation memory
/// (spec.md §9 Design notes).
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

/// LLM completion provider, vendor-agnostic.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a completion and return the model's raw text response.
    ///
    /// # Errors
    /// Returns [`ProviderError::Llm`] if the backend call fails.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Provider name, for error messages and logging.
    fn name(&self) -> &str;
}

/// Returns a fixed, canned response regardless of input. Used as the Ask
/// path's answer generator when no network-backed provider is configured.
#[derive(Debug, Clone)]
pub struct DeterministicLlmProvider {
    name: String,
}

impl DeterministicLlmProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "deterministic".to_string(),
        }
    }
}

impl Default for DeterministicLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for DeterministicLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        debug!(chars = request.user.len(), "deterministic completion");
        Ok(format!(
            "Based on the provided context, here is a summary derived from {} characters of input.",
            request.user.len()
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Returns a queue of pre-scripted responses, one per call, in FIFO order.
/// Grounded in the spec's "Extraction determinism harness" testable
/// property: a stubbed LLM that returns fixed JSON.
pub struct ScriptedLlmProvider {
    name: String,
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedLlmProvider {
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: "scripted".to_string(),
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<String> {
        let mut queue = self.responses.lock().await;
        queue.pop_front().ok_or_else(|| ProviderError::Llm {
            provider: self.name.clone(),
            message: "scripted provider exhausted its response queue".to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_provider_returns_in_order() {
        let provider = ScriptedLlmProvider::new(vec!["first".to_string(), "second".to_string()]);
        let req = CompletionRequest::new("sys", "user", 0.0);
        assert_eq!(provider.complete(req.clone()).await.unwrap(), "first");
        assert_eq!(provider.complete(req).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn scripted_provider_errors_when_exhausted() {
        let provider = ScriptedLlmProvider::new(Vec::<String>::new());
        let req = CompletionRequest::new("sys", "user", 0.0);
        assert!(provider.complete(req).await.is_err());
    }

    #[tokio::test]
    async fn deterministic_provider_always_succeeds() {
        let provider = DeterministicLlmProvider::new();
        let req = CompletionRequest::new("sys", "hello", 0.2);
        assert!(provider.complete(req).await.is_ok());
    }
}
