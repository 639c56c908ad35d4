//! ABOUTME: Configuration section types for the GraphRAG engine (spec.md §6 Configuration)
//! ABOUTME: Deserializable via serde from TOML; ValidateConfig (C11) checks them in `crate::validate`

use grag_extract::PromptTemplateOverride;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where/how the Graph/Vector Store Provider connects. Exactly one of the
/// two shapes is expected: a server-style endpoint (`endpoint`/`user`/
/// `password`/`database`) or an embedded backend (`filesystem_path`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub filesystem_path: Option<String>,
}

/// Embedding provider credentials and shape (C1).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub dimensions: Option<usize>,
}

/// LLM provider credentials and sampling defaults (C2).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

/// The tenant/workspace isolation key for this engine instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScopeConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub scope_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<Value>,
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_strategy() -> String {
    "both".to_string()
}

/// Top-level GraphRAG engine configuration, mirroring spec.md §6's
/// recognized options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GragConfig {
    pub store: StoreConfig,
    pub embedding: Option<EmbeddingProviderConfig>,
    pub llm: Option<LlmProviderConfig>,
    pub scope: Option<ScopeConfig>,
    pub extraction_prompt: Option<PromptTemplateOverride>,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

impl Default for GragConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            embedding: None,
            llm: None,
            scope: None,
            extraction_prompt: None,
            similarity_threshold: default_similarity_threshold(),
            strategy: default_strategy(),
        }
    }
}

impl GragConfig {
    /// Parse a `GragConfig` from TOML text.
    ///
    /// # Errors
    /// Returns [`crate::error::ConfigError::Toml`] on malformed TOML.
    pub fn from_toml(content: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
