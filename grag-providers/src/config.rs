//! ABOUTME: Provider configuration shared by embedding and LLM providers
//! ABOUTME: Mirrors the teacher's ProviderConfig (name/endpoint/api_key/model/timeout/retries)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for a provider instance. The concrete vendor SDK behind a
/// provider is out of scope for this crate; only the trait-level contract
/// and config shape are modeled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (e.g. "openai", "local-deterministic").
    pub name: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub custom_config: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            endpoint: None,
            api_key: None,
            timeout_secs: Some(30),
            max_retries: Some(3),
            custom_config: HashMap::new(),
        }
    }
}
