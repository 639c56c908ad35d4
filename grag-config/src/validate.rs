//! ABOUTME: ValidateConfig (C11) — pure function reporting config errors and warnings
//! ABOUTME: Never touches the network; safe to call before `Initialize` (spec.md §6/§7)

use crate::types::GragConfig;

/// Recognized, non-fatal `endpoint` URI schemes. Anything else triggers a warning.
const EXPECTED_SCHEMES: &[&str] = &["ws", "wss", "http", "https"];

/// The outcome of validating a [`GragConfig`]: `valid` is `true` iff `errors`
/// is empty. Warnings never flip `valid` to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a `GragConfig` without touching the network. Reports missing
/// store credentials, missing LLM/embedding keys when those sections are
/// present, and missing scope fields when a scope is provided; warns on an
/// unexpected `endpoint` URI scheme.
#[must_use]
pub fn validate_config(config: &GragConfig) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    validate_store(config, &mut errors, &mut warnings);

    if let Some(embedding) = &config.embedding {
        if embedding.api_key.as_deref().unwrap_or_default().is_empty() {
            errors.push("embedding.api_key is required when an embedding section is configured".to_string());
        }
        if embedding.model.as_deref().unwrap_or_default().is_empty() {
            errors.push("embedding.model is required when an embedding section is configured".to_string());
        }
        if let Some(dims) = embedding.dimensions {
            if dims == 0 {
                errors.push("embedding.dimensions must be greater than zero".to_string());
            }
        }
    }

    if let Some(llm) = &config.llm {
        if llm.api_key.as_deref().unwrap_or_default().is_empty() {
            errors.push("llm.api_key is required when an llm section is configured".to_string());
        }
        if llm.model.as_deref().unwrap_or_default().is_empty() {
            errors.push("llm.model is required when an llm section is configured".to_string());
        }
        if let Some(temp) = llm.temperature {
            if !(0.0..=2.0).contains(&temp) {
                warnings.push(format!("llm.temperature {temp} is outside the conventional 0.0..=2.0 range"));
            }
        }
    }

    if let Some(scope) = &config.scope {
        if scope.id.is_empty() {
            errors.push("scope.id must not be empty".to_string());
        }
        if scope.scope_type.is_empty() {
            errors.push("scope.type must not be empty".to_string());
        }
        if scope.name.is_empty() {
            errors.push("scope.name must not be empty".to_string());
        }
    }

    if !(0.0..=1.0).contains(&config.similarity_threshold) {
        errors.push(format!(
            "similarity_threshold {} must be between 0.0 and 1.0",
            config.similarity_threshold
        ));
    }

    if !["documents", "entities", "both"].contains(&config.strategy.as_str()) {
        errors.push(format!(
            "strategy '{}' must be one of: documents, entities, both",
            config.strategy
        ));
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn validate_store(config: &GragConfig, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let store = &config.store;
    let has_server_shape = store.endpoint.is_some();
    let has_embedded_shape = store.filesystem_path.is_some();

    if !has_server_shape && !has_embedded_shape {
        errors.push(
            "store configuration must supply either `endpoint` (server-style backend) or \
             `filesystem_path` (embedded backend)"
                .to_string(),
        );
        return;
    }

    if has_server_shape {
        let endpoint = store.endpoint.as_deref().unwrap_or_default();
        if store.user.as_deref().unwrap_or_default().is_empty() {
            errors.push("store.user is required for a server-style endpoint".to_string());
        }
        if store.password.as_deref().unwrap_or_default().is_empty() {
            errors.push("store.password is required for a server-style endpoint".to_string());
        }
        if store.database.as_deref().unwrap_or_default().is_empty() {
            errors.push("store.database is required for a server-style endpoint".to_string());
        }

        let scheme = endpoint.split_once("://").map(|(scheme, _)| scheme);
        match scheme {
            Some(s) if EXPECTED_SCHEMES.contains(&s) => {}
            Some(s) => warnings.push(format!("store.endpoint uses an unexpected URI scheme '{s}'")),
            None => warnings.push("store.endpoint has no URI scheme".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmbeddingProviderConfig, LlmProviderConfig, ScopeConfig, StoreConfig};

    fn base_config() -> GragConfig {
        GragConfig {
            store: StoreConfig {
                filesystem_path: Some("/tmp/grag".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn embedded_store_is_sufficient() {
        let report = validate_config(&base_config());
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn missing_store_shape_is_an_error() {
        let config = GragConfig::default();
        let report = validate_config(&config);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("store configuration")));
    }

    #[test]
    fn server_store_requires_credentials() {
        let mut config = base_config();
        config.store.filesystem_path = None;
        config.store.endpoint = Some("ws://localhost:8000".to_string());
        let report = validate_config(&config);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("store.user")));
        assert!(report.errors.iter().any(|e| e.contains("store.password")));
        assert!(report.errors.iter().any(|e| e.contains("store.database")));
    }

    #[test]
    fn unexpected_scheme_is_a_warning_not_an_error() {
        let mut config = base_config();
        config.store.filesystem_path = None;
        config.store.endpoint = Some("ftp://localhost:21".to_string());
        config.store.user = Some("u".to_string());
        config.store.password = Some("p".to_string());
        config.store.database = Some("d".to_string());
        let report = validate_config(&config);
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("unexpected URI scheme")));
    }

    #[test]
    fn embedding_section_without_api_key_is_an_error() {
        let mut config = base_config();
        config.embedding = Some(EmbeddingProviderConfig {
            api_key: None,
            model: Some("text-embedding-3-small".to_string()),
            dimensions: Some(1536),
        });
        let report = validate_config(&config);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("embedding.api_key")));
    }

    #[test]
    fn llm_section_without_model_is_an_error() {
        let mut config = base_config();
        config.llm = Some(LlmProviderConfig {
            api_key: Some("key".to_string()),
            model: None,
            temperature: None,
        });
        let report = validate_config(&config);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("llm.model")));
    }

    #[test]
    fn scope_with_missing_fields_is_an_error() {
        let mut config = base_config();
        config.scope = Some(ScopeConfig {
            id: String::new(),
            scope_type: "tenant".to_string(),
            name: "Acme".to_string(),
            metadata: None,
        });
        let report = validate_config(&config);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("scope.id")));
    }

    #[test]
    fn absent_scope_is_not_an_error() {
        let report = validate_config(&base_config());
        assert!(report.valid);
    }

    #[test]
    fn out_of_range_similarity_threshold_is_an_error() {
        let mut config = base_config();
        config.similarity_threshold = 1.5;
        let report = validate_config(&config);
        assert!(!report.valid);
    }
}
