//! ABOUTME: Entity, Document, Relationship, Scope and the system-metadata envelope
//! ABOUTME: These are the nodes/edges persisted by the Graph/Vector Store Provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::error::{CoreError, Result};

/// A fixed-length embedding vector.
pub type Embedding = Vec<f32>;

/// Bag of arbitrary, JSON-typed properties (string, number, bool, list, nested map).
pub type Properties = Map<String, Value>;

/// System metadata stamped by C4 onto every stored node and edge.
///
/// `context_ids` has set semantics: duplicates are never stored, and order is
/// not a stable API guarantee (callers must compare as sets).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemMetadata {
    pub scope_id: String,
    pub context_ids: Vec<String>,
    pub recorded_at: DateTime<Utc>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl SystemMetadata {
    /// Stamp fresh metadata for a brand-new node/edge.
    #[must_use]
    pub fn new(scope_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            context_ids: vec![context_id.into()],
            recorded_at: Utc::now(),
            valid_from: None,
            valid_to: None,
        }
    }

    /// Stamp metadata with explicit validity bounds.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidTemporalRange`] when both bounds are set
    /// and `valid_from > valid_to`.
    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if let (Some(from), Some(to)) = (valid_from, valid_to) {
            if from > to {
                return Err(CoreError::InvalidTemporalRange {
                    valid_from: from.to_rfc3339(),
                    valid_to: to.to_rfc3339(),
                });
            }
        }
        self.valid_from = valid_from;
        self.valid_to = valid_to;
        Ok(self)
    }

    /// Set-add a context tag, deduplicating. Returns `true` if it was newly added.
    pub fn add_context_id(&mut self, context_id: impl Into<String>) -> bool {
        let context_id = context_id.into();
        if self.context_ids.iter().any(|c| c == &context_id) {
            false
        } else {
            self.context_ids.push(context_id);
            true
        }
    }

    /// Whether this row qualifies under a non-empty `contexts` filter (union semantics).
    /// Tagless rows never qualify once a filter is supplied (spec §4.C3 contexts policy).
    #[must_use]
    pub fn matches_contexts(&self, contexts: &[String]) -> bool {
        if contexts.is_empty() {
            return true;
        }
        self.context_ids.iter().any(|c| contexts.contains(c))
    }

    /// Whether this row is valid at the given instant per spec §4.C3 temporal filter.
    #[must_use]
    pub fn valid_at(&self, at: DateTime<Utc>) -> bool {
        let from_ok = self.valid_from.map_or(true, |from| from <= at);
        let to_ok = self.valid_to.map_or(true, |to| to >= at);
        from_ok && to_ok
    }
}

/// A typed node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    /// PascalCase label, e.g. `Person`, `Company`.
    pub label: String,
    pub properties: Properties,
    pub metadata: SystemMetadata,
    pub embedding: Option<Embedding>,
    /// Transient cosine similarity attached by vector search. Never persisted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub similarity: Option<f32>,
}

impl Entity {
    /// Best-available human-readable name: `name`, then `title`, then the label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| self.properties.get("title").and_then(Value::as_str))
            .unwrap_or(&self.label)
    }

    /// Identity key used for dedup-by-name: `name` or `title`, whichever is present.
    #[must_use]
    pub fn identity_name(&self) -> Option<&str> {
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| self.properties.get("title").and_then(Value::as_str))
    }

    /// Protected fields that `UpdateEntity` must silently drop.
    #[must_use]
    pub fn protected_fields() -> &'static [&'static str] {
        &[
            "_recordedAt",
            "_validFrom",
            "_validTo",
            "scopeId",
            "contextIds",
            "embedding",
            "id",
            "label",
        ]
    }
}

/// A canonical source-text node. Identity within a scope is its exact text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: SystemMetadata,
    pub embedding: Option<Embedding>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub similarity: Option<f32>,
}

impl Document {
    pub const LABEL: &'static str = "Document";

    /// Protected fields that `UpdateDocument` must silently drop.
    #[must_use]
    pub fn protected_fields() -> &'static [&'static str] {
        &[
            "_recordedAt",
            "_validFrom",
            "_validTo",
            "scopeId",
            "contextIds",
            "embedding",
            "id",
            "text",
        ]
    }
}

/// A directed, typed edge between two Entities (or a Document -> Entity
/// `CONTAINS_ENTITY` link).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    /// SCREAMING_SNAKE_CASE type, e.g. `WORKS_FOR`.
    pub rel_type: String,
    pub from: String,
    pub to: String,
    pub properties: Properties,
    pub metadata: SystemMetadata,
}

impl Relationship {
    /// Protected fields that `UpdateRelationship` must silently drop.
    #[must_use]
    pub fn protected_fields() -> &'static [&'static str] {
        &[
            "_recordedAt",
            "_validFrom",
            "_validTo",
            "scopeId",
            "id",
            "type",
            "from",
            "to",
        ]
    }

    /// Uniqueness key within a scope: `(from, to, type)`.
    #[must_use]
    pub fn dedup_key(&self) -> (String, String, String) {
        (self.from.clone(), self.to.clone(), self.rel_type.clone())
    }
}

/// External tenant/workspace isolation key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: String,
    pub scope_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<Value>,
}

/// Drop protected keys from an update patch in place, returning the keys that were dropped.
pub fn filter_protected_fields(patch: &mut Properties, protected: &[&str]) -> Vec<String> {
    let mut dropped = Vec::new();
    for key in protected {
        if patch.remove(*key).is_some() {
            dropped.push((*key).to_string());
        }
    }
    dropped
}

/// Deduplicate a list of context ids while tolerating arbitrary ordering.
#[must_use]
pub fn dedup_context_ids(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let set: BTreeSet<String> = ids.into_iter().collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_context_id_is_idempotent() {
        let mut meta = SystemMetadata::new("scope-1", "c1");
        assert!(!meta.add_context_id("c1"));
        assert!(meta.add_context_id("c2"));
        assert_eq!(meta.context_ids, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn temporal_validity_rejects_inverted_range() {
        let meta = SystemMetadata::new("scope-1", "c1");
        let later = Utc::now();
        let earlier = later - chrono::Duration::days(1);
        assert!(meta.with_validity(Some(later), Some(earlier)).is_err());
    }

    #[test]
    fn contexts_filter_excludes_tagless_rows_when_filter_present() {
        let meta = SystemMetadata {
            scope_id: "s".into(),
            context_ids: vec![],
            recorded_at: Utc::now(),
            valid_from: None,
            valid_to: None,
        };
        assert!(meta.matches_contexts(&[]));
        assert!(!meta.matches_contexts(&["c1".to_string()]));
    }

    #[test]
    fn protected_fields_are_dropped_from_patch() {
        let mut patch: Properties = Map::new();
        patch.insert("name".into(), json!("new name"));
        patch.insert("text".into(), json!("rewritten"));
        let dropped = filter_protected_fields(&mut patch, Document::protected_fields());
        assert_eq!(dropped, vec!["text".to_string()]);
        assert!(patch.contains_key("name"));
        assert!(!patch.contains_key("text"));
    }
}
