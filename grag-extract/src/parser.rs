//! ABOUTME: Extraction Parser/Validator (C6) — repairs LLM JSON and enforces the typed-graph grammar
//! ABOUTME: Entity schema violations abort the call; relationship issues are dropped with a warning (spec.md §4.C6/§7)

use crate::error::{ExtractError, Result};
use grag_core::{validate_label, validate_relationship_type};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

/// A validated, not-yet-resolved entity extracted from model output. Name
/// references in `relationships` are resolved against these (and existing
/// store entities) by the Learn orchestrator, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    pub label: String,
    pub properties: Map<String, Value>,
}

impl ExtractedEntity {
    /// `name` or `title`, whichever the model populated. Guaranteed present
    /// by [`parse`]'s validation pass.
    #[must_use]
    pub fn identity_name(&self) -> &str {
        self.properties
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| self.properties.get("title").and_then(Value::as_str))
            .unwrap_or_default()
    }
}

/// A validated relationship between two name-references, not yet resolved
/// to store entity ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRelationship {
    pub from: String,
    pub to: String,
    pub rel_type: String,
    pub properties: Map<String, Value>,
}

/// The result of a successful extraction parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub entities: Vec<ExtractedEntity>,
    pub relationships: Vec<ExtractedRelationship>,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    label: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawRelationship {
    from: String,
    to: String,
    #[serde(rename = "type")]
    rel_type: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Strip Markdown code fencing (` ```json ... ``` ` or ` ``` ... ``` `) if present.
fn strip_markdown_fencing(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(stripped) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let stripped = stripped.strip_prefix("json").unwrap_or(stripped);
    let stripped = stripped.strip_prefix('\n').unwrap_or(stripped);
    stripped.strip_suffix("```").unwrap_or(stripped).trim()
}

/// Scan `text` for balanced `{...}` spans and return the largest one. Models
/// sometimes emit prose around the JSON payload; this isolates the object
/// rather than failing outright.
fn isolate_largest_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut stack: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(i),
            b'}' => {
                if let Some(start) = stack.pop() {
                    if stack.is_empty() {
                        let span = (start, i + 1);
                        let better = best.map_or(true, |(s, e)| span.1 - span.0 > e - s);
                        if better {
                            best = Some(span);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(s, e)| &text[s..e])
}

/// Parse and validate a raw LLM extraction response.
///
/// # Errors
/// Returns [`ExtractError::InvalidJson`] when no JSON object can be isolated
/// or parsed, or [`ExtractError::SchemaViolation`] when an entity fails the
/// label grammar or lacks a `name`/`title` identity. Both carry the raw
/// response for diagnostics; per spec.md §4.C6/§7 the caller must abort the
/// enclosing learn without attempting partial writes on either error.
///
/// Relationship-level problems (self-loop, intra-call duplicate, type-grammar
/// violation) are not schema failures: the offending relationship is dropped
/// with a `tracing::warn!` and the call otherwise proceeds.
pub fn parse(raw: &str) -> Result<ExtractionResult> {
    let stripped = strip_markdown_fencing(raw);
    let json_text = isolate_largest_json_object(stripped).ok_or_else(|| ExtractError::InvalidJson {
        raw: raw.to_string(),
        message: "no JSON object found in response".to_string(),
    })?;

    let parsed: RawExtraction = serde_json::from_str(json_text).map_err(|e| ExtractError::InvalidJson {
        raw: raw.to_string(),
        message: e.to_string(),
    })?;

    let mut entities = Vec::with_capacity(parsed.entities.len());
    for raw_entity in parsed.entities {
        validate_label(&raw_entity.label).map_err(|e| ExtractError::SchemaViolation {
            raw: raw.to_string(),
            message: e.to_string(),
        })?;
        let has_identity = raw_entity.properties.contains_key("name")
            || raw_entity.properties.contains_key("title");
        if !has_identity {
            return Err(ExtractError::SchemaViolation {
                raw: raw.to_string(),
                message: format!(
                    "entity with label '{}' has neither a `name` nor a `title` property",
                    raw_entity.label
                ),
            });
        }
        entities.push(ExtractedEntity {
            label: raw_entity.label,
            properties: raw_entity.properties,
        });
    }

    let mut relationships = Vec::with_capacity(parsed.relationships.len());
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    for raw_rel in parsed.relationships {
        if raw_rel.from == raw_rel.to {
            warn!(entity = %raw_rel.from, "dropping self-loop relationship from extraction output");
            continue;
        }
        if let Err(e) = validate_relationship_type(&raw_rel.rel_type) {
            warn!(rel_type = %raw_rel.rel_type, error = %e, "dropping relationship with grammar-violating type");
            continue;
        }
        let key = (raw_rel.from.clone(), raw_rel.to.clone(), raw_rel.rel_type.clone());
        if !seen.insert(key) {
            warn!(
                from = %raw_rel.from,
                to = %raw_rel.to,
                rel_type = %raw_rel.rel_type,
                "dropping intra-call duplicate relationship"
            );
            continue;
        }
        relationships.push(ExtractedRelationship {
            from: raw_rel.from,
            to: raw_rel.to,
            rel_type: raw_rel.rel_type,
            properties: raw_rel.properties,
        });
    }

    Ok(ExtractionResult {
        entities,
        relationships,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &str = r#"{
        "entities": [
            {"label": "Person", "properties": {"name": "Alice"}},
            {"label": "Company", "properties": {"name": "Acme Corp"}}
        ],
        "relationships": [
            {"from": "Alice", "to": "Acme Corp", "type": "WORKS_FOR"}
        ]
    }"#;

    #[test]
    fn parses_well_formed_response() {
        let result = parse(VALID).unwrap();
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.relationships.len(), 1);
        assert_eq!(result.entities[0].identity_name(), "Alice");
    }

    #[test]
    fn strips_markdown_fencing() {
        let fenced = format!("```json\n{VALID}\n```");
        let result = parse(&fenced).unwrap();
        assert_eq!(result.entities.len(), 2);
    }

    #[test]
    fn isolates_json_surrounded_by_prose() {
        let wrapped = format!("Here is the extraction:\n{VALID}\nHope that helps!");
        let result = parse(&wrapped).unwrap();
        assert_eq!(result.entities.len(), 2);
    }

    #[test]
    fn rejects_response_with_no_json() {
        assert!(parse("I cannot comply with that request.").is_err());
    }

    #[test]
    fn rejects_entity_missing_identity() {
        let raw = json!({
            "entities": [{"label": "Person", "properties": {"age": 30}}],
            "relationships": []
        })
        .to_string();
        match parse(&raw) {
            Err(ExtractError::SchemaViolation { .. }) => {}
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_entity_with_lowercase_label() {
        let raw = json!({
            "entities": [{"label": "person", "properties": {"name": "Alice"}}],
            "relationships": []
        })
        .to_string();
        assert!(parse(&raw).is_err());
    }

    #[test]
    fn drops_self_loop_relationship() {
        let raw = json!({
            "entities": [{"label": "Person", "properties": {"name": "Alice"}}],
            "relationships": [{"from": "Alice", "to": "Alice", "type": "KNOWS"}]
        })
        .to_string();
        let result = parse(&raw).unwrap();
        assert!(result.relationships.is_empty());
    }

    #[test]
    fn drops_duplicate_relationships_keeping_first() {
        let raw = json!({
            "entities": [
                {"label": "Person", "properties": {"name": "Alice"}},
                {"label": "Company", "properties": {"name": "Acme"}}
            ],
            "relationships": [
                {"from": "Alice", "to": "Acme", "type": "WORKS_FOR"},
                {"from": "Alice", "to": "Acme", "type": "WORKS_FOR"}
            ]
        })
        .to_string();
        let result = parse(&raw).unwrap();
        assert_eq!(result.relationships.len(), 1);
    }

    #[test]
    fn drops_relationship_with_invalid_type_grammar() {
        let raw = json!({
            "entities": [
                {"label": "Person", "properties": {"name": "Alice"}},
                {"label": "Company", "properties": {"name": "Acme"}}
            ],
            "relationships": [{"from": "Alice", "to": "Acme", "type": "works_for"}]
        })
        .to_string();
        let result = parse(&raw).unwrap();
        assert!(result.relationships.is_empty());
    }
}
