//! ABOUTME: Context Packer (C9) — deterministic, budget-bounded document-first context serialization
//! ABOUTME: Documents are packed first and get 60% of the character budget; entities/relationships fill the rest

use grag_core::{Document, Entity, Relationship};
use std::collections::{HashMap, HashSet};

/// Hard ceiling on the serialized context's total length, in characters.
pub const MAX_CONTEXT_CHARS: usize = 200_000;

/// Documents receive this fraction of the total budget whenever any document
/// is present.
const DOCUMENT_BUDGET_FRACTION: f64 = 0.6;

const MAX_DOCUMENTS: usize = 10;
const MAX_ENTITIES: usize = 100;
const MAX_RELATIONSHIPS: usize = 200;
const MAX_PROPERTY_VALUE_CHARS: usize = 200;
const MAX_PROPERTIES_PER_ENTITY: usize = 10;

/// Keys every entity line must omit regardless of how many properties it has.
const OMITTED_PROPERTY_KEYS: &[&str] = &["embedding", "_similarity", "scopeId"];

/// Emitted-vs-total counts per section, reported so callers can tell whether
/// the packed context is a full or partial view of the retrieved set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackSummary {
    pub documents_emitted: usize,
    pub documents_total: usize,
    pub entities_emitted: usize,
    pub entities_total: usize,
    pub relationships_emitted: usize,
    pub relationships_total: usize,
}

/// The serialized, budget-bounded context plus its emission summary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedContext {
    pub text: String,
    pub summary: PackSummary,
}

/// Pack documents, entities, and relationships into a single budget-bounded
/// string. Documents are emitted first (up to 60% of the budget when any are
/// present), then entities, then relationships, sharing whatever budget
/// remains.
#[must_use]
pub fn pack(documents: &[Document], entities: &[Entity], relationships: &[Relationship]) -> PackedContext {
    let doc_budget = if documents.is_empty() {
        0
    } else {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let budget = (MAX_CONTEXT_CHARS as f64 * DOCUMENT_BUDGET_FRACTION) as usize;
        budget
    };
    let remaining_budget = MAX_CONTEXT_CHARS - doc_budget;

    let (doc_section, documents_emitted) = pack_documents(documents, doc_budget);

    // Entities and relationships split the remaining budget in emission
    // order: entities first, then whatever is left for relationships.
    let mut used = 0usize;
    let (entity_section, entities_emitted) =
        pack_entities(entities, remaining_budget.saturating_sub(used));
    used += entity_section.len();
    let (rel_section, relationships_emitted) = pack_relationships(
        relationships,
        entities,
        remaining_budget.saturating_sub(used),
    );

    let mut sections = Vec::new();
    if !documents.is_empty() {
        sections.push(format!(
            "=== Documents ({documents_emitted}/{}) ===\n{doc_section}",
            documents.len()
        ));
    }
    if !entities.is_empty() {
        sections.push(format!(
            "=== Entities ({entities_emitted}/{}) ===\n{entity_section}",
            entities.len()
        ));
    }
    if !relationships.is_empty() {
        sections.push(format!(
            "=== Relationships ({relationships_emitted}/{}) ===\n{rel_section}",
            relationships.len()
        ));
    }

    PackedContext {
        text: sections.join("\n\n"),
        summary: PackSummary {
            documents_emitted,
            documents_total: documents.len(),
            entities_emitted,
            entities_total: entities.len(),
            relationships_emitted,
            relationships_total: relationships.len(),
        },
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

fn pack_documents(documents: &[Document], budget: usize) -> (String, usize) {
    let mut out = String::new();
    let mut used = 0usize;
    let mut emitted = 0usize;

    for doc in documents.iter().take(MAX_DOCUMENTS) {
        let separator = if emitted > 0 { "\n\n" } else { "" };
        let overhead = used + separator.len();
        if overhead >= budget {
            break;
        }
        let remaining = budget - overhead;
        if doc.text.chars().count() <= remaining {
            out.push_str(separator);
            out.push_str(&doc.text);
            used += separator.len() + doc.text.len();
            emitted += 1;
        } else if remaining > 3 {
            let truncated = truncate_chars(&doc.text, remaining - 3);
            out.push_str(separator);
            out.push_str(&truncated);
            out.push_str("...");
            emitted += 1;
            break;
        } else {
            break;
        }
    }
    (out, emitted)
}

fn format_property_value(value: &serde_json::Value) -> String {
    let rendered = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_chars(&rendered, MAX_PROPERTY_VALUE_CHARS)
}

fn pack_entities(entities: &[Entity], budget: usize) -> (String, usize) {
    let mut out = String::new();
    let mut used = 0usize;
    let mut emitted = 0usize;

    for entity in entities.iter().take(MAX_ENTITIES) {
        let fields: Vec<String> = entity
            .properties
            .iter()
            .filter(|(k, _)| !OMITTED_PROPERTY_KEYS.contains(&k.as_str()))
            .take(MAX_PROPERTIES_PER_ENTITY)
            .map(|(k, v)| format!("{k}: {}", format_property_value(v)))
            .collect();
        let line = format!("{} ({}): {}\n", entity.label, entity.id, fields.join(", "));
        if used + line.len() > budget {
            break;
        }
        out.push_str(&line);
        used += line.len();
        emitted += 1;
    }
    (out, emitted)
}

fn pack_relationships(relationships: &[Relationship], entities: &[Entity], budget: usize) -> (String, usize) {
    let by_id: HashMap<&str, &Entity> = entities.iter().map(|e| (e.id.as_str(), e)).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = String::new();
    let mut used = 0usize;
    let mut emitted = 0usize;

    for rel in relationships.iter().take(MAX_RELATIONSHIPS) {
        if !seen.insert(rel.id.as_str()) {
            continue;
        }
        let from_label = display_label_owned(&rel.from, &by_id);
        let to_label = display_label_owned(&rel.to, &by_id);
        let line = format!("{from_label} --[{}]--> {to_label}\n", rel.rel_type);
        if used + line.len() > budget {
            break;
        }
        out.push_str(&line);
        used += line.len();
        emitted += 1;
    }
    (out, emitted)
}

fn display_label_owned(id: &str, by_id: &HashMap<&str, &Entity>) -> String {
    by_id.get(id).map_or(id, |e| e.display_name()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use grag_core::SystemMetadata;
    use serde_json::{json, Map};

    fn entity(id: &str, label: &str, name: &str) -> Entity {
        let mut properties = Map::new();
        properties.insert("name".to_string(), json!(name));
        Entity {
            id: id.to_string(),
            label: label.to_string(),
            properties,
            metadata: SystemMetadata::new("scope-1", "c1"),
            embedding: None,
            similarity: None,
        }
    }

    fn document(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            text: text.to_string(),
            metadata: SystemMetadata::new("scope-1", "c1"),
            embedding: None,
            similarity: None,
        }
    }

    fn relationship(id: &str, from: &str, to: &str, rel_type: &str) -> Relationship {
        Relationship {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            properties: Map::new(),
            metadata: SystemMetadata::new("scope-1", "c1"),
        }
    }

    #[test]
    fn documents_precede_entities_precede_relationships() {
        let docs = vec![document("d1", "Alice works at Acme.")];
        let entities = vec![entity("e1", "Person", "Alice")];
        let rels = vec![relationship("r1", "e1", "e1", "SELF")];
        let packed = pack(&docs, &entities, &rels);
        let doc_pos = packed.text.find("=== Documents").unwrap();
        let entity_pos = packed.text.find("=== Entities").unwrap();
        let rel_pos = packed.text.find("=== Relationships").unwrap();
        assert!(doc_pos < entity_pos);
        assert!(entity_pos < rel_pos);
    }

    #[test]
    fn summary_counts_match_emitted_lines() {
        let docs = vec![document("d1", "hello"), document("d2", "world")];
        let entities = vec![entity("e1", "Person", "Alice")];
        let packed = pack(&docs, &entities, &[]);
        assert_eq!(packed.summary.documents_emitted, 2);
        assert_eq!(packed.summary.documents_total, 2);
        assert_eq!(packed.summary.entities_emitted, 1);
    }

    #[test]
    fn total_length_never_exceeds_budget() {
        let huge_text = "x".repeat(MAX_CONTEXT_CHARS * 2);
        let docs = vec![document("d1", &huge_text)];
        let packed = pack(&docs, &[], &[]);
        assert!(packed.text.len() <= MAX_CONTEXT_CHARS);
        assert!(packed.text.ends_with("..."));
    }

    #[test]
    fn entity_line_omits_protected_keys_and_caps_value_length() {
        let mut properties = Map::new();
        properties.insert("name".to_string(), json!("Alice"));
        properties.insert("embedding".to_string(), json!([0.1, 0.2]));
        properties.insert("_similarity".to_string(), json!(0.9));
        properties.insert("scopeId".to_string(), json!("scope-1"));
        properties.insert("bio".to_string(), json!("x".repeat(500)));
        let e = Entity {
            id: "e1".to_string(),
            label: "Person".to_string(),
            properties,
            metadata: SystemMetadata::new("scope-1", "c1"),
            embedding: None,
            similarity: None,
        };
        let (section, emitted) = pack_entities(&[e], MAX_CONTEXT_CHARS);
        assert_eq!(emitted, 1);
        assert!(!section.contains("embedding"));
        assert!(!section.contains("_similarity"));
        assert!(!section.contains("scopeId"));
        assert!(section.contains("bio:"));
    }

    #[test]
    fn relationship_line_uses_display_name() {
        let entities = vec![entity("e1", "Person", "Alice"), entity("e2", "Company", "Acme")];
        let rels = vec![relationship("r1", "e1", "e2", "WORKS_FOR")];
        let packed = pack(&[], &entities, &rels);
        assert!(packed.text.contains("Alice --[WORKS_FOR]--> Acme"));
    }

    #[test]
    fn relationships_deduplicated_by_id() {
        let entities = vec![entity("e1", "Person", "Alice"), entity("e2", "Company", "Acme")];
        let rel = relationship("r1", "e1", "e2", "WORKS_FOR");
        let rels = vec![rel.clone(), rel];
        let packed = pack(&[], &entities, &rels);
        assert_eq!(packed.summary.relationships_emitted, 1);
    }

    #[test]
    fn empty_inputs_produce_empty_context() {
        let packed = pack(&[], &[], &[]);
        assert_eq!(packed.text, "");
        assert_eq!(packed.summary, PackSummary::default());
    }
}
