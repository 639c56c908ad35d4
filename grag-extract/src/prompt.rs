//! ABOUTME: Extraction Prompt Builder (C5) — composes a deterministic JSON-producing system prompt
//! ABOUTME: from a merged template (defaults overlaid by the caller's partial override)

use grag_providers::CompletionRequest;
use serde::{Deserialize, Serialize};

/// Maximum sampling temperature for extraction calls (spec.md §4.C5).
pub const MAX_EXTRACTION_TEMPERATURE: f32 = 0.3;

/// An allowed entity type in the ontology, with the properties the model
/// should populate for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeSpec {
    pub label: String,
    pub required_properties: Vec<String>,
}

/// An allowed relationship type, constrained to specific endpoint labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipTypeSpec {
    pub rel_type: String,
    pub from_label: String,
    pub to_label: String,
}

/// Optional domain ontology the caller can supply to narrow extraction to a
/// known set of entity/relationship types. When absent, the model is free
/// to choose labels/types subject only to the grammar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ontology {
    pub entity_types: Vec<EntityTypeSpec>,
    pub relationship_types: Vec<RelationshipTypeSpec>,
}

/// A fully (or partially, for caller overrides) specified extraction
/// prompt template. `None` fields in a partial override fall back to the
/// default template's value rather than clearing it — this is a partial
/// overlay merge, not a full replace (spec.md §6 Configuration,
/// `extractionPrompt` partial override).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTemplateOverride {
    pub role: Option<String>,
    pub task: Option<String>,
    pub format_rules: Option<Vec<String>>,
    pub extraction_constraints: Option<Vec<String>>,
    pub semantic_constraints: Option<Vec<String>>,
    pub ontology: Option<Ontology>,
    pub output_format_example: Option<String>,
}

/// The fully resolved template used to render a system prompt.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub role: String,
    pub task: String,
    pub format_rules: Vec<String>,
    pub extraction_constraints: Vec<String>,
    pub semantic_constraints: Vec<String>,
    pub ontology: Ontology,
    pub output_format_example: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            role: "You are a precise knowledge-graph extraction engine.".to_string(),
            task: "Read the text below and extract every named entity and the typed \
                   relationships between them."
                .to_string(),
            format_rules: vec![
                "Respond with a single JSON object and nothing else.".to_string(),
                "Do not wrap the JSON in Markdown code fences.".to_string(),
                "Do not include explanatory prose before or after the JSON.".to_string(),
            ],
            extraction_constraints: vec![
                "Entity labels must be PascalCase, matching ^[A-Z][A-Za-z0-9_]*$ (e.g. Person, Company)."
                    .to_string(),
                "Relationship types must be SCREAMING_SNAKE_CASE, matching ^[A-Z][A-Z0-9_]*$ \
                 (e.g. WORKS_FOR)."
                    .to_string(),
                "Every entity must have a `name` or `title` property identifying it."
                    .to_string(),
                "Reference relationship endpoints by the entity's `name`/`title`, not by a \
                 made-up id."
                    .to_string(),
            ],
            semantic_constraints: vec![
                "Do not invent entities or facts that are not stated or clearly implied by the text."
                    .to_string(),
                "Do not emit a relationship whose `from` and `to` are the same entity.".to_string(),
                "Prefer the most specific entity label that applies.".to_string(),
            ],
            ontology: Ontology::default(),
            output_format_example: r#"{"entities":[{"label":"Person","properties":{"name":"Alice"}}],"relationships":[{"from":"Alice","to":"Acme Corp","type":"WORKS_FOR"}]}"#
                .to_string(),
        }
    }
}

impl PromptTemplateOverride {
    /// Overlay this partial override onto `base`, replacing only the fields
    /// that are `Some`.
    #[must_use]
    pub fn merge_onto(self, base: PromptTemplate) -> PromptTemplate {
        PromptTemplate {
            role: self.role.unwrap_or(base.role),
            task: self.task.unwrap_or(base.task),
            format_rules: self.format_rules.unwrap_or(base.format_rules),
            extraction_constraints: self
                .extraction_constraints
                .unwrap_or(base.extraction_constraints),
            semantic_constraints: self
                .semantic_constraints
                .unwrap_or(base.semantic_constraints),
            ontology: self.ontology.unwrap_or(base.ontology),
            output_format_example: self
                .output_format_example
                .unwrap_or(base.output_format_example),
        }
    }
}

/// Composes the extraction system prompt from a resolved [`PromptTemplate`].
#[derive(Debug, Clone, Default)]
pub struct ExtractionPromptBuilder {
    template: PromptTemplate,
}

impl ExtractionPromptBuilder {
    #[must_use]
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// Build from the default template overlaid by a caller-supplied partial override.
    #[must_use]
    pub fn with_override(overlay: PromptTemplateOverride) -> Self {
        Self::new(overlay.merge_onto(PromptTemplate::default()))
    }

    fn render_system_prompt(&self) -> String {
        let mut sections = Vec::new();
        sections.push(self.template.role.clone());
        sections.push(format!("## Task\n{}", self.template.task));

        sections.push(format!(
            "## Format rules\n{}",
            bullet_list(&self.template.format_rules)
        ));
        sections.push(format!(
            "## Extraction constraints\n{}",
            bullet_list(&self.template.extraction_constraints)
        ));
        sections.push(format!(
            "## Semantic constraints\n{}",
            bullet_list(&self.template.semantic_constraints)
        ));

        if !self.template.ontology.entity_types.is_empty()
            || !self.template.ontology.relationship_types.is_empty()
        {
            sections.push(format!("## Ontology\n{}", render_ontology(&self.template.ontology)));
        }

        sections.push(format!(
            "## Output JSON schema example\n{}",
            self.template.output_format_example
        ));
        sections.join("\n\n")
    }

    /// Compose a `CompletionRequest` for the given source text. Temperature
    /// is clamped to the extraction ceiling (spec.md §4.C5: low, <= 0.3).
    #[must_use]
    pub fn build_request(&self, text: &str, temperature: f32) -> CompletionRequest {
        CompletionRequest::new(
            self.render_system_prompt(),
            text.to_string(),
            temperature.min(MAX_EXTRACTION_TEMPERATURE),
        )
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_ontology(ontology: &Ontology) -> String {
    let mut lines = Vec::new();
    if !ontology.entity_types.is_empty() {
        lines.push("Allowed entity types:".to_string());
        for et in &ontology.entity_types {
            lines.push(format!(
                "- {} (required properties: {})",
                et.label,
                et.required_properties.join(", ")
            ));
        }
    }
    if !ontology.relationship_types.is_empty() {
        lines.push("Allowed relationship types:".to_string());
        for rt in &ontology.relationship_types {
            lines.push(format!(
                "- {} ({} -> {})",
                rt.rel_type, rt.from_label, rt.to_label
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_renders_required_sections() {
        let builder = ExtractionPromptBuilder::new(PromptTemplate::default());
        let req = builder.build_request("Alice works for Acme.", 0.1);
        assert!(req.system.contains("## Format rules"));
        assert!(req.system.contains("## Extraction constraints"));
        assert!(req.system.contains("## Output JSON schema example"));
        assert_eq!(req.user, "Alice works for Acme.");
    }

    #[test]
    fn temperature_is_clamped_to_extraction_ceiling() {
        let builder = ExtractionPromptBuilder::new(PromptTemplate::default());
        let req = builder.build_request("text", 0.9);
        assert!(req.temperature <= MAX_EXTRACTION_TEMPERATURE);
    }

    #[test]
    fn partial_override_preserves_unset_fields() {
        let overlay = PromptTemplateOverride {
            task: Some("Custom task.".to_string()),
            ..Default::default()
        };
        let builder = ExtractionPromptBuilder::with_override(overlay);
        let req = builder.build_request("text", 0.1);
        assert!(req.system.contains("Custom task."));
        assert!(req.system.contains("## Format rules"));
    }

    #[test]
    fn ontology_section_only_appears_when_populated() {
        let builder = ExtractionPromptBuilder::new(PromptTemplate::default());
        let req = builder.build_request("text", 0.1);
        assert!(!req.system.contains("## Ontology"));

        let overlay = PromptTemplateOverride {
            ontology: Some(Ontology {
                entity_types: vec![EntityTypeSpec {
                    label: "Person".to_string(),
                    required_properties: vec!["name".to_string()],
                }],
                relationship_types: vec![],
            }),
            ..Default::default()
        };
        let builder = ExtractionPromptBuilder::with_override(overlay);
        let req = builder.build_request("text", 0.1);
        assert!(req.system.contains("## Ontology"));
        assert!(req.system.contains("Person"));
    }
}
