//! # grag-extract
//!
//! The Extraction Prompt Builder (C5) and Extraction Parser/Validator (C6).
//! Composes a deterministic system prompt from a merged ontology template,
//! and repairs/validates the model's JSON response into an
//! [`parser::ExtractionResult`] of name-referenced entities and
//! relationships, ready for the Learn Orchestrator to resolve against store
//! ids.

pub mod error;
pub mod parser;
pub mod prompt;

pub mod prelude {
    pub use crate::error::{ExtractError, Result};
    pub use crate::parser::{parse, ExtractedEntity, ExtractedRelationship, ExtractionResult};
    pub use crate::prompt::{
        EntityTypeSpec, ExtractionPromptBuilder, Ontology, PromptTemplate, PromptTemplateOverride,
        RelationshipTypeSpec, MAX_EXTRACTION_TEMPERATURE,
    };
}

pub use prelude::*;
