//! ABOUTME: Label and relationship-type grammar validation
//! ABOUTME: Shared by the extraction parser, the store provider, and orchestrators

use crate::error::{CoreError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// `^[A-Z][A-Za-z0-9_]*$` — entity labels are PascalCase (e.g. `Person`, `Company`).
static ENTITY_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9_]*$").unwrap());

/// `^[A-Z][A-Z0-9_]*$` — relationship types are SCREAMING_SNAKE_CASE.
static RELATIONSHIP_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());

/// Reserved relationship type linking a Document to each Entity extracted from it.
pub const CONTAINS_ENTITY: &str = "CONTAINS_ENTITY";

/// Validate an entity/document label against the PascalCase grammar.
pub fn validate_label(label: &str) -> Result<()> {
    if ENTITY_LABEL.is_match(label) {
        Ok(())
    } else {
        Err(CoreError::InvalidLabel(label.to_string()))
    }
}

/// Validate a relationship type against the UPPERCASE grammar.
pub fn validate_relationship_type(rel_type: &str) -> Result<()> {
    if RELATIONSHIP_TYPE.is_match(rel_type) {
        Ok(())
    } else {
        Err(CoreError::InvalidRelationshipType(rel_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_labels() {
        assert!(validate_label("Person").is_ok());
        assert!(validate_label("Company_2").is_ok());
    }

    #[test]
    fn rejects_invalid_labels() {
        assert!(validate_label("person").is_err());
        assert!(validate_label("_Person").is_err());
        assert!(validate_label("").is_err());
        assert!(validate_label("1Person").is_err());
    }

    #[test]
    fn accepts_valid_relationship_types() {
        assert!(validate_relationship_type("WORKS_FOR").is_ok());
        assert!(validate_relationship_type(CONTAINS_ENTITY).is_ok());
    }

    #[test]
    fn rejects_invalid_relationship_types() {
        assert!(validate_relationship_type("works_for").is_err());
        assert!(validate_relationship_type("Works_For").is_err());
        assert!(validate_relationship_type("").is_err());
    }

    proptest::proptest! {
        #[test]
        fn label_grammar_never_panics(s in "\\PC*") {
            let _ = validate_label(&s);
        }
    }
}
