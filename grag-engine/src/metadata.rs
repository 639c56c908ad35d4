//! ABOUTME: System Metadata Stamper (C4) — produces scopeId, contextIds, _recordedAt, _validFrom, _validTo
//! ABOUTME: The only place in the engine that mints a fresh context id when the caller omits one

use crate::error::Result;
use chrono::{DateTime, Utc};
use grag_core::SystemMetadata;

/// Stamps fresh [`SystemMetadata`] for a new node/edge, generating a context
/// id when the caller did not supply one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataStamper;

impl MetadataStamper {
    /// Resolve the context id to use for this call (caller-supplied or
    /// freshly generated) and stamp metadata with it.
    ///
    /// # Errors
    /// Returns [`grag_core::CoreError::InvalidTemporalRange`] (wrapped) when
    /// both `valid_from` and `valid_to` are set and `valid_from > valid_to`.
    pub fn stamp(
        scope_id: impl Into<String>,
        context_id: Option<String>,
        valid_from: Option<DateTime<Utc>>,
        valid_to: Option<DateTime<Utc>>,
    ) -> Result<(SystemMetadata, String)> {
        let context_id = context_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let metadata =
            SystemMetadata::new(scope_id, context_id.clone()).with_validity(valid_from, valid_to)?;
        Ok((metadata, context_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_context_id_when_none_supplied() {
        let (metadata, context_id) = MetadataStamper::stamp("scope-1", None, None, None).unwrap();
        assert!(!context_id.is_empty());
        assert_eq!(metadata.context_ids, vec![context_id]);
    }

    #[test]
    fn reuses_caller_supplied_context_id() {
        let (_metadata, context_id) =
            MetadataStamper::stamp("scope-1", Some("c1".to_string()), None, None).unwrap();
        assert_eq!(context_id, "c1");
    }

    #[test]
    fn rejects_inverted_temporal_range() {
        let later = Utc::now();
        let earlier = later - chrono::Duration::days(1);
        let result = MetadataStamper::stamp("scope-1", None, Some(later), Some(earlier));
        assert!(result.is_err());
    }
}
