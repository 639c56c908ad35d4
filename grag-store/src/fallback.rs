//! ABOUTME: Shared in-memory cosine-similarity fallback for backends with no native vector index
//! ABOUTME: Candidate over-fetch rule: 5x the requested limit, floor 100, cap 500 (spec.md §4.C3)

use crate::model::VectorSearchParams;
use chrono::{DateTime, Utc};
use grag_providers::cosine_similarity;

/// Number of rows to pull from the backing store before scoring and
/// truncating, given the caller's requested `limit`.
#[must_use]
pub fn over_fetch_count(limit: usize) -> usize {
    (limit.saturating_mul(5)).clamp(100, 500)
}

/// Anything the fallback scan needs to read off a candidate row to decide
/// whether it is eligible, independent of whether the row is an Entity or a
/// Document.
pub trait ScoredCandidate {
    fn scope_id(&self) -> &str;
    fn context_ids(&self) -> &[String];
    fn valid_from(&self) -> Option<DateTime<Utc>>;
    fn valid_to(&self) -> Option<DateTime<Utc>>;
    fn embedding(&self) -> Option<&[f32]>;
}

fn matches_contexts(row_contexts: &[String], filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    row_contexts.iter().any(|c| filter.contains(c))
}

fn valid_at(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>, at: DateTime<Utc>) -> bool {
    from.map_or(true, |f| f <= at) && to.map_or(true, |t| t >= at)
}

/// Score and rank `candidates` against `params`, returning the indices of the
/// survivors in descending-similarity order, truncated to `params.limit`.
///
/// Pre-filters on scope, context tags and temporal validity before scoring,
/// then drops anything below `params.threshold`.
pub fn rank<T: ScoredCandidate>(candidates: &[T], params: &VectorSearchParams) -> Vec<usize> {
    let at = params.valid_at.unwrap_or_else(Utc::now);
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            params
                .scope_id
                .as_deref()
                .map_or(true, |scope| c.scope_id() == scope)
        })
        .filter(|(_, c)| matches_contexts(c.context_ids(), &params.contexts))
        .filter(|(_, c)| valid_at(c.valid_from(), c.valid_to(), at))
        .filter_map(|(i, c)| {
            c.embedding()
                .map(|e| (i, cosine_similarity(&params.query_embedding, e)))
        })
        .filter(|(_, score)| *score >= params.threshold)
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(params.limit);
    scored.into_iter().map(|(i, _)| i).collect()
}

impl ScoredCandidate for grag_core::Entity {
    fn scope_id(&self) -> &str {
        &self.metadata.scope_id
    }
    fn context_ids(&self) -> &[String] {
        &self.metadata.context_ids
    }
    fn valid_from(&self) -> Option<DateTime<Utc>> {
        self.metadata.valid_from
    }
    fn valid_to(&self) -> Option<DateTime<Utc>> {
        self.metadata.valid_to
    }
    fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

impl ScoredCandidate for grag_core::Document {
    fn scope_id(&self) -> &str {
        &self.metadata.scope_id
    }
    fn context_ids(&self) -> &[String] {
        &self.metadata.context_ids
    }
    fn valid_from(&self) -> Option<DateTime<Utc>> {
        self.metadata.valid_from
    }
    fn valid_to(&self) -> Option<DateTime<Utc>> {
        self.metadata.valid_to
    }
    fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_fetch_respects_floor_and_cap() {
        assert_eq!(over_fetch_count(1), 100);
        assert_eq!(over_fetch_count(30), 150);
        assert_eq!(over_fetch_count(1000), 500);
    }

    struct Row {
        scope: &'static str,
        contexts: Vec<String>,
        embedding: Option<Vec<f32>>,
    }

    impl ScoredCandidate for Row {
        fn scope_id(&self) -> &str {
            self.scope
        }
        fn context_ids(&self) -> &[String] {
            &self.contexts
        }
        fn valid_from(&self) -> Option<DateTime<Utc>> {
            None
        }
        fn valid_to(&self) -> Option<DateTime<Utc>> {
            None
        }
        fn embedding(&self) -> Option<&[f32]> {
            self.embedding.as_deref()
        }
    }

    #[test]
    fn rank_filters_by_scope_and_sorts_descending() {
        let rows = vec![
            Row {
                scope: "tenant-a",
                contexts: vec![],
                embedding: Some(vec![1.0, 0.0]),
            },
            Row {
                scope: "tenant-b",
                contexts: vec![],
                embedding: Some(vec![1.0, 0.0]),
            },
            Row {
                scope: "tenant-a",
                contexts: vec![],
                embedding: Some(vec![0.0, 1.0]),
            },
        ];
        let params = VectorSearchParams {
            query_embedding: vec![1.0, 0.0],
            limit: 10,
            threshold: 0.0,
            scope_id: Some("tenant-a".into()),
            contexts: vec![],
            valid_at: None,
        };
        let ranked = rank(&rows, &params);
        assert_eq!(ranked, vec![0, 2]);
    }

    #[test]
    fn rank_drops_rows_below_threshold() {
        let rows = vec![Row {
            scope: "tenant-a",
            contexts: vec![],
            embedding: Some(vec![0.0, 1.0]),
        }];
        let params = VectorSearchParams {
            query_embedding: vec![1.0, 0.0],
            limit: 10,
            threshold: 0.5,
            scope_id: None,
            contexts: vec![],
            valid_at: None,
        };
        assert!(rank(&rows, &params).is_empty());
    }
}
