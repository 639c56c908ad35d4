//! ABOUTME: Batch Runner (C10) — sequential `learn` over a list, with progress callback and ETA
//! ABOUTME: Strict ordering: later items dedup against entities/documents created by earlier ones

use crate::engine::GraphRagEngine;
use crate::error::Result;
use crate::types::{resolve_batch_item, BatchFailure, BatchItem, BatchProgress, BatchResult};
use std::time::Instant;
use tracing::{instrument, warn};

const CURRENT_TEXT_PREVIEW_CHARS: usize = 200;

/// Callback invoked after every item, success or failure.
pub type ProgressCallback<'a> = dyn FnMut(BatchProgress) + Send + 'a;

#[instrument(skip(engine, items, on_progress), fields(count = items.len()))]
pub(crate) async fn learn_batch(
    engine: &GraphRagEngine,
    items: Vec<BatchItem>,
    include_embeddings: bool,
    mut on_progress: Option<&mut ProgressCallback<'_>>,
) -> Result<BatchResult> {
    let total = items.len();
    let mut result = BatchResult::default();
    let mut completed = 0usize;
    let mut durations_total = std::time::Duration::ZERO;

    for (index, item) in items.into_iter().enumerate() {
        let preview = preview(item.text());
        let (text, options) = resolve_batch_item(item, include_embeddings);

        let item_start = Instant::now();
        match crate::learn::learn(engine, text.clone(), options).await {
            Ok(learn_result) => {
                if learn_result.created.document > 0 {
                    result.documents_created += 1;
                } else {
                    result.documents_reused += 1;
                }
                result.entities_created += learn_result.created.entities;
                result.relationships_created += learn_result.created.relationships;
            }
            Err(err) => {
                warn!(index, error = %err, "batch item failed, continuing");
                result.failures.push(BatchFailure {
                    index,
                    text: text.clone(),
                    error: err.to_string(),
                });
            }
        }
        completed += 1;
        durations_total += item_start.elapsed();

        if let Some(callback) = on_progress.as_deref_mut() {
            #[allow(clippy::cast_possible_truncation)]
            let average_ms = if completed > 0 {
                (durations_total.as_millis() / completed as u128) as u64
            } else {
                0
            };
            let remaining = total - completed;
            #[allow(clippy::cast_possible_truncation)]
            let eta_ms = average_ms * remaining as u64;
            callback(BatchProgress {
                current: index + 1,
                total,
                completed: completed - result.failures.len(),
                failed: result.failures.len(),
                current_text: preview,
                estimated_time_remaining_ms: eta_ms,
            });
        }
    }

    Ok(result)
}

fn preview(text: &str) -> String {
    if text.chars().count() <= CURRENT_TEXT_PREVIEW_CHARS {
        text.to_string()
    } else {
        text.chars().take(CURRENT_TEXT_PREVIEW_CHARS).collect()
    }
}
