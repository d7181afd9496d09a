//! Async driver feeding a delta stream into a view

use crate::error::DeltaError;
use crate::tree::BatchOutcome;
use crate::view::WorkflowView;
use flowview_model::Deltas;
use futures::{pin_mut, Stream, StreamExt};
use serde::Serialize;

/// Totals over one driven stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriveSummary {
    /// Batches received
    pub batches: usize,
    /// Batches that reached the store (shutdowns included)
    pub applied: usize,
    /// Batches dropped for arriving before the snapshot
    pub discarded: usize,
    /// Item failures across all batches
    pub item_errors: usize,
}

/// Apply batches from `stream` until it ends
///
/// One batch is applied at a time; the next is not polled until the
/// previous one, observers included, has completed.
///
/// # Errors
/// Stops at and returns the first fatal [`DeltaError`]
pub async fn drive<S>(view: &mut WorkflowView, stream: S) -> Result<DriveSummary, DeltaError>
where
    S: Stream<Item = Deltas>,
{
    pin_mut!(stream);
    let mut summary = DriveSummary::default();

    while let Some(deltas) = stream.next().await {
        summary.batches += 1;
        let report = view.apply(Some(&deltas)).map_err(|error| {
            tracing::error!("Stopping after batch {}: {}", summary.batches, error);
            error
        })?;

        match report.outcome {
            BatchOutcome::Discarded => summary.discarded += 1,
            _ => summary.applied += 1,
        }
        summary.item_errors += report.errors.len();
        tracing::debug!(
            "Batch {} ({:?}): {} items, {} failed",
            summary.batches,
            report.outcome,
            report.applied,
            report.errors.len()
        );
    }

    tracing::info!(
        "Delta stream ended: {} batches, {} discarded, {} item errors",
        summary.batches,
        summary.discarded,
        summary.item_errors
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MockAlertSink;
    use crate::config::SyncConfig;
    use futures::stream;
    use serde_json::json;

    fn view() -> WorkflowView {
        let mut sink = MockAlertSink::new();
        sink.expect_alert().return_const(());
        WorkflowView::new(SyncConfig::default(), Box::new(sink))
    }

    #[tokio::test]
    async fn drive_counts_batches() {
        let mut view = view();
        let batches = vec![
            Deltas::default(),
            Deltas::initial(json!({"id": "u|wf"})),
            Deltas::shutdown(),
        ];

        let summary = drive(&mut view, stream::iter(batches)).await.unwrap();

        assert_eq!(
            summary,
            DriveSummary {
                batches: 3,
                applied: 2,
                discarded: 1,
                item_errors: 0
            }
        );
        assert!(view.tree().is_empty());
    }

    #[tokio::test]
    async fn drive_stops_on_fatal_error() {
        let mut view = view();
        let batches = vec![
            Deltas::initial(json!({"name": "no id"})),
            Deltas::initial(json!({"id": "u|wf"})),
        ];

        let err = drive(&mut view, stream::iter(batches)).await.unwrap_err();

        assert!(err.requires_reload());
        assert!(view.tree().is_empty());
    }
}
