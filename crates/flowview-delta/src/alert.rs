//! User-facing alerts
//!
//! The applicator never performs alert side effects inline: it builds one
//! [`Alert`] per problem batch and hands it to an injected [`AlertSink`].

use crate::error::{ApplicationError, IngestionError, ItemApplicationError, OutOfOrderDeltaError};

const RELOAD_HINT: &str = "Reload the view to retrieve the full workflow state";

/// Alert for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// One-line summary
    pub message: String,
    /// Recoverable errors behind the alert; empty for fatal failures
    pub errors: Vec<ApplicationError>,
}

impl Alert {
    /// Create alert with a message only
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Batch received while the store is empty
    #[must_use]
    pub fn out_of_order(error: OutOfOrderDeltaError) -> Self {
        Self {
            message: "Received a delta before the workflow initial data burst".to_string(),
            errors: vec![error.into()],
        }
    }

    /// Initial snapshot rejected
    #[must_use]
    pub fn initial_ingestion(error: &IngestionError) -> Self {
        Self::new(format!("Error applying initial data burst for deltas: {error}"))
    }

    /// Items of one batch that failed
    #[must_use]
    pub fn item_failures(errors: Vec<ItemApplicationError>) -> Self {
        let message = match errors.len() {
            1 => "Error applying deltas: 1 item failed, see logs for details".to_string(),
            n => format!("Error applying deltas: {n} items failed, see logs for details"),
        };
        Self {
            message,
            errors: errors.into_iter().map(ApplicationError::from).collect(),
        }
    }

    /// Append the reload suggestion to the message
    #[must_use]
    pub fn with_reload_hint(mut self) -> Self {
        self.message = format!("{}. {RELOAD_HINT}", self.message);
        self
    }
}

/// Receiver of user-facing alerts
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send {
    /// Deliver one alert
    fn alert(&self, alert: Alert);
}

/// Sink that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, alert: Alert) {
        tracing::error!(errors = alert.errors.len(), "{}", alert.message);
        for error in &alert.errors {
            tracing::debug!("  {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeltaPhase;
    use flowview_model::{EntityKind, NormalizeError};
    use serde_json::json;

    #[test]
    fn reload_hint_appended() {
        let alert = Alert::out_of_order(OutOfOrderDeltaError::new(None)).with_reload_hint();
        assert_eq!(
            alert.message,
            "Received a delta before the workflow initial data burst. \
             Reload the view to retrieve the full workflow state"
        );
        assert_eq!(alert.errors.len(), 1);
    }

    #[test]
    fn item_failures_counted() {
        let error = ItemApplicationError::for_record(
            DeltaPhase::Added,
            EntityKind::Job,
            &json!({}),
            NormalizeError::MissingField("id"),
        );
        let alert = Alert::item_failures(vec![error.clone(), error]);
        assert!(alert.message.contains("2 items failed"));
        assert_eq!(alert.errors.len(), 2);
    }

    #[test]
    fn mock_sink_receives_alert() {
        let mut sink = MockAlertSink::new();
        sink.expect_alert()
            .withf(|alert| alert.message.starts_with("Received a delta"))
            .times(1)
            .return_const(());

        sink.alert(Alert::out_of_order(OutOfOrderDeltaError::new(None)));
    }
}
