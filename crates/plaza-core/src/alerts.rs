//! User-facing alerting.
//!
//! Stores raise alerts through a [`Notifier`] and never wait for them to be
//! dismissed.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Info,
    Warning,
    Error,
}

impl AlertKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Fire-and-forget sink for toasts and alerts.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: AlertKind, title: &str, message: &str);
}

/// Writes alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: AlertKind, title: &str, message: &str) {
        match kind {
            AlertKind::Success | AlertKind::Info => tracing::info!("{}: {}", title, message),
            AlertKind::Warning => tracing::warn!("{}: {}", title, message),
            AlertKind::Error => tracing::error!("{}: {}", title, message),
        }
    }
}

/// An alert captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

/// Keeps every alert in memory; useful for tests and for batching output.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every captured alert.
    pub fn drain(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.alerts.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: AlertKind, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Alert {
                kind,
                title: title.to_string(),
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_captures_and_drains() {
        let notifier = RecordingNotifier::default();
        notifier.notify(AlertKind::Error, "Couldn't like post", "offline");
        notifier.notify(AlertKind::Success, "Posted", "ok");

        assert_eq!(notifier.len(), 2);
        let drained = notifier.drain();
        assert_eq!(drained[0].kind, AlertKind::Error);
        assert_eq!(drained[1].title, "Posted");
        assert!(notifier.is_empty());
    }

    #[test]
    fn alert_kind_labels() {
        assert_eq!(AlertKind::Warning.label(), "warning");
    }
}
