//! Transient user notifications ("toasts").

use std::sync::Mutex;

/// Whether a notification reports success or failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum NotificationKind {
    /// The action went through.
    #[serde(rename = "success")]
    Success,
    /// The action failed.
    #[serde(rename = "error")]
    Error,
}

/// A message for the user.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Notification {
    /// Success or error.
    pub kind: NotificationKind,
    /// Headline, e.g. "Policy Updated".
    pub title: String,
    /// Detail line under the title.
    pub subtitle: String,
}

impl Notification {
    /// A success notification.
    pub fn success(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    /// An error notification.
    pub fn error(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = match self.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };
        write!(f, "[{marker}] {}: {}", self.title, self.subtitle)
    }
}

/// Somewhere to show notifications.
pub trait Notifier {
    /// Show a notification.
    fn notify(&self, notification: Notification);
}

/// Prints notifications to stderr and records them as tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => {
                tracing::info!(title = %notification.title, "{}", notification.subtitle)
            }
            NotificationKind::Error => {
                tracing::warn!(title = %notification.title, "{}", notification.subtitle)
            }
        }
        eprintln!("{notification}");
    }
}

/// Keeps every notification, newest last.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    /// Everything notified so far.
    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// The most recent notification.
    pub fn last(&self) -> Option<Notification> {
        self.entries().pop()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}
