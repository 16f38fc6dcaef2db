use crate::client::ApiError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 32;

fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Transient, user-visible message (a toast in a graphical front end).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification {
            level,
            message: message.into(),
            created_at: now_iso(),
        };
        if self.tx.send(notification).is_err() {
            debug!("notification dropped; no listeners");
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    /// Converts a failed call into the notification shown at the call site.
    pub fn notify_error(&self, err: &ApiError) {
        self.error(user_message(err));
    }
}

pub fn user_message(err: &ApiError) -> String {
    match err {
        ApiError::Network(_) => "Network error. Please check your connection and try again.".to_string(),
        ApiError::Decode(_) => "Unexpected response from the server.".to_string(),
        ApiError::Unauthenticated { .. } => "Please log in to continue.".to_string(),
        other => {
            let message = other.message().trim();
            if message.is_empty() {
                "Something went wrong.".to_string()
            } else {
                message.to_string()
            }
        }
    }
}
