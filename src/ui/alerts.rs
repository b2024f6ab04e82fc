//! User-facing error channel
//!
//! Terminal failures (camera mount errors, capture failures, offline upload
//! attempts) are reported here instead of being returned as raw errors to
//! the UI layer. The UI decides how to present them (usually a modal).

use tokio::sync::mpsc;
use tracing::{error, warn};

/// A single notice destined for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

/// Sink for user-facing alerts
pub trait AlertSink: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

/// Alerts that only go to the log (CLI and headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
    }
}

/// Alerts forwarded over a channel to whoever renders them
#[derive(Debug, Clone)]
pub struct ChannelAlerts {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlerts {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlerts {
    fn alert(&self, title: &str, message: &str) {
        let alert = Alert {
            title: title.to_string(),
            message: message.to_string(),
        };
        if self.tx.send(alert).is_err() {
            // Receiver is gone; keep the message in the log at least.
            warn!("Alert dropped (no receiver): {}: {}", title, message);
        }
    }
}
