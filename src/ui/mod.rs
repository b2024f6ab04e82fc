//! User-facing notifications

mod alerts;

pub use alerts::{Alert, AlertSink, ChannelAlerts, LogAlerts};
