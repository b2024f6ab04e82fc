//! Per-clip sync state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Relationship of one local video to the remote store.
///
/// Any variant may transition to any other; there is no terminal state.
/// `updated_at` is epoch milliseconds and is always present once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    #[serde(rename_all = "camelCase")]
    LocalOnly {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    Uploaded {
        share_id: String,
        storage_key: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<i64>,
    },
}

/// Local video key to its status
pub type SyncMap = BTreeMap<String, SyncStatus>;

impl SyncStatus {
    pub fn local_only() -> Self {
        Self::LocalOnly { updated_at: None }
    }

    pub fn uploaded(
        share_id: impl Into<String>,
        storage_key: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::Uploaded {
            share_id: share_id.into(),
            storage_key: storage_key.into(),
            url: url.into(),
            updated_at: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            updated_at: None,
        }
    }

    pub fn updated_at(&self) -> Option<i64> {
        match self {
            Self::LocalOnly { updated_at }
            | Self::Uploaded { updated_at, .. }
            | Self::Error { updated_at, .. } => *updated_at,
        }
    }

    /// Fill in the transition timestamp unless the caller already set one
    pub fn stamped(mut self, now_ms: i64) -> Self {
        match &mut self {
            Self::LocalOnly { updated_at }
            | Self::Uploaded { updated_at, .. }
            | Self::Error { updated_at, .. } => {
                updated_at.get_or_insert(now_ms);
            }
        }
        self
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LocalOnly { .. } => "local_only",
            Self::Uploaded { .. } => "uploaded",
            Self::Error { .. } => "error",
        }
    }
}

/// A finished local video as the sync layer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalClip {
    /// Stable asset id from the media library, when there is one
    pub asset_id: Option<String>,
    /// File URI (`file:///...`) or plain path
    pub uri: String,
}

impl LocalClip {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            asset_id: None,
            uri: uri.into(),
        }
    }

    pub fn with_asset_id(mut self, asset_id: impl Into<String>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    /// Key into the sync map: asset id if present, else the URI
    pub fn sync_key(&self) -> &str {
        match self.asset_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.uri,
        }
    }
}
