//! Sidecar format uploaded next to each clip

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON sidecar describing an uploaded clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipManifest {
    /// Share identifier handed out to viewers
    pub share_id: String,

    /// Object key of the uploaded video
    pub storage_key: String,

    /// Download URL of the uploaded video
    pub url: String,

    /// Key of the clip in the local sync map
    pub local_key: String,

    /// Size of the uploaded video in bytes
    pub size_bytes: u64,

    pub created_at: DateTime<Utc>,

    /// Agent version
    pub agent_version: String,

    /// Platform (ios, android, macos, linux, ...)
    pub platform: String,
}

impl ClipManifest {
    pub fn new(
        share_id: String,
        storage_key: String,
        url: String,
        local_key: String,
        size_bytes: u64,
    ) -> Self {
        Self {
            share_id,
            storage_key,
            url,
            local_key,
            size_bytes,
            created_at: Utc::now(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}
