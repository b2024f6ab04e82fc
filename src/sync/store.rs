//! Sync status store
//!
//! The single owner of the persisted sync map. The map is kept under one key
//! of a [`KeyValueStore`] and always read and written as a whole.
//!
//! There is no locking here: `set_sync_status` is a plain read-modify-write,
//! so callers in one process must serialize writes (see
//! [`ClipSyncer`](super::ClipSyncer)). Concurrent writers for the same key
//! race and the last write wins.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::kv::KeyValueStore;
use super::status::{SyncMap, SyncStatus};

pub const DEFAULT_MAP_KEY: &str = "sync:map:v1";

#[derive(Clone)]
pub struct SyncStatusStore {
    kv: Arc<dyn KeyValueStore>,
    map_key: String,
}

impl SyncStatusStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, map_key: impl Into<String>) -> Self {
        Self {
            kv,
            map_key: map_key.into(),
        }
    }

    pub fn with_default_key(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(kv, DEFAULT_MAP_KEY)
    }

    pub fn map_key(&self) -> &str {
        &self.map_key
    }

    /// Read the whole map.
    ///
    /// Missing, unreadable or non-object data reads as an empty map. Entries
    /// that do not parse as a status are skipped one by one; the rest of the
    /// map is still returned.
    pub async fn read_sync_map(&self) -> SyncMap {
        parse_entries(&self.read_raw_map().await)
    }

    /// Persist the whole map in a single write
    pub async fn write_sync_map(&self, map: &SyncMap) -> Result<()> {
        let raw = serde_json::to_string(map).context("Failed to serialize sync map")?;
        self.kv
            .set_item(&self.map_key, raw)
            .await
            .context("Failed to persist sync map")
    }

    /// Replace the entry for `key` and return the readable map as written.
    ///
    /// Entries this version cannot parse are written back untouched.
    pub async fn set_sync_status(&self, key: &str, status: SyncStatus) -> Result<SyncMap> {
        let status = status.stamped(now_ms());
        debug!("Sync status {} -> {}", key, status.label());

        let mut raw = self.read_raw_map().await;
        raw.insert(
            key.to_string(),
            serde_json::to_value(&status).context("Failed to serialize sync status")?,
        );
        let encoded = serde_json::to_string(&raw).context("Failed to serialize sync map")?;
        self.kv
            .set_item(&self.map_key, encoded)
            .await
            .context("Failed to persist sync map")?;

        Ok(parse_entries(&raw))
    }

    /// Stored status, or `None` when the clip was never synced
    pub async fn get_sync_status(&self, key: &str) -> Option<SyncStatus> {
        self.read_sync_map().await.remove(key)
    }

    async fn read_raw_map(&self) -> Map<String, Value> {
        let raw = match self.kv.get_item(&self.map_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!("Sync map unreadable, treating as empty: {:#}", e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!("Sync map is not an object ({}), treating as empty", json_kind(&other));
                Map::new()
            }
            Err(e) => {
                warn!("Sync map corrupt, treating as empty: {}", e);
                Map::new()
            }
        }
    }
}

fn parse_entries(raw: &Map<String, Value>) -> SyncMap {
    raw.iter()
        .filter_map(|(key, value)| {
            match serde_json::from_value::<SyncStatus>(value.clone()) {
                Ok(status) => Some((key.clone(), status)),
                Err(e) => {
                    warn!("Skipping unreadable sync entry {}: {}", key, e);
                    None
                }
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
