//! Clip sync engine
//!
//! Runs the user-initiated sync of one finished clip: probe, upload the
//! video, upload its JSON sidecar, record the outcome. It is the only writer
//! of the sync map in this process; every status write goes through
//! `write_lock`, which is what makes the store's unlocked read-modify-write
//! safe.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::data::{path_from_uri, ClipManifest};
use crate::net::Connectivity;
use crate::ui::AlertSink;
use crate::upload::{local_file_size, UploadError, Uploader};

use super::status::{LocalClip, SyncMap, SyncStatus};
use super::store::SyncStatusStore;
use super::SyncEvent;

const ALERT_OFFLINE: &str = "You're offline";
const ALERT_UPLOAD_FAILED: &str = "Upload failed";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("offline: connect to the internet to upload this clip")]
    Offline,

    #[error("clip {0} is already being uploaded")]
    InProgress(String),

    #[error(transparent)]
    Upload(UploadError),

    #[error("failed to record sync status: {0:#}")]
    Store(anyhow::Error),
}

pub struct ClipSyncer {
    store: SyncStatusStore,
    uploader: Uploader,
    connectivity: Arc<dyn Connectivity>,
    alerts: Arc<dyn AlertSink>,
    manifest_prefix: String,
    write_lock: tokio::sync::Mutex<()>,
    in_flight: Mutex<HashSet<String>>,
    events: broadcast::Sender<SyncEvent>,
}

impl ClipSyncer {
    pub fn new(
        config: &UploadConfig,
        store: SyncStatusStore,
        connectivity: Arc<dyn Connectivity>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            uploader: Uploader::new(config, connectivity.clone()),
            connectivity,
            alerts,
            manifest_prefix: config.manifest_prefix.clone(),
            write_lock: tokio::sync::Mutex::new(()),
            in_flight: Mutex::new(HashSet::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Current status; a clip never synced is implicitly local-only
    pub async fn status(&self, clip: &LocalClip) -> SyncStatus {
        self.store
            .get_sync_status(clip.sync_key())
            .await
            .unwrap_or_else(SyncStatus::local_only)
    }

    pub async fn statuses(&self) -> SyncMap {
        self.store.read_sync_map().await
    }

    /// Reset a clip to local-only
    pub async fn mark_local(&self, clip: &LocalClip) -> Result<SyncStatus, SyncError> {
        self.record(clip.sync_key(), SyncStatus::local_only()).await
    }

    /// Upload a clip and record the outcome.
    ///
    /// Offline attempts fail before anything is written. Clips already
    /// uploaded are not uploaded again.
    pub async fn sync_clip(&self, clip: &LocalClip) -> Result<SyncStatus, SyncError> {
        let key = clip.sync_key().to_string();
        let _claim = InFlight::claim(&self.in_flight, &key)?;

        if let Some(existing) = self.store.get_sync_status(&key).await {
            if existing.is_uploaded() {
                debug!("Clip {} already uploaded, skipping", key);
                self.emit(SyncEvent::Synced { key });
                return Ok(existing);
            }
        }

        self.emit(SyncEvent::Checking { key: key.clone() });
        if !self.connectivity.is_online().await {
            return Err(self.offline(key));
        }

        self.emit(SyncEvent::Uploading { key: key.clone() });
        match self.upload(clip, &key).await {
            Ok(status) => {
                let status = self.record(&key, status).await?;
                info!("Clip {} synced", key);
                self.emit(SyncEvent::Synced { key });
                Ok(status)
            }
            // Connectivity dropped between the probe and the transfer.
            Err(UploadError::Offline) => Err(self.offline(key)),
            Err(e) => {
                let message = e.to_string();
                warn!("Sync of {} failed: {}", key, message);
                self.record(&key, SyncStatus::error(message.clone())).await?;
                self.alerts.alert(ALERT_UPLOAD_FAILED, &message);
                self.emit(SyncEvent::Failed { key, message });
                Err(SyncError::Upload(e))
            }
        }
    }

    async fn upload(&self, clip: &LocalClip, key: &str) -> Result<SyncStatus, UploadError> {
        let size_bytes = local_file_size(&path_from_uri(&clip.uri)).await?;
        let video = self.uploader.upload_file_on_tap(&clip.uri).await?;

        let share_id = uuid::Uuid::new_v4().simple().to_string();
        let manifest = ClipManifest::new(
            share_id.clone(),
            video.key.clone(),
            video.url.clone(),
            key.to_string(),
            size_bytes,
        );
        let sidecar = self
            .uploader
            .upload_json_on_tap(&manifest, &self.manifest_prefix)
            .await?;
        debug!("Manifest for {} stored at {}", key, sidecar.key);

        Ok(SyncStatus::uploaded(share_id, video.key, video.url))
    }

    async fn record(&self, key: &str, status: SyncStatus) -> Result<SyncStatus, SyncError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self
            .store
            .set_sync_status(key, status)
            .await
            .map_err(SyncError::Store)?;
        map.remove(key)
            .ok_or_else(|| SyncError::Store(anyhow::anyhow!("status for {key} missing after write")))
    }

    fn offline(&self, key: String) -> SyncError {
        let err = SyncError::Offline;
        self.alerts.alert(ALERT_OFFLINE, &err.to_string());
        self.emit(SyncEvent::Failed {
            key,
            message: err.to_string(),
        });
        err
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Marks a clip as being synced until dropped
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<String>>, key: &str) -> Result<Self, SyncError> {
        let mut keys = set.lock().unwrap_or_else(|p| p.into_inner());
        if !keys.insert(key.to_string()) {
            return Err(SyncError::InProgress(key.to_string()));
        }
        Ok(Self {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}
