//! Record a session through the public API, then sync its clips.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sideline::capture::{
    CallbackRecorder, Camera, Capability, OnError, OnFinished, RecordOptions, RecordingResult,
    RecordingSession, SegmentRecorder, StartOutcome, StopOutcome,
};
use sideline::config::{RecordingConfig, UploadConfig};
use sideline::data::uri_from_path;
use sideline::net::NetworkProbe;
use sideline::sync::{
    ClipSyncer, FileKvStore, LocalClip, SyncError, SyncStatus, SyncStatusStore,
};
use sideline::ui::ChannelAlerts;

/// Camera that writes a file into its cache and finishes on stop
struct FakeCamera {
    cache: PathBuf,
    pending: Mutex<Option<OnFinished>>,
    count: Mutex<u32>,
}

impl CallbackRecorder for FakeCamera {
    fn start_recording(
        &self,
        _options: RecordOptions,
        on_finished: OnFinished,
        _on_error: OnError,
    ) -> Result<()> {
        *self.pending.lock().unwrap() = Some(on_finished);
        Ok(())
    }
}

impl Camera for FakeCamera {
    fn callback_recorder(&self) -> Option<&dyn CallbackRecorder> {
        Some(self)
    }

    fn stop_recording(&self) -> Result<()> {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        let path = self.cache.join(format!("capture-{}.mp4", count));
        std::fs::write(&path, format!("half {}", count))?;

        if let Some(on_finished) = self.pending.lock().unwrap().take() {
            on_finished(RecordingResult::at(uri_from_path(&path)));
        }
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_record_two_halves_then_sync_offline() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache");
    std::fs::create_dir_all(&cache).unwrap();

    let (alerts, mut alert_rx) = ChannelAlerts::new();
    let alerts = Arc::new(alerts);

    let recording = RecordingConfig {
        segments_directory: Some(dir.path().join("segments")),
        ..RecordingConfig::default()
    };
    let recorder = SegmentRecorder::new(&recording, alerts.clone());
    let session = RecordingSession::new();
    let camera: Arc<dyn Camera> = Arc::new(FakeCamera {
        cache: cache.clone(),
        pending: Mutex::new(None),
        count: Mutex::new(0),
    });

    for _ in 0..2 {
        let outcome = recorder.start_new_segment(Some(&camera), true, &session).await;
        assert_eq!(outcome, StartOutcome::Issued(Capability::CallbackStyle));
        let outcome = recorder.stop_current_segment(Some(&camera), &session).await;
        assert_eq!(outcome, StopOutcome::Stopped);
    }

    let segments = session.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(std::fs::read_to_string(&segments[0].path).unwrap(), "half 1");
    assert_eq!(std::fs::read_to_string(&segments[1].path).unwrap(), "half 2");
    assert_eq!(std::fs::read_dir(&cache).unwrap().count(), 0);

    // Nothing listens on this port, so the probe reports offline.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let probe_url = format!("http://{}/generate_204", listener.local_addr().unwrap());
    drop(listener);

    let store_path = dir.path().join("store.json");
    let store = SyncStatusStore::with_default_key(Arc::new(FileKvStore::new(&store_path)));
    let syncer = ClipSyncer::new(
        &UploadConfig::default(),
        store,
        Arc::new(NetworkProbe::with_url(probe_url, Duration::from_millis(200))),
        alerts,
    );

    let clip = LocalClip::new(uri_from_path(&segments[0].path));
    let err = syncer.sync_clip(&clip).await.unwrap_err();
    assert!(matches!(err, SyncError::Offline));
    assert!(syncer.statuses().await.is_empty());
    assert!(!store_path.exists());
    assert!(alert_rx.recv().await.unwrap().message.contains("offline"));

    let status = syncer.mark_local(&clip).await.unwrap();
    assert!(matches!(status, SyncStatus::LocalOnly { updated_at: Some(_) }));

    // A fresh store over the same file sees the persisted entry.
    let reopened = SyncStatusStore::with_default_key(Arc::new(FileKvStore::new(&store_path)));
    assert_eq!(reopened.get_sync_status(clip.sync_key()).await, Some(status));
}
