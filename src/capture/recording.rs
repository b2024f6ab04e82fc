//! Segment recording manager
//!
//! Drives a [`Camera`] through whichever recording shape it exposes and
//! moves every finished segment from the camera's transient output location
//! into the managed segments directory.
//!
//! Start returns as soon as the request is issued. Completion arrives later
//! through the camera's callback or through the spawned async task, and is
//! the only thing that clears the session's active flag apart from errors.
//! Stop signals the camera and then polls that flag with a hard timeout.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::RecordingConfig;
use crate::data::path_from_uri;
use crate::ui::AlertSink;

use super::backend::{Camera, Capability, OnError, OnFinished, RecordOptions, RecordingResult};
use super::session::{RecordingSession, Segment};

const ALERT_RECORDING_FAILED: &str = "Recording failed";
const ALERT_RECORDING_UNAVAILABLE: &str = "Recording unavailable";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("this camera does not support video recording")]
    NoRecordingCapability,

    #[error("{0}")]
    Backend(String),

    #[error("failed to prepare segments directory {path:?}: {source}")]
    SegmentsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save segment {from:?} to {to:?}: {source}")]
    Save {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a start request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// No camera or camera not ready; nothing happened
    NotReady,
    /// Recording requested through the given shape
    Issued(Capability),
    /// Camera exposes neither recording shape
    Unsupported,
    /// The request could not be issued; the user was alerted
    Failed,
}

/// How a stop request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The active segment finished (or none was active)
    Stopped,
    /// Gave up waiting; the segment may still finish later
    TimedOut,
}

pub struct SegmentRecorder {
    segments_dir: PathBuf,
    stop_timeout: Duration,
    poll_interval: Duration,
    options: RecordOptions,
    alerts: Arc<dyn AlertSink>,
}

impl SegmentRecorder {
    pub fn new(config: &RecordingConfig, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            segments_dir: config.segments_dir(),
            stop_timeout: config.stop_timeout(),
            poll_interval: config.stop_poll_interval(),
            options: RecordOptions::default(),
            alerts,
        }
    }

    pub fn with_options(mut self, options: RecordOptions) -> Self {
        self.options = options;
        self
    }

    pub fn segments_dir(&self) -> &Path {
        &self.segments_dir
    }

    /// Begin recording a new segment.
    ///
    /// The caller must not call this while `session.is_active()`.
    pub async fn start_new_segment(
        &self,
        camera: Option<&Arc<dyn Camera>>,
        camera_ready: bool,
        session: &RecordingSession,
    ) -> StartOutcome {
        let camera = match camera {
            Some(camera) if camera_ready => camera,
            _ => {
                info!("Camera not ready, ignoring start request");
                return StartOutcome::NotReady;
            }
        };

        if let Err(source) = tokio::fs::create_dir_all(&self.segments_dir).await {
            let err = CaptureError::SegmentsDir {
                path: self.segments_dir.clone(),
                source,
            };
            error!("{}", err);
            self.alerts.alert(ALERT_RECORDING_FAILED, &err.to_string());
            return StartOutcome::Failed;
        }

        // Flag first so a concurrent stop never sees the previous segment's
        // "inactive" state.
        session.set_active(true);
        session.clear_pending();

        let finisher = Finisher {
            segments_dir: self.segments_dir.clone(),
            session: session.clone(),
            alerts: self.alerts.clone(),
        };

        if let Some(recorder) = camera.callback_recorder() {
            let runtime = Handle::current();
            let on_finished: OnFinished = {
                let finisher = finisher.clone();
                Box::new(move |result: RecordingResult| {
                    runtime.spawn(finisher.complete(result));
                })
            };
            let on_error: OnError = {
                let finisher = finisher.clone();
                Box::new(move |message: String| finisher.fail(CaptureError::Backend(message)))
            };

            debug!("Starting segment via callback recorder");
            return match recorder.start_recording(self.options.clone(), on_finished, on_error) {
                Ok(()) => StartOutcome::Issued(Capability::CallbackStyle),
                Err(e) => {
                    finisher.fail(CaptureError::Backend(format!("{:#}", e)));
                    StartOutcome::Failed
                }
            };
        }

        if camera.async_recorder().is_some() {
            let camera = Arc::clone(camera);
            let options = self.options.clone();

            debug!("Starting segment via async recorder");
            let handle = tokio::spawn(async move {
                let Some(recorder) = camera.async_recorder() else {
                    finisher.fail(CaptureError::NoRecordingCapability);
                    return;
                };
                match recorder.record_async(options).await {
                    Ok(result) => finisher.complete(result).await,
                    Err(e) => finisher.fail(CaptureError::Backend(format!("{:#}", e))),
                }
            });
            session.set_pending(handle);
            return StartOutcome::Issued(Capability::PromiseStyle);
        }

        session.set_active(false);
        let err = CaptureError::NoRecordingCapability;
        error!("{}", err);
        self.alerts.alert(ALERT_RECORDING_UNAVAILABLE, &err.to_string());
        StartOutcome::Unsupported
    }

    /// Signal the camera to stop and wait for the active segment to finish.
    ///
    /// Returns within the stop timeout plus one poll interval. Timing out is
    /// not an error; the caller may re-check `session.is_active()` and retry.
    pub async fn stop_current_segment(
        &self,
        camera: Option<&Arc<dyn Camera>>,
        session: &RecordingSession,
    ) -> StopOutcome {
        // The completion/error path is what clears the flag, so a failed
        // stop signal changes nothing.
        if let Some(camera) = camera {
            session.best_effort("stop signal", camera.stop_recording());
        }

        let deadline = Instant::now() + self.stop_timeout;
        loop {
            if !session.is_active() {
                return StopOutcome::Stopped;
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Segment still active {:?} after stop request",
                    self.stop_timeout
                );
                return StopOutcome::TimedOut;
            }

            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

/// Completion and error handling for one issued segment
#[derive(Clone)]
struct Finisher {
    segments_dir: PathBuf,
    session: RecordingSession,
    alerts: Arc<dyn AlertSink>,
}

impl Finisher {
    async fn complete(self, result: RecordingResult) {
        let saved = self.save(result).await;
        self.session.set_active(false);

        match saved {
            Ok(Some(segment)) => info!(
                "Segment {} saved to {:?}",
                segment.index, segment.path
            ),
            Ok(None) => warn!("Recording finished without an output location"),
            Err(e) => {
                error!("{}", e);
                self.alerts.alert(ALERT_RECORDING_FAILED, &e.to_string());
            }
        }
    }

    fn fail(self, err: CaptureError) {
        self.session.set_active(false);
        error!("Recording error: {}", err);
        self.alerts.alert(ALERT_RECORDING_FAILED, &err.to_string());
    }

    async fn save(&self, result: RecordingResult) -> Result<Option<Segment>, CaptureError> {
        let Some(uri) = result.uri else {
            return Ok(None);
        };
        let source = path_from_uri(&uri);

        tokio::fs::create_dir_all(&self.segments_dir)
            .await
            .map_err(|e| CaptureError::SegmentsDir {
                path: self.segments_dir.clone(),
                source: e,
            })?;

        let created_at = Local::now();
        let target = unused_segment_path(&self.segments_dir, created_at).await;

        tokio::fs::copy(&source, &target)
            .await
            .map_err(|e| CaptureError::Save {
                from: source.clone(),
                to: target.clone(),
                source: e,
            })?;

        // A leftover file in the camera's cache area is harmless.
        self.session
            .best_effort("transient source delete", tokio::fs::remove_file(&source).await);

        Ok(Some(self.session.push_segment(target, created_at)))
    }
}

/// `seg_YYYYMMDD_HHMMSS.mp4`, local time
pub fn segment_file_name(at: DateTime<Local>) -> String {
    format!("seg_{}.mp4", at.format("%Y%m%d_%H%M%S"))
}

/// Segment path for `at`, suffixed when that second is already taken
async fn unused_segment_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    let base = dir.join(segment_file_name(at));
    if !path_exists(&base).await {
        return base;
    }

    let stem = format!("seg_{}", at.format("%Y%m%d_%H%M%S"));
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}_{}.mp4", stem, n));
        if !path_exists(&candidate).await {
            return candidate;
        }
        n += 1;
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
