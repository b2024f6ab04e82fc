//! Shared state of one recording session

use chrono::{DateTime, Local};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A finished segment in the managed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    /// Position in completion order
    pub index: usize,
}

/// State shared between start, stop and the completion handlers.
///
/// Cloning is cheap and every clone refers to the same session. At most one
/// segment is active at a time; callers must not start a new segment while
/// [`is_active`](Self::is_active) is true.
#[derive(Clone, Default)]
pub struct RecordingSession {
    inner: Arc<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    segment_active: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
    segments: Mutex<Vec<Segment>>,
    swallowed: AtomicUsize,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// True between an issued start and its completion, error or stop
    pub fn is_active(&self) -> bool {
        self.inner.segment_active.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.inner.segment_active.store(active, Ordering::SeqCst);
    }

    /// Segments recorded so far, in completion order
    pub fn segments(&self) -> Vec<Segment> {
        lock(&self.inner.segments).clone()
    }

    pub fn segment_paths(&self) -> Vec<PathBuf> {
        lock(&self.inner.segments)
            .iter()
            .map(|segment| segment.path.clone())
            .collect()
    }

    /// Hand the recorded segments to the caller and start an empty list
    pub fn take_segments(&self) -> Vec<Segment> {
        std::mem::take(&mut *lock(&self.inner.segments))
    }

    pub(crate) fn push_segment(&self, path: PathBuf, created_at: DateTime<Local>) -> Segment {
        let mut segments = lock(&self.inner.segments);
        let segment = Segment {
            path,
            created_at,
            index: segments.len(),
        };
        segments.push(segment.clone());
        segment
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.inner.pending).is_some()
    }

    pub(crate) fn set_pending(&self, handle: JoinHandle<()>) {
        *lock(&self.inner.pending) = Some(handle);
    }

    /// Forget a handle left over from a previous segment
    pub(crate) fn clear_pending(&self) {
        if lock(&self.inner.pending).take().is_some() {
            debug!("Cleared stale pending recording handle");
        }
    }

    /// Await the in-flight async recording, if there is one
    pub async fn wait_pending(&self) {
        let handle = lock(&self.inner.pending).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Pending recording task ended abnormally: {}", e);
            }
        }
    }

    /// Number of failures swallowed by [`best_effort`](Self::best_effort)
    pub fn swallowed_errors(&self) -> usize {
        self.inner.swallowed.load(Ordering::SeqCst)
    }

    /// Run-and-forget policy for cleanup paths.
    ///
    /// Failures are logged and counted, never propagated.
    pub fn best_effort<T, E: Display>(&self, what: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.inner.swallowed.fetch_add(1, Ordering::SeqCst);
                debug!("Ignoring failed {}: {}", what, e);
                None
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_are_indexed_in_push_order() {
        let session = RecordingSession::new();
        let now = Local::now();
        session.push_segment(PathBuf::from("/s/a.mp4"), now);
        session.push_segment(PathBuf::from("/s/b.mp4"), now);

        let segments = session.segments();
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[1].index, 1);
        assert_eq!(
            session.segment_paths(),
            vec![PathBuf::from("/s/a.mp4"), PathBuf::from("/s/b.mp4")]
        );

        assert_eq!(session.take_segments().len(), 2);
        assert!(session.segments().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let session = RecordingSession::new();
        let other = session.clone();
        session.set_active(true);
        assert!(other.is_active());
        other.set_active(false);
        assert!(!session.is_active());
    }

    #[test]
    fn test_best_effort_counts_failures() {
        let session = RecordingSession::new();
        assert_eq!(session.best_effort::<_, String>("ok", Ok(3)), Some(3));
        assert_eq!(session.best_effort::<u8, _>("delete", Err("gone")), None);
        assert_eq!(session.swallowed_errors(), 1);
    }

    #[tokio::test]
    async fn test_wait_pending_takes_handle() {
        let session = RecordingSession::new();
        session.set_pending(tokio::spawn(async {}));
        assert!(session.has_pending());
        session.wait_pending().await;
        assert!(!session.has_pending());
        // No handle: returns immediately.
        session.wait_pending().await;
    }
}
