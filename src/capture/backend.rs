//! Camera recording capability traits
//!
//! Camera devices expose one of two incompatible recording shapes: a
//! callback shape that reports completion through `on_finished`/`on_error`,
//! and an async shape whose single call resolves with the result. A device
//! may expose both; the callback shape wins.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Options forwarded to the camera for one segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOptions {
    /// Upper bound on segment length, if the device supports one
    pub max_duration: Option<Duration>,
    /// Record without audio
    pub mute: bool,
}

/// What the camera hands back when a segment finishes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingResult {
    /// Transient output location (`file://` URI or path)
    pub uri: Option<String>,
}

impl RecordingResult {
    pub fn at(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
        }
    }
}

pub type OnFinished = Box<dyn FnOnce(RecordingResult) + Send + 'static>;
pub type OnError = Box<dyn FnOnce(String) + Send + 'static>;

/// Fire-and-forget recording with completion callbacks.
///
/// Callbacks may be invoked from any thread.
pub trait CallbackRecorder: Send + Sync {
    fn start_recording(
        &self,
        options: RecordOptions,
        on_finished: OnFinished,
        on_error: OnError,
    ) -> Result<()>;
}

/// Recording as one future resolving with the result
#[async_trait]
pub trait AsyncRecorder: Send + Sync {
    async fn record_async(&self, options: RecordOptions) -> Result<RecordingResult>;
}

/// A mounted camera
pub trait Camera: Send + Sync {
    fn callback_recorder(&self) -> Option<&dyn CallbackRecorder> {
        None
    }

    fn async_recorder(&self) -> Option<&dyn AsyncRecorder> {
        None
    }

    /// Ask the device to finish the current recording
    fn stop_recording(&self) -> Result<()>;
}

/// Which recording shape a camera was driven through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CallbackStyle,
    PromiseStyle,
}

impl Capability {
    /// Detect the shape to use; callback style is preferred
    pub fn detect(camera: &dyn Camera) -> Option<Self> {
        if camera.callback_recorder().is_some() {
            Some(Self::CallbackStyle)
        } else if camera.async_recorder().is_some() {
            Some(Self::PromiseStyle)
        } else {
            None
        }
    }
}
