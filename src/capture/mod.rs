//! Segmented camera capture
//!
//! A recording session is a sequence of segments. Each segment is one
//! start/stop cycle on the camera; finished segments are copied into a
//! managed directory and listed on the session in completion order.

mod backend;
mod recording;
mod session;

pub use backend::{
    AsyncRecorder, CallbackRecorder, Camera, Capability, OnError, OnFinished, RecordOptions,
    RecordingResult,
};
pub use recording::{segment_file_name, CaptureError, SegmentRecorder, StartOutcome, StopOutcome};
pub use session::{RecordingSession, Segment};
