//! Clip sync - tracks each local video's relationship to the remote store

mod engine;
pub mod kv;
mod status;
mod store;

pub use engine::{ClipSyncer, SyncError};
pub use kv::{FileKvStore, KeyValueStore, MemoryKvStore};
pub use status::{LocalClip, SyncMap, SyncStatus};
pub use store::{SyncStatusStore, DEFAULT_MAP_KEY};

/// Progress updates from the sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Probing connectivity before an upload
    Checking { key: String },
    /// Transfer in progress
    Uploading { key: String },
    /// Clip is on the remote store
    Synced { key: String },
    /// Attempt ended without an upload
    Failed { key: String, message: String },
}
