//! Clip upload to the remote object store

mod transport;

pub(crate) use transport::local_file_size;
pub use transport::{UploadError, UploadRef, Uploader};
