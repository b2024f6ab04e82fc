//! Data formats and local media addressing

mod format;

pub use format::ClipManifest;

use reqwest::Url;
use std::path::{Path, PathBuf};

/// Resolve a `file://` URI (or a plain path) to a filesystem path.
///
/// Percent-escapes are decoded, so `Application%20Support` names the
/// directory with a space in it.
pub fn path_from_uri(uri: &str) -> PathBuf {
    if !uri.starts_with("file:") {
        return PathBuf::from(uri);
    }

    match Url::parse(uri).map(|url| url.to_file_path()) {
        Ok(Ok(path)) => path,
        _ => PathBuf::from(uri.trim_start_matches("file://")),
    }
}

/// Render a local path the way camera backends report media locations
pub fn uri_from_path(path: &Path) -> String {
    match Url::from_file_path(path) {
        Ok(url) => url.into(),
        // Relative paths have no file URL.
        Err(()) => format!("file://{}", path.display()),
    }
}

/// MIME type for a media file, by extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
