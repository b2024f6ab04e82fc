//! Object store upload transport
//!
//! Streams video files from disk so large clips never sit in RAM. Every
//! upload is gated on the connectivity probe; an offline attempt fails fast
//! instead of being queued.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::data::{content_type_for, path_from_uri};
use crate::net::Connectivity;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("offline: connect to the internet to upload")]
    Offline,

    #[error("upload endpoint not configured")]
    NotConfigured,

    #[error("invalid upload endpoint {endpoint:?}: {reason}")]
    BadEndpoint { endpoint: String, reason: String },

    #[error("local file not found: {0:?}")]
    FileMissing(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize upload payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
}

/// Durable reference to an uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRef {
    pub key: String,
    pub url: String,
}

/// Object metadata returned by the store on success
#[derive(Debug, Deserialize)]
struct ObjectResponse {
    name: Option<String>,
    #[serde(rename = "downloadTokens")]
    download_tokens: Option<String>,
}

#[derive(Clone)]
pub struct Uploader {
    client: Client,
    endpoint: Option<String>,
    auth_token: Option<String>,
    video_prefix: String,
    connectivity: Arc<dyn Connectivity>,
}

impl Uploader {
    pub fn new(config: &UploadConfig, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            auth_token: config.auth_token.clone(),
            video_prefix: config.video_prefix.clone(),
            connectivity,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Upload a local video file and return where it landed
    pub async fn upload_file_on_tap(&self, local_uri: &str) -> Result<UploadRef, UploadError> {
        self.ensure_online().await?;
        let endpoint = self.endpoint.as_deref().ok_or(UploadError::NotConfigured)?;

        let path = path_from_uri(local_uri);
        let file_size = local_file_size(&path).await?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("bin");
        let key = object_key(&self.video_prefix, ext);
        let content_type = content_type_for(&path);

        let file = File::open(&path).await.map_err(|source| UploadError::Io {
            path: path.clone(),
            source,
        })?;
        let body = Body::wrap_stream(ReaderStream::new(file));

        info!(
            "Uploading {:?} as {} ({:.2} MB)",
            path,
            key,
            file_size as f64 / (1024.0 * 1024.0)
        );

        let request = self
            .post(endpoint, &key)?
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, file_size)
            .body(body);

        self.finish(endpoint, &key, request).await
    }

    /// Upload a small JSON document under `prefix`
    pub async fn upload_json_on_tap<T>(&self, data: &T, prefix: &str) -> Result<UploadRef, UploadError>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_online().await?;
        let endpoint = self.endpoint.as_deref().ok_or(UploadError::NotConfigured)?;

        let bytes = serde_json::to_vec(data)?;
        let key = object_key(prefix, "json");
        debug!("Uploading JSON sidecar {} ({} bytes)", key, bytes.len());

        let request = self
            .post(endpoint, &key)?
            .header(CONTENT_TYPE, "application/json")
            .body(bytes);

        self.finish(endpoint, &key, request).await
    }

    async fn ensure_online(&self) -> Result<(), UploadError> {
        if self.connectivity.is_online().await {
            Ok(())
        } else {
            warn!("Upload attempted while offline");
            Err(UploadError::Offline)
        }
    }

    fn post(&self, endpoint: &str, key: &str) -> Result<RequestBuilder, UploadError> {
        let url = parse_endpoint(endpoint)?;

        let mut request = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", key)]);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn finish(
        &self,
        endpoint: &str,
        key: &str,
        request: RequestBuilder,
    ) -> Result<UploadRef, UploadError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let object: ObjectResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        let name = object
            .name
            .ok_or_else(|| UploadError::InvalidResponse("missing object name".to_string()))?;
        if name != key {
            debug!("Store renamed object {} -> {}", key, name);
        }

        let token = object
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|token| !token.is_empty());
        let url = download_url(endpoint, &name, token)?;

        info!("Uploaded {}", name);
        Ok(UploadRef { key: name, url })
    }
}

/// Size of a local regular file; anything else counts as missing
pub(crate) async fn local_file_size(path: &Path) -> Result<u64, UploadError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        Ok(_) => Err(UploadError::FileMissing(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(UploadError::FileMissing(path.to_path_buf()))
        }
        Err(source) => Err(UploadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, UploadError> {
    let url = Url::parse(endpoint).map_err(|e| UploadError::BadEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(UploadError::BadEndpoint {
            endpoint: endpoint.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }
    Ok(url)
}

/// `{prefix}/{YYYYMMDD}/{uuid}.{ext}`
fn object_key(prefix: &str, ext: &str) -> String {
    let day = chrono::Utc::now().format("%Y%m%d");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}.{}", day, uuid::Uuid::new_v4(), ext)
    } else {
        format!("{}/{}/{}.{}", prefix, day, uuid::Uuid::new_v4(), ext)
    }
}

/// `{endpoint}/{encoded name}?alt=media[&token=...]`
fn download_url(endpoint: &str, name: &str, token: Option<&str>) -> Result<String, UploadError> {
    let mut url = parse_endpoint(endpoint)?;
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| UploadError::BadEndpoint {
            endpoint: endpoint.to_string(),
            reason: "not a hierarchical URL".to_string(),
        })?
        .pop_if_empty()
        .push(name);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("alt", "media");
        if let Some(token) = token {
            query.append_pair("token", token);
        }
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve_canned, FixedConnectivity};
    use serde_json::json;

    fn uploader(endpoint: Option<String>, online: bool) -> Uploader {
        let config = UploadConfig {
            endpoint,
            auth_token: Some("secret".to_string()),
            ..UploadConfig::default()
        };
        Uploader::new(&config, Arc::new(FixedConnectivity::new(online)))
    }

    #[tokio::test]
    async fn test_offline_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"video").unwrap();

        let uploader = uploader(Some("http://127.0.0.1:9/o".to_string()), false);
        let err = uploader
            .upload_file_on_tap(&format!("file://{}", path.display()))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Offline));
        assert!(err.to_string().contains("offline"));

        let err = uploader.upload_json_on_tap(&json!({"a": 1}), "manifests").await.unwrap_err();
        assert!(matches!(err, UploadError::Offline));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let uploader = uploader(Some("http://127.0.0.1:9/o".to_string()), true);
        let err = uploader
            .upload_file_on_tap("file:///definitely/not/here.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::FileMissing(_)));
    }

    #[tokio::test]
    async fn test_not_configured() {
        let uploader = uploader(None, true);
        assert!(!uploader.is_configured());
        let err = uploader.upload_json_on_tap(&json!({}), "x").await.unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured));
    }

    #[tokio::test]
    async fn test_malformed_endpoint_is_reported_as_such() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"video").unwrap();

        for endpoint in ["not a url", "mailto:uploads@example.com"] {
            let uploader = uploader(Some(endpoint.to_string()), true);
            let err = uploader
                .upload_file_on_tap(&format!("file://{}", path.display()))
                .await
                .unwrap_err();
            match err {
                UploadError::BadEndpoint { endpoint: reported, .. } => {
                    assert_eq!(reported, endpoint)
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_streams_file_and_returns_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"not really an mp4").unwrap();

        let (base, mut requests) = serve_canned(
            "200 OK",
            json!({"name": "videos/20261019/abc.mp4", "downloadTokens": "tok1,tok2"}).to_string(),
        )
        .await;
        let uploader = uploader(Some(format!("{}/v0/b/bucket/o", base)), true);

        let reference = uploader
            .upload_file_on_tap(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(reference.key, "videos/20261019/abc.mp4");
        assert_eq!(
            reference.url,
            format!(
                "{}/v0/b/bucket/o/videos%2F20261019%2Fabc.mp4?alt=media&token=tok1",
                base
            )
        );

        let request = requests.recv().await.unwrap();
        let head = request.head.to_ascii_lowercase();
        assert!(head.starts_with("post /v0/b/bucket/o?uploadtype=media&name=videos%2f"));
        assert!(head.contains("authorization: bearer secret"));
        assert!(head.contains("content-type: video/mp4"));
        assert_eq!(request.body, b"not really an mp4");
    }

    #[tokio::test]
    async fn test_json_sidecar_body() {
        let (base, mut requests) =
            serve_canned("200 OK", json!({"name": "manifests/x.json"}).to_string()).await;
        let uploader = uploader(Some(format!("{}/o", base)), true);

        let reference = uploader
            .upload_json_on_tap(&json!({"shareId": "s1"}), "manifests")
            .await
            .unwrap();
        assert_eq!(reference.key, "manifests/x.json");
        assert_eq!(reference.url, format!("{}/o/manifests%2Fx.json?alt=media", base));

        let request = requests.recv().await.unwrap();
        assert!(request
            .head
            .to_ascii_lowercase()
            .contains("content-type: application/json"));
        let sent: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(sent, json!({"shareId": "s1"}));
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let (base, _requests) =
            serve_canned("403 Forbidden", "{\"error\":\"permission denied\"}".to_string()).await;
        let uploader = uploader(Some(format!("{}/o", base)), true);

        let err = uploader.upload_json_on_tap(&json!({}), "m").await.unwrap_err();
        match err {
            UploadError::Status { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("permission denied"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_response_without_name_is_rejected() {
        let (base, _requests) = serve_canned("200 OK", "{}".to_string()).await;
        let uploader = uploader(Some(format!("{}/o", base)), true);
        let err = uploader.upload_json_on_tap(&json!({}), "m").await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }

    #[test]
    fn test_object_key_layout() {
        let key = object_key("/videos/", "mp4");
        let parts: Vec<_> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "videos");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[2].ends_with(".mp4"));

        assert_eq!(object_key("", "json").split('/').count(), 2);
    }
}
