//! Timeout-guarded connectivity probe

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::config::ProbeConfig;

/// Answers "are we online"; never fails, uncertainty means offline
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Probe that issues a minimal GET against a low-overhead endpoint
#[derive(Clone)]
pub struct NetworkProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl NetworkProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self::with_url(config.url.clone(), config.timeout())
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout,
        }
    }

    /// Probe with an explicit timeout.
    ///
    /// True only on 200 or 204. Errors, other statuses and timeouts all
    /// report offline.
    pub async fn is_online_within(&self, timeout: Duration) -> bool {
        let request = self.client.get(&self.url).timeout(timeout).send();

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                let status = response.status();
                debug!("Connectivity probe {} -> {}", self.url, status);
                status == StatusCode::OK || status == StatusCode::NO_CONTENT
            }
            Ok(Err(e)) => {
                debug!("Connectivity probe {} failed: {}", self.url, e);
                false
            }
            Err(_) => {
                debug!("Connectivity probe {} timed out after {:?}", self.url, timeout);
                false
            }
        }
    }
}

#[async_trait]
impl Connectivity for NetworkProbe {
    async fn is_online(&self) -> bool {
        self.is_online_within(self.timeout).await
    }
}
