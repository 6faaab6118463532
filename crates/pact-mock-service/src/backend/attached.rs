//! Mock service that is already running somewhere else.

use super::Backend;
use crate::{probe::ReadinessProber, Error, Result};
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Backend for a mock service whose lifecycle is managed elsewhere
///
/// `run` and `stop` only attach and detach; the remote process is never
/// touched. While attached, [`base_url`](Backend::base_url) still waits for the
/// service to answer, each attempt bounded by the prober's `max_interval`.
pub struct AttachedBackend {
    url: String,
    prober: ReadinessProber,
    http: reqwest::Client,
    attached: Mutex<bool>,
}

impl AttachedBackend {
    /// Attachable backend for the mock service at `url`
    pub fn new(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            prober: ReadinessProber::new(),
            http: reqwest::Client::new(),
            attached: Mutex::new(false),
        }
    }

    /// Replace the readiness prober
    pub fn with_prober(mut self, prober: ReadinessProber) -> Self {
        self.prober = prober;
        self
    }

    /// Whether the backend is currently attached
    pub async fn is_attached(&self) -> bool {
        *self.attached.lock().await
    }
}

#[async_trait]
impl Backend for AttachedBackend {
    async fn run(&self) -> Result<()> {
        let mut attached = self.attached.lock().await;
        if *attached {
            debug!("Re-attaching to mock service at {}", self.url);
        }
        *attached = true;
        info!("Attached to mock service at {}", self.url);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut attached = self.attached.lock().await;
        if *attached {
            info!("Detached from mock service at {}", self.url);
        }
        *attached = false;
        Ok(())
    }

    async fn base_url(&self) -> Result<String> {
        if !*self.attached.lock().await {
            return Err(Error::BackendNotRunning);
        }

        let start = Instant::now();
        self.prober
            .probe_http(&self.http, &self.url)
            .await
            .map_err(|source| Error::ProbeTimeout {
                url: self.url.clone(),
                elapsed: start.elapsed(),
                source,
            })?;

        Ok(self.url.clone())
    }
}
