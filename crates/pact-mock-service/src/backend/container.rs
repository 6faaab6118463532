//! Mock service running in a container.

use super::Backend;
use crate::{config::MockServiceConfig, probe::ReadinessProber, Error, Result};
use async_trait::async_trait;
use container_runtime::{ContainerHandle, DockerCli, LaunchSpec, Orchestrator};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Label put on every container started by this backend
pub const CONTAINER_LABEL: &str = "pact-mock-service";

/// Backend that launches the mock service image through an [`Orchestrator`]
///
/// The container handle is guarded by a mutex that is held across launch and
/// removal, but released before the readiness probe so that a slow probe
/// never blocks [`stop`](Backend::stop).
pub struct ContainerBackend<O = DockerCli> {
    orchestrator: O,
    repository: String,
    tag: String,
    port: u16,
    bind_host: String,
    launch_timeout: Duration,
    prober: ReadinessProber,
    http: reqwest::Client,
    resource: Mutex<Option<ContainerHandle>>,
}

impl ContainerBackend<DockerCli> {
    /// Backend that runs containers with the local `docker` CLI
    pub fn new(config: &MockServiceConfig) -> Result<Self> {
        Self::with_orchestrator(DockerCli::new(), config)
    }
}

impl<O: Orchestrator> ContainerBackend<O> {
    /// Backend that runs containers with the given orchestrator
    pub fn with_orchestrator(orchestrator: O, config: &MockServiceConfig) -> Result<Self> {
        // Liveness attempts are bounded by the prober, not the client
        let http = reqwest::Client::builder()
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            orchestrator,
            repository: config.image.repository().to_string(),
            tag: config.image.tag.clone(),
            port: config.port,
            bind_host: config.bind_host.clone(),
            launch_timeout: config.launch_timeout(),
            prober: ReadinessProber::from(&config.probe),
            http,
            resource: Mutex::new(None),
        })
    }

    /// Replace the readiness prober
    ///
    /// The per-attempt liveness deadline follows the new prober's
    /// `max_interval`.
    pub fn with_prober(mut self, prober: ReadinessProber) -> Self {
        self.prober = prober;
        self
    }

    /// Deadline for starting the container, image pull included
    pub fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    /// Whether a container is currently registered
    pub async fn is_running(&self) -> bool {
        self.resource.lock().await.is_some()
    }

    /// The orchestrator this backend launches containers with
    pub fn orchestrator(&self) -> &O {
        &self.orchestrator
    }

    fn launch_spec(&self) -> LaunchSpec {
        LaunchSpec::new(&self.repository, &self.tag)
            .with_exposed_port(self.port)
            .with_cmd([
                "mock-service".to_string(),
                format!("--host={}", self.bind_host),
                "-p".to_string(),
                self.port.to_string(),
            ])
            .with_label(CONTAINER_LABEL, "true")
    }
}

#[async_trait]
impl<O: Orchestrator> Backend for ContainerBackend<O> {
    async fn run(&self) -> Result<()> {
        let mut resource = self.resource.lock().await;

        if let Some(previous) = resource.as_ref() {
            info!(
                "Releasing previous mock service container {}",
                previous.short_id()
            );
            self.orchestrator
                .destroy(previous)
                .await
                .map_err(Error::Orchestrator)?;
            *resource = None;
        }

        let spec = self.launch_spec();
        info!("Launching mock service from {}", spec.image());
        let handle = tokio::time::timeout(self.launch_timeout, self.orchestrator.launch(&spec))
            .await
            .map_err(|_| Error::LaunchTimeout {
                image: spec.image(),
                after: self.launch_timeout,
            })?
            .map_err(Error::Launch)?;

        debug!("Mock service container {} registered", handle.short_id());
        *resource = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut resource = self.resource.lock().await;

        let Some(handle) = resource.as_ref() else {
            debug!("No mock service container running, nothing to stop");
            return Ok(());
        };

        info!("Stopping mock service container {}", handle.short_id());
        self.orchestrator
            .destroy(handle)
            .await
            .map_err(Error::Orchestrator)?;
        *resource = None;
        Ok(())
    }

    async fn base_url(&self) -> Result<String> {
        let address = {
            let resource = self.resource.lock().await;
            let handle = resource.as_ref().ok_or(Error::BackendNotRunning)?;
            self.orchestrator
                .resolve_host_port(handle, self.port)
                .map_err(Error::Orchestrator)?
        };

        let url = format!("http://{address}");
        debug!("Waiting for mock service at {}", url);

        let start = Instant::now();
        self.prober
            .probe_http(&self.http, &url)
            .await
            .map_err(|source| Error::ProbeTimeout {
                url: url.clone(),
                elapsed: start.elapsed(),
                source,
            })?;

        info!("Mock service ready at {}", url);
        Ok(url)
    }
}
