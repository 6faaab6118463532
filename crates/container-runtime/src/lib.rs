//! # Container Runtime
//!
//! The orchestration capability needed to host a throwaway service in a
//! container: launch an image with a published port, look up where that port
//! is reachable from the host, and destroy the container afterwards.
//!
//! The [`Orchestrator`] trait is the seam; [`DockerCli`] drives a local
//! `docker` binary.
//!
//! ## Example
//!
//! ```rust,no_run
//! use container_runtime::{DockerCli, LaunchSpec, Orchestrator};
//!
//! # async fn example() -> container_runtime::Result<()> {
//! let docker = DockerCli::new();
//! let spec = LaunchSpec::new("nginx", "latest").with_exposed_port(80);
//!
//! let handle = docker.launch(&spec).await?;
//! let address = docker.resolve_host_port(&handle, 80)?;
//! println!("nginx reachable at {address}");
//! docker.destroy(&handle).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod docker;
mod error;
mod spec;

pub use docker::DockerCli;
pub use error::{Error, Result};
pub use spec::{ContainerHandle, LaunchSpec, PortBinding};

use async_trait::async_trait;

/// Capability to run containers on behalf of a backend
///
/// Implementations own no per-container state; everything needed to address
/// a running container lives in the [`ContainerHandle`] returned by
/// [`launch`](Orchestrator::launch).
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Start a new container described by `spec`
    async fn launch(&self, spec: &LaunchSpec) -> Result<ContainerHandle>;

    /// Externally reachable `host:port` for an internal container port
    fn resolve_host_port(&self, handle: &ContainerHandle, internal_port: u16) -> Result<String>;

    /// Stop and remove the container, including its anonymous volumes
    async fn destroy(&self, handle: &ContainerHandle) -> Result<()>;
}

#[async_trait]
impl<O: Orchestrator + ?Sized> Orchestrator for std::sync::Arc<O> {
    async fn launch(&self, spec: &LaunchSpec) -> Result<ContainerHandle> {
        (**self).launch(spec).await
    }

    fn resolve_host_port(&self, handle: &ContainerHandle, internal_port: u16) -> Result<String> {
        (**self).resolve_host_port(handle, internal_port)
    }

    async fn destroy(&self, handle: &ContainerHandle) -> Result<()> {
        (**self).destroy(handle).await
    }
}
