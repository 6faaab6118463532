//! Backends that host the mock service process.
//!
//! A backend knows how to bring one mock service instance up, where it can be
//! reached, and how to tear it down again. Implementations serialize their
//! state transitions internally, so a single backend may be shared between
//! tasks.

mod attached;
mod container;

pub use attached::AttachedBackend;
pub use container::ContainerBackend;

use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Capability to run, address and stop a mock service instance
#[async_trait]
pub trait Backend: Send + Sync {
    /// Start the instance, replacing any instance that is still registered
    ///
    /// If the previous instance cannot be released no new one is started.
    /// If starting fails the backend is left not running.
    async fn run(&self) -> Result<()>;

    /// Release the running instance; a no-op when nothing is running
    async fn stop(&self) -> Result<()>;

    /// Reachable base URL of the running instance
    ///
    /// Fails with [`Error::BackendNotRunning`](crate::Error::BackendNotRunning)
    /// when no instance is registered.
    async fn base_url(&self) -> Result<String>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn run(&self) -> Result<()> {
        (**self).run().await
    }

    async fn stop(&self) -> Result<()> {
        (**self).stop().await
    }

    async fn base_url(&self) -> Result<String> {
        (**self).base_url().await
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Box<B> {
    async fn run(&self) -> Result<()> {
        (**self).run().await
    }

    async fn stop(&self) -> Result<()> {
        (**self).stop().await
    }

    async fn base_url(&self) -> Result<String> {
        (**self).base_url().await
    }
}
