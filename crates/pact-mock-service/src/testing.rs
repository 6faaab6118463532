//! Test doubles for code that drives a [`ContainerBackend`](crate::ContainerBackend)
//! without a container runtime.

use async_trait::async_trait;
use container_runtime::{ContainerHandle, Error, LaunchSpec, Orchestrator, PortBinding, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Something the scripted orchestrator was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// A container was launched
    Launched(String),
    /// Launching was attempted and failed
    LaunchFailed(String),
    /// A container was destroyed
    Destroyed(String),
    /// Destroying was attempted and failed
    DestroyFailed(String),
}

/// In-memory orchestrator that pretends every container publishes its ports
/// on one fixed address
#[derive(Debug)]
pub struct ScriptedOrchestrator {
    address: String,
    fail_launch: AtomicBool,
    fail_destroy: AtomicBool,
    launched: AtomicUsize,
    events: Mutex<Vec<OrchestratorEvent>>,
}

impl ScriptedOrchestrator {
    /// Orchestrator whose containers resolve to `address` (`host:port`)
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            fail_launch: AtomicBool::new(false),
            fail_destroy: AtomicBool::new(false),
            launched: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent launches fail with [`Error::ImageNotFound`]
    pub fn fail_launches(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent destroys fail
    pub fn fail_destroys(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    /// Everything that happened so far, in order
    pub fn events(&self) -> Vec<OrchestratorEvent> {
        self.lock_events().clone()
    }

    /// Number of successful launches
    pub fn launches(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// Containers launched but not yet destroyed
    pub fn live_containers(&self) -> usize {
        self.lock_events()
            .iter()
            .fold(0usize, |live, event| match event {
                OrchestratorEvent::Launched(_) => live + 1,
                OrchestratorEvent::Destroyed(_) => live.saturating_sub(1),
                _ => live,
            })
    }

    fn lock_events(&self) -> MutexGuard<'_, Vec<OrchestratorEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: OrchestratorEvent) {
        self.lock_events().push(event);
    }

    fn binding(&self) -> PortBinding {
        let (host, port) = self
            .address
            .rsplit_once(':')
            .unwrap_or((self.address.as_str(), "0"));
        PortBinding {
            host_ip: host.to_string(),
            host_port: port.parse().unwrap_or(0),
        }
    }
}

#[async_trait]
impl Orchestrator for ScriptedOrchestrator {
    async fn launch(&self, spec: &LaunchSpec) -> Result<ContainerHandle> {
        if self.fail_launch.load(Ordering::SeqCst) {
            self.record(OrchestratorEvent::LaunchFailed(spec.image()));
            return Err(Error::ImageNotFound {
                image: spec.image(),
            });
        }

        let n = self.launched.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("scripted-{n}");
        let handle = spec
            .exposed_ports
            .iter()
            .fold(ContainerHandle::new(&id, &id), |handle, &port| {
                handle.with_port(port, self.binding())
            });

        self.record(OrchestratorEvent::Launched(id));
        Ok(handle)
    }

    fn resolve_host_port(&self, handle: &ContainerHandle, internal_port: u16) -> Result<String> {
        if handle.ports.contains_key(&internal_port) {
            Ok(self.address.clone())
        } else {
            Err(Error::PortNotPublished {
                id: handle.id.clone(),
                port: internal_port,
            })
        }
    }

    async fn destroy(&self, handle: &ContainerHandle) -> Result<()> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            self.record(OrchestratorEvent::DestroyFailed(handle.id.clone()));
            return Err(Error::CommandFailed {
                command: format!("rm -f -v {}", handle.id),
                code: Some(1),
                stderr: "device or resource busy".to_string(),
            });
        }

        self.record(OrchestratorEvent::Destroyed(handle.id.clone()));
        Ok(())
    }
}
