//! Launch descriptions and handles for running containers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to run and how to expose it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Image repository, e.g. `pactfoundation/pact-cli`
    pub repository: String,
    /// Image tag
    pub tag: String,
    /// Internal TCP ports to publish on ephemeral host ports
    pub exposed_ports: Vec<u16>,
    /// Command line passed to the image entrypoint
    pub cmd: Vec<String>,
    /// Labels attached to the container
    pub labels: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Create a spec for `repository:tag` with no ports and the default command
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
            exposed_ports: Vec::new(),
            cmd: Vec::new(),
            labels: BTreeMap::new(),
        }
    }

    /// Publish an internal port
    pub fn with_exposed_port(mut self, port: u16) -> Self {
        self.exposed_ports.push(port);
        self
    }

    /// Replace the command line
    pub fn with_cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// `repository:tag`, or just the repository when no tag is set
    pub fn image(&self) -> String {
        if self.tag.is_empty() {
            self.repository.clone()
        } else {
            format!("{}:{}", self.repository, self.tag)
        }
    }
}

/// A host address an internal port is published on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Host interface, as reported by the runtime (may be a wildcard)
    pub host_ip: String,
    /// Host port
    pub host_port: u16,
}

/// Handle to a launched container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    /// Runtime container identifier
    pub id: String,
    /// Container name
    pub name: String,
    /// Published bindings keyed by internal port
    pub ports: BTreeMap<u16, PortBinding>,
}

impl ContainerHandle {
    /// Create a handle with no published ports
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ports: BTreeMap::new(),
        }
    }

    /// Record a published binding
    pub fn with_port(mut self, internal: u16, binding: PortBinding) -> Self {
        self.ports.insert(internal, binding);
        self
    }

    /// Abbreviated identifier for log lines
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// First 12 characters of a container id, the form `docker ps` prints
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
