//! Mock service configuration.
//!
//! Every field has a default, so a YAML file only needs to mention what it
//! changes:
//!
//! ```yaml
//! image:
//!   tag: "v0.50.0.28"
//! request_timeout_secs: 5
//! fixtures:
//!   - fixtures/simple.json
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Image used when none is configured
pub const DEFAULT_REPOSITORY: &str = "pactfoundation/pact-cli";
/// Tag used when none is configured
pub const DEFAULT_TAG: &str = "latest";
/// Port the mock service listens on inside the container
pub const DEFAULT_PORT: u16 = 1234;

/// Configuration for a mock service session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MockServiceConfig {
    /// Image to run
    pub image: ImageConfig,
    /// Port the mock service listens on inside the container
    pub port: u16,
    /// Address the mock service binds to inside the container
    pub bind_host: String,
    /// Default deadline for control-plane calls, in seconds
    pub request_timeout_secs: u64,
    /// Deadline for starting the container, image pull included, in seconds
    pub launch_timeout_secs: u64,
    /// Readiness probe tuning
    pub probe: ProbeConfig,
    /// Interaction fixtures loaded at session start, in order
    pub fixtures: Vec<PathBuf>,
    /// Attach to an already running mock service instead of launching one
    pub base_url: Option<String>,
}

/// Container image reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageConfig {
    /// Image repository
    pub repository: String,
    /// Image tag
    pub tag: String,
}

/// Exponential backoff settings for the readiness probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Delay before the first retry, in milliseconds
    pub initial_interval_ms: u64,
    /// Growth factor between retries
    pub multiplier: f64,
    /// Upper bound for a single retry delay, in seconds
    pub max_interval_secs: u64,
    /// Total time budget for the probe, in seconds
    pub max_elapsed_secs: u64,
}

impl Default for MockServiceConfig {
    fn default() -> Self {
        Self {
            image: ImageConfig::default(),
            port: DEFAULT_PORT,
            bind_host: "0.0.0.0".to_string(),
            request_timeout_secs: 10,
            launch_timeout_secs: 300,
            probe: ProbeConfig::default(),
            fixtures: Vec::new(),
            base_url: None,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            repository: DEFAULT_REPOSITORY.to_string(),
            tag: DEFAULT_TAG.to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 2.0,
            max_interval_secs: 5,
            max_elapsed_secs: 60,
        }
    }
}

impl MockServiceConfig {
    /// Load and validate a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can produce a working session
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must not be 0".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.launch_timeout_secs == 0 {
            return Err(Error::Config(
                "launch_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.probe.initial_interval_ms == 0 {
            return Err(Error::Config(
                "probe.initial_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.probe.max_interval_secs == 0 {
            return Err(Error::Config(
                "probe.max_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.probe.multiplier.is_nan() || self.probe.multiplier < 1.0 {
            return Err(Error::Config(format!(
                "probe.multiplier must be at least 1.0, got {}",
                self.probe.multiplier
            )));
        }
        if self.probe.max_interval() > self.probe.max_elapsed() {
            return Err(Error::Config(
                "probe.max_interval_secs must not exceed probe.max_elapsed_secs".to_string(),
            ));
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "base_url must be an http(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }

    /// Default deadline for control-plane calls
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Deadline for starting the container
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }

    /// Set the image tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.image.tag = tag.into();
        self
    }

    /// Append a fixture path
    pub fn with_fixture(mut self, path: impl Into<PathBuf>) -> Self {
        self.fixtures.push(path.into());
        self
    }

    /// Attach to an existing mock service
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl ImageConfig {
    /// Repository, falling back to the default image when blank
    pub fn repository(&self) -> &str {
        if self.repository.trim().is_empty() {
            DEFAULT_REPOSITORY
        } else {
            &self.repository
        }
    }
}

impl ProbeConfig {
    /// Delay before the first retry
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    /// Upper bound for a single retry delay
    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }

    /// Total time budget
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs)
    }
}
