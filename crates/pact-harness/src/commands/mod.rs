pub mod exec;
pub mod up;
pub mod verify;

use anyhow::{Context, Result};
use clap::Args;
use pact_mock_service::{MockServiceConfig, TeardownReport};
use std::path::PathBuf;

/// Options shared by every command that starts a session
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Interaction fixture to load (repeatable, loaded in order)
    #[arg(short, long = "fixture")]
    pub fixtures: Vec<PathBuf>,

    /// Mock service image repository
    #[arg(long)]
    pub image: Option<String>,

    /// Mock service image tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Attach to a running mock service instead of launching a container
    #[arg(long)]
    pub url: Option<String>,
}

impl SessionArgs {
    /// Configuration file values with command line overrides applied
    pub fn into_config(self) -> Result<MockServiceConfig> {
        let mut config = match &self.config {
            Some(path) => MockServiceConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => MockServiceConfig::default(),
        };

        if let Some(image) = self.image {
            config.image.repository = image;
        }
        if let Some(tag) = self.tag {
            config.image.tag = tag;
        }
        if let Some(url) = self.url {
            config.base_url = Some(url);
        }
        config.fixtures.extend(self.fixtures);

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Print teardown outcomes; returns whether both succeeded
pub fn print_report(report: &TeardownReport) -> bool {
    match &report.verification {
        Ok(()) => println!("✓ All interactions verified"),
        Err(e) => eprintln!("✗ Verification failed: {}", e),
    }
    if let Err(e) = &report.shutdown {
        eprintln!("✗ Failed to stop mock service: {}", e);
    }
    report.is_ok()
}
