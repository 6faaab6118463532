//! # Pact Mock Service
//!
//! Contract-testing sessions backed by a throwaway Pact mock service.
//!
//! A [`MockServiceSession`] starts a [`Backend`] (by default a container running
//! `pactfoundation/pact-cli mock-service`), waits until it answers HTTP, clears
//! any interactions it already holds, and loads the configured fixtures. Test
//! code then talks to [`MockServiceSession::url`]. At the end of the test,
//! [`MockServiceSession::finish`] verifies that every interaction was exercised
//! and shuts the backend down whether or not verification passed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pact_mock_service::{Fixture, MockServiceConfig, MockServiceSession};
//!
//! # async fn example() -> pact_mock_service::Result<()> {
//! let session = MockServiceSession::builder(MockServiceConfig::default())
//!     .fixture(Fixture::path("fixtures/simple.json"))
//!     .start()
//!     .await?;
//!
//! let response = reqwest::get(format!("{}/path_one", session.url())).await;
//! assert!(response.is_ok());
//!
//! session.finish().await.into_result()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

pub mod backend;
mod client;
mod config;
mod fixture;
mod probe;
mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::{AttachedBackend, Backend, ContainerBackend};
pub use client::{
    CallOptions, MockServiceClient, Operation, CONTENT_TYPE_JSON, MOCK_SERVICE_HEADER,
    MOCK_SERVICE_HEADER_VALUE,
};
pub use config::{ImageConfig, MockServiceConfig, ProbeConfig};
pub use fixture::Fixture;
pub use probe::ReadinessProber;
pub use session::{MockServiceSession, SessionBuilder, SessionState, TeardownReport};

use std::time::Duration;

/// Error types for mock service sessions
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No backend instance is registered
    #[error("mock service backend is not running")]
    BackendNotRunning,

    /// The container runtime could not start the mock service
    #[error("failed to launch mock service: {0}")]
    Launch(#[source] container_runtime::Error),

    /// The container runtime did not start the mock service in time
    #[error("launching {image} did not finish within {after:?}")]
    LaunchTimeout {
        /// Image being launched
        image: String,
        /// Deadline that was exceeded
        after: Duration,
    },

    /// Any other container runtime failure (port lookup, removal)
    #[error("container runtime error: {0}")]
    Orchestrator(#[source] container_runtime::Error),

    /// The mock service did not answer within the probe budget
    #[error("mock service at {url} not reachable after {elapsed:?}: {source}")]
    ProbeTimeout {
        /// Address that was probed
        url: String,
        /// Time spent probing
        elapsed: Duration,
        /// Error from the last attempt
        #[source]
        source: reqwest::Error,
    },

    /// The control plane answered with something other than 200
    #[error("{operation} failed with status {status}: {body}")]
    Protocol {
        /// Control-plane operation
        operation: Operation,
        /// HTTP status returned
        status: u16,
        /// Response body, usually describing the mismatch
        body: String,
    },

    /// The control-plane request could not be completed
    #[error("{operation} request failed: {source}")]
    Transport {
        /// Control-plane operation
        operation: Operation,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The control-plane request exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Control-plane operation
        operation: Operation,
        /// Deadline that was exceeded
        after: Duration,
    },

    /// The caller cancelled the control-plane request
    #[error("{operation} was cancelled")]
    Cancelled {
        /// Control-plane operation
        operation: Operation,
    },

    /// A fixture could not be opened or read
    #[error("failed to read fixture {name}: {source}")]
    Fixture {
        /// Path or name of the fixture
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Both verification and shutdown failed during teardown
    #[error("verification failed ({verification}) and shutdown failed ({shutdown})")]
    Teardown {
        /// Verification failure
        verification: Box<Error>,
        /// Shutdown failure
        shutdown: Box<Error>,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
