//! Client for the mock service control plane.
//!
//! | Operation | Method | Path                         |
//! |-----------|--------|------------------------------|
//! | Create    | POST   | `/interactions`              |
//! | Delete    | DELETE | `/interactions`              |
//! | Verify    | GET    | `/interactions/verification` |
//!
//! Every request carries `X-Pact-Mock-Service: true`; create and delete also
//! send `Content-Type: application/json`. Anything but `200 OK` is an error.

use crate::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Method, StatusCode};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Header that marks a request as addressed to the mock service itself
pub const MOCK_SERVICE_HEADER: &str = "X-Pact-Mock-Service";
/// Value of [`MOCK_SERVICE_HEADER`]
pub const MOCK_SERVICE_HEADER_VALUE: &str = "true";
/// Content type of interaction documents
pub const CONTENT_TYPE_JSON: &str = "application/json";

const INTERACTIONS_PATH: &str = "/interactions";
const VERIFICATION_PATH: &str = "/interactions/verification";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Control-plane operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Register interactions
    Create,
    /// Remove all registered interactions
    Delete,
    /// Check that every registered interaction was exercised
    Verify,
}

impl Operation {
    fn method(self) -> Method {
        match self {
            Operation::Create => Method::POST,
            Operation::Delete => Method::DELETE,
            Operation::Verify => Method::GET,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Operation::Create | Operation::Delete => INTERACTIONS_PATH,
            Operation::Verify => VERIFICATION_PATH,
        }
    }

    fn sends_json(self) -> bool {
        !matches!(self, Operation::Verify)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create interactions",
            Operation::Delete => "delete interactions",
            Operation::Verify => "verify interactions",
        };
        f.write_str(name)
    }
}

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Deadline for this call instead of the client default
    pub timeout: Option<Duration>,
    /// Abort the call as soon as this token is cancelled
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    /// Options with a deadline override
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Options that observe a cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// HTTP client bound to one mock service base URL
#[derive(Debug, Clone)]
pub struct MockServiceClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl MockServiceClient {
    /// Client for the mock service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a caller-built HTTP client
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Default deadline for every call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register the interactions in `body` (a Pact JSON document)
    pub async fn create(&self, body: impl Into<Body>) -> Result<()> {
        self.create_with(body, &CallOptions::default()).await
    }

    /// [`create`](Self::create) with per-call options
    pub async fn create_with(&self, body: impl Into<Body>, options: &CallOptions) -> Result<()> {
        self.execute(Operation::Create, Some(body.into()), options).await
    }

    /// Remove every registered interaction
    pub async fn delete(&self) -> Result<()> {
        self.delete_with(&CallOptions::default()).await
    }

    /// [`delete`](Self::delete) with per-call options
    pub async fn delete_with(&self, options: &CallOptions) -> Result<()> {
        self.execute(Operation::Delete, None, options).await
    }

    /// Check that every registered interaction was exercised
    ///
    /// On mismatch the error carries the mock service's report.
    pub async fn verify(&self) -> Result<()> {
        self.verify_with(&CallOptions::default()).await
    }

    /// [`verify`](Self::verify) with per-call options
    pub async fn verify_with(&self, options: &CallOptions) -> Result<()> {
        self.execute(Operation::Verify, None, options).await
    }

    fn request(&self, operation: Operation) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, operation.path());
        let request = self
            .http
            .request(operation.method(), url)
            .header(MOCK_SERVICE_HEADER, MOCK_SERVICE_HEADER_VALUE);

        if operation.sends_json() {
            request.header(CONTENT_TYPE, CONTENT_TYPE_JSON)
        } else {
            request
        }
    }

    async fn execute(
        &self,
        operation: Operation,
        body: Option<Body>,
        options: &CallOptions,
    ) -> Result<()> {
        let timeout = options.timeout.unwrap_or(self.timeout);
        let mut request = self.request(operation).timeout(timeout);
        if let Some(body) = body {
            request = request.body(body);
        }

        let call = async {
            debug!("Sending {} to {}", operation, self.base_url);
            let response = request
                .send()
                .await
                .map_err(|e| classify(operation, timeout, e))?;

            let status = response.status();
            // Read the whole body so the connection can be reused
            let text = response
                .text()
                .await
                .map_err(|e| classify(operation, timeout, e))?;

            if status == StatusCode::OK {
                Ok(())
            } else {
                warn!("{} returned {}: {}", operation, status, text);
                Err(Error::Protocol {
                    operation,
                    status: status.as_u16(),
                    body: text,
                })
            }
        };

        match &options.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled { operation }),
                    result = call => result,
                }
            }
            None => call.await,
        }
    }
}

fn classify(operation: Operation, timeout: Duration, error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout {
            operation,
            after: timeout,
        }
    } else {
        Error::Transport {
            operation,
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_wire_mapping() {
        assert_eq!(Operation::Create.method(), Method::POST);
        assert_eq!(Operation::Create.path(), "/interactions");
        assert_eq!(Operation::Delete.method(), Method::DELETE);
        assert_eq!(Operation::Delete.path(), "/interactions");
        assert_eq!(Operation::Verify.method(), Method::GET);
        assert_eq!(Operation::Verify.path(), "/interactions/verification");
        assert!(!Operation::Verify.sends_json());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = MockServiceClient::new("http://localhost:1234/");
        assert_eq!(client.base_url(), "http://localhost:1234");
    }

    #[test]
    fn test_error_messages() {
        let err = Error::Protocol {
            operation: Operation::Verify,
            status: 500,
            body: "Missing requests: GET /path_one".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "verify interactions failed with status 500: Missing requests: GET /path_one"
        );
        assert_eq!(
            Error::Cancelled {
                operation: Operation::Delete
            }
            .to_string(),
            "delete interactions was cancelled"
        );
    }
}
