//! Mock service sessions.
//!
//! A session owns one backend for the duration of one test. Setup runs
//! `run → base_url → delete → create (per fixture)` and stops at the first
//! failure, releasing the backend before returning the error. Teardown runs
//! `verify → stop`; the stop step happens whatever verification returned.

use crate::backend::{AttachedBackend, Backend, ContainerBackend};
use crate::client::MockServiceClient;
use crate::config::MockServiceConfig;
use crate::fixture::Fixture;
use crate::probe::ReadinessProber;
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Nothing started yet
    Unstarted,
    /// Backend launched, waiting for it to answer
    Starting,
    /// Leftover interactions removed
    InteractionsCleared,
    /// Every fixture loaded
    InteractionsLoaded,
    /// Handed to the test body
    Ready,
    /// Teardown verification in progress
    Verifying,
    /// Backend released
    Stopped,
    /// A step failed; the backend has been released on a best-effort basis
    Failed,
}

/// Outcome of [`MockServiceSession::finish`]
#[derive(Debug)]
#[must_use = "teardown failures are only reported through the report"]
pub struct TeardownReport {
    /// Result of verifying interactions
    pub verification: Result<()>,
    /// Result of stopping the backend
    pub shutdown: Result<()>,
}

impl TeardownReport {
    /// Whether both steps succeeded
    pub fn is_ok(&self) -> bool {
        self.verification.is_ok() && self.shutdown.is_ok()
    }

    /// Fold both outcomes into one result
    pub fn into_result(self) -> Result<()> {
        match (self.verification, self.shutdown) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(verification), Err(shutdown)) => Err(Error::Teardown {
                verification: Box::new(verification),
                shutdown: Box::new(shutdown),
            }),
        }
    }
}

/// Builder for a [`MockServiceSession`]
pub struct SessionBuilder {
    config: MockServiceConfig,
    fixtures: Vec<Fixture>,
    http: Option<reqwest::Client>,
}

impl SessionBuilder {
    /// Add a fixture, loaded after those named in the configuration
    pub fn fixture(mut self, fixture: Fixture) -> Self {
        self.fixtures.push(fixture);
        self
    }

    /// Add several fixtures
    pub fn fixtures(mut self, fixtures: impl IntoIterator<Item = Fixture>) -> Self {
        self.fixtures.extend(fixtures);
        self
    }

    /// HTTP client used for control-plane calls
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Start a session on the backend the configuration asks for: the mock
    /// service at `base_url` if set, a fresh container otherwise
    pub async fn start(self) -> Result<MockServiceSession<Box<dyn Backend>>> {
        self.config.validate()?;

        let backend: Box<dyn Backend> = match &self.config.base_url {
            Some(url) => Box::new(
                AttachedBackend::new(url.clone())
                    .with_prober(ReadinessProber::from(&self.config.probe)),
            ),
            None => Box::new(ContainerBackend::new(&self.config)?),
        };
        self.start_with(backend).await
    }

    /// Start a session on the given backend
    pub async fn start_with<B: Backend>(self, backend: B) -> Result<MockServiceSession<B>> {
        let mut state = SessionState::Unstarted;

        match self.setup(&backend, &mut state).await {
            Ok(client) => {
                advance(&mut state, SessionState::Ready);
                info!("Mock service session ready at {}", client.base_url());
                Ok(MockServiceSession {
                    backend,
                    client,
                    state,
                })
            }
            Err(e) => {
                warn!("Mock service session setup failed in {:?}: {}", state, e);
                advance(&mut state, SessionState::Failed);
                if let Err(stop_error) = backend.stop().await {
                    warn!("Failed to stop backend after setup failure: {}", stop_error);
                }
                Err(e)
            }
        }
    }

    async fn setup<B: Backend>(
        &self,
        backend: &B,
        state: &mut SessionState,
    ) -> Result<MockServiceClient> {
        advance(state, SessionState::Starting);
        backend.run().await?;
        let base_url = backend.base_url().await?;

        let mut client =
            MockServiceClient::new(base_url).with_timeout(self.config.request_timeout());
        if let Some(http) = &self.http {
            client = client.with_http_client(http.clone());
        }

        client.delete().await?;
        advance(state, SessionState::InteractionsCleared);

        let fixtures = self
            .config
            .fixtures
            .iter()
            .cloned()
            .map(Fixture::Path)
            .chain(self.fixtures.iter().cloned());
        for fixture in fixtures {
            debug!("Loading interactions from {}", fixture.name());
            let body = fixture.open().await?;
            client.create(body).await?;
        }
        advance(state, SessionState::InteractionsLoaded);

        Ok(client)
    }
}

fn advance(state: &mut SessionState, next: SessionState) {
    debug_assert!(next > *state, "session state moved back from {state:?} to {next:?}");
    debug!("Session state {:?} -> {:?}", state, next);
    *state = next;
}

/// One backend, loaded with interactions, for the duration of one test
pub struct MockServiceSession<B: Backend = Box<dyn Backend>> {
    backend: B,
    client: MockServiceClient,
    state: SessionState,
}

impl MockServiceSession<Box<dyn Backend>> {
    /// Builder for a session configured by `config`
    pub fn builder(config: MockServiceConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            fixtures: Vec::new(),
            http: None,
        }
    }

    /// Start a session with only the fixtures named in `config`
    pub async fn start(config: MockServiceConfig) -> Result<Self> {
        Self::builder(config).start().await
    }
}

impl<B: Backend> MockServiceSession<B> {
    /// Base URL the test body should send requests to
    pub fn url(&self) -> &str {
        self.client.base_url()
    }

    /// Control-plane client bound to this session
    pub fn client(&self) -> &MockServiceClient {
        &self.client
    }

    /// The backend owned by this session
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Verify interactions without ending the session
    pub async fn verify(&self) -> Result<()> {
        self.client.verify().await
    }

    /// Verify interactions, then stop the backend
    ///
    /// The backend is stopped even if verification fails; both outcomes are
    /// in the returned report.
    pub async fn finish(mut self) -> TeardownReport {
        advance(&mut self.state, SessionState::Verifying);
        let verification = self.client.verify().await;
        if let Err(e) = &verification {
            warn!("Interaction verification failed: {}", e);
        }

        let shutdown = self.backend.stop().await;
        match &shutdown {
            Ok(()) => info!("Mock service session at {} stopped", self.url()),
            Err(e) => warn!("Failed to stop mock service backend: {}", e),
        }
        advance(&mut self.state, SessionState::Stopped);

        TeardownReport {
            verification,
            shutdown,
        }
    }
}

impl<B: Backend> Drop for MockServiceSession<B> {
    fn drop(&mut self) {
        if self.state != SessionState::Stopped {
            warn!(
                "Mock service session at {} dropped without finish(); the backend was not stopped",
                self.client.base_url()
            );
        }
    }
}
