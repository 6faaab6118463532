//! Readiness probing with exponential backoff.

use crate::config::ProbeConfig;
use backoff::ExponentialBackoffBuilder;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries a check until it succeeds or the time budget runs out
///
/// Delays start at `initial_interval` and grow by `multiplier` up to
/// `max_interval`. Once `max_elapsed` has passed the error of the last
/// attempt is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessProber {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
    max_elapsed: Duration,
}

impl ReadinessProber {
    /// Prober with the default budget (60s total, 5s between attempts at most)
    pub fn new() -> Self {
        Self::from(&ProbeConfig::default())
    }

    /// Set the delay before the first retry
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Set the upper bound for a single retry delay
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the total time budget
    pub fn with_max_elapsed(mut self, budget: Duration) -> Self {
        self.max_elapsed = budget;
        self
    }

    /// Upper bound for a single retry delay
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Total time budget
    pub fn max_elapsed(&self) -> Duration {
        self.max_elapsed
    }

    /// Run `check` until it returns `Ok`, or return its last error once the
    /// budget is spent
    pub async fn probe<F, Fut, E>(&self, mut check: F) -> Result<(), E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build();

        backoff::future::retry_notify(
            backoff,
            || {
                let attempt = check();
                async move { attempt.await.map_err(backoff::Error::transient) }
            },
            |err: E, next: Duration| {
                debug!("Not ready yet ({}), retrying in {:?}", err, next);
            },
        )
        .await
    }

    /// Probe an HTTP endpoint: any response counts, whatever its status, as
    /// long as the body can be read to the end
    ///
    /// Each attempt is cut off after `max_interval`, overriding any timeout
    /// configured on `client`, so a peer that accepts connections and never
    /// answers still ends the probe once the budget is spent.
    pub async fn probe_http(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<(), reqwest::Error> {
        let per_attempt = self.max_interval;
        self.probe(|| async move {
            let response = client.get(url).timeout(per_attempt).send().await?;
            // Drain so the connection is returned to the pool
            response.bytes().await?;
            Ok(())
        })
        .await
    }
}

impl Default for ReadinessProber {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&ProbeConfig> for ReadinessProber {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            initial_interval: config.initial_interval(),
            multiplier: config.multiplier,
            max_interval: config.max_interval(),
            max_elapsed: config.max_elapsed(),
        }
    }
}
