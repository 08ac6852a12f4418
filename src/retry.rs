use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How a failed outbound call should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Give up immediately (4xx, malformed input, ...)
    Fatal,
    /// Upstream 5xx
    Server,
    /// Timeout, connection reset, DNS failure
    Network,
}

/// Implemented by every error that crosses an outbound call
pub trait Classify {
    fn retry_class(&self) -> RetryClass;
}

impl Classify for reqwest::Error {
    fn retry_class(&self) -> RetryClass {
        if self.is_timeout() || self.is_connect() {
            return RetryClass::Network;
        }
        match self.status() {
            Some(status) if status.is_server_error() => RetryClass::Server,
            _ => RetryClass::Fatal,
        }
    }
}

/// Bounded retry with linear backoff, shared by all outbound clients.
///
/// `max_attempts` counts every request, the first one included. The delay
/// before attempt `n + 1` is `base * n`, where the base depends on the
/// failure class.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub server_backoff: Duration,
    pub network_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            server_backoff: Duration::from_millis(1000),
            network_backoff: Duration::from_millis(2000),
        }
    }

    pub fn with_backoff(mut self, server: Duration, network: Duration) -> Self {
        self.server_backoff = server;
        self.network_backoff = network;
        self
    }

    /// Delay before the next attempt, or `None` when the failure is final.
    pub fn delay_for(&self, class: RetryClass, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match class {
            RetryClass::Fatal => None,
            RetryClass::Server => Some(self.server_backoff * attempt),
            RetryClass::Network => Some(self.network_backoff * attempt),
        }
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Classify + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let class = err.retry_class();
                    let Some(delay) = self.delay_for(class, attempt) else {
                        tracing::debug!(
                            call = label,
                            attempt,
                            max_attempts = self.max_attempts,
                            class = ?class,
                            error = %err,
                            "giving up"
                        );
                        return Err(err);
                    };

                    tracing::debug!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        class = ?class,
                        error = %err,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
