use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{GatewayError, GatewayResult};

const READY_PATH: &str = "/v1/.well-known/ready";
const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A live session against the search engine, private to one operation
///
/// Sessions never outlive the call that created them; use
/// [`ConnectionManager::scoped`] rather than pairing `acquire`/`release`
/// by hand.
#[derive(Debug)]
pub struct EngineSession {
    http: Client,
    control_url: String,
    data_url: String,
    query_timeout: Duration,
    insert_timeout: Duration,
}

impl EngineSession {
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn insert_timeout(&self) -> Duration {
        self.insert_timeout
    }
}

/// Scoped acquisition and release of engine sessions
///
/// `acquire` blocks until the engine reports ready or the init timeout
/// elapses. Every gateway operation runs acquire → operation → release;
/// no pooling, no reuse across calls.
pub struct ConnectionManager {
    config: EngineConfig,
    active: AtomicU64,
}

impl ConnectionManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            active: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of sessions currently acquired and not yet released
    pub fn active_sessions(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Opens a session and waits for engine readiness, honoring the
    /// connect-phase retry policy
    pub async fn acquire(&self) -> GatewayResult<Arc<EngineSession>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_acquire().await {
                Ok(session) => {
                    self.active.fetch_add(1, Ordering::SeqCst);
                    debug!(url = %session.control_url, "Acquired engine session");
                    return Ok(Arc::new(session));
                }
                Err(err) if attempt < self.config.retry.max_attempts => {
                    debug!(error = %err, attempt, "Connect attempt failed, retrying");
                    tokio::time::sleep(self.config.retry.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Closes a session; the counterpart of every successful `acquire`
    ///
    /// An unmatched release leaves the counter at zero instead of wrapping.
    pub fn release(&self, session: Arc<EngineSession>) {
        drop(session);
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        debug!("Released engine session");
    }

    /// Runs one operation inside an acquire/release pair
    ///
    /// The session is released on every exit path, operation failure
    /// included, before the operation's result is returned.
    pub async fn scoped<T, F, Fut>(&self, op: F) -> GatewayResult<T>
    where
        F: FnOnce(Arc<EngineSession>) -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let session = self.acquire().await?;
        let result = op(Arc::clone(&session)).await;
        self.release(session);
        result
    }

    async fn try_acquire(&self) -> GatewayResult<EngineSession> {
        let http = Client::builder()
            .timeout(self.config.timeouts.query.max(self.config.timeouts.insert))
            .build()
            .map_err(|e| GatewayError::Connection(format!("Failed to build client: {}", e)))?;

        let session = EngineSession {
            http,
            control_url: self.config.control_url(),
            data_url: self.config.data_url(),
            query_timeout: self.config.timeouts.query,
            insert_timeout: self.config.timeouts.insert,
        };

        self.wait_ready(&session).await?;
        Ok(session)
    }

    async fn wait_ready(&self, session: &EngineSession) -> GatewayResult<()> {
        let deadline = Instant::now() + self.config.timeouts.init;
        let url = format!("{}{}", session.control_url, READY_PATH);

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(GatewayError::Connection(format!(
                    "Engine at {} not ready within {:?}",
                    session.control_url, self.config.timeouts.init
                )));
            }

            // A single probe never waits past the init deadline
            let probe = session
                .http
                .get(&url)
                .timeout(READY_PROBE_TIMEOUT.min(remaining))
                .send()
                .await;

            if let Ok(response) = probe {
                if response.status().is_success() {
                    return Ok(());
                }
            }

            let pause = READY_POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(pause).await;
        }
    }
}
