use std::time::Duration;

use crate::error::GatewayResult;

/// Per-phase timeouts against the engine: initialization (readiness wait),
/// query execution, and insert execution
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeouts {
    pub init: Duration,
    pub query: Duration,
    pub insert: Duration,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(30),
            query: Duration::from_secs(60),
            insert: Duration::from_secs(120),
        }
    }
}

/// Connect-phase retry policy; the default is a single attempt
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Engine connection configuration: control-plane port for schema and query
/// operations, data-plane port for high-throughput object operations
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    pub data_port: u16,
    pub timeouts: PhaseTimeouts,
    pub retry: RetryPolicy,
}

impl EngineConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_ports(mut self, port: u16, data_port: u16) -> Self {
        self.port = port;
        self.data_port = data_port;
        self
    }

    pub fn with_timeouts(mut self, timeouts: PhaseTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_env() -> GatewayResult<Self> {
        let host =
            std::env::var("VECTOR_ENGINE_HOST").unwrap_or_else(|_| "localhost".to_string());

        let port = std::env::var("VECTOR_ENGINE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let data_port = std::env::var("VECTOR_ENGINE_DATA_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50051);

        let mut timeouts = PhaseTimeouts::default();
        if let Some(secs) = env_secs("VECTOR_ENGINE_INIT_TIMEOUT_SECS") {
            timeouts.init = secs;
        }
        if let Some(secs) = env_secs("VECTOR_ENGINE_QUERY_TIMEOUT_SECS") {
            timeouts.query = secs;
        }
        if let Some(secs) = env_secs("VECTOR_ENGINE_INSERT_TIMEOUT_SECS") {
            timeouts.insert = secs;
        }

        Ok(Self {
            host,
            port,
            data_port,
            timeouts,
            retry: RetryPolicy::default(),
        })
    }

    /// Base URL for schema, readiness, and query requests
    pub fn control_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Base URL for object insert/fetch/iterate requests
    pub fn data_url(&self) -> String {
        format!("http://{}:{}", self.host, self.data_port)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            data_port: 50051,
            timeouts: PhaseTimeouts::default(),
            retry: RetryPolicy::default(),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
