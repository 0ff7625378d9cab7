//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Env var overriding the worker count.
pub const ENV_WORKER_THREADS: &str = "TRIBUTARY_WORKER_THREADS";

/// Env var overriding the worker thread name prefix.
pub const ENV_THREAD_PREFIX: &str = "TRIBUTARY_THREAD_PREFIX";

const DEFAULT_THREAD_PREFIX: &str = "tributary-worker";

/// Sizing and naming of the shared worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// `None` means "one worker per available execution unit".
    pub worker_threads: Option<usize>,

    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }
}

impl PoolConfig {
    /// Read overrides from the environment, falling back to defaults.
    ///
    /// An unparsable worker count is ignored (default sizing is used).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(ENV_WORKER_THREADS) {
            match raw.trim().parse::<usize>() {
                Ok(n) => config.worker_threads = Some(n),
                Err(e) => tracing::warn!("ignoring {ENV_WORKER_THREADS}={raw:?}: {e}"),
            }
        }
        if let Ok(prefix) = std::env::var(ENV_THREAD_PREFIX)
            && !prefix.is_empty()
        {
            config.thread_name_prefix = prefix;
        }
        config
    }

    pub fn with_worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = Some(n);
        self
    }

    /// Effective worker count.
    pub fn resolved_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(available_parallelism)
    }
}

/// Number of execution units on the host (at least 1).
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
