//! WorkerPool - 共有ワーカープール
//!
//! Task Scheduler と Aggregation Engine が同じ固定サイズのプールを使う。
//! グローバルな executor は持たず、プールは値として明示的に渡す。
//!
//! # Fail-fast 設計
//! - `WorkerPoolBuilder::build()` がスレッド数 0 を拒否する
//! - プール内の panic はログに残し、プロセスを落とさない

use std::sync::Arc;

use crate::config::PoolConfig;
use crate::error::BuildError;

/// Handle to the shared fixed-size worker pool. Cheap to clone.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<rayon::ThreadPool>,
}

impl WorkerPool {
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::new()
    }

    /// Build a pool from a config.
    pub fn from_config(config: &PoolConfig) -> Result<Self, BuildError> {
        Self::builder()
            .worker_threads(config.resolved_worker_threads())
            .thread_name_prefix(config.thread_name_prefix.clone())
            .build()
    }

    /// Pool sized to the host's available parallelism.
    pub fn with_default_size() -> Result<Self, BuildError> {
        Self::from_config(&PoolConfig::default())
    }

    pub fn worker_threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    /// Run `job` on a pool thread. Fire-and-forget.
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.spawn(job);
    }

    /// Run `op` inside the pool, blocking the caller until it returns.
    /// Rayon parallel iterators used inside `op` execute on this pool.
    pub(crate) fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.inner.install(op)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_threads", &self.worker_threads())
            .finish()
    }
}

/// Builder for `WorkerPool`.
///
/// ```ignore
/// let pool = WorkerPool::builder()
///     .worker_threads(4)
///     .thread_name_prefix("checkout")
///     .build()?;
/// ```
pub struct WorkerPoolBuilder {
    worker_threads: Option<usize>,
    thread_name_prefix: String,
}

impl WorkerPoolBuilder {
    pub fn new() -> Self {
        let defaults = PoolConfig::default();
        Self {
            worker_threads: defaults.worker_threads,
            thread_name_prefix: defaults.thread_name_prefix,
        }
    }

    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = Some(n);
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate and spawn the worker threads.
    pub fn build(self) -> Result<WorkerPool, BuildError> {
        let n = self
            .worker_threads
            .unwrap_or_else(crate::config::available_parallelism);
        if n == 0 {
            return Err(BuildError::ZeroWorkers);
        }

        let prefix = self.thread_name_prefix;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .panic_handler(|payload| {
                tracing::error!(
                    "worker job panicked: {}",
                    crate::error::panic_message(payload)
                );
            })
            .build()
            .map_err(|e| BuildError::ThreadPool(e.to_string()))?;

        tracing::debug!("worker pool started with {n} threads");
        Ok(WorkerPool {
            inner: Arc::new(pool),
        })
    }
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn build_with_explicit_size() {
        let pool = WorkerPool::builder().worker_threads(3).build().unwrap();
        assert_eq!(pool.worker_threads(), 3);
    }

    #[test]
    fn build_rejects_zero_workers() {
        let result = WorkerPool::builder().worker_threads(0).build();
        assert!(matches!(result, Err(BuildError::ZeroWorkers)));
    }

    #[test]
    fn from_config_uses_resolved_size() {
        let config = PoolConfig::default().with_worker_threads(2);
        let pool = WorkerPool::from_config(&config).unwrap();
        assert_eq!(pool.worker_threads(), 2);
    }

    #[test]
    fn spawned_jobs_run_on_named_threads() {
        let pool = WorkerPool::builder()
            .worker_threads(1)
            .thread_name_prefix("named")
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel();
        pool.spawn(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        });
        assert_eq!(rx.recv().unwrap().as_deref(), Some("named-0"));
    }

    #[test]
    fn panicking_job_does_not_kill_pool() {
        let pool = WorkerPool::builder().worker_threads(1).build().unwrap();
        pool.spawn(|| panic!("job blew up"));

        let (tx, rx) = mpsc::channel();
        pool.spawn(move || tx.send(42).unwrap());
        assert_eq!(rx.recv().unwrap(), 42);
    }
}
