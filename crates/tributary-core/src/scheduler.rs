//! Task Scheduler - 作業単位の非同期実行
//!
//! `submit()` は作業単位（引数なしのクロージャ）をワーカープールに投入し、
//! すぐに Pending の `FutureHandle` を返す。結果は一度だけ配送される。

use std::fmt::Display;

use crate::aggregate::Aggregator;
use crate::config::PoolConfig;
use crate::error::BuildError;
use crate::handle::{FutureHandle, Promise, run_work};
use crate::pool::WorkerPool;

/// Submits work units to the shared worker pool.
///
/// The scheduler adds no synchronization between work units beyond
/// delivering each unit's result exactly once.
#[derive(Clone, Debug)]
pub struct TaskScheduler {
    pool: WorkerPool,
}

impl TaskScheduler {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    /// Build a dedicated pool from `config`.
    pub fn with_config(config: &PoolConfig) -> Result<Self, BuildError> {
        Ok(Self::new(WorkerPool::from_config(config)?))
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Aggregation engine sharing this scheduler's pool.
    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.pool.clone())
    }

    /// Submit an infallible work unit. A panic inside it fails the handle.
    pub fn submit<T, F>(&self, work: F) -> FutureHandle<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.try_submit(move || Ok::<T, std::convert::Infallible>(work()))
    }

    /// Submit a work unit that may fail. `Err(e)` becomes `TaskError::Work`.
    pub fn try_submit<T, E, F>(&self, work: F) -> FutureHandle<T>
    where
        T: Clone + Send + 'static,
        E: Display,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let (promise, handle) = Promise::new(&self.pool);
        let id = handle.id();
        tracing::debug!("submit {id}");

        self.pool.spawn(move || {
            let result = run_work(work);
            promise.complete(result);
        });
        handle
    }
}
