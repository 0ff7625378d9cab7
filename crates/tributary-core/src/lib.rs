//! tributary-core
//!
//! Composition of latency-bearing work units and parallel aggregation over
//! collections, on one shared worker pool.
//!
//! # モジュール構成
//! - **pool**: 共有ワーカープール（固定サイズ、builder で構築）
//! - **scheduler**: 作業単位の投入（`submit` / `try_submit`）
//! - **handle**: `FutureHandle`（map / combine / and_then / on_complete / get / wait）
//! - **combine**: 結合エンジン（二項結合、左結合の n 項結合木、join_all）
//! - **aggregate**: 並列 map / filter / reduce（入力順序を保持、fail-fast）
//! - **timing**: 呼び出し単位のストップウォッチ
//! - **config / error / ids**: 設定・エラー型・識別子
//!
//! ```ignore
//! let scheduler = TaskScheduler::with_config(&PoolConfig::from_env())?;
//! let hello = scheduler.submit(|| "Hello".to_string());
//! let world = scheduler.submit(|| "World!".to_string());
//! let greeting = hello.combine(&world, |h, w| h + &w).map(|s| s.to_uppercase());
//! assert_eq!(greeting.get()?, "HELLOWORLD!");
//! ```

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod error;
pub mod handle;
pub mod ids;
pub mod pool;
pub mod scheduler;
pub mod timing;

pub use aggregate::{AggregationRequest, AggregationResult, Aggregator, Reduction};
pub use config::PoolConfig;
pub use error::{AggregateError, BuildError, TaskError};
pub use handle::FutureHandle;
pub use pool::{WorkerPool, WorkerPoolBuilder};
pub use scheduler::TaskScheduler;
pub use timing::{Stopwatch, TimingReport};
