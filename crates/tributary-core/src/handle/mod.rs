//! FutureHandle - 非同期結果へのハンドル
//!
//! # 状態遷移
//! - Pending -> Succeeded(value) | Failed(error)（一度だけ）
//!
//! # 主要な操作
//! - `map` / `try_map`: 値の変換（失敗はそのまま伝播し、変換関数は呼ばない）
//! - `combine`: 2 つのハンドルの結合（`crate::combine` に委譲）
//! - `and_then`: 依存する非同期ステップの連結
//! - `on_complete`: 完了コールバック（ワーカースレッドで一度だけ呼ばれる）
//! - `get`: ブロッキング取得 / `wait`: async 取得

mod state;

use std::convert::Infallible;
use std::fmt::Display;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::{TaskError, panic_message};
use crate::ids::HandleId;
use crate::pool::WorkerPool;

use self::state::{Cell, Listener, ListenerKind};

/// Handle to the eventual outcome of one work unit or continuation.
///
/// Clones share the same outcome. `T: Clone` because every consumer
/// (`get` callers, continuations, callbacks) receives its own copy.
pub struct FutureHandle<T: Clone + Send + 'static> {
    id: HandleId,
    cell: Arc<Cell<T>>,
    pool: WorkerPool,
}

impl<T: Clone + Send + 'static> Clone for FutureHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cell: Arc::clone(&self.cell),
            pool: self.pool.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for FutureHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureHandle")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}

impl<T: Clone + Send + 'static> FutureHandle<T> {
    /// A handle that is already `Succeeded`.
    pub fn completed(pool: &WorkerPool, value: T) -> Self {
        Self::settled(pool, Ok(value))
    }

    /// A handle that is already `Failed`.
    pub fn failed(pool: &WorkerPool, error: TaskError) -> Self {
        Self::settled(pool, Err(error))
    }

    fn settled(pool: &WorkerPool, result: Result<T, TaskError>) -> Self {
        Self {
            id: HandleId::generate(),
            cell: Arc::new(Cell::settled(result)),
            pool: pool.clone(),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn is_done(&self) -> bool {
        self.cell.peek().is_some()
    }

    /// Non-blocking peek at the outcome.
    pub fn try_get(&self) -> Option<Result<T, TaskError>> {
        self.cell.peek()
    }

    /// Block the calling thread until the outcome is known.
    ///
    /// Safe to call from several threads at once. Avoid calling it from
    /// inside a pool job: a saturated pool can then wait on itself. Use
    /// `and_then` / `combine` for dependent steps instead.
    pub fn get(&self) -> Result<T, TaskError> {
        self.cell.wait()
    }

    /// Async counterpart of `get` for callers running on a tokio runtime.
    pub async fn wait(&self) -> Result<T, TaskError> {
        if let Some(result) = self.try_get() {
            return result;
        }
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.subscribe(Box::new(move |result| {
            // receiver gone means the caller stopped waiting
            let _ = tx.send(result);
        }));
        rx.await
            .unwrap_or_else(|_| Err(TaskError::work("completion channel closed")))
    }

    /// Register a callback that runs exactly once, on a pool thread, when the
    /// handle settles. Returns immediately.
    ///
    /// Callbacks on one handle run in registration order. They may block,
    /// even on handles derived from this one; continuations do not wait
    /// behind them.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(Result<T, TaskError>) + Send + 'static,
    {
        self.cell
            .subscribe(self.id, &self.pool, ListenerKind::Callback, Box::new(callback));
    }

    /// Apply `f` to the value once available. A failed source skips `f`.
    pub fn map<U, F>(&self, f: F) -> FutureHandle<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.try_map(move |value| Ok::<U, Infallible>(f(value)))
    }

    /// Like `map`, but `f` may fail. Its error becomes `TaskError::Transform`.
    pub fn try_map<U, E, F>(&self, f: F) -> FutureHandle<U>
    where
        U: Clone + Send + 'static,
        E: Display,
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
    {
        let (promise, derived) = Promise::new(&self.pool);
        self.subscribe(Box::new(move |result| match result {
            Ok(value) => promise.complete(run_transform(move || f(value))),
            Err(e) => promise.complete(Err(e)),
        }));
        derived
    }

    /// Wait for both handles and merge their values with `f`.
    ///
    /// If either side fails, `f` is not called. When both fail the left
    /// (receiver) error is reported.
    pub fn combine<U, V, F>(&self, other: &FutureHandle<U>, f: F) -> FutureHandle<V>
    where
        U: Clone + Send + 'static,
        V: Clone + Send + 'static,
        F: FnOnce(T, U) -> V + Send + 'static,
    {
        crate::combine::join2(self, other, move |a, b| Ok::<V, Infallible>(f(a, b)))
    }

    /// Like `combine`, but `f` may fail.
    pub fn try_combine<U, V, E, F>(&self, other: &FutureHandle<U>, f: F) -> FutureHandle<V>
    where
        U: Clone + Send + 'static,
        V: Clone + Send + 'static,
        E: Display,
        F: FnOnce(T, U) -> Result<V, E> + Send + 'static,
    {
        crate::combine::join2(self, other, f)
    }

    /// Chain a dependent asynchronous step: `f` returns another handle whose
    /// outcome becomes this one's.
    pub fn and_then<U, F>(&self, f: F) -> FutureHandle<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> FutureHandle<U> + Send + 'static,
    {
        let (promise, derived) = Promise::new(&self.pool);
        self.subscribe(Box::new(move |result| match result {
            Ok(value) => match catch_unwind(AssertUnwindSafe(move || f(value))) {
                Ok(next) => next.subscribe(Box::new(move |r| promise.complete(r))),
                Err(payload) => {
                    promise.complete(Err(TaskError::Transform(panic_message(payload))))
                }
            },
            Err(e) => promise.complete(Err(e)),
        }));
        derived
    }

    /// Internal continuation; dispatched in its own pool job.
    pub(crate) fn subscribe(&self, listener: Listener<T>) {
        self.cell
            .subscribe(self.id, &self.pool, ListenerKind::Continuation, listener);
    }
}

/// Write side of a pending handle.
///
/// Dropping a promise without completing it fails the handle, so a lost
/// work unit still surfaces as an error instead of a hang.
pub(crate) struct Promise<T: Clone + Send + 'static> {
    id: HandleId,
    cell: Option<Arc<Cell<T>>>,
    pool: WorkerPool,
}

impl<T: Clone + Send + 'static> Promise<T> {
    pub(crate) fn new(pool: &WorkerPool) -> (Promise<T>, FutureHandle<T>) {
        let id = HandleId::generate();
        let cell = Arc::new(Cell::pending());
        let handle = FutureHandle {
            id,
            cell: Arc::clone(&cell),
            pool: pool.clone(),
        };
        let promise = Promise {
            id,
            cell: Some(cell),
            pool: pool.clone(),
        };
        (promise, handle)
    }

    pub(crate) fn complete(mut self, result: Result<T, TaskError>) {
        if let Some(cell) = self.cell.take() {
            cell.settle(self.id, &self.pool, result);
        }
    }
}

impl<T: Clone + Send + 'static> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            cell.settle(
                self.id,
                &self.pool,
                Err(TaskError::work("dropped before producing a result")),
            );
        }
    }
}

/// Run a work unit body, capturing `Err` and panics as `TaskError::Work`.
pub(crate) fn run_work<T, E, F>(work: F) -> Result<T, TaskError>
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TaskError::Work(e.to_string())),
        Err(payload) => Err(TaskError::Work(panic_message(payload))),
    }
}

/// Run a continuation function, capturing `Err` and panics as
/// `TaskError::Transform`.
pub(crate) fn run_transform<T, E, F>(f: F) -> Result<T, TaskError>
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TaskError::Transform(e.to_string())),
        Err(payload) => Err(TaskError::Transform(panic_message(payload))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn pool() -> WorkerPool {
        WorkerPool::builder().worker_threads(4).build().unwrap()
    }

    #[test]
    fn completed_handle_returns_value() {
        let pool = pool();
        let h = FutureHandle::completed(&pool, 41);
        assert!(h.is_done());
        assert_eq!(h.get(), Ok(41));
        assert_eq!(h.try_get(), Some(Ok(41)));
    }

    #[test]
    fn map_chain_composes_left_to_right() {
        let pool = pool();
        let h = FutureHandle::completed(&pool, 3);
        let out = h.map(|x| x + 1).map(|x| x * 10).map(|x| format!("v={x}"));
        assert_eq!(out.get(), Ok("v=40".to_string()));
    }

    #[test]
    fn map_on_failed_source_skips_transform() {
        let pool = pool();
        let calls = Arc::new(AtomicUsize::new(0));
        let h = FutureHandle::<i32>::failed(&pool, TaskError::work("upstream"));

        let counter = Arc::clone(&calls);
        let out = h.map(move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            x * 2
        });

        assert_eq!(out.get(), Err(TaskError::work("upstream")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transform_errors_and_panics_are_captured() {
        let pool = pool();
        let h = FutureHandle::completed(&pool, 1);

        let err = h.try_map(|_| Err::<i32, _>("bad input")).get();
        assert_eq!(err, Err(TaskError::transform("bad input")));

        let panicked = h.map(|_| -> i32 { panic!("kaboom") }).get();
        assert_eq!(panicked, Err(TaskError::transform("panicked: kaboom")));

        // downstream of a failed transform stays failed
        let chained = h
            .try_map(|_| Err::<i32, _>("first"))
            .map(|x| x + 1)
            .get();
        assert_eq!(chained, Err(TaskError::transform("first")));
    }

    #[test]
    fn on_complete_fires_once_after_completion() {
        let pool = pool();
        let h = FutureHandle::completed(&pool, "done".to_string());
        let (tx, rx) = mpsc::channel();

        h.on_complete(move |r| tx.send(r).unwrap());

        assert_eq!(rx.recv().unwrap(), Ok("done".to_string()));
        // sender moved into the callback is dropped after its single call
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn on_complete_runs_on_pool_thread() {
        let pool = WorkerPool::builder()
            .worker_threads(1)
            .thread_name_prefix("cb")
            .build()
            .unwrap();
        let h = FutureHandle::completed(&pool, 1);
        let (tx, rx) = mpsc::channel();

        h.on_complete(move |_| {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        });

        assert_eq!(rx.recv().unwrap().as_deref(), Some("cb-0"));
    }

    #[test]
    fn slow_callback_does_not_delay_map() {
        let pool = pool();
        let (promise, h) = Promise::<i32>::new(&pool);
        h.on_complete(|_| std::thread::sleep(Duration::from_millis(800)));
        let mapped = h.map(|x| x + 1);

        let started = Instant::now();
        promise.complete(Ok(1));
        assert_eq!(mapped.get(), Ok(2));
        assert!(started.elapsed() < Duration::from_millis(600));
    }

    #[test]
    fn callback_may_block_on_handle_derived_after_it() {
        let pool = pool();
        let (promise, h) = Promise::<i32>::new(&pool);
        let derived: Arc<OnceLock<FutureHandle<i32>>> = Arc::new(OnceLock::new());
        let (tx, rx) = mpsc::channel();

        let slot = Arc::clone(&derived);
        h.on_complete(move |_| {
            let seen = slot.get().map(FutureHandle::get);
            tx.send(seen).unwrap();
        });
        let _ = derived.set(h.map(|x| x * 10));
        promise.complete(Ok(2));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(Some(Ok(20))));
    }

    #[test]
    fn dropped_promise_fails_handle() {
        let pool = pool();
        let (promise, handle) = Promise::<i32>::new(&pool);
        drop(promise);
        assert!(matches!(handle.get(), Err(TaskError::Work(_))));
    }

    #[test]
    fn get_from_many_threads() {
        let pool = pool();
        let (promise, handle) = Promise::<u64>::new(&pool);

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let h = handle.clone();
                std::thread::spawn(move || h.get())
            })
            .collect();
        std::thread::sleep(Duration::from_millis(20));
        promise.complete(Ok(77));

        for w in waiters {
            assert_eq!(w.join().unwrap(), Ok(77));
        }
    }

    #[test]
    fn and_then_chains_dependent_handle() {
        let pool = pool();
        let inner_pool = pool.clone();
        let h = FutureHandle::completed(&pool, 5);

        let out = h.and_then(move |x| FutureHandle::completed(&inner_pool, x * 3));
        assert_eq!(out.get(), Ok(15));

        let failing_pool = pool.clone();
        let out = h.and_then(move |_| {
            FutureHandle::<i32>::failed(&failing_pool, TaskError::work("inner"))
        });
        assert_eq!(out.get(), Err(TaskError::work("inner")));
    }

    #[tokio::test]
    async fn wait_resolves_in_async_context() {
        let pool = pool();
        let (promise, handle) = Promise::<String>::new(&pool);

        let waiter = tokio::spawn({
            let h = handle.clone();
            async move { h.wait().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        promise.complete(Ok("async".to_string()));

        assert_eq!(waiter.await.unwrap(), Ok("async".to_string()));
        assert_eq!(handle.wait().await, Ok("async".to_string()));
    }
}
