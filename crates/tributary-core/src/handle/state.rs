//! Settle-once cell shared by a `FutureHandle` and its `Promise`.
//!
//! State transitions:
//! - Pending { continuations, callbacks } -> Settled(result)   (exactly once)
//!
//! The listener lists and the transition are guarded by the same mutex, so a
//! listener registered concurrently with settlement is either in a list that
//! gets dispatched or sees the stored result. Never both, never neither.
//!
//! Continuations (map / combine / and_then / wait) each get their own pool
//! job. User callbacks share one job and run in registration order, so a
//! slow or blocking callback never holds back a derived handle.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{TaskError, panic_message};
use crate::ids::HandleId;
use crate::pool::WorkerPool;

/// Continuation or callback waiting for the outcome.
pub(crate) type Listener<T> = Box<dyn FnOnce(Result<T, TaskError>) + Send + 'static>;

/// How a listener is dispatched once the cell settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListenerKind {
    /// Internal step feeding a derived handle. Runs in its own job.
    Continuation,
    /// `on_complete` callback. Serialized with the other callbacks.
    Callback,
}

pub(crate) enum State<T> {
    Pending {
        continuations: Vec<Listener<T>>,
        callbacks: Vec<Listener<T>>,
    },
    Settled(Result<T, TaskError>),
}

impl<T> State<T> {
    fn empty() -> Self {
        State::Pending {
            continuations: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, State::Pending { .. })
    }
}

pub(crate) struct Cell<T> {
    state: Mutex<State<T>>,
    settled: Condvar,
}

impl<T: Clone + Send + 'static> Cell<T> {
    pub(crate) fn pending() -> Self {
        Self {
            state: Mutex::new(State::empty()),
            settled: Condvar::new(),
        }
    }

    pub(crate) fn settled(result: Result<T, TaskError>) -> Self {
        Self {
            state: Mutex::new(State::Settled(result)),
            settled: Condvar::new(),
        }
    }

    // Poisoning only happens if a panic escapes while the guard is held; the
    // state is a plain enum that is never left half-written.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `Settled`. Returns `false` if the cell was already settled.
    ///
    /// Each pending continuation is spawned as its own pool job. Pending
    /// callbacks run in registration order, serialized in one further job.
    pub(crate) fn settle(&self, id: HandleId, pool: &WorkerPool, result: Result<T, TaskError>) -> bool {
        let (continuations, callbacks) = {
            let mut state = self.lock();
            let pending = std::mem::replace(&mut *state, State::Settled(result.clone()));
            match pending {
                State::Pending {
                    continuations,
                    callbacks,
                } => (continuations, callbacks),
                already @ State::Settled(_) => {
                    *state = already;
                    tracing::warn!("{id} settled twice; second outcome ignored");
                    return false;
                }
            }
        };
        self.settled.notify_all();

        match &result {
            Ok(_) => tracing::debug!(
                "{id} succeeded ({} continuations, {} callbacks)",
                continuations.len(),
                callbacks.len()
            ),
            Err(e) => tracing::debug!(
                "{id} failed: {e} ({} continuations, {} callbacks)",
                continuations.len(),
                callbacks.len()
            ),
        }

        for continuation in continuations {
            let result = result.clone();
            pool.spawn(move || run_listener(id, continuation, result));
        }
        if !callbacks.is_empty() {
            pool.spawn(move || {
                for callback in callbacks {
                    run_listener(id, callback, result.clone());
                }
            });
        }
        true
    }

    /// Register a listener. If already settled, the stored outcome is replayed
    /// to it on a pool thread.
    pub(crate) fn subscribe(
        &self,
        id: HandleId,
        pool: &WorkerPool,
        kind: ListenerKind,
        listener: Listener<T>,
    ) {
        let replay = {
            let mut state = self.lock();
            match &mut *state {
                State::Pending {
                    continuations,
                    callbacks,
                } => {
                    match kind {
                        ListenerKind::Continuation => continuations.push(listener),
                        ListenerKind::Callback => callbacks.push(listener),
                    }
                    return;
                }
                State::Settled(result) => result.clone(),
            }
        };
        pool.spawn(move || run_listener(id, listener, replay));
    }

    /// Block until settled, then return a copy of the outcome.
    pub(crate) fn wait(&self) -> Result<T, TaskError> {
        let state = self
            .settled
            .wait_while(self.lock(), |s| s.is_pending())
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Settled(result) => result.clone(),
            // wait_while only returns once the predicate is false
            State::Pending { .. } => unreachable!("woke while pending"),
        }
    }

    pub(crate) fn peek(&self) -> Option<Result<T, TaskError>> {
        match &*self.lock() {
            State::Settled(result) => Some(result.clone()),
            State::Pending { .. } => None,
        }
    }
}

/// A panicking listener must not take its siblings down with it.
fn run_listener<T>(id: HandleId, listener: Listener<T>, result: Result<T, TaskError>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(move || listener(result))) {
        tracing::warn!("{id} completion callback {}", panic_message(payload));
    }
}
