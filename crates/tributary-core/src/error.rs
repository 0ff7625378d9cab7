//! Error types for the composition and aggregation engines.
//!
//! 失敗はすべて値として捕捉され、最寄りの `get()` / `wait()` / `aggregate()` で
//! 観測される。自動リトライは行わない。

use std::any::Any;

use thiserror::Error;

/// Failure carried by a settled `FutureHandle`.
///
/// `Clone + PartialEq` so that every observer of a handle (several `get()`
/// callers, continuations, callbacks) sees an equal error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// Raised by a work unit body (returned `Err` or panicked).
    #[error("work unit failed: {0}")]
    Work(String),

    /// Raised by a `map` / `combine` / `and_then` function.
    #[error("transform failed: {0}")]
    Transform(String),
}

impl TaskError {
    pub fn work(message: impl Into<String>) -> Self {
        TaskError::Work(message.into())
    }

    pub fn transform(message: impl Into<String>) -> Self {
        TaskError::Transform(message.into())
    }

    /// The message without the origin prefix.
    pub fn message(&self) -> &str {
        match self {
            TaskError::Work(m) | TaskError::Transform(m) => m,
        }
    }
}

/// Failure of a whole aggregation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// The transform for the item at `index` failed; the whole call is aborted.
    #[error("item {index} failed: {message}")]
    ItemFailed { index: usize, message: String },

    /// The reducer itself failed while merging partial results.
    #[error("reduction failed: {0}")]
    ReduceFailed(String),
}

impl AggregateError {
    /// Input position of the offending item, if an item caused the failure.
    pub fn index(&self) -> Option<usize> {
        match self {
            AggregateError::ItemFailed { index, .. } => Some(*index),
            AggregateError::ReduceFailed(_) => None,
        }
    }
}

/// Worker pool construction errors (fail-fast at startup).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("worker pool needs at least one thread")]
    ZeroWorkers,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Render a panic payload caught by `catch_unwind`.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_error_display_names_origin() {
        assert_eq!(TaskError::work("boom").to_string(), "work unit failed: boom");
        assert_eq!(
            TaskError::transform("bad").to_string(),
            "transform failed: bad"
        );
        assert_eq!(TaskError::work("boom").message(), "boom");
    }

    #[test]
    fn aggregate_error_carries_index() {
        let err = AggregateError::ItemFailed {
            index: 3,
            message: "nope".to_string(),
        };
        assert_eq!(err.index(), Some(3));
        assert_eq!(AggregateError::ReduceFailed("x".into()).index(), None);
        assert!(err.to_string().contains("item 3"));
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload), "panicked: static");

        let n = 7;
        let payload = std::panic::catch_unwind(move || panic!("formatted {n}")).unwrap_err();
        assert_eq!(panic_message(payload), "panicked: formatted 7");
    }
}
