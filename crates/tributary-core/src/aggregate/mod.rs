//! Parallel Aggregation Engine
//!
//! コレクションに対して map → filter → (reduce | collect) を並列に適用する。
//!
//! # 保証
//! - 出力順序は入力順序と一致する（並列実行の完了順序に依存しない）
//! - 1 件でも変換に失敗したら呼び出し全体が失敗する（fail-fast）
//! - reduce は要素数だけで形が決まるペアワイズ木で行うため、同じ入力なら
//!   プールサイズやスケジューリングに関係なく同じ結果になる
//!
//! # 前提条件（検査しない）
//! - reducer は結合的（associative）であること
//! - identity は reducer の単位元であること
//!
//! Floating-point sums computed this way can differ from a sequential left
//! fold within rounding tolerance, but are reproducible run to run.

mod engine;
mod reduce;

pub use engine::Aggregator;

use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;

pub(crate) type Transform<I, O> = Arc<dyn Fn(&I) -> Result<O, String> + Send + Sync>;
pub(crate) type Predicate<O> = Arc<dyn Fn(&O) -> bool + Send + Sync>;
pub(crate) type Reducer<O> = Arc<dyn Fn(O, O) -> O + Send + Sync>;

/// What to do with the transformed, filtered values.
pub enum Reduction<O> {
    /// Return them in input order.
    Collect,

    /// Merge them with an associative `reducer` starting from `identity`.
    Fold { identity: O, reducer: Reducer<O> },
}

/// An ordered collection plus the per-item pipeline to run over it.
///
/// ```ignore
/// let request = AggregationRequest::new(items, |item| validate(item))
///     .filter(|v| v.is_invalid())
///     .fold(0.0, |a, b| a + b);
/// ```
pub struct AggregationRequest<I, O> {
    pub(crate) items: Vec<I>,
    pub(crate) transform: Transform<I, O>,
    pub(crate) predicate: Option<Predicate<O>>,
    pub(crate) reduction: Reduction<O>,
}

impl<I: 'static, O: 'static> AggregationRequest<I, O> {
    /// `transform` may fail; its error aborts the whole aggregation.
    pub fn new<E, F>(items: Vec<I>, transform: F) -> Self
    where
        E: Display,
        F: Fn(&I) -> Result<O, E> + Send + Sync + 'static,
    {
        Self {
            items,
            transform: Arc::new(move |item: &I| transform(item).map_err(|e| e.to_string())),
            predicate: None,
            reduction: Reduction::Collect,
        }
    }

    /// Infallible transform.
    pub fn mapping<F>(items: Vec<I>, transform: F) -> Self
    where
        F: Fn(&I) -> O + Send + Sync + 'static,
    {
        Self::new(items, move |item: &I| {
            Ok::<O, std::convert::Infallible>(transform(item))
        })
    }

    /// Keep only values for which `predicate` is true.
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Reduce to a scalar instead of collecting.
    pub fn fold<R>(mut self, identity: O, reducer: R) -> Self
    where
        R: Fn(O, O) -> O + Send + Sync + 'static,
    {
        self.reduction = Reduction::Fold {
            identity,
            reducer: Arc::new(reducer),
        };
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of a successful aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AggregationResult<O> {
    Scalar(O),
    Items(Vec<O>),
}

impl<O> AggregationResult<O> {
    pub fn into_scalar(self) -> Option<O> {
        match self {
            AggregationResult::Scalar(v) => Some(v),
            AggregationResult::Items(_) => None,
        }
    }

    pub fn into_items(self) -> Option<Vec<O>> {
        match self {
            AggregationResult::Items(v) => Some(v),
            AggregationResult::Scalar(_) => None,
        }
    }
}
