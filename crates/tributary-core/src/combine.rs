//! Combination Engine - ハンドルの結合
//!
//! 2 つのハンドルの結合（`join2`）を基本単位とし、n 個の結合は
//! 左結合の二分木として明示的に組み立てる:
//!
//! ```text
//! fold_left(a, [b, c, d], f)  ==  ((a ⋈ b) ⋈ c) ⋈ d
//! ```
//!
//! # 失敗の扱い
//! - どちらかが失敗したら結合関数は呼ばない
//! - 両方失敗した場合は左側（receiver）のエラーを返す
//! - 右側が先に失敗しても、左側の結果が確定するまで待つ（決定的にするため）

use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;

use crate::handle::{FutureHandle, Promise, run_transform};
use crate::pool::WorkerPool;

/// Binary join node: settles with `f(a, b)` once both sides succeed.
pub fn join2<A, B, V, E, F>(left: &FutureHandle<A>, right: &FutureHandle<B>, f: F) -> FutureHandle<V>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    V: Clone + Send + 'static,
    E: Display,
    F: FnOnce(A, B) -> Result<V, E> + Send + 'static,
{
    let (promise, joined) = Promise::new(left.pool());
    let right = right.clone();
    tracing::debug!("{} joins {} and {}", joined.id(), left.id(), right.id());

    left.subscribe(Box::new(move |left_result| match left_result {
        Err(e) => promise.complete(Err(e)),
        Ok(a) => right.subscribe(Box::new(move |right_result| match right_result {
            Err(e) => promise.complete(Err(e)),
            Ok(b) => promise.complete(run_transform(move || f(a, b))),
        })),
    }));
    joined
}

/// Left-associative join tree over `rest`, starting from `seed`.
///
/// Each node applies `f(accumulated, next)`. Combiner side effects therefore
/// run in list order, each one as soon as its two inputs are available.
/// With an empty `rest` the seed handle is returned unchanged.
pub fn fold_left<A, T, F, I>(seed: FutureHandle<A>, rest: I, f: F) -> FutureHandle<A>
where
    A: Clone + Send + 'static,
    T: Clone + Send + 'static,
    F: Fn(A, T) -> A + Send + Sync + 'static,
    I: IntoIterator<Item = FutureHandle<T>>,
{
    let f = Arc::new(f);
    rest.into_iter().fold(seed, |acc, next| {
        let f = Arc::clone(&f);
        join2(&acc, &next, move |a, t| Ok::<A, Infallible>(f(a, t)))
    })
}

/// Collect all values in input order. The leftmost failure wins.
pub fn join_all<T, I>(pool: &WorkerPool, handles: I) -> FutureHandle<Vec<T>>
where
    T: Clone + Send + 'static,
    I: IntoIterator<Item = FutureHandle<T>>,
{
    let handles: Vec<_> = handles.into_iter().collect();
    let seed = FutureHandle::completed(pool, Vec::with_capacity(handles.len()));
    fold_left(seed, handles, |mut values: Vec<T>, value| {
        values.push(value);
        values
    })
}
