use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use rayon::prelude::*;

use super::reduce::pairwise;
use super::{AggregationRequest, AggregationResult, Reduction};
use crate::error::{AggregateError, panic_message};
use crate::ids::AggregationId;
use crate::pool::WorkerPool;

/// Runs map/filter/reduce pipelines on the shared worker pool.
///
/// Work is split with rayon's indexed parallel iterators inside the pool;
/// results are stitched back in input order.
#[derive(Clone, Debug)]
pub struct Aggregator {
    pool: WorkerPool,
}

impl Aggregator {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Run `request` to completion, blocking the caller.
    ///
    /// The first observed item failure aborts the call; items still in
    /// flight finish but their results are discarded.
    pub fn aggregate<I, O>(
        &self,
        request: AggregationRequest<I, O>,
    ) -> Result<AggregationResult<O>, AggregateError>
    where
        I: Sync,
        O: Clone + Send,
    {
        let id = AggregationId::generate();
        let started = Instant::now();
        let AggregationRequest {
            items,
            transform,
            predicate,
            reduction,
        } = request;
        tracing::debug!(
            "{id} aggregating {} items on {} workers",
            items.len(),
            self.pool.worker_threads()
        );

        let kept = self.pool.install(|| {
            transform_in_order(&items, |item: &I| transform(item), predicate.as_deref())
        });
        let kept = match kept {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("{id} aborted: {e}");
                return Err(e);
            }
        };

        let result = match reduction {
            Reduction::Collect => AggregationResult::Items(kept),
            Reduction::Fold { identity, reducer } => {
                let reduced = self.pool.install(|| {
                    catch_unwind(AssertUnwindSafe(|| pairwise(kept, identity, &*reducer)))
                });
                match reduced {
                    Ok(value) => AggregationResult::Scalar(value),
                    Err(payload) => {
                        let e = AggregateError::ReduceFailed(panic_message(payload));
                        tracing::warn!("{id} aborted: {e}");
                        return Err(e);
                    }
                }
            }
        };

        tracing::debug!("{id} finished in {:?}", started.elapsed());
        Ok(result)
    }

    /// Transform every item and keep input order.
    pub fn map_collect<I, O, F>(&self, items: Vec<I>, f: F) -> Result<Vec<O>, AggregateError>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync,
    {
        self.pool.install(|| {
            transform_in_order(&items, |item: &I| Ok::<O, String>(f(item)), None)
        })
    }

    /// Transform every item and fold the results with an associative
    /// `reducer` whose identity is `identity`.
    pub fn map_reduce<I, O, F, R>(
        &self,
        items: Vec<I>,
        f: F,
        identity: O,
        reducer: R,
    ) -> Result<O, AggregateError>
    where
        I: Sync,
        O: Clone + Send,
        F: Fn(&I) -> O + Sync,
        R: Fn(O, O) -> O + Sync,
    {
        let values = self.map_collect(items, f)?;
        self.pool
            .install(|| catch_unwind(AssertUnwindSafe(|| pairwise(values, identity, &reducer))))
            .map_err(|payload| AggregateError::ReduceFailed(panic_message(payload)))
    }
}

/// Apply `transform` (and `predicate`) to every item in parallel.
///
/// Must run inside `WorkerPool::install` so rayon uses the shared pool.
fn transform_in_order<I, O, T>(
    items: &[I],
    transform: T,
    predicate: Option<&(dyn Fn(&O) -> bool + Send + Sync)>,
) -> Result<Vec<O>, AggregateError>
where
    I: Sync,
    O: Send,
    T: Fn(&I) -> Result<O, String> + Sync,
{
    let per_item = items
        .par_iter()
        .enumerate()
        .map(|(index, item)| {
            let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<Option<O>, String> {
                let value = transform(item)?;
                Ok(match predicate {
                    Some(keep) if !keep(&value) => None,
                    _ => Some(value),
                })
            }));
            match outcome {
                Ok(Ok(kept)) => Ok(kept),
                Ok(Err(message)) => Err(AggregateError::ItemFailed { index, message }),
                Err(payload) => Err(AggregateError::ItemFailed {
                    index,
                    message: panic_message(payload),
                }),
            }
        })
        .collect::<Result<Vec<Option<O>>, AggregateError>>()?;

    Ok(per_item.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread::sleep;
    use std::time::Duration;

    fn aggregator(workers: usize) -> Aggregator {
        Aggregator::new(WorkerPool::builder().worker_threads(workers).build().unwrap())
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[case(16)]
    fn identity_transform_preserves_order(#[case] workers: usize) {
        let items: Vec<u32> = (0..500).collect();
        let out = aggregator(workers)
            .aggregate(AggregationRequest::mapping(items.clone(), |x: &u32| *x))
            .unwrap();
        assert_eq!(out, AggregationResult::Items(items));
    }

    #[test]
    fn order_holds_when_early_items_finish_last() {
        let items: Vec<u64> = (0..12).collect();
        let out = aggregator(4)
            .map_collect(items, |x| {
                sleep(Duration::from_millis((12 - x) * 3));
                x * 10
            })
            .unwrap();
        assert_eq!(out, (0..12).map(|x| x * 10).collect::<Vec<_>>());
    }

    #[test]
    fn filter_keeps_matching_in_order() {
        let items: Vec<i32> = (1..=20).collect();
        let request = AggregationRequest::mapping(items, |x: &i32| x * x).filter(|sq| sq % 2 == 0);
        let out = aggregator(3).aggregate(request).unwrap().into_items().unwrap();
        assert_eq!(out, vec![4, 16, 36, 64, 100, 144, 196, 256, 324, 400]);
    }

    #[test]
    fn fold_reduces_filtered_values() {
        let items: Vec<i64> = (1..=100).collect();
        let request = AggregationRequest::mapping(items, |x: &i64| *x)
            .filter(|x| x % 10 == 0)
            .fold(0, |a, b| a + b);
        let out = aggregator(4).aggregate(request).unwrap();
        assert_eq!(out, AggregationResult::Scalar(550));
    }

    #[test]
    fn fold_of_empty_input_is_identity() {
        let request = AggregationRequest::mapping(Vec::<f64>::new(), |x: &f64| *x).fold(0.0, |a, b| a + b);
        let out = aggregator(2).aggregate(request).unwrap().into_scalar();
        assert_eq!(out, Some(0.0));
    }

    #[test]
    fn failing_item_fails_whole_call() {
        let items: Vec<i32> = (0..50).collect();
        let request = AggregationRequest::new(items, |x: &i32| {
            if *x == 37 { Err(format!("bad item {x}")) } else { Ok(*x) }
        })
        .fold(0, |a, b| a + b);

        let err = aggregator(4).aggregate(request).unwrap_err();
        assert_eq!(
            err,
            AggregateError::ItemFailed {
                index: 37,
                message: "bad item 37".to_string()
            }
        );
    }

    #[test]
    fn panicking_item_reports_index() {
        let items = vec!["a", "b", "boom", "d"];
        let err = aggregator(2)
            .map_collect(items, |s| {
                if *s == "boom" {
                    panic!("cannot handle {s}");
                }
                s.len()
            })
            .unwrap_err();
        assert_eq!(err.index(), Some(2));
        assert!(err.to_string().contains("cannot handle boom"));
    }

    #[test]
    fn fail_fast_does_not_process_everything() {
        let processed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&processed);
        let items: Vec<usize> = (0..10_000).collect();

        let request = AggregationRequest::new(items, move |x: &usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            if *x == 0 {
                Err("first item is bad")
            } else {
                sleep(Duration::from_micros(200));
                Ok(*x)
            }
        });
        assert!(aggregator(2).aggregate(request).is_err());
        assert!(processed.load(Ordering::SeqCst) < 10_000);
    }

    #[test]
    fn panicking_reducer_is_reported() {
        let items: Vec<i32> = (0..100).collect();
        let err = aggregator(2)
            .map_reduce(items, |x| *x, 0, |a, b| {
                if b == 50 {
                    panic!("reducer broke");
                }
                a + b
            })
            .unwrap_err();
        assert!(matches!(err, AggregateError::ReduceFailed(_)));
    }

    #[test]
    fn parallel_float_sum_matches_sequential_within_tolerance() {
        let items: Vec<(u32, f64)> = (1..=1000).map(|i| (i, 0.01 * i as f64 + 0.333)).collect();
        let sequential: f64 = items.iter().map(|(q, r)| *q as f64 * r).sum();

        let parallel = aggregator(8)
            .map_reduce(items.clone(), |(q, r)| *q as f64 * r, 0.0, |a, b| a + b)
            .unwrap();
        assert!((parallel - sequential).abs() < 1e-6 * sequential.abs());

        let single = aggregator(1)
            .map_reduce(items, |(q, r)| *q as f64 * r, 0.0, |a, b| a + b)
            .unwrap();
        assert_eq!(parallel.to_bits(), single.to_bits());
    }
}
