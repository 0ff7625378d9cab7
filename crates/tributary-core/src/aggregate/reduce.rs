//! Pairwise tree reduction.
//!
//! The split points depend only on the number of values, so the grouping of
//! `reducer` applications (and therefore any floating-point rounding) is the
//! same on every run regardless of worker count.

/// Below this many values a leaf folds sequentially.
const LEAF_SIZE: usize = 32;

/// Reduce `values` in input order. Halves are reduced in parallel with
/// `rayon::join` on whatever pool the caller is installed in.
pub(crate) fn pairwise<O, R>(mut values: Vec<O>, identity: O, reducer: &R) -> O
where
    O: Clone + Send,
    R: Fn(O, O) -> O + Sync + ?Sized,
{
    if values.len() <= LEAF_SIZE {
        return values.into_iter().fold(identity, reducer);
    }

    let right = values.split_off(values.len() / 2);
    let right_identity = identity.clone();
    let (l, r) = rayon::join(
        || pairwise(values, identity, reducer),
        || pairwise(right, right_identity, reducer),
    );
    reducer(l, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_identity() {
        assert_eq!(pairwise(Vec::<i64>::new(), 0, &|a, b| a + b), 0);
    }

    #[test]
    fn matches_sequential_for_integers() {
        let values: Vec<i64> = (1..=1000).collect();
        assert_eq!(pairwise(values, 0, &|a, b| a + b), 500_500);
    }

    #[test]
    fn keeps_order_for_non_commutative_reducer() {
        // string concatenation is associative but not commutative
        let values: Vec<String> = (0..100).map(|i| format!("{i},")).collect();
        let expected: String = values.concat();
        let joined = pairwise(values, String::new(), &|a: String, b: String| a + &b);
        assert_eq!(joined, expected);
    }

    #[test]
    fn float_sum_is_reproducible() {
        let values: Vec<f64> = (0..10_000).map(|i| 1.0 / (i as f64 + 1.0)).collect();
        let first = pairwise(values.clone(), 0.0, &|a, b| a + b);
        for _ in 0..5 {
            let again = pairwise(values.clone(), 0.0, &|a, b| a + b);
            assert_eq!(first.to_bits(), again.to_bits());
        }
        let sequential: f64 = values.iter().sum();
        assert!((first - sequential).abs() < 1e-9);
    }
}
