use tributary_core::{AggregateError, AggregationRequest, Aggregator};

/// Multiply every value by `factor`, keeping input order.
///
/// With `parallel` the work is spread over the aggregator's pool; otherwise
/// it runs on the calling thread. An overflowing product fails the call with
/// the offending index in either mode.
pub fn multiply_each_value(
    aggregator: &Aggregator,
    values: Vec<u64>,
    factor: u64,
    parallel: bool,
) -> Result<Vec<u64>, AggregateError> {
    if parallel {
        let request = AggregationRequest::new(values, move |v: &u64| multiply(*v, factor));
        Ok(aggregator.aggregate(request)?.into_items().unwrap_or_default())
    } else {
        values
            .into_iter()
            .enumerate()
            .map(|(index, v)| {
                multiply(v, factor).map_err(|message| AggregateError::ItemFailed { index, message })
            })
            .collect()
    }
}

fn multiply(value: u64, factor: u64) -> Result<u64, String> {
    value
        .checked_mul(factor)
        .ok_or_else(|| format!("{value} * {factor} overflows u64"))
}
