//! 平均值归约

use std::collections::HashMap;

use apim_ports::{AverageAggregate, SearchResponse};

use super::node;
use crate::query::average::{AverageMetric, ENTRYPOINTS_AGG};

/// 整体平均值为各 entrypoint 平均值的平均，没有任何桶时为空
pub fn average(metric: &AverageMetric, response: &SearchResponse) -> Option<AverageAggregate> {
    let aggregations = response.usable_aggregations()?;
    let average_by: HashMap<String, f64> = aggregations
        .get(ENTRYPOINTS_AGG)
        .map(node::buckets)
        .unwrap_or_default()
        .iter()
        .filter_map(|bucket| {
            let key = node::bucket_key(bucket)?;
            let value = node::metric_value(bucket.get(metric.aggregation_name()))?;
            Some((key, value))
        })
        .collect();

    if average_by.is_empty() {
        return None;
    }
    let average = average_by.values().sum::<f64>() / average_by.len() as f64;
    Some(AverageAggregate {
        average,
        average_by,
    })
}
