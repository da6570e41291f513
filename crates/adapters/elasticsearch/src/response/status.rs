//! 状态码归约

use std::collections::HashMap;

use apim_ports::{ResponseStatusOverTimeAggregate, ResponseStatusRangesAggregate, SearchResponse};
use serde_json::Value;

use super::{node, zero_filled};
use crate::query::BY_DATE;
use crate::query::status::{ALL_APIS_STATUS_RANGES, BY_STATUS, ENTRYPOINT_AGG, STATUS_RANGES};

fn range_counts(range: Option<&Value>) -> HashMap<String, u64> {
    range
        .map(node::buckets)
        .unwrap_or_default()
        .iter()
        .filter_map(|bucket| Some((node::bucket_key(bucket)?, node::doc_count(bucket))))
        .collect()
}

pub fn response_status_ranges(response: &SearchResponse) -> Option<ResponseStatusRangesAggregate> {
    let aggregations = response.usable_aggregations()?;

    let status_ranges_count_by_entrypoint = aggregations
        .get(ENTRYPOINT_AGG)
        .map(node::buckets)
        .unwrap_or_default()
        .iter()
        .filter_map(|bucket| {
            Some((
                node::bucket_key(bucket)?,
                range_counts(bucket.get(STATUS_RANGES)),
            ))
        })
        .collect();

    Some(ResponseStatusRangesAggregate {
        status_ranges_count_by_entrypoint,
        ranges: range_counts(aggregations.get(ALL_APIS_STATUS_RANGES)),
    })
}

/// 每个状态码一条序列，长度等于时间桶数
pub fn response_status_over_time(response: &SearchResponse) -> ResponseStatusOverTimeAggregate {
    let Some(aggregations) = response.usable_aggregations() else {
        return ResponseStatusOverTimeAggregate::default();
    };
    let date_buckets = aggregations
        .get(BY_DATE)
        .map(node::buckets)
        .unwrap_or_default();

    let status_count = zero_filled(date_buckets, |bucket| {
        bucket
            .get(BY_STATUS)
            .map(node::buckets)
            .unwrap_or_default()
            .iter()
            .filter_map(|b| Some((node::bucket_key(b)?, node::doc_count(b))))
            .collect()
    });
    ResponseStatusOverTimeAggregate { status_count }
}
