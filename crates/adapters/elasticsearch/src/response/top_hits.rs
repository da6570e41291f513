//! Top N 归约
//!
//! 同一 key 可能同时出现在 `api-id` 与 `api` 两个聚合中，计数相加。

use std::collections::HashMap;

use apim_ports::{FailedApiInfo, SearchResponse, TopFailedAggregate, TopHitsAggregate};
use serde_json::Value;

use super::node;
use crate::query::top_hits::{
    FAILED_APIS_AGG_PREFIX, FAILED_REQUESTS, FAILED_REQUESTS_COUNT, FAILED_REQUESTS_RATIO,
    HITS_COUNT, TOP_HITS_COUNT_PREFIX, TOTAL_REQUESTS,
};

fn prefixed<'a>(response: &'a SearchResponse, prefix: &'a str) -> Option<impl Iterator<Item = &'a Value>> {
    let aggregations = response.usable_aggregations()?;
    Some(
        aggregations
            .iter()
            .filter(move |(name, _)| name.starts_with(prefix))
            .flat_map(|(_, aggregation)| node::buckets(aggregation)),
    )
}

pub fn top_hits(response: &SearchResponse) -> Option<TopHitsAggregate> {
    let mut top_hits_counts: HashMap<String, u64> = HashMap::new();
    for bucket in prefixed(response, TOP_HITS_COUNT_PREFIX)? {
        let Some(key) = node::bucket_key(bucket) else {
            continue;
        };
        let count = node::metric_value(bucket.get(HITS_COUNT))
            .map(|v| v as u64)
            .unwrap_or_else(|| node::doc_count(bucket));
        *top_hits_counts.entry(key).or_default() += count;
    }
    Some(TopHitsAggregate { top_hits_counts })
}

#[derive(Debug, Default)]
struct FailedAccumulator {
    failed: u64,
    total: u64,
    ratio: f64,
    sources: u32,
}

/// 失败数为 0 的桶不出现在结果中；多个来源合并后比例按合并后的总数重算
pub fn top_failed(response: &SearchResponse) -> Option<TopFailedAggregate> {
    let mut merged: HashMap<String, FailedAccumulator> = HashMap::new();
    for bucket in prefixed(response, FAILED_APIS_AGG_PREFIX)? {
        let Some(key) = node::bucket_key(bucket) else {
            continue;
        };
        let failed = node::metric_value(
            bucket
                .get(FAILED_REQUESTS)
                .and_then(|f| f.get(FAILED_REQUESTS_COUNT)),
        )
        .unwrap_or(0.0) as u64;
        if failed == 0 {
            continue;
        }
        let total = node::metric_value(bucket.get(TOTAL_REQUESTS))
            .map(|v| v as u64)
            .unwrap_or_else(|| node::doc_count(bucket));
        let ratio = node::metric_value(bucket.get(FAILED_REQUESTS_RATIO)).unwrap_or_else(|| {
            if total > 0 { failed as f64 / total as f64 } else { 0.0 }
        });

        let entry = merged.entry(key).or_default();
        entry.failed += failed;
        entry.total += total;
        entry.ratio = ratio;
        entry.sources += 1;
    }

    let failed_apis = merged
        .into_iter()
        .map(|(key, acc)| {
            let failed_requests_ratio = if acc.sources > 1 && acc.total > 0 {
                acc.failed as f64 / acc.total as f64
            } else {
                acc.ratio
            };
            (
                key,
                FailedApiInfo {
                    failed_requests: acc.failed,
                    failed_requests_ratio,
                },
            )
        })
        .collect();
    Some(TopFailedAggregate { failed_apis })
}
