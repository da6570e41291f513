//! 响应时间归约

use apim_ports::{AverageAggregate, RequestResponseTimeAggregate, SearchResponse};
use serde_json::Value;

use super::node;
use crate::query::BY_DATE;
use crate::query::response_time::{AVG_RESPONSE_TIME, RESPONSE_TIME};

/// 平均响应时间，按时间桶拆分；没有数据的桶为 0
pub fn response_time_over_time(response: &SearchResponse) -> Option<AverageAggregate> {
    let aggregations = response.usable_aggregations()?;
    let average = node::metric_value(aggregations.get(AVG_RESPONSE_TIME)).unwrap_or(0.0);
    let average_by = aggregations
        .get(BY_DATE)
        .map(node::buckets)
        .unwrap_or_default()
        .iter()
        .filter_map(|bucket| {
            let time = node::bucket_time(bucket)?;
            let value = node::metric_value(bucket.get(AVG_RESPONSE_TIME)).unwrap_or(0.0);
            Some((time, value))
        })
        .collect();

    Some(AverageAggregate {
        average,
        average_by,
    })
}

/// 窗口长度为 0 或未知时每秒请求数为 0
pub fn request_response_time(
    window_millis: &Option<i64>,
    response: &SearchResponse,
) -> RequestResponseTimeAggregate {
    let Some(aggregations) = response.usable_aggregations() else {
        return RequestResponseTimeAggregate::default();
    };
    let requests_total = response.total_hits().unwrap_or(0);
    let stats = aggregations.get(RESPONSE_TIME);
    let stat = |name: &str| {
        stats
            .and_then(|s| s.get(name))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };

    let requests_per_second = match window_millis {
        Some(window) if *window > 0 => requests_total as f64 / (*window as f64 / 1000.0),
        _ => 0.0,
    };

    RequestResponseTimeAggregate {
        requests_per_second,
        requests_total,
        response_min_time: stat("min"),
        response_max_time: stat("max"),
        response_avg_time: stat("avg"),
    }
}
