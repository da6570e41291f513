//! 响应时间查询：随时间变化的平均值、请求量与响应时间概览

use apim_errors::AppResult;
use apim_ports::ApiAnalyticsQuery;
use serde_json::{Map, Value, json};

use super::{BY_DATE, CompiledQuery, required_interval, validate_optional};
use crate::dsl::{RangeForm, SearchDocument, date_histogram, filter, range_filter};
use crate::fields;

pub const AVG_RESPONSE_TIME: &str = "avg_response_time";
pub const RESPONSE_TIME: &str = "response_time";

fn avg_response_time() -> Value {
    json!({ "avg": { "field": fields::GATEWAY_RESPONSE_TIME_MS } })
}

/// 平均响应时间：整体一份，每个时间桶一份
pub fn response_time_over_time(query: &ApiAnalyticsQuery) -> AppResult<CompiledQuery> {
    let (range, interval) = required_interval(query.time_range.as_ref())?;

    let mut per_bucket = Map::new();
    per_bucket.insert(AVG_RESPONSE_TIME.to_string(), avg_response_time());

    let document = SearchDocument::new()
        .filter(filter::api_ids(&query.api_ids, query.includes_v2()))
        .filter(range_filter(&range, RangeForm::Legacy))
        .aggregation(AVG_RESPONSE_TIME, avg_response_time())
        .aggregation(BY_DATE, date_histogram(&range, interval, per_bucket))
        .build();

    Ok(CompiledQuery::from_query(document))
}

/// 请求量与响应时间概览，上下文为时间窗口长度（毫秒）
pub fn request_response_time(query: &ApiAnalyticsQuery) -> AppResult<CompiledQuery<Option<i64>>> {
    validate_optional(query.time_range.as_ref())?;

    let document = SearchDocument::new()
        .with_total_hits()
        .filter(filter::api_ids(&query.api_ids, query.includes_v2()))
        .filter_opt(
            query
                .time_range
                .as_ref()
                .map(|range| range_filter(range, RangeForm::Bounds)),
        )
        .aggregation(
            RESPONSE_TIME,
            json!({ "stats": { "field": fields::GATEWAY_RESPONSE_TIME_MS } }),
        )
        .build();

    let window = query.time_range.as_ref().map(|range| range.duration_millis());
    Ok(CompiledQuery::new(document, window))
}
