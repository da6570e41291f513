//! 请求数查询

use apim_errors::AppResult;
use apim_ports::{RequestsCountByEventQuery, RequestsCountQuery};
use serde_json::json;

use super::{CompiledQuery, validate_optional};
use crate::config::ElasticsearchAnalyticsConfig;
use crate::dsl::{RangeForm, SearchDocument, filter, range_filter};
use crate::fields;

pub const ENTRYPOINTS: &str = "entrypoints";

/// 单个 API 的请求数，按 entrypoint 分桶
pub fn requests_count(
    query: &RequestsCountQuery,
    config: &ElasticsearchAnalyticsConfig,
) -> AppResult<CompiledQuery> {
    validate_optional(query.time_range.as_ref())?;

    let document = SearchDocument::new()
        .with_total_hits()
        .filter(filter::term(fields::API_ID, query.api_id.as_str()))
        .filter_opt(
            query
                .time_range
                .as_ref()
                .map(|range| range_filter(range, RangeForm::Legacy)),
        )
        .aggregation(
            ENTRYPOINTS,
            json!({ "terms": { "field": config.entrypoint_field() } }),
        )
        .build();

    Ok(CompiledQuery::from_query(document))
}

/// 按实体统计请求总数，只需要命中总数
pub fn requests_count_by_event(query: &RequestsCountByEventQuery) -> AppResult<CompiledQuery> {
    query.time_range.validate()?;

    let document = SearchDocument::new()
        .with_total_hits()
        .filter(filter::search_term(&query.search_term_id))
        .filter(range_filter(&query.time_range, RangeForm::Bounds))
        .filter_opt(filter::query_string(query.query.as_deref()))
        .build();

    Ok(CompiledQuery::from_query(document))
}
