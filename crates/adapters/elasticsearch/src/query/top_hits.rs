//! Top N 查询：请求量最高的 API / 应用、失败请求最多的 API
//!
//! API 身份字段同时查询 `api-id` 与 V2 的 `api`，每个字段一个聚合，
//! 归约时按 key 合并。

use apim_errors::AppResult;
use apim_ports::ApiAnalyticsQuery;
use serde_json::{Value, json};

use super::{CompiledQuery, validate_optional};
use crate::dsl::{RangeForm, SearchDocument, filter, range_filter};
use crate::fields;

pub const TOP_HITS_COUNT_PREFIX: &str = "top_hits_count_";
pub const HITS_COUNT: &str = "hits_count";

pub const FAILED_APIS_AGG_PREFIX: &str = "failed_apis_agg_";
pub const TOTAL_REQUESTS: &str = "total_requests";
pub const FAILED_REQUESTS: &str = "failed_requests";
pub const FAILED_REQUESTS_COUNT: &str = "failed_requests_count";
pub const FAILED_REQUESTS_RATIO: &str = "failed_requests_ratio";

const API_ID_FIELDS: [&str; 2] = [fields::API_ID, fields::API];

fn base_document(query: Option<&ApiAnalyticsQuery>) -> AppResult<SearchDocument> {
    let Some(query) = query else {
        return Ok(SearchDocument::new().filter(filter::no_api()));
    };
    validate_optional(query.time_range.as_ref())?;

    Ok(SearchDocument::new()
        .filter(filter::api_ids(&query.api_ids, true))
        .filter_opt(
            query
                .time_range
                .as_ref()
                .map(|range| range_filter(range, RangeForm::Bounds)),
        ))
}

fn hits_count(field: &str) -> Value {
    json!({
        "terms": { "field": field },
        "aggs": {
            HITS_COUNT: { "value_count": { "field": field } }
        }
    })
}

/// 请求量最高的 API
pub fn top_hits_apis(query: Option<&ApiAnalyticsQuery>) -> AppResult<CompiledQuery> {
    let document = API_ID_FIELDS
        .iter()
        .fold(base_document(query)?, |document, field| {
            document.aggregation(format!("{}{}", TOP_HITS_COUNT_PREFIX, field), hits_count(field))
        })
        .build();
    Ok(CompiledQuery::from_query(document))
}

/// 请求量最高的应用
pub fn top_apps(query: Option<&ApiAnalyticsQuery>) -> AppResult<CompiledQuery> {
    let document = base_document(query)?
        .aggregation(
            format!("{}{}", TOP_HITS_COUNT_PREFIX, fields::APPLICATION_ID),
            hits_count(fields::APPLICATION_ID),
        )
        .build();
    Ok(CompiledQuery::from_query(document))
}

/// 失败比例由引擎的 bucket_script 计算
fn failed_requests(field: &str) -> Value {
    json!({
        "terms": {
            "field": field,
            "order": { (format!("{}>{}", FAILED_REQUESTS, FAILED_REQUESTS_COUNT)): "desc" }
        },
        "aggs": {
            TOTAL_REQUESTS: { "value_count": { "field": field } },
            FAILED_REQUESTS: {
                "filter": { "range": { (fields::STATUS): { "gte": 500, "lt": 600 } } },
                "aggs": {
                    FAILED_REQUESTS_COUNT: { "value_count": { "field": field } }
                }
            },
            FAILED_REQUESTS_RATIO: {
                "bucket_script": {
                    "buckets_path": {
                        "failed": format!("{}>{}", FAILED_REQUESTS, FAILED_REQUESTS_COUNT),
                        "total": TOTAL_REQUESTS
                    },
                    "script": "params.failed / params.total"
                }
            }
        }
    })
}

/// 失败请求（5xx）最多的 API
pub fn top_failed_apis(query: Option<&ApiAnalyticsQuery>) -> AppResult<CompiledQuery> {
    let document = API_ID_FIELDS
        .iter()
        .fold(base_document(query)?, |document, field| {
            document.aggregation(
                format!("{}{}", FAILED_APIS_AGG_PREFIX, field),
                failed_requests(field),
            )
        })
        .build();
    Ok(CompiledQuery::from_query(document))
}
