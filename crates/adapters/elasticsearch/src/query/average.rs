//! 平均值查询：每请求消息数、连接时长
//!
//! 按 entrypoint 分桶求平均，整体平均值在归约阶段由各桶平均值再取平均。

use apim_errors::AppResult;
use apim_ports::ApiAverageQuery;
use serde_json::json;

use super::{CompiledQuery, validate_optional};
use crate::config::ElasticsearchAnalyticsConfig;
use crate::dsl::{RangeForm, SearchDocument, filter, range_filter};
use crate::fields;

pub const ENTRYPOINTS_AGG: &str = "entrypoints_agg";

/// 平均值指标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AverageMetric {
    MessagesPerRequest,
    ConnectionDuration,
}

impl AverageMetric {
    pub fn field(&self) -> &'static str {
        match self {
            Self::MessagesPerRequest => fields::MESSAGE_COUNT,
            Self::ConnectionDuration => fields::GATEWAY_RESPONSE_TIME_MS,
        }
    }

    /// entrypoint 桶内的子聚合名
    pub fn aggregation_name(&self) -> &'static str {
        match self {
            Self::MessagesPerRequest => "messages_per_request",
            Self::ConnectionDuration => "connection_duration",
        }
    }
}

pub fn average(
    metric: AverageMetric,
    query: &ApiAverageQuery,
    config: &ElasticsearchAnalyticsConfig,
) -> AppResult<CompiledQuery<AverageMetric>> {
    validate_optional(query.time_range.as_ref())?;

    let mut document = SearchDocument::new()
        .filter(filter::term(fields::API_ID, query.api_id.as_str()))
        .filter_opt(
            query
                .time_range
                .as_ref()
                .map(|range| range_filter(range, RangeForm::Legacy)),
        );
    if metric == AverageMetric::ConnectionDuration {
        // 只统计已结束的连接
        document = document.filter(filter::term(fields::REQUEST_ENDED, true));
    }

    let document = document
        .aggregation(
            ENTRYPOINTS_AGG,
            json!({
                "terms": { "field": config.entrypoint_field() },
                "aggs": {
                    (metric.aggregation_name()): { "avg": { "field": metric.field() } }
                }
            }),
        )
        .build();

    Ok(CompiledQuery::new(document, metric))
}
