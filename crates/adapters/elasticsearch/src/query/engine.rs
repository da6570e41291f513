//! HTTP 指标引擎查询：整体度量、分面、时间序列
//!
//! 每个指标一个 `filter` 聚合（名称即指标名），COUNT 取其 `doc_count`，
//! AVG / MIN / MAX 为其子聚合。RPS 与 PERCENTAGE 在归约阶段计算。

use apim_errors::{AppError, AppResult};
use apim_ports::{
    Facet, FacetsQuery, Filter, FilterOperator, MeasuresQuery, Metric, MetricMeasuresQuery,
    NumberRange, TimeRange, TimeSeriesQuery, validate_metrics,
};
use serde_json::{Map, Value, json};

use super::{BY_DATE, CompiledQuery};
use crate::config::ElasticsearchAnalyticsConfig;
use crate::dsl::{RangeForm, SearchDocument, date_histogram, filter, range_filter};
use crate::fields;

pub const FACET_PREFIX: &str = "facet_";

/// 归约所需：请求的指标与 RPS 的时间基数
#[derive(Debug, Clone, PartialEq)]
pub struct EngineContext {
    pub metrics: Vec<MetricMeasuresQuery>,
    /// 整体度量、分面为查询窗口，时间序列为分桶间隔
    pub rate_seconds: f64,
    /// 分面的嵌套顺序
    pub facets: Vec<Facet>,
}

impl EngineContext {
    fn new(metrics: &[MetricMeasuresQuery], rate_seconds: f64) -> Self {
        Self {
            metrics: metrics.to_vec(),
            rate_seconds,
            facets: Vec::new(),
        }
    }
}

pub fn facet_name(facet: Facet) -> String {
    format!("{}{}", FACET_PREFIX, facet)
}

fn metric_filter(metric: Metric) -> Value {
    match metric {
        Metric::HttpRequests => json!({ "match_all": {} }),
        Metric::HttpErrors => json!({ "range": { (fields::STATUS): { "gte": 400 } } }),
        Metric::HttpGatewayResponseTime => filter::exists(fields::GATEWAY_RESPONSE_TIME_MS),
    }
}

fn metric_field(metric: Metric) -> Option<&'static str> {
    match metric {
        Metric::HttpGatewayResponseTime => Some(fields::GATEWAY_RESPONSE_TIME_MS),
        Metric::HttpRequests | Metric::HttpErrors => None,
    }
}

fn metric_aggregations(metrics: &[MetricMeasuresQuery]) -> Map<String, Value> {
    metrics
        .iter()
        .map(|query| {
            let mut node = json!({ "filter": metric_filter(query.metric) });
            if let Some(field) = metric_field(query.metric) {
                let sub: Map<String, Value> = query
                    .measures
                    .iter()
                    .filter(|measure| measure.is_numeric())
                    .map(|measure| {
                        (
                            measure.to_string(),
                            json!({ (measure.to_string()): { "field": field } }),
                        )
                    })
                    .collect();
                if !sub.is_empty() {
                    node["aggs"] = Value::Object(sub);
                }
            }
            (query.metric.to_string(), node)
        })
        .collect()
}

/// `EQ` 的取值个数已由 [`Filter::validate`] 校验
fn filter_clause(f: &Filter) -> Value {
    let field = f.name.field();
    match (f.operator, f.values.as_slice()) {
        (FilterOperator::Eq, [value]) => filter::term(field, value.as_str()),
        _ => filter::terms(field, &f.values),
    }
}

fn base_document(time_range: &TimeRange, filters: &[Filter]) -> AppResult<SearchDocument> {
    time_range.validate()?;
    filters.iter().try_for_each(Filter::validate)?;
    Ok(SearchDocument::new()
        .with_total_hits()
        .filters(filters.iter().map(filter_clause))
        .filter(range_filter(time_range, RangeForm::Bounds)))
}

fn window_seconds(time_range: &TimeRange) -> f64 {
    time_range.duration_millis() as f64 / 1000.0
}

/// 整体度量
pub fn measures(query: &MeasuresQuery) -> AppResult<CompiledQuery<EngineContext>> {
    validate_metrics(&query.metrics)?;
    let document = base_document(&query.time_range, &query.filters)?
        .aggregations(metric_aggregations(&query.metrics))
        .build();
    Ok(CompiledQuery::new(
        document,
        EngineContext::new(&query.metrics, window_seconds(&query.time_range)),
    ))
}

/// 区间上界在引擎中不包含，闭区间上界加一
fn status_ranges(ranges: &[NumberRange]) -> Value {
    let ranges: Vec<Value> = ranges
        .iter()
        .map(|range| {
            json!({
                "key": range.key(),
                "from": range.from,
                "to": range.to.saturating_add(1),
            })
        })
        .collect();
    json!({ "range": { "field": fields::STATUS, "ranges": ranges } })
}

fn facet_node(facet: Facet, ranges: &[NumberRange], size: u32) -> Value {
    let field = match facet {
        Facet::Api => fields::API_ID,
        Facet::Application => fields::APPLICATION_ID,
        Facet::Plan => fields::PLAN_ID,
        Facet::HttpStatus if !ranges.is_empty() => return status_ranges(ranges),
        Facet::HttpStatus => fields::STATUS,
    };
    json!({ "terms": { "field": field, "size": size } })
}

/// 按维度分面；每一层都带指标聚合，内层维度挂在外层的桶下
pub fn facets(
    query: &FacetsQuery,
    config: &ElasticsearchAnalyticsConfig,
) -> AppResult<CompiledQuery<EngineContext>> {
    validate_metrics(&query.metrics)?;
    if query.facets.is_empty() {
        return Err(AppError::invalid_query("at least one facet required"));
    }

    let metrics = metric_aggregations(&query.metrics);
    let mut inner: Option<(String, Value)> = None;
    for facet in query.facets.iter().rev() {
        let mut aggs = metrics.clone();
        if let Some((name, node)) = inner.take() {
            aggs.insert(name, node);
        }
        let mut node = facet_node(*facet, &query.ranges, config.group_by_size);
        node["aggs"] = Value::Object(aggs);
        inner = Some((facet_name(*facet), node));
    }

    let mut document = base_document(&query.time_range, &query.filters)?;
    if let Some((name, node)) = inner {
        document = document.aggregation(name, node);
    }

    let mut context = EngineContext::new(&query.metrics, window_seconds(&query.time_range));
    context.facets = query.facets.clone();
    Ok(CompiledQuery::new(document.build(), context))
}

/// 按固定间隔分桶，RPS 以间隔为时间基数
pub fn time_series(query: &TimeSeriesQuery) -> AppResult<CompiledQuery<EngineContext>> {
    validate_metrics(&query.metrics)?;
    let interval = i64::try_from(query.interval.as_millis()).unwrap_or(i64::MAX);
    if interval <= 0 {
        return Err(AppError::invalid_query("interval must be positive"));
    }

    let document = base_document(&query.time_range, &query.filters)?
        .aggregation(
            BY_DATE,
            date_histogram(
                &query.time_range,
                interval,
                metric_aggregations(&query.metrics),
            ),
        )
        .build();
    Ok(CompiledQuery::new(
        document,
        EngineContext::new(&query.metrics, interval as f64 / 1000.0),
    ))
}
