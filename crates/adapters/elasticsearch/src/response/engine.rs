//! HTTP 指标引擎归约
//!
//! PERCENTAGE 的分母是所在范围的请求总数：整体度量为命中总数，
//! 分面和时间桶为桶的 `doc_count`。

use apim_ports::{
    Facet, FacetBucket, FacetsResponse, Measure, MeasureValues, MeasuresResponse, MetricFacets,
    MetricMeasures, MetricMeasuresQuery, MetricTimeSeries, SearchResponse, TimeSeriesBucket,
    TimeSeriesResponse,
};
use serde_json::{Map, Value};

use super::{as_container, node};
use crate::query::BY_DATE;
use crate::query::engine::{EngineContext, facet_name};

fn ratio(count: u64, base: f64) -> f64 {
    if base > 0.0 { count as f64 / base } else { 0.0 }
}

/// 指标节点缺失时按 0 个请求计算，数值度量没有值时不出现
fn measure_values(
    query: &MetricMeasuresQuery,
    container: &Map<String, Value>,
    total: u64,
    rate_seconds: f64,
) -> MeasureValues {
    let metric_node = container.get(&query.metric.to_string());
    let count = metric_node.map(node::doc_count).unwrap_or(0);
    query
        .measures
        .iter()
        .filter_map(|measure| {
            let value = match measure {
                Measure::Count => count as f64,
                Measure::Avg | Measure::Min | Measure::Max => {
                    node::metric_value(metric_node?.get(measure.to_string()))?
                }
                Measure::Rps => ratio(count, rate_seconds),
                Measure::Percentage => ratio(count, total as f64) * 100.0,
            };
            Some((*measure, value))
        })
        .collect()
}

pub fn measures(context: &EngineContext, response: &SearchResponse) -> Option<MeasuresResponse> {
    let aggregations = response.usable_aggregations()?;
    let total = response.total_hits().unwrap_or(0);
    let measures = context
        .metrics
        .iter()
        .map(|query| MetricMeasures {
            metric: query.metric,
            measures: measure_values(query, aggregations, total, context.rate_seconds),
        })
        .collect();
    Some(MeasuresResponse { measures })
}

fn facet_buckets(
    container: &Map<String, Value>,
    facets: &[Facet],
    query: &MetricMeasuresQuery,
    rate_seconds: f64,
) -> Vec<FacetBucket> {
    let Some((facet, inner)) = facets.split_first() else {
        return Vec::new();
    };
    container
        .get(&facet_name(*facet))
        .map(node::buckets)
        .unwrap_or_default()
        .iter()
        .filter_map(|bucket| {
            let key = node::bucket_key(bucket)?;
            let bucket_container = as_container(bucket);
            Some(FacetBucket {
                key,
                measures: measure_values(
                    query,
                    bucket_container,
                    node::doc_count(bucket),
                    rate_seconds,
                ),
                buckets: facet_buckets(bucket_container, inner, query, rate_seconds),
            })
        })
        .collect()
}

/// 桶顺序与引擎返回顺序一致（区间分面即请求的区间顺序）
pub fn facets(context: &EngineContext, response: &SearchResponse) -> Option<FacetsResponse> {
    let aggregations = response.usable_aggregations()?;
    let metrics = context
        .metrics
        .iter()
        .map(|query| MetricFacets {
            metric: query.metric,
            buckets: facet_buckets(aggregations, &context.facets, query, context.rate_seconds),
        })
        .collect();
    Some(FacetsResponse { metrics })
}

pub fn time_series(
    context: &EngineContext,
    response: &SearchResponse,
) -> Option<TimeSeriesResponse> {
    let date_buckets = response
        .usable_aggregations()?
        .get(BY_DATE)
        .map(node::buckets)
        .unwrap_or_default();

    let metrics = context
        .metrics
        .iter()
        .map(|query| MetricTimeSeries {
            metric: query.metric,
            buckets: date_buckets
                .iter()
                .filter_map(|bucket| {
                    Some(TimeSeriesBucket {
                        key: node::bucket_time(bucket)?,
                        timestamp: node::bucket_key_millis(bucket)?,
                        measures: measure_values(
                            query,
                            as_container(bucket),
                            node::doc_count(bucket),
                            context.rate_seconds,
                        ),
                    })
                })
                .collect(),
        })
        .collect();
    Some(TimeSeriesResponse { metrics })
}
