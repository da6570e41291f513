//! 聚合函数分派
//!
//! 每个 [`AggregationKind`] 同时对应一个 DSL 构建器和一个响应解析器，
//! 两边都是穷举 match，新增函数时编译器会要求两边一起补齐。

use apim_ports::AggregationKind;
use serde_json::{Map, Value, json};

use crate::dsl::filter;
use crate::fields;
use crate::response::node;

const LATEST_VALUE: &str = "latest_value";
const START_VALUE: &str = "start_value";
const END_VALUE: &str = "end_value";

/// 单个 (字段, 函数) 在某个聚合容器中的解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum KindValue {
    /// FIELD：(key, doc_count)，保持引擎顺序
    Buckets(Vec<(String, u64)>),
    /// AVG / MIN / MAX / SUM
    Metric(Option<f64>),
    /// VALUE：最近一次的值与时间
    Latest {
        value: Option<i64>,
        timestamp: Option<i64>,
    },
    /// DELTA：end - start，计数器重置时为 end
    Delta(Option<f64>),
    /// TREND / TREND_RATE：单个时间桶的值
    Trend(Option<f64>),
}

pub trait AggregationKindExt {
    /// 聚合名，例如 `field_status`、`avg_gateway-response-time-ms`
    fn aggregation_name(&self, field: &str) -> String;

    /// 是否需要包在 date_histogram 中
    fn requires_date_histogram(&self) -> bool;

    /// 生成聚合节点
    fn build(&self, field: &str, doc_type: Option<&str>) -> Value;

    /// 从聚合容器（顶层 aggregations 或某个桶）中解析该字段的结果
    fn parse(
        &self,
        container: &Map<String, Value>,
        field: &str,
        interval_millis: Option<i64>,
    ) -> KindValue;
}

impl AggregationKindExt for AggregationKind {
    fn aggregation_name(&self, field: &str) -> String {
        format!("{}_{}", self, field)
    }

    fn requires_date_histogram(&self) -> bool {
        match self {
            AggregationKind::Trend | AggregationKind::TrendRate => true,
            AggregationKind::Field
            | AggregationKind::Avg
            | AggregationKind::Min
            | AggregationKind::Max
            | AggregationKind::Sum
            | AggregationKind::Value
            | AggregationKind::Delta => false,
        }
    }

    fn build(&self, field: &str, doc_type: Option<&str>) -> Value {
        match self {
            AggregationKind::Field => json!({ "terms": { "field": field } }),
            AggregationKind::Avg
            | AggregationKind::Min
            | AggregationKind::Max
            | AggregationKind::Sum => json!({ self.to_string(): { "field": field } }),
            AggregationKind::Value => json!({
                "filter": metric_filter(field, doc_type),
                "aggs": {
                    LATEST_VALUE: latest_hit(field, "desc"),
                },
            }),
            AggregationKind::Delta => json!({
                "filter": metric_filter(field, doc_type),
                "aggs": {
                    START_VALUE: latest_hit(field, "asc"),
                    END_VALUE: latest_hit(field, "desc"),
                },
            }),
            AggregationKind::Trend | AggregationKind::TrendRate => {
                json!({ "sum": { "field": field } })
            }
        }
    }

    fn parse(
        &self,
        container: &Map<String, Value>,
        field: &str,
        interval_millis: Option<i64>,
    ) -> KindValue {
        let aggregation = container.get(&self.aggregation_name(field));
        match self {
            AggregationKind::Field => KindValue::Buckets(
                aggregation
                    .map(node::buckets)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|bucket| {
                        node::bucket_key(bucket).map(|key| (key, node::doc_count(bucket)))
                    })
                    .collect(),
            ),
            AggregationKind::Avg
            | AggregationKind::Min
            | AggregationKind::Max
            | AggregationKind::Sum => KindValue::Metric(node::metric_value(aggregation)),
            AggregationKind::Value => {
                let source = node::first_hit_source(aggregation.and_then(|a| a.get(LATEST_VALUE)));
                KindValue::Latest {
                    value: source.and_then(|s| source_number(s, field)).map(|v| v as i64),
                    timestamp: source.and_then(|s| node::timestamp_millis(s.get(fields::TIMESTAMP))),
                }
            }
            AggregationKind::Delta => {
                let start = hit_number(aggregation, START_VALUE, field);
                let end = hit_number(aggregation, END_VALUE, field);
                KindValue::Delta(match (start, end) {
                    (Some(start), Some(end)) => Some(delta(start, end)),
                    _ => None,
                })
            }
            AggregationKind::Trend => KindValue::Trend(trend_sum(container, aggregation)),
            AggregationKind::TrendRate => KindValue::Trend(
                trend_sum(container, aggregation)
                    .zip(interval_millis.filter(|i| *i > 0))
                    .map(|(sum, interval)| per_second_rate(sum, interval)),
            ),
        }
    }
}

/// 每秒速率，保留三位小数
pub fn per_second_rate(sum: f64, interval_millis: i64) -> f64 {
    let per_second = sum * 1000.0 / interval_millis as f64;
    (per_second * 1000.0).round() / 1000.0
}

/// 计数器在区间内重置（end < start）时取 end
pub fn delta(start: f64, end: f64) -> f64 {
    if end < start { end } else { end - start }
}

fn metric_filter(field: &str, doc_type: Option<&str>) -> Value {
    let mut clauses = vec![filter::exists(field)];
    if let Some(doc_type) = doc_type {
        clauses.push(filter::term(fields::DOC_TYPE, doc_type));
    }
    filter::all_of(clauses)
}

fn latest_hit(field: &str, order: &str) -> Value {
    json!({
        "top_hits": {
            "size": 1,
            "sort": [{ (fields::TIMESTAMP): { "order": order } }],
            "_source": { "includes": [field, fields::TIMESTAMP] },
        }
    })
}

fn source_number(source: &Value, field: &str) -> Option<f64> {
    source.get(field)?.as_f64()
}

fn hit_number(aggregation: Option<&Value>, hit: &str, field: &str) -> Option<f64> {
    node::first_hit_source(aggregation?.get(hit)).and_then(|s| source_number(s, field))
}

/// doc_count 为 0 的时间桶视为无数据
fn trend_sum(container: &Map<String, Value>, aggregation: Option<&Value>) -> Option<f64> {
    let doc_count = container
        .get("doc_count")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if doc_count == 0 {
        return None;
    }
    node::metric_value(aggregation)
}
