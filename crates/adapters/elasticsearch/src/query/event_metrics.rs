//! 事件指标查询（VALUE / DELTA / TREND / TREND_RATE）
//!
//! 所有聚合必须使用同一个函数。VALUE / DELTA 按字段的 doc-type 过滤，
//! 映射表中没有的字段会被跳过并记录告警，不出现在结果中。

use apim_errors::{AppError, AppResult};
use apim_ports::{AggregationKind, HistogramQuery, single_aggregation_kind};
use serde_json::Map;
use tracing::warn;

use super::{BY_DATE, CompiledQuery};
use crate::aggregation_kind::AggregationKindExt;
use crate::doc_types::MetricDocTypes;
use crate::dsl::{RangeForm, SearchDocument, date_histogram, filter, range_filter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetricsContext {
    pub kind: AggregationKind,
    /// 实际生成了聚合的字段，保持请求顺序
    pub fields: Vec<String>,
    /// TREND / TREND_RATE 的分桶间隔
    pub interval_millis: Option<i64>,
}

impl EventMetricsContext {
    /// 没有可查询的字段，无需发出搜索
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn supported(kind: AggregationKind) -> bool {
    matches!(
        kind,
        AggregationKind::Value
            | AggregationKind::Delta
            | AggregationKind::Trend
            | AggregationKind::TrendRate
    )
}

pub fn event_metrics(
    query: &HistogramQuery,
    doc_types: &MetricDocTypes,
) -> AppResult<CompiledQuery<EventMetricsContext>> {
    query.time_range.validate()?;
    let kind = single_aggregation_kind(&query.aggregations)?;
    if !supported(kind) {
        return Err(AppError::invalid_query(format!(
            "{} is not supported by event analytics",
            kind
        )));
    }

    let mut requested: Vec<&str> = Vec::new();
    for aggregation in &query.aggregations {
        if !requested.contains(&aggregation.field.as_str()) {
            requested.push(&aggregation.field);
        }
    }

    let mut aggs = Map::new();
    let mut fields = Vec::new();
    let mut interval_millis = None;

    if kind.requires_date_histogram() {
        let interval = query.time_range.required_interval_millis()?;
        let mut per_bucket = Map::new();
        for field in requested {
            per_bucket.insert(kind.aggregation_name(field), kind.build(field, None));
            fields.push(field.to_string());
        }
        aggs.insert(
            BY_DATE.to_string(),
            date_histogram(&query.time_range, interval, per_bucket),
        );
        interval_millis = Some(interval);
    } else {
        for field in requested {
            match doc_types.doc_type(field) {
                Some(doc_type) => {
                    aggs.insert(kind.aggregation_name(field), kind.build(field, Some(doc_type)));
                    fields.push(field.to_string());
                }
                None => warn!(field = %field, kind = %kind, "Unknown metric field, skipping"),
            }
        }
    }

    let document = SearchDocument::new()
        .filter(filter::search_term(&query.search_term_id))
        .filter(range_filter(&query.time_range, RangeForm::Bounds))
        .filters(filter::dimensions(&query.terms))
        .filter_opt(filter::query_string(query.query.as_deref()))
        .aggregations(aggs)
        .build();

    Ok(CompiledQuery::new(
        document,
        EventMetricsContext {
            kind,
            fields,
            interval_millis,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apim_ports::{Aggregation, SearchTermId, TimeRange};
    use serde_json::json;
    use std::time::Duration;

    fn query(aggregations: Vec<Aggregation>) -> HistogramQuery {
        HistogramQuery::new(
            SearchTermId::api("native-api"),
            TimeRange::new(0, 60_000).with_interval(Duration::from_secs(10)),
            aggregations,
        )
    }

    #[test]
    fn test_delta_query_uses_doc_type() {
        let compiled = event_metrics(
            &query(vec![Aggregation::new(
                "upstream-publish-messages-count-increment",
                AggregationKind::Delta,
            )]),
            &MetricDocTypes::default(),
        )
        .unwrap();

        let node = &compiled.query["aggs"]["delta_upstream-publish-messages-count-increment"];
        assert_eq!(
            node["filter"],
            json!({"bool": {"filter": [
                {"exists": {"field": "upstream-publish-messages-count-increment"}},
                {"term": {"doc-type": "topic"}}
            ]}})
        );
        assert!(node["aggs"]["start_value"].is_object());
        assert!(node["aggs"]["end_value"].is_object());
        assert_eq!(compiled.context.kind, AggregationKind::Delta);
        assert_eq!(compiled.context.interval_millis, None);
    }

    #[test]
    fn test_unknown_field_is_skipped() {
        let compiled = event_metrics(
            &query(vec![
                Aggregation::new("downstream-active-connections", AggregationKind::Value),
                Aggregation::new("not-a-metric", AggregationKind::Value),
            ]),
            &MetricDocTypes::default(),
        )
        .unwrap();

        assert_eq!(
            compiled.context.fields,
            vec!["downstream-active-connections".to_string()]
        );
        assert!(compiled.query["aggs"]["value_not-a-metric"].is_null());
    }

    #[test]
    fn test_all_fields_unknown() {
        let compiled = event_metrics(
            &query(vec![Aggregation::new("not-a-metric", AggregationKind::Delta)]),
            &MetricDocTypes::default(),
        )
        .unwrap();
        assert!(compiled.context.is_empty());
        assert!(compiled.query.get("aggs").is_none());
    }

    #[test]
    fn test_trend_rate_query() {
        let compiled = event_metrics(
            &query(vec![
                Aggregation::new("downstream-publish-messages-total", AggregationKind::TrendRate),
                Aggregation::new("custom-counter", AggregationKind::TrendRate),
            ]),
            &MetricDocTypes::default(),
        )
        .unwrap();

        let by_date = &compiled.query["aggs"]["by_date"];
        assert_eq!(by_date["date_histogram"]["fixed_interval"], "10000ms");
        assert_eq!(
            by_date["aggs"]["trend_rate_downstream-publish-messages-total"],
            json!({"sum": {"field": "downstream-publish-messages-total"}})
        );
        assert_eq!(compiled.context.fields.len(), 2);
        assert_eq!(compiled.context.interval_millis, Some(10_000));
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let err = event_metrics(
            &query(vec![
                Aggregation::new("downstream-active-connections", AggregationKind::Value),
                Aggregation::new("downstream-active-connections", AggregationKind::Delta),
            ]),
            &MetricDocTypes::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid query: exactly one aggregate function required"
        );
    }

    #[test]
    fn test_empty_aggregations_rejected() {
        let err = event_metrics(&query(vec![]), &MetricDocTypes::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid query: at least one aggregate function required"
        );
    }

    #[test]
    fn test_histogram_kinds_rejected() {
        assert!(matches!(
            event_metrics(
                &query(vec![Aggregation::new("status", AggregationKind::Avg)]),
                &MetricDocTypes::default(),
            ),
            Err(AppError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_trend_requires_interval() {
        let mut q = query(vec![Aggregation::new("bytes", AggregationKind::Trend)]);
        q.time_range = TimeRange::new(0, 60_000);
        assert!(matches!(
            event_metrics(&q, &MetricDocTypes::default()),
            Err(AppError::InvalidQuery(_))
        ));
    }
}
