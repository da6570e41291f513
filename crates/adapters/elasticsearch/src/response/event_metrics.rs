//! 事件指标归约
//!
//! VALUE 输出每个字段的最新值与时间戳；DELTA 输出单元素序列；
//! TREND / TREND_RATE 每个时间桶一个值，没有数据的桶为 None。

use std::collections::HashMap;

use apim_ports::{AggregationKind, EventAnalyticsAggregate, SearchResponse};

use super::{as_container, node};
use crate::aggregation_kind::{AggregationKindExt, KindValue};
use crate::query::BY_DATE;
use crate::query::event_metrics::EventMetricsContext;

pub fn event_metrics(
    context: &EventMetricsContext,
    response: &SearchResponse,
) -> Option<EventAnalyticsAggregate> {
    if context.is_empty() {
        return None;
    }
    let aggregations = response.usable_aggregations()?;
    let kind = context.kind;

    let result = match kind {
        AggregationKind::Value => {
            let mut values = HashMap::new();
            for field in &context.fields {
                if let KindValue::Latest {
                    value: Some(value),
                    timestamp,
                } = kind.parse(aggregations, field, None)
                {
                    let mut entry = HashMap::from([("value".to_string(), value)]);
                    if let Some(timestamp) = timestamp {
                        entry.insert("timestamp".to_string(), timestamp);
                    }
                    values.insert(field.clone(), entry);
                }
            }
            EventAnalyticsAggregate::Latest { values }
        }
        AggregationKind::Delta => {
            let mut values = HashMap::new();
            for field in &context.fields {
                if let KindValue::Delta(Some(delta)) = kind.parse(aggregations, field, None) {
                    values.insert(field.clone(), vec![Some(delta)]);
                }
            }
            EventAnalyticsAggregate::Series { values }
        }
        AggregationKind::Trend | AggregationKind::TrendRate => {
            let date_buckets = aggregations
                .get(BY_DATE)
                .map(node::buckets)
                .unwrap_or_default();
            if date_buckets.is_empty() {
                return None;
            }
            let values = context
                .fields
                .iter()
                .map(|field| {
                    let series = date_buckets
                        .iter()
                        .map(|bucket| {
                            match kind.parse(as_container(bucket), field, context.interval_millis) {
                                KindValue::Trend(value) => value,
                                _ => None,
                            }
                        })
                        .collect();
                    (field.clone(), series)
                })
                .collect();
            EventAnalyticsAggregate::Series { values }
        }
        AggregationKind::Field
        | AggregationKind::Avg
        | AggregationKind::Min
        | AggregationKind::Max
        | AggregationKind::Sum => return None,
    };

    (!result.is_empty()).then_some(result)
}
