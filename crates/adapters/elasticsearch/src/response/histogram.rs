//! 直方图归约

use apim_ports::{AggregationKind, HistogramAggregate, SearchResponse};

use super::{as_container, node, zero_filled};
use crate::aggregation_kind::{AggregationKindExt, KindValue};
use crate::query::BY_DATE;
use crate::query::histogram::HistogramContext;

/// 按编译时记录的顺序输出，每条序列长度等于引擎返回的时间桶数
pub fn histogram(context: &HistogramContext, response: &SearchResponse) -> Vec<HistogramAggregate> {
    let Some(aggregations) = response.usable_aggregations() else {
        return Vec::new();
    };
    let date_buckets = aggregations
        .get(BY_DATE)
        .map(node::buckets)
        .unwrap_or_default();

    context
        .aggregations
        .iter()
        .map(|(name, aggregation)| {
            let field = aggregation.field.as_str();
            match aggregation.kind {
                AggregationKind::Field => HistogramAggregate::Counts {
                    name: name.clone(),
                    field: field.to_string(),
                    values: zero_filled(date_buckets, |bucket| {
                        match aggregation.kind.parse(as_container(bucket), field, None) {
                            KindValue::Buckets(buckets) => buckets,
                            _ => Vec::new(),
                        }
                    }),
                },
                kind => HistogramAggregate::Metric {
                    name: name.clone(),
                    field: field.to_string(),
                    values: date_buckets
                        .iter()
                        .map(|bucket| match kind.parse(as_container(bucket), field, None) {
                            KindValue::Metric(value) => value.unwrap_or(0.0),
                            _ => 0.0,
                        })
                        .collect(),
                },
            }
        })
        .collect()
}
