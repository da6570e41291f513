//! 直方图查询
//!
//! `by_date` 时间分桶，每个 (字段, 函数) 一个子聚合。聚合名到字段 / 函数的
//! 映射放在 [`HistogramContext`] 里交给归约阶段。

use apim_errors::{AppError, AppResult};
use apim_ports::{Aggregation, AggregationKind, HistogramQuery};
use serde_json::{Map, Value};

use super::{BY_DATE, CompiledQuery};
use crate::aggregation_kind::AggregationKindExt;
use crate::config::ElasticsearchAnalyticsConfig;
use crate::dsl::{RangeForm, SearchDocument, date_histogram, filter, range_filter};

/// 聚合名 -> 请求的 (字段, 函数)，保持请求顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramContext {
    pub aggregations: Vec<(String, Aggregation)>,
}

fn supported(kind: AggregationKind) -> bool {
    matches!(
        kind,
        AggregationKind::Field
            | AggregationKind::Avg
            | AggregationKind::Min
            | AggregationKind::Max
            | AggregationKind::Sum
    )
}

/// FIELD 分组的 terms 大小取 `group_by_size`，引擎默认只返回 10 个 key
pub fn histogram(
    query: &HistogramQuery,
    config: &ElasticsearchAnalyticsConfig,
) -> AppResult<CompiledQuery<HistogramContext>> {
    query.time_range.validate()?;
    let interval = query.time_range.required_interval_millis()?;
    if query.aggregations.is_empty() {
        return Err(AppError::invalid_query(
            "at least one aggregate function required",
        ));
    }

    let mut context = HistogramContext::default();
    let mut aggs = Map::new();
    for aggregation in &query.aggregations {
        if !supported(aggregation.kind) {
            return Err(AppError::invalid_query(format!(
                "{} is not supported by histogram",
                aggregation.kind
            )));
        }
        let name = aggregation.kind.aggregation_name(&aggregation.field);
        if aggs.contains_key(&name) {
            continue;
        }
        let mut node = aggregation.kind.build(&aggregation.field, None);
        if let Some(terms) = node.get_mut("terms").and_then(Value::as_object_mut) {
            terms.insert("size".to_string(), Value::from(config.group_by_size));
        }
        aggs.insert(name.clone(), node);
        context.aggregations.push((name, aggregation.clone()));
    }

    let document = SearchDocument::new()
        .filter(filter::search_term(&query.search_term_id))
        .filter(range_filter(&query.time_range, RangeForm::Bounds))
        .filters(filter::dimensions(&query.terms))
        .filter_opt(filter::query_string(query.query.as_deref()))
        .aggregation(BY_DATE, date_histogram(&query.time_range, interval, aggs))
        .build();

    Ok(CompiledQuery::new(document, context))
}
