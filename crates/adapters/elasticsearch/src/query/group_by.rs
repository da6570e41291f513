//! 分组查询：按字段取值或数值区间分桶

use apim_errors::{AppError, AppResult};
use apim_ports::{GroupByOrder, GroupByQuery};
use serde_json::{Value, json};

use super::CompiledQuery;
use crate::aggregation_kind::AggregationKindExt;
use crate::config::ElasticsearchAnalyticsConfig;
use crate::dsl::{RangeForm, SearchDocument, filter, range_filter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupByContext {
    pub name: String,
    pub field: String,
}

fn direction(ascending: bool) -> &'static str {
    if ascending { "asc" } else { "desc" }
}

/// 按指标排序时追加对应子聚合，否则直接按 `_key` / `_count` 等排序
fn terms_node(field: &str, size: u32, order: Option<&GroupByOrder>) -> Value {
    let mut node = json!({ "terms": { "field": field, "size": size } });
    if let Some(order) = order {
        if order.kind.is_metric() {
            let name = order.kind.aggregation_name(&order.field);
            node["terms"]["order"] = json!({ (name.clone()): direction(order.ascending) });
            node["aggs"] = json!({ name: order.kind.build(&order.field, None) });
        } else {
            node["terms"]["order"] =
                json!({ (order.field.clone()): direction(order.ascending) });
        }
    }
    node
}

pub fn group_by(
    query: &GroupByQuery,
    config: &ElasticsearchAnalyticsConfig,
) -> AppResult<CompiledQuery<GroupByContext>> {
    query.time_range.validate()?;
    if query.field.trim().is_empty() {
        return Err(AppError::invalid_query("group by field is required"));
    }

    let (name, node) = if query.groups.is_empty() {
        (
            format!("by_{}", query.field),
            terms_node(&query.field, config.group_by_size, query.order.as_ref()),
        )
    } else {
        let ranges: Vec<Value> = query
            .groups
            .iter()
            .map(|group| json!({ "from": group.from, "to": group.to }))
            .collect();
        (
            format!("by_{}_range", query.field),
            json!({ "range": { "field": query.field, "ranges": ranges } }),
        )
    };

    let document = SearchDocument::new()
        .filter_opt(query.search_term_id.as_ref().map(filter::search_term))
        .filter(range_filter(&query.time_range, RangeForm::Bounds))
        .filters(filter::dimensions(&query.terms))
        .filter_opt(filter::query_string(query.query.as_deref()))
        .aggregation(name.clone(), node)
        .build();

    Ok(CompiledQuery::new(
        document,
        GroupByContext {
            name,
            field: query.field.clone(),
        },
    ))
}
