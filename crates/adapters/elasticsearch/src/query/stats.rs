//! 单字段统计查询

use apim_errors::AppResult;
use apim_ports::StatsQuery;
use serde_json::json;

use super::CompiledQuery;
use crate::dsl::{RangeForm, SearchDocument, filter, range_filter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsContext {
    pub name: String,
    pub field: String,
    /// 时间窗口长度，整秒（截断）
    pub window_seconds: i64,
}

pub fn stats(query: &StatsQuery) -> AppResult<CompiledQuery<StatsContext>> {
    query.time_range.validate()?;

    let name = format!("stats_{}", query.field);
    let document = SearchDocument::new()
        .filter_opt(query.search_term_id.as_ref().map(filter::search_term))
        .filter(range_filter(&query.time_range, RangeForm::Bounds))
        .filters(filter::dimensions(&query.terms))
        .filter_opt(filter::query_string(query.query.as_deref()))
        .aggregation(name.clone(), json!({ "stats": { "field": query.field } }))
        .build();

    Ok(CompiledQuery::new(
        document,
        StatsContext {
            name,
            field: query.field.clone(),
            window_seconds: query.time_range.duration_millis() / 1000,
        },
    ))
}
