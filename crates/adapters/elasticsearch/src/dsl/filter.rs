//! 过滤子句
//!
//! 身份过滤、维度过滤、全文过滤，以及 `{size, query, aggs}` 查询文档

use std::collections::BTreeMap;

use apim_ports::{SearchTermId, Term};
use serde_json::{Map, Value, json};

use crate::fields;

pub fn term(field: &str, value: impl Into<Value>) -> Value {
    json!({ "term": { field: value.into() } })
}

pub fn terms(field: &str, values: &[String]) -> Value {
    json!({ "terms": { field: values } })
}

pub fn exists(field: &str) -> Value {
    json!({ "exists": { "field": field } })
}

/// OR
pub fn should(clauses: Vec<Value>) -> Value {
    json!({ "bool": { "should": clauses } })
}

/// AND
pub fn all_of(clauses: Vec<Value>) -> Value {
    json!({ "bool": { "filter": clauses } })
}

/// 单实体身份过滤
pub fn search_term(search_term_id: &SearchTermId) -> Value {
    term(search_term_id.search_term.field(), search_term_id.id.as_str())
}

/// 不匹配任何文档的身份过滤
pub fn no_api() -> Value {
    terms(fields::API_ID, &[])
}

/// 多 API 身份过滤；`legacy_field` 为真时同时匹配 V2 的 `api` 字段。
/// 空列表不匹配任何文档。
pub fn api_ids(api_ids: &[String], legacy_field: bool) -> Value {
    if api_ids.is_empty() {
        return no_api();
    }
    if legacy_field {
        should(vec![
            terms(fields::API_ID, api_ids),
            terms(fields::API, api_ids),
        ])
    } else {
        terms(fields::API_ID, api_ids)
    }
}

/// 维度过滤：按 key 分组，同一 key 的多个值为 OR，不同 key 之间为 AND
pub fn dimensions(dimension_terms: &[Term]) -> Vec<Value> {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for t in dimension_terms {
        grouped.entry(t.key.as_str()).or_default().push(t.value.as_str());
    }
    grouped
        .into_iter()
        .map(|(key, values)| should(values.into_iter().map(|v| term(key, v)).collect()))
        .collect()
}

/// 全文过滤，去除首尾空白后为空则不生成
pub fn query_string(query: Option<&str>) -> Option<Value> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| json!({ "query_string": { "query": q } }))
}

/// 查询文档构建器
#[derive(Debug, Clone, Default)]
pub struct SearchDocument {
    size: u64,
    track_total_hits: bool,
    filters: Vec<Value>,
    aggs: Map<String, Value>,
}

impl SearchDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_total_hits(mut self) -> Self {
        self.track_total_hits = true;
        self
    }

    pub fn filter(mut self, clause: Value) -> Self {
        self.filters.push(clause);
        self
    }

    pub fn filter_opt(mut self, clause: Option<Value>) -> Self {
        self.filters.extend(clause);
        self
    }

    pub fn filters(mut self, clauses: impl IntoIterator<Item = Value>) -> Self {
        self.filters.extend(clauses);
        self
    }

    pub fn aggregation(mut self, name: impl Into<String>, node: Value) -> Self {
        self.aggs.insert(name.into(), node);
        self
    }

    pub fn aggregations(mut self, aggs: Map<String, Value>) -> Self {
        self.aggs.extend(aggs);
        self
    }

    pub fn build(self) -> Value {
        let mut document = json!({
            "size": self.size,
            "query": all_of(self.filters),
        });
        if self.track_total_hits {
            document["track_total_hits"] = Value::Bool(true);
        }
        if !self.aggs.is_empty() {
            document["aggs"] = Value::Object(self.aggs);
        }
        document
    }
}
