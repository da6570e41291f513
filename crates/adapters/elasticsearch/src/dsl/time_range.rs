//! 时间范围过滤与 date_histogram 片段
//!
//! 所有直方图 / 趋势类查询共用，保证桶边界对齐、序列等长。

use apim_ports::TimeRange;
use serde_json::{Map, Value, json};

use crate::fields;

/// 闭区间范围过滤的两种编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeForm {
    /// `gte` / `lte`
    Bounds,
    /// `from` / `to` / `include_lower` / `include_upper`
    Legacy,
}

/// `@timestamp` 闭区间过滤
pub fn range_filter(range: &TimeRange, form: RangeForm) -> Value {
    let bounds = match form {
        RangeForm::Bounds => json!({
            "gte": range.from,
            "lte": range.to,
        }),
        RangeForm::Legacy => json!({
            "from": range.from,
            "to": range.to,
            "include_lower": true,
            "include_upper": true,
        }),
    };
    json!({ "range": { (fields::TIMESTAMP): bounds } })
}

/// `@timestamp` 上的 date_histogram，空桶也返回，边界等于查询范围
pub fn date_histogram(range: &TimeRange, interval_millis: i64, aggs: Map<String, Value>) -> Value {
    let mut node = json!({
        "date_histogram": {
            "field": fields::TIMESTAMP,
            "fixed_interval": format!("{}ms", interval_millis),
            "min_doc_count": 0,
            "extended_bounds": {
                "min": range.from,
                "max": range.to,
            },
        }
    });
    if !aggs.is_empty() {
        node["aggs"] = Value::Object(aggs);
    }
    node
}
