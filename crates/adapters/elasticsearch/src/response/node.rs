//! 聚合响应节点读取
//!
//! 节点缺失或类型不符时返回空值，不会报错。

use chrono::{DateTime, SecondsFormat};
use serde_json::Value;

/// 桶列表
pub fn buckets(node: &Value) -> &[Value] {
    node.get("buckets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// 桶 key，数字 key 转为字符串
pub fn bucket_key(bucket: &Value) -> Option<String> {
    match bucket.get("key")? {
        Value::String(key) => Some(key.clone()),
        Value::Number(key) => Some(key.to_string()),
        _ => None,
    }
}

/// 桶 key 作为 epoch 毫秒
pub fn bucket_key_millis(bucket: &Value) -> Option<i64> {
    let key = bucket.get("key")?;
    key.as_i64().or_else(|| key.as_f64().map(|k| k as i64))
}

/// 时间桶 key 格式化为 RFC 3339（毫秒精度，UTC）
pub fn bucket_time(bucket: &Value) -> Option<String> {
    let millis = bucket_key_millis(bucket)?;
    DateTime::from_timestamp_millis(millis)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn doc_count(bucket: &Value) -> u64 {
    bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0)
}

/// 单值指标 `value`，null 或缺失返回 None
pub fn metric_value(node: Option<&Value>) -> Option<f64> {
    node?.get("value")?.as_f64()
}

/// `top_hits` 第一条命中的 `_source`
pub fn first_hit_source(node: Option<&Value>) -> Option<&Value> {
    node?
        .get("hits")?
        .get("hits")?
        .as_array()?
        .first()?
        .get("_source")
}

/// 时间戳字段，兼容 epoch 毫秒与 RFC 3339 字符串
pub fn timestamp_millis(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        _ => None,
    }
}
