//! 响应归约
//!
//! 把嵌套的聚合响应展开为扁平的聚合结果。超时、聚合缺失或不完整时返回
//! 空结果，不会报错。

pub mod average;
pub mod count;
pub mod detail;
pub mod engine;
pub mod event_metrics;
pub mod group_by;
pub mod histogram;
pub mod node;
pub mod response_time;
pub mod stats;
pub mod status;
pub mod top_hits;

use std::collections::HashMap;

use serde_json::{Map, Value};

/// 时间桶 -> 每个 key 一条等长序列，没有数据的位置补 0
pub(crate) fn zero_filled<F>(date_buckets: &[Value], mut inner: F) -> HashMap<String, Vec<i64>>
where
    F: FnMut(&Value) -> Vec<(String, u64)>,
{
    let mut series: HashMap<String, Vec<i64>> = HashMap::new();
    for (index, bucket) in date_buckets.iter().enumerate() {
        for (key, count) in inner(bucket) {
            series
                .entry(key)
                .or_insert_with(|| vec![0; date_buckets.len()])[index] = count as i64;
        }
    }
    series
}

/// 桶作为聚合容器，非对象时视为空
pub(crate) fn as_container(bucket: &Value) -> &Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    bucket
        .as_object()
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}
