//! 单字段统计归约

use apim_ports::{SearchResponse, StatsAggregate};
use serde_json::Value;

use crate::query::stats::StatsContext;

/// count 为 0 时为空；每秒请求数按截断后的整秒窗口计算，窗口为 0 时为 0
pub fn stats(context: &StatsContext, response: &SearchResponse) -> Option<StatsAggregate> {
    let stats = response.usable_aggregations()?.get(&context.name)?;
    let number = |name: &str| stats.get(name).and_then(Value::as_f64).unwrap_or(0.0);

    let count = stats.get("count").and_then(Value::as_u64).unwrap_or(0);
    if count == 0 {
        return None;
    }

    let requests_per_second = if context.window_seconds > 0 {
        count as f64 / context.window_seconds as f64
    } else {
        0.0
    };

    Some(StatsAggregate {
        field: context.field.clone(),
        count,
        sum: number("sum"),
        avg: number("avg"),
        min: number("min"),
        max: number("max"),
        requests_per_second,
        requests_per_minute: requests_per_second * 60.0,
        requests_per_hour: requests_per_second * 3600.0,
    })
}
