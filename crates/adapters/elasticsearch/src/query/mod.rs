//! 查询编译
//!
//! 每个分析形态一个纯函数：查询条件 -> 查询文档。需要在归约阶段使用的
//! 名称 / 字段映射随 [`CompiledQuery`] 一起返回，不保存在任何共享状态里。

pub mod average;
pub mod count;
pub mod detail;
pub mod engine;
pub mod event_metrics;
pub mod group_by;
pub mod histogram;
pub mod response_time;
pub mod stats;
pub mod status;
pub mod top_hits;

use apim_errors::{AppError, AppResult};
use apim_ports::TimeRange;
use serde_json::Value;

/// 按时间分桶的聚合名
pub const BY_DATE: &str = "by_date";

/// 编译结果：查询文档 + 归约所需的上下文
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery<C = ()> {
    pub query: Value,
    pub context: C,
}

impl<C> CompiledQuery<C> {
    pub fn new(query: Value, context: C) -> Self {
        Self { query, context }
    }
}

impl CompiledQuery<()> {
    pub fn from_query(query: Value) -> Self {
        Self::new(query, ())
    }
}

fn validate_optional(time_range: Option<&TimeRange>) -> AppResult<()> {
    match time_range {
        Some(range) => range.validate(),
        None => Ok(()),
    }
}

/// 需要时间范围与分桶间隔的形态
fn required_interval(time_range: Option<&TimeRange>) -> AppResult<(TimeRange, i64)> {
    let range = time_range.ok_or_else(|| AppError::invalid_query("time range is required"))?;
    range.validate()?;
    let interval = range.required_interval_millis()?;
    Ok((*range, interval))
}
