//! adapter-elasticsearch - Elasticsearch 分析适配器
//!
//! 把分析查询翻译为搜索引擎的查询文档，并把聚合响应归约为扁平结果，包括：
//! - 请求计数、平均值、状态码分布、响应时间
//! - Top N API / 应用 / 失败 API
//! - 直方图、分组、单字段统计
//! - 事件指标（VALUE / DELTA / TREND / TREND_RATE）
//! - HTTP 指标引擎：整体度量、分面、时间序列
//! - 分析 Repository 实现

pub mod aggregation_kind;
mod config;
mod doc_types;
pub mod dsl;
pub mod fields;
pub mod query;
mod repository;
pub mod response;

pub use aggregation_kind::{AggregationKindExt, KindValue};
pub use config::*;
pub use doc_types::*;
pub use query::CompiledQuery;
pub use repository::*;
