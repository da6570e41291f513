//! apim-ports - 抽象 trait 层
//!
//! 分析查询条件、聚合结果，以及仓储与搜索客户端的抽象接口

mod analytics_aggregate;
mod analytics_engine;
mod analytics_query;
mod analytics_repository;
mod search_client;

pub use analytics_aggregate::*;
pub use analytics_engine::*;
pub use analytics_query::*;
pub use analytics_repository::*;
pub use search_client::*;
