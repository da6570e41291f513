//! 搜索引擎客户端 trait 与响应文档模型

use apim_errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::QueryContext;

/// 命中总数，兼容数字与 `{value, relation}` 两种编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Object {
        value: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relation: Option<TotalRelation>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
    Eq,
    Gte,
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(value) | Self::Object { value, .. } => *value,
        }
    }
}

impl Default for TotalHits {
    fn default() -> Self {
        Self::Count(0)
    }
}

/// 单条命中
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// 搜索响应文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: SearchHits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Map<String, Value>>,
}

impl SearchResponse {
    /// 可用的聚合结果；超时或聚合为空时返回 None
    pub fn usable_aggregations(&self) -> Option<&Map<String, Value>> {
        if self.timed_out {
            return None;
        }
        self.aggregations.as_ref().filter(|aggs| !aggs.is_empty())
    }

    /// 命中总数；超时返回 None
    pub fn total_hits(&self) -> Option<u64> {
        (!self.timed_out).then(|| self.hits.total.value())
    }
}

/// 搜索引擎客户端 trait
///
/// 负责把查询文档发送到指定索引并返回反序列化后的响应，
/// 超时、重试、取消由实现方决定。
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(
        &self,
        context: &QueryContext,
        indices: &[String],
        query: &Value,
    ) -> AppResult<SearchResponse>;
}
