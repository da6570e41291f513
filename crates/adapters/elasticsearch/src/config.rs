//! Elasticsearch 分析适配器配置
//!
//! 索引前缀、entrypoint 字段映射、分组桶上限以及 doc-type 映射表

use apim_config::AnalyticsConfig;

use crate::doc_types::MetricDocTypes;
use crate::fields;

/// 分析适配器配置
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticsearchAnalyticsConfig {
    /// 索引前缀
    pub index_prefix: String,
    /// entrypoint 字段是否使用 `.keyword` 映射
    pub entrypoint_keyword: bool,
    /// 分组聚合的桶数量上限
    pub group_by_size: u32,
    /// 指标字段 -> doc-type 映射
    pub doc_types: MetricDocTypes,
}

impl Default for ElasticsearchAnalyticsConfig {
    fn default() -> Self {
        Self {
            index_prefix: "gravitee".to_string(),
            entrypoint_keyword: false,
            group_by_size: 1000,
            doc_types: MetricDocTypes::default(),
        }
    }
}

impl ElasticsearchAnalyticsConfig {
    /// 创建新的配置
    pub fn new(index_prefix: impl Into<String>) -> Self {
        Self {
            index_prefix: index_prefix.into(),
            ..Default::default()
        }
    }

    /// 从应用配置构建，配置中的映射追加到内置表之上
    pub fn from_analytics_config(config: &AnalyticsConfig) -> Self {
        Self {
            index_prefix: config.index_prefix.clone(),
            entrypoint_keyword: config.entrypoint_keyword,
            group_by_size: config.group_by_size,
            doc_types: MetricDocTypes::default().with_entries(
                config
                    .metric_doc_types
                    .iter()
                    .map(|(field, doc_type)| (field.clone(), doc_type.clone())),
            ),
        }
    }

    /// 设置 entrypoint 字段映射
    pub fn with_entrypoint_keyword(mut self, keyword: bool) -> Self {
        self.entrypoint_keyword = keyword;
        self
    }

    /// 设置分组桶上限
    pub fn with_group_by_size(mut self, size: u32) -> Self {
        self.group_by_size = size;
        self
    }

    /// 设置 doc-type 映射表
    pub fn with_doc_types(mut self, doc_types: MetricDocTypes) -> Self {
        self.doc_types = doc_types;
        self
    }

    /// entrypoint 字段名
    pub fn entrypoint_field(&self) -> &'static str {
        if self.entrypoint_keyword {
            fields::ENTRYPOINT_ID_KEYWORD
        } else {
            fields::ENTRYPOINT_ID
        }
    }

    /// V4 请求指标索引
    pub fn v4_metrics_index(&self) -> String {
        self.index_name(fields::V4_METRICS_INDEX)
    }

    /// V2 请求索引
    pub fn request_index(&self) -> String {
        self.index_name(fields::REQUEST_INDEX)
    }

    /// 事件指标索引
    pub fn event_metrics_index(&self) -> String {
        self.index_name(fields::EVENT_METRICS_INDEX)
    }

    /// 请求类查询的目标索引，包含 V2 时追加请求索引
    pub fn request_indices(&self, include_v2: bool) -> Vec<String> {
        let mut indices = vec![self.v4_metrics_index()];
        if include_v2 {
            indices.push(self.request_index());
        }
        indices
    }

    fn index_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.index_prefix, suffix)
    }
}
