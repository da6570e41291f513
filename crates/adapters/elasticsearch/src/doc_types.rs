//! 指标字段 -> doc-type 映射
//!
//! VALUE / DELTA 事件指标按 doc-type 过滤文档，映射表在构造时注入，之后只读。

use std::collections::HashMap;

const API_DOC_TYPE: &str = "api";
const TOPIC_DOC_TYPE: &str = "topic";

const API_FIELDS: &[&str] = &[
    "downstream-active-connections",
    "upstream-active-connections",
    "downstream-authenticated-connections",
    "upstream-authenticated-connections",
    "downstream-authentication-failures-total",
    "upstream-authentication-failures-total",
    "downstream-authentication-successes-total",
    "upstream-authentication-successes-total",
    "downstream-authentication-failures-count-increment",
    "upstream-authentication-failures-count-increment",
    "downstream-authentication-successes-count-increment",
    "upstream-authentication-successes-count-increment",
];

const TOPIC_FIELDS: &[&str] = &[
    "downstream-publish-messages-total",
    "upstream-publish-messages-total",
    "downstream-publish-message-bytes",
    "upstream-publish-message-bytes",
    "downstream-subscribe-messages-total",
    "upstream-subscribe-messages-total",
    "downstream-subscribe-message-bytes",
    "upstream-subscribe-message-bytes",
    "downstream-publish-messages-count-increment",
    "upstream-publish-messages-count-increment",
    "downstream-publish-message-bytes-increment",
    "upstream-publish-message-bytes-increment",
    "downstream-subscribe-messages-count-increment",
    "upstream-subscribe-messages-count-increment",
    "downstream-subscribe-message-bytes-increment",
    "upstream-subscribe-message-bytes-increment",
];

/// 指标字段 -> doc-type 映射表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDocTypes {
    entries: HashMap<String, String>,
}

impl Default for MetricDocTypes {
    fn default() -> Self {
        let entries = API_FIELDS
            .iter()
            .map(|field| (field.to_string(), API_DOC_TYPE.to_string()))
            .chain(
                TOPIC_FIELDS
                    .iter()
                    .map(|field| (field.to_string(), TOPIC_DOC_TYPE.to_string())),
            )
            .collect();
        Self { entries }
    }
}

impl MetricDocTypes {
    /// 空映射表
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 添加或覆盖一个映射
    pub fn with_entry(mut self, field: impl Into<String>, doc_type: impl Into<String>) -> Self {
        self.entries.insert(field.into(), doc_type.into());
        self
    }

    /// 批量添加或覆盖
    pub fn with_entries<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.entries
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// 查询字段对应的 doc-type
    pub fn doc_type(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
