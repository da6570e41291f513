//! 分析查询条件模型
//!
//! 描述一次分析请求的不可变值对象：时间范围、聚合函数、维度过滤、身份过滤

use std::collections::BTreeSet;
use std::time::Duration;

use apim_errors::{AppError, AppResult};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// 时间范围（epoch 毫秒，闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
    /// 分桶间隔，仅直方图 / 趋势类查询需要
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,
}

impl TimeRange {
    /// 创建新的时间范围
    pub fn new(from: i64, to: i64) -> Self {
        Self {
            from,
            to,
            interval: None,
        }
    }

    /// 设置分桶间隔
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// 校验 `from <= to`
    pub fn validate(&self) -> AppResult<()> {
        if self.from > self.to {
            return Err(AppError::invalid_query(format!(
                "time range start {} is after end {}",
                self.from, self.to
            )));
        }
        Ok(())
    }

    /// 窗口长度（毫秒），溢出时取 `i64::MAX`
    pub fn duration_millis(&self) -> i64 {
        self.to.saturating_sub(self.from)
    }

    /// 分桶间隔（毫秒），缺失或为零时报错
    pub fn required_interval_millis(&self) -> AppResult<i64> {
        match self.interval.map(|i| i.as_millis() as i64) {
            Some(millis) if millis > 0 => Ok(millis),
            _ => Err(AppError::invalid_query("interval is required")),
        }
    }
}

/// 聚合函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationKind {
    /// 按字段取值分桶
    #[display("field")]
    Field,
    #[display("avg")]
    Avg,
    #[display("min")]
    Min,
    #[display("max")]
    Max,
    #[display("sum")]
    Sum,
    /// 最近一次记录的值
    #[display("value")]
    Value,
    /// 区间首尾差值
    #[display("delta")]
    Delta,
    /// 按时间分桶求和
    #[display("trend")]
    Trend,
    /// 按时间分桶求和并折算为每秒速率
    #[display("trend_rate")]
    TrendRate,
}

impl AggregationKind {
    /// 单值指标聚合（avg / min / max / sum）
    pub fn is_metric(&self) -> bool {
        matches!(self, Self::Avg | Self::Min | Self::Max | Self::Sum)
    }
}

/// 一个 (字段, 聚合函数) 对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: AggregationKind,
}

impl Aggregation {
    pub fn new(field: impl Into<String>, kind: AggregationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// 要求所有聚合使用同一个函数，返回该函数
pub fn single_aggregation_kind(aggregations: &[Aggregation]) -> AppResult<AggregationKind> {
    let kinds: BTreeSet<AggregationKind> = aggregations.iter().map(|a| a.kind).collect();
    let mut iter = kinds.into_iter();
    match (iter.next(), iter.next()) {
        (None, _) => Err(AppError::invalid_query(
            "at least one aggregate function required",
        )),
        (Some(kind), None) => Ok(kind),
        (Some(_), Some(_)) => Err(AppError::invalid_query(
            "exactly one aggregate function required",
        )),
    }
}

/// 维度过滤条件，同一 key 的多个值之间为 OR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub key: String,
    pub value: String,
}

impl Term {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// 身份过滤的实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchTerm {
    Api,
    Application,
    Plan,
}

impl SearchTerm {
    /// 对应的文档字段
    pub fn field(&self) -> &'static str {
        match self {
            Self::Api => "api-id",
            Self::Application => "application-id",
            Self::Plan => "plan-id",
        }
    }
}

/// 身份过滤：实体类型 + id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTermId {
    pub search_term: SearchTerm,
    pub id: String,
}

impl SearchTermId {
    pub fn new(search_term: SearchTerm, id: impl Into<String>) -> Self {
        Self {
            search_term,
            id: id.into(),
        }
    }

    pub fn api(id: impl Into<String>) -> Self {
        Self::new(SearchTerm::Api, id)
    }
}

/// API 定义版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DefinitionVersion {
    V2,
    V4,
}

/// 调用上下文，原样传给搜索客户端
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub organization_id: String,
    pub environment_id: String,
}

impl QueryContext {
    pub fn new(organization_id: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            environment_id: environment_id.into(),
        }
    }
}

/// 单个 API 的请求数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestsCountQuery {
    pub api_id: String,
    pub time_range: Option<TimeRange>,
}

impl RequestsCountQuery {
    pub fn new(api_id: impl Into<String>) -> Self {
        Self {
            api_id: api_id.into(),
            time_range: None,
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }
}

/// 按实体统计请求数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestsCountByEventQuery {
    pub search_term_id: SearchTermId,
    pub time_range: TimeRange,
    pub query: Option<String>,
}

impl RequestsCountByEventQuery {
    pub fn new(search_term_id: SearchTermId, time_range: TimeRange) -> Self {
        Self {
            search_term_id,
            time_range,
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// 单个 API 的平均值类查询（每请求消息数 / 连接时长）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAverageQuery {
    pub api_id: String,
    pub time_range: Option<TimeRange>,
}

impl ApiAverageQuery {
    pub fn new(api_id: impl Into<String>) -> Self {
        Self {
            api_id: api_id.into(),
            time_range: None,
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }
}

/// 多个 API 的查询条件（状态码分布、Top N、响应时间等）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiAnalyticsQuery {
    pub api_ids: Vec<String>,
    pub time_range: Option<TimeRange>,
    pub definition_versions: BTreeSet<DefinitionVersion>,
}

impl ApiAnalyticsQuery {
    pub fn new(api_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            api_ids: api_ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    pub fn with_definition_versions(
        mut self,
        versions: impl IntoIterator<Item = DefinitionVersion>,
    ) -> Self {
        self.definition_versions = versions.into_iter().collect();
        self
    }

    /// 是否需要兼容 V2 的 `api` 字段与请求索引
    pub fn includes_v2(&self) -> bool {
        self.definition_versions.contains(&DefinitionVersion::V2)
    }
}

/// 直方图 / 事件指标查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramQuery {
    pub search_term_id: SearchTermId,
    pub time_range: TimeRange,
    pub aggregations: Vec<Aggregation>,
    pub query: Option<String>,
    pub terms: Vec<Term>,
}

impl HistogramQuery {
    pub fn new(
        search_term_id: SearchTermId,
        time_range: TimeRange,
        aggregations: Vec<Aggregation>,
    ) -> Self {
        Self {
            search_term_id,
            time_range,
            aggregations,
            query: None,
            terms: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_terms(mut self, terms: Vec<Term>) -> Self {
        self.terms = terms;
        self
    }
}

/// 数值分组区间 `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupRange {
    pub from: f64,
    pub to: f64,
}

impl GroupRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// 桶 key，例如 `"100.0-200.0"`
    pub fn key(&self) -> String {
        format!("{:?}-{:?}", self.from, self.to)
    }
}

/// 分组排序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupByOrder {
    /// 排序字段，`_key` / `_count` 或某个指标字段
    pub field: String,
    pub ascending: bool,
    #[serde(rename = "type")]
    pub kind: AggregationKind,
}

impl GroupByOrder {
    pub fn new(field: impl Into<String>, ascending: bool, kind: AggregationKind) -> Self {
        Self {
            field: field.into(),
            ascending,
            kind,
        }
    }
}

/// 分组查询
#[derive(Debug, Clone, PartialEq)]
pub struct GroupByQuery {
    pub search_term_id: Option<SearchTermId>,
    pub field: String,
    pub groups: Vec<GroupRange>,
    pub order: Option<GroupByOrder>,
    pub time_range: TimeRange,
    pub query: Option<String>,
    pub terms: Vec<Term>,
}

impl GroupByQuery {
    pub fn new(field: impl Into<String>, time_range: TimeRange) -> Self {
        Self {
            search_term_id: None,
            field: field.into(),
            groups: Vec::new(),
            order: None,
            time_range,
            query: None,
            terms: Vec::new(),
        }
    }

    pub fn with_search_term_id(mut self, search_term_id: SearchTermId) -> Self {
        self.search_term_id = Some(search_term_id);
        self
    }

    pub fn with_groups(mut self, groups: Vec<GroupRange>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_order(mut self, order: GroupByOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_terms(mut self, terms: Vec<Term>) -> Self {
        self.terms = terms;
        self
    }
}

/// 单字段统计查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    pub field: String,
    pub search_term_id: Option<SearchTermId>,
    pub time_range: TimeRange,
    pub query: Option<String>,
    pub terms: Vec<Term>,
}

impl StatsQuery {
    pub fn new(field: impl Into<String>, time_range: TimeRange) -> Self {
        Self {
            field: field.into(),
            search_term_id: None,
            time_range,
            query: None,
            terms: Vec::new(),
        }
    }

    pub fn with_search_term_id(mut self, search_term_id: SearchTermId) -> Self {
        self.search_term_id = Some(search_term_id);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_terms(mut self, terms: Vec<Term>) -> Self {
        self.terms = terms;
        self
    }
}

/// 单条请求指标详情
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiMetricsDetailQuery {
    pub api_id: String,
    pub request_id: String,
}

impl ApiMetricsDetailQuery {
    pub fn new(api_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            api_id: api_id.into(),
            request_id: request_id.into(),
        }
    }
}
