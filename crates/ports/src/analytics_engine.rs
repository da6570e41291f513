//! HTTP 指标引擎：查询条件与结果
//!
//! 一次查询请求多个指标，每个指标请求一组度量（COUNT / AVG / RPS ...）。
//! 三种形态：整体度量、按维度分面、按时间分桶。

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use apim_errors::{AppError, AppResult};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{SearchTerm, TimeRange};

/// HTTP 指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    #[display("http_requests")]
    HttpRequests,
    /// 状态码 >= 400 的请求
    #[display("http_errors")]
    HttpErrors,
    #[display("http_gateway_response_time")]
    HttpGatewayResponseTime,
}

impl Metric {
    /// 是否有可求 avg / min / max 的数值
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::HttpGatewayResponseTime)
    }
}

/// 度量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Measure {
    #[display("count")]
    Count,
    #[display("avg")]
    Avg,
    #[display("min")]
    Min,
    #[display("max")]
    Max,
    /// 每秒请求数
    #[display("rps")]
    Rps,
    /// 占所在范围请求总数的百分比
    #[display("percentage")]
    Percentage,
}

impl Measure {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Avg | Self::Min | Self::Max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Eq,
    In,
}

/// 身份过滤：`EQ` 恰好一个值，`IN` 任意个值（空列表不匹配任何请求）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: SearchTerm,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(
        name: SearchTerm,
        operator: FilterOperator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name,
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.operator == FilterOperator::Eq && self.values.len() != 1 {
            return Err(AppError::invalid_query(format!(
                "EQ filter on {:?} requires exactly one value",
                self.name
            )));
        }
        Ok(())
    }
}

/// 一个指标及其度量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricMeasuresQuery {
    pub metric: Metric,
    pub measures: BTreeSet<Measure>,
}

impl MetricMeasuresQuery {
    pub fn new(metric: Metric, measures: impl IntoIterator<Item = Measure>) -> Self {
        Self {
            metric,
            measures: measures.into_iter().collect(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.measures.is_empty() {
            return Err(AppError::invalid_query(format!(
                "no measure requested for {}",
                self.metric
            )));
        }
        if let Some(measure) = self
            .measures
            .iter()
            .find(|m| m.is_numeric() && !self.metric.is_numeric())
        {
            return Err(AppError::invalid_query(format!(
                "{} is not supported by {}",
                measure, self.metric
            )));
        }
        Ok(())
    }
}

/// 至少一个指标，且每个指标合法
pub fn validate_metrics(metrics: &[MetricMeasuresQuery]) -> AppResult<()> {
    if metrics.is_empty() {
        return Err(AppError::invalid_query("at least one metric required"));
    }
    metrics.iter().try_for_each(MetricMeasuresQuery::validate)
}

/// 分面维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Facet {
    #[display("api")]
    Api,
    #[display("application")]
    Application,
    #[display("plan")]
    Plan,
    #[display("http_status")]
    HttpStatus,
}

/// 闭区间 `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberRange {
    pub from: i64,
    pub to: i64,
}

impl NumberRange {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// 桶 key，形如 `100-199`
    pub fn key(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }
}

/// 整体度量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuresQuery {
    pub time_range: TimeRange,
    pub filters: Vec<Filter>,
    pub metrics: Vec<MetricMeasuresQuery>,
}

impl MeasuresQuery {
    pub fn new(
        time_range: TimeRange,
        filters: Vec<Filter>,
        metrics: Vec<MetricMeasuresQuery>,
    ) -> Self {
        Self {
            time_range,
            filters,
            metrics,
        }
    }
}

/// 按维度分面，多个维度逐层嵌套（第一个在最外层）
///
/// `ranges` 只作用于 `HTTP_STATUS`，为空时按状态码取值分桶。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetsQuery {
    pub time_range: TimeRange,
    pub filters: Vec<Filter>,
    pub metrics: Vec<MetricMeasuresQuery>,
    pub facets: Vec<Facet>,
    pub ranges: Vec<NumberRange>,
}

impl FacetsQuery {
    pub fn new(
        time_range: TimeRange,
        filters: Vec<Filter>,
        metrics: Vec<MetricMeasuresQuery>,
        facets: Vec<Facet>,
    ) -> Self {
        Self {
            time_range,
            filters,
            metrics,
            facets,
            ranges: Vec::new(),
        }
    }

    pub fn with_ranges(mut self, ranges: Vec<NumberRange>) -> Self {
        self.ranges = ranges;
        self
    }
}

/// 按固定间隔分桶
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesQuery {
    pub time_range: TimeRange,
    pub filters: Vec<Filter>,
    pub interval: Duration,
    pub metrics: Vec<MetricMeasuresQuery>,
}

impl TimeSeriesQuery {
    pub fn new(
        time_range: TimeRange,
        filters: Vec<Filter>,
        interval: Duration,
        metrics: Vec<MetricMeasuresQuery>,
    ) -> Self {
        Self {
            time_range,
            filters,
            interval,
            metrics,
        }
    }
}

/// 度量 -> 值，未能计算的度量（如无数据的 AVG）不出现
pub type MeasureValues = BTreeMap<Measure, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMeasures {
    pub metric: Metric,
    pub measures: MeasureValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasuresResponse {
    pub measures: Vec<MetricMeasures>,
}

/// 分面桶；还有下一层维度时 `buckets` 为其子桶
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub key: String,
    pub measures: MeasureValues,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buckets: Vec<FacetBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFacets {
    pub metric: Metric,
    pub buckets: Vec<FacetBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetsResponse {
    pub metrics: Vec<MetricFacets>,
}

/// 时间桶，key 为 RFC 3339 起始时间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesBucket {
    pub key: String,
    pub timestamp: i64,
    pub measures: MeasureValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTimeSeries {
    pub metric: Metric,
    pub buckets: Vec<TimeSeriesBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesResponse {
    pub metrics: Vec<MetricTimeSeries>,
}
