//! 分析 Repository trait 定义
//!
//! 每个分析形态一个方法：编译查询、执行搜索、归约为聚合结果

use apim_errors::AppResult;
use async_trait::async_trait;

use crate::{
    ApiAnalyticsQuery, ApiAverageQuery, ApiMetricsDetail, ApiMetricsDetailQuery,
    AverageAggregate, CountAggregate, EventAnalyticsAggregate, FacetsQuery, FacetsResponse,
    GroupByAggregate, GroupByQuery, HistogramAggregate, HistogramQuery, MeasuresQuery,
    MeasuresResponse, QueryContext, RequestResponseTimeAggregate, RequestsCountByEventQuery,
    RequestsCountQuery, ResponseStatusOverTimeAggregate, ResponseStatusRangesAggregate,
    StatsAggregate, StatsQuery, TimeSeriesQuery, TimeSeriesResponse, TopFailedAggregate,
    TopHitsAggregate,
};

/// 分析 Repository trait
///
/// 查询条件非法时返回 `AppError::InvalidQuery`，不会发出搜索；
/// 响应缺失或不完整时返回空结果而不是错误。
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// 单个 API 的请求数，按 entrypoint 拆分
    async fn search_requests_count(
        &self,
        context: &QueryContext,
        query: &RequestsCountQuery,
    ) -> AppResult<Option<CountAggregate>>;

    /// 按实体统计请求总数
    async fn search_requests_count_by_event(
        &self,
        context: &QueryContext,
        query: &RequestsCountByEventQuery,
    ) -> AppResult<Option<CountAggregate>>;

    /// 每请求平均消息数
    async fn search_average_messages_per_request(
        &self,
        context: &QueryContext,
        query: &ApiAverageQuery,
    ) -> AppResult<Option<AverageAggregate>>;

    /// 平均连接时长
    async fn search_average_connection_duration(
        &self,
        context: &QueryContext,
        query: &ApiAverageQuery,
    ) -> AppResult<Option<AverageAggregate>>;

    /// 状态码区间分布
    async fn search_response_status_ranges(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<Option<ResponseStatusRangesAggregate>>;

    /// 状态码随时间分布
    async fn search_response_status_over_time(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<ResponseStatusOverTimeAggregate>;

    /// 平均响应时间随时间变化
    async fn search_response_time_over_time(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<Option<AverageAggregate>>;

    /// 请求量与响应时间概览
    async fn search_request_response_time(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<RequestResponseTimeAggregate>;

    /// 请求量最高的 API
    async fn search_top_hits_apis(
        &self,
        context: &QueryContext,
        query: Option<&ApiAnalyticsQuery>,
    ) -> AppResult<Option<TopHitsAggregate>>;

    /// 请求量最高的应用
    async fn search_top_apps(
        &self,
        context: &QueryContext,
        query: Option<&ApiAnalyticsQuery>,
    ) -> AppResult<Option<TopHitsAggregate>>;

    /// 失败请求最多的 API
    async fn search_top_failed_apis(
        &self,
        context: &QueryContext,
        query: Option<&ApiAnalyticsQuery>,
    ) -> AppResult<Option<TopFailedAggregate>>;

    /// 直方图
    async fn search_histogram(
        &self,
        context: &QueryContext,
        query: &HistogramQuery,
    ) -> AppResult<Vec<HistogramAggregate>>;

    /// 分组
    async fn search_group_by(
        &self,
        context: &QueryContext,
        query: &GroupByQuery,
    ) -> AppResult<Option<GroupByAggregate<u64>>>;

    /// 单字段统计
    async fn search_stats(
        &self,
        context: &QueryContext,
        query: &StatsQuery,
    ) -> AppResult<Option<StatsAggregate>>;

    /// 事件指标（VALUE / DELTA / TREND / TREND_RATE）
    async fn search_event_analytics(
        &self,
        context: &QueryContext,
        query: &HistogramQuery,
    ) -> AppResult<Option<EventAnalyticsAggregate>>;

    /// 单条请求指标详情
    async fn find_api_metrics_detail(
        &self,
        context: &QueryContext,
        query: &ApiMetricsDetailQuery,
    ) -> AppResult<Option<ApiMetricsDetail>>;

    /// HTTP 指标整体度量
    async fn search_http_measures(
        &self,
        context: &QueryContext,
        query: &MeasuresQuery,
    ) -> AppResult<Option<MeasuresResponse>>;

    /// HTTP 指标按维度分面
    async fn search_http_facets(
        &self,
        context: &QueryContext,
        query: &FacetsQuery,
    ) -> AppResult<Option<FacetsResponse>>;

    /// HTTP 指标按时间分桶
    async fn search_http_time_series(
        &self,
        context: &QueryContext,
        query: &TimeSeriesQuery,
    ) -> AppResult<Option<TimeSeriesResponse>>;
}
