//! Elasticsearch Repository 实现
//!
//! 实现分析 Repository trait：编译查询文档、选择目标索引、调用搜索客户端、
//! 归约响应。每次调用的上下文只在本次调用内流转。

use std::sync::Arc;
use std::time::Instant;

use apim_config::AppConfig;
use apim_errors::AppResult;
use apim_ports::{
    AnalyticsRepository, ApiAnalyticsQuery, ApiAverageQuery, ApiMetricsDetail,
    ApiMetricsDetailQuery, AverageAggregate, CountAggregate, EventAnalyticsAggregate,
    FacetsQuery, FacetsResponse, GroupByAggregate, GroupByQuery, HistogramAggregate,
    HistogramQuery, MeasuresQuery, MeasuresResponse, QueryContext, RequestResponseTimeAggregate,
    RequestsCountByEventQuery, RequestsCountQuery, ResponseStatusOverTimeAggregate,
    ResponseStatusRangesAggregate, SearchClient, SearchResponse, StatsAggregate, StatsQuery,
    TimeSeriesQuery, TimeSeriesResponse, TopFailedAggregate, TopHitsAggregate,
};
use apim_telemetry::{QueryOutcome, record_empty_result, record_query};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ElasticsearchAnalyticsConfig;
use crate::query::{self, CompiledQuery};
use crate::response;

/// 归约结果是否为空，用于空结果计数
trait Reduced {
    fn is_empty_result(&self) -> bool;
}

impl<T> Reduced for Option<T> {
    fn is_empty_result(&self) -> bool {
        self.is_none()
    }
}

impl<T> Reduced for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl Reduced for ResponseStatusOverTimeAggregate {
    fn is_empty_result(&self) -> bool {
        self.status_count.is_empty()
    }
}

impl Reduced for RequestResponseTimeAggregate {
    fn is_empty_result(&self) -> bool {
        self.requests_total == 0
    }
}

/// 分析 Repository 实现
pub struct ElasticsearchAnalyticsRepository<C: SearchClient> {
    client: Arc<C>,
    config: Arc<ElasticsearchAnalyticsConfig>,
}

impl<C: SearchClient> ElasticsearchAnalyticsRepository<C> {
    /// 使用默认配置创建
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, ElasticsearchAnalyticsConfig::default())
    }

    /// 使用指定配置创建
    pub fn with_config(client: Arc<C>, config: ElasticsearchAnalyticsConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// 从应用配置创建
    pub fn from_app_config(client: Arc<C>, config: &AppConfig) -> Self {
        Self::with_config(
            client,
            ElasticsearchAnalyticsConfig::from_analytics_config(&config.analytics),
        )
    }

    /// 获取配置
    pub fn config(&self) -> &ElasticsearchAnalyticsConfig {
        &self.config
    }

    fn request_indices(&self, query: Option<&ApiAnalyticsQuery>) -> Vec<String> {
        self.config
            .request_indices(query.is_some_and(ApiAnalyticsQuery::includes_v2))
    }

    fn v4_indices(&self) -> Vec<String> {
        vec![self.config.v4_metrics_index()]
    }

    /// 编译失败时不发出搜索
    async fn execute<X, T, F>(
        &self,
        shape: &'static str,
        context: &QueryContext,
        indices: Vec<String>,
        compiled: AppResult<CompiledQuery<X>>,
        reduce: F,
    ) -> AppResult<T>
    where
        X: Send,
        T: Reduced,
        F: FnOnce(&X, &SearchResponse) -> T + Send,
    {
        let started = Instant::now();
        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(e) => {
                record_query(shape, QueryOutcome::InvalidQuery, started.elapsed());
                debug!(shape, error = %e, "Rejected analytics query");
                return Err(e);
            }
        };

        debug!(
            shape,
            organization_id = %context.organization_id,
            environment_id = %context.environment_id,
            indices = ?indices,
            query = %compiled.query,
            "Executing analytics query"
        );

        let response = match self.client.search(context, &indices, &compiled.query).await {
            Ok(response) => response,
            Err(e) => {
                record_query(shape, QueryOutcome::SearchFailed, started.elapsed());
                warn!(shape, error = %e, "Analytics search failed");
                return Err(e);
            }
        };

        if response.timed_out {
            warn!(shape, took = response.took, "Analytics search timed out");
        }

        let result = reduce(&compiled.context, &response);
        record_query(shape, QueryOutcome::Success, started.elapsed());
        if result.is_empty_result() {
            record_empty_result(shape);
        }
        Ok(result)
    }
}

#[async_trait]
impl<C: SearchClient> AnalyticsRepository for ElasticsearchAnalyticsRepository<C> {
    async fn search_requests_count(
        &self,
        context: &QueryContext,
        query: &RequestsCountQuery,
    ) -> AppResult<Option<CountAggregate>> {
        self.execute(
            "requests_count",
            context,
            self.v4_indices(),
            query::count::requests_count(query, &self.config),
            |_, response| response::count::requests_count(response),
        )
        .await
    }

    async fn search_requests_count_by_event(
        &self,
        context: &QueryContext,
        query: &RequestsCountByEventQuery,
    ) -> AppResult<Option<CountAggregate>> {
        self.execute(
            "requests_count_by_event",
            context,
            self.v4_indices(),
            query::count::requests_count_by_event(query),
            |_, response| response::count::requests_count_by_event(response),
        )
        .await
    }

    async fn search_average_messages_per_request(
        &self,
        context: &QueryContext,
        query: &ApiAverageQuery,
    ) -> AppResult<Option<AverageAggregate>> {
        self.execute(
            "average_messages_per_request",
            context,
            self.v4_indices(),
            query::average::average(
                query::average::AverageMetric::MessagesPerRequest,
                query,
                &self.config,
            ),
            response::average::average,
        )
        .await
    }

    async fn search_average_connection_duration(
        &self,
        context: &QueryContext,
        query: &ApiAverageQuery,
    ) -> AppResult<Option<AverageAggregate>> {
        self.execute(
            "average_connection_duration",
            context,
            self.v4_indices(),
            query::average::average(
                query::average::AverageMetric::ConnectionDuration,
                query,
                &self.config,
            ),
            response::average::average,
        )
        .await
    }

    async fn search_response_status_ranges(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<Option<ResponseStatusRangesAggregate>> {
        self.execute(
            "response_status_ranges",
            context,
            self.request_indices(Some(query)),
            query::status::response_status_ranges(query, &self.config),
            |_, response| response::status::response_status_ranges(response),
        )
        .await
    }

    async fn search_response_status_over_time(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<ResponseStatusOverTimeAggregate> {
        self.execute(
            "response_status_over_time",
            context,
            self.request_indices(Some(query)),
            query::status::response_status_over_time(query),
            |_, response| response::status::response_status_over_time(response),
        )
        .await
    }

    async fn search_response_time_over_time(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<Option<AverageAggregate>> {
        self.execute(
            "response_time_over_time",
            context,
            self.request_indices(Some(query)),
            query::response_time::response_time_over_time(query),
            |_, response| response::response_time::response_time_over_time(response),
        )
        .await
    }

    async fn search_request_response_time(
        &self,
        context: &QueryContext,
        query: &ApiAnalyticsQuery,
    ) -> AppResult<RequestResponseTimeAggregate> {
        self.execute(
            "request_response_time",
            context,
            self.request_indices(Some(query)),
            query::response_time::request_response_time(query),
            response::response_time::request_response_time,
        )
        .await
    }

    async fn search_top_hits_apis(
        &self,
        context: &QueryContext,
        query: Option<&ApiAnalyticsQuery>,
    ) -> AppResult<Option<TopHitsAggregate>> {
        self.execute(
            "top_hits_apis",
            context,
            self.request_indices(query),
            query::top_hits::top_hits_apis(query),
            |_, response| response::top_hits::top_hits(response),
        )
        .await
    }

    async fn search_top_apps(
        &self,
        context: &QueryContext,
        query: Option<&ApiAnalyticsQuery>,
    ) -> AppResult<Option<TopHitsAggregate>> {
        self.execute(
            "top_apps",
            context,
            self.request_indices(query),
            query::top_hits::top_apps(query),
            |_, response| response::top_hits::top_hits(response),
        )
        .await
    }

    async fn search_top_failed_apis(
        &self,
        context: &QueryContext,
        query: Option<&ApiAnalyticsQuery>,
    ) -> AppResult<Option<TopFailedAggregate>> {
        self.execute(
            "top_failed_apis",
            context,
            self.request_indices(query),
            query::top_hits::top_failed_apis(query),
            |_, response| response::top_hits::top_failed(response),
        )
        .await
    }

    async fn search_histogram(
        &self,
        context: &QueryContext,
        query: &HistogramQuery,
    ) -> AppResult<Vec<HistogramAggregate>> {
        self.execute(
            "histogram",
            context,
            self.v4_indices(),
            query::histogram::histogram(query, &self.config),
            response::histogram::histogram,
        )
        .await
    }

    async fn search_group_by(
        &self,
        context: &QueryContext,
        query: &GroupByQuery,
    ) -> AppResult<Option<GroupByAggregate<u64>>> {
        self.execute(
            "group_by",
            context,
            self.v4_indices(),
            query::group_by::group_by(query, &self.config),
            response::group_by::group_by,
        )
        .await
    }

    async fn search_stats(
        &self,
        context: &QueryContext,
        query: &StatsQuery,
    ) -> AppResult<Option<StatsAggregate>> {
        self.execute(
            "stats",
            context,
            self.v4_indices(),
            query::stats::stats(query),
            response::stats::stats,
        )
        .await
    }

    async fn search_event_analytics(
        &self,
        context: &QueryContext,
        query: &HistogramQuery,
    ) -> AppResult<Option<EventAnalyticsAggregate>> {
        const SHAPE: &str = "event_analytics";

        let compiled = query::event_metrics::event_metrics(query, &self.config.doc_types);
        if matches!(&compiled, Ok(compiled) if compiled.context.is_empty()) {
            debug!(shape = SHAPE, "No known metric field requested, skipping search");
            record_empty_result(SHAPE);
            return Ok(None);
        }

        self.execute(
            SHAPE,
            context,
            vec![self.config.event_metrics_index()],
            compiled,
            response::event_metrics::event_metrics,
        )
        .await
    }

    async fn find_api_metrics_detail(
        &self,
        context: &QueryContext,
        query: &ApiMetricsDetailQuery,
    ) -> AppResult<Option<ApiMetricsDetail>> {
        self.execute(
            "api_metrics_detail",
            context,
            self.v4_indices(),
            query::detail::api_metrics_detail(query),
            |_, response| response::detail::api_metrics_detail(response),
        )
        .await
    }

    async fn search_http_measures(
        &self,
        context: &QueryContext,
        query: &MeasuresQuery,
    ) -> AppResult<Option<MeasuresResponse>> {
        self.execute(
            "http_measures",
            context,
            self.v4_indices(),
            query::engine::measures(query),
            response::engine::measures,
        )
        .await
    }

    async fn search_http_facets(
        &self,
        context: &QueryContext,
        query: &FacetsQuery,
    ) -> AppResult<Option<FacetsResponse>> {
        self.execute(
            "http_facets",
            context,
            self.v4_indices(),
            query::engine::facets(query, &self.config),
            response::engine::facets,
        )
        .await
    }

    async fn search_http_time_series(
        &self,
        context: &QueryContext,
        query: &TimeSeriesQuery,
    ) -> AppResult<Option<TimeSeriesResponse>> {
        self.execute(
            "http_time_series",
            context,
            self.v4_indices(),
            query::engine::time_series(query),
            response::engine::time_series,
        )
        .await
    }
}
