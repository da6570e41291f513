//! 分析 Repository 测试
//!
//! 使用 mock 搜索客户端，覆盖编译 -> 搜索 -> 归约的完整流程

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use apim_adapter_elasticsearch::{ElasticsearchAnalyticsConfig, ElasticsearchAnalyticsRepository};
use apim_errors::{AppError, AppResult};
use apim_ports::{
    Aggregation, AggregationKind, AnalyticsRepository, ApiAnalyticsQuery, ApiMetricsDetailQuery,
    DefinitionVersion, EventAnalyticsAggregate, Facet, FacetsQuery, Filter, FilterOperator,
    HistogramAggregate, HistogramQuery, Measure, MeasuresQuery, Metric, MetricMeasuresQuery,
    NumberRange, QueryContext, RequestsCountQuery, SearchClient, SearchResponse, SearchTerm,
    SearchTermId, StatsQuery, TimeRange, TimeSeriesQuery,
};
use async_trait::async_trait;
use mockall::mock;
use serde_json::{Value, json};

mock! {
    pub Client {}

    #[async_trait]
    impl SearchClient for Client {
        async fn search(
            &self,
            context: &QueryContext,
            indices: &[String],
            query: &Value,
        ) -> AppResult<SearchResponse>;
    }
}

fn context() -> QueryContext {
    QueryContext::new("DEFAULT", "DEFAULT")
}

fn search_response(value: Value) -> SearchResponse {
    serde_json::from_value(value).unwrap()
}

fn repository(client: MockClient) -> ElasticsearchAnalyticsRepository<MockClient> {
    ElasticsearchAnalyticsRepository::new(Arc::new(client))
}

fn client_returning(indices: &'static [&'static str], response: SearchResponse) -> MockClient {
    let mut client = MockClient::new();
    client
        .expect_search()
        .withf(move |_, actual, _| actual.iter().map(String::as_str).eq(indices.iter().copied()))
        .times(1)
        .returning(move |_, _, _| Ok(response.clone()));
    client
}

fn client_never_called() -> MockClient {
    let mut client = MockClient::new();
    client.expect_search().never();
    client
}

// ============================================================================
// 直方图
// ============================================================================

#[tokio::test]
async fn test_status_histogram_end_to_end() {
    let response = search_response(json!({
        "took": 3,
        "timed_out": false,
        "hits": {"total": {"value": 7, "relation": "eq"}, "hits": []},
        "aggregations": {"by_date": {"buckets": [
            {"key": 1000, "doc_count": 3, "field_status": {"buckets": [{"key": 200, "doc_count": 3}]}},
            {"key": 2000, "doc_count": 0, "field_status": {"buckets": []}},
            {"key": 3000, "doc_count": 1, "field_status": {"buckets": [{"key": 404, "doc_count": 1}]}},
            {"key": 4000, "doc_count": 3, "field_status": {"buckets": [
                {"key": 200, "doc_count": 2},
                {"key": 404, "doc_count": 1}
            ]}}
        ]}}
    }));

    let mut client = MockClient::new();
    client
        .expect_search()
        .withf(|_, indices, query| {
            indices.iter().map(String::as_str).eq(["gravitee-v4-metrics"])
                && query["query"]["bool"]["filter"][0] == json!({"term": {"api-id": "abc"}})
                && query["aggs"]["by_date"]["date_histogram"]["fixed_interval"] == "1000ms"
                && query["aggs"]["by_date"]["aggs"]["field_status"]["terms"]["size"] == 1000
        })
        .times(1)
        .returning(move |_, _, _| Ok(response.clone()));

    let query = HistogramQuery::new(
        SearchTermId::api("abc"),
        TimeRange::new(1000, 5000).with_interval(Duration::from_millis(1000)),
        vec![Aggregation::new("status", AggregationKind::Field)],
    );
    let result = repository(client)
        .search_histogram(&context(), &query)
        .await
        .unwrap();

    assert_eq!(
        result,
        vec![HistogramAggregate::Counts {
            name: "field_status".to_string(),
            field: "status".to_string(),
            values: HashMap::from([
                ("200".to_string(), vec![3, 0, 0, 2]),
                ("404".to_string(), vec![0, 0, 1, 1]),
            ]),
        }]
    );
}

#[tokio::test]
async fn test_invalid_histogram_never_searches() {
    let query = HistogramQuery::new(
        SearchTermId::api("abc"),
        TimeRange::new(5000, 1000).with_interval(Duration::from_millis(1000)),
        vec![Aggregation::new("status", AggregationKind::Field)],
    );
    let err = repository(client_never_called())
        .search_histogram(&context(), &query)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuery(_)));
}

#[tokio::test]
async fn test_histogram_without_aggregations_never_searches() {
    let query = HistogramQuery::new(
        SearchTermId::api("abc"),
        TimeRange::new(1000, 5000).with_interval(Duration::from_millis(1000)),
        vec![],
    );
    let err = repository(client_never_called())
        .search_histogram(&context(), &query)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid query: at least one aggregate function required"
    );
}

// ============================================================================
// 请求计数 / 统计
// ============================================================================

#[tokio::test]
async fn test_requests_count() {
    let response = search_response(json!({
        "hits": {"total": {"value": 12, "relation": "eq"}, "hits": []},
        "aggregations": {"entrypoints": {"buckets": [
            {"key": "http-get", "doc_count": 8},
            {"key": "sse", "doc_count": 4}
        ]}}
    }));
    let result = repository(client_returning(&["gravitee-v4-metrics"], response))
        .search_requests_count(&context(), &RequestsCountQuery::new("api-1"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.total, 12);
    assert_eq!(result.count_by["http-get"], 8);
    assert_eq!(result.count_by["sse"], 4);
}

#[tokio::test]
async fn test_timed_out_response_is_empty() {
    let response = search_response(json!({
        "timed_out": true,
        "hits": {"total": 3, "hits": []},
        "aggregations": {"entrypoints": {"buckets": [{"key": "http-get", "doc_count": 3}]}}
    }));
    let result = repository(client_returning(&["gravitee-v4-metrics"], response))
        .search_requests_count(&context(), &RequestsCountQuery::new("api-1"))
        .await
        .unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_stats() {
    let response = search_response(json!({
        "aggregations": {"stats_gateway-response-time-ms": {
            "count": 2, "min": 10.0, "max": 30.0, "avg": 20.0, "sum": 40.0
        }}
    }));
    let query = StatsQuery::new("gateway-response-time-ms", TimeRange::new(0, 172_800_000));
    let result = repository(client_returning(&["gravitee-v4-metrics"], response))
        .search_stats(&context(), &query)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.count, 2);
    assert_eq!(result.avg, 20.0);
    assert!((result.requests_per_hour - 2.0 / 48.0).abs() < 1e-9);
}

// ============================================================================
// 索引选择
// ============================================================================

#[tokio::test]
async fn test_v2_apis_query_request_index() {
    let response = search_response(json!({
        "aggregations": {
            "top_hits_count_api-id": {"buckets": [{"key": "api-1", "doc_count": 5}]},
            "top_hits_count_api": {"buckets": [{"key": "api-1", "doc_count": 2}]}
        }
    }));
    let query = ApiAnalyticsQuery::new(["api-1"])
        .with_definition_versions([DefinitionVersion::V2, DefinitionVersion::V4]);
    let result = repository(client_returning(
        &["gravitee-v4-metrics", "gravitee-request"],
        response,
    ))
    .search_top_hits_apis(&context(), Some(&query))
    .await
    .unwrap()
    .unwrap();

    assert_eq!(result.top_hits_counts["api-1"], 7);
}

#[tokio::test]
async fn test_custom_index_prefix() {
    let config = ElasticsearchAnalyticsConfig::new("analytics");
    let mut client = MockClient::new();
    client
        .expect_search()
        .withf(|_, indices, _| indices.iter().map(String::as_str).eq(["analytics-v4-metrics"]))
        .times(1)
        .returning(|_, _, _| Ok(SearchResponse::default()));

    let result = ElasticsearchAnalyticsRepository::with_config(Arc::new(client), config)
        .find_api_metrics_detail(&context(), &ApiMetricsDetailQuery::new("api-1", "req-1"))
        .await
        .unwrap();
    assert_eq!(result, None);
}

// ============================================================================
// 空 API 列表
// ============================================================================

fn client_expecting_no_api(response: SearchResponse) -> MockClient {
    let mut client = MockClient::new();
    client
        .expect_search()
        .withf(|_, _, query| {
            query["query"]["bool"]["filter"][0] == json!({"terms": {"api-id": []}})
        })
        .times(1)
        .returning(move |_, _, _| Ok(response.clone()));
    client
}

#[tokio::test]
async fn test_empty_api_ids_status_ranges_are_zero() {
    let zero_ranges = json!({"buckets": [
        {"key": "100.0-200.0", "from": 100.0, "to": 200.0, "doc_count": 0},
        {"key": "200.0-300.0", "from": 200.0, "to": 300.0, "doc_count": 0},
        {"key": "300.0-400.0", "from": 300.0, "to": 400.0, "doc_count": 0},
        {"key": "400.0-500.0", "from": 400.0, "to": 500.0, "doc_count": 0},
        {"key": "500.0-600.0", "from": 500.0, "to": 600.0, "doc_count": 0}
    ]});
    let response = search_response(json!({
        "hits": {"total": {"value": 0, "relation": "eq"}, "hits": []},
        "aggregations": {
            "all_apis_status_ranges": zero_ranges,
            "entrypoint_agg": {"buckets": []}
        }
    }));
    let result = repository(client_expecting_no_api(response))
        .search_response_status_ranges(&context(), &ApiAnalyticsQuery::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.ranges.len(), 5);
    assert!(result.ranges.values().all(|count| *count == 0));
    assert!(result.status_ranges_count_by_entrypoint.is_empty());
}

#[tokio::test]
async fn test_empty_api_ids_top_hits_are_empty() {
    let response = search_response(json!({
        "aggregations": {
            "top_hits_count_api-id": {"buckets": []},
            "top_hits_count_api": {"buckets": []}
        }
    }));
    let result = repository(client_expecting_no_api(response))
        .search_top_hits_apis(&context(), None)
        .await
        .unwrap()
        .unwrap();
    assert!(result.top_hits_counts.is_empty());

    let response = search_response(json!({
        "aggregations": {
            "failed_apis_agg_api-id": {"buckets": []},
            "failed_apis_agg_api": {"buckets": []}
        }
    }));
    let query = ApiAnalyticsQuery::default().with_time_range(TimeRange::new(0, 1000));
    let result = repository(client_expecting_no_api(response))
        .search_top_failed_apis(&context(), Some(&query))
        .await
        .unwrap()
        .unwrap();
    assert!(result.failed_apis.is_empty());
}

// ============================================================================
// 事件指标
// ============================================================================

#[tokio::test]
async fn test_event_analytics_unknown_fields_skip_search() {
    let query = HistogramQuery::new(
        SearchTermId::api("native-api"),
        TimeRange::new(0, 60_000),
        vec![Aggregation::new("not-a-metric", AggregationKind::Value)],
    );
    let result = repository(client_never_called())
        .search_event_analytics(&context(), &query)
        .await
        .unwrap();
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_event_analytics_value() {
    let response = search_response(json!({
        "aggregations": {"value_downstream-active-connections": {
            "doc_count": 4,
            "latest_value": {"hits": {"hits": [{"_source": {
                "downstream-active-connections": 12,
                "@timestamp": "1970-01-01T00:00:10.000Z"
            }}]}}
        }}
    }));
    let query = HistogramQuery::new(
        SearchTermId::api("native-api"),
        TimeRange::new(0, 60_000),
        vec![Aggregation::new("downstream-active-connections", AggregationKind::Value)],
    );
    let result = repository(client_returning(&["gravitee-event-metrics"], response))
        .search_event_analytics(&context(), &query)
        .await
        .unwrap();

    let Some(EventAnalyticsAggregate::Latest { values }) = result else {
        panic!("expected latest values, got {:?}", result);
    };
    assert_eq!(values["downstream-active-connections"]["value"], 12);
    assert_eq!(values["downstream-active-connections"]["timestamp"], 10_000);
}

#[tokio::test]
async fn test_event_analytics_mixed_kinds_rejected() {
    let query = HistogramQuery::new(
        SearchTermId::api("native-api"),
        TimeRange::new(0, 60_000),
        vec![
            Aggregation::new("downstream-active-connections", AggregationKind::Value),
            Aggregation::new("downstream-publish-messages-total", AggregationKind::Delta),
        ],
    );
    let err = repository(client_never_called())
        .search_event_analytics(&context(), &query)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid query: exactly one aggregate function required"
    );
}

// ============================================================================
// HTTP 指标引擎
// ============================================================================

const DAY: i64 = 86_400_000;

fn api_filters() -> Vec<Filter> {
    vec![Filter::new(
        SearchTerm::Api,
        FilterOperator::In,
        ["4a6895d5-a1bc-4041-a895-d5a1bce041ae", "f1608475-dd77-4603-a084-75dd775603e9"],
    )]
}

#[tokio::test]
async fn test_http_measures() {
    let response = search_response(json!({
        "hits": {"total": {"value": 400, "relation": "eq"}, "hits": []},
        "aggregations": {
            "http_gateway_response_time": {"doc_count": 400, "avg": {"value": 12.0}},
            "http_requests": {"doc_count": 400},
            "http_errors": {"doc_count": 40}
        }
    }));
    let mut client = MockClient::new();
    client
        .expect_search()
        .withf(|_, indices, query| {
            indices.iter().map(String::as_str).eq(["gravitee-v4-metrics"])
                && query["track_total_hits"] == true
                && query["aggs"]["http_errors"]["filter"] == json!({"range": {"status": {"gte": 400}}})
        })
        .times(1)
        .returning(move |_, _, _| Ok(response.clone()));

    let metrics = vec![
        MetricMeasuresQuery::new(Metric::HttpGatewayResponseTime, [Measure::Avg]),
        MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Rps]),
        MetricMeasuresQuery::new(Metric::HttpErrors, [Measure::Percentage]),
    ];
    let query = MeasuresQuery::new(TimeRange::new(0, 2 * DAY), api_filters(), metrics);
    let result = repository(client)
        .search_http_measures(&context(), &query)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.measures.len(), query.metrics.len());
    for metric in &result.measures {
        assert_eq!(metric.measures.len(), 1);
        assert!(metric.measures.values().all(|value| *value != 0.0));
    }
    assert_eq!(result.measures[2].measures[&Measure::Percentage], 10.0);
}

#[tokio::test]
async fn test_http_facets_status_ranges() {
    let keys = ["100-199", "200-299", "300-399", "400-499", "500-599"];
    let buckets: Vec<Value> = keys
        .iter()
        .map(|key| json!({"key": key, "doc_count": 2, "http_requests": {"doc_count": 2}}))
        .collect();
    let response = search_response(json!({
        "aggregations": {"facet_http_status": {"buckets": buckets}}
    }));

    let ranges = (1..=5).map(|n| NumberRange::new(n * 100, n * 100 + 99)).collect();
    let query = FacetsQuery::new(
        TimeRange::new(0, 2 * DAY),
        api_filters(),
        vec![MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Count])],
        vec![Facet::HttpStatus],
    )
    .with_ranges(ranges);
    let result = repository(client_returning(&["gravitee-v4-metrics"], response))
        .search_http_facets(&context(), &query)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.metrics.len(), 1);
    let metric = &result.metrics[0];
    assert_eq!(metric.metric, Metric::HttpRequests);
    assert_eq!(
        metric.buckets.iter().map(|b| b.key.as_str()).collect::<Vec<_>>(),
        keys
    );
}

#[tokio::test]
async fn test_http_time_series() {
    let response = search_response(json!({
        "aggregations": {"by_date": {"buckets": [
            {"key": 0, "doc_count": 3, "http_requests": {"doc_count": 3}},
            {"key": 3_600_000, "doc_count": 1, "http_requests": {"doc_count": 1}}
        ]}}
    }));
    let query = TimeSeriesQuery::new(
        TimeRange::new(0, 2 * 3_600_000),
        api_filters(),
        Duration::from_secs(3600),
        vec![MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Count])],
    );
    let result = repository(client_returning(&["gravitee-v4-metrics"], response))
        .search_http_time_series(&context(), &query)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.metrics.len(), 1);
    let buckets = &result.metrics[0].buckets;
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].measures[&Measure::Count], 3.0);
}

#[tokio::test]
async fn test_http_measures_invalid_never_searches() {
    let query = MeasuresQuery::new(
        TimeRange::new(0, DAY),
        api_filters(),
        vec![MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Avg])],
    );
    let err = repository(client_never_called())
        .search_http_measures(&context(), &query)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuery(_)));
}

// ============================================================================
// 错误传播
// ============================================================================

#[tokio::test]
async fn test_client_error_propagates() {
    let mut client = MockClient::new();
    client
        .expect_search()
        .times(1)
        .returning(|_, _, _| Err(AppError::external_service("connection refused")));

    let err = repository(client)
        .search_response_status_ranges(&context(), &ApiAnalyticsQuery::new(["api-1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExternalService(_)));
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn test_status_over_time_requires_interval() {
    let query = ApiAnalyticsQuery::new(["api-1"]).with_time_range(TimeRange::new(0, 1000));
    let err = repository(client_never_called())
        .search_response_status_over_time(&context(), &query)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidQuery(_)));
}
