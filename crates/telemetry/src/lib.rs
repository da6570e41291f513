//! apim-telemetry - 可观测性库
//!
//! tracing 初始化、Prometheus 导出器，以及分析查询的指标埋点

use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 分析查询总数（按 shape / outcome）
pub const ANALYTICS_QUERIES_TOTAL: &str = "analytics_queries_total";
/// 空结果次数（超时、缺失聚合、全部字段未知）
pub const ANALYTICS_EMPTY_RESULTS_TOTAL: &str = "analytics_empty_results_total";
/// 一次 compile -> search -> reduce 的耗时
pub const ANALYTICS_QUERY_DURATION_SECONDS: &str = "analytics_query_duration_seconds";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to install Prometheus recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

fn env_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(log_level)?),
    }
}

/// 初始化 tracing
pub fn try_init_tracing(log_level: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter(log_level)?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn try_init_tracing_json(log_level: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(env_filter(log_level)?)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()?;
    Ok(())
}

/// 初始化 tracing，已初始化或过滤器非法时只打印到 stderr
pub fn init_tracing(log_level: &str, json: bool) {
    let result = if json {
        try_init_tracing_json(log_level)
    } else {
        try_init_tracing(log_level)
    };
    if let Err(err) = result {
        eprintln!("tracing not initialized: {}", err);
    }
}

/// 初始化 Prometheus metrics
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        ANALYTICS_QUERIES_TOTAL,
        "Analytics queries executed, labelled by shape and outcome"
    );
    metrics::describe_counter!(
        ANALYTICS_EMPTY_RESULTS_TOTAL,
        "Analytics queries that reduced to an empty result"
    );
    metrics::describe_histogram!(
        ANALYTICS_QUERY_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Latency of compile, search and reduce for one analytics query"
    );
}

/// 查询结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Success,
    InvalidQuery,
    SearchFailed,
}

impl QueryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidQuery => "invalid_query",
            Self::SearchFailed => "search_failed",
        }
    }
}

/// 记录一次分析查询
pub fn record_query(shape: &'static str, outcome: QueryOutcome, elapsed: Duration) {
    metrics::counter!(
        ANALYTICS_QUERIES_TOTAL,
        "shape" => shape,
        "outcome" => outcome.as_str()
    )
    .increment(1);
    metrics::histogram!(ANALYTICS_QUERY_DURATION_SECONDS, "shape" => shape)
        .record(elapsed.as_secs_f64());
}

/// 记录一次空结果
pub fn record_empty_result(shape: &'static str) {
    metrics::counter!(ANALYTICS_EMPTY_RESULTS_TOTAL, "shape" => shape).increment(1);
}
