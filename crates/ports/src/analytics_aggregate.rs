//! 分析聚合结果
//!
//! 由 reducer 一次性构造，交给调用方后不再变化

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// 计数结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountAggregate {
    pub total: u64,
    pub count_by: HashMap<String, u64>,
}

/// 平均值结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageAggregate {
    pub average: f64,
    pub average_by: HashMap<String, f64>,
}

/// 单字段统计结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsAggregate {
    pub field: String,
    pub count: u64,
    pub sum: f64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub requests_per_second: f64,
    pub requests_per_minute: f64,
    pub requests_per_hour: f64,
}

/// 直方图序列，每个时间桶一个值，空桶补零
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistogramAggregate {
    /// 按字段取值分桶计数
    Counts {
        name: String,
        field: String,
        values: HashMap<String, Vec<i64>>,
    },
    /// 单值指标序列（avg / min / max / sum）
    Metric {
        name: String,
        field: String,
        values: Vec<f64>,
    },
}

impl HistogramAggregate {
    pub fn name(&self) -> &str {
        match self {
            Self::Counts { name, .. } | Self::Metric { name, .. } => name,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Counts { field, .. } | Self::Metric { field, .. } => field,
        }
    }
}

/// Top N 命中次数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopHitsAggregate {
    pub top_hits_counts: HashMap<String, u64>,
}

/// 失败请求统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FailedApiInfo {
    pub failed_requests: u64,
    pub failed_requests_ratio: f64,
}

/// Top N 失败 API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopFailedAggregate {
    pub failed_apis: HashMap<String, FailedApiInfo>,
}

/// 状态码区间分布
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatusRangesAggregate {
    pub status_ranges_count_by_entrypoint: HashMap<String, HashMap<String, u64>>,
    pub ranges: HashMap<String, u64>,
}

/// 状态码随时间分布
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStatusOverTimeAggregate {
    pub status_count: HashMap<String, Vec<i64>>,
}

/// 请求量与响应时间概览
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestResponseTimeAggregate {
    pub requests_per_second: f64,
    pub requests_total: u64,
    pub response_min_time: f64,
    pub response_max_time: f64,
    pub response_avg_time: f64,
}

/// 分组结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupByAggregate<V> {
    pub name: String,
    pub field: String,
    pub values: HashMap<String, V>,
    /// 引擎返回的桶顺序
    pub order: Vec<String>,
}

/// 事件指标结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventAnalyticsAggregate {
    /// VALUE：字段 -> {"value", "timestamp"}
    Latest {
        values: HashMap<String, HashMap<String, i64>>,
    },
    /// DELTA / TREND / TREND_RATE：字段 -> 序列，缺数据为 None
    Series {
        values: HashMap<String, Vec<Option<f64>>>,
    },
}

impl EventAnalyticsAggregate {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Latest { values } => values.is_empty(),
            Self::Series { values } => values.is_empty(),
        }
    }
}

/// HTTP 方法，文档中以数字编码或名称存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    Other,
}

impl HttpMethod {
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Connect,
            2 => Self::Delete,
            3 => Self::Get,
            4 => Self::Head,
            5 => Self::Options,
            6 => Self::Patch,
            7 => Self::Post,
            8 => Self::Put,
            9 => Self::Trace,
            _ => Self::Other,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "CONNECT" => Self::Connect,
            "DELETE" => Self::Delete,
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "TRACE" => Self::Trace,
            _ => Self::Other,
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u64),
            Name(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Self::from_code(code),
            Raw::Name(name) => Self::from_name(&name),
        })
    }
}

/// 单条请求指标详情
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ApiMetricsDetail {
    #[serde(rename = "@timestamp")]
    pub timestamp: Option<String>,
    pub api_id: Option<String>,
    pub request_id: Option<String>,
    pub transaction_id: Option<String>,
    pub host: Option<String>,
    pub application_id: Option<String>,
    pub plan_id: Option<String>,
    pub gateway: Option<String>,
    pub uri: Option<String>,
    pub status: Option<u16>,
    pub request_content_length: Option<u64>,
    pub response_content_length: Option<u64>,
    pub remote_address: Option<String>,
    pub gateway_response_time_ms: Option<u64>,
    pub endpoint_response_time_ms: Option<u64>,
    #[serde(rename = "http-method")]
    pub method: Option<HttpMethod>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_metrics_detail_from_source() {
        let source = json!({
            "@timestamp": "2024-02-13T14:00:00.000Z",
            "api-id": "f1608475",
            "request-id": "8d6d8bd5",
            "transaction-id": "8d6d8bd5",
            "host": "apim-master-gateway.team-apim.gravitee.dev",
            "application-id": "1e478236",
            "plan-id": "733b78f1",
            "gateway": "2c99d50d",
            "uri": "/jgi-message-logs-kafka/",
            "status": 404,
            "request-content-length": 0,
            "response-content-length": 41,
            "remote-address": "127.0.0.1",
            "http-method": 3,
            "unknown-field": true
        });

        let detail: ApiMetricsDetail = serde_json::from_value(source).unwrap();
        assert_eq!(detail.api_id.as_deref(), Some("f1608475"));
        assert_eq!(detail.status, Some(404));
        assert_eq!(detail.request_content_length, Some(0));
        assert_eq!(detail.response_content_length, Some(41));
        assert_eq!(detail.remote_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(detail.method, Some(HttpMethod::Get));
        assert_eq!(detail.gateway_response_time_ms, None);
    }

    #[test]
    fn test_http_method_by_name() {
        let method: HttpMethod = serde_json::from_value(json!("post")).unwrap();
        assert_eq!(method, HttpMethod::Post);
        assert_eq!(HttpMethod::from_code(42), HttpMethod::Other);
    }

    #[test]
    fn test_histogram_accessors() {
        let histogram = HistogramAggregate::Metric {
            name: "avg_gateway-response-time-ms".to_string(),
            field: "gateway-response-time-ms".to_string(),
            values: vec![0.0, 12.5],
        };
        assert_eq!(histogram.name(), "avg_gateway-response-time-ms");
        assert_eq!(histogram.field(), "gateway-response-time-ms");
    }
}
