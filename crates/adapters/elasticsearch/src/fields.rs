//! 文档字段与索引名

pub const TIMESTAMP: &str = "@timestamp";
pub const API_ID: &str = "api-id";
/// V2 API 的历史字段
pub const API: &str = "api";
pub const APPLICATION_ID: &str = "application-id";
pub const PLAN_ID: &str = "plan-id";
pub const REQUEST_ID: &str = "request-id";
pub const STATUS: &str = "status";
pub const ENTRYPOINT_ID: &str = "entrypoint-id";
pub const ENTRYPOINT_ID_KEYWORD: &str = "entrypoint-id.keyword";
pub const DOC_TYPE: &str = "doc-type";
pub const GATEWAY_RESPONSE_TIME_MS: &str = "gateway-response-time-ms";
pub const MESSAGE_COUNT: &str = "message-count";
pub const REQUEST_ENDED: &str = "request-ended";

pub const V4_METRICS_INDEX: &str = "v4-metrics";
pub const REQUEST_INDEX: &str = "request";
pub const EVENT_METRICS_INDEX: &str = "event-metrics";
