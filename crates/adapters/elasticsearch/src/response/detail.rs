//! 单条请求详情归约

use apim_ports::{ApiMetricsDetail, SearchResponse};
use tracing::debug;

/// 取第一条命中；超时、无命中或文档无法解析时为空
pub fn api_metrics_detail(response: &SearchResponse) -> Option<ApiMetricsDetail> {
    if response.timed_out {
        return None;
    }
    let hit = response.hits.hits.first()?;
    match serde_json::from_value(hit.source.clone()) {
        Ok(detail) => Some(detail),
        Err(e) => {
            debug!(index = %hit.index, id = %hit.id, error = %e, "Failed to parse api metrics detail");
            None
        }
    }
}
