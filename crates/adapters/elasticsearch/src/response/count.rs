//! 请求数归约

use apim_ports::{CountAggregate, SearchResponse};

use super::node;
use crate::query::count::ENTRYPOINTS;

/// 总数取命中总数，按 entrypoint 拆分取桶计数
pub fn requests_count(response: &SearchResponse) -> Option<CountAggregate> {
    let aggregations = response.usable_aggregations()?;
    let total = response.total_hits()?;
    let count_by = aggregations
        .get(ENTRYPOINTS)
        .map(node::buckets)
        .unwrap_or_default()
        .iter()
        .filter_map(|bucket| Some((node::bucket_key(bucket)?, node::doc_count(bucket))))
        .collect();
    Some(CountAggregate { total, count_by })
}

pub fn requests_count_by_event(response: &SearchResponse) -> Option<CountAggregate> {
    response.total_hits().map(|total| CountAggregate {
        total,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> SearchResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_requests_count_total_from_hits() {
        let result = requests_count(&response(json!({
            "hits": {"total": {"value": 11, "relation": "eq"}, "hits": []},
            "aggregations": {"entrypoints": {"buckets": [
                {"key": "http-get", "doc_count": 3},
                {"key": "http-post", "doc_count": 1}
            ]}}
        })))
        .unwrap();

        assert_eq!(result.total, 11);
        assert_eq!(result.count_by.len(), 2);
        assert_eq!(result.count_by["http-get"], 3);
        assert_eq!(result.count_by["http-post"], 1);
    }

    #[test]
    fn test_requests_count_empty_response() {
        assert_eq!(requests_count(&SearchResponse::default()), None);
        assert_eq!(
            requests_count(&response(json!({"timed_out": true, "aggregations": {"entrypoints": {}}}))),
            None
        );
    }

    #[test]
    fn test_requests_count_by_event() {
        let result = requests_count_by_event(&response(json!({"hits": {"total": 7}}))).unwrap();
        assert_eq!(result.total, 7);
        assert!(result.count_by.is_empty());
        assert_eq!(
            requests_count_by_event(&response(json!({"timed_out": true}))),
            None
        );
    }
}
