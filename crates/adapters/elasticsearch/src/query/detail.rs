//! 单条请求指标详情查询

use apim_errors::AppResult;
use apim_ports::ApiMetricsDetailQuery;

use super::CompiledQuery;
use crate::dsl::{SearchDocument, filter};
use crate::fields;

pub fn api_metrics_detail(query: &ApiMetricsDetailQuery) -> AppResult<CompiledQuery> {
    let document = SearchDocument::new()
        .with_size(1)
        .filter(filter::term(fields::API_ID, query.api_id.as_str()))
        .filter(filter::term(fields::REQUEST_ID, query.request_id.as_str()))
        .build();
    Ok(CompiledQuery::from_query(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_query() {
        let compiled = api_metrics_detail(&ApiMetricsDetailQuery::new("api-1", "req-1")).unwrap();
        assert_eq!(
            compiled.query,
            json!({
                "size": 1,
                "query": {"bool": {"filter": [
                    {"term": {"api-id": "api-1"}},
                    {"term": {"request-id": "req-1"}}
                ]}}
            })
        );
    }
}
