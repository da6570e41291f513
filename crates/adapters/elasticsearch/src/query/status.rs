//! 状态码查询：区间分布、随时间分布

use apim_errors::AppResult;
use apim_ports::ApiAnalyticsQuery;
use serde_json::{Map, Value, json};

use super::{BY_DATE, CompiledQuery, required_interval, validate_optional};
use crate::config::ElasticsearchAnalyticsConfig;
use crate::dsl::{RangeForm, SearchDocument, date_histogram, filter, range_filter};
use crate::fields;

pub const ALL_APIS_STATUS_RANGES: &str = "all_apis_status_ranges";
pub const ENTRYPOINT_AGG: &str = "entrypoint_agg";
pub const STATUS_RANGES: &str = "status_ranges";
pub const BY_STATUS: &str = "by_status";

/// 固定的五个状态码区间 `[from, to)`
pub const STATUS_CODE_RANGES: [(f64, f64); 5] = [
    (100.0, 200.0),
    (200.0, 300.0),
    (300.0, 400.0),
    (400.0, 500.0),
    (500.0, 600.0),
];

fn status_ranges() -> Value {
    let ranges: Vec<Value> = STATUS_CODE_RANGES
        .iter()
        .map(|(from, to)| json!({ "from": from, "to": to }))
        .collect();
    json!({ "range": { "field": fields::STATUS, "ranges": ranges } })
}

fn api_filters(query: &ApiAnalyticsQuery) -> SearchDocument {
    SearchDocument::new()
        .filter(filter::api_ids(&query.api_ids, query.includes_v2()))
}

/// 状态码区间分布：整体一份，按 entrypoint 各一份
pub fn response_status_ranges(
    query: &ApiAnalyticsQuery,
    config: &ElasticsearchAnalyticsConfig,
) -> AppResult<CompiledQuery> {
    validate_optional(query.time_range.as_ref())?;

    let mut entrypoint = json!({ "terms": { "field": config.entrypoint_field() } });
    entrypoint["aggs"] = json!({ STATUS_RANGES: status_ranges() });

    let document = api_filters(query)
        .filter_opt(
            query
                .time_range
                .as_ref()
                .map(|range| range_filter(range, RangeForm::Legacy)),
        )
        .aggregation(ENTRYPOINT_AGG, entrypoint)
        .aggregation(ALL_APIS_STATUS_RANGES, status_ranges())
        .build();

    Ok(CompiledQuery::from_query(document))
}

/// 状态码随时间分布
pub fn response_status_over_time(query: &ApiAnalyticsQuery) -> AppResult<CompiledQuery> {
    let (range, interval) = required_interval(query.time_range.as_ref())?;

    let mut by_status = Map::new();
    by_status.insert(
        BY_STATUS.to_string(),
        json!({ "terms": { "field": fields::STATUS } }),
    );

    let document = api_filters(query)
        .filter(range_filter(&range, RangeForm::Legacy))
        .aggregation(BY_DATE, date_histogram(&range, interval, by_status))
        .build();

    Ok(CompiledQuery::from_query(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apim_ports::{DefinitionVersion, TimeRange};
    use std::time::Duration;

    #[test]
    fn test_status_ranges_always_five_buckets() {
        for query in [
            ApiAnalyticsQuery::default(),
            ApiAnalyticsQuery::new(["a", "b"]).with_time_range(TimeRange::new(0, 10)),
        ] {
            let compiled =
                response_status_ranges(&query, &ElasticsearchAnalyticsConfig::default()).unwrap();
            let expected = json!([
                {"from": 100.0, "to": 200.0},
                {"from": 200.0, "to": 300.0},
                {"from": 300.0, "to": 400.0},
                {"from": 400.0, "to": 500.0},
                {"from": 500.0, "to": 600.0}
            ]);
            assert_eq!(
                compiled.query["aggs"]["all_apis_status_ranges"]["range"]["ranges"],
                expected
            );
            assert_eq!(
                compiled.query["aggs"]["entrypoint_agg"]["aggs"]["status_ranges"]["range"]["ranges"],
                expected
            );
        }
    }

    #[test]
    fn test_status_ranges_filters() {
        let query = ApiAnalyticsQuery::new(["a"])
            .with_time_range(TimeRange::new(0, 10))
            .with_definition_versions([DefinitionVersion::V4, DefinitionVersion::V2]);
        let compiled =
            response_status_ranges(&query, &ElasticsearchAnalyticsConfig::default()).unwrap();

        assert_eq!(
            compiled.query["query"]["bool"]["filter"],
            json!([
                {"bool": {"should": [
                    {"terms": {"api-id": ["a"]}},
                    {"terms": {"api": ["a"]}}
                ]}},
                {"range": {"@timestamp": {
                    "from": 0, "to": 10, "include_lower": true, "include_upper": true
                }}}
            ])
        );
    }

    #[test]
    fn test_empty_api_ids_match_nothing() {
        let query = ApiAnalyticsQuery::default().with_time_range(
            TimeRange::new(0, 600_000).with_interval(Duration::from_secs(60)),
        );
        let nothing = json!({"terms": {"api-id": []}});

        let ranges =
            response_status_ranges(&query, &ElasticsearchAnalyticsConfig::default()).unwrap();
        assert_eq!(ranges.query["query"]["bool"]["filter"][0], nothing);
        let over_time = response_status_over_time(&query).unwrap();
        assert_eq!(over_time.query["query"]["bool"]["filter"][0], nothing);
    }

    #[test]
    fn test_status_over_time_requires_interval() {
        let query = ApiAnalyticsQuery::new(["a"]).with_time_range(TimeRange::new(0, 10));
        assert!(response_status_over_time(&query).is_err());
        assert!(response_status_over_time(&ApiAnalyticsQuery::new(["a"])).is_err());
    }

    #[test]
    fn test_status_over_time_query() {
        let query = ApiAnalyticsQuery::new(["a"]).with_time_range(
            TimeRange::new(0, 600_000).with_interval(Duration::from_secs(60)),
        );
        let compiled = response_status_over_time(&query).unwrap();

        assert_eq!(
            compiled.query["aggs"]["by_date"],
            json!({
                "date_histogram": {
                    "field": "@timestamp",
                    "fixed_interval": "60000ms",
                    "min_doc_count": 0,
                    "extended_bounds": {"min": 0, "max": 600_000}
                },
                "aggs": {"by_status": {"terms": {"field": "status"}}}
            })
        );
    }
}
