//! 分组归约

use std::collections::HashMap;

use apim_ports::{GroupByAggregate, SearchResponse};

use super::node;
use crate::query::group_by::GroupByContext;

/// 值为桶内文档数，`order` 保留引擎返回的桶顺序
pub fn group_by(context: &GroupByContext, response: &SearchResponse) -> Option<GroupByAggregate<u64>> {
    let aggregation = response.usable_aggregations()?.get(&context.name)?;

    let mut values = HashMap::new();
    let mut order = Vec::new();
    for bucket in node::buckets(aggregation) {
        let Some(key) = node::bucket_key(bucket) else {
            continue;
        };
        values.insert(key.clone(), node::doc_count(bucket));
        order.push(key);
    }

    Some(GroupByAggregate {
        name: context.name.clone(),
        field: context.field.clone(),
        values,
        order,
    })
}
