//! 查询 DSL 片段

pub mod filter;
pub mod time_range;

pub use filter::SearchDocument;
pub use time_range::{RangeForm, date_histogram, range_filter};
