//! Dynamic query building and aggregation
//!
//! This module is organized leaf to root:
//! - `value` - bound SQL literal values
//! - `criteria` - the mutable filter/select/group/order builder
//! - `mapping` - static field-to-table join descriptors
//! - `planner` - renders one SQL statement from a criteria snapshot
//! - `aggregate` - facet aggregation (counts, min/max, range buckets)

pub mod aggregate;
pub mod criteria;
pub mod mapping;
pub mod planner;
pub mod value;
