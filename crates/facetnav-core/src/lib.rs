//! Facetnav Core Library
//!
//! Shared functionality for the facetnav faceted navigation engine:
//! - Database access and migrations for the catalog + index tables
//! - Dynamic query planning over a field-to-table join mapping
//! - Per-facet aggregation (value counts, min/max, range bucketing) with
//!   self-exclusion semantics
//! - Reversible URL encoding of the active filter selection
//! - Facet catalog orchestration producing render-ready facet objects
//! - CSV import for seeding product catalogs

pub mod catalog;
pub mod db;
pub mod definitions;
pub mod encoding;
pub mod error;
pub mod import;
pub mod models;
pub mod query;

pub use catalog::FacetCatalog;
pub use db::Database;
pub use definitions::{default_definitions, discover_definitions, load_definitions, FacetDefinition};
pub use encoding::FacetFilterMap;
pub use error::{Error, Result};
pub use models::{
    Facet, FacetFilter, FacetKind, FacetType, FilterValue, Product, ProductCondition, WidgetType,
};
pub use query::aggregate::{AggregationEngine, RangeBucket, ValueCount};
pub use query::criteria::FilterCriteria;
pub use query::mapping::{FieldMappings, JoinType};
pub use query::planner::{QueryPlanner, SqlQuery};
pub use query::value::SqlValue;
