//! Facet aggregation over a filtered population
//!
//! Every aggregate runs against the criteria wrapped as an initial
//! population, so fan-out joins (a product with three variants matches an
//! attribute filter three times) can never multiply product counts: the
//! outer query counts DISTINCT on the root primary key.
//!
//! Self-exclusion (counting a facet's values while ignoring that facet's
//! own active filter) is a criteria concern: callers derive the population
//! with `FilterCriteria::without_filter` before asking for counts. The
//! exclusion happens in the database query, never by post-filtering rows.

use rusqlite::types::Value;
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::query::criteria::FilterCriteria;
use crate::query::mapping::{FieldMappings, ROOT_ALIAS, ROOT_KEY};
use crate::query::planner::QueryPlanner;
use crate::query::value::SqlValue;

/// One distinct value of a field with its product count.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCount {
    pub value: SqlValue,
    pub count: u64,
}

/// One equal-width bucket of a continuous field.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBucket {
    pub range_start: f64,
    pub range_end: f64,
    pub count: u64,
}

pub struct AggregationEngine<'a> {
    db: &'a Database,
    mappings: &'a FieldMappings,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(db: &'a Database, mappings: &'a FieldMappings) -> Self {
        Self { db, mappings }
    }

    /// Number of distinct products matching the criteria.
    pub fn count(&self, criteria: &FilterCriteria) -> Result<u64> {
        let mut outer = self.population(criteria, &[]);
        outer.add_select_field(&format!("COUNT(DISTINCT {ROOT_ALIAS}.{ROOT_KEY}) AS c"));

        let query = QueryPlanner::new(self.mappings).render(&outer)?;
        debug!(sql = %query.sql, "count aggregate");
        let conn = self.db.conn()?;
        let count: i64 = conn.query_row(&query.sql, query.params_refs().as_slice(), |row| {
            row.get(0)
        })?;
        Ok(count.max(0) as u64)
    }

    /// Distinct products per distinct value of `field`. NULL values
    /// (products the facet's LEFT JOIN did not reach) are omitted.
    pub fn value_counts(&self, criteria: &FilterCriteria, field: &str) -> Result<Vec<ValueCount>> {
        let mut outer = self.population(criteria, &[field]);
        let expr = format!("{ROOT_ALIAS}.{field}");
        outer
            .add_select_field(&expr)
            .add_select_field(&format!("COUNT(DISTINCT {ROOT_ALIAS}.{ROOT_KEY}) AS c"))
            .add_group_by(&expr);

        let query = QueryPlanner::new(self.mappings).render(&outer)?;
        debug!(sql = %query.sql, field, "value count aggregate");
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&query.sql)?;
        let rows = stmt.query_map(query.params_refs().as_slice(), |row| {
            Ok((row.get::<_, Value>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            let (value, count) = row?;
            if matches!(value, Value::Null) {
                continue;
            }
            counts.push(ValueCount {
                value: value.into(),
                count: count.max(0) as u64,
            });
        }
        Ok(counts)
    }

    /// MIN/MAX of a numeric field over the filtered population. `None` when
    /// the population is empty.
    pub fn min_max(&self, criteria: &FilterCriteria, field: &str) -> Result<Option<(f64, f64)>> {
        let (lo, hi) = range_columns(field);
        let mut outer = self.population(criteria, &[lo, hi]);
        outer
            .add_select_field(&format!("MIN({ROOT_ALIAS}.{lo}) AS min_v"))
            .add_select_field(&format!("MAX({ROOT_ALIAS}.{hi}) AS max_v"));

        let query = QueryPlanner::new(self.mappings).render(&outer)?;
        debug!(sql = %query.sql, field, "min/max aggregate");
        let conn = self.db.conn()?;
        let (min, max): (Option<f64>, Option<f64>) =
            conn.query_row(&query.sql, query.params_refs().as_slice(), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
        Ok(match (min, max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        })
    }

    /// Two-pass equal-width bucketing of a continuous field.
    ///
    /// Pass 1 sizes buckets as `round((max - min) / output_length)`; a zero
    /// width (all values identical, or more buckets requested than the
    /// value spread) yields an empty list, which presentation flattens to a
    /// single bucket. Pass 2 groups the population by bucket ordinal.
    pub fn field_ranges(
        &self,
        criteria: &FilterCriteria,
        field: &str,
        output_length: u32,
    ) -> Result<Vec<RangeBucket>> {
        if output_length == 0 {
            return Ok(Vec::new());
        }
        let Some((min, max)) = self.min_max(criteria, field)? else {
            return Ok(Vec::new());
        };
        let diff = ((max - min) / f64::from(output_length)).round();
        if diff == 0.0 {
            return Ok(Vec::new());
        }

        let (lo, hi) = range_columns(field);
        // CAST truncation equals floor here: indexed values are
        // non-negative.
        let floor_expr = format!("CAST({ROOT_ALIAS}.{lo} / {diff} AS INTEGER)");
        let mut outer = self.population(criteria, &[lo, hi]);
        outer
            .add_select_field(&format!("{floor_expr} * {diff} AS range_start"))
            .add_select_field(&format!(
                "(CAST(MAX({ROOT_ALIAS}.{hi}) / {diff} AS INTEGER) + 1) * {diff} - 1 AS range_end"
            ))
            .add_select_field(&format!("COUNT(DISTINCT {ROOT_ALIAS}.{ROOT_KEY}) AS nbr"))
            .add_group_by(&floor_expr);

        let query = QueryPlanner::new(self.mappings).render(&outer)?;
        debug!(sql = %query.sql, field, "range bucket aggregate");
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&query.sql)?;
        let rows = stmt.query_map(query.params_refs().as_slice(), |row| {
            Ok(RangeBucket {
                range_start: row.get(0)?,
                range_end: row.get(1)?,
                count: row.get::<_, i64>(2)?.max(0) as u64,
            })
        })?;

        let mut buckets = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        buckets.sort_by(|a, b| a.range_start.total_cmp(&b.range_start));
        Ok(buckets)
    }

    /// Wrap the criteria as an initial population exposing the root key
    /// plus the given fields, so outer aggregates address them as plain
    /// population columns.
    fn population(&self, criteria: &FilterCriteria, fields: &[&str]) -> FilterCriteria {
        let mut inner = criteria.clone();
        inner
            .set_limit(None, 0)
            .clear_order_field()
            .set_group_fields(Vec::new());

        let mut selects = vec![ROOT_KEY.to_string()];
        for field in fields {
            if *field != ROOT_KEY && !selects.iter().any(|s| s == field) {
                selects.push((*field).to_string());
            }
        }
        inner.set_select_fields(selects);

        let mut outer = FilterCriteria::new();
        outer.set_initial_population(inner);
        outer
    }
}

/// Price ranges are stored asymmetrically (promotional bands), so `price`
/// reads the indexed min/max pair; every other field is its own bound.
fn range_columns(field: &str) -> (&str, &str) {
    if field == "price" {
        ("price_min", "price_max")
    } else {
        (field, field)
    }
}
