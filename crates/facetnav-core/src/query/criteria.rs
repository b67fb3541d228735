//! Filter criteria builder for constructing dynamic catalog queries
//!
//! This is the mutable snapshot the planner renders from: an ordered set of
//! named filter predicates (bucketed per operator), named OR-of-AND
//! "operations filters", plain column filters, output column selections,
//! grouping, ordering and pagination, plus an optional wrapped initial
//! population used as the FROM-source for layered restriction.
//!
//! The three filter channels (`filters`, `operations_filters`,
//! `column_filters`) are independent; when non-empty they are all ANDed
//! together in the final WHERE clause.

use crate::query::mapping::{ROOT_ALIAS, ROOT_KEY};
use crate::query::value::SqlValue;

/// Sort direction for the single order field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// All value lists accumulated for one operator on one field.
///
/// Each inner list renders as its own condition (`=` with one value becomes
/// an equality, `=` with several an IN list, any other operator an OR chain
/// across the list); the conditions are then ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorBucket {
    pub operator: String,
    pub value_lists: Vec<Vec<SqlValue>>,
}

/// Operator buckets for one logical field, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub buckets: Vec<OperatorBucket>,
}

/// One AND-condition inside an operations filter group.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub operator: String,
    pub values: Vec<SqlValue>,
}

impl FilterCondition {
    pub fn new(field: &str, values: Vec<SqlValue>, operator: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            values,
        }
    }
}

/// A named OR-of-AND predicate: groups are ORed, conditions within a group
/// are ANDed, and the whole thing is ANDed with the rest of the WHERE
/// clause inside its own parentheses.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationsFilter {
    pub name: String,
    pub groups: Vec<Vec<FilterCondition>>,
}

/// A plain per-column restriction, kept in a separate bucket from `filters`
/// because it participates in WHERE composition independently.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub column: String,
    pub operator: String,
    pub values: Vec<SqlValue>,
}

/// Builder for one catalog query. All mutators return `&mut Self` to allow
/// chaining; cloning is a deep copy, so derived variants (self-exclusion,
/// wrapped populations) never alias the original's collections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCriteria {
    filters: Vec<FieldFilter>,
    operations_filters: Vec<OperationsFilter>,
    column_filters: Vec<ColumnFilter>,
    select_fields: Vec<String>,
    group_fields: Vec<String>,
    order_field: Option<String>,
    order_direction: OrderDirection,
    limit: Option<u64>,
    offset: u64,
    initial_population: Option<Box<FilterCriteria>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value list to the operator bucket for `field`.
    ///
    /// Accumulates: calling twice with the same field and operator yields
    /// two conditions ANDed together, not a merged list.
    pub fn add_filter(&mut self, field: &str, values: Vec<SqlValue>, operator: &str) -> &mut Self {
        let entry = match self.filters.iter_mut().find(|f| f.field == field) {
            Some(entry) => entry,
            None => {
                self.filters.push(FieldFilter {
                    field: field.to_string(),
                    buckets: Vec::new(),
                });
                self.filters.last_mut().unwrap()
            }
        };
        match entry.buckets.iter_mut().find(|b| b.operator == operator) {
            Some(bucket) => bucket.value_lists.push(values),
            None => entry.buckets.push(OperatorBucket {
                operator: operator.to_string(),
                value_lists: vec![values],
            }),
        }
        self
    }

    /// Replace any existing filter state for `field` with a single bucket.
    pub fn set_filter(&mut self, field: &str, values: Vec<SqlValue>, operator: &str) -> &mut Self {
        self.reset_filter(field);
        self.add_filter(field, values, operator)
    }

    /// Drop all operator buckets for `field`.
    pub fn reset_filter(&mut self, field: &str) -> &mut Self {
        self.filters.retain(|f| f.field != field);
        self
    }

    /// Clear filters, operations filters, column filters, select fields and
    /// group fields. Order and limit are preserved.
    pub fn reset_all_filters(&mut self) -> &mut Self {
        self.filters.clear();
        self.operations_filters.clear();
        self.column_filters.clear();
        self.select_fields.clear();
        self.group_fields.clear();
        self
    }

    pub fn add_column_filter(
        &mut self,
        column: &str,
        values: Vec<SqlValue>,
        operator: &str,
    ) -> &mut Self {
        self.column_filters.push(ColumnFilter {
            column: column.to_string(),
            operator: operator.to_string(),
            values,
        });
        self
    }

    /// Register a named OR-of-AND predicate. A later filter with the same
    /// name replaces the earlier one.
    pub fn add_operations_filter(
        &mut self,
        name: &str,
        groups: Vec<Vec<FilterCondition>>,
    ) -> &mut Self {
        self.reset_operations_filter(name);
        self.operations_filters.push(OperationsFilter {
            name: name.to_string(),
            groups,
        });
        self
    }

    pub fn reset_operations_filter(&mut self, name: &str) -> &mut Self {
        self.operations_filters.retain(|f| f.name != name);
        self
    }

    pub fn add_select_field(&mut self, field: &str) -> &mut Self {
        self.select_fields.push(field.to_string());
        self
    }

    pub fn set_select_fields(&mut self, fields: Vec<String>) -> &mut Self {
        self.select_fields = fields;
        self
    }

    pub fn add_group_by(&mut self, field: &str) -> &mut Self {
        self.group_fields.push(field.to_string());
        self
    }

    pub fn set_group_fields(&mut self, fields: Vec<String>) -> &mut Self {
        self.group_fields = fields;
        self
    }

    pub fn set_order_field(&mut self, field: &str) -> &mut Self {
        self.order_field = Some(field.to_string());
        self
    }

    /// Omit ORDER BY entirely (used when an outer wrapper applies its own).
    pub fn clear_order_field(&mut self) -> &mut Self {
        self.order_field = None;
        self
    }

    pub fn set_order_direction(&mut self, direction: OrderDirection) -> &mut Self {
        self.order_direction = direction;
        self
    }

    /// `limit = None` means unbounded; the offset is only meaningful with a
    /// limit set.
    pub fn set_limit(&mut self, limit: Option<u64>, offset: u64) -> &mut Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Replace this instance's filter and column-filter state with a deep
    /// copy of another's.
    pub fn copy_filters(&mut self, other: &Self) -> &mut Self {
        self.filters = other.filters.clone();
        self.column_filters = other.column_filters.clone();
        self
    }

    /// Self-exclusion derivation: a deep copy with `name`'s operator buckets
    /// and the operations filter of the same name removed, while every other
    /// active restriction stays in place.
    pub fn without_filter(&self, name: &str) -> Self {
        let mut copy = self.clone();
        copy.reset_filter(name);
        copy.reset_operations_filter(name);
        copy
    }

    pub fn set_initial_population(&mut self, population: FilterCriteria) -> &mut Self {
        self.initial_population = Some(Box::new(population));
        self
    }

    /// Wrap the currently-built state as the FROM-source subquery and reset
    /// the instance so subsequent filters, joins and aggregates apply
    /// against the wrapped population instead of re-scanning the base table.
    ///
    /// The inner query keeps its filters and joins but loses order and
    /// pagination (those stay on the outer query), and is guaranteed to
    /// expose the root primary key column.
    pub fn use_filters_as_initial_population(&mut self) -> &mut Self {
        let mut inner = std::mem::take(self);

        self.limit = inner.limit.take();
        self.offset = inner.offset;
        self.order_field = inner.order_field.take();
        self.order_direction = inner.order_direction;
        inner.offset = 0;
        inner.group_fields.clear();

        if inner.select_fields.is_empty() {
            inner
                .select_fields
                .push(format!("{}.{}", ROOT_ALIAS, ROOT_KEY));
        }

        self.initial_population = Some(Box::new(inner));
        self
    }

    /// True when nothing restricts or shapes the query: no filters on any
    /// channel, no selected columns, no grouping. The planner short-circuits
    /// this to a bare table scan.
    pub fn is_unrestricted(&self) -> bool {
        self.filters.is_empty()
            && self.operations_filters.is_empty()
            && self.column_filters.is_empty()
            && self.select_fields.is_empty()
            && self.group_fields.is_empty()
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn operations_filters(&self) -> &[OperationsFilter] {
        &self.operations_filters
    }

    pub fn column_filters(&self) -> &[ColumnFilter] {
        &self.column_filters
    }

    pub fn select_fields(&self) -> &[String] {
        &self.select_fields
    }

    pub fn group_fields(&self) -> &[String] {
        &self.group_fields
    }

    pub fn order_field(&self) -> Option<&str> {
        self.order_field.as_deref()
    }

    pub fn order_direction(&self) -> OrderDirection {
        self.order_direction
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn initial_population(&self) -> Option<&FilterCriteria> {
        self.initial_population.as_deref()
    }
}
