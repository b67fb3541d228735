//! Renders one SQL statement from a criteria snapshot
//!
//! Join planning contract: the join set is computed by scanning select
//! fields, then filter keys, then group fields, then the order field, in
//! that order. Dependencies resolve transitively before the entry's own
//! join, and a table is joined at most once per query (keyed by table
//! name) no matter how many fields reference it.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::query::criteria::{FilterCriteria, OperatorBucket};
use crate::query::mapping::{FieldMappings, JoinMapping, ROOT_ALIAS, ROOT_TABLE};
use crate::query::value::SqlValue;

/// A rendered statement: SQL text with `?` placeholders plus the values to
/// bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlQuery {
    /// Parameter references for query execution.
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p as &dyn rusqlite::ToSql).collect()
    }
}

/// Stateless renderer over a validated mapping set.
pub struct QueryPlanner<'a> {
    mappings: &'a FieldMappings,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(mappings: &'a FieldMappings) -> Self {
        Self { mappings }
    }

    /// Render the criteria to a single SELECT statement.
    pub fn render(&self, criteria: &FilterCriteria) -> Result<SqlQuery> {
        let mut params = Vec::new();
        let from = self.render_from(criteria, &mut params)?;

        // Fast path: nothing restricts or shapes the query, so skip join
        // planning and grouping entirely.
        if criteria.is_unrestricted() {
            let mut sql = format!("SELECT * FROM {from}");
            self.append_order(criteria, &mut sql);
            self.append_limit(criteria, &mut sql);
            return Ok(SqlQuery { sql, params });
        }

        let joins = self.collect_joins(criteria)?;

        let select = if criteria.select_fields().is_empty() {
            "*".to_string()
        } else {
            criteria
                .select_fields()
                .iter()
                .map(|f| self.mappings.qualify(f))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {select} FROM {from}");
        for join in &joins {
            sql.push_str(&format!(
                " {} {} {} ON {}",
                join.join_type.as_sql(),
                join.table,
                join.alias,
                join.condition
            ));
        }

        let conditions = self.render_where(criteria, &mut params);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !criteria.group_fields().is_empty() {
            let group = criteria
                .group_fields()
                .iter()
                .map(|f| self.mappings.qualify(f))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" GROUP BY {group}"));
        }

        self.append_order(criteria, &mut sql);
        self.append_limit(criteria, &mut sql);

        Ok(SqlQuery { sql, params })
    }

    /// FROM source: the base product table, or the wrapped initial
    /// population rendered recursively. Population params come first since
    /// the subquery precedes the outer WHERE clause in the statement.
    fn render_from(&self, criteria: &FilterCriteria, params: &mut Vec<SqlValue>) -> Result<String> {
        match criteria.initial_population() {
            Some(population) => {
                let inner = self.render(population)?;
                params.extend(inner.params);
                Ok(format!("({}) {ROOT_ALIAS}", inner.sql))
            }
            None => Ok(format!("{ROOT_TABLE} {ROOT_ALIAS}")),
        }
    }

    /// Compute the ordered, deduplicated join list for the criteria.
    fn collect_joins(&self, criteria: &FilterCriteria) -> Result<Vec<&'a JoinMapping>> {
        let mut joins = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for field in criteria.select_fields() {
            self.add_field_joins(field, &mut joins, &mut seen)?;
        }
        for filter in criteria.filters() {
            self.add_field_joins(&filter.field, &mut joins, &mut seen)?;
        }
        for field in criteria.group_fields() {
            self.add_field_joins(field, &mut joins, &mut seen)?;
        }
        if let Some(field) = criteria.order_field() {
            self.add_field_joins(field, &mut joins, &mut seen)?;
        }

        Ok(joins)
    }

    fn add_field_joins(
        &self,
        field: &str,
        joins: &mut Vec<&'a JoinMapping>,
        seen: &mut HashSet<&'a str>,
    ) -> Result<()> {
        // Raw expressions are pre-qualified; they never introduce joins.
        if field.contains('.') || field.contains('(') {
            return Ok(());
        }
        let Some(mapping) = self.mappings.get(field) else {
            // Unmapped fields live on the root table.
            return Ok(());
        };
        self.resolve_mapping(field, mapping, joins, seen)
    }

    fn resolve_mapping(
        &self,
        field: &str,
        mapping: &'a JoinMapping,
        joins: &mut Vec<&'a JoinMapping>,
        seen: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if let Some(dep) = mapping.depends_on {
            let dep_mapping = self.mappings.get(dep).ok_or_else(|| {
                Error::Mapping(format!(
                    "field '{field}' depends on unmapped field '{dep}'"
                ))
            })?;
            self.resolve_mapping(dep, dep_mapping, joins, seen)?;
        }
        if seen.insert(mapping.table) {
            joins.push(mapping);
        }
        Ok(())
    }

    /// WHERE composition: field filters, then column filters, then
    /// operations filters, all ANDed.
    fn render_where(&self, criteria: &FilterCriteria, params: &mut Vec<SqlValue>) -> Vec<String> {
        let mut conditions = Vec::new();

        for filter in criteria.filters() {
            let expr = self.mappings.qualify(&filter.field);
            for bucket in &filter.buckets {
                self.render_bucket(&expr, bucket, &mut conditions, params);
            }
        }

        for column in criteria.column_filters() {
            let expr = self.mappings.qualify(&column.column);
            if let Some(cond) = render_condition(&expr, &column.operator, &column.values, params) {
                conditions.push(cond);
            }
        }

        for ops in criteria.operations_filters() {
            let mut groups = Vec::new();
            for group in &ops.groups {
                let mut parts = Vec::new();
                for cond in group {
                    let expr = self.mappings.qualify(&cond.field);
                    if let Some(rendered) =
                        render_condition(&expr, &cond.operator, &cond.values, params)
                    {
                        parts.push(rendered);
                    }
                }
                if !parts.is_empty() {
                    groups.push(format!("({})", parts.join(" AND ")));
                }
            }
            if !groups.is_empty() {
                conditions.push(format!("({})", groups.join(" OR ")));
            }
        }

        conditions
    }

    fn render_bucket(
        &self,
        expr: &str,
        bucket: &OperatorBucket,
        conditions: &mut Vec<String>,
        params: &mut Vec<SqlValue>,
    ) {
        for values in &bucket.value_lists {
            if let Some(cond) = render_condition(expr, &bucket.operator, values, params) {
                conditions.push(cond);
            }
        }
    }

    fn append_order(&self, criteria: &FilterCriteria, sql: &mut String) {
        if let Some(field) = criteria.order_field() {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                self.mappings.qualify(field),
                criteria.order_direction().as_sql()
            ));
        }
    }

    fn append_limit(&self, criteria: &FilterCriteria, sql: &mut String) {
        // Always the `offset, limit` form, even at offset 0.
        if let Some(limit) = criteria.limit() {
            sql.push_str(&format!(" LIMIT {}, {}", criteria.offset(), limit));
        }
    }
}

/// Render one condition for an operator and value list.
///
/// `=` with a single value is an equality, `=` with several an IN list, any
/// other operator renders per value and ORs the results. An empty value
/// list renders nothing (decoding is defensive; a vanished value set must
/// not poison the query).
fn render_condition(
    expr: &str,
    operator: &str,
    values: &[SqlValue],
    params: &mut Vec<SqlValue>,
) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    if operator == "=" {
        if values.len() == 1 {
            params.push(values[0].clone());
            return Some(format!("{expr} = ?"));
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        params.extend(values.iter().cloned());
        return Some(format!("{expr} IN ({placeholders})"));
    }
    let parts: Vec<String> = values
        .iter()
        .map(|v| {
            params.push(v.clone());
            format!("{expr} {operator} ?")
        })
        .collect();
    if parts.len() == 1 {
        Some(parts.into_iter().next().unwrap())
    } else {
        Some(format!("({})", parts.join(" OR ")))
    }
}
