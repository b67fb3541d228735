//! Facet catalog orchestration
//!
//! Ties the pieces together for one request: decode the active selection
//! fragment, build criteria from it, run one aggregate per facet with that
//! facet's own filter excluded, and emit render-ready `Facet` objects with
//! precomputed toggle links.
//!
//! A facet that fails to compute (bad definition, aggregate error) is
//! logged and omitted; a degraded sidebar beats a failed page. The main
//! product queries propagate errors normally.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::db::Database;
use crate::definitions::FacetDefinition;
use crate::encoding::{self, FacetFilterMap};
use crate::error::{Error, Result};
use crate::models::{Facet, FacetFilter, FacetKind, FacetType, FilterValue, Product};
use crate::query::aggregate::AggregationEngine;
use crate::query::criteria::{FilterCondition, FilterCriteria};
use crate::query::mapping::{FieldMappings, ROOT_ALIAS};
use crate::query::planner::QueryPlanner;
use crate::query::value::SqlValue;

/// Availability buckets, in display order.
const AVAILABILITY_LABELS: [&str; 3] = ["In stock", "Available", "Not available"];

pub struct FacetCatalog {
    db: Database,
    mappings: FieldMappings,
    definitions: Vec<FacetDefinition>,
}

impl FacetCatalog {
    pub fn new(db: Database, definitions: Vec<FacetDefinition>) -> Self {
        Self {
            db,
            mappings: FieldMappings::catalog(),
            definitions,
        }
    }

    pub fn definitions(&self) -> &[FacetDefinition] {
        &self.definitions
    }

    /// Compute the full sidebar for one request.
    pub fn compute_facets(&self, fragment: &str) -> Result<Vec<Facet>> {
        let selection = encoding::unserialize(fragment);
        debug!(groups = selection.len(), "computing facets");

        let mut facets = Vec::new();
        for def in &self.definitions {
            if !def.displayed {
                continue;
            }
            match self.compute_facet(def, &selection) {
                Ok(Some(facet)) => facets.push(facet),
                Ok(None) => {}
                Err(err) => warn!(facet = %def.label, %err, "skipping facet"),
            }
        }
        Ok(facets)
    }

    /// Criteria reflecting the whole active selection.
    pub fn build_criteria(&self, selection: &FacetFilterMap) -> Result<FilterCriteria> {
        self.build_criteria_excluding(selection, None)
    }

    /// Products matching the selection, deduplicated and paginated.
    pub fn search_products(
        &self,
        fragment: &str,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Product>> {
        let selection = encoding::unserialize(fragment);
        let mut criteria = self.build_criteria(&selection)?;
        criteria
            .set_select_fields(vec!["p.*".to_string()])
            .add_group_by("product_id")
            .set_order_field("product_id")
            .set_limit(Some(limit), offset);

        let query = QueryPlanner::new(&self.mappings).render(&criteria)?;
        debug!(sql = %query.sql, "product search");
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&query.sql)?;
        let rows = stmt.query_map(query.params_refs().as_slice(), |row| {
            Database::product_from_row(row)
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Number of distinct products matching the selection.
    pub fn count_products(&self, fragment: &str) -> Result<u64> {
        let selection = encoding::unserialize(fragment);
        let criteria = self.build_criteria(&selection)?;
        AggregationEngine::new(&self.db, &self.mappings).count(&criteria)
    }

    /// Criteria for every facet's selection except (optionally) one label.
    /// Skipping the facet being counted is what implements self-exclusion:
    /// rebuilding from the selection removes exactly that facet's
    /// predicates, including paired bounds and operations filters.
    fn build_criteria_excluding(
        &self,
        selection: &FacetFilterMap,
        exclude: Option<&str>,
    ) -> Result<FilterCriteria> {
        let mut criteria = FilterCriteria::new();
        criteria.add_column_filter("active", vec![SqlValue::Int(1)], "=");
        for def in &self.definitions {
            if exclude == Some(def.label.as_str()) {
                continue;
            }
            let Some(values) = selection.get(&def.label) else {
                continue;
            };
            self.apply_selection(&mut criteria, def, values)?;
        }
        Ok(criteria)
    }

    /// Translate one facet's selected labels into criteria predicates.
    /// Labels that no longer resolve are dropped silently so stale
    /// bookmarks still load.
    ///
    /// Facets restricting through a joined table each seal the criteria
    /// built so far into a population layer first: one joined row (a
    /// variant attribute, a feature link) can never satisfy two facets'
    /// conditions at once, so stacking conditions onto a single join would
    /// empty every cross-facet combination.
    fn apply_selection(
        &self,
        criteria: &mut FilterCriteria,
        def: &FacetDefinition,
        values: &[String],
    ) -> Result<()> {
        match def.facet_type {
            FacetType::Category => {
                let ids = self.db.category_ids_by_name(values)?;
                add_joined_id_filter(criteria, "category_id", ids);
            }
            FacetType::Manufacturer => {
                let ids = self.db.manufacturer_ids_by_name(values)?;
                add_id_filter(criteria, "manufacturer_id", ids);
            }
            FacetType::AttributeGroup => {
                let ids = self.db.attribute_ids_by_label(scope_id(def)?, values)?;
                add_joined_id_filter(criteria, "attribute_id", ids);
            }
            FacetType::Feature => {
                let ids = self.db.feature_value_ids_by_label(scope_id(def)?, values)?;
                add_joined_id_filter(criteria, "feature_value_id", ids);
            }
            FacetType::Condition => {
                let valid: Vec<SqlValue> = values
                    .iter()
                    .filter(|v| v.parse::<crate::models::ProductCondition>().is_ok())
                    .map(|v| SqlValue::Text(v.clone()))
                    .collect();
                if !valid.is_empty() {
                    criteria.add_filter("condition", valid, "=");
                }
            }
            FacetType::Quantity => {
                let valid: Vec<SqlValue> = values
                    .iter()
                    .filter_map(|v| v.parse::<i64>().ok().map(SqlValue::Int))
                    .collect();
                if !valid.is_empty() {
                    criteria.add_filter("quantity", valid, "=");
                }
            }
            FacetType::Price => {
                if let Some((from, to)) = parse_range_tokens(values) {
                    // Both bounds must hold on the same indexed price row,
                    // so they share one layer.
                    push_layer(criteria);
                    criteria
                        .add_filter("price_min", vec![SqlValue::Float(from)], ">=")
                        .add_filter("price_max", vec![SqlValue::Float(to)], "<=");
                }
            }
            FacetType::Weight => {
                if let Some((from, to)) = parse_range_tokens(values) {
                    criteria
                        .add_filter("weight", vec![SqlValue::Float(from)], ">=")
                        .add_filter("weight", vec![SqlValue::Float(to)], "<=");
                }
            }
            FacetType::Availability => {
                // Radio semantics: only the first recognized label applies.
                if let Some(groups) = values.iter().find_map(|v| availability_groups(v)) {
                    criteria.add_operations_filter("availability", groups);
                }
            }
        }
        Ok(())
    }

    fn compute_facet(
        &self,
        def: &FacetDefinition,
        selection: &FacetFilterMap,
    ) -> Result<Option<Facet>> {
        let excluded = self.build_criteria_excluding(selection, Some(&def.label))?;
        let engine = AggregationEngine::new(&self.db, &self.mappings);
        match def.facet_type {
            FacetType::Price | FacetType::Weight => {
                self.compute_range_facet(def, selection, &engine, &excluded)
            }
            FacetType::Availability => {
                self.compute_availability_facet(def, selection, &engine, &excluded)
            }
            _ => self.compute_discrete_facet(def, selection, &engine, excluded),
        }
    }

    fn compute_discrete_facet(
        &self,
        def: &FacetDefinition,
        selection: &FacetFilterMap,
        engine: &AggregationEngine<'_>,
        mut criteria: FilterCriteria,
    ) -> Result<Option<Facet>> {
        // Attribute and feature facets scope structurally to their group;
        // the scope is part of the facet's identity, not a user filter. The
        // scope gets its own layer because the excluded criteria may already
        // end in a layer carrying another group's condition on the same
        // join.
        match def.facet_type {
            FacetType::AttributeGroup => {
                push_layer(&mut criteria);
                criteria.add_filter("attribute_group_id", vec![SqlValue::Int(scope_id(def)?)], "=");
            }
            FacetType::Feature => {
                push_layer(&mut criteria);
                criteria.add_filter("feature_id", vec![SqlValue::Int(scope_id(def)?)], "=");
            }
            _ => {}
        }

        let counts = engine.value_counts(&criteria, def.field())?;

        let ids: Vec<i64> = counts
            .iter()
            .filter_map(|vc| match vc.value {
                SqlValue::Int(id) => Some(id),
                _ => None,
            })
            .collect();
        let labels = self.value_labels(def, &ids)?;

        let mut entries: Vec<(String, u64)> = Vec::new();
        for vc in &counts {
            let label = match (&vc.value, def.facet_type) {
                (SqlValue::Int(id), FacetType::Category)
                | (SqlValue::Int(id), FacetType::Manufacturer)
                | (SqlValue::Int(id), FacetType::AttributeGroup)
                | (SqlValue::Int(id), FacetType::Feature) => match labels.get(id) {
                    Some(label) => label.clone(),
                    // Row vanished between the aggregate and the lookup.
                    None => continue,
                },
                _ => vc.value.display(),
            };
            entries.push((label, vc.count));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let empty: &[String] = &[];
        let selected = selection.get(&def.label).unwrap_or(empty);
        // Selected labels no other filter matches anymore still render,
        // with a zero count, so the remove link stays reachable.
        for label in selected {
            if !entries.iter().any(|(l, _)| l == label) {
                entries.push((label.clone(), 0));
            }
        }

        let mut facet = self.facet_shell(def, FacetKind::Discrete);
        for (label, magnitude) in entries {
            let active = selected.contains(&label);
            let mut filter = FacetFilter {
                label: label.clone(),
                active,
                displayed: true,
                magnitude,
                value: FilterValue::Label(label),
                next_encoded: String::new(),
            };
            filter.next_encoded = self.toggle_fragment(selection, &facet, &filter);
            facet.filters.push(filter);
        }
        Ok(Some(facet))
    }

    fn compute_range_facet(
        &self,
        def: &FacetDefinition,
        selection: &FacetFilterMap,
        engine: &AggregationEngine<'_>,
        excluded: &FilterCriteria,
    ) -> Result<Option<Facet>> {
        let Some((found_min, found_max)) = engine.min_max(excluded, def.field())? else {
            // Empty population: nothing to slide over.
            return Ok(None);
        };
        let unit = def.unit.clone().unwrap_or_default();
        let min = def.min.unwrap_or(found_min);
        let max = def.max.unwrap_or(found_max);

        let mut facet = self.facet_shell(
            def,
            FacetKind::Range {
                unit: unit.clone(),
                min,
                max,
            },
        );

        let active_range = selection.get(&def.label).and_then(parse_range_tokens);
        let buckets = engine.field_ranges(excluded, def.field(), def.buckets)?;

        if buckets.is_empty() {
            // Degenerate spread: flatten to one bucket over the whole span.
            let magnitude = engine.count(excluded)?;
            self.push_range_filter(
                selection,
                &mut facet,
                &unit,
                found_min,
                found_max,
                magnitude,
                range_matches(active_range, found_min, found_max),
            );
        } else {
            for bucket in &buckets {
                self.push_range_filter(
                    selection,
                    &mut facet,
                    &unit,
                    bucket.range_start,
                    bucket.range_end,
                    bucket.count,
                    range_matches(active_range, bucket.range_start, bucket.range_end),
                );
            }
        }

        // A custom selected sub-range (from a slider drag) that aligns with
        // no bucket still needs an active entry carrying the remove link.
        if let Some((from, to)) = active_range {
            if !facet.filters.iter().any(|f| f.active) {
                let full = self.build_criteria_excluding(selection, None)?;
                let magnitude = engine.count(&full)?;
                self.push_range_filter(selection, &mut facet, &unit, from, to, magnitude, true);
            }
        }

        Ok(Some(facet))
    }

    fn compute_availability_facet(
        &self,
        def: &FacetDefinition,
        selection: &FacetFilterMap,
        engine: &AggregationEngine<'_>,
        excluded: &FilterCriteria,
    ) -> Result<Option<Facet>> {
        let empty: &[String] = &[];
        let selected = selection.get(&def.label).unwrap_or(empty);

        let mut facet = self.facet_shell(def, FacetKind::Discrete);
        for label in AVAILABILITY_LABELS {
            let Some(groups) = availability_groups(label) else {
                continue;
            };
            let mut criteria = excluded.clone();
            criteria.add_operations_filter("availability", groups);
            let magnitude = engine.count(&criteria)?;

            let mut filter = FacetFilter {
                label: label.to_string(),
                active: selected.iter().any(|s| s == label),
                displayed: true,
                magnitude,
                value: FilterValue::Label(label.to_string()),
                next_encoded: String::new(),
            };
            filter.next_encoded = self.toggle_fragment(selection, &facet, &filter);
            facet.filters.push(filter);
        }
        Ok(Some(facet))
    }

    fn facet_shell(&self, def: &FacetDefinition, kind: FacetKind) -> Facet {
        Facet {
            label: def.label.clone(),
            facet_type: def.facet_type,
            displayed: def.displayed,
            multiple_selection_allowed: def.multiple_selection_allowed,
            widget_type: def.widget_type,
            kind,
            filters: Vec::new(),
        }
    }

    fn push_range_filter(
        &self,
        selection: &FacetFilterMap,
        facet: &mut Facet,
        unit: &str,
        from: f64,
        to: f64,
        magnitude: u64,
        active: bool,
    ) {
        let mut filter = FacetFilter {
            label: format!(
                "{unit}{} - {unit}{}",
                encoding::format_number(from),
                encoding::format_number(to)
            ),
            active,
            displayed: true,
            magnitude,
            value: FilterValue::Range {
                unit: unit.to_string(),
                from,
                to,
            },
            next_encoded: String::new(),
        };
        filter.next_encoded = self.toggle_fragment(selection, facet, &filter);
        facet.filters.push(filter);
    }

    /// URL fragment for toggling one filter: the selection with the filter
    /// removed if it is active, added otherwise.
    fn toggle_fragment(
        &self,
        selection: &FacetFilterMap,
        facet: &Facet,
        filter: &FacetFilter,
    ) -> String {
        let next = if filter.active {
            encoding::remove_filter_from_map(selection, facet, filter)
        } else {
            encoding::add_filter_to_map(selection, facet, filter)
        };
        encoding::serialize(&next)
    }

    fn value_labels(&self, def: &FacetDefinition, ids: &[i64]) -> Result<HashMap<i64, String>> {
        match def.facet_type {
            FacetType::Category => self.db.category_labels(ids),
            FacetType::Manufacturer => self.db.manufacturer_labels(ids),
            FacetType::AttributeGroup => self.db.attribute_labels(ids),
            FacetType::Feature => self.db.feature_value_labels(ids),
            _ => Ok(HashMap::new()),
        }
    }
}

fn scope_id(def: &FacetDefinition) -> Result<i64> {
    def.group_id.ok_or_else(|| {
        Error::Config(format!("Facet '{}' has no group scope", def.label))
    })
}

fn add_id_filter(criteria: &mut FilterCriteria, field: &str, ids: Vec<i64>) {
    if ids.is_empty() {
        return;
    }
    criteria.add_filter(field, ids.into_iter().map(SqlValue::Int).collect(), "=");
}

/// Like `add_id_filter` for fields reached through a join: the restriction
/// applies to the population the earlier facets produced, in its own layer.
fn add_joined_id_filter(criteria: &mut FilterCriteria, field: &str, ids: Vec<i64>) {
    if ids.is_empty() {
        return;
    }
    push_layer(criteria);
    criteria.add_filter(field, ids.into_iter().map(SqlValue::Int).collect(), "=");
}

/// Seal the criteria built so far into a population layer. The layer
/// exposes every product column, so later layers and root-column filters
/// keep working against the wrapped result.
fn push_layer(criteria: &mut FilterCriteria) {
    criteria.set_select_fields(vec![format!("{ROOT_ALIAS}.*")]);
    criteria.use_filters_as_initial_population();
}

/// `[unit, from, to]` triple from a decoded selection group.
fn parse_range_tokens(values: &[String]) -> Option<(f64, f64)> {
    if values.len() != 3 {
        return None;
    }
    let from = values[1].parse().ok()?;
    let to = values[2].parse().ok()?;
    Some((from, to))
}

fn range_matches(active: Option<(f64, f64)>, from: f64, to: f64) -> bool {
    match active {
        Some((a, b)) => (a - from).abs() < f64::EPSILON && (b - to).abs() < f64::EPSILON,
        None => false,
    }
}

/// OR-of-AND groups for one availability bucket. Stock semantics: a
/// product is orderable when it has quantity or explicitly allows
/// ordering out of stock.
fn availability_groups(label: &str) -> Option<Vec<Vec<FilterCondition>>> {
    match label {
        "In stock" => Some(vec![vec![FilterCondition::new(
            "quantity",
            vec![SqlValue::Int(0)],
            ">",
        )]]),
        "Available" => Some(vec![
            vec![FilterCondition::new("quantity", vec![SqlValue::Int(0)], ">")],
            vec![FilterCondition::new(
                "out_of_stock_allowed",
                vec![SqlValue::Int(1)],
                "=",
            )],
        ]),
        "Not available" => Some(vec![vec![
            FilterCondition::new("quantity", vec![SqlValue::Int(0)], "<="),
            FilterCondition::new("out_of_stock_allowed", vec![SqlValue::Int(0)], "="),
        ]]),
        _ => None,
    }
}
