//! Facet definitions: which dimensions the sidebar offers
//!
//! Definitions come from three sources, merged by the CLI:
//! 1. Built-in defaults (category, price, condition, manufacturer,
//!    availability, weight)
//! 2. An optional TOML override file
//! 3. Discovery from the catalog itself (one facet per attribute group
//!    and per feature)
//!
//! The order of the list is the display order of the sidebar.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{FacetType, WidgetType};

/// Number of buckets a range facet asks the aggregation engine for when
/// the definition does not say otherwise.
pub const DEFAULT_RANGE_BUCKETS: u32 = 10;

/// Configuration record for one facet
#[derive(Debug, Clone, PartialEq)]
pub struct FacetDefinition {
    pub label: String,
    pub facet_type: FacetType,
    pub displayed: bool,
    pub multiple_selection_allowed: bool,
    pub widget_type: WidgetType,
    /// Unit symbol for range facets (currency sign, weight unit)
    pub unit: Option<String>,
    /// Hard bounds for range facets; discovered from data when absent
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Requested bucket count for range facets
    pub buckets: u32,
    /// Attribute group or feature this facet scopes to
    pub group_id: Option<i64>,
}

impl FacetDefinition {
    fn discrete(label: &str, facet_type: FacetType) -> Self {
        Self {
            label: label.to_string(),
            facet_type,
            displayed: true,
            multiple_selection_allowed: true,
            widget_type: WidgetType::Checkbox,
            unit: None,
            min: None,
            max: None,
            buckets: DEFAULT_RANGE_BUCKETS,
            group_id: None,
        }
    }

    fn range(label: &str, facet_type: FacetType, unit: &str) -> Self {
        Self {
            label: label.to_string(),
            facet_type,
            displayed: true,
            multiple_selection_allowed: false,
            widget_type: WidgetType::Slider,
            unit: Some(unit.to_string()),
            min: None,
            max: None,
            buckets: DEFAULT_RANGE_BUCKETS,
            group_id: None,
        }
    }

    /// The logical field this facet filters on. Attribute facets filter on
    /// attribute ids (the group scoping is structural), feature facets on
    /// feature value ids.
    pub fn field(&self) -> &'static str {
        match self.facet_type {
            FacetType::Category => "category_id",
            FacetType::AttributeGroup => "attribute_id",
            FacetType::Feature => "feature_value_id",
            FacetType::Price => "price",
            FacetType::Weight => "weight",
            FacetType::Quantity => "quantity",
            FacetType::Condition => "condition",
            FacetType::Manufacturer => "manufacturer_id",
            FacetType::Availability => "quantity",
        }
    }
}

/// The stock sidebar, in display order.
pub fn default_definitions() -> Vec<FacetDefinition> {
    vec![
        FacetDefinition::discrete("Categories", FacetType::Category),
        FacetDefinition {
            multiple_selection_allowed: false,
            widget_type: WidgetType::Radio,
            ..FacetDefinition::discrete("Availability", FacetType::Availability)
        },
        FacetDefinition::discrete("Condition", FacetType::Condition),
        FacetDefinition::discrete("Brand", FacetType::Manufacturer),
        FacetDefinition::range("Price", FacetType::Price, "€"),
        FacetDefinition::range("Weight", FacetType::Weight, "kg"),
    ]
}

/// One facet per attribute group and per feature found in the catalog,
/// labeled by the group/feature name.
pub fn discover_definitions(db: &Database) -> Result<Vec<FacetDefinition>> {
    let mut definitions = Vec::new();
    for (group_id, name) in db.attribute_groups()? {
        definitions.push(FacetDefinition {
            group_id: Some(group_id),
            ..FacetDefinition::discrete(&name, FacetType::AttributeGroup)
        });
    }
    for (feature_id, name) in db.features()? {
        definitions.push(FacetDefinition {
            group_id: Some(feature_id),
            ..FacetDefinition::discrete(&name, FacetType::Feature)
        });
    }
    debug!(count = definitions.len(), "discovered facet definitions");
    Ok(definitions)
}

/// Load definitions from a TOML file.
pub fn load_definitions(path: &Path) -> Result<Vec<FacetDefinition>> {
    let content = fs::read_to_string(path)?;
    parse_definitions(&content)
}

/// Raw structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawDefinitions {
    #[serde(default)]
    facet: Vec<RawFacet>,
}

#[derive(Debug, Deserialize)]
struct RawFacet {
    label: String,
    #[serde(rename = "type")]
    facet_type: FacetType,
    displayed: Option<bool>,
    multiple_selection: Option<bool>,
    widget: Option<WidgetType>,
    unit: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    buckets: Option<u32>,
    group_id: Option<i64>,
}

/// Parse definitions from TOML content.
fn parse_definitions(content: &str) -> Result<Vec<FacetDefinition>> {
    let raw: RawDefinitions = toml::from_str(content)?;

    let mut definitions = Vec::with_capacity(raw.facet.len());
    for facet in raw.facet {
        let is_range = facet.facet_type.is_range();
        if is_range && facet.unit.is_none() {
            return Err(Error::Config(format!(
                "Facet '{}' is a range type and needs a unit",
                facet.label
            )));
        }
        if facet.facet_type == FacetType::AttributeGroup || facet.facet_type == FacetType::Feature {
            if facet.group_id.is_none() {
                return Err(Error::Config(format!(
                    "Facet '{}' needs a group_id to scope it",
                    facet.label
                )));
            }
        }

        let default_widget = if is_range {
            WidgetType::Slider
        } else {
            WidgetType::Checkbox
        };
        definitions.push(FacetDefinition {
            label: facet.label,
            facet_type: facet.facet_type,
            displayed: facet.displayed.unwrap_or(true),
            multiple_selection_allowed: facet.multiple_selection.unwrap_or(!is_range),
            widget_type: facet.widget.unwrap_or(default_widget),
            unit: facet.unit,
            min: facet.min,
            max: facet.max,
            buckets: facet.buckets.unwrap_or(DEFAULT_RANGE_BUCKETS),
            group_id: facet.group_id,
        });
    }
    Ok(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_definitions_order_and_types() {
        let defs = default_definitions();
        assert_eq!(defs[0].facet_type, FacetType::Category);
        assert!(defs.iter().any(|d| d.facet_type == FacetType::Price));
        let price = defs
            .iter()
            .find(|d| d.facet_type == FacetType::Price)
            .unwrap();
        assert_eq!(price.unit.as_deref(), Some("€"));
        assert_eq!(price.widget_type, WidgetType::Slider);
        assert!(!price.multiple_selection_allowed);
    }

    #[test]
    fn test_parse_toml_definitions() {
        let defs = parse_definitions(
            r#"
            [[facet]]
            label = "Categories"
            type = "category"

            [[facet]]
            label = "Price"
            type = "price"
            unit = "$"
            min = 0.0
            max = 500.0
            buckets = 5

            [[facet]]
            label = "Color"
            type = "attribute_group"
            group_id = 3
            widget = "radio"
            multiple_selection = false
            "#,
        )
        .unwrap();

        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].field(), "category_id");
        assert!(defs[0].multiple_selection_allowed);

        assert_eq!(defs[1].unit.as_deref(), Some("$"));
        assert_eq!(defs[1].buckets, 5);
        assert_eq!(defs[1].max, Some(500.0));

        assert_eq!(defs[2].group_id, Some(3));
        assert_eq!(defs[2].widget_type, WidgetType::Radio);
        assert_eq!(defs[2].field(), "attribute_id");
    }

    #[test]
    fn test_range_facet_requires_unit() {
        let result = parse_definitions(
            r#"
            [[facet]]
            label = "Weight"
            type = "weight"
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_attribute_facet_requires_group() {
        let result = parse_definitions(
            r#"
            [[facet]]
            label = "Color"
            type = "attribute_group"
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_definitions_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facets.toml");
        std::fs::write(
            &path,
            "[[facet]]\nlabel = \"Categories\"\ntype = \"category\"\n",
        )
        .unwrap();

        let defs = load_definitions(&path).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].label, "Categories");

        assert!(load_definitions(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_discover_from_catalog() {
        let db = Database::in_memory().unwrap();
        let color = db.upsert_attribute_group("Color").unwrap();
        db.upsert_feature("Composition").unwrap();

        let defs = discover_definitions(&db).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].label, "Color");
        assert_eq!(defs[0].facet_type, FacetType::AttributeGroup);
        assert_eq!(defs[0].group_id, Some(color));
        assert_eq!(defs[1].label, "Composition");
        assert_eq!(defs[1].facet_type, FacetType::Feature);
    }
}
