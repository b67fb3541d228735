//! Domain models for facetnav

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product row from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub reference: Option<String>,
    pub condition: ProductCondition,
    pub weight: f64,
    pub quantity: i64,
    pub price: f64,
    pub manufacturer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Product condition values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCondition {
    New,
    Used,
    Refurbished,
}

impl ProductCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
            Self::Refurbished => "refurbished",
        }
    }
}

impl std::str::FromStr for ProductCondition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "used" => Ok(Self::Used),
            "refurbished" => Ok(Self::Refurbished),
            _ => Err(format!("Unknown product condition: {}", s)),
        }
    }
}

impl std::fmt::Display for ProductCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of filterable dimensions a storefront can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetType {
    Category,
    AttributeGroup,
    Feature,
    Price,
    Weight,
    Quantity,
    Condition,
    Manufacturer,
    Availability,
}

impl FacetType {
    /// Range facets carry a single `[unit, from, to]` selection that
    /// replaces rather than accumulates.
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Price | Self::Weight)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::AttributeGroup => "attribute_group",
            Self::Feature => "feature",
            Self::Price => "price",
            Self::Weight => "weight",
            Self::Quantity => "quantity",
            Self::Condition => "condition",
            Self::Manufacturer => "manufacturer",
            Self::Availability => "availability",
        }
    }
}

impl std::fmt::Display for FacetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Widget used to render a facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetType {
    Radio,
    Checkbox,
    Slider,
}

/// Per-kind facet properties, replacing the original open key/value bag
/// with a checked variant while keeping the serialized shape flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FacetKind {
    Discrete,
    Range { unit: String, min: f64, max: f64 },
}

impl FacetKind {
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }
}

/// The value identity of one filter: a scalar label for discrete facets,
/// or a numeric sub-range for range facets. Exactly one of the two forms
/// defines equality for serialization purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Label(String),
    Range { unit: String, from: f64, to: f64 },
}

/// One selectable value within a facet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetFilter {
    pub label: String,
    pub active: bool,
    pub displayed: bool,
    /// Count of matching products for this value
    pub magnitude: u64,
    pub value: FilterValue,
    /// URL fragment the storefront links to for toggling this filter:
    /// the selection with this filter added if inactive, removed if active.
    pub next_encoded: String,
}

/// A filterable dimension with its remaining valid values, rebuilt on
/// every request from the index tables and the active criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub label: String,
    pub facet_type: FacetType,
    pub displayed: bool,
    pub multiple_selection_allowed: bool,
    pub widget_type: WidgetType,
    #[serde(flatten)]
    pub kind: FacetKind,
    pub filters: Vec<FacetFilter>,
}

impl Facet {
    /// Filters currently marked active, in display order.
    pub fn active_filters(&self) -> impl Iterator<Item = &FacetFilter> {
        self.filters.iter().filter(|f| f.active)
    }
}
