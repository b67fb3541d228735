//! Static field-to-table join mappings
//!
//! Logical field names resolve to the table (and alias) carrying them plus
//! the join needed to reach that table from the root product table. Some
//! joins only make sense once another table is present (`depends_on`), e.g.
//! attribute rows hang off variant-attribute links which hang off variants.
//!
//! The mapping set is validated once at construction: every dependency must
//! resolve and the dependency graph must be acyclic. A missing entry found
//! at planning time is a configuration error and fails fast; silently
//! dropping a join would produce subtly wrong row counts.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Root product table and its fixed alias/primary key. Fields that resolve
/// to no mapping entry qualify against this alias.
pub const ROOT_TABLE: &str = "products";
pub const ROOT_ALIAS: &str = "p";
pub const ROOT_KEY: &str = "product_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// One join descriptor: how to reach the table carrying a logical field.
#[derive(Debug, Clone)]
pub struct JoinMapping {
    pub table: &'static str,
    pub alias: &'static str,
    pub join_type: JoinType,
    /// Join condition referencing already-resolved aliases.
    pub condition: &'static str,
    /// Logical field whose join must be resolved before this one.
    pub depends_on: Option<&'static str>,
}

/// Validated set of field-to-table mappings.
#[derive(Debug, Clone)]
pub struct FieldMappings {
    entries: HashMap<&'static str, JoinMapping>,
}

impl FieldMappings {
    /// Build a mapping set, validating that every `depends_on` resolves and
    /// the dependency graph is acyclic.
    pub fn new(entries: Vec<(&'static str, JoinMapping)>) -> Result<Self> {
        let mappings = Self {
            entries: entries.into_iter().collect(),
        };
        mappings.validate()?;
        Ok(mappings)
    }

    /// The default mapping for the product catalog schema.
    pub fn catalog() -> Self {
        // The schema is fixed, so this cannot fail validation; the
        // expect documents that assumption for anyone editing the table.
        Self::new(vec![
            (
                "variant_id",
                JoinMapping {
                    table: "product_variants",
                    alias: "pv",
                    join_type: JoinType::Left,
                    condition: "pv.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "attribute_id",
                JoinMapping {
                    table: "variant_attributes",
                    alias: "va",
                    join_type: JoinType::Left,
                    condition: "va.variant_id = pv.variant_id",
                    depends_on: Some("variant_id"),
                },
            ),
            (
                "attribute_group_id",
                JoinMapping {
                    table: "attributes",
                    alias: "a",
                    join_type: JoinType::Left,
                    condition: "a.attribute_id = va.attribute_id",
                    depends_on: Some("attribute_id"),
                },
            ),
            (
                "category_id",
                JoinMapping {
                    table: "product_categories",
                    alias: "pc",
                    join_type: JoinType::Inner,
                    condition: "pc.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "feature_id",
                JoinMapping {
                    table: "product_features",
                    alias: "pf",
                    join_type: JoinType::Left,
                    condition: "pf.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "feature_value_id",
                JoinMapping {
                    table: "product_features",
                    alias: "pf",
                    join_type: JoinType::Left,
                    condition: "pf.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "price_min",
                JoinMapping {
                    table: "price_index",
                    alias: "pi",
                    join_type: JoinType::Inner,
                    condition: "pi.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "price_max",
                JoinMapping {
                    table: "price_index",
                    alias: "pi",
                    join_type: JoinType::Inner,
                    condition: "pi.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "range_start",
                JoinMapping {
                    table: "price_index",
                    alias: "pi",
                    join_type: JoinType::Inner,
                    condition: "pi.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "range_end",
                JoinMapping {
                    table: "price_index",
                    alias: "pi",
                    join_type: JoinType::Inner,
                    condition: "pi.product_id = p.product_id",
                    depends_on: None,
                },
            ),
            (
                "currency",
                JoinMapping {
                    table: "price_index",
                    alias: "pi",
                    join_type: JoinType::Inner,
                    condition: "pi.product_id = p.product_id",
                    depends_on: None,
                },
            ),
        ])
        .expect("catalog mapping table must validate")
    }

    pub fn get(&self, field: &str) -> Option<&JoinMapping> {
        self.entries.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Qualify a logical field for use in a rendered clause.
    ///
    /// Fields already containing `.` or `(` are raw expressions and pass
    /// through untouched; unmapped fields qualify against the root alias.
    pub fn qualify(&self, field: &str) -> String {
        if field.contains('.') || field.contains('(') {
            return field.to_string();
        }
        match self.entries.get(field) {
            Some(mapping) => format!("{}.{}", mapping.alias, field),
            None => format!("{ROOT_ALIAS}.{field}"),
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, mapping) in &self.entries {
            let mut seen = vec![*field];
            let mut current = mapping;
            while let Some(dep) = current.depends_on {
                if seen.contains(&dep) {
                    return Err(Error::Mapping(format!(
                        "cyclic join dependency through field '{dep}'"
                    )));
                }
                seen.push(dep);
                current = self.entries.get(dep).ok_or_else(|| {
                    Error::Mapping(format!(
                        "field '{field}' depends on unmapped field '{dep}'"
                    ))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_mapping_validates() {
        let mappings = FieldMappings::catalog();
        assert!(mappings.contains("attribute_group_id"));
        assert_eq!(mappings.get("attribute_id").unwrap().alias, "va");
    }

    #[test]
    fn test_qualify() {
        let mappings = FieldMappings::catalog();
        assert_eq!(mappings.qualify("attribute_id"), "va.attribute_id");
        assert_eq!(mappings.qualify("weight"), "p.weight");
        assert_eq!(mappings.qualify("p.product_id"), "p.product_id");
        assert_eq!(
            mappings.qualify("COUNT(DISTINCT p.product_id) AS c"),
            "COUNT(DISTINCT p.product_id) AS c"
        );
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let result = FieldMappings::new(vec![(
            "attribute_id",
            JoinMapping {
                table: "variant_attributes",
                alias: "va",
                join_type: JoinType::Left,
                condition: "va.variant_id = pv.variant_id",
                depends_on: Some("variant_id"),
            },
        )]);
        assert!(matches!(result, Err(Error::Mapping(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let result = FieldMappings::new(vec![
            (
                "x",
                JoinMapping {
                    table: "tx",
                    alias: "tx",
                    join_type: JoinType::Left,
                    condition: "",
                    depends_on: Some("y"),
                },
            ),
            (
                "y",
                JoinMapping {
                    table: "ty",
                    alias: "ty",
                    join_type: JoinType::Left,
                    condition: "",
                    depends_on: Some("x"),
                },
            ),
        ]);
        assert!(matches!(result, Err(Error::Mapping(_))));
    }
}
