//! Catalog row operations: products, categories, attributes, features,
//! manufacturers, and the price range index.

use std::collections::HashMap;

use rusqlite::params;
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Product, ProductCondition};

/// Fields for inserting a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub reference: Option<String>,
    pub condition: ProductCondition,
    pub weight: f64,
    pub quantity: i64,
    pub price: f64,
    pub manufacturer_id: Option<i64>,
    pub out_of_stock_allowed: bool,
}

impl Default for NewProduct {
    fn default() -> Self {
        Self {
            name: String::new(),
            reference: None,
            condition: ProductCondition::New,
            weight: 0.0,
            quantity: 0,
            price: 0.0,
            manufacturer_id: None,
            out_of_stock_allowed: false,
        }
    }
}

impl Database {
    pub fn insert_product(&self, product: &NewProduct) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO products (name, reference, condition, weight, quantity, price, manufacturer_id, out_of_stock_allowed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                product.name,
                product.reference,
                product.condition.as_str(),
                product.weight,
                product.quantity,
                product.price,
                product.manufacturer_id,
                product.out_of_stock_allowed,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a manufacturer, or return the existing id for the same name.
    pub fn upsert_manufacturer(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        if let Some(id) = conn
            .query_row(
                "SELECT manufacturer_id FROM manufacturers WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .ok()
        {
            return Ok(id);
        }
        conn.execute("INSERT INTO manufacturers (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a category under an optional parent, or return the existing id.
    pub fn upsert_category(&self, name: &str, parent_id: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT category_id FROM categories WHERE name = ?1 AND parent_id IS ?2",
                params![name, parent_id],
                |row| row.get::<_, i64>(0),
            )
            .ok();
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO categories (name, parent_id) VALUES (?1, ?2)",
            params![name, parent_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn upsert_attribute_group(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT attribute_group_id FROM attribute_groups WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .ok();
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO attribute_groups (name) VALUES (?1)",
            params![name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn upsert_attribute(&self, attribute_group_id: i64, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT attribute_id FROM attributes WHERE attribute_group_id = ?1 AND name = ?2",
                params![attribute_group_id, name],
                |row| row.get::<_, i64>(0),
            )
            .ok();
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO attributes (attribute_group_id, name) VALUES (?1, ?2)",
            params![attribute_group_id, name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn upsert_feature(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT feature_id FROM features WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .ok();
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute("INSERT INTO features (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn upsert_feature_value(&self, feature_id: i64, value: &str) -> Result<i64> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT feature_value_id FROM feature_values WHERE feature_id = ?1 AND value = ?2",
                params![feature_id, value],
                |row| row.get::<_, i64>(0),
            )
            .ok();
        if let Some(id) = existing {
            return Ok(id);
        }
        conn.execute(
            "INSERT INTO feature_values (feature_id, value) VALUES (?1, ?2)",
            params![feature_id, value],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn link_product_category(&self, product_id: i64, category_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO product_categories (product_id, category_id) VALUES (?1, ?2)",
            params![product_id, category_id],
        )?;
        Ok(())
    }

    pub fn add_variant(&self, product_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO product_variants (product_id) VALUES (?1)",
            params![product_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn link_variant_attribute(&self, variant_id: i64, attribute_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO variant_attributes (variant_id, attribute_id) VALUES (?1, ?2)",
            params![variant_id, attribute_id],
        )?;
        Ok(())
    }

    pub fn link_product_feature(
        &self,
        product_id: i64,
        feature_id: i64,
        feature_value_id: i64,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO product_features (product_id, feature_id, feature_value_id) VALUES (?1, ?2, ?3)",
            params![product_id, feature_id, feature_value_id],
        )?;
        Ok(())
    }

    /// Rebuild the price range index for one currency from the products
    /// table. Real deployments feed this from a pricing pipeline; here the
    /// indexed min/max both come from the list price and ranges are bucketed
    /// to tens.
    pub fn rebuild_price_index(&self, currency: &str) -> Result<usize> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM price_index WHERE currency = ?1",
            params![currency],
        )?;
        let indexed = conn.execute(
            "INSERT INTO price_index (product_id, currency, price_min, price_max, range_start, range_end)
             SELECT product_id, ?1, price, price,
                    CAST(price / 10 AS INTEGER) * 10,
                    CAST(price / 10 AS INTEGER) * 10 + 10
             FROM products WHERE active = 1",
            params![currency],
        )?;
        info!(indexed, currency, "price index rebuilt");
        Ok(indexed)
    }

    /// Map catalog ids to display labels for one lookup table.
    fn labels_by_id(&self, sql: &str, ids: &[i64]) -> Result<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.conn()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = conn.prepare(&sql.replace("{ids}", &placeholders))?;
        let refs: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(refs.as_slice(), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = HashMap::new();
        for row in rows {
            let (id, label) = row?;
            map.insert(id, label);
        }
        Ok(map)
    }

    pub fn category_labels(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        self.labels_by_id(
            "SELECT category_id, name FROM categories WHERE category_id IN ({ids})",
            ids,
        )
    }

    pub fn manufacturer_labels(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        self.labels_by_id(
            "SELECT manufacturer_id, name FROM manufacturers WHERE manufacturer_id IN ({ids})",
            ids,
        )
    }

    pub fn attribute_labels(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        self.labels_by_id(
            "SELECT attribute_id, name FROM attributes WHERE attribute_id IN ({ids})",
            ids,
        )
    }

    pub fn feature_value_labels(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        self.labels_by_id(
            "SELECT feature_value_id, value FROM feature_values WHERE feature_value_id IN ({ids})",
            ids,
        )
    }

    /// Resolve display labels to ids for one lookup table, silently
    /// dropping labels that no longer exist (stale bookmarked selections
    /// must not fail the page).
    fn ids_by_label(&self, sql: &str, scope: Option<i64>, labels: &[String]) -> Result<Vec<i64>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let placeholders = vec!["?"; labels.len()].join(", ");
        let mut stmt = conn.prepare(&sql.replace("{labels}", &placeholders))?;
        let mut refs: Vec<&dyn rusqlite::ToSql> = Vec::new();
        if let Some(ref scope_id) = scope {
            refs.push(scope_id as &dyn rusqlite::ToSql);
        }
        refs.extend(labels.iter().map(|l| l as &dyn rusqlite::ToSql));
        let rows = stmt.query_map(refs.as_slice(), |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    pub fn category_ids_by_name(&self, names: &[String]) -> Result<Vec<i64>> {
        self.ids_by_label(
            "SELECT category_id FROM categories WHERE name IN ({labels})",
            None,
            names,
        )
    }

    pub fn manufacturer_ids_by_name(&self, names: &[String]) -> Result<Vec<i64>> {
        self.ids_by_label(
            "SELECT manufacturer_id FROM manufacturers WHERE name IN ({labels})",
            None,
            names,
        )
    }

    pub fn attribute_ids_by_label(&self, group_id: i64, labels: &[String]) -> Result<Vec<i64>> {
        self.ids_by_label(
            "SELECT attribute_id FROM attributes WHERE attribute_group_id = ? AND name IN ({labels})",
            Some(group_id),
            labels,
        )
    }

    pub fn feature_value_ids_by_label(
        &self,
        feature_id: i64,
        labels: &[String],
    ) -> Result<Vec<i64>> {
        self.ids_by_label(
            "SELECT feature_value_id FROM feature_values WHERE feature_id = ? AND value IN ({labels})",
            Some(feature_id),
            labels,
        )
    }

    /// All attribute groups, ordered by id (used for facet discovery).
    pub fn attribute_groups(&self) -> Result<Vec<(i64, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT attribute_group_id, name FROM attribute_groups ORDER BY attribute_group_id",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// All features, ordered by id (used for facet discovery).
    pub fn features(&self) -> Result<Vec<(i64, String)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT feature_id, name FROM features ORDER BY feature_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Map a full product row (aliased `p.*`) into the view model.
    pub(crate) fn product_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
        Ok(Product {
            product_id: row.get("product_id")?,
            name: row.get("name")?,
            reference: row.get("reference")?,
            condition: row
                .get::<_, String>("condition")?
                .parse()
                .unwrap_or(ProductCondition::New),
            weight: row.get("weight")?,
            quantity: row.get("quantity")?,
            price: row.get("price")?,
            manufacturer_id: row.get("manufacturer_id")?,
            created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        })
    }
}
