//! CSV catalog import
//!
//! Expected columns:
//! `name,reference,condition,weight,quantity,price,manufacturer,categories,attributes,features`
//!
//! - `categories`: pipe-separated category names (`Tops|Summer`)
//! - `attributes`: pipe-separated `Group:Value` pairs (`Color:Red|Size:M`);
//!   each pair becomes one variant carrying that attribute
//! - `features`: pipe-separated `Name:Value` pairs (`Composition:Cotton`)
//!
//! Lookup rows (categories, groups, attributes, features, manufacturers)
//! are upserted, so re-importing the same file is idempotent for them.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::db::{Database, NewProduct};
use crate::error::{Error, Result};
use crate::models::ProductCondition;

/// Counters for one import run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub products: usize,
    pub categories: usize,
    pub variants: usize,
    pub features: usize,
}

pub fn import_products_from_path(db: &Database, path: &Path) -> Result<ImportStats> {
    let file = File::open(path)?;
    let stats = import_products(db, file)?;
    info!(
        products = stats.products,
        variants = stats.variants,
        path = %path.display(),
        "catalog import complete"
    );
    Ok(stats)
}

/// Import products from CSV data. The price index is not rebuilt here;
/// callers reindex once after all writes.
pub fn import_products<R: Read>(db: &Database, reader: R) -> Result<ImportStats> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut stats = ImportStats::default();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let row = line + 2; // header is line 1

        let name = record
            .get(0)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidData(format!("Row {row}: missing product name")))?
            .to_string();
        let reference = record.get(1).filter(|s| !s.is_empty()).map(str::to_string);
        let condition = match record.get(2).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<ProductCondition>()
                .map_err(|e| Error::InvalidData(format!("Row {row}: {e}")))?,
            None => ProductCondition::New,
        };
        let weight = parse_number(record.get(3), 0.0, row, "weight")?;
        let quantity = parse_number(record.get(4), 0.0, row, "quantity")? as i64;
        let price = parse_number(record.get(5), 0.0, row, "price")?;

        let manufacturer_id = match record.get(6).filter(|s| !s.is_empty()) {
            Some(manufacturer) => Some(db.upsert_manufacturer(manufacturer)?),
            None => None,
        };

        let product_id = db.insert_product(&NewProduct {
            name,
            reference,
            condition,
            weight,
            quantity,
            price,
            manufacturer_id,
            out_of_stock_allowed: false,
        })?;
        stats.products += 1;

        for category in split_list(record.get(7)) {
            let category_id = db.upsert_category(category, None)?;
            db.link_product_category(product_id, category_id)?;
            stats.categories += 1;
        }

        for pair in split_list(record.get(8)) {
            let (group, value) = split_pair(pair, row, "attribute")?;
            let group_id = db.upsert_attribute_group(group)?;
            let attribute_id = db.upsert_attribute(group_id, value)?;
            let variant_id = db.add_variant(product_id)?;
            db.link_variant_attribute(variant_id, attribute_id)?;
            stats.variants += 1;
        }

        for pair in split_list(record.get(9)) {
            let (feature, value) = split_pair(pair, row, "feature")?;
            let feature_id = db.upsert_feature(feature)?;
            let feature_value_id = db.upsert_feature_value(feature_id, value)?;
            db.link_product_feature(product_id, feature_id, feature_value_id)?;
            stats.features += 1;
        }
    }

    debug!(products = stats.products, "parsed catalog CSV");
    Ok(stats)
}

fn parse_number(raw: Option<&str>, default: f64, row: usize, column: &str) -> Result<f64> {
    match raw.filter(|s| !s.is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::InvalidData(format!("Row {row}: invalid {column} '{value}'"))),
        None => Ok(default),
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or("")
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn split_pair<'a>(raw: &'a str, row: usize, what: &str) -> Result<(&'a str, &'a str)> {
    raw.split_once(':')
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .ok_or_else(|| {
            Error::InvalidData(format!(
                "Row {row}: {what} '{raw}' is not a Name:Value pair"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
name,reference,condition,weight,quantity,price,manufacturer,categories,attributes,features
Shirt,SH-01,new,0.2,5,10.50,Acme,Tops|Summer,Color:Red|Color:Blue,Composition:Cotton
Blouse,,used,0.3,0,20,,Tops,Color:Red,
Gown,GW-77,new,0.5,2,40,Acme,Robes,,Composition:Silk|Styles:Formal
";

    #[test]
    fn test_import_sample_catalog() {
        let db = Database::in_memory().unwrap();
        let stats = import_products(&db, SAMPLE.as_bytes()).unwrap();

        assert_eq!(
            stats,
            ImportStats {
                products: 3,
                categories: 4,
                variants: 3,
                features: 3,
            }
        );

        // Lookup rows deduplicate across products.
        assert_eq!(db.attribute_groups().unwrap().len(), 1);
        assert_eq!(db.features().unwrap().len(), 2);
        assert_eq!(db.category_ids_by_name(&["Tops".to_string()]).unwrap().len(), 1);
    }

    #[test]
    fn test_import_is_idempotent_for_lookups() {
        let db = Database::in_memory().unwrap();
        import_products(&db, SAMPLE.as_bytes()).unwrap();
        import_products(&db, SAMPLE.as_bytes()).unwrap();

        // Products duplicate (no natural key), lookups must not.
        assert_eq!(db.attribute_groups().unwrap().len(), 1);
        assert_eq!(db.features().unwrap().len(), 2);
        assert_eq!(db.category_ids_by_name(&["Summer".to_string()]).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_name_is_an_error() {
        let db = Database::in_memory().unwrap();
        let csv = "name,reference,condition\n,X,new\n";
        let result = import_products(&db, csv.as_bytes());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_malformed_attribute_pair() {
        let db = Database::in_memory().unwrap();
        let csv = "\
name,reference,condition,weight,quantity,price,manufacturer,categories,attributes,features
Shirt,,new,0,1,10,,Tops,JustRed,
";
        let result = import_products(&db, csv.as_bytes());
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_defaults_for_optional_columns() {
        let db = Database::in_memory().unwrap();
        let csv = "name,reference\nMinimal,\n";
        let stats = import_products(&db, csv.as_bytes()).unwrap();
        assert_eq!(stats.products, 1);
    }
}
