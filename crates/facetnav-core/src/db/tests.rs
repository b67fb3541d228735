use super::*;
use crate::db::NewProduct;
use crate::models::ProductCondition;

#[test]
fn test_migrations_create_schema() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN (
                'products', 'categories', 'product_categories', 'manufacturers',
                'attribute_groups', 'attributes', 'product_variants',
                'variant_attributes', 'features', 'feature_values',
                'product_features', 'price_index')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 12);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::in_memory().unwrap();
    // Reopening the same file re-runs migrations against existing tables.
    let reopened = Database::new(db.path()).unwrap();
    assert!(reopened.conn().is_ok());
}

#[test]
fn test_insert_product_defaults() {
    let db = Database::in_memory().unwrap();
    let id = db
        .insert_product(&NewProduct {
            name: "Shirt".to_string(),
            ..Default::default()
        })
        .unwrap();

    let conn = db.conn().unwrap();
    let (condition, active): (String, bool) = conn
        .query_row(
            "SELECT condition, active FROM products WHERE product_id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(condition, "new");
    assert!(active);
}

#[test]
fn test_upserts_are_idempotent() {
    let db = Database::in_memory().unwrap();

    assert_eq!(
        db.upsert_manufacturer("Acme").unwrap(),
        db.upsert_manufacturer("Acme").unwrap()
    );

    let color = db.upsert_attribute_group("Color").unwrap();
    assert_eq!(color, db.upsert_attribute_group("Color").unwrap());
    assert_eq!(
        db.upsert_attribute(color, "Red").unwrap(),
        db.upsert_attribute(color, "Red").unwrap()
    );

    let composition = db.upsert_feature("Composition").unwrap();
    assert_eq!(
        db.upsert_feature_value(composition, "Cotton").unwrap(),
        db.upsert_feature_value(composition, "Cotton").unwrap()
    );
}

#[test]
fn test_category_uniqueness_is_scoped_to_parent() {
    let db = Database::in_memory().unwrap();
    let clothes = db.upsert_category("Clothes", None).unwrap();
    let accessories = db.upsert_category("Accessories", None).unwrap();

    // "New" under two different parents gives two rows.
    let a = db.upsert_category("New", Some(clothes)).unwrap();
    let b = db.upsert_category("New", Some(accessories)).unwrap();
    assert_ne!(a, b);

    // Same name under the same parent reuses the row.
    assert_eq!(a, db.upsert_category("New", Some(clothes)).unwrap());
}

#[test]
fn test_link_helpers_ignore_duplicates() {
    let db = Database::in_memory().unwrap();
    let product = db
        .insert_product(&NewProduct {
            name: "Shirt".to_string(),
            ..Default::default()
        })
        .unwrap();
    let tops = db.upsert_category("Tops", None).unwrap();

    db.link_product_category(product, tops).unwrap();
    db.link_product_category(product, tops).unwrap();

    let conn = db.conn().unwrap();
    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM product_categories", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(links, 1);
}

#[test]
fn test_rebuild_price_index() {
    let db = Database::in_memory().unwrap();
    for price in [12.0, 37.5] {
        db.insert_product(&NewProduct {
            name: format!("P{price}"),
            price,
            ..Default::default()
        })
        .unwrap();
    }
    // Inactive products are not indexed.
    let inactive = db
        .insert_product(&NewProduct {
            name: "Hidden".to_string(),
            price: 99.0,
            ..Default::default()
        })
        .unwrap();
    let conn = db.conn().unwrap();
    conn.execute(
        "UPDATE products SET active = 0 WHERE product_id = ?1",
        [inactive],
    )
    .unwrap();
    drop(conn);

    assert_eq!(db.rebuild_price_index("EUR").unwrap(), 2);

    let conn = db.conn().unwrap();
    let (start, end): (f64, f64) = conn
        .query_row(
            "SELECT range_start, range_end FROM price_index WHERE price_min = 37.5",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(start, 30.0);
    assert_eq!(end, 40.0);

    // Rebuilding replaces rather than accumulates.
    assert_eq!(db.rebuild_price_index("EUR").unwrap(), 2);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM price_index", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn test_label_and_id_resolution() {
    let db = Database::in_memory().unwrap();
    let tops = db.upsert_category("Tops", None).unwrap();
    let robes = db.upsert_category("Robes", None).unwrap();

    let labels = db.category_labels(&[tops, robes]).unwrap();
    assert_eq!(labels.get(&tops).map(String::as_str), Some("Tops"));
    assert_eq!(labels.get(&robes).map(String::as_str), Some("Robes"));

    // Stale labels resolve to nothing instead of failing.
    let ids = db
        .category_ids_by_name(&["Tops".to_string(), "Gone".to_string()])
        .unwrap();
    assert_eq!(ids, vec![tops]);

    assert!(db.category_labels(&[]).unwrap().is_empty());
    assert!(db.category_ids_by_name(&[]).unwrap().is_empty());
}

#[test]
fn test_scoped_attribute_resolution() {
    let db = Database::in_memory().unwrap();
    let color = db.upsert_attribute_group("Color").unwrap();
    let size = db.upsert_attribute_group("Size").unwrap();
    let red = db.upsert_attribute(color, "Red").unwrap();
    db.upsert_attribute(size, "Red").unwrap(); // same label, other group

    let ids = db
        .attribute_ids_by_label(color, &["Red".to_string()])
        .unwrap();
    assert_eq!(ids, vec![red]);
}

#[test]
fn test_parse_datetime_formats() {
    let parsed = parse_datetime("2026-08-30 12:34:56");
    assert_eq!(parsed.to_string(), "2026-08-30 12:34:56 UTC");
    // Garbage falls back to now rather than failing a row read.
    let fallback = parse_datetime("not a date");
    assert!(fallback.timestamp() > 0);
}
