//! Integration tests for facetnav-core
//!
//! These tests exercise the full import → reindex → browse workflow: a CSV
//! catalog goes in, the price index is rebuilt, and the facet sidebar,
//! toggle links and product search come out.

use facetnav_core::{
    db::Database,
    definitions::{default_definitions, discover_definitions},
    encoding,
    import::import_products,
    models::FacetType,
    FacetCatalog,
};

/// Small boutique catalog: two categories, one attribute group, one
/// feature, two brands, prices spanning 10 to 45.
fn boutique_csv() -> &'static str {
    r#"name,reference,condition,weight,quantity,price,manufacturer,categories,attributes,features
Plain Shirt,SH-01,new,0.2,8,10,Studio Eight,Tops,Color:White|Color:Black,Composition:Cotton
Striped Shirt,SH-02,new,0.2,4,14,Studio Eight,Tops,Color:Blue,Composition:Cotton
Silk Blouse,BL-01,new,0.1,0,29,Maison Noire,Tops,Color:Black,Composition:Silk
Evening Robe,RB-01,used,0.6,2,45,Maison Noire,Robes,Color:Black,Composition:Silk
Summer Robe,RB-02,new,0.4,6,22,,Robes,Color:White,Composition:Cotton"#
}

fn seeded_catalog() -> FacetCatalog {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    import_products(&db, boutique_csv().as_bytes()).expect("Failed to import CSV");
    db.rebuild_price_index("EUR").expect("Failed to reindex");

    let mut definitions = default_definitions();
    definitions.extend(discover_definitions(&db).unwrap());
    FacetCatalog::new(db, definitions)
}

#[test]
fn test_full_import_workflow() {
    let catalog = seeded_catalog();

    assert_eq!(catalog.count_products("").unwrap(), 5);

    let facets = catalog.compute_facets("").unwrap();
    // Defaults plus the discovered Color and Composition facets.
    assert!(facets.iter().any(|f| f.label == "Color"));
    assert!(facets.iter().any(|f| f.label == "Composition"));

    let color = facets.iter().find(|f| f.label == "Color").unwrap();
    let black = color.filters.iter().find(|f| f.label == "Black").unwrap();
    assert_eq!(black.magnitude, 3);
}

#[test]
fn test_drill_down_narrows_counts() {
    let catalog = seeded_catalog();

    // Select Tops, then follow the Black toggle link like a storefront
    // visitor would.
    let facets = catalog.compute_facets("Categories-Tops").unwrap();
    let color = facets.iter().find(|f| f.label == "Color").unwrap();
    let black = color.filters.iter().find(|f| f.label == "Black").unwrap();
    assert_eq!(black.magnitude, 2); // Plain Shirt, Silk Blouse
    assert!(!black.active);

    let next = &black.next_encoded;
    assert_eq!(catalog.count_products(next).unwrap(), 2);

    // On the drilled-down page the filter is now active and its toggle
    // link goes back to the previous state.
    let facets = catalog.compute_facets(next).unwrap();
    let color = facets.iter().find(|f| f.label == "Color").unwrap();
    let black = color.filters.iter().find(|f| f.label == "Black").unwrap();
    assert!(black.active);
    assert_eq!(
        encoding::unserialize(&black.next_encoded),
        encoding::unserialize("Categories-Tops")
    );
}

#[test]
fn test_price_facet_reflects_reindexed_values() {
    let catalog = seeded_catalog();
    let facets = catalog.compute_facets("").unwrap();

    let price = facets
        .iter()
        .find(|f| f.facet_type == FacetType::Price)
        .unwrap();
    assert!(price.kind.is_range());
    let total: u64 = price.filters.iter().map(|f| f.magnitude).sum();
    assert_eq!(total, 5);
}

#[test]
fn test_selection_survives_encode_decode() {
    let catalog = seeded_catalog();
    let fragment = "Categories-Tops/Color-Black/Price-€-10-30";

    let decoded = encoding::unserialize(fragment);
    assert_eq!(encoding::serialize(&decoded), fragment);

    // Black tops priced within the range: Plain Shirt and Silk Blouse.
    assert_eq!(catalog.count_products(fragment).unwrap(), 2);
    let products = catalog.search_products(fragment, 10, 0).unwrap();
    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Plain Shirt", "Silk Blouse"]);
}

#[test]
fn test_stale_bookmark_degrades_gracefully() {
    let catalog = seeded_catalog();

    // A facet group that no longer exists and a vanished category label:
    // the remaining valid filter still applies.
    let fragment = "Discontinued-Thing/Categories-Gone-Robes";
    assert_eq!(catalog.count_products(fragment).unwrap(), 2);
    let facets = catalog.compute_facets(fragment).unwrap();
    assert!(!facets.is_empty());
}
