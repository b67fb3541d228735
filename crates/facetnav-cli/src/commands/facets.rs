//! Facet browsing commands: sidebar, product listing, counting

use std::path::Path;

use anyhow::{Context, Result};
use facetnav_core::db::Database;
use facetnav_core::definitions::{self, default_definitions, load_definitions};
use facetnav_core::FacetCatalog;
use tracing::debug;

use super::core::open_db;
use super::truncate;

/// Build the catalog from a definitions file, or from the defaults plus
/// facets discovered in the database.
pub fn load_catalog(db: Database, config: Option<&Path>) -> Result<FacetCatalog> {
    let definitions = match config {
        Some(path) => load_definitions(path)
            .with_context(|| format!("Failed to load facet definitions from {}", path.display()))?,
        None => {
            let mut defs = default_definitions();
            defs.extend(definitions::discover_definitions(&db)?);
            defs
        }
    };
    debug!(count = definitions.len(), "loaded facet definitions");
    Ok(FacetCatalog::new(db, definitions))
}

pub fn cmd_facets(
    db_path: &Path,
    selection: &str,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let db = open_db(db_path)?;
    let catalog = load_catalog(db, config)?;
    let facets = catalog.compute_facets(selection)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&facets)?);
        return Ok(());
    }

    let total = catalog.count_products(selection)?;
    if selection.is_empty() {
        println!("🧭 {total} products");
    } else {
        println!("🧭 {total} products for \"{selection}\"");
    }

    for facet in &facets {
        println!();
        println!("{} ({})", facet.label, facet.facet_type);
        for filter in &facet.filters {
            let marker = if filter.active { "▣" } else { "▢" };
            println!(
                "   {} {:<32} {:>6}  → {}",
                marker,
                truncate(&filter.label, 32),
                filter.magnitude,
                if filter.next_encoded.is_empty() {
                    "(all)"
                } else {
                    filter.next_encoded.as_str()
                }
            );
        }
    }
    Ok(())
}

pub fn cmd_products(
    db_path: &Path,
    selection: &str,
    config: Option<&Path>,
    limit: u64,
    offset: u64,
    json: bool,
) -> Result<()> {
    let db = open_db(db_path)?;
    let catalog = load_catalog(db, config)?;
    let products = catalog.search_products(selection, limit, offset)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    if products.is_empty() {
        println!("No products match \"{selection}\"");
        return Ok(());
    }

    println!(
        "{:>6}  {:<32} {:<12} {:>10} {:>6}",
        "ID", "Name", "Condition", "Price", "Qty"
    );
    for product in &products {
        println!(
            "{:>6}  {:<32} {:<12} {:>10.2} {:>6}",
            product.product_id,
            truncate(&product.name, 32),
            product.condition.to_string(),
            product.price,
            product.quantity
        );
    }
    Ok(())
}

pub fn cmd_count(db_path: &Path, selection: &str, config: Option<&Path>) -> Result<()> {
    let db = open_db(db_path)?;
    let catalog = load_catalog(db, config)?;
    println!("{}", catalog.count_products(selection)?);
    Ok(())
}
