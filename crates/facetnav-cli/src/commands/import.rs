//! Catalog CSV import command

use std::path::Path;

use anyhow::{Context, Result};
use facetnav_core::import::import_products_from_path;

use super::core::open_db;

pub fn cmd_import(db_path: &Path, file: &Path, currency: &str) -> Result<()> {
    println!("📦 Importing catalog from {}...", file.display());

    let db = open_db(db_path)?;
    let stats = import_products_from_path(&db, file).context("Import failed")?;
    let indexed = db
        .rebuild_price_index(currency)
        .context("Failed to rebuild price index")?;

    println!("   Products:       {}", stats.products);
    println!("   Category links: {}", stats.categories);
    println!("   Variants:       {}", stats.variants);
    println!("   Feature links:  {}", stats.features);
    println!("✅ Import complete ({indexed} products indexed for {currency})");
    Ok(())
}
