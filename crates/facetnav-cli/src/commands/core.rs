//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_reindex` - Rebuild the price range index

use std::path::Path;

use anyhow::{Context, Result};
use facetnav_core::db::Database;

/// Open the database, running migrations on first use.
pub fn open_db(db_path: &Path) -> Result<Database> {
    Database::new(&db_path.to_string_lossy()).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import a catalog: facetnav import --file catalog.csv");
    println!("  2. Browse the sidebar: facetnav facets");

    Ok(())
}

pub fn cmd_reindex(db_path: &Path, currency: &str) -> Result<()> {
    println!("🔨 Rebuilding price index for {currency}...");

    let db = open_db(db_path)?;
    let indexed = db
        .rebuild_price_index(currency)
        .context("Failed to rebuild price index")?;

    println!("✅ Indexed {indexed} products");
    Ok(())
}
