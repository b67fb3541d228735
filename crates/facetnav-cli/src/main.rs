//! Facetnav CLI - faceted navigation over a product catalog
//!
//! Usage:
//!   facetnav init                           Initialize database
//!   facetnav import --file catalog.csv      Import products and reindex
//!   facetnav facets "Categories-Tops"       Compute the filter sidebar
//!   facetnav products "Color-Red" -l 10     List matching products

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import { file, currency } => commands::cmd_import(&cli.db, &file, &currency),
        Commands::Reindex { currency } => commands::cmd_reindex(&cli.db, &currency),
        Commands::Facets {
            selection,
            config,
            json,
        } => commands::cmd_facets(&cli.db, &selection, config.as_deref(), json),
        Commands::Products {
            selection,
            config,
            limit,
            offset,
            json,
        } => commands::cmd_products(&cli.db, &selection, config.as_deref(), limit, offset, json),
        Commands::Count { selection, config } => {
            commands::cmd_count(&cli.db, &selection, config.as_deref())
        }
    }
}
