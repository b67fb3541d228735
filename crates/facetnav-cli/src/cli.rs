//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Facetnav - faceted navigation engine for product catalogs
#[derive(Parser)]
#[command(name = "facetnav")]
#[command(about = "Faceted navigation engine for product catalogs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "facetnav.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import products from CSV and rebuild the price index
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Currency for the rebuilt price index
        #[arg(long, default_value = "EUR")]
        currency: String,
    },

    /// Rebuild the price range index
    Reindex {
        /// Currency to reindex
        #[arg(long, default_value = "EUR")]
        currency: String,
    },

    /// Compute the facet sidebar for a selection
    Facets {
        /// Encoded selection fragment (e.g. "Categories-Tops/Price-€-7-9")
        #[arg(default_value = "")]
        selection: String,

        /// Facet definitions TOML (defaults plus discovered facets if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List products matching a selection
    Products {
        /// Encoded selection fragment
        #[arg(default_value = "")]
        selection: String,

        /// Facet definitions TOML (defaults plus discovered facets if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of products to list
        #[arg(short, long, default_value = "20")]
        limit: u64,

        /// Number of products to skip
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Count products matching a selection
    Count {
        /// Encoded selection fragment
        #[arg(default_value = "")]
        selection: String,

        /// Facet definitions TOML (defaults plus discovered facets if omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
