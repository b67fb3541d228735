//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `products` - catalog rows (products, categories, attributes, features,
//!   manufacturers) and the price range index
//!
//! The faceted navigation core only *reads* these tables; the insert and
//! reindex helpers exist so the CLI and tests can seed a catalog.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod products;

pub use products::NewProduct;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool and run migrations.
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each
    /// pooled connection would otherwise see its own empty in-memory
    /// database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/facetnav_test_{}.db", id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Performance pragmas for a read-mostly catalog index
            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory (faster for grouped facet queries)
            PRAGMA temp_store = MEMORY;

            -- Manufacturers (brands)
            CREATE TABLE IF NOT EXISTS manufacturers (
                manufacturer_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Categories (tree via parent_id)
            CREATE TABLE IF NOT EXISTS categories (
                category_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                parent_id INTEGER REFERENCES categories(category_id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(name, parent_id)
            );

            CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);

            -- Products (root table of every facet query)
            CREATE TABLE IF NOT EXISTS products (
                product_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                reference TEXT,
                condition TEXT NOT NULL DEFAULT 'new',     -- new, used, refurbished
                weight REAL NOT NULL DEFAULT 0,
                quantity INTEGER NOT NULL DEFAULT 0,
                price REAL NOT NULL DEFAULT 0,
                manufacturer_id INTEGER REFERENCES manufacturers(manufacturer_id),
                out_of_stock_allowed BOOLEAN NOT NULL DEFAULT 0,  -- orderable at zero stock
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_products_condition ON products(condition);
            CREATE INDEX IF NOT EXISTS idx_products_manufacturer ON products(manufacturer_id);
            CREATE INDEX IF NOT EXISTS idx_products_active ON products(active);

            -- Product-Category junction (many-to-many)
            CREATE TABLE IF NOT EXISTS product_categories (
                product_id INTEGER NOT NULL REFERENCES products(product_id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(category_id) ON DELETE CASCADE,
                PRIMARY KEY (product_id, category_id)
            );

            CREATE INDEX IF NOT EXISTS idx_product_categories_category ON product_categories(category_id);

            -- Attribute groups (e.g. Color, Size)
            CREATE TABLE IF NOT EXISTS attribute_groups (
                attribute_group_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Attributes (e.g. Red, Blue, S, M)
            CREATE TABLE IF NOT EXISTS attributes (
                attribute_id INTEGER PRIMARY KEY,
                attribute_group_id INTEGER NOT NULL REFERENCES attribute_groups(attribute_group_id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                UNIQUE(attribute_group_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_attributes_group ON attributes(attribute_group_id);

            -- Product variants (one sellable combination per row)
            CREATE TABLE IF NOT EXISTS product_variants (
                variant_id INTEGER PRIMARY KEY,
                product_id INTEGER NOT NULL REFERENCES products(product_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_variants_product ON product_variants(product_id);

            -- Variant-Attribute junction
            CREATE TABLE IF NOT EXISTS variant_attributes (
                variant_id INTEGER NOT NULL REFERENCES product_variants(variant_id) ON DELETE CASCADE,
                attribute_id INTEGER NOT NULL REFERENCES attributes(attribute_id) ON DELETE CASCADE,
                PRIMARY KEY (variant_id, attribute_id)
            );

            CREATE INDEX IF NOT EXISTS idx_variant_attributes_attribute ON variant_attributes(attribute_id);

            -- Features (e.g. Composition, Styles)
            CREATE TABLE IF NOT EXISTS features (
                feature_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Feature values (e.g. Cotton, Casual)
            CREATE TABLE IF NOT EXISTS feature_values (
                feature_value_id INTEGER PRIMARY KEY,
                feature_id INTEGER NOT NULL REFERENCES features(feature_id) ON DELETE CASCADE,
                value TEXT NOT NULL,
                UNIQUE(feature_id, value)
            );

            CREATE INDEX IF NOT EXISTS idx_feature_values_feature ON feature_values(feature_id);

            -- Product-Feature junction
            CREATE TABLE IF NOT EXISTS product_features (
                product_id INTEGER NOT NULL REFERENCES products(product_id) ON DELETE CASCADE,
                feature_id INTEGER NOT NULL REFERENCES features(feature_id) ON DELETE CASCADE,
                feature_value_id INTEGER NOT NULL REFERENCES feature_values(feature_value_id) ON DELETE CASCADE,
                PRIMARY KEY (product_id, feature_value_id)
            );

            CREATE INDEX IF NOT EXISTS idx_product_features_value ON product_features(feature_value_id);
            CREATE INDEX IF NOT EXISTS idx_product_features_feature ON product_features(feature_id);

            -- Price range index, keyed by product + currency. Maintained by
            -- the reindex helper; read-only for the query core.
            CREATE TABLE IF NOT EXISTS price_index (
                product_id INTEGER NOT NULL REFERENCES products(product_id) ON DELETE CASCADE,
                currency TEXT NOT NULL DEFAULT 'EUR',
                price_min REAL NOT NULL,
                price_max REAL NOT NULL,
                range_start REAL NOT NULL,
                range_end REAL NOT NULL,
                PRIMARY KEY (product_id, currency)
            );

            CREATE INDEX IF NOT EXISTS idx_price_index_range ON price_index(range_start, range_end);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
