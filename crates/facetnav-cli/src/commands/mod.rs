//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, reindex) and shared utilities (open_db)
//! - `facets` - Facet browsing commands (facets, products, count)
//! - `import` - Catalog CSV import command

pub mod core;
pub mod facets;
pub mod import;

// Re-export command functions for main.rs
pub use core::*;
pub use facets::*;
pub use import::*;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated. Counts characters rather than bytes so multi-byte labels
/// never get cut mid-character.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
