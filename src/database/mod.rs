/*!
 * Database module for persistent translation memories.
 *
 * This module provides SQLite-based persistence for:
 * - Translation memories identified by slug
 * - Translation units and their per-language variants
 * - A paging document supply that exports memories as TMX
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;
pub mod source;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{ImportStats, TmTransUnitVariantRecord, TmTranslationUnitRecord, TransMemoryRecord};
pub use repository::Repository;
pub use source::TransMemorySource;
