/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for translation-memory storage,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::Document;

use super::connection::DatabaseConnection;
use super::models::{
    ImportStats, TmTransUnitVariantRecord, TmTranslationUnitRecord, TmUnitWithVariants,
    TransMemoryRecord,
};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// The underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Translation Memory Operations
    // =========================================================================

    /// Create a translation memory, returning its database ID
    pub async fn create_trans_memory(&self, tm: &TransMemoryRecord) -> Result<i64> {
        let tm = tm.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO trans_memories (slug, name, description, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![tm.slug, tm.name, tm.description, tm.created_at, tm.updated_at],
                )
                .with_context(|| format!("Failed to create translation memory '{}'", tm.slug))?;
                let id = conn.last_insert_rowid();
                info!("Created translation memory {} (id {})", tm, id);
                Ok(id)
            })
            .await
    }

    /// Get a translation memory by its slug
    pub async fn get_trans_memory(&self, slug: &str) -> Result<Option<TransMemoryRecord>> {
        let slug = slug.to_string();

        self.db
            .execute_async(move |conn| Self::get_trans_memory_sync(conn, &slug))
            .await
    }

    /// Get a translation memory by slug (synchronous version for use within transactions)
    pub(crate) fn get_trans_memory_sync(
        conn: &Connection,
        slug: &str,
    ) -> Result<Option<TransMemoryRecord>> {
        let result = conn
            .query_row(
                r#"
                SELECT id, slug, name, description, created_at, updated_at
                FROM trans_memories WHERE slug = ?1
                "#,
                [slug],
                Self::trans_memory_from_row,
            )
            .optional()?;

        Ok(result)
    }

    /// List all translation memories ordered by slug
    pub async fn list_trans_memories(&self) -> Result<Vec<TransMemoryRecord>> {
        self.db
            .execute_async(|conn| Self::list_trans_memories_sync(conn))
            .await
    }

    pub(crate) fn list_trans_memories_sync(conn: &Connection) -> Result<Vec<TransMemoryRecord>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, slug, name, description, created_at, updated_at
            FROM trans_memories ORDER BY slug
            "#,
        )?;

        let memories = stmt
            .query_map([], Self::trans_memory_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(memories)
    }

    /// Delete a translation memory with its units and variants
    ///
    /// Returns `false` when no translation memory has that slug.
    pub async fn delete_trans_memory(&self, slug: &str) -> Result<bool> {
        let slug = slug.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM trans_memories WHERE slug = ?1", [&slug])?;
                if deleted > 0 {
                    info!("Deleted translation memory '{}'", slug);
                }
                Ok(deleted > 0)
            })
            .await
    }

    fn trans_memory_from_row(row: &Row<'_>) -> rusqlite::Result<TransMemoryRecord> {
        Ok(TransMemoryRecord {
            id: row.get(0)?,
            slug: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn require_trans_memory_id(conn: &Connection, slug: &str) -> Result<i64> {
        Self::get_trans_memory_sync(conn, slug)?
            .map(|tm| tm.id)
            .ok_or_else(|| anyhow!("Translation memory not found: {}", slug))
    }

    fn touch_trans_memory(conn: &Connection, tm_id: i64) -> Result<()> {
        conn.execute(
            "UPDATE trans_memories SET updated_at = ?1 WHERE id = ?2",
            params![chrono::Utc::now().to_rfc3339(), tm_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Translation Unit Operations
    // =========================================================================

    /// Add translation units to a translation memory in one transaction
    ///
    /// Returns the database IDs of the inserted units, in input order.
    pub async fn add_translation_units(
        &self,
        tm_slug: &str,
        units: &[TmTranslationUnitRecord],
    ) -> Result<Vec<i64>> {
        let tm_slug = tm_slug.to_string();
        let units = units.to_vec();

        self.db
            .transaction_async(move |tx| {
                let tm_id = Self::require_trans_memory_id(tx, &tm_slug)?;
                let mut ids = Vec::with_capacity(units.len());

                {
                    let mut stmt = tx.prepare(
                        r#"
                        INSERT INTO tm_translation_units (tm_id, trans_unit_id, source_language, created_at)
                        VALUES (?1, ?2, ?3, ?4)
                        "#,
                    )?;

                    for unit in &units {
                        stmt.execute(params![
                            tm_id,
                            unit.trans_unit_id,
                            unit.source_language,
                            unit.created_at,
                        ])
                        .with_context(|| {
                            format!("Failed to add unit '{}' to '{}'", unit.trans_unit_id, tm_slug)
                        })?;
                        ids.push(tx.last_insert_rowid());
                    }
                }

                Self::touch_trans_memory(tx, tm_id)?;
                debug!("Added {} units to translation memory '{}'", ids.len(), tm_slug);
                Ok(ids)
            })
            .await
    }

    /// Get all translation units of a translation memory ordered by ID
    pub async fn get_translation_units(&self, tm_slug: &str) -> Result<Vec<TmTranslationUnitRecord>> {
        let tm_slug = tm_slug.to_string();

        self.db
            .execute_async(move |conn| {
                let tm_id = Self::require_trans_memory_id(conn, &tm_slug)?;
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, tm_id, trans_unit_id, source_language, created_at
                    FROM tm_translation_units WHERE tm_id = ?1 ORDER BY id
                    "#,
                )?;

                let units = stmt
                    .query_map([tm_id], Self::unit_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(units)
            })
            .await
    }

    fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<TmTranslationUnitRecord> {
        Ok(TmTranslationUnitRecord {
            id: row.get(0)?,
            tm_id: row.get(1)?,
            trans_unit_id: row.get(2)?,
            source_language: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// Read one page of units after `after_id`, each with its variants
    ///
    /// Keyset pagination keeps every page query an index range scan.
    pub(crate) fn get_unit_page_sync(
        conn: &Connection,
        tm_id: i64,
        after_id: i64,
        limit: usize,
    ) -> Result<Vec<TmUnitWithVariants>> {
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT u.id, u.tm_id, u.trans_unit_id, u.source_language, u.created_at,
                   v.id, v.language, v.content, v.content_hash
            FROM (
                SELECT id, tm_id, trans_unit_id, source_language, created_at
                FROM tm_translation_units
                WHERE tm_id = ?1 AND id > ?2
                ORDER BY id
                LIMIT ?3
            ) u
            LEFT JOIN tm_trans_unit_variants v ON v.tu_id = u.id
            ORDER BY u.id, v.language
            "#,
        )?;

        let mut rows = stmt.query(params![tm_id, after_id, limit as i64])?;
        let mut page: Vec<TmUnitWithVariants> = Vec::new();

        while let Some(row) = rows.next()? {
            let unit_id: i64 = row.get(0)?;
            if page.last().is_none_or(|last| last.unit.id != unit_id) {
                page.push(TmUnitWithVariants {
                    unit: Self::unit_from_row(row)?,
                    variants: Vec::new(),
                });
            }

            let variant_id: Option<i64> = row.get(5)?;
            if let (Some(id), Some(current)) = (variant_id, page.last_mut()) {
                current.variants.push(TmTransUnitVariantRecord {
                    id,
                    tu_id: unit_id,
                    language: row.get(6)?,
                    content: row.get(7)?,
                    content_hash: row.get(8)?,
                });
            }
        }

        Ok(page)
    }

    // =========================================================================
    // Variant Operations
    // =========================================================================

    /// Insert or replace variants of a unit, keyed by language
    pub async fn put_variants(&self, unit_id: i64, variants: &[TmTransUnitVariantRecord]) -> Result<()> {
        let variants = variants.to_vec();

        self.db
            .transaction_async(move |tx| Self::put_variants_sync(tx, unit_id, &variants))
            .await
    }

    fn put_variants_sync(
        conn: &Connection,
        unit_id: i64,
        variants: &[TmTransUnitVariantRecord],
    ) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            r#"
            INSERT INTO tm_trans_unit_variants (tu_id, language, content, content_hash)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(tu_id, language) DO UPDATE SET
                content = excluded.content,
                content_hash = excluded.content_hash
            "#,
        )?;

        for variant in variants {
            let content_hash = TmTransUnitVariantRecord::hash_content(&variant.content);
            stmt.execute(params![unit_id, variant.language, variant.content, content_hash])
                .with_context(|| {
                    format!("Failed to store '{}' variant of unit {}", variant.language, unit_id)
                })?;
        }

        Ok(())
    }

    /// Get the variants of a unit ordered by language
    pub async fn get_variants(&self, unit_id: i64) -> Result<Vec<TmTransUnitVariantRecord>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, tu_id, language, content, content_hash
                    FROM tm_trans_unit_variants WHERE tu_id = ?1 ORDER BY language
                    "#,
                )?;

                let variants = stmt
                    .query_map([unit_id], |row| {
                        Ok(TmTransUnitVariantRecord {
                            id: row.get(0)?,
                            tu_id: row.get(1)?,
                            language: row.get(2)?,
                            content: row.get(3)?,
                            content_hash: row.get(4)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(variants)
            })
            .await
    }

    /// Count all stored variants
    pub async fn count_variants(&self) -> Result<i64> {
        self.db
            .execute_async(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM tm_trans_unit_variants", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
    }

    // =========================================================================
    // Import Operations
    // =========================================================================

    /// Store documents' text flows as units of a translation memory
    ///
    /// Each text flow becomes unit `docId:flowId` with its source text and
    /// every finished translation as variants. Existing units with the same
    /// id are updated in place.
    pub async fn import_documents(&self, tm_slug: &str, documents: &[Document]) -> Result<ImportStats> {
        let tm_slug = tm_slug.to_string();
        let documents = documents.to_vec();

        self.db
            .transaction_async(move |tx| {
                let tm_id = Self::require_trans_memory_id(tx, &tm_slug)?;
                let mut stats = ImportStats::default();

                for document in &documents {
                    for flow in &document.text_flows {
                        let source_locale = flow.source_locale.as_ref().or(document.source_locale.as_ref());
                        let (Some(source_locale), Some(source_text), false) =
                            (source_locale, flow.source_text(), flow.obsolete)
                        else {
                            warn!("Skipping text flow {}:{} without source", document.id, flow.id);
                            stats.skipped += 1;
                            continue;
                        };

                        let trans_unit_id = format!("{}:{}", document.id, flow.id);
                        tx.execute(
                            r#"
                            INSERT INTO tm_translation_units (tm_id, trans_unit_id, source_language, created_at)
                            VALUES (?1, ?2, ?3, ?4)
                            ON CONFLICT(tm_id, trans_unit_id) DO UPDATE SET
                                source_language = excluded.source_language
                            "#,
                            params![tm_id, trans_unit_id, source_locale.as_str(), chrono::Utc::now().to_rfc3339()],
                        )?;
                        let unit_id: i64 = tx.query_row(
                            "SELECT id FROM tm_translation_units WHERE tm_id = ?1 AND trans_unit_id = ?2",
                            params![tm_id, trans_unit_id],
                            |row| row.get(0),
                        )?;

                        let mut variants = vec![TmTransUnitVariantRecord::new(source_locale.as_str(), source_text)];
                        variants.extend(
                            flow.targets
                                .iter()
                                .filter(|(locale, target)| {
                                    *locale != source_locale
                                        && target.state.is_translated()
                                        && !target.content.is_empty()
                                })
                                .map(|(locale, target)| {
                                    TmTransUnitVariantRecord::new(locale.as_str(), target.content.as_str())
                                }),
                        );

                        Self::put_variants_sync(tx, unit_id, &variants)?;
                        stats.units += 1;
                        stats.variants += variants.len() as u64;
                    }
                }

                Self::touch_trans_memory(tx, tm_id)?;
                info!("Imported into '{}': {}", tm_slug, stats);
                Ok(stats)
            })
            .await
    }
}
