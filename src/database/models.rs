/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to the translation-memory tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A named translation memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransMemoryRecord {
    /// Database ID
    pub id: i64,
    /// Natural identifier, unique across translation memories
    pub slug: String,
    /// Display name
    pub name: String,
    pub description: Option<String>,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
    /// Last update timestamp (ISO 8601)
    pub updated_at: String,
}

impl TransMemoryRecord {
    /// Create a new translation memory record (without database ID)
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0, // Will be assigned by database
            slug: slug.into(),
            name: name.into(),
            description: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for TransMemoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.slug)
    }
}

/// A translation unit stored in a translation memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmTranslationUnitRecord {
    /// Database ID
    pub id: i64,
    /// Owning translation memory
    pub tm_id: i64,
    /// Unit id, unique within the translation memory
    pub trans_unit_id: String,
    /// Locale tag of the variant holding the source text
    pub source_language: String,
    /// Creation timestamp (ISO 8601)
    pub created_at: String,
}

impl TmTranslationUnitRecord {
    /// Create a new unit record (without database IDs)
    pub fn new(trans_unit_id: impl Into<String>, source_language: impl Into<String>) -> Self {
        Self {
            id: 0,
            tm_id: 0,
            trans_unit_id: trans_unit_id.into(),
            source_language: source_language.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One language variant of a stored translation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmTransUnitVariantRecord {
    /// Database ID
    pub id: i64,
    /// Owning translation unit
    pub tu_id: i64,
    /// Locale tag
    pub language: String,
    pub content: String,
    /// SHA256 of `content`
    pub content_hash: String,
}

impl TmTransUnitVariantRecord {
    /// Create a new variant record (without database IDs)
    pub fn new(language: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: 0,
            tu_id: 0,
            language: language.into(),
            content_hash: Self::hash_content(&content),
            content,
        }
    }

    /// Hex SHA256 of a variant's content
    pub fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A stored unit together with its variants, as read by the paging document supply
#[derive(Debug, Clone, PartialEq)]
pub struct TmUnitWithVariants {
    pub unit: TmTranslationUnitRecord,
    /// Variants ordered by language
    pub variants: Vec<TmTransUnitVariantRecord>,
}

/// Counters returned by a document import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub units: u64,
    pub variants: u64,
    /// Text flows without a source text or source locale
    pub skipped: u64,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} units, {} variants imported, {} skipped",
            self.units, self.variants, self.skipped
        )
    }
}
