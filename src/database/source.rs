/*!
 * Translation memories as a document supply.
 *
 * Each translation memory is exposed as one document whose text flows are
 * read from the database one page at a time, so an export of a large memory
 * holds a single page of units in memory.
 */

use std::collections::{BTreeMap, VecDeque};

use anyhow::Result;
use log::{debug, warn};

use crate::errors::SourceError;
use crate::locale::LocaleId;
use crate::model::{DocumentIter, DocumentSource, DocumentWithId, TextFlow, TextFlowIter, TextFlowTarget};

use super::connection::DatabaseConnection;
use super::models::TmUnitWithVariants;
use super::repository::Repository;

/// Document supply over translation memories stored in the database
#[derive(Clone)]
pub struct TransMemorySource {
    db: DatabaseConnection,
    slugs: Vec<String>,
    page_size: usize,
}

impl TransMemorySource {
    /// Expose the given translation memories, in the given order
    pub fn new(db: DatabaseConnection, slugs: Vec<String>, page_size: usize) -> Self {
        Self {
            db,
            slugs,
            page_size: page_size.max(1),
        }
    }

    /// Expose every translation memory, ordered by slug
    pub fn all(db: DatabaseConnection, page_size: usize) -> Result<Self> {
        let slugs = db
            .execute(|conn| Repository::list_trans_memories_sync(conn))?
            .into_iter()
            .map(|tm| tm.slug)
            .collect();
        Ok(Self::new(db, slugs, page_size))
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    fn open_document(&self, slug: &str) -> Result<TransMemoryDocument, SourceError> {
        let tm = self
            .db
            .execute(|conn| Repository::get_trans_memory_sync(conn, slug))?
            .ok_or_else(|| SourceError::Store(format!("Translation memory not found: {}", slug)))?;

        debug!("Opening translation memory {} for export", tm);
        Ok(TransMemoryDocument {
            db: self.db.clone(),
            tm_id: tm.id,
            slug: tm.slug,
            page_size: self.page_size,
        })
    }
}

impl DocumentSource for TransMemorySource {
    fn documents(&self) -> DocumentIter<'_> {
        Box::new(self.slugs.iter().map(move |slug| -> Result<Box<dyn DocumentWithId + '_>, SourceError> {
            let document = self.open_document(slug)?;
            Ok(Box::new(document) as Box<dyn DocumentWithId + '_>)
        }))
    }
}

/// One translation memory viewed as a document
struct TransMemoryDocument {
    db: DatabaseConnection,
    tm_id: i64,
    slug: String,
    page_size: usize,
}

impl DocumentWithId for TransMemoryDocument {
    fn qualified_doc_id(&self) -> &str {
        &self.slug
    }

    // Units carry their own source locale
    fn source_locale(&self) -> Option<&LocaleId> {
        None
    }

    fn text_flows(&self) -> TextFlowIter<'_> {
        Box::new(UnitPages {
            document: self,
            after_id: 0,
            page: VecDeque::new(),
            exhausted: false,
        })
    }
}

/// Keyset-paginated iterator over a translation memory's units
struct UnitPages<'a> {
    document: &'a TransMemoryDocument,
    after_id: i64,
    page: VecDeque<TmUnitWithVariants>,
    exhausted: bool,
}

impl UnitPages<'_> {
    fn fetch_next_page(&mut self) -> Result<(), SourceError> {
        let TransMemoryDocument { db, tm_id, page_size, .. } = self.document;
        let after_id = self.after_id;

        let page = db.execute(|conn| Repository::get_unit_page_sync(conn, *tm_id, after_id, *page_size))?;

        if page.len() < *page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.after_id = last.unit.id;
        }
        self.page.extend(page);
        Ok(())
    }
}

impl Iterator for UnitPages<'_> {
    type Item = Result<TextFlow, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.exhausted {
            if let Err(error) = self.fetch_next_page() {
                self.exhausted = true;
                return Some(Err(error));
            }
        }

        self.page.pop_front().map(to_text_flow)
    }
}

/// Turn a stored unit into a text flow: the variant in the unit's source
/// language is the source, every other variant a finished translation
fn to_text_flow(stored: TmUnitWithVariants) -> Result<TextFlow, SourceError> {
    let TmUnitWithVariants { unit, variants } = stored;
    let source_locale = LocaleId::new(&unit.source_language)?;

    let mut source = None;
    let mut targets = BTreeMap::new();
    for variant in variants {
        if variant.language == unit.source_language {
            source = Some(variant.content);
            continue;
        }
        match LocaleId::new(&variant.language) {
            Ok(locale) => {
                targets.insert(locale, TextFlowTarget::translated(variant.content));
            }
            Err(e) => warn!(
                "Skipping variant of unit {} with invalid locale: {}",
                unit.trans_unit_id, e
            ),
        }
    }

    Ok(TextFlow {
        id: unit.trans_unit_id,
        source,
        source_locale: Some(source_locale),
        targets,
        obsolete: false,
    })
}
