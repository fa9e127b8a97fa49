/*!
 * Document supply consumed by the export pipeline and the validation service.
 *
 * A `DocumentSource` yields documents lazily, and each `DocumentWithId` yields
 * its text flows lazily, so an export never needs the whole corpus in memory.
 * `Document` is the in-memory implementation used by the JSON corpus and tests;
 * the database module provides a paging implementation.
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::SourceError;
use crate::locale::LocaleId;

/// Iterator of text flows as pulled from a document
pub type TextFlowIter<'a> = Box<dyn Iterator<Item = Result<TextFlow, SourceError>> + 'a>;

/// Iterator of documents as pulled from a source
pub type DocumentIter<'a> =
    Box<dyn Iterator<Item = Result<Box<dyn DocumentWithId + 'a>, SourceError>> + 'a>;

/// A document with a qualified identifier, consumed read-only
pub trait DocumentWithId {
    /// Qualified id, unique across the exported set (e.g. `project:version:path/doc`)
    fn qualified_doc_id(&self) -> &str;

    /// Declared source locale, if the document has one
    fn source_locale(&self) -> Option<&LocaleId>;

    /// The document's text flows, in export order
    fn text_flows(&self) -> TextFlowIter<'_>;
}

impl<T: DocumentWithId + ?Sized> DocumentWithId for &T {
    fn qualified_doc_id(&self) -> &str {
        (**self).qualified_doc_id()
    }

    fn source_locale(&self) -> Option<&LocaleId> {
        (**self).source_locale()
    }

    fn text_flows(&self) -> TextFlowIter<'_> {
        (**self).text_flows()
    }
}

/// An ordered, finite supply of documents
pub trait DocumentSource {
    fn documents(&self) -> DocumentIter<'_>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn documents(&self) -> DocumentIter<'_> {
        (**self).documents()
    }
}

impl<T: DocumentSource + ?Sized> DocumentSource for std::sync::Arc<T> {
    fn documents(&self) -> DocumentIter<'_> {
        (**self).documents()
    }
}

/// Review state of a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
    /// Not translated yet
    #[default]
    New,
    /// Translated but flagged for review
    NeedReview,
    /// Translated
    Translated,
    /// Translated and approved by a reviewer
    Approved,
}

impl ContentState {
    /// Whether the translation is complete enough to leave the platform
    pub fn is_translated(&self) -> bool {
        matches!(self, ContentState::Translated | ContentState::Approved)
    }
}

/// One translation of a text flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFlowTarget {
    pub content: String,
    #[serde(default = "default_target_state")]
    pub state: ContentState,
}

fn default_target_state() -> ContentState {
    ContentState::Translated
}

impl TextFlowTarget {
    pub fn translated(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            state: ContentState::Translated,
        }
    }

    pub fn with_state(content: impl Into<String>, state: ContentState) -> Self {
        Self {
            content: content.into(),
            state,
        }
    }
}

/// A translatable segment of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFlow {
    /// Id unique within the owning document
    pub id: String,
    /// Source text; `None` or empty means the unit carries no content
    #[serde(default)]
    pub source: Option<String>,
    /// Overrides the document's source locale for this unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_locale: Option<LocaleId>,
    /// Translations keyed by locale
    #[serde(default)]
    pub targets: BTreeMap<LocaleId, TextFlowTarget>,
    /// Removed from the document but kept for history
    #[serde(default)]
    pub obsolete: bool,
}

impl TextFlow {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: Some(source.into()),
            source_locale: None,
            targets: BTreeMap::new(),
            obsolete: false,
        }
    }

    /// Builder-style helper adding a translated target
    pub fn with_target(mut self, locale: LocaleId, content: impl Into<String>) -> Self {
        self.targets.insert(locale, TextFlowTarget::translated(content));
        self
    }

    /// Source text if it is present and non-empty
    pub fn source_text(&self) -> Option<&str> {
        self.source.as_deref().filter(|s| !s.is_empty())
    }

    pub fn target(&self, locale: &LocaleId) -> Option<&TextFlowTarget> {
        self.targets.get(locale)
    }
}

/// In-memory document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Qualified document id
    pub id: String,
    #[serde(default)]
    pub source_locale: Option<LocaleId>,
    #[serde(default)]
    pub text_flows: Vec<TextFlow>,
}

impl Document {
    pub fn new(id: impl Into<String>, source_locale: Option<LocaleId>) -> Self {
        Self {
            id: id.into(),
            source_locale,
            text_flows: Vec::new(),
        }
    }

    pub fn with_text_flow(mut self, text_flow: TextFlow) -> Self {
        self.text_flows.push(text_flow);
        self
    }
}

impl DocumentWithId for Document {
    fn qualified_doc_id(&self) -> &str {
        &self.id
    }

    fn source_locale(&self) -> Option<&LocaleId> {
        self.source_locale.as_ref()
    }

    fn text_flows(&self) -> TextFlowIter<'_> {
        Box::new(self.text_flows.iter().cloned().map(Ok::<_, SourceError>))
    }
}

impl DocumentSource for [Document] {
    fn documents(&self) -> DocumentIter<'_> {
        Box::new(
            self.iter()
                .map(|doc| Ok::<_, SourceError>(Box::new(doc) as Box<dyn DocumentWithId + '_>)),
        )
    }
}

impl DocumentSource for Vec<Document> {
    fn documents(&self) -> DocumentIter<'_> {
        self.as_slice().documents()
    }
}

/// A collection of documents loaded from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<Document>,
}

impl Corpus {
    /// Parse a corpus from JSON text
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let corpus: Corpus = serde_json::from_str(json)?;
        Ok(corpus)
    }
}

impl DocumentSource for Corpus {
    fn documents(&self) -> DocumentIter<'_> {
        self.documents.documents()
    }
}
