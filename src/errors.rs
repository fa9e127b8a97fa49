/*!
 * Error types for the tmxstream library.
 *
 * This module contains custom error types for the different layers of the
 * export pipeline, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised while parsing or adapting locale identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocaleError {
    /// The tag was empty or whitespace
    #[error("Locale tag is empty")]
    Empty,

    /// The tag contains characters outside of [A-Za-z0-9-_]
    #[error("Malformed locale tag: {0}")]
    Malformed(String),

    /// The primary language subtag is not a known ISO 639 code
    #[error("Unknown language in locale tag: {0}")]
    UnknownLanguage(String),
}

/// Errors raised by a document supply while it is being iterated
#[derive(Error, Debug)]
pub enum SourceError {
    /// The backing store failed to produce the next item
    #[error("Document store error: {0}")]
    Store(String),

    /// A stored row could not be turned into a document or text flow
    #[error("Invalid stored content: {0}")]
    InvalidContent(String),

    /// A stored locale could not be parsed
    #[error("Locale error: {0}")]
    Locale(#[from] LocaleError),
}

impl From<rusqlite::Error> for SourceError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<anyhow::Error> for SourceError {
    fn from(error: anyhow::Error) -> Self {
        Self::Store(format!("{:#}", error))
    }
}

/// Errors that abort a TMX export
#[derive(Error, Debug)]
pub enum ExportError {
    /// The output sink rejected a write or flush
    #[error("I/O error while streaming export: {0}")]
    Io(#[from] std::io::Error),

    /// The XML layer failed to serialize an event
    #[error("XML error while streaming export: {0}")]
    Xml(String),

    /// Document start/end frames were used out of order
    #[error("TMX framing violation: {0}")]
    Framing(&'static str),

    /// The document supply failed mid-iteration
    #[error("Document source error: {0}")]
    Source(#[from] SourceError),

    /// The export was cancelled before it completed
    #[error("Export cancelled")]
    Cancelled,
}

impl From<quick_xml::Error> for ExportError {
    fn from(error: quick_xml::Error) -> Self {
        match error {
            quick_xml::Error::Io(io) => Self::Io(std::io::Error::new(io.kind(), io.to_string())),
            other => Self::Xml(other.to_string()),
        }
    }
}
