/*!
 * Streaming export orchestrator.
 *
 * `TmxStreamingOutput` writes a document supply as one TMX document into any
 * byte sink. The writer chain is layered text (`BufWriter`) → XML
 * (`quick_xml::Writer`) → TMX (`TmxWriter`) and is released innermost first
 * on every exit path. Documents and text flows are pulled one at a time; no
 * more than one translation-unit record is held at once.
 */

use std::fmt;
use std::io::{self, BufWriter, Write};

use log::{debug, info, warn};
use quick_xml::Writer;
use serde::Serialize;

use crate::errors::ExportError;
use crate::locale::{to_tmx_locale_or_empty, LocaleId, TmxLocale};
use crate::model::DocumentSource;

use super::strategy::{ExportTuStrategy, TranslatedContentStrategy};
use super::writer::{TmxHeader, TmxWriter};
use super::{ExportCancellation, ExportOptions, ToolIdentity};

/// Something that can stream itself into a byte sink
pub trait StreamingOutput {
    fn write(&self, output: &mut dyn Write) -> Result<ExportStats, ExportError>;
}

/// Counters for a finished export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub documents: u64,
    pub units_written: u64,
    /// Text flows that produced no unit (no source text or obsolete)
    pub units_skipped: u64,
}

impl fmt::Display for ExportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents, {} translation units written, {} skipped",
            self.documents, self.units_written, self.units_skipped
        )
    }
}

/// TMX export of a document supply
pub struct TmxStreamingOutput<S, T = TranslatedContentStrategy> {
    documents: S,
    target_locale: Option<LocaleId>,
    strategy: T,
    tool: ToolIdentity,
    options: ExportOptions,
    cancellation: ExportCancellation,
}

impl<S: DocumentSource> TmxStreamingOutput<S> {
    /// Export `documents`, restricted to `target_locale` when one is given
    pub fn new(documents: S, target_locale: Option<LocaleId>) -> Self {
        Self {
            documents,
            strategy: TranslatedContentStrategy::new(target_locale.clone()),
            target_locale,
            tool: ToolIdentity::current().clone(),
            options: ExportOptions::default(),
            cancellation: ExportCancellation::none(),
        }
    }
}

impl<S, T> TmxStreamingOutput<S, T> {
    pub fn with_strategy<U: ExportTuStrategy>(self, strategy: U) -> TmxStreamingOutput<S, U> {
        TmxStreamingOutput {
            documents: self.documents,
            target_locale: self.target_locale,
            strategy,
            tool: self.tool,
            options: self.options,
            cancellation: self.cancellation,
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_tool_identity(mut self, tool: ToolIdentity) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_cancellation(mut self, cancellation: ExportCancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn target_locale(&self) -> Option<&LocaleId> {
        self.target_locale.as_ref()
    }

    fn header(&self, target_locale: &TmxLocale) -> TmxHeader {
        TmxHeader {
            source_locale: TmxLocale::all(),
            target_locale: target_locale.clone(),
            creation_tool: self.tool.name.clone(),
            creation_tool_version: self.tool.version.clone(),
            segment_type: self.options.segment_type.clone(),
            original_format: self.options.original_format.clone(),
            admin_lang: self.options.admin_lang.clone(),
            data_type: self.options.data_type.clone(),
        }
    }
}

impl<S: DocumentSource, T: ExportTuStrategy> TmxStreamingOutput<S, T> {
    fn write_documents<W: Write>(
        &self,
        tmx: &mut TmxWriter<W>,
        stats: &mut ExportStats,
    ) -> Result<(), ExportError> {
        let target_locale = to_tmx_locale_or_empty(self.target_locale.as_ref());
        tmx.write_start_document(&self.header(&target_locale))?;

        for document in self.documents.documents() {
            self.cancellation.check()?;
            let document = document?;
            let doc_id = document.qualified_doc_id();
            let prefix = format!("{}:", doc_id);
            let source_locale = to_tmx_locale_or_empty(document.source_locale());
            debug!("Exporting document {}", doc_id);

            for text_flow in document.text_flows() {
                self.cancellation.check()?;
                let text_flow = text_flow?;
                let written = self.strategy.export_translation_unit(
                    tmx,
                    &prefix,
                    &text_flow,
                    &source_locale,
                )?;
                if written {
                    stats.units_written += 1;
                } else {
                    stats.units_skipped += 1;
                }
            }
            stats.documents += 1;
        }

        tmx.write_end_document()
    }
}

impl<S: DocumentSource, T: ExportTuStrategy> StreamingOutput for TmxStreamingOutput<S, T> {
    fn write(&self, output: &mut dyn Write) -> Result<ExportStats, ExportError> {
        info!(
            "Starting TMX export (target locale: {})",
            self.target_locale
                .as_ref()
                .map(LocaleId::to_string)
                .unwrap_or_else(|| "all".to_string())
        );

        let text = BufWriter::with_capacity(self.options.buffer_capacity.max(1), output);
        let xml = if self.options.indent > 0 {
            Writer::new_with_indent(text, b' ', self.options.indent)
        } else {
            Writer::new(text)
        };
        let mut tmx = TmxWriter::new(xml);

        let mut stats = ExportStats::default();
        let outcome = self.write_documents(&mut tmx, &mut stats);
        let sink_intact = !matches!(outcome, Err(ExportError::Io(_)));
        let released = release_chain(tmx, sink_intact);

        let stats = settle(outcome.map(|_| stats), released)?;
        info!("TMX export finished: {}", stats);
        Ok(stats)
    }
}

/// Release TMX, then XML, then text writer, and flush the sink exactly once.
///
/// Buffered bytes are handed to the sink unless the sink itself already failed;
/// they are discarded then so nothing follows the failing write.
fn release_chain<W: Write>(tmx: TmxWriter<BufWriter<W>>, sink_intact: bool) -> io::Result<()> {
    let xml = tmx.release();
    let (mut sink, pending) = xml.into_inner().into_parts();
    let drained = match pending {
        Ok(bytes) if sink_intact => sink.write_all(&bytes),
        Ok(bytes) => {
            if !bytes.is_empty() {
                debug!("Discarding {} buffered bytes after a sink failure", bytes.len());
            }
            Ok(())
        }
        Err(_) => Err(io::Error::new(
            io::ErrorKind::Other,
            "text writer panicked before release",
        )),
    };
    let flushed = sink.flush();
    drained.and(flushed)
}

/// Combine the export outcome with the release outcome; a release failure
/// never replaces an earlier error
fn settle<T>(outcome: Result<T, ExportError>, released: io::Result<()>) -> Result<T, ExportError> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(release_error)) => Err(ExportError::Io(release_error)),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(release_error)) => {
            warn!("Failed to release export writers after error ({}): {}", error, release_error);
            Err(error)
        }
    }
}
