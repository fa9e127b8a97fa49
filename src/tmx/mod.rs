/*!
 * Streaming TMX export.
 *
 * - `record`: transient translation-unit records
 * - `writer`: TMX framing over a quick-xml writer
 * - `strategy`: builds one record per text flow
 * - `streaming`: the export orchestrator and its writer chain
 * - `body`: async byte-stream adapter for network transports
 */

pub mod body;
pub mod record;
pub mod strategy;
pub mod streaming;
pub mod writer;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::app_config::ExportConfig;
use crate::errors::ExportError;

pub use body::{stream_export, ExportBody};
pub use record::{TranslationUnitRecord, TuVariant};
pub use strategy::{ExportTuStrategy, TranslatedContentStrategy};
pub use streaming::{ExportStats, StreamingOutput, TmxStreamingOutput};
pub use writer::{TmxHeader, TmxWriter};

/// Creation tool recorded in every TMX header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolIdentity {
    pub name: String,
    pub version: String,
}

static TOOL_IDENTITY: Lazy<ToolIdentity> = Lazy::new(|| ToolIdentity {
    name: format!("{} TmxStreamingOutput", env!("CARGO_PKG_NAME")),
    version: env!("CARGO_PKG_VERSION").to_string(),
});

impl ToolIdentity {
    /// The identity of this build, computed once per process
    pub fn current() -> &'static ToolIdentity {
        &TOOL_IDENTITY
    }
}

/// Header metadata and writer tuning for an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// TMX `segtype`
    pub segment_type: String,
    /// TMX `datatype`
    pub data_type: String,
    /// TMX `o-tmf`
    pub original_format: String,
    /// TMX `adminlang`
    pub admin_lang: String,
    /// Spaces per nesting level; 0 writes compact XML
    pub indent: usize,
    /// Capacity of the text writer buffer in front of the sink
    pub buffer_capacity: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            segment_type: config.segment_type.clone(),
            data_type: config.data_type.clone(),
            original_format: config.original_format.clone(),
            admin_lang: config.admin_lang.clone(),
            indent: config.indent,
            buffer_capacity: config.buffer_capacity.max(1),
        }
    }
}

/// Handle used to stop a running export
#[derive(Debug)]
pub struct ExportCanceller {
    tx: watch::Sender<bool>,
}

impl ExportCanceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cancellation token checked by the orchestrator once per text flow
#[derive(Debug, Clone, Default)]
pub struct ExportCancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl ExportCancellation {
    /// A token that is never cancelled
    pub fn none() -> Self {
        Self { rx: None }
    }

    /// A connected canceller/token pair
    pub fn channel() -> (ExportCanceller, ExportCancellation) {
        let (tx, rx) = watch::channel(false);
        (ExportCanceller { tx }, ExportCancellation { rx: Some(rx) })
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    pub fn check(&self) -> Result<(), ExportError> {
        if self.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }
}
