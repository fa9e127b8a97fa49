/*!
 * # tmxstream - Streaming TMX export for translation platforms
 *
 * A Rust library that writes translation documents and translation memories
 * as TMX 1.4 without holding the exported content in memory.
 *
 * ## Features
 *
 * - Stream any ordered document supply into a single TMX document
 * - Restrict an export to one target locale or export every translation
 * - Async byte-stream body for network transports, with cancellation
 * - SQLite persistence of translation memories, exported page by page
 * - Per-project validation rules (tags, variables, newlines, tabs, entities)
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `locale`: Locale identifiers and their TMX form
 * - `model`: Documents, text flows and the document supply traits
 * - `tmx`: The streaming TMX export:
 *   - `tmx::writer`: TMX framing over quick-xml
 *   - `tmx::strategy`: One translation unit per text flow
 *   - `tmx::streaming`: The export orchestrator
 *   - `tmx::body`: Async stream adapter
 * - `database`: Translation-memory persistence
 * - `validation`: Translation validation rules and service
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod locale;
pub mod model;
pub mod tmx;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{ExportError, LocaleError, SourceError};
pub use locale::{LocaleId, TmxLocale, language_codes_match, normalize_to_part2t};
pub use model::{Corpus, Document, DocumentSource, DocumentWithId, TextFlow, TextFlowTarget};
pub use tmx::{ExportCancellation, ExportStats, StreamingOutput, TmxStreamingOutput, stream_export};
pub use validation::{DefaultValidationService, ValidationService};
