/*!
 * End-to-end tests for streaming TMX export of in-memory documents
 */

use std::io::{self, Write};

use tmxstream::errors::{ExportError, SourceError};
use tmxstream::locale::{LocaleId, TmxLocale};
use tmxstream::model::{
    ContentState, Document, DocumentIter, DocumentSource, DocumentWithId, TextFlow, TextFlowTarget,
};
use tmxstream::tmx::{
    ExportCancellation, ExportOptions, ExportTuStrategy, StreamingOutput, TmxStreamingOutput,
    TmxWriter, ToolIdentity, TranslationUnitRecord, TuVariant,
};

use crate::common::{
    create_temp_dir, export_to_string, init_test_logger, locale, parse_tmx, sample_documents,
};

/// Test frames and unit order
#[test]
fn test_export_withSampleDocuments_shouldWriteOneFrameAndUnitsInOrder() {
    let output = TmxStreamingOutput::new(sample_documents(), None);

    let (xml, stats) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(xml.matches("<?xml").count(), 1);
    assert_eq!(parsed.header_count, 1);
    assert_eq!(parsed.body_count, 1);
    assert_eq!(xml.matches("</body>").count(), 1);
    assert_eq!(xml.matches("</tmx>").count(), 1);

    let tuids: Vec<&str> = parsed.units.iter().map(|u| u.tuid.as_str()).collect();
    assert_eq!(
        tuids,
        vec!["proj:1.0:messages:greeting", "proj:1.0:messages:farewell", "proj:1.0:menu:greeting"]
    );
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.units_written, 3);
    assert_eq!(stats.units_skipped, 1);
}

/// Test that the same local id in two documents yields distinct unit ids
#[test]
fn test_export_withSharedLocalIds_shouldProduceUniqueTuids() {
    let output = TmxStreamingOutput::new(sample_documents(), None);

    let (xml, _) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    let mut tuids: Vec<&str> = parsed.units.iter().map(|u| u.tuid.as_str()).collect();
    let total = tuids.len();
    tuids.sort_unstable();
    tuids.dedup();
    assert_eq!(tuids.len(), total);
}

/// Test that every translation is exported without a target locale
#[test]
fn test_export_withoutTargetLocale_shouldIncludeEveryTarget() {
    let output = TmxStreamingOutput::new(sample_documents(), None);

    let (xml, _) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(parsed.header["srclang"], TmxLocale::ALL_MARKER);
    let unit = &parsed.units[0];
    assert_eq!(unit.srclang.as_deref(), Some("en"));
    assert_eq!(unit.languages(), vec!["en", "en-US", "es", "fr"]);
    assert_eq!(unit.variants[0].1, "Hello");
    assert_eq!(unit.variants[2].1, "Hello (es)");
}

/// Test restricting the export to one target locale
#[test]
fn test_export_withTargetLocale_shouldIncludeOnlyThatTarget() {
    let output = TmxStreamingOutput::new(sample_documents(), Some(locale("es")));
    assert_eq!(output.target_locale(), Some(&locale("es")));

    let (xml, stats) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(stats.units_written, 3);
    for unit in &parsed.units {
        assert_eq!(unit.languages(), vec!["en", "es"]);
    }
}

/// Test a target locale no unit is translated into
#[test]
fn test_export_withAbsentTargetLocale_shouldWriteSourceOnlyUnits() {
    let output = TmxStreamingOutput::new(sample_documents(), Some(locale("de")));

    let (xml, _) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(parsed.units.len(), 3);
    for unit in &parsed.units {
        assert_eq!(unit.languages(), vec!["en"]);
    }
}

/// Test a unit without translations
#[test]
fn test_export_withUntranslatedUnit_shouldWriteSourceOnlyRecord() {
    let mut unfinished = TextFlow::new("draft", "Draft text");
    unfinished
        .targets
        .insert(locale("es"), TextFlowTarget::with_state("Borrador", ContentState::NeedReview));
    unfinished
        .targets
        .insert(locale("fr"), TextFlowTarget::with_state("", ContentState::Approved));
    let documents = vec![
        Document::new("doc", Some(locale("en")))
            .with_text_flow(TextFlow::new("plain", "No translations"))
            .with_text_flow(unfinished),
    ];

    let (xml, stats) = export_to_string(&TmxStreamingOutput::new(documents, None));
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(stats.units_written, 2);
    assert_eq!(parsed.units[0].variants, vec![("en".to_string(), "No translations".to_string())]);
    assert_eq!(parsed.units[1].languages(), vec!["en"]);
}

/// Test an empty document sequence
#[test]
fn test_export_withNoDocuments_shouldWriteHeaderAndFooterOnly() {
    let output = TmxStreamingOutput::new(Vec::<Document>::new(), None);

    let (xml, stats) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(parsed.header_count, 1);
    assert!(parsed.units.is_empty());
    assert_eq!(stats, Default::default());
    assert!(!xml.contains("<tu "));
}

/// Test unit-level source locale overrides and documents without a locale
#[test]
fn test_export_withSourceLocaleOverrides_shouldUseUnitLocale() {
    let mut override_flow = TextFlow::new("1", "Bonjour").with_target(locale("en"), "Hello");
    override_flow.source_locale = Some(locale("fr"));
    let documents = vec![
        Document::new("mixed", Some(locale("en"))).with_text_flow(override_flow),
        Document::new("bare", None).with_text_flow(TextFlow::new("1", "Text")),
    ];

    let (xml, _) = export_to_string(&TmxStreamingOutput::new(documents, None));
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(parsed.units[0].srclang.as_deref(), Some("fr"));
    assert_eq!(parsed.units[0].languages(), vec!["fr", "en"]);
    assert_eq!(parsed.units[1].srclang, None);
    assert_eq!(parsed.units[1].languages(), vec![""]);
}

/// Test that a translation in the document's own source locale is exported
#[test]
fn test_export_withTargetInSourceLocale_shouldIncludeIt() {
    let documents = || {
        vec![Document::new("proj:1:doc", Some(locale("en-US"))).with_text_flow(
            TextFlow::new("unit", "Test Message")
                .with_target(locale("es"), "Mensaje de Prueba")
                .with_target(locale("en-US"), "Test Message (reviewed)")
                .with_target(locale("fr"), "Message de test"),
        )]
    };

    let (xml, _) = export_to_string(&TmxStreamingOutput::new(documents(), None));
    let parsed = parse_tmx(&xml).unwrap();
    assert_eq!(xml.matches("<tuv ").count(), 4);
    assert_eq!(parsed.units[0].languages(), vec!["en-US", "en-US", "es", "fr"]);
    assert_eq!(parsed.units[0].variants[1].1, "Test Message (reviewed)");

    let (xml, _) =
        export_to_string(&TmxStreamingOutput::new(documents(), Some(locale("en-US"))));
    let parsed = parse_tmx(&xml).unwrap();
    assert_eq!(parsed.units[0].languages(), vec!["en-US", "en-US"]);
    assert_eq!(parsed.units[0].variants[1].1, "Test Message (reviewed)");
}

/// Test header settings taken from options and tool identity
#[test]
fn test_export_withCustomOptions_shouldWriteHeaderValues() {
    let options = ExportOptions {
        segment_type: "sentence".to_string(),
        data_type: "plaintext".to_string(),
        original_format: "po".to_string(),
        admin_lang: "en-US".to_string(),
        indent: 0,
        buffer_capacity: 16,
    };
    let tool = ToolIdentity {
        name: "custom-tool".to_string(),
        version: "9.9".to_string(),
    };
    let output = TmxStreamingOutput::new(sample_documents(), None)
        .with_options(options)
        .with_tool_identity(tool);

    let (xml, _) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    assert!(!xml.contains('\n'));
    assert_eq!(parsed.header["segtype"], "sentence");
    assert_eq!(parsed.header["datatype"], "plaintext");
    assert_eq!(parsed.header["o-tmf"], "po");
    assert_eq!(parsed.header["adminlang"], "en-US");
    assert_eq!(parsed.header["creationtool"], "custom-tool");
    assert_eq!(parsed.header["creationtoolversion"], "9.9");
}

/// Test exporting straight into a file
#[test]
fn test_export_toFile_shouldWriteCompleteDocument() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("export.tmx");
    let output = TmxStreamingOutput::new(sample_documents(), Some(locale("fr")));

    let mut file = std::fs::File::create(&path).unwrap();
    let stats = output.write(&mut file).unwrap();
    drop(file);

    let parsed = parse_tmx(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.units.len() as u64, stats.units_written);
    assert_eq!(parsed.units[2].variants[1].1, "Welcome (fr)");
}

/// Sink that accepts a fixed number of bytes, then fails every write
struct LimitedSink {
    remaining: usize,
    received: Vec<u8>,
    flushes: usize,
}

impl LimitedSink {
    fn new(limit: usize) -> Self {
        Self { remaining: limit, received: Vec::new(), flushes: 0 }
    }
}

impl Write for LimitedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() > self.remaining {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
        }
        self.remaining -= buf.len();
        self.received.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

fn single_unit_documents(count: usize) -> Vec<Document> {
    (0..count)
        .map(|d| {
            Document::new(format!("doc{}", d), Some(locale("en")))
                .with_text_flow(TextFlow::new("1", "Some source text").with_target(locale("es"), "Texto"))
        })
        .collect()
}

/// Test a sink failing part way through
#[test]
fn test_export_withSinkFailingAfterKBytes_shouldReportOriginalError() {
    init_test_logger();
    let options = ExportOptions {
        buffer_capacity: 128,
        ..ExportOptions::default()
    };
    let output = TmxStreamingOutput::new(single_unit_documents(50), None).with_options(options);
    let mut sink = LimitedSink::new(1024);

    let error = output.write(&mut sink).unwrap_err();

    match error {
        ExportError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("Expected Io error, got {:?}", other),
    }
    assert_eq!(sink.flushes, 1);
}

/// Test that a failure after some units releases the chain once and never closes the document
#[test]
fn test_export_withSinkFailingAfterSomeUnits_shouldReleaseOnceWithoutEndFrame() {
    init_test_logger();
    let options = ExportOptions {
        buffer_capacity: 64,
        indent: 0,
        ..ExportOptions::default()
    };
    let total = 40;
    let output = TmxStreamingOutput::new(single_unit_documents(total), None).with_options(options);
    let mut sink = LimitedSink::new(2048);

    let error = output.write(&mut sink).unwrap_err();

    assert!(matches!(error, ExportError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
    assert_eq!(sink.flushes, 1);
    let xml = String::from_utf8_lossy(&sink.received);
    let units = xml.matches("</tu>").count();
    assert!(units > 0 && units < total, "units before failure: {}", units);
    assert!(!xml.contains("</body>"));
    assert!(!xml.contains("</tmx>"));
}

/// Document supply whose second document fails to load
struct FailingSource {
    documents: Vec<Document>,
}

impl DocumentSource for FailingSource {
    fn documents(&self) -> DocumentIter<'_> {
        let ok = self
            .documents
            .iter()
            .map(|doc| Ok(Box::new(doc) as Box<dyn DocumentWithId + '_>));
        let failed = std::iter::once(Err(SourceError::Store("connection lost".to_string())));
        Box::new(ok.take(1).chain(failed))
    }
}

/// Test a document supply failing mid-iteration
#[test]
fn test_export_withFailingSource_shouldSurfaceSourceError() {
    init_test_logger();
    let output = TmxStreamingOutput::new(FailingSource { documents: sample_documents() }, None);
    let mut buffer: Vec<u8> = Vec::new();

    let error = output.write(&mut buffer).unwrap_err();

    assert!(matches!(error, ExportError::Source(SourceError::Store(_))));
    // Units written before the failure still reached the sink on release
    let xml = String::from_utf8(buffer).unwrap();
    assert!(xml.contains("proj:1.0:messages:farewell"));
    assert!(!xml.contains("</tmx>"));
}

/// Test cancelling before the export starts
#[test]
fn test_export_withCancelledToken_shouldFailWithCancelled() {
    let (canceller, cancellation) = ExportCancellation::channel();
    let output = TmxStreamingOutput::new(sample_documents(), None).with_cancellation(cancellation);
    canceller.cancel();

    let error = output.write(&mut Vec::<u8>::new()).unwrap_err();

    assert!(matches!(error, ExportError::Cancelled));
}

/// Strategy exporting source text only, upper-cased ids
struct SourceOnlyStrategy;

impl ExportTuStrategy for SourceOnlyStrategy {
    fn export_translation_unit<W: Write>(
        &self,
        writer: &mut TmxWriter<W>,
        tuid_prefix: &str,
        text_flow: &TextFlow,
        source_locale: &TmxLocale,
    ) -> Result<bool, ExportError> {
        let Some(text) = text_flow.source_text() else {
            return Ok(false);
        };
        let record = TranslationUnitRecord::new(
            format!("{}{}", tuid_prefix, text_flow.id).to_uppercase(),
            TuVariant::new(source_locale.clone(), text),
        );
        writer.write_translation_unit(&record)?;
        Ok(true)
    }
}

/// Test plugging in a different extraction strategy
#[test]
fn test_export_withCustomStrategy_shouldUseIt() {
    let output = TmxStreamingOutput::new(sample_documents(), None).with_strategy(SourceOnlyStrategy);

    let (xml, stats) = export_to_string(&output);
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(stats.units_written, 3);
    assert_eq!(parsed.units[0].tuid, "PROJ:1.0:MESSAGES:GREETING");
    assert!(parsed.units.iter().all(|u| u.variants.len() == 1));
    assert_eq!(LocaleId::new(&parsed.units[0].variants[0].0).unwrap(), locale("en"));
}
