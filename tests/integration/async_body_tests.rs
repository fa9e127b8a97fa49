/*!
 * Tests for the async streaming export body
 */

use futures::StreamExt;
use tmxstream::errors::ExportError;
use tmxstream::model::{Document, TextFlow};
use tmxstream::tmx::{stream_export, ExportCancellation, ExportOptions, TmxStreamingOutput};

use crate::common::{locale, parse_tmx, sample_documents};

fn large_corpus(documents: usize, units: usize) -> Vec<Document> {
    (0..documents)
        .map(|d| {
            let mut doc = Document::new(format!("proj:1.0:doc{}", d), Some(locale("en")));
            for u in 0..units {
                doc = doc.with_text_flow(
                    TextFlow::new(format!("u{}", u), format!("Source {} of document {}", u, d))
                        .with_target(locale("es"), format!("Origen {} del documento {}", u, d)),
                );
            }
            doc
        })
        .collect()
}

fn small_chunks() -> ExportOptions {
    ExportOptions {
        buffer_capacity: 256,
        ..ExportOptions::default()
    }
}

/// Test that streamed bytes form the complete document
#[tokio::test]
async fn test_streamExport_shouldYieldCompleteTmx() {
    let output = TmxStreamingOutput::new(sample_documents(), Some(locale("es")));

    let (bytes, stats) = stream_export(output, 4).collect_to_vec().await.unwrap();
    let parsed = parse_tmx(&String::from_utf8(bytes).unwrap()).unwrap();

    assert_eq!(stats.units_written, 3);
    assert_eq!(parsed.units.len(), 3);
    assert_eq!(parsed.units[0].languages(), vec!["en", "es"]);
}

/// Test that a large export arrives in many chunks
#[tokio::test]
async fn test_streamExport_withLargeCorpus_shouldStreamManyChunks() {
    let output = TmxStreamingOutput::new(large_corpus(5, 100), None).with_options(small_chunks());
    let mut body = stream_export(output, 2);

    let mut chunks = 0;
    let mut total = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.unwrap();
        chunks += 1;
        total += chunk.len();
    }

    assert!(chunks > 10);
    assert!(total > 0);
    assert_eq!(body.stats().unwrap().units_written, 500);
}

/// Test cancelling while the consumer is reading
#[tokio::test]
async fn test_streamExport_cancelledMidway_shouldEndWithCancelledError() {
    let (canceller, cancellation) = ExportCancellation::channel();
    let output = TmxStreamingOutput::new(large_corpus(20, 200), None)
        .with_options(small_chunks())
        .with_cancellation(cancellation);
    let mut body = stream_export(output, 1);

    let first = body.next().await.unwrap();
    assert!(first.is_ok());
    canceller.cancel();

    let mut last = None;
    while let Some(item) = body.next().await {
        last = Some(item);
    }

    assert!(matches!(last, Some(Err(ExportError::Cancelled))));
    assert!(body.stats().is_none());
}

/// Test that dropping the body stops the export without panicking
#[tokio::test]
async fn test_streamExport_whenBodyDropped_shouldNotHang() {
    let output = TmxStreamingOutput::new(large_corpus(20, 200), None).with_options(small_chunks());
    let mut body = stream_export(output, 1);

    let first = body.next().await.unwrap();
    assert!(first.is_ok());
    drop(body);

    // The export thread observes the closed channel on its next write
    tokio::task::yield_now().await;
}
