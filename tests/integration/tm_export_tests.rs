/*!
 * Export tests for translation memories stored in the database
 */

use tmxstream::database::{Repository, TmTransUnitVariantRecord, TmTranslationUnitRecord, TransMemoryRecord, TransMemorySource};
use tmxstream::tmx::TmxStreamingOutput;

use crate::common::{export_to_string, init_test_logger, locale, parse_tmx, sample_documents};

async fn imported_repository() -> Repository {
    let repository = Repository::new_in_memory().unwrap();
    repository.create_trans_memory(&TransMemoryRecord::new("web", "Web")).await.unwrap();
    repository.import_documents("web", &sample_documents()).await.unwrap();
    repository
}

/// Test exporting an imported translation memory across several pages
#[tokio::test]
async fn test_tmExport_withSmallPages_shouldExportEveryUnit() {
    init_test_logger();
    let repository = imported_repository().await;
    let source = TransMemorySource::new(repository.connection().clone(), vec!["web".to_string()], 2);

    let (xml, stats) = export_to_string(&TmxStreamingOutput::new(source, None));
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(stats.documents, 1);
    assert_eq!(stats.units_written, 3);
    let tuids: Vec<&str> = parsed.units.iter().map(|u| u.tuid.as_str()).collect();
    assert_eq!(
        tuids,
        vec![
            "web:proj:1.0:messages:greeting",
            "web:proj:1.0:messages:farewell",
            "web:proj:1.0:menu:greeting",
        ]
    );
    let first = &parsed.units[0];
    assert_eq!(first.srclang.as_deref(), Some("en"));
    assert_eq!(first.languages(), vec!["en", "en-US", "es", "fr"]);
    assert_eq!(first.variants[0].1, "Hello");
}

/// Test restricting a stored translation memory export to one locale
#[tokio::test]
async fn test_tmExport_withTargetLocale_shouldIncludeOnlyThatVariant() {
    let repository = imported_repository().await;
    let source = TransMemorySource::new(repository.connection().clone(), vec!["web".to_string()], 10);

    let (xml, _) = export_to_string(&TmxStreamingOutput::new(source, Some(locale("en-US"))));
    let parsed = parse_tmx(&xml).unwrap();

    for unit in &parsed.units {
        assert_eq!(unit.languages(), vec!["en", "en-US"]);
    }
    assert_eq!(parsed.units[2].variants[1].1, "Welcome (en-US)");
}

/// Test exporting every stored translation memory
#[tokio::test]
async fn test_tmExport_all_shouldExportMemoriesInSlugOrder() {
    let repository = imported_repository().await;
    repository.create_trans_memory(&TransMemoryRecord::new("app", "App")).await.unwrap();
    let ids = repository
        .add_translation_units("app", &[TmTranslationUnitRecord::new("unit-id-0", "en-US")])
        .await
        .unwrap();
    repository
        .put_variants(
            ids[0],
            &[
                TmTransUnitVariantRecord::new("en-US", "Test Message"),
                TmTransUnitVariantRecord::new("es", "Mensaje de Prueba"),
            ],
        )
        .await
        .unwrap();
    repository.create_trans_memory(&TransMemoryRecord::new("empty", "Empty")).await.unwrap();

    let source = TransMemorySource::all(repository.connection().clone(), 50).unwrap();
    let (xml, stats) = export_to_string(&TmxStreamingOutput::new(source, None));
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(stats.documents, 3);
    assert_eq!(stats.units_written, 4);
    assert_eq!(parsed.units[0].tuid, "app:unit-id-0");
    assert_eq!(parsed.units[0].srclang.as_deref(), Some("en-US"));
    assert_eq!(
        parsed.units[0].variants,
        vec![
            ("en-US".to_string(), "Test Message".to_string()),
            ("es".to_string(), "Mensaje de Prueba".to_string()),
        ]
    );
    assert!(parsed.units[1].tuid.starts_with("web:"));
}

/// Test a stored unit without a variant in its source language
#[tokio::test]
async fn test_tmExport_withoutSourceVariant_shouldSkipUnit() {
    init_test_logger();
    let repository = Repository::new_in_memory().unwrap();
    repository.create_trans_memory(&TransMemoryRecord::new("tm", "TM")).await.unwrap();
    let ids = repository
        .add_translation_units(
            "tm",
            &[
                TmTranslationUnitRecord::new("orphan", "en"),
                TmTranslationUnitRecord::new("complete", "en"),
            ],
        )
        .await
        .unwrap();
    repository.put_variants(ids[0], &[TmTransUnitVariantRecord::new("fr", "Bonjour")]).await.unwrap();
    repository.put_variants(ids[1], &[TmTransUnitVariantRecord::new("en", "Hello")]).await.unwrap();

    let source = TransMemorySource::new(repository.connection().clone(), vec!["tm".to_string()], 1);
    let (xml, stats) = export_to_string(&TmxStreamingOutput::new(source, None));
    let parsed = parse_tmx(&xml).unwrap();

    assert_eq!(stats.units_written, 1);
    assert_eq!(stats.units_skipped, 1);
    assert_eq!(parsed.units[0].tuid, "tm:complete");
}
