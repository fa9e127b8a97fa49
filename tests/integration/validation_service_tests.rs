/*!
 * Validation service tests over documents and stored translation memories
 */

use std::collections::BTreeMap;

use tmxstream::app_config::ValidationRules;
use tmxstream::database::{Repository, TransMemoryRecord, TransMemorySource};
use tmxstream::model::{Document, TextFlow};
use tmxstream::validation::{
    enabled_rule_ids, error_rule_ids, DefaultValidationService, ValidationId, ValidationService,
    ValidationState,
};

use crate::common::locale;

fn rules() -> ValidationRules {
    let mut rules = ValidationRules::default();
    rules.projects.insert(
        "web".to_string(),
        BTreeMap::from([
            (ValidationId::HtmlXml, ValidationState::Error),
            (ValidationId::PrintfVariables, ValidationState::Error),
            (ValidationId::XmlEntity, ValidationState::Off),
        ]),
    );
    rules.versions.insert(
        "web".to_string(),
        BTreeMap::from([(
            "2.0".to_string(),
            BTreeMap::from([(ValidationId::PrintfVariables, ValidationState::Warning)]),
        )]),
    );
    rules
}

fn documents() -> Vec<Document> {
    let es = locale("es");
    vec![
        Document::new("web:2.0:clean", Some(locale("en")))
            .with_text_flow(TextFlow::new("1", "<b>%d</b> files").with_target(es.clone(), "<b>%d</b> archivos")),
        Document::new("web:2.0:printf", Some(locale("en")))
            .with_text_flow(TextFlow::new("1", "%d files").with_target(es.clone(), "archivos")),
        Document::new("web:2.0:tags", Some(locale("en")))
            .with_text_flow(TextFlow::new("1", "<b>Save</b>").with_target(es.clone(), "Guardar"))
            .with_text_flow(TextFlow::new("2", "Tom & Jerry").with_target(es, "Tom &amp Jerry")),
    ]
}

/// Test that a version override turns an error rule into a warning
#[test]
fn test_runValidations_withVersionOverride_shouldOnlyFailOnErrorRules() {
    let service = DefaultValidationService::new(rules());
    let project_errors = error_rule_ids(&service.get_validation_actions("web"));
    let version_errors = error_rule_ids(&service.get_validation_actions_for_version("web", "2.0"));

    let by_project = service.run_validations(&documents(), &project_errors, &locale("es")).unwrap();
    let by_version = service.run_validations(&documents(), &version_errors, &locale("es")).unwrap();

    assert!(!by_project["web:2.0:clean"]);
    assert!(by_project["web:2.0:printf"]);
    assert!(by_project["web:2.0:tags"]);

    assert!(!by_version["web:2.0:clean"]);
    assert!(!by_version["web:2.0:printf"]);
    assert!(by_version["web:2.0:tags"]);
}

/// Test that disabled rules produce no findings in the full report
#[test]
fn test_runValidationsFullReport_withDisabledRule_shouldNotReportIt() {
    let service = DefaultValidationService::new(rules());
    let enabled = enabled_rule_ids(&service.get_validation_actions("web"));
    assert!(!enabled.contains(&ValidationId::XmlEntity));

    let report = service.run_validations_full_report(&documents(), &enabled, &locale("es")).unwrap();

    let tags = &report["web:2.0:tags"];
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].validation_id, ValidationId::HtmlXml);
    assert_eq!(tags[0].locale, locale("es"));

    let all = service
        .run_validations_full_report(&documents(), &ValidationId::ALL, &locale("es"))
        .unwrap();
    assert!(all["web:2.0:tags"].iter().any(|info| info.validation_id == ValidationId::XmlEntity));
}

/// Test validating a locale without translations
#[test]
fn test_runValidations_forUntranslatedLocale_shouldReportNoErrors() {
    let service = DefaultValidationService::new(rules());

    let results = service.run_validations(&documents(), &ValidationId::ALL, &locale("fr")).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.values().all(|has_error| !has_error));
}

/// Test the JSON form of the full report
#[test]
fn test_fullReport_serialize_shouldUseFieldNames() {
    let service = DefaultValidationService::default();
    let report = service
        .run_validations_full_report(&documents(), &[ValidationId::PrintfVariables], &locale("es"))
        .unwrap();

    let json = serde_json::to_value(&report["web:2.0:printf"]).unwrap();

    assert_eq!(json[0]["text_flow_id"], "1");
    assert_eq!(json[0]["locale"], "es");
    assert_eq!(json[0]["validation_id"], "PrintfVariables");
    assert_eq!(json[0]["messages"][0], "Target is missing variables: %d");
}

/// Test validating translations stored in a translation memory
#[tokio::test]
async fn test_runValidations_overTransMemory_shouldUseStoredVariants() {
    let repository = Repository::new_in_memory().unwrap();
    repository.create_trans_memory(&TransMemoryRecord::new("web", "Web")).await.unwrap();
    repository.import_documents("web", &documents()).await.unwrap();
    let source = TransMemorySource::new(repository.connection().clone(), vec!["web".to_string()], 2);
    let service = DefaultValidationService::new(rules());

    let results = service.run_validations(&source, &[ValidationId::HtmlXml], &locale("es")).unwrap();

    assert_eq!(results.len(), 1);
    assert!(results["web"]);
}
