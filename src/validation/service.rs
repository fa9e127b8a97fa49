/*!
 * Validation service.
 *
 * Resolves which rules apply to a project or project version and runs them
 * over the translations of a set of documents for one locale.
 */

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::Serialize;

use crate::app_config::ValidationRules;
use crate::errors::SourceError;
use crate::locale::LocaleId;
use crate::model::{ContentState, DocumentSource, TextFlow};

use super::rules::{ValidationAction, ValidationId, ValidationState};

/// Qualified document identifier used as report key
pub type DocumentId = String;

/// One rule's findings for one translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocValidationResultInfo {
    pub text_flow_id: String,
    pub locale: LocaleId,
    pub validation_id: ValidationId,
    pub messages: Vec<String>,
}

/// Rule resolution and execution over document translations
pub trait ValidationService {
    /// Enabled rules of a project
    fn get_validation_actions(&self, project_slug: &str) -> Vec<ValidationAction>;

    /// Enabled rules of a project version; version settings override project settings
    fn get_validation_actions_for_version(
        &self,
        project_slug: &str,
        version_slug: &str,
    ) -> Vec<ValidationAction>;

    /// Whether each document has a translation failing any of `rule_ids`
    fn run_validations(
        &self,
        documents: &dyn DocumentSource,
        rule_ids: &[ValidationId],
        locale: &LocaleId,
    ) -> Result<HashMap<DocumentId, bool>, SourceError>;

    /// Every finding of `rule_ids`, per document
    fn run_validations_full_report(
        &self,
        documents: &dyn DocumentSource,
        rule_ids: &[ValidationId],
        locale: &LocaleId,
    ) -> Result<HashMap<DocumentId, Vec<DocValidationResultInfo>>, SourceError>;

    /// The text flows whose translation fails any of `rule_ids`
    fn filter_has_error_text_flows(
        &self,
        text_flows: &[TextFlow],
        rule_ids: &[ValidationId],
        locale: &LocaleId,
    ) -> Vec<TextFlow>;
}

/// Validation service backed by the configured rule states
#[derive(Debug, Clone, Default)]
pub struct DefaultValidationService {
    rules: ValidationRules,
}

impl DefaultValidationService {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// Every rule at its default state, overlaid by each layer in turn
    fn resolve(layers: &[Option<&BTreeMap<ValidationId, ValidationState>>]) -> Vec<ValidationAction> {
        ValidationId::ALL
            .into_iter()
            .map(|id| {
                let state = layers
                    .iter()
                    .rev()
                    .flatten()
                    .find_map(|states| states.get(&id).copied())
                    .unwrap_or_default();
                ValidationAction::new(id, state)
            })
            .filter(ValidationAction::is_enabled)
            .collect()
    }

    /// Findings of `rule_ids` for one text flow's translation into `locale`
    pub fn validate_text_flow(
        text_flow: &TextFlow,
        rule_ids: &[ValidationId],
        locale: &LocaleId,
    ) -> Vec<DocValidationResultInfo> {
        let Some(source) = text_flow.source_text() else {
            return Vec::new();
        };
        let Some(target) = text_flow.target(locale) else {
            return Vec::new();
        };
        if target.state == ContentState::New || target.content.is_empty() {
            return Vec::new();
        }

        rule_ids
            .iter()
            .filter_map(|id| {
                let issues = id.check(source, &target.content);
                if issues.is_empty() {
                    return None;
                }
                Some(DocValidationResultInfo {
                    text_flow_id: text_flow.id.clone(),
                    locale: locale.clone(),
                    validation_id: *id,
                    messages: issues.iter().map(ToString::to_string).collect(),
                })
            })
            .collect()
    }
}

impl ValidationService for DefaultValidationService {
    fn get_validation_actions(&self, project_slug: &str) -> Vec<ValidationAction> {
        Self::resolve(&[self.rules.project_states(project_slug)])
    }

    fn get_validation_actions_for_version(
        &self,
        project_slug: &str,
        version_slug: &str,
    ) -> Vec<ValidationAction> {
        Self::resolve(&[
            self.rules.project_states(project_slug),
            self.rules.version_states(project_slug, version_slug),
        ])
    }

    fn run_validations(
        &self,
        documents: &dyn DocumentSource,
        rule_ids: &[ValidationId],
        locale: &LocaleId,
    ) -> Result<HashMap<DocumentId, bool>, SourceError> {
        let mut results = HashMap::new();

        for document in documents.documents() {
            let document = document?;
            let mut has_error = false;
            for text_flow in document.text_flows() {
                let text_flow = text_flow?;
                if !Self::validate_text_flow(&text_flow, rule_ids, locale).is_empty() {
                    has_error = true;
                    break;
                }
            }
            debug!("Validated {}: has errors = {}", document.qualified_doc_id(), has_error);
            results.insert(document.qualified_doc_id().to_string(), has_error);
        }

        Ok(results)
    }

    fn run_validations_full_report(
        &self,
        documents: &dyn DocumentSource,
        rule_ids: &[ValidationId],
        locale: &LocaleId,
    ) -> Result<HashMap<DocumentId, Vec<DocValidationResultInfo>>, SourceError> {
        let mut report = HashMap::new();

        for document in documents.documents() {
            let document = document?;
            let mut findings = Vec::new();
            for text_flow in document.text_flows() {
                findings.extend(Self::validate_text_flow(&text_flow?, rule_ids, locale));
            }
            debug!("Validated {}: {} findings", document.qualified_doc_id(), findings.len());
            report.insert(document.qualified_doc_id().to_string(), findings);
        }

        Ok(report)
    }

    fn filter_has_error_text_flows(
        &self,
        text_flows: &[TextFlow],
        rule_ids: &[ValidationId],
        locale: &LocaleId,
    ) -> Vec<TextFlow> {
        text_flows
            .iter()
            .filter(|flow| !Self::validate_text_flow(flow, rule_ids, locale).is_empty())
            .cloned()
            .collect()
    }
}
