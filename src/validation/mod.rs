/*!
 * Validation module for translation quality checks.
 *
 * # Architecture
 *
 * - `rules`: the individual checks and the states a project assigns to them
 * - `service`: resolves rule states per project/version and runs them over documents
 */

pub mod rules;
pub mod service;

// Re-export main types
pub use rules::{enabled_rule_ids, error_rule_ids, RuleIssue, ValidationAction, ValidationId, ValidationState};
pub use service::{DefaultValidationService, DocValidationResultInfo, DocumentId, ValidationService};
