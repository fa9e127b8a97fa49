/*!
 * Translation validation rules.
 *
 * Each rule compares a translation against its source text and reports the
 * problems it finds. Rules are identified by `ValidationId`; a project
 * decides per rule whether a problem is ignored, a warning, or an error.
 */

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// HTML/XML tags: opening, closing and self-closing
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9:_.-]*(?:\s[^<>]*)?/?>").expect("Invalid tag regex")
});

/// printf conversions such as %s, %1$d, %-5.2f
static PRINTF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%(?:\d+\$)?[-#+0,(]*(?:\d+|\*)?(?:\.(?:\d+|\*))?(?:hh|h|ll|l|L|q|j|z|t)?[diouxXeEfFgGaAcspn]")
        .expect("Invalid printf regex")
});

/// java.text.MessageFormat arguments such as {0} or {1,number}
static JAVA_VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\s*(\d+)\s*(?:,[^{}]*)?\}").expect("Invalid java variable regex")
});

/// Anything that starts like an entity reference
static ENTITY_CANDIDATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&[A-Za-z#][^\s&;<]*;?").expect("Invalid entity candidate regex")
});

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);$").expect("Invalid entity regex")
});

/// Identifier of a validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationId {
    /// Tags in the source must appear in the translation and no others
    HtmlXml,
    /// Leading and trailing newlines must match the source
    NewLine,
    /// The number of tabs must match the source
    Tab,
    /// java.text.MessageFormat arguments must match the source
    JavaVariables,
    /// Entity references in the translation must be well formed
    XmlEntity,
    /// printf conversions must match the source
    PrintfVariables,
}

impl ValidationId {
    pub const ALL: [ValidationId; 6] = [
        ValidationId::HtmlXml,
        ValidationId::NewLine,
        ValidationId::Tab,
        ValidationId::JavaVariables,
        ValidationId::XmlEntity,
        ValidationId::PrintfVariables,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            ValidationId::HtmlXml => "Check that XML/HTML tags are consistent",
            ValidationId::NewLine => "Check for consistent leading and trailing newline (\\n)",
            ValidationId::Tab => "Check whether source and target have matching numbers of tabs",
            ValidationId::JavaVariables => "Check that java style ({x}) variables are consistent",
            ValidationId::XmlEntity => "Check that XML entities are complete",
            ValidationId::PrintfVariables => "Check that printf style (%x) variables are consistent",
        }
    }

    /// Run this rule on one source/translation pair
    pub fn check(&self, source: &str, target: &str) -> Vec<RuleIssue> {
        match self {
            ValidationId::HtmlXml => check_tokens(&TAG_REGEX, source, target, TokenKind::Tag),
            ValidationId::NewLine => check_newlines(source, target),
            ValidationId::Tab => check_tabs(source, target),
            ValidationId::JavaVariables => check_java_variables(source, target),
            ValidationId::XmlEntity => check_entities(target),
            ValidationId::PrintfVariables => {
                check_tokens(&PRINTF_REGEX, source, target, TokenKind::Variable)
            }
        }
    }
}

impl fmt::Display for ValidationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ValidationId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValidationId::ALL
            .into_iter()
            .find(|id| id.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("Invalid validation id: {}", s))
    }
}

/// How a project treats a rule's findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationState {
    /// Rule is not run
    Off,
    /// Findings are reported
    #[default]
    Warning,
    /// Findings are reported and make the document fail
    Error,
}

impl ValidationState {
    pub fn is_enabled(&self) -> bool {
        *self != ValidationState::Off
    }
}

/// A rule together with the state a project assigned to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationAction {
    pub id: ValidationId,
    pub state: ValidationState,
}

impl ValidationAction {
    pub fn new(id: ValidationId, state: ValidationState) -> Self {
        Self { id, state }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    pub fn is_error(&self) -> bool {
        self.state == ValidationState::Error
    }
}

/// Ids of the actions whose findings fail a document
pub fn error_rule_ids(actions: &[ValidationAction]) -> Vec<ValidationId> {
    actions.iter().filter(|a| a.is_error()).map(|a| a.id).collect()
}

/// Ids of every enabled action
pub fn enabled_rule_ids(actions: &[ValidationAction]) -> Vec<ValidationId> {
    actions.iter().filter(|a| a.is_enabled()).map(|a| a.id).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Tag,
    Variable,
}

/// A problem found by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleIssue {
    MissingTags(Vec<String>),
    ExtraTags(Vec<String>),
    MissingVariables(Vec<String>),
    ExtraVariables(Vec<String>),
    LeadingNewlineMissing,
    LeadingNewlineAdded,
    TrailingNewlineMissing,
    TrailingNewlineAdded,
    TabCountMismatch { source: usize, target: usize },
    InvalidEntities(Vec<String>),
}

impl fmt::Display for RuleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleIssue::MissingTags(tags) => write!(f, "Target is missing tags: {}", tags.join(", ")),
            RuleIssue::ExtraTags(tags) => write!(f, "Target has extra tags: {}", tags.join(", ")),
            RuleIssue::MissingVariables(vars) => {
                write!(f, "Target is missing variables: {}", vars.join(", "))
            }
            RuleIssue::ExtraVariables(vars) => {
                write!(f, "Target has extra variables: {}", vars.join(", "))
            }
            RuleIssue::LeadingNewlineMissing => write!(f, "Leading newline (\\n) is missing"),
            RuleIssue::LeadingNewlineAdded => write!(f, "Unexpected leading newline (\\n)"),
            RuleIssue::TrailingNewlineMissing => write!(f, "Trailing newline (\\n) is missing"),
            RuleIssue::TrailingNewlineAdded => write!(f, "Unexpected trailing newline (\\n)"),
            RuleIssue::TabCountMismatch { source, target } => write!(
                f,
                "Source has {} tabs, target has {}",
                source, target
            ),
            RuleIssue::InvalidEntities(entities) => {
                write!(f, "Invalid XML entities: {}", entities.join(", "))
            }
        }
    }
}

/// Split two token lists into (in source only, in target only), counting duplicates
fn token_difference<'a>(source: Vec<&'a str>, target: Vec<&'a str>) -> (Vec<String>, Vec<String>) {
    let mut remaining = target;
    let mut missing = Vec::new();

    for token in source {
        match remaining.iter().position(|t| *t == token) {
            Some(pos) => {
                remaining.remove(pos);
            }
            None => missing.push(token.to_string()),
        }
    }

    (missing, remaining.into_iter().map(str::to_string).collect())
}

fn find_all<'t>(regex: &Regex, text: &'t str) -> Vec<&'t str> {
    regex.find_iter(text).map(|m| m.as_str()).collect()
}

fn check_tokens(regex: &Regex, source: &str, target: &str, kind: TokenKind) -> Vec<RuleIssue> {
    let (missing, extra) = token_difference(find_all(regex, source), find_all(regex, target));

    let mut issues = Vec::new();
    match kind {
        TokenKind::Tag => {
            if !missing.is_empty() {
                issues.push(RuleIssue::MissingTags(missing));
            }
            if !extra.is_empty() {
                issues.push(RuleIssue::ExtraTags(extra));
            }
        }
        TokenKind::Variable => {
            if !missing.is_empty() {
                issues.push(RuleIssue::MissingVariables(missing));
            }
            if !extra.is_empty() {
                issues.push(RuleIssue::ExtraVariables(extra));
            }
        }
    }
    issues
}

fn check_java_variables(source: &str, target: &str) -> Vec<RuleIssue> {
    // Compare argument indexes; "{0,number}" and "{0}" name the same argument
    let indexes = |text: &str| {
        JAVA_VARIABLE_REGEX
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| format!("{{{}}}", m.as_str())))
            .collect::<Vec<_>>()
    };
    let source_vars = indexes(source);
    let target_vars = indexes(target);
    let (missing, extra) = token_difference(
        source_vars.iter().map(String::as_str).collect(),
        target_vars.iter().map(String::as_str).collect(),
    );

    let mut issues = Vec::new();
    if !missing.is_empty() {
        issues.push(RuleIssue::MissingVariables(missing));
    }
    if !extra.is_empty() {
        issues.push(RuleIssue::ExtraVariables(extra));
    }
    issues
}

fn check_newlines(source: &str, target: &str) -> Vec<RuleIssue> {
    let mut issues = Vec::new();

    match (source.starts_with('\n'), target.starts_with('\n')) {
        (true, false) => issues.push(RuleIssue::LeadingNewlineMissing),
        (false, true) => issues.push(RuleIssue::LeadingNewlineAdded),
        _ => {}
    }
    match (source.ends_with('\n'), target.ends_with('\n')) {
        (true, false) => issues.push(RuleIssue::TrailingNewlineMissing),
        (false, true) => issues.push(RuleIssue::TrailingNewlineAdded),
        _ => {}
    }

    issues
}

fn check_tabs(source: &str, target: &str) -> Vec<RuleIssue> {
    let source_tabs = source.matches('\t').count();
    let target_tabs = target.matches('\t').count();

    if source_tabs == target_tabs {
        return Vec::new();
    }
    vec![RuleIssue::TabCountMismatch {
        source: source_tabs,
        target: target_tabs,
    }]
}

fn check_entities(target: &str) -> Vec<RuleIssue> {
    let invalid: Vec<String> = ENTITY_CANDIDATE_REGEX
        .find_iter(target)
        .map(|m| m.as_str())
        .filter(|candidate| !ENTITY_REGEX.is_match(candidate))
        .map(str::to_string)
        .collect();

    if invalid.is_empty() {
        return Vec::new();
    }
    vec![RuleIssue::InvalidEntities(invalid)]
}
