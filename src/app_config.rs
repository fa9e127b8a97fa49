use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::database::DatabaseConnection;
use crate::locale::LocaleId;
use crate::validation::{ValidationId, ValidationState};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Path of the translation-memory database; the user data directory when unset
    #[serde(default)]
    pub database_path: Option<String>,

    /// TMX export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Validation rule states per project and version
    #[serde(default)]
    pub validation: ValidationRules,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// TMX export configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportConfig {
    /// TMX segmentation type (`segtype`)
    #[serde(default = "default_segment_type")]
    pub segment_type: String,

    /// TMX data type (`datatype`)
    #[serde(default = "default_data_type")]
    pub data_type: String,

    /// Original translation-memory format (`o-tmf`)
    #[serde(default = "default_original_format")]
    pub original_format: String,

    /// Administrative language of the TMX header (`adminlang`)
    #[serde(default = "default_admin_lang")]
    pub admin_lang: String,

    /// Spaces per nesting level, 0 for compact output
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Bytes buffered in front of the output sink
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Translation units fetched per database page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            segment_type: default_segment_type(),
            data_type: default_data_type(),
            original_format: default_original_format(),
            admin_lang: default_admin_lang(),
            indent: default_indent(),
            buffer_capacity: default_buffer_capacity(),
            page_size: default_page_size(),
        }
    }
}

/// Rule states configured for projects and their versions
///
/// A version entry overrides the project entry for the same rule; rules
/// missing from both fall back to `ValidationState::Warning`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ValidationRules {
    /// Rule states keyed by project slug
    #[serde(default)]
    pub projects: BTreeMap<String, BTreeMap<ValidationId, ValidationState>>,

    /// Rule states keyed by project slug, then version slug
    #[serde(default)]
    pub versions: BTreeMap<String, BTreeMap<String, BTreeMap<ValidationId, ValidationState>>>,
}

impl ValidationRules {
    pub fn project_states(&self, project: &str) -> Option<&BTreeMap<ValidationId, ValidationState>> {
        self.projects.get(project)
    }

    pub fn version_states(
        &self,
        project: &str,
        version: &str,
    ) -> Option<&BTreeMap<ValidationId, ValidationState>> {
        self.versions.get(project).and_then(|versions| versions.get(version))
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

const SEGMENT_TYPES: [&str; 4] = ["block", "paragraph", "sentence", "phrase"];

fn default_segment_type() -> String {
    "block".to_string()
}

fn default_data_type() -> String {
    "unknown".to_string()
}

fn default_original_format() -> String {
    "unknown".to_string()
}

fn default_admin_lang() -> String {
    "en".to_string()
}

fn default_indent() -> usize {
    2
}

fn default_buffer_capacity() -> usize {
    8 * 1024
}

fn default_page_size() -> usize {
    200
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Database location, falling back to the user data directory
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
            _ => DatabaseConnection::default_database_path(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let export = &self.export;

        if !SEGMENT_TYPES.contains(&export.segment_type.as_str()) {
            return Err(anyhow!(
                "Invalid segment type '{}', expected one of: {}",
                export.segment_type,
                SEGMENT_TYPES.join(", ")
            ));
        }

        if export.data_type.trim().is_empty() {
            return Err(anyhow!("Export data type must not be empty"));
        }

        LocaleId::new(&export.admin_lang)
            .with_context(|| format!("Invalid admin language: {}", export.admin_lang))?;

        if export.buffer_capacity == 0 {
            return Err(anyhow!("Export buffer capacity must be greater than zero"));
        }

        if export.page_size == 0 {
            return Err(anyhow!("Export page size must be greater than zero"));
        }

        Ok(())
    }
}
