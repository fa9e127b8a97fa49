/*!
 * Locale identifiers and the TMX locale adapter.
 *
 * The platform names locales with `LocaleId` (a validated BCP-47 style tag such
 * as `en-US`). TMX serialization uses `TmxLocale`, which additionally has an
 * empty sentinel meaning "no target locale" and the `*all*` wildcard used as
 * the header source language.
 */

use std::fmt;
use std::str::FromStr;

use isolang::Language;
use serde::{Deserialize, Serialize};

use crate::errors::LocaleError;

/// A platform locale identifier, e.g. `en-US`, `es`, `zh-Hant-TW`
///
/// The tag is stored exactly as given (case and separators preserved), so
/// converting through `TmxLocale` and back yields the original value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleId(String);

impl LocaleId {
    /// Parse and validate a locale tag
    pub fn new(tag: &str) -> Result<Self, LocaleError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(LocaleError::Empty);
        }

        let well_formed = tag
            .split(['-', '_'])
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
        if !well_formed {
            return Err(LocaleError::Malformed(tag.to_string()));
        }

        let locale = Self(tag.to_string());
        if normalize_to_part2t(locale.language_code()).is_none() {
            return Err(LocaleError::UnknownLanguage(tag.to_string()));
        }

        Ok(locale)
    }

    /// The tag as given
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`en` for `en-US`)
    pub fn language_code(&self) -> &str {
        self.0.split(['-', '_']).next().unwrap_or(&self.0)
    }

    /// Whether both locales share a primary language, across ISO 639-1 and 639-2 forms
    pub fn same_language(&self, other: &LocaleId) -> bool {
        language_codes_match(self.language_code(), other.language_code())
    }

    /// English name of the primary language
    pub fn language_name(&self) -> Option<&'static str> {
        normalize_to_part2t(self.language_code())
            .and_then(|code| Language::from_639_3(&code))
            .map(|lang| lang.to_name())
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocaleId {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LocaleId {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<LocaleId> for String {
    fn from(locale: LocaleId) -> Self {
        locale.0
    }
}

/// Locale as written into a TMX document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TmxLocale(String);

impl TmxLocale {
    /// "Do not constrain by target locale"
    pub const EMPTY: TmxLocale = TmxLocale(String::new());

    /// Header source language meaning "applies to all"
    pub const ALL_MARKER: &'static str = "*all*";

    /// The `*all*` wildcard locale
    pub fn all() -> Self {
        Self(Self::ALL_MARKER.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL_MARKER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert back to a platform locale; `None` for the sentinels
    pub fn to_locale_id(&self) -> Option<LocaleId> {
        if self.is_empty() || self.is_all() {
            return None;
        }
        Some(LocaleId(self.0.clone()))
    }
}

impl From<&LocaleId> for TmxLocale {
    fn from(locale: &LocaleId) -> Self {
        Self(locale.0.clone())
    }
}

impl fmt::Display for TmxLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map an optional platform locale to its TMX form.
///
/// Absence maps to `TmxLocale::EMPTY`: the TMX header demands a target locale
/// value, but units written in full carry their own locales and never consult it.
pub fn to_tmx_locale_or_empty(locale: Option<&LocaleId>) -> TmxLocale {
    match locale {
        Some(locale) => TmxLocale::from(locale),
        None => TmxLocale::EMPTY,
    }
}

/// Map an ISO 639-2/B code to its 639-2/T equivalent
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    let part2t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(part2t)
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Option<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code).map(|lang| lang.to_639_3().to_string()),
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Some(normalized_code);
            }
            part2b_to_part2t(&normalized_code).map(str::to_string)
        }
        _ => None,
    }
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
