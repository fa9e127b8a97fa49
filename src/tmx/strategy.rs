/*!
 * Translation-unit extraction strategies.
 */

use std::io::Write;

use crate::errors::ExportError;
use crate::locale::{LocaleId, TmxLocale};
use crate::model::{TextFlow, TextFlowTarget};

use super::record::{TranslationUnitRecord, TuVariant};
use super::writer::{xml_safe, TmxWriter};

/// Decides which translations of a text flow are exported and writes the unit
pub trait ExportTuStrategy {
    /// Write zero or one translation unit for `text_flow`.
    ///
    /// Returns `true` when a unit was written.
    fn export_translation_unit<W: Write>(
        &self,
        writer: &mut TmxWriter<W>,
        tuid_prefix: &str,
        text_flow: &TextFlow,
        source_locale: &TmxLocale,
    ) -> Result<bool, ExportError>;
}

/// Exports the source text plus finished translations.
///
/// With a target locale only that locale's translation is attached, otherwise
/// every finished translation the text flow carries.
#[derive(Debug, Clone, Default)]
pub struct TranslatedContentStrategy {
    target_locale: Option<LocaleId>,
}

impl TranslatedContentStrategy {
    pub fn new(target_locale: Option<LocaleId>) -> Self {
        Self { target_locale }
    }

    pub fn target_locale(&self) -> Option<&LocaleId> {
        self.target_locale.as_ref()
    }

    fn is_exportable(target: &TextFlowTarget) -> bool {
        target.state.is_translated() && !xml_safe(&target.content).is_empty()
    }

    /// Build the record without writing it
    pub fn build_record<'a>(
        &self,
        tuid_prefix: &str,
        text_flow: &'a TextFlow,
        source_locale: &TmxLocale,
    ) -> Option<TranslationUnitRecord<'a>> {
        if text_flow.obsolete {
            return None;
        }
        let source_text = text_flow.source_text()?;
        if xml_safe(source_text).is_empty() {
            return None;
        }

        let source_locale = text_flow
            .source_locale
            .as_ref()
            .map(TmxLocale::from)
            .unwrap_or_else(|| source_locale.clone());

        let mut record = TranslationUnitRecord::new(
            format!("{}{}", tuid_prefix, text_flow.id),
            TuVariant::new(source_locale, source_text),
        );

        let candidates: Box<dyn Iterator<Item = (&LocaleId, &TextFlowTarget)>> =
            match &self.target_locale {
                Some(locale) => Box::new(text_flow.targets.get_key_value(locale).into_iter()),
                None => Box::new(text_flow.targets.iter()),
            };

        for (locale, target) in candidates {
            if Self::is_exportable(target) {
                record.add_target(TmxLocale::from(locale), &target.content);
            }
        }

        Some(record)
    }
}

impl ExportTuStrategy for TranslatedContentStrategy {
    fn export_translation_unit<W: Write>(
        &self,
        writer: &mut TmxWriter<W>,
        tuid_prefix: &str,
        text_flow: &TextFlow,
        source_locale: &TmxLocale,
    ) -> Result<bool, ExportError> {
        match self.build_record(tuid_prefix, text_flow, source_locale) {
            Some(record) => {
                writer.write_translation_unit(&record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
