/*!
 * Translation-unit records.
 *
 * A record borrows its texts from the text flow it was built from and lives
 * only until the writer has serialized it.
 */

use crate::locale::TmxLocale;

/// One language variant of a translation unit (`<tuv>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuVariant<'a> {
    pub locale: TmxLocale,
    pub text: &'a str,
}

impl<'a> TuVariant<'a> {
    pub fn new(locale: TmxLocale, text: &'a str) -> Self {
        Self { locale, text }
    }
}

/// A TMX translation unit (`<tu>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnitRecord<'a> {
    /// Unique id within the document (`tuid`)
    pub tuid: String,
    /// Source-language variant, written first
    pub source: TuVariant<'a>,
    /// Target-language variants in insertion order
    pub targets: Vec<TuVariant<'a>>,
}

impl<'a> TranslationUnitRecord<'a> {
    pub fn new(tuid: String, source: TuVariant<'a>) -> Self {
        Self {
            tuid,
            source,
            targets: Vec::new(),
        }
    }

    pub fn add_target(&mut self, locale: TmxLocale, text: &'a str) {
        self.targets.push(TuVariant::new(locale, text));
    }

    /// Source followed by targets
    pub fn variants(&self) -> impl Iterator<Item = &TuVariant<'a>> {
        std::iter::once(&self.source).chain(self.targets.iter())
    }
}
