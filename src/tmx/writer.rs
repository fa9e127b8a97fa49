/*!
 * TMX writer adapter.
 *
 * Wraps a quick-xml writer with TMX 1.4 document framing: a header written
 * once, any number of translation units, and a closing frame written once.
 * The adapter holds no business logic; it only guarantees the shape of the
 * output and hands the wrapped writer back on release.
 */

use std::borrow::Cow;
use std::io::Write;

use log::debug;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::errors::ExportError;
use crate::locale::TmxLocale;

use super::record::{TranslationUnitRecord, TuVariant};

const TMX_VERSION: &str = "1.4";

/// Metadata written into the TMX `<header>`
#[derive(Debug, Clone, PartialEq)]
pub struct TmxHeader {
    /// Header `srclang`; the `*all*` wildcard when units carry their own source locales
    pub source_locale: TmxLocale,
    /// Target locale the export is restricted to, or `TmxLocale::EMPTY`
    pub target_locale: TmxLocale,
    pub creation_tool: String,
    pub creation_tool_version: String,
    pub segment_type: String,
    pub original_format: String,
    pub admin_lang: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    NotStarted,
    Open,
    Closed,
}

/// Streams TMX elements to the wrapped XML writer
pub struct TmxWriter<W: Write> {
    xml: Writer<W>,
    frame: Frame,
    target_locale: TmxLocale,
    units_written: u64,
}

impl<W: Write> TmxWriter<W> {
    pub fn new(xml: Writer<W>) -> Self {
        Self {
            xml,
            frame: Frame::NotStarted,
            target_locale: TmxLocale::EMPTY,
            units_written: 0,
        }
    }

    /// Number of `<tu>` elements written so far
    pub fn units_written(&self) -> u64 {
        self.units_written
    }

    /// Target locale declared at document start
    pub fn target_locale(&self) -> &TmxLocale {
        &self.target_locale
    }

    pub fn write_start_document(&mut self, header: &TmxHeader) -> Result<(), ExportError> {
        if self.frame != Frame::NotStarted {
            return Err(ExportError::Framing("document start written twice"));
        }

        self.xml
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut tmx = BytesStart::new("tmx");
        tmx.push_attribute(("version", TMX_VERSION));
        self.xml.write_event(Event::Start(tmx))?;

        let mut head = BytesStart::new("header");
        head.push_attribute(("creationtool", header.creation_tool.as_str()));
        head.push_attribute(("creationtoolversion", header.creation_tool_version.as_str()));
        head.push_attribute(("segtype", header.segment_type.as_str()));
        head.push_attribute(("o-tmf", header.original_format.as_str()));
        head.push_attribute(("adminlang", header.admin_lang.as_str()));
        head.push_attribute(("srclang", header.source_locale.as_str()));
        head.push_attribute(("datatype", header.data_type.as_str()));
        self.xml.write_event(Event::Empty(head))?;

        self.xml.write_event(Event::Start(BytesStart::new("body")))?;

        self.target_locale = header.target_locale.clone();
        self.frame = Frame::Open;
        debug!(
            "TMX document started (srclang={}, target={})",
            header.source_locale,
            if self.target_locale.is_empty() { "<all>" } else { self.target_locale.as_str() }
        );
        Ok(())
    }

    /// Serialize one unit immediately; the record is not retained
    pub fn write_translation_unit(
        &mut self,
        record: &TranslationUnitRecord<'_>,
    ) -> Result<(), ExportError> {
        match self.frame {
            Frame::NotStarted => {
                return Err(ExportError::Framing("translation unit written before document start"))
            }
            Frame::Closed => {
                return Err(ExportError::Framing("translation unit written after document end"))
            }
            Frame::Open => {}
        }

        let mut tu = BytesStart::new("tu");
        tu.push_attribute(("tuid", record.tuid.as_str()));
        if !record.source.locale.is_empty() {
            tu.push_attribute(("srclang", record.source.locale.as_str()));
        }
        self.xml.write_event(Event::Start(tu))?;

        for variant in record.variants() {
            self.write_variant(variant)?;
        }

        self.xml.write_event(Event::End(BytesEnd::new("tu")))?;
        self.units_written += 1;
        Ok(())
    }

    fn write_variant(&mut self, variant: &TuVariant<'_>) -> Result<(), ExportError> {
        let mut tuv = BytesStart::new("tuv");
        tuv.push_attribute(("xml:lang", variant.locale.as_str()));
        self.xml.write_event(Event::Start(tuv))?;

        self.xml.write_event(Event::Start(BytesStart::new("seg")))?;
        let text = xml_safe(variant.text);
        self.xml
            .write_event(Event::Text(BytesText::from_escaped(escape_segment(&text))))?;
        self.xml.write_event(Event::End(BytesEnd::new("seg")))?;

        self.xml.write_event(Event::End(BytesEnd::new("tuv")))?;
        Ok(())
    }

    /// Close `<body>` and `<tmx>`; valid after zero units
    pub fn write_end_document(&mut self) -> Result<(), ExportError> {
        match self.frame {
            Frame::NotStarted => {
                return Err(ExportError::Framing("document end written before document start"))
            }
            Frame::Closed => return Err(ExportError::Framing("document end written twice")),
            Frame::Open => {}
        }

        self.xml.write_event(Event::End(BytesEnd::new("body")))?;
        self.xml.write_event(Event::End(BytesEnd::new("tmx")))?;
        self.frame = Frame::Closed;
        debug!("TMX document closed after {} units", self.units_written);
        Ok(())
    }

    /// Release this layer, handing back the XML writer it wrapped
    pub fn release(self) -> Writer<W> {
        self.xml
    }
}

/// Drop characters XML 1.0 cannot represent
pub(crate) fn xml_safe(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| {
        matches!(c, '\t' | '\n' | '\r')
            || ('\u{20}'..='\u{D7FF}').contains(&c)
            || ('\u{E000}'..='\u{FFFD}').contains(&c)
            || c >= '\u{10000}'
    };

    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| allowed(*c)).collect())
    }
}

/// Escape markup characters and carriage returns, which parsers would fold into line feeds
fn escape_segment(text: &str) -> Cow<'_, str> {
    let escaped = escape(text);
    if escaped.contains('\r') {
        Cow::Owned(escaped.replace('\r', "&#13;"))
    } else {
        escaped
    }
}
