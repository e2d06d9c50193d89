//! Fonts as seen by text extraction
//!
//! A font turns the bytes of a show-text operand into glyphs: the Unicode text
//! each code stands for (when known) and its horizontal advance. Simple fonts
//! use one byte per code; composite (Type0) fonts split bytes into codes with
//! their encoding CMap.

use super::cmap::{CMap, CMapType};
use super::encoding::{glyph_to_unicode, TextEncoding};
use super::metrics::{FontMetrics, StandardFamily};
use crate::parser::objects::{PdfDictionary, PdfObject};
use crate::parser::PdfDocument;
use std::collections::HashMap;

/// One decoded character code
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Unicode text of the code; `None` when the font has no mapping for it
    pub text: Option<String>,
    /// Advance in unscaled text space (1.0 = one em at font size 1)
    pub width: f32,
    /// Single-byte code 32, which also receives word spacing
    pub is_space: bool,
}

/// A font resource ready for decoding
#[derive(Debug, Clone)]
pub enum Font {
    Simple(SimpleFont),
    Composite(CompositeFont),
}

/// Type1, TrueType, MMType1 and Type3 fonts
#[derive(Debug, Clone)]
pub struct SimpleFont {
    pub base_font: String,
    /// Text for each of the 256 codes after applying `/Differences`
    encoding: Vec<Option<String>>,
    to_unicode: Option<CMap>,
    first_char: u32,
    widths: Vec<f32>,
    missing_width: f32,
    standard_metrics: Option<&'static FontMetrics>,
    /// Glyph space to text space; 0.001 except for Type3 fonts
    scale: f32,
    unsupported: Option<String>,
}

/// Type0 fonts with a CID-keyed descendant
#[derive(Debug, Clone)]
pub struct CompositeFont {
    pub base_font: String,
    encoding: CMap,
    to_unicode: Option<CMap>,
    default_width: f32,
    widths: HashMap<u32, f32>,
    unsupported: Option<String>,
}

impl Font {
    /// Build a font from its resource dictionary.
    ///
    /// Never fails: missing or unreadable pieces degrade to defaults and the
    /// reason is reported by [`Font::unsupported_encoding`].
    pub fn load(doc: &PdfDocument, dict: &PdfDictionary) -> Font {
        match dict.get("Subtype").and_then(|s| s.as_name()).map(|n| n.as_str()) {
            Some("Type0") => Font::Composite(CompositeFont::load(doc, dict)),
            _ => Font::Simple(SimpleFont::load(doc, dict)),
        }
    }

    /// Font used when `Tf` names a resource that does not exist
    pub fn fallback() -> Font {
        Font::Simple(SimpleFont::standard(TextEncoding::StandardEncoding))
    }

    pub fn base_font(&self) -> &str {
        match self {
            Font::Simple(f) => &f.base_font,
            Font::Composite(f) => &f.base_font,
        }
    }

    /// Why this font decodes in a degraded way, if it does
    pub fn unsupported_encoding(&self) -> Option<&str> {
        match self {
            Font::Simple(f) => f.unsupported.as_deref(),
            Font::Composite(f) => f.unsupported.as_deref(),
        }
    }

    pub fn is_vertical(&self) -> bool {
        match self {
            Font::Simple(_) => false,
            Font::Composite(f) => f.encoding.is_vertical(),
        }
    }

    /// Decode a show-text operand into glyphs
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        match self {
            Font::Simple(f) => bytes.iter().map(|&code| f.glyph(code)).collect(),
            Font::Composite(f) => f.encoding.codes(bytes).map(|code| f.glyph(code)).collect(),
        }
    }
}

impl SimpleFont {
    fn standard(base: TextEncoding) -> Self {
        Self {
            base_font: String::new(),
            encoding: (0..=255u8)
                .map(|code| base.char_for(code).map(String::from))
                .collect(),
            to_unicode: None,
            first_char: 0,
            widths: Vec::new(),
            missing_width: 0.5,
            standard_metrics: None,
            scale: 0.001,
            unsupported: None,
        }
    }

    fn load(doc: &PdfDocument, dict: &PdfDictionary) -> Self {
        let subtype = name_of(dict.get("Subtype")).unwrap_or_default();
        let base_font = name_of(dict.get("BaseFont")).unwrap_or_default();
        let mut unsupported = None;

        let encoding_obj = dict.get("Encoding").map(|e| doc.resolve(e));
        let (base_name, differences) = match encoding_obj.as_deref() {
            Some(PdfObject::Name(name)) => (Some(name.as_str().to_string()), None),
            Some(PdfObject::Dictionary(enc)) => (
                name_of(enc.get("BaseEncoding")),
                enc.get("Differences").map(|d| doc.resolve(d)),
            ),
            _ => (None, None),
        };
        let builtin = TextEncoding::builtin(&base_font);
        let base = match base_name.as_deref() {
            Some(name) => TextEncoding::from_name(name).unwrap_or_else(|| {
                tracing::debug!("font {}: unsupported base encoding {}", base_font, name);
                unsupported = Some(format!("base encoding {name}"));
                builtin
            }),
            None => builtin,
        };

        let mut font = SimpleFont {
            base_font,
            ..SimpleFont::standard(base)
        };
        if let Some(differences) = differences.as_deref().and_then(|d| d.as_array()) {
            font.apply_differences(differences.iter().map(|d| doc.resolve(d)));
        }

        font.to_unicode = load_to_unicode(doc, dict);

        font.first_char = dict
            .get("FirstChar")
            .and_then(|c| doc.resolve(c).as_integer())
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(0);
        font.widths = number_array(doc, dict.get("Widths"));
        let descriptor = dict.get("FontDescriptor").map(|d| doc.resolve(d));
        if let Some(missing) = descriptor
            .as_deref()
            .and_then(|d| d.as_dict())
            .and_then(|d| d.get("MissingWidth"))
            .and_then(|w| doc.resolve(w).as_f32())
        {
            font.missing_width = missing * 0.001;
        }
        if font.widths.is_empty() {
            font.standard_metrics = StandardFamily::from_base_font(&font.base_font).map(|f| f.metrics());
        }

        if subtype == "Type3" {
            let matrix = number_array(doc, dict.get("FontMatrix"));
            if let Some(&sx) = matrix.first() {
                font.scale = sx;
            }
            // MissingWidth is glyph space too
            font.missing_width = font.missing_width * 1000.0 * font.scale;
        }

        font.unsupported = unsupported;
        font
    }

    fn apply_differences(&mut self, entries: impl Iterator<Item = std::sync::Arc<PdfObject>>) {
        let mut code: Option<usize> = None;
        for entry in entries {
            match entry.as_ref() {
                PdfObject::Integer(start) => code = usize::try_from(*start).ok(),
                PdfObject::Name(glyph) => {
                    if let Some(c) = code.filter(|&c| c < 256) {
                        self.encoding[c] = glyph_to_unicode(glyph.as_str());
                    }
                    code = code.map(|c| c.saturating_add(1));
                }
                _ => {}
            }
        }
    }

    fn glyph(&self, code: u8) -> Glyph {
        let text = self
            .to_unicode
            .as_ref()
            .and_then(|cmap| cmap.unicode(&[code]))
            .or_else(|| self.encoding[code as usize].clone());

        let index = (code as u32).checked_sub(self.first_char);
        let width = match index.and_then(|i| self.widths.get(i as usize)) {
            Some(&w) => w * self.scale,
            None => match (self.standard_metrics, text.as_deref().and_then(|t| t.chars().next())) {
                (Some(metrics), Some(ch)) => metrics.char_width(ch) as f32 * 0.001,
                _ => self.missing_width,
            },
        };

        Glyph {
            text,
            width,
            is_space: code == b' ',
        }
    }
}

impl CompositeFont {
    fn load(doc: &PdfDocument, dict: &PdfDictionary) -> Self {
        let base_font = name_of(dict.get("BaseFont")).unwrap_or_default();
        let mut unsupported = None;

        let encoding = match dict.get("Encoding").map(|e| doc.resolve(e)).as_deref() {
            Some(PdfObject::Name(name)) => CMap::predefined(name.as_str()).unwrap_or_else(|| {
                unsupported = Some(format!("predefined CMap {}", name.as_str()));
                CMap::identity_h()
            }),
            Some(PdfObject::Stream(stream)) => doc
                .decode_stream(stream)
                .and_then(|data| CMap::parse(&data))
                .unwrap_or_else(|e| {
                    unsupported = Some(format!("embedded CMap: {e}"));
                    CMap::identity_h()
                }),
            _ => {
                unsupported = Some("missing Type0 encoding".to_string());
                CMap::identity_h()
            }
        };

        let to_unicode = load_to_unicode(doc, dict);
        if to_unicode.is_none() && encoding.cmap_type != CMapType::Utf16 && unsupported.is_none() {
            // Codes still split correctly; text falls back to the placeholder
            tracing::debug!("font {}: composite font without ToUnicode", base_font);
        }

        let descendant = dict
            .get("DescendantFonts")
            .map(|d| doc.resolve(d))
            .and_then(|d| d.as_array().and_then(|a| a.get(0)).map(|f| doc.resolve(f)));
        let descendant = descendant.as_deref().and_then(|d| d.as_dict());

        let default_width = descendant
            .and_then(|d| d.get("DW"))
            .and_then(|w| doc.resolve(w).as_f32())
            .unwrap_or(1000.0)
            * 0.001;
        let widths = descendant
            .and_then(|d| d.get("W"))
            .map(|w| parse_cid_widths(doc, &doc.resolve(w)))
            .unwrap_or_default();

        if let Some(reason) = &unsupported {
            tracing::debug!("font {}: {}", base_font, reason);
        }

        Self {
            base_font,
            encoding,
            to_unicode,
            default_width,
            widths,
            unsupported,
        }
    }

    fn glyph(&self, code: &[u8]) -> Glyph {
        let text = self
            .to_unicode
            .as_ref()
            .and_then(|cmap| cmap.unicode(code))
            .or_else(|| self.encoding.unicode(code));

        let width = self
            .encoding
            .cid(code)
            .and_then(|cid| self.widths.get(&cid).copied())
            .unwrap_or(self.default_width);

        Glyph {
            text,
            width,
            is_space: code == [b' '],
        }
    }
}

/// `/W` array: `c [w1 w2 ...]` and `c_first c_last w` groups, widths in 1/1000
fn parse_cid_widths(doc: &PdfDocument, w: &PdfObject) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let Some(items) = w.as_array() else {
        return widths;
    };
    let items: Vec<_> = items.iter().map(|i| doc.resolve(i)).collect();
    let mut i = 0;
    while i + 1 < items.len() {
        let Some(first) = items[i].as_integer().and_then(|c| u32::try_from(c).ok()) else {
            i += 1;
            continue;
        };
        if let Some(list) = items[i + 1].as_array() {
            for (offset, width) in list.iter().enumerate() {
                let Some(cid) = u32::try_from(offset).ok().and_then(|o| first.checked_add(o))
                else {
                    break;
                };
                if let Some(width) = doc.resolve(width).as_f32() {
                    widths.insert(cid, width * 0.001);
                }
            }
            i += 2;
        } else if i + 2 < items.len() {
            let last = items[i + 1].as_integer().and_then(|c| u32::try_from(c).ok());
            if let (Some(last), Some(width)) = (last, items[i + 2].as_f32()) {
                // Cap pathological ranges
                for cid in first..=last.min(first.saturating_add(0xFFFF)) {
                    widths.insert(cid, width * 0.001);
                }
            }
            i += 3;
        } else {
            break;
        }
    }
    widths
}

fn load_to_unicode(doc: &PdfDocument, dict: &PdfDictionary) -> Option<CMap> {
    let obj = doc.resolve(dict.get("ToUnicode")?);
    match obj.as_ref() {
        PdfObject::Stream(stream) => match doc.decode_stream(stream).and_then(|d| CMap::parse(&d)) {
            Ok(cmap) => Some(cmap),
            Err(e) => {
                tracing::debug!("unreadable ToUnicode CMap: {}", e);
                None
            }
        },
        // Identity-H as ToUnicode means codes are UTF-16BE
        PdfObject::Name(name) => CMap::predefined(name.as_str())
            .filter(|c| c.cmap_type == CMapType::Utf16)
            .or_else(|| CMap::predefined("UniGB-UCS2-H")),
        _ => None,
    }
}

fn name_of(obj: Option<&PdfObject>) -> Option<String> {
    obj.and_then(|o| o.as_name()).map(|n| n.as_str().to_string())
}

fn number_array(doc: &PdfDocument, obj: Option<&PdfObject>) -> Vec<f32> {
    let Some(obj) = obj else {
        return Vec::new();
    };
    let resolved = doc.resolve(obj);
    resolved
        .as_array()
        .map(|a| {
            a.iter()
                .map(|n| doc.resolve(n).as_f32().unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default()
}
