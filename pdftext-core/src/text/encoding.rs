//! Single-byte base encodings and glyph names
//!
//! Simple fonts map one-byte codes to glyphs through a base encoding plus an
//! optional `/Differences` array of glyph names. Glyph names are resolved to
//! Unicode through a table of the names fonts actually use plus the `uniXXXX`
//! and `uXXXX` conventions.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Predefined single-byte encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    StandardEncoding,
    MacRomanEncoding,
    WinAnsiEncoding,
    PdfDocEncoding,
    /// Built-in encoding of the Symbol font
    SymbolEncoding,
    /// Built-in encoding of the ZapfDingbats font
    ZapfDingbatsEncoding,
}

impl TextEncoding {
    /// Look up an encoding by its PDF name, e.g. `WinAnsiEncoding`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "StandardEncoding" => Some(TextEncoding::StandardEncoding),
            "MacRomanEncoding" => Some(TextEncoding::MacRomanEncoding),
            "WinAnsiEncoding" => Some(TextEncoding::WinAnsiEncoding),
            "PDFDocEncoding" => Some(TextEncoding::PdfDocEncoding),
            _ => None,
        }
    }

    /// Encoding a simple font uses when it has no `/Encoding` (or no
    /// `/BaseEncoding`). Symbolic standard fonts carry their own.
    pub fn builtin(base_font: &str) -> Self {
        let name = match base_font.split_once('+') {
            Some((tag, rest)) if tag.len() == 6 => rest,
            _ => base_font,
        };
        if name.starts_with("Symbol") {
            TextEncoding::SymbolEncoding
        } else if name.starts_with("ZapfDingbats") || name.starts_with("Dingbats") {
            TextEncoding::ZapfDingbatsEncoding
        } else {
            TextEncoding::StandardEncoding
        }
    }

    /// The character a code maps to, or `None` when the code is unassigned
    pub fn char_for(&self, code: u8) -> Option<char> {
        let unit = self.table()[code as usize];
        if unit == 0 {
            None
        } else {
            char::from_u32(unit as u32)
        }
    }

    /// Decode bytes, skipping unassigned codes
    pub fn decode(&self, data: &[u8]) -> String {
        data.iter().filter_map(|&b| self.char_for(b)).collect()
    }

    fn table(&self) -> &'static [u16; 256] {
        match self {
            TextEncoding::StandardEncoding => &STANDARD,
            TextEncoding::MacRomanEncoding => &MAC_ROMAN,
            TextEncoding::WinAnsiEncoding => &WIN_ANSI,
            TextEncoding::PdfDocEncoding => &PDF_DOC,
            TextEncoding::SymbolEncoding => &SYMBOL,
            TextEncoding::ZapfDingbatsEncoding => &ZAPF_DINGBATS,
        }
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when a byte order mark is
/// present, PDFDocEncoding otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes
        .iter()
        .filter_map(|&b| match b {
            b'\t' | b'\n' | b'\r' => Some(b as char),
            _ => TextEncoding::PdfDocEncoding.char_for(b),
        })
        .collect()
}

/// Resolve a glyph name to the text it represents.
///
/// Handles the common Adobe glyph names, `uniXXXX[XXXX...]`, `uXXXX[XX]`,
/// suffixed variants such as `a.sc`, and `_`-joined ligature names.
pub fn glyph_to_unicode(name: &str) -> Option<String> {
    if let Some(&ch) = GLYPH_NAMES.get(name) {
        return Some(ch.to_string());
    }
    if let Some(hex) = name.strip_prefix("uni") {
        if !hex.is_empty() && hex.len() % 4 == 0 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            let units: Option<Vec<u16>> = (0..hex.len())
                .step_by(4)
                .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
                .collect();
            if let Some(units) = units {
                let text: String = char::decode_utf16(units).filter_map(Result::ok).collect();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from);
        }
    }
    if let Some((base, _suffix)) = name.split_once('.') {
        if !base.is_empty() {
            return glyph_to_unicode(base);
        }
    }
    if name.contains('_') {
        let parts: Option<String> = name
            .split('_')
            .map(glyph_to_unicode)
            .collect();
        return parts;
    }
    None
}

const fn ascii_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0x20;
    while i < 0x7F {
        table[i] = i as u16;
        i += 1;
    }
    table
}

const fn latin1_upper(mut table: [u16; 256]) -> [u16; 256] {
    let mut i = 0xA0;
    while i <= 0xFF {
        table[i] = i as u16;
        i += 1;
    }
    table
}

const fn with(mut table: [u16; 256], start: usize, values: &[u16]) -> [u16; 256] {
    let mut i = 0;
    while i < values.len() {
        table[start + i] = values[i];
        i += 1;
    }
    table
}

static WIN_ANSI: [u16; 256] = with(
    latin1_upper(ascii_table()),
    0x80,
    &[
        0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160,
        0x2039, 0x0152, 0, 0x017D, 0, 0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013,
        0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
    ],
);

static STANDARD: [u16; 256] = with(
    with(with(ascii_table(), 0x27, &[0x2019]), 0x60, &[0x2018]),
    0xA1,
    &[
        // A1..AF
        0x00A1, 0x00A2, 0x00A3, 0x2044, 0x00A5, 0x0192, 0x00A7, 0x00A4, 0x0027, 0x201C,
        0x00AB, 0x2039, 0x203A, 0xFB01, 0xFB02, // B0..BF
        0, 0x2013, 0x2020, 0x2021, 0x00B7, 0, 0x00B6, 0x2022, 0x201A, 0x201E, 0x201D,
        0x00BB, 0x2026, 0x2030, 0, 0x00BF, // C0..CF
        0, 0x0060, 0x00B4, 0x02C6, 0x02DC, 0x00AF, 0x02D8, 0x02D9, 0x00A8, 0, 0x02DA,
        0x00B8, 0, 0x02DD, 0x02DB, 0x02C7, // D0..DF
        0x2014, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // E0..EF
        0, 0x00C6, 0, 0x00AA, 0, 0, 0, 0, 0x0141, 0x00D8, 0x0152, 0x00BA, 0, 0, 0, 0,
        // F0..FF
        0, 0x00E6, 0, 0, 0, 0x0131, 0, 0, 0x0142, 0x00F8, 0x0153, 0x00DF, 0, 0, 0, 0,
    ],
);

static MAC_ROMAN: [u16; 256] = with(
    ascii_table(),
    0x80,
    &[
        // 80..8F
        0x00C4, 0x00C5, 0x00C7, 0x00C9, 0x00D1, 0x00D6, 0x00DC, 0x00E1, 0x00E0, 0x00E2,
        0x00E4, 0x00E3, 0x00E5, 0x00E7, 0x00E9, 0x00E8, // 90..9F
        0x00EA, 0x00EB, 0x00ED, 0x00EC, 0x00EE, 0x00EF, 0x00F1, 0x00F3, 0x00F2, 0x00F4,
        0x00F6, 0x00F5, 0x00FA, 0x00F9, 0x00FB, 0x00FC, // A0..AF
        0x2020, 0x00B0, 0x00A2, 0x00A3, 0x00A7, 0x2022, 0x00B6, 0x00DF, 0x00AE, 0x00A9,
        0x2122, 0x00B4, 0x00A8, 0x2260, 0x00C6, 0x00D8, // B0..BF
        0x221E, 0x00B1, 0x2264, 0x2265, 0x00A5, 0x00B5, 0x2202, 0x2211, 0x220F, 0x03C0,
        0x222B, 0x00AA, 0x00BA, 0x03A9, 0x00E6, 0x00F8, // C0..CF
        0x00BF, 0x00A1, 0x00AC, 0x221A, 0x0192, 0x2248, 0x2206, 0x00AB, 0x00BB, 0x2026,
        0x00A0, 0x00C0, 0x00C3, 0x00D5, 0x0152, 0x0153, // D0..DF
        0x2013, 0x2014, 0x201C, 0x201D, 0x2018, 0x2019, 0x00F7, 0x25CA, 0x00FF, 0x0178,
        0x2044, 0x00A4, 0x2039, 0x203A, 0xFB01, 0xFB02, // E0..EF
        0x2021, 0x00B7, 0x201A, 0x201E, 0x2030, 0x00C2, 0x00CA, 0x00C1, 0x00CB, 0x00C8,
        0x00CD, 0x00CE, 0x00CF, 0x00CC, 0x00D3, 0x00D4, // F0..FF
        0xF8FF, 0x00D2, 0x00DA, 0x00DB, 0x00D9, 0x0131, 0x02C6, 0x02DC, 0x00AF, 0x02D8,
        0x02D9, 0x02DA, 0x00B8, 0x02DD, 0x02DB, 0x02C7,
    ],
);

static PDF_DOC: [u16; 256] = with(
    with(
        with(latin1_upper(ascii_table()), 0x18, &[
            0x02D8, 0x02C7, 0x02C6, 0x02D9, 0x02DD, 0x02DB, 0x02DA, 0x02DC,
        ]),
        0x80,
        &[
            // 80..8F
            0x2022, 0x2020, 0x2021, 0x2026, 0x2014, 0x2013, 0x0192, 0x2044, 0x2039, 0x203A,
            0x2212, 0x2030, 0x201E, 0x201C, 0x201D, 0x2018, // 90..A0
            0x2019, 0x201A, 0x2122, 0xFB01, 0xFB02, 0x0141, 0x0152, 0x0160, 0x0178, 0x017D,
            0x0131, 0x0142, 0x0153, 0x0161, 0x017E, 0, 0x20AC,
        ],
    ),
    0xAD,
    &[0],
);

// Bracket and arrow extenders map to the Unicode pieces, not Adobe's private use area
static SYMBOL: [u16; 256] = with(
    with(
        with(ascii_table(), 0x22, &[0x2200, 0x0023, 0x2203, 0x0025, 0x0026, 0x220B]),
        0x2A,
        &[0x2217, 0x002B, 0x002C, 0x2212],
    ),
    0x40,
    &[
        // 40..4F
        0x2245, 0x0391, 0x0392, 0x03A7, 0x0394, 0x0395, 0x03A6, 0x0393, 0x0397, 0x0399,
        0x03D1, 0x039A, 0x039B, 0x039C, 0x039D, 0x039F, // 50..5F
        0x03A0, 0x0398, 0x03A1, 0x03A3, 0x03A4, 0x03A5, 0x03C2, 0x03A9, 0x039E, 0x03A8,
        0x0396, 0x005B, 0x2234, 0x005D, 0x22A5, 0x005F, // 60..6F
        0x203E, 0x03B1, 0x03B2, 0x03C7, 0x03B4, 0x03B5, 0x03C6, 0x03B3, 0x03B7, 0x03B9,
        0x03D5, 0x03BA, 0x03BB, 0x03BC, 0x03BD, 0x03BF, // 70..7E
        0x03C0, 0x03B8, 0x03C1, 0x03C3, 0x03C4, 0x03C5, 0x03D6, 0x03C9, 0x03BE, 0x03C8,
        0x03B6, 0x007B, 0x007C, 0x007D, 0x223C, 0, // 80..9F unassigned
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, // A0..AF
        0x20AC, 0x03D2, 0x2032, 0x2264, 0x2044, 0x221E, 0x0192, 0x2663, 0x2666, 0x2665,
        0x2660, 0x2194, 0x2190, 0x2191, 0x2192, 0x2193, // B0..BF
        0x00B0, 0x00B1, 0x2033, 0x2265, 0x00D7, 0x221D, 0x2202, 0x2022, 0x00F7, 0x2260,
        0x2261, 0x2248, 0x2026, 0x23D0, 0x23AF, 0x21B5, // C0..CF
        0x2135, 0x2111, 0x211C, 0x2118, 0x2297, 0x2295, 0x2205, 0x2229, 0x222A, 0x2283,
        0x2287, 0x2284, 0x2282, 0x2286, 0x2208, 0x2209, // D0..DF
        0x2220, 0x2207, 0x00AE, 0x00A9, 0x2122, 0x220F, 0x221A, 0x22C5, 0x00AC, 0x2227,
        0x2228, 0x21D4, 0x21D0, 0x21D1, 0x21D2, 0x21D3, // E0..EF
        0x25CA, 0x2329, 0x00AE, 0x00A9, 0x2122, 0x2211, 0x239B, 0x239C, 0x239D, 0x23A1,
        0x23A2, 0x23A3, 0x23A7, 0x23A8, 0x23A9, 0x23AA, // F0..FE
        0, 0x232A, 0x222B, 0x2320, 0x23AE, 0x2321, 0x239E, 0x239F, 0x23A0, 0x23A4, 0x23A5,
        0x23A6, 0x23AB, 0x23AC, 0x23AD,
    ],
);

/// The Dingbats block was laid out after this font, so most codes are a
/// fixed offset into it
const fn zapf_dingbats_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    table[0x20] = 0x20;
    let mut i = 0x21;
    while i <= 0x7E {
        table[i] = 0x2700 + (i as u16 - 0x20);
        i += 1;
    }
    let mut i = 0x80;
    while i <= 0x8D {
        table[i] = 0x2768 + (i as u16 - 0x80);
        i += 1;
    }
    let mut i = 0xA1;
    while i <= 0xFE {
        table[i] = match i {
            0xA1..=0xA7 => 0x2760 + (i as u16 - 0xA0),
            0xAC..=0xB5 => 0x2460 + (i as u16 - 0xAC),
            0xB6..=0xD4 => 0x2776 + (i as u16 - 0xB6),
            0xD8..=0xEF => 0x2798 + (i as u16 - 0xD8),
            0xF1..=0xFE => 0x27B1 + (i as u16 - 0xF1),
            _ => 0,
        };
        i += 1;
    }
    // glyphs unified with characters outside the block
    let moved: [(usize, u16); 17] = [
        (0x25, 0x260E), (0x2A, 0x261B), (0x2B, 0x261E), (0x48, 0x2605), (0x6C, 0x25CF),
        (0x6E, 0x25A0), (0x73, 0x25B2), (0x74, 0x25BC), (0x75, 0x25C6), (0x77, 0x25D7),
        (0xA8, 0x2663), (0xA9, 0x2666), (0xAA, 0x2665), (0xAB, 0x2660), (0xD5, 0x2192),
        (0xD6, 0x2194), (0xD7, 0x2195),
    ];
    let mut i = 0;
    while i < moved.len() {
        table[moved[i].0] = moved[i].1;
        i += 1;
    }
    table
}

static ZAPF_DINGBATS: [u16; 256] = zapf_dingbats_table();

/// Glyph names used by the base encodings and common font subsets
static GLYPH_LIST: &[(&str, char)] = &[
    ("space", ' '), ("exclam", '!'), ("quotedbl", '"'), ("numbersign", '#'),
    ("dollar", '$'), ("percent", '%'), ("ampersand", '&'), ("quotesingle", '\''),
    ("quoteright", '\u{2019}'), ("parenleft", '('), ("parenright", ')'), ("asterisk", '*'),
    ("plus", '+'), ("comma", ','), ("hyphen", '-'), ("period", '.'), ("slash", '/'),
    ("zero", '0'), ("one", '1'), ("two", '2'), ("three", '3'), ("four", '4'),
    ("five", '5'), ("six", '6'), ("seven", '7'), ("eight", '8'), ("nine", '9'),
    ("colon", ':'), ("semicolon", ';'), ("less", '<'), ("equal", '='), ("greater", '>'),
    ("question", '?'), ("at", '@'), ("bracketleft", '['), ("backslash", '\\'),
    ("bracketright", ']'), ("asciicircum", '^'), ("underscore", '_'), ("grave", '`'),
    ("quoteleft", '\u{2018}'), ("braceleft", '{'), ("bar", '|'), ("braceright", '}'),
    ("asciitilde", '~'), ("nbspace", '\u{A0}'), ("nonbreakingspace", '\u{A0}'),
    ("exclamdown", '¡'), ("cent", '¢'), ("sterling", '£'), ("currency", '¤'), ("yen", '¥'),
    ("brokenbar", '¦'), ("section", '§'), ("dieresis", '¨'), ("copyright", '©'),
    ("ordfeminine", 'ª'), ("guillemotleft", '«'), ("logicalnot", '¬'),
    ("sfthyphen", '\u{AD}'), ("registered", '®'), ("macron", '¯'), ("degree", '°'),
    ("plusminus", '±'), ("twosuperior", '²'), ("threesuperior", '³'), ("acute", '´'),
    ("mu", 'µ'), ("paragraph", '¶'), ("periodcentered", '·'), ("middot", '·'),
    ("cedilla", '¸'), ("onesuperior", '¹'), ("ordmasculine", 'º'),
    ("guillemotright", '»'), ("onequarter", '¼'), ("onehalf", '½'),
    ("threequarters", '¾'), ("questiondown", '¿'), ("Agrave", 'À'), ("Aacute", 'Á'),
    ("Acircumflex", 'Â'), ("Atilde", 'Ã'), ("Adieresis", 'Ä'), ("Aring", 'Å'),
    ("AE", 'Æ'), ("Ccedilla", 'Ç'), ("Egrave", 'È'), ("Eacute", 'É'),
    ("Ecircumflex", 'Ê'), ("Edieresis", 'Ë'), ("Igrave", 'Ì'), ("Iacute", 'Í'),
    ("Icircumflex", 'Î'), ("Idieresis", 'Ï'), ("Eth", 'Ð'), ("Ntilde", 'Ñ'),
    ("Ograve", 'Ò'), ("Oacute", 'Ó'), ("Ocircumflex", 'Ô'), ("Otilde", 'Õ'),
    ("Odieresis", 'Ö'), ("multiply", '×'), ("Oslash", 'Ø'), ("Ugrave", 'Ù'),
    ("Uacute", 'Ú'), ("Ucircumflex", 'Û'), ("Udieresis", 'Ü'), ("Yacute", 'Ý'),
    ("Thorn", 'Þ'), ("germandbls", 'ß'), ("agrave", 'à'), ("aacute", 'á'),
    ("acircumflex", 'â'), ("atilde", 'ã'), ("adieresis", 'ä'), ("aring", 'å'),
    ("ae", 'æ'), ("ccedilla", 'ç'), ("egrave", 'è'), ("eacute", 'é'),
    ("ecircumflex", 'ê'), ("edieresis", 'ë'), ("igrave", 'ì'), ("iacute", 'í'),
    ("icircumflex", 'î'), ("idieresis", 'ï'), ("eth", 'ð'), ("ntilde", 'ñ'),
    ("ograve", 'ò'), ("oacute", 'ó'), ("ocircumflex", 'ô'), ("otilde", 'õ'),
    ("odieresis", 'ö'), ("divide", '÷'), ("oslash", 'ø'), ("ugrave", 'ù'),
    ("uacute", 'ú'), ("ucircumflex", 'û'), ("udieresis", 'ü'), ("yacute", 'ý'),
    ("thorn", 'þ'), ("ydieresis", 'ÿ'), ("Amacron", 'Ā'), ("amacron", 'ā'),
    ("Abreve", 'Ă'), ("abreve", 'ă'), ("Aogonek", 'Ą'), ("aogonek", 'ą'),
    ("Cacute", 'Ć'), ("cacute", 'ć'), ("Ccaron", 'Č'), ("ccaron", 'č'),
    ("Dcaron", 'Ď'), ("dcaron", 'ď'), ("Dcroat", 'Đ'), ("dcroat", 'đ'),
    ("Emacron", 'Ē'), ("emacron", 'ē'), ("Edotaccent", 'Ė'), ("edotaccent", 'ė'),
    ("Eogonek", 'Ę'), ("eogonek", 'ę'), ("Ecaron", 'Ě'), ("ecaron", 'ě'),
    ("Gbreve", 'Ğ'), ("gbreve", 'ğ'), ("Imacron", 'Ī'), ("imacron", 'ī'),
    ("Iogonek", 'Į'), ("iogonek", 'į'), ("Idotaccent", 'İ'), ("dotlessi", 'ı'),
    ("Lacute", 'Ĺ'), ("lacute", 'ĺ'), ("Lcaron", 'Ľ'), ("lcaron", 'ľ'),
    ("Lslash", 'Ł'), ("lslash", 'ł'), ("Nacute", 'Ń'), ("nacute", 'ń'),
    ("Ncaron", 'Ň'), ("ncaron", 'ň'), ("Omacron", 'Ō'), ("omacron", 'ō'),
    ("Ohungarumlaut", 'Ő'), ("ohungarumlaut", 'ő'), ("OE", 'Œ'), ("oe", 'œ'),
    ("Racute", 'Ŕ'), ("racute", 'ŕ'), ("Rcaron", 'Ř'), ("rcaron", 'ř'),
    ("Sacute", 'Ś'), ("sacute", 'ś'), ("Scedilla", 'Ş'), ("scedilla", 'ş'),
    ("Scaron", 'Š'), ("scaron", 'š'), ("Tcaron", 'Ť'), ("tcaron", 'ť'),
    ("Umacron", 'Ū'), ("umacron", 'ū'), ("Uring", 'Ů'), ("uring", 'ů'),
    ("Uhungarumlaut", 'Ű'), ("uhungarumlaut", 'ű'), ("Uogonek", 'Ų'), ("uogonek", 'ų'),
    ("Ydieresis", 'Ÿ'), ("Zacute", 'Ź'), ("zacute", 'ź'), ("Zdotaccent", 'Ż'),
    ("zdotaccent", 'ż'), ("Zcaron", 'Ž'), ("zcaron", 'ž'), ("florin", 'ƒ'),
    ("circumflex", 'ˆ'), ("caron", 'ˇ'), ("breve", '˘'), ("dotaccent", '˙'),
    ("ring", '˚'), ("ogonek", '˛'), ("tilde", '˜'), ("hungarumlaut", '˝'),
    ("Alpha", 'Α'), ("Beta", 'Β'), ("Gamma", 'Γ'), ("Delta", '∆'), ("Epsilon", 'Ε'),
    ("Zeta", 'Ζ'), ("Eta", 'Η'), ("Theta", 'Θ'), ("Iota", 'Ι'), ("Kappa", 'Κ'),
    ("Lambda", 'Λ'), ("Mu", 'Μ'), ("Nu", 'Ν'), ("Xi", 'Ξ'), ("Omicron", 'Ο'),
    ("Pi", 'Π'), ("Rho", 'Ρ'), ("Sigma", 'Σ'), ("Tau", 'Τ'), ("Upsilon", 'Υ'),
    ("Phi", 'Φ'), ("Chi", 'Χ'), ("Psi", 'Ψ'), ("Omega", 'Ω'), ("alpha", 'α'),
    ("beta", 'β'), ("gamma", 'γ'), ("delta", 'δ'), ("epsilon", 'ε'), ("zeta", 'ζ'),
    ("eta", 'η'), ("theta", 'θ'), ("iota", 'ι'), ("kappa", 'κ'), ("lambda", 'λ'),
    ("mu1", 'μ'), ("nu", 'ν'), ("xi", 'ξ'), ("omicron", 'ο'), ("pi", 'π'),
    ("rho", 'ρ'), ("sigma1", 'ς'), ("sigma", 'σ'), ("tau", 'τ'), ("upsilon", 'υ'),
    ("phi", 'φ'), ("chi", 'χ'), ("psi", 'ψ'), ("omega", 'ω'), ("endash", '–'),
    ("emdash", '—'), ("quotesinglbase", '‚'), ("quotedblleft", '“'),
    ("quotedblright", '”'), ("quotedblbase", '„'), ("dagger", '†'), ("daggerdbl", '‡'),
    ("bullet", '•'), ("ellipsis", '…'), ("perthousand", '‰'), ("guilsinglleft", '‹'),
    ("guilsinglright", '›'), ("fraction", '⁄'), ("Euro", '€'), ("trademark", '™'),
    ("minus", '−'), ("partialdiff", '∂'), ("product", '∏'), ("summation", '∑'),
    ("radical", '√'), ("infinity", '∞'), ("integral", '∫'), ("approxequal", '≈'),
    ("notequal", '≠'), ("lessequal", '≤'), ("greaterequal", '≥'), ("lozenge", '◊'),
    ("arrowleft", '←'), ("arrowup", '↑'), ("arrowright", '→'), ("arrowdown", '↓'),
    ("apple", '\u{F8FF}'), ("ff", 'ﬀ'), ("fi", 'ﬁ'), ("fl", 'ﬂ'), ("ffi", 'ﬃ'),
    ("ffl", 'ﬄ'),
];

lazy_static! {
    static ref GLYPH_NAMES: HashMap<&'static str, char> = {
        let mut names: HashMap<&'static str, char> = GLYPH_LIST.iter().copied().collect();
        for name in LETTER_NAMES {
            if let Some(c) = name.chars().next() {
                names.insert(name, c);
            }
        }
        names
    };
}

static LETTER_NAMES: [&str; 52] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j",
    "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z",
];
