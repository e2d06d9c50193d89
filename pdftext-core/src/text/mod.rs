//! Text decoding and extraction
//!
//! Fonts map the bytes of show-text operands to Unicode through base
//! encodings, `/Differences`, ToUnicode CMaps and CID-keyed encodings; the
//! extractor runs page content through them and rebuilds words and lines
//! from glyph positions.

pub mod cmap;
pub mod encoding;
pub mod extraction;
pub mod font;
pub mod metrics;

pub use cmap::{CMap, CMapType, CodeRange};
pub use encoding::{decode_text_string, glyph_to_unicode, TextEncoding};
pub use extraction::{
    multiply_matrix, Diagnostics, DocumentText, ExtractionOptions, PageText, TextExtractor,
};
pub use font::{CompositeFont, Font, Glyph, SimpleFont};
pub use metrics::{FontMetrics, StandardFamily};
