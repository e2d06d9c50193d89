//! # pdftext
//!
//! A pure Rust PDF parser and text extraction engine. Documents are parsed
//! from an in-memory buffer; the engine never writes PDF and never renders.
//!
//! ## Features
//!
//! - **Lenient parsing**: local syntax recovery, stream length repair, and a
//!   linear scan that rebuilds a missing or damaged cross-reference index
//! - **Incremental updates**: xref tables and xref streams chained through
//!   `/Prev`, newest definition wins
//! - **Text extraction**: simple and composite fonts, ToUnicode CMaps,
//!   `/Differences`, form XObjects, word and line reconstruction from glyph
//!   positions
//! - **Contained failures**: a broken page yields an empty string, the rest of
//!   the document is still extracted
//! - **Encryption**: standard security handler, RC4 and AES-128
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # fn main() -> pdftext::Result<()> {
//! let bytes = std::fs::read("document.pdf")?;
//!
//! println!("{} pages", pdftext::page_count(bytes.as_slice())?);
//! println!("{}", pdftext::extract_all_text(bytes)?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Options and diagnostics
//!
//! ```rust,no_run
//! use pdftext::{ExtractionOptions, ParseOptions, PdfDocument, TextExtractor};
//!
//! # fn main() -> pdftext::Result<()> {
//! let bytes = std::fs::read("protected.pdf")?;
//! let doc = PdfDocument::open(bytes, ParseOptions::default().with_password("secret"))?;
//!
//! let extractor = TextExtractor::with_options(ExtractionOptions {
//!     parallel: true,
//!     ..ExtractionOptions::default()
//! });
//! let result = extractor.extract_document(&doc);
//! for (i, text) in result.pages.iter().enumerate() {
//!     println!("--- page {} ---\n{}", i + 1, text);
//! }
//! if !result.diagnostics.is_clean() {
//!     eprintln!("extracted with problems: {:?}", result.diagnostics);
//! }
//! # Ok(())
//! # }
//! ```

pub mod encryption;
pub mod error;
pub mod parser;
pub mod recovery;
pub mod text;

pub use error::{PdfError, Result};
pub use parser::{
    DocumentInfo, ErrorKind, ParseError, ParseOptions, ParsedPage, PdfDocument, PdfVersion,
    Quality,
};
pub use text::{Diagnostics, DocumentText, ExtractionOptions, TextExtractor};

/// Current version of pdftext
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of pages in a PDF held in memory.
///
/// Fails only when the document catalog cannot be reached, even after
/// rebuilding the cross-reference index, or when the document is encrypted
/// with a non-empty user password.
pub fn page_count(bytes: impl Into<Vec<u8>>) -> Result<usize> {
    let doc = PdfDocument::open(bytes, ParseOptions::default())?;
    Ok(doc.page_count())
}

/// All page text of a PDF held in memory, pages joined by a blank line.
///
/// Pages whose content cannot be decoded contribute an empty string.
pub fn extract_all_text(bytes: impl Into<Vec<u8>>) -> Result<String> {
    extract_text_with(bytes, ParseOptions::default(), ExtractionOptions::default())
        .map(|text| text.join(&ExtractionOptions::default().page_separator))
}

/// Open a document and extract every page with explicit options
pub fn extract_text_with(
    bytes: impl Into<Vec<u8>>,
    parse_options: ParseOptions,
    extraction_options: ExtractionOptions,
) -> Result<DocumentText> {
    let doc = PdfDocument::open(bytes, parse_options)?;
    Ok(TextExtractor::with_options(extraction_options).extract_document(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_helpers::{create_minimal_pdf, simple_text_pdf};

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(simple_text_pdf(&["a", "b"])).unwrap(), 2);
        assert_eq!(page_count(create_minimal_pdf()).unwrap(), 0);
    }

    #[test]
    fn test_extract_all_text() {
        let text = extract_all_text(simple_text_pdf(&["Hello", "World"])).unwrap();
        assert_eq!(text, "Hello\n\nWorld");
    }

    #[test]
    fn test_unreadable_input() {
        assert!(matches!(
            page_count(b"definitely not a pdf".as_slice()),
            Err(PdfError::UnreadableDocument(_))
        ));
        assert!(matches!(
            extract_all_text(Vec::new()),
            Err(PdfError::UnreadableDocument(_))
        ));
    }

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
    }
}
