//! PDF Header Parser
//!
//! Parses PDF header and version according to ISO 32000-1 Section 7.5.2

use super::lexer::find_bytes;
use super::{ParseError, ParseResult};

/// How far into the file the `%PDF-` marker is searched for. Some producers
/// and mail gateways prepend junk before the real header.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    /// Create a new PDF version
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Check if this version is one ISO 32000 defines
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }

    /// Parse the `major.minor` part of a header line or a catalog `/Version` name
    pub fn parse(text: &str) -> Option<Self> {
        let (major, minor) = text.trim().split_once('.')?;
        let minor: String = minor.chars().take_while(|c| c.is_ascii_digit()).collect();
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::new(1, 4)
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF Header information
#[derive(Debug, Clone)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Byte offset of `%PDF-`; non-zero when garbage precedes the header
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    /// Locate and parse the header near the start of `data`
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
        let offset = find_bytes(window, b"%PDF-").ok_or(ParseError::InvalidHeader)?;

        let line_start = offset + 5;
        let line_end = data[line_start..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .map(|i| line_start + i)
            .unwrap_or(data.len());
        let line = String::from_utf8_lossy(&data[line_start..line_end.min(line_start + 100)]);

        let version = PdfVersion::parse(&line).ok_or(ParseError::InvalidHeader)?;
        if !version.is_supported() {
            tracing::debug!("unusual PDF version {} in header", version);
        }

        Ok(PdfHeader {
            version,
            offset,
            has_binary_marker: Self::check_binary_marker(&data[line_end..]),
        })
    }

    /// Check for the binary marker comment on the line after the header
    fn check_binary_marker(rest: &[u8]) -> bool {
        let start = rest
            .iter()
            .position(|&b| b != b'\n' && b != b'\r')
            .unwrap_or(rest.len());
        let line = &rest[start..];
        if line.first() != Some(&b'%') {
            return false;
        }
        line.iter()
            .skip(1)
            .take_while(|&&b| b != b'\n' && b != b'\r')
            .take(1024)
            .filter(|&&b| b >= 128)
            .count()
            >= 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pdf_header_basic() {
        let header = PdfHeader::parse(b"%PDF-1.7\n").unwrap();
        assert_eq!(header.version, PdfVersion::new(1, 7));
        assert_eq!(header.offset, 0);
        assert!(!header.has_binary_marker);
    }

    #[test]
    fn test_parse_pdf_header_with_binary_marker() {
        let header = PdfHeader::parse(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n1 0 obj").unwrap();
        assert_eq!(header.version, PdfVersion::new(1, 4));
        assert!(header.has_binary_marker);
    }

    #[test]
    fn test_parse_pdf_20_crlf() {
        let header = PdfHeader::parse(b"%PDF-2.0\r\n").unwrap();
        assert_eq!(header.version, PdfVersion::new(2, 0));
    }

    #[test]
    fn test_header_after_garbage() {
        let header = PdfHeader::parse(b"GARBAGE BYTES\n%PDF-1.5\n").unwrap();
        assert_eq!(header.offset, 14);
        assert_eq!(header.version.minor, 5);
    }

    #[test]
    fn test_invalid_headers() {
        assert!(matches!(PdfHeader::parse(b""), Err(ParseError::EmptyFile)));
        assert!(matches!(
            PdfHeader::parse(b"Hello world"),
            Err(ParseError::InvalidHeader)
        ));
        assert!(matches!(
            PdfHeader::parse(b"%PDF-abc\n"),
            Err(ParseError::InvalidHeader)
        ));
    }

    #[test]
    fn test_version_parse_and_display() {
        assert_eq!(PdfVersion::parse("1.6"), Some(PdfVersion::new(1, 6)));
        assert_eq!(PdfVersion::parse("1.3 "), Some(PdfVersion::new(1, 3)));
        assert_eq!(PdfVersion::parse("x"), None);
        assert_eq!(PdfVersion::new(1, 7).to_string(), "1.7");
        assert!(!PdfVersion::new(3, 1).is_supported());
    }
}
