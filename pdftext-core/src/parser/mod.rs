//! PDF Parser Module
//!
//! Read-only parser for the PDF container format (ISO 32000-1). The pieces are
//! layered leaf-first:
//!
//! - [`lexer`]: byte scanner producing lexical tokens
//! - [`objects`]: object model and the parser that builds it from tokens
//! - [`xref`] / [`xref_stream`] / [`trailer`]: cross-reference index and trailer chain
//! - [`object_stream`]: compressed objects stored inside `/ObjStm` streams
//! - [`filters`]: stream decode filters
//! - [`document`]: the owning [`PdfDocument`] with its lazily filled object cache
//! - [`page_tree`]: flattening of the page tree into an ordered page list
//! - [`content`]: content stream operator parsing

pub mod content;
pub mod document;
pub mod encryption_handler;
pub mod filter_impls;
pub mod filters;
pub mod header;
pub mod lexer;
pub mod object_stream;
pub mod objects;
pub mod page_tree;
pub mod trailer;
pub mod xref;
pub mod xref_stream;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use self::content::{ContentOperation, ContentParser, TextElement};
pub use self::document::{DocumentInfo, PdfDocument, Quality};
pub use self::header::PdfVersion;
pub use self::objects::{
    ObjectId, PdfArray, PdfDictionary, PdfName, PdfObject, PdfStream, PdfString,
};
pub use self::page_tree::{PageTree, ParsedPage};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Invalid object reference: {0} {1} R")]
    InvalidReference(u32, u16),

    #[error("Missing required key: {0}")]
    MissingKey(String),

    #[error("Invalid xref table")]
    InvalidXRef,

    #[error("Invalid trailer")]
    InvalidTrailer,

    #[error("Circular reference detected: {0}")]
    CircularReference(String),

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Document is encrypted and requires a password")]
    EncryptionRequired,

    #[error("Invalid password for encrypted document")]
    InvalidPassword,

    #[error("Unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    #[error("Document unreadable: {0}")]
    Unreadable(String),
}

/// Coarse classification of a [`ParseError`].
///
/// Callers use it to decide whether a failure is fatal for the whole document
/// or only degrades a part of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Token or object level syntax problem
    MalformedSyntax,
    /// A cycle in the page tree or the object graph
    StructuralCycle,
    /// No catalog reachable, even after xref reconstruction
    UnreadableDocument,
    /// A stream filter the engine cannot decode
    UnsupportedFilter,
    /// A font or text encoding the engine cannot map
    UnsupportedEncoding,
    /// Encrypted document without a valid password
    EncryptionRequired,
    /// Failure reading the input
    Io,
}

impl ParseError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::Io(_) => ErrorKind::Io,
            ParseError::EmptyFile | ParseError::Unreadable(_) => ErrorKind::UnreadableDocument,
            ParseError::InvalidHeader
            | ParseError::SyntaxError { .. }
            | ParseError::UnexpectedToken { .. }
            | ParseError::InvalidReference(..)
            | ParseError::MissingKey(_)
            | ParseError::InvalidXRef
            | ParseError::InvalidTrailer
            | ParseError::StreamDecodeError(_) => ErrorKind::MalformedSyntax,
            ParseError::CircularReference(_) => ErrorKind::StructuralCycle,
            ParseError::UnsupportedFilter(_) => ErrorKind::UnsupportedFilter,
            ParseError::UnsupportedEncoding(_) => ErrorKind::UnsupportedEncoding,
            ParseError::EncryptionRequired
            | ParseError::InvalidPassword
            | ParseError::UnsupportedEncryption(_) => ErrorKind::EncryptionRequired,
        }
    }

    /// Whether this error prevents opening the document at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnreadableDocument | ErrorKind::EncryptionRequired | ErrorKind::Io
        )
    }

    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            position,
            message: message.into(),
        }
    }
}

/// Options controlling how strictly documents are parsed.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Tolerate syntax errors (missing `endobj`, bad stream lengths, stray bytes)
    pub lenient_syntax: bool,
    /// Rebuild the cross-reference index by scanning the file when it is damaged
    pub recover_xref: bool,
    /// Password for encrypted documents; the empty password is always tried
    pub password: Option<String>,
    /// Maximum nesting of arrays and dictionaries inside one object
    pub max_nesting_depth: usize,
    /// Maximum depth of the page tree and of nested form XObjects
    pub max_tree_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParseOptions {
    /// Best-effort parsing, the mode used for real-world files.
    pub fn lenient() -> Self {
        Self {
            lenient_syntax: true,
            recover_xref: true,
            password: None,
            max_nesting_depth: 256,
            max_tree_depth: 64,
        }
    }

    /// Standards-conforming parsing without any reconstruction.
    pub fn strict() -> Self {
        Self {
            lenient_syntax: false,
            recover_xref: false,
            ..Self::lenient()
        }
    }

    /// Set the password used to unlock encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ParseError::syntax(3, "bad").kind(),
            ErrorKind::MalformedSyntax
        );
        assert_eq!(
            ParseError::CircularReference("2 0 R".into()).kind(),
            ErrorKind::StructuralCycle
        );
        assert_eq!(
            ParseError::UnsupportedFilter("DCTDecode".into()).kind(),
            ErrorKind::UnsupportedFilter
        );
        assert_eq!(
            ParseError::InvalidPassword.kind(),
            ErrorKind::EncryptionRequired
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ParseError::EncryptionRequired.is_fatal());
        assert!(ParseError::Unreadable("no catalog".into()).is_fatal());
        assert!(!ParseError::UnsupportedFilter("JBIG2Decode".into()).is_fatal());
        assert!(!ParseError::syntax(0, "x").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = ParseError::syntax(42, "unterminated string");
        assert_eq!(
            err.to_string(),
            "Syntax error at position 42: unterminated string"
        );
        assert_eq!(
            ParseError::InvalidReference(7, 1).to_string(),
            "Invalid object reference: 7 1 R"
        );
    }

    #[test]
    fn test_options_presets() {
        let lenient = ParseOptions::lenient();
        assert!(lenient.lenient_syntax);
        assert!(lenient.recover_xref);
        assert!(lenient.password.is_none());

        let strict = ParseOptions::strict();
        assert!(!strict.lenient_syntax);
        assert!(!strict.recover_xref);
        assert_eq!(strict.max_nesting_depth, lenient.max_nesting_depth);

        let with_pw = ParseOptions::default().with_password("secret");
        assert_eq!(with_pw.password.as_deref(), Some("secret"));
    }
}
