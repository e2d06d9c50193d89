use crate::parser::{ErrorKind, ParseError};
use thiserror::Error;

/// Errors returned by the public entry points.
///
/// Only failures that stop a whole document surface here; per-page and
/// per-object problems are contained and reported through
/// [`Diagnostics`](crate::text::Diagnostics).
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document unreadable: {0}")]
    UnreadableDocument(String),

    #[error("Document is encrypted and requires a password")]
    EncryptionRequired,

    #[error("Invalid password for encrypted document")]
    InvalidPassword,

    #[error("Unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    #[error("Invalid page number: {0}")]
    InvalidPageNumber(usize),

    /// Any other parse failure, e.g. from strict parsing
    #[error("Parse error: {0}")]
    Parse(ParseError),
}

pub type Result<T> = std::result::Result<T, PdfError>;

impl PdfError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfError::Io(_) => ErrorKind::Io,
            PdfError::UnreadableDocument(_) | PdfError::InvalidPageNumber(_) => {
                ErrorKind::UnreadableDocument
            }
            PdfError::EncryptionRequired
            | PdfError::InvalidPassword
            | PdfError::UnsupportedEncryption(_) => ErrorKind::EncryptionRequired,
            PdfError::Parse(e) => e.kind(),
        }
    }
}

impl From<ParseError> for PdfError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io(e) => PdfError::Io(e),
            ParseError::EncryptionRequired => PdfError::EncryptionRequired,
            ParseError::InvalidPassword => PdfError::InvalidPassword,
            ParseError::UnsupportedEncryption(what) => PdfError::UnsupportedEncryption(what),
            ParseError::Unreadable(why) => PdfError::UnreadableDocument(why),
            ParseError::EmptyFile => PdfError::UnreadableDocument("empty file".to_string()),
            other => PdfError::Parse(other),
        }
    }
}
