//! PDF Trailer Parser
//!
//! Parses PDF trailer according to ISO 32000-1 Section 7.5.5

use super::objects::{ObjectId, PdfDictionary, PdfObject};
use super::{ParseError, ParseResult};

/// The effective trailer of a document: the newest trailer dictionary with
/// keys missing from it filled in from older revisions.
#[derive(Debug, Clone, Default)]
pub struct PdfTrailer {
    /// The trailer dictionary
    pub dict: PdfDictionary,
}

impl PdfTrailer {
    pub fn new(dict: PdfDictionary) -> Self {
        Self { dict }
    }

    /// Merge an older revision's trailer; keys already present win
    pub fn merge_older(&mut self, older: &PdfDictionary) {
        self.dict.merge_missing(older);
    }

    /// Get the size (number of entries in xref table)
    pub fn size(&self) -> Option<u32> {
        self.dict
            .get("Size")
            .and_then(|obj| obj.as_integer())
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Get the root object reference (document catalog)
    pub fn root(&self) -> ParseResult<ObjectId> {
        self.dict
            .get("Root")
            .and_then(|obj| obj.as_reference())
            .ok_or_else(|| ParseError::MissingKey("Root".to_string()))
    }

    /// Get the info object reference (document information dictionary)
    pub fn info(&self) -> Option<ObjectId> {
        self.dict.get("Info").and_then(|obj| obj.as_reference())
    }

    /// First element of the ID array, used for encryption key derivation
    pub fn first_id(&self) -> Option<&[u8]> {
        self.dict
            .get("ID")
            .and_then(|obj| obj.as_array())
            .and_then(|array| array.get(0))
            .and_then(|obj| obj.as_string())
            .map(|s| s.as_bytes())
    }

    /// Check if this PDF is encrypted
    pub fn is_encrypted(&self) -> bool {
        self.dict
            .get("Encrypt")
            .is_some_and(|obj| !obj.is_null())
    }

    /// The encryption dictionary entry, direct or a reference
    pub fn encrypt(&self) -> Option<&PdfObject> {
        self.dict.get("Encrypt").filter(|obj| !obj.is_null())
    }

    /// Get access to the trailer dictionary
    pub fn dict(&self) -> &PdfDictionary {
        &self.dict
    }
}
