//! PDF Document - the owning handle over one parsed PDF buffer
//!
//! [`PdfDocument`] owns the raw bytes, the cross-reference index and the
//! effective trailer. Objects are parsed on first access and kept in a shared
//! cache, so one document can serve several extraction threads at once.
//!
//! # Architecture
//!
//! - **Object cache**: `RwLock`-guarded map from object id to `Arc<PdfObject>`.
//!   Two threads may race to fill the same entry; both produce the same value,
//!   so the second insert is harmless.
//! - **Object streams**: decoded `/ObjStm` streams are cached separately.
//! - **Recovery**: when the stored cross-reference data is unusable the index is
//!   rebuilt by a linear scan (see [`crate::recovery`]) and the document is
//!   marked [`Quality::Recovered`].
//! - **Encryption**: the standard security handler is unlocked during `open`;
//!   strings and streams are decrypted as objects are loaded.
//!
//! # Example
//!
//! ```rust,no_run
//! use pdftext::parser::{ParseOptions, PdfDocument};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("document.pdf")?;
//! let document = PdfDocument::open(bytes, ParseOptions::default())?;
//!
//! println!("PDF {} with {} pages", document.version(), document.page_count());
//! if let Some(title) = document.info().title {
//!     println!("Title: {}", title);
//! }
//! # Ok(())
//! # }
//! ```

use super::encryption_handler::EncryptionHandler;
use super::filters;
use super::header::{PdfHeader, PdfVersion};
use super::object_stream::ObjectStream;
use super::objects::{ObjectId, ObjectParser, PdfDictionary, PdfObject, PdfStream};
use super::page_tree::{PageTree, ParsedPage};
use super::trailer::PdfTrailer;
use super::xref::{XRefEntry, XRefTable};
use super::{ErrorKind, ParseError, ParseOptions, ParseResult};
use crate::recovery::{find_object_headers, RecoveredXRef, ScannedObject, XRefRecovery};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Limit on nested loads (stream lengths, object streams, reference chains)
const MAX_LOAD_DEPTH: usize = 32;

/// Whether a document was read cleanly or needed structural recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Cross-reference data and page tree were consistent
    #[default]
    Clean,
    /// The index was rebuilt by scanning or a structural cycle was cut
    Recovered,
}

/// Document information dictionary entries, decoded as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// A parsed PDF document.
///
/// Opening a document locates the catalog and flattens the page tree; every
/// other object is loaded lazily. The type is `Send + Sync`: pages can be
/// processed from several threads over a shared reference.
pub struct PdfDocument {
    data: Vec<u8>,
    header: PdfHeader,
    options: ParseOptions,
    xref: XRefTable,
    xref_rebuilt: bool,
    /// Scanned `/Type /Catalog` objects, newest last
    catalog_candidates: Vec<ObjectId>,
    encryption: Option<EncryptionHandler>,
    /// The Encrypt dictionary is never decrypted
    encrypt_ref: Option<ObjectId>,
    objects: RwLock<HashMap<ObjectId, Arc<PdfObject>>>,
    object_streams: RwLock<HashMap<u32, Arc<ObjectStream>>>,
    /// Built on first stale offset
    scan_index: OnceLock<BTreeMap<u32, ScannedObject>>,
    catalog: PdfDictionary,
    page_tree: PageTree,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.header.version)
            .field("size", &self.data.len())
            .field("objects", &self.xref.len())
            .field("pages", &self.page_tree.page_count())
            .field("encrypted", &self.encryption.is_some())
            .field("xref_rebuilt", &self.xref_rebuilt)
            .finish()
    }
}

impl PdfDocument {
    /// Parse a document from an in-memory buffer.
    ///
    /// Fails only when the catalog cannot be reached even after rebuilding the
    /// cross-reference index, or when the document is encrypted and no valid
    /// password was supplied.
    pub fn open(data: impl Into<Vec<u8>>, options: ParseOptions) -> ParseResult<Self> {
        let data = data.into();
        if data.is_empty() {
            return Err(ParseError::EmptyFile);
        }

        let header = match PdfHeader::parse(&data) {
            Ok(header) => header,
            Err(ParseError::InvalidHeader) if options.lenient_syntax => {
                tracing::warn!("no %PDF- header found, assuming version {}", PdfVersion::default());
                PdfHeader {
                    version: PdfVersion::default(),
                    offset: 0,
                    has_binary_marker: false,
                }
            }
            Err(e) => return Err(e),
        };
        if !header.version.is_supported() {
            tracing::debug!("unusual PDF version {}, parsing anyway", header.version);
        }

        let (xref, recovered) = match XRefTable::parse(&data, header.offset, &options) {
            Ok(table) if table.trailer().root().is_ok() => (table, None),
            Ok(_) if options.recover_xref => {
                tracing::warn!("trailer has no /Root, rebuilding cross-reference by scan");
                (XRefTable::new(), Some(XRefRecovery::new(&options).recover(&data)))
            }
            Err(e) if options.recover_xref => {
                tracing::warn!("cross-reference data unusable ({}), rebuilding by scan", e);
                (XRefTable::new(), Some(XRefRecovery::new(&options).recover(&data)))
            }
            Ok(_) => return Err(ParseError::MissingKey("Root".to_string())),
            Err(e) => return Err(e),
        };

        let mut doc = PdfDocument {
            data,
            header,
            options,
            xref,
            xref_rebuilt: false,
            catalog_candidates: Vec::new(),
            encryption: None,
            encrypt_ref: None,
            objects: RwLock::default(),
            object_streams: RwLock::default(),
            scan_index: OnceLock::new(),
            catalog: PdfDictionary::new(),
            page_tree: PageTree::default(),
        };

        match doc.load_structure(recovered) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::EncryptionRequired => return Err(e),
            Err(e) if !doc.xref_rebuilt && doc.options.recover_xref => {
                tracing::warn!("document structure unreadable ({}), rebuilding cross-reference by scan", e);
                let recovered = XRefRecovery::new(&doc.options).recover(&doc.data);
                doc.load_structure(Some(recovered)).map_err(into_unreadable)?;
            }
            Err(e) => return Err(into_unreadable(e)),
        }

        let page_tree = PageTree::from_catalog(&doc, &doc.catalog);
        doc.page_tree = page_tree;

        tracing::debug!(
            "opened PDF {}: {} objects, {} pages{}",
            doc.header.version,
            doc.xref.len(),
            doc.page_tree.page_count(),
            if doc.xref_rebuilt { " (xref rebuilt)" } else { "" }
        );
        Ok(doc)
    }

    /// Install the index (stored or recovered), unlock encryption and find the catalog
    fn load_structure(&mut self, recovered: Option<RecoveredXRef>) -> ParseResult<()> {
        let object_streams = match recovered {
            Some(recovered) => {
                self.xref = recovered.table;
                self.catalog_candidates = recovered.catalogs;
                self.xref_rebuilt = true;
                recovered.object_streams
            }
            None => Vec::new(),
        };
        self.clear_caches();
        self.setup_encryption()?;
        if !object_streams.is_empty() {
            self.index_object_streams(&object_streams);
        }
        self.catalog = self.locate_catalog()?;
        Ok(())
    }

    fn setup_encryption(&mut self) -> ParseResult<()> {
        self.encryption = None;
        self.encrypt_ref = None;
        let Some(encrypt) = self.xref.trailer().encrypt().cloned() else {
            return Ok(());
        };

        let encrypt_ref = encrypt.as_reference();
        let dict_object = match encrypt_ref {
            Some(id) => self.get_object(id)?,
            None => Arc::new(encrypt),
        };
        let dict = dict_object.as_dict().ok_or_else(|| {
            ParseError::UnsupportedEncryption("Encrypt entry is not a dictionary".to_string())
        })?;

        let mut handler = EncryptionHandler::new(dict, self.xref.trailer().first_id())?;
        handler.unlock(self.options.password.as_deref())?;
        tracing::debug!("document unlocked ({})", handler.algorithm_info());

        self.encryption = Some(handler);
        self.encrypt_ref = encrypt_ref;
        // Anything loaded so far was read without decryption
        self.clear_caches();
        Ok(())
    }

    /// Add the members of scanned object streams to a rebuilt index
    fn index_object_streams(&mut self, streams: &[ObjectId]) {
        let mut entries = Vec::new();
        for id in streams {
            match self.object_stream(id.number(), 0) {
                Ok(stream) => {
                    for (index, number) in stream.object_numbers().iter().enumerate() {
                        entries.push((
                            *number,
                            XRefEntry::Compressed {
                                stream_object_number: id.number(),
                                index_within_stream: index as u32,
                            },
                        ));
                    }
                }
                Err(e) => tracing::debug!("recovery: object stream {} unreadable: {}", id, e),
            }
        }
        for (number, entry) in entries {
            self.xref.insert_if_absent(number, entry);
        }
    }

    fn locate_catalog(&self) -> ParseResult<PdfDictionary> {
        let mut candidates: Vec<ObjectId> = self.xref.trailer().root().ok().into_iter().collect();
        candidates.extend(self.catalog_candidates.iter().rev());

        for id in candidates {
            match self.get_object(id) {
                Ok(object) => match object.as_dict() {
                    Some(dict) if dict.get_type().map_or(true, |t| t == "Catalog") || dict.contains_key("Pages") => {
                        return Ok(dict.clone());
                    }
                    _ => tracing::debug!("catalog candidate {} is not a catalog dictionary", id),
                },
                Err(e) => tracing::debug!("catalog candidate {} unreadable: {}", id, e),
            }
        }
        Err(ParseError::Unreadable("document catalog not reachable".to_string()))
    }

    fn clear_caches(&mut self) {
        self.objects = RwLock::default();
        self.object_streams = RwLock::default();
    }

    /// PDF version from the file header
    pub fn version(&self) -> PdfVersion {
        self.header.version
    }

    /// Number of pages reached by the page tree walk
    pub fn page_count(&self) -> usize {
        self.page_tree.page_count()
    }

    /// Flattened pages in document order
    pub fn pages(&self) -> &[ParsedPage] {
        self.page_tree.pages()
    }

    /// Page by zero-based index
    pub fn page(&self, index: usize) -> Option<&ParsedPage> {
        self.page_tree.pages().get(index)
    }

    pub fn page_tree(&self) -> &PageTree {
        &self.page_tree
    }

    /// The document catalog (`/Root`)
    pub fn catalog(&self) -> &PdfDictionary {
        &self.catalog
    }

    /// The effective trailer after merging all revisions
    pub fn trailer(&self) -> &PdfTrailer {
        self.xref.trailer()
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    /// Description of the encryption in use, if any
    pub fn encryption_info(&self) -> Option<String> {
        self.encryption.as_ref().map(|handler| handler.algorithm_info())
    }

    /// Whether the cross-reference index had to be rebuilt by scanning
    pub fn xref_rebuilt(&self) -> bool {
        self.xref_rebuilt
    }

    /// Number of page tree nodes skipped because they were already visited
    pub fn structural_cycles(&self) -> usize {
        self.page_tree.structural_cycles()
    }

    pub fn quality(&self) -> Quality {
        if self.xref_rebuilt || self.structural_cycles() > 0 {
            Quality::Recovered
        } else {
            Quality::Clean
        }
    }

    /// Number of entries in the cross-reference index
    pub fn object_count(&self) -> usize {
        self.xref.len()
    }

    /// Document information dictionary
    pub fn info(&self) -> DocumentInfo {
        let Some(info) = self.trailer().dict.get("Info") else {
            return DocumentInfo::default();
        };
        let info = self.resolve(info);
        let Some(dict) = info.as_dict() else {
            return DocumentInfo::default();
        };
        let text = |key: &str| {
            dict.get(key)
                .map(|obj| self.resolve(obj))
                .and_then(|obj| obj.as_string().map(|s| s.to_text()))
        };
        DocumentInfo {
            title: text("Title"),
            author: text("Author"),
            subject: text("Subject"),
            keywords: text("Keywords"),
            creator: text("Creator"),
            producer: text("Producer"),
        }
    }

    /// Load an indirect object.
    ///
    /// Returns an error when the object is free, absent or unparsable; see
    /// [`PdfDocument::resolve`] for the lenient variant.
    pub fn get_object(&self, id: ObjectId) -> ParseResult<Arc<PdfObject>> {
        self.load(id, 0)
    }

    /// Dereference `obj` if it is a reference, following reference chains.
    ///
    /// References that cannot be loaded resolve to `null`.
    pub fn resolve(&self, obj: &PdfObject) -> Arc<PdfObject> {
        let PdfObject::Reference(mut id) = obj else {
            return Arc::new(obj.clone());
        };
        for _ in 0..MAX_LOAD_DEPTH {
            match self.get_object(id) {
                Ok(object) => match object.as_ref() {
                    PdfObject::Reference(next) => id = *next,
                    _ => return object,
                },
                Err(e) => {
                    tracing::debug!("unresolvable reference {}: {}", id, e);
                    return Arc::new(PdfObject::Null);
                }
            }
        }
        tracing::warn!("reference chain starting at {} does not terminate", obj_label(obj));
        Arc::new(PdfObject::Null)
    }

    /// Decode a stream's data, resolving indirect `/Filter` and `/DecodeParms`
    pub fn decode_stream(&self, stream: &PdfStream) -> ParseResult<Vec<u8>> {
        self.decode_stream_at(stream, 0)
    }

    /// Decoded content streams of a page, one result per `/Contents` part
    pub fn page_content_streams(&self, page: &ParsedPage) -> Vec<ParseResult<Vec<u8>>> {
        let Some(contents) = page.dict.get("Contents") else {
            return Vec::new();
        };
        let contents = self.resolve(contents);
        let parts: Vec<Arc<PdfObject>> = match contents.as_ref() {
            PdfObject::Array(array) => array.iter().map(|part| self.resolve(part)).collect(),
            PdfObject::Null => Vec::new(),
            _ => vec![contents.clone()],
        };
        parts
            .iter()
            .filter(|part| !part.is_null())
            .map(|part| match part.as_stream() {
                Some(stream) => self.decode_stream(stream),
                None => Err(ParseError::syntax(
                    0,
                    format!("page content is a {}, not a stream", part.type_name()),
                )),
            })
            .collect()
    }

    fn decode_stream_at(&self, stream: &PdfStream, depth: usize) -> ParseResult<Vec<u8>> {
        const FILTER_KEYS: [&str; 3] = ["Filter", "DecodeParms", "DP"];
        let indirect = FILTER_KEYS
            .iter()
            .filter_map(|key| stream.dict.get(key))
            .any(has_reference);
        if !indirect {
            return filters::decode_stream(&stream.data, &stream.dict);
        }

        let mut dict = stream.dict.clone();
        for key in FILTER_KEYS {
            if let Some(value) = stream.dict.get(key) {
                dict.insert(key, self.resolve_shallow(value, depth));
            }
        }
        filters::decode_stream(&stream.data, &dict)
    }

    /// Resolve `value` and, for arrays, each element
    fn resolve_shallow(&self, value: &PdfObject, depth: usize) -> PdfObject {
        let load = |obj: &PdfObject| match obj {
            PdfObject::Reference(id) => self
                .load(*id, depth + 1)
                .map(|o| o.as_ref().clone())
                .unwrap_or(PdfObject::Null),
            other => other.clone(),
        };
        match load(value) {
            PdfObject::Array(mut array) => {
                for element in array.0.iter_mut() {
                    *element = load(element);
                }
                PdfObject::Array(array)
            }
            other => other,
        }
    }

    fn cached(&self, id: ObjectId) -> Option<Arc<PdfObject>> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn load(&self, id: ObjectId, depth: usize) -> ParseResult<Arc<PdfObject>> {
        if let Some(object) = self.cached(id) {
            return Ok(object);
        }
        if depth > MAX_LOAD_DEPTH {
            return Err(ParseError::CircularReference(format!("loading {id}")));
        }

        let object = match self.xref.get_entry(id.number()).copied() {
            Some(XRefEntry::InUse { offset, .. }) => self.load_uncompressed(id, offset, depth)?,
            Some(XRefEntry::Compressed {
                stream_object_number,
                index_within_stream,
            }) => self.load_compressed(id, stream_object_number, index_within_stream, depth)?,
            Some(XRefEntry::Free { .. }) => {
                return Err(ParseError::InvalidReference(id.number(), id.generation()))
            }
            None => self.load_from_scan(id, depth)?,
        };

        let object = Arc::new(object);
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert_with(|| object.clone());
        Ok(object)
    }

    fn load_uncompressed(&self, id: ObjectId, offset: u64, depth: usize) -> ParseResult<PdfObject> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let mut positions = vec![offset];
        if self.header.offset > 0 {
            positions.push(offset.saturating_add(self.header.offset));
        }

        let mut last_error = None;
        for position in positions {
            match self.parse_at(id, position, depth) {
                Ok(object) => return Ok(object),
                Err(e) => last_error = Some(e),
            }
        }

        match self.load_from_scan(id, depth) {
            Ok(object) => {
                tracing::debug!("object {} found by scan after stale offset {}", id, offset);
                Ok(object)
            }
            Err(_) => Err(last_error.unwrap_or(ParseError::InvalidReference(id.number(), id.generation()))),
        }
    }

    fn load_from_scan(&self, id: ObjectId, depth: usize) -> ParseResult<PdfObject> {
        if !self.options.recover_xref {
            return Err(ParseError::InvalidReference(id.number(), id.generation()));
        }
        let index = self.scan_index.get_or_init(|| find_object_headers(&self.data));
        match index.get(&id.number()) {
            Some(scanned) => self.parse_at(id, scanned.offset, depth),
            None => Err(ParseError::InvalidReference(id.number(), id.generation())),
        }
    }

    fn parse_at(&self, id: ObjectId, position: usize, depth: usize) -> ParseResult<PdfObject> {
        if position >= self.data.len() {
            return Err(ParseError::syntax(position, format!("offset of {id} beyond end of file")));
        }
        let lengths = |length_id: ObjectId| {
            self.load(length_id, depth + 1)
                .ok()
                .and_then(|obj| obj.as_integer())
        };
        let mut parser = ObjectParser::new(&self.data, position)
            .with_options(&self.options)
            .with_length_resolver(&lengths);
        let (found, object) = parser.parse_indirect_object()?;
        if found.number() != id.number() {
            return Err(ParseError::syntax(
                position,
                format!("expected object {id}, found {found}"),
            ));
        }

        Ok(match &self.encryption {
            Some(handler) if Some(id) != self.encrypt_ref => handler.decrypt_object(id, object),
            _ => object,
        })
    }

    fn load_compressed(
        &self,
        id: ObjectId,
        stream_number: u32,
        index: u32,
        depth: usize,
    ) -> ParseResult<PdfObject> {
        let stream = self.object_stream(stream_number, depth)?;
        stream
            .get(id.number(), index)
            .cloned()
            .ok_or(ParseError::InvalidReference(id.number(), id.generation()))
    }

    fn object_stream(&self, number: u32, depth: usize) -> ParseResult<Arc<ObjectStream>> {
        if let Some(stream) = self
            .object_streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&number)
        {
            return Ok(stream.clone());
        }

        let generation = self
            .xref
            .get_entry(number)
            .map_or(0, |entry| entry.generation());
        let object = self.load(ObjectId::new(number, generation), depth + 1)?;
        let stream = object.as_stream().ok_or_else(|| {
            ParseError::syntax(0, format!("object stream {number} is a {}", object.type_name()))
        })?;
        let data = self.decode_stream_at(stream, depth + 1)?;
        let parsed = Arc::new(ObjectStream::parse(&data, &stream.dict, &self.options)?);

        self.object_streams
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(number)
            .or_insert_with(|| parsed.clone());
        Ok(parsed)
    }
}

fn has_reference(obj: &PdfObject) -> bool {
    match obj {
        PdfObject::Reference(_) => true,
        PdfObject::Array(array) => array.iter().any(|o| matches!(o, PdfObject::Reference(_))),
        _ => false,
    }
}

fn obj_label(obj: &PdfObject) -> String {
    match obj {
        PdfObject::Reference(id) => id.to_string(),
        other => other.type_name().to_string(),
    }
}

fn into_unreadable(e: ParseError) -> ParseError {
    match e.kind() {
        ErrorKind::EncryptionRequired | ErrorKind::UnreadableDocument => e,
        _ => ParseError::Unreadable(e.to_string()),
    }
}
