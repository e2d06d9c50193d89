//! XRef recovery for damaged PDF files
//!
//! Rebuilds the cross-reference index by scanning the whole buffer for
//! `N G obj` headers when the stored table is missing or unusable. Later
//! definitions of the same object number win, matching incremental updates.

use crate::parser::objects::{ObjectId, ObjectParser, PdfDictionary, PdfObject};
use crate::parser::trailer::PdfTrailer;
use crate::parser::xref::{XRefEntry, XRefTable};
use crate::parser::ParseOptions;
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::collections::BTreeMap;

lazy_static! {
    static ref OBJECT_HEADER: Regex =
        Regex::new(r"(?-u)(?:^|[^0-9])([0-9]{1,10})[\x00\t\n\x0C\r ]+([0-9]{1,5})[\x00\t\n\x0C\r ]+obj")
            .expect("object header pattern");
    static ref TRAILER: Regex =
        Regex::new(r"(?-u)trailer[\x00\t\n\x0C\r ]*<<").expect("trailer pattern");
}

/// Location of one scanned object header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedObject {
    pub generation: u16,
    pub offset: usize,
}

/// Scan `data` for `N G obj` headers.
///
/// Returns object number to header location; a number defined more than once
/// maps to its last definition.
pub fn find_object_headers(data: &[u8]) -> BTreeMap<u32, ScannedObject> {
    let mut found = BTreeMap::new();
    for caps in OBJECT_HEADER.captures_iter(data) {
        let (Some(num), Some(gen)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let number = std::str::from_utf8(num.as_bytes()).ok().and_then(|s| s.parse::<u32>().ok());
        let generation = std::str::from_utf8(gen.as_bytes()).ok().and_then(|s| s.parse::<u16>().ok());
        if let (Some(number), Some(generation)) = (number, generation) {
            // "obj" must end the keyword, not start "object" or similar
            let end = caps.get(0).map_or(data.len(), |m| m.end());
            if data.get(end).is_some_and(|b| b.is_ascii_alphanumeric()) {
                continue;
            }
            found.insert(
                number,
                ScannedObject {
                    generation,
                    offset: num.start(),
                },
            );
        }
    }
    found
}

/// Recovery statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Number of object headers found by the scan
    pub objects_found: usize,
    /// Number of scanned objects that parsed cleanly
    pub entries_reconstructed: usize,
    /// Number of object headers whose body failed to parse
    pub errors: usize,
    /// Whether any trailer or xref-stream dictionary was found
    pub trailer_found: bool,
}

/// Result of a recovery scan
#[derive(Debug, Default)]
pub struct RecoveredXRef {
    /// Rebuilt index with the rebuilt trailer installed
    pub table: XRefTable,
    /// Object streams found by the scan, newest last
    pub object_streams: Vec<ObjectId>,
    /// `/Type /Catalog` objects found by the scan, newest last
    pub catalogs: Vec<ObjectId>,
    pub stats: RecoveryStats,
}

/// XRef recovery engine
#[derive(Debug, Default)]
pub struct XRefRecovery {
    options: ParseOptions,
}

impl XRefRecovery {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            options: ParseOptions {
                lenient_syntax: true,
                ..options.clone()
            },
        }
    }

    /// Rebuild the cross-reference index and trailer of `data`
    pub fn recover(&self, data: &[u8]) -> RecoveredXRef {
        let headers = find_object_headers(data);
        let mut result = RecoveredXRef {
            stats: RecoveryStats {
                objects_found: headers.len(),
                ..RecoveryStats::default()
            },
            ..RecoveredXRef::default()
        };

        // (offset, dict) so trailer candidates can be ordered by position
        let mut trailer_dicts: Vec<(usize, PdfDictionary)> = Vec::new();
        let mut catalogs: Vec<(usize, ObjectId)> = Vec::new();
        let mut object_streams: Vec<(usize, ObjectId)> = Vec::new();

        for (&number, scanned) in &headers {
            let mut parser = ObjectParser::new(data, scanned.offset).with_options(&self.options);
            let (id, object) = match parser.parse_indirect_object() {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!("recovery: object {} at {} unparsable: {}", number, scanned.offset, e);
                    result.stats.errors += 1;
                    continue;
                }
            };

            result.table.insert(
                number,
                XRefEntry::InUse {
                    offset: scanned.offset as u64,
                    generation: id.generation(),
                },
            );
            result.stats.entries_reconstructed += 1;

            if let Some(dict) = object.as_dict() {
                match dict.get_type() {
                    Some("Catalog") => catalogs.push((scanned.offset, id)),
                    Some("ObjStm") if matches!(object, PdfObject::Stream(_)) => {
                        object_streams.push((scanned.offset, id))
                    }
                    Some("XRef") if matches!(object, PdfObject::Stream(_)) => {
                        trailer_dicts.push((scanned.offset, dict.clone()))
                    }
                    _ => {}
                }
            }
        }

        for m in TRAILER.find_iter(data) {
            let dict_start = m.end() - 2;
            let mut parser = ObjectParser::new(data, dict_start).with_options(&self.options);
            match parser.parse_object() {
                Ok(PdfObject::Dictionary(dict)) => trailer_dicts.push((m.start(), dict)),
                Ok(_) | Err(_) => {
                    tracing::debug!("recovery: unreadable trailer dictionary at {}", m.start());
                }
            }
        }

        trailer_dicts.sort_by_key(|(offset, _)| *offset);
        catalogs.sort_by_key(|(offset, _)| *offset);
        object_streams.sort_by_key(|(offset, _)| *offset);

        result.stats.trailer_found = !trailer_dicts.is_empty();
        let mut trailer = rebuild_trailer(trailer_dicts.into_iter().map(|(_, dict)| dict));

        let root_known = trailer
            .root()
            .map(|root| result.table.get_entry(root.number()).is_some())
            .unwrap_or(false);
        if !root_known {
            if let Some((_, catalog)) = catalogs.last() {
                tracing::debug!("recovery: using scanned catalog {}", catalog);
                let mut dict = trailer.dict().clone();
                dict.insert("Root", PdfObject::Reference(*catalog));
                trailer = PdfTrailer::new(dict);
            }
        }

        result.table.set_trailer(trailer);
        result.catalogs = catalogs.into_iter().map(|(_, id)| id).collect();
        result.object_streams = object_streams.into_iter().map(|(_, id)| id).collect();

        tracing::debug!(
            "recovery: {} headers, {} objects rebuilt, {} errors, trailer found: {}",
            result.stats.objects_found,
            result.stats.entries_reconstructed,
            result.stats.errors,
            result.stats.trailer_found
        );
        result
    }
}

/// Merge trailer dictionaries given oldest first; newer keys win.
fn rebuild_trailer(dicts: impl DoubleEndedIterator<Item = PdfDictionary>) -> PdfTrailer {
    let mut trailer = PdfTrailer::default();
    for dict in dicts.rev() {
        trailer.merge_older(&dict);
    }
    let mut dict = trailer.dict().clone();
    // Stale chain pointers and xref-stream keys are meaningless after a rebuild
    for key in ["Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms"] {
        dict.0.remove(key);
    }
    PdfTrailer::new(dict)
}
