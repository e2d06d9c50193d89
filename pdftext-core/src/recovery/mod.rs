//! Recovery for damaged PDF files
//!
//! When the stored cross-reference data is missing, truncated or points at the
//! wrong offsets, the document falls back to a linear scan of the buffer for
//! `N G obj` headers. The scan result replaces the stored index and the document
//! is marked as recovered.

pub mod xref_recovery;

pub use xref_recovery::{
    find_object_headers, RecoveredXRef, RecoveryStats, ScannedObject, XRefRecovery,
};
