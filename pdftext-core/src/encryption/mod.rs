//! PDF decryption according to ISO 32000-1 Section 7.6
//!
//! Implements the standard security handler for revisions 2 to 4: RC4 with
//! 40 to 128 bit keys and AES-128 (AESV2) crypt filters. Documents using
//! AES-256 (revisions 5 and 6) are reported as unsupported.

mod rc4;
mod standard_security;

pub use rc4::{rc4_apply, Rc4};
pub use standard_security::{
    decrypt_aes, EncryptionKey, SecurityHandlerRevision, StandardSecurityHandler,
};
