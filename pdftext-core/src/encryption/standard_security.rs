//! Standard Security Handler according to ISO 32000-1 Section 7.6.3,
//! revisions 2 to 4 (RC4 and AES-128 crypt filters).

use super::rc4::rc4_apply;
use crate::parser::objects::ObjectId;
use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};

/// Padding used in password processing
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// File encryption key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    /// Key bytes
    pub key: Vec<u8>,
}

impl EncryptionKey {
    /// Create from bytes
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Get key length in bytes
    pub fn len(&self) -> usize {
        self.key.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

/// Security handler revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityHandlerRevision {
    /// Revision 2 (RC4 40-bit)
    R2 = 2,
    /// Revision 3 (RC4 up to 128-bit)
    R3 = 3,
    /// Revision 4 (crypt filters, metadata encryption control)
    R4 = 4,
}

impl SecurityHandlerRevision {
    pub fn from_number(r: i64) -> Option<Self> {
        match r {
            2 => Some(Self::R2),
            3 => Some(Self::R3),
            4 => Some(Self::R4),
            _ => None,
        }
    }
}

/// Values of the encryption dictionary the key derivation depends on
#[derive(Debug, Clone)]
pub struct StandardSecurityHandler {
    revision: SecurityHandlerRevision,
    /// Key length in bytes
    key_length: usize,
    /// O entry
    owner_hash: Vec<u8>,
    /// U entry
    user_hash: Vec<u8>,
    /// P entry
    permissions: i32,
    /// First element of the trailer /ID
    file_id: Vec<u8>,
    encrypt_metadata: bool,
}

impl StandardSecurityHandler {
    pub fn new(
        revision: SecurityHandlerRevision,
        key_length: usize,
        owner_hash: Vec<u8>,
        user_hash: Vec<u8>,
        permissions: i32,
        file_id: Vec<u8>,
        encrypt_metadata: bool,
    ) -> Self {
        Self {
            revision,
            key_length: key_length.clamp(5, 16),
            owner_hash,
            user_hash,
            permissions,
            file_id,
            encrypt_metadata,
        }
    }

    pub fn revision(&self) -> SecurityHandlerRevision {
        self.revision
    }

    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Pad or truncate password to 32 bytes
    fn pad_password(password: &[u8]) -> [u8; 32] {
        let mut padded = PADDING;
        let len = password.len().min(32);
        padded[..len].copy_from_slice(&password[..len]);
        padded
    }

    /// Compute the file key from a user password (Algorithm 2)
    pub fn compute_encryption_key(&self, user_password: &[u8]) -> EncryptionKey {
        let mut data = Vec::with_capacity(32 + self.owner_hash.len() + 8 + self.file_id.len());
        data.extend_from_slice(&Self::pad_password(user_password));
        data.extend_from_slice(&self.owner_hash[..self.owner_hash.len().min(32)]);
        data.extend_from_slice(&self.permissions.to_le_bytes());
        data.extend_from_slice(&self.file_id);
        if self.revision >= SecurityHandlerRevision::R4 && !self.encrypt_metadata {
            data.extend_from_slice(&[0xFF; 4]);
        }

        let mut hash = md5::compute(&data).0;
        if self.revision >= SecurityHandlerRevision::R3 {
            for _ in 0..50 {
                hash = md5::compute(&hash[..self.key_length]).0;
            }
        }

        EncryptionKey::new(hash[..self.key_length].to_vec())
    }

    /// Compute the U entry a file key produces (Algorithms 4 and 5)
    pub fn compute_user_hash(&self, key: &EncryptionKey) -> Vec<u8> {
        match self.revision {
            SecurityHandlerRevision::R2 => rc4_apply(&key.key, &PADDING),
            SecurityHandlerRevision::R3 | SecurityHandlerRevision::R4 => {
                let mut data = PADDING.to_vec();
                data.extend_from_slice(&self.file_id);
                let mut result = rc4_apply(&key.key, &md5::compute(&data).0);
                for i in 1..=19u8 {
                    result = rc4_apply(&xor_key(&key.key, i), &result);
                }
                // Only the first 16 bytes are significant
                result.resize(32, 0);
                result
            }
        }
    }

    /// Authenticate a user password (Algorithm 6); returns the file key
    pub fn authenticate_user_password(&self, password: &[u8]) -> Option<EncryptionKey> {
        let key = self.compute_encryption_key(password);
        let computed = self.compute_user_hash(&key);
        let significant = match self.revision {
            SecurityHandlerRevision::R2 => 32,
            _ => 16,
        };
        if self.user_hash.len() >= significant && computed[..significant] == self.user_hash[..significant] {
            Some(key)
        } else {
            None
        }
    }

    /// Authenticate an owner password (Algorithm 7): recover the user
    /// password from O and authenticate that
    pub fn authenticate_owner_password(&self, password: &[u8]) -> Option<EncryptionKey> {
        let owner_key = self.owner_rc4_key(password);
        let encrypted = &self.owner_hash[..self.owner_hash.len().min(32)];

        let user_password = match self.revision {
            SecurityHandlerRevision::R2 => rc4_apply(&owner_key, encrypted),
            _ => (0..=19u8)
                .rev()
                .fold(encrypted.to_vec(), |value, i| rc4_apply(&xor_key(&owner_key, i), &value)),
        };
        self.authenticate_user_password(&user_password)
    }

    /// RC4 key derived from the owner password (Algorithm 3, steps a to d)
    fn owner_rc4_key(&self, owner_password: &[u8]) -> Vec<u8> {
        let mut hash = md5::compute(Self::pad_password(owner_password)).0;
        if self.revision >= SecurityHandlerRevision::R3 {
            for _ in 0..50 {
                hash = md5::compute(hash).0;
            }
        }
        hash[..self.key_length].to_vec()
    }

    /// Compute the O entry (Algorithm 3). Only needed to produce test documents.
    pub fn compute_owner_hash(&self, owner_password: &[u8], user_password: &[u8]) -> Vec<u8> {
        let owner_key = self.owner_rc4_key(owner_password);
        let mut result = rc4_apply(&owner_key, &Self::pad_password(user_password));
        if self.revision >= SecurityHandlerRevision::R3 {
            for i in 1..=19u8 {
                result = rc4_apply(&xor_key(&owner_key, i), &result);
            }
        }
        result
    }

    /// Object key (Algorithm 1): file key extended with the object id,
    /// salted for AES
    pub fn compute_object_key(&self, key: &EncryptionKey, id: ObjectId, aes: bool) -> Vec<u8> {
        let mut data = Vec::with_capacity(key.len() + 9);
        data.extend_from_slice(&key.key);
        data.extend_from_slice(&id.number().to_le_bytes()[..3]);
        data.extend_from_slice(&id.generation().to_le_bytes());
        if aes {
            data.extend_from_slice(b"sAlT");
        }
        let hash = md5::compute(&data).0;
        hash[..(key.len() + 5).min(16)].to_vec()
    }
}

fn xor_key(key: &[u8], value: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ value).collect()
}

/// Decrypt AES-128-CBC data whose first 16 bytes are the IV
pub fn decrypt_aes(key: &[u8], data: &[u8]) -> Result<Vec<u8>, String> {
    if data.len() < 16 {
        return Err("AES payload shorter than its IV".to_string());
    }
    let (iv, encrypted) = data.split_at(16);
    let mut buffer = encrypted.to_vec();
    let decryptor = cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
        .map_err(|_| "invalid AES key or IV length".to_string())?;
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| "invalid AES padding".to_string())?;
    Ok(plaintext.to_vec())
}
