//! PDF encryption detection and password handling
//!
//! This module reads the encryption dictionary, authenticates a password and
//! decrypts the strings and streams of loaded objects according to
//! ISO 32000-1 Section 7.6.

use super::objects::{ObjectId, PdfDictionary, PdfObject, PdfStream, PdfString};
use super::{ParseError, ParseResult};
use crate::encryption::{
    decrypt_aes, rc4_apply, EncryptionKey, SecurityHandlerRevision, StandardSecurityHandler,
};

/// How one class of data (strings or streams) is encrypted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMethod {
    /// Not encrypted
    Identity,
    /// RC4 (`/V2` crypt filter, or V1/V2 encryption)
    Rc4,
    /// AES-128 in CBC mode (`/AESV2`)
    AesV2,
}

/// PDF Encryption Handler
#[derive(Debug, Clone)]
pub struct EncryptionHandler {
    security_handler: StandardSecurityHandler,
    string_method: CryptMethod,
    stream_method: CryptMethod,
    encrypt_metadata: bool,
    /// File key once a password was accepted
    encryption_key: Option<EncryptionKey>,
}

impl EncryptionHandler {
    /// Create encryption handler from the encryption dictionary and the
    /// first element of the trailer `/ID`
    pub fn new(dict: &PdfDictionary, file_id: Option<&[u8]>) -> ParseResult<Self> {
        let filter = dict
            .get("Filter")
            .and_then(|obj| obj.as_name())
            .map(|name| name.as_str())
            .ok_or_else(|| ParseError::MissingKey("Filter".to_string()))?;
        if filter != "Standard" {
            return Err(ParseError::UnsupportedEncryption(format!(
                "security handler /{filter}"
            )));
        }

        let v = dict.get("V").and_then(|obj| obj.as_integer()).unwrap_or(0);
        let r = dict
            .get("R")
            .and_then(|obj| obj.as_integer())
            .ok_or_else(|| ParseError::MissingKey("R".to_string()))?;
        let revision = SecurityHandlerRevision::from_number(r).ok_or_else(|| {
            ParseError::UnsupportedEncryption(format!("standard handler revision {r}"))
        })?;
        if !matches!(v, 0 | 1 | 2 | 4) {
            return Err(ParseError::UnsupportedEncryption(format!(
                "encryption algorithm V={v}"
            )));
        }

        let bytes_of = |key: &str| -> ParseResult<Vec<u8>> {
            dict.get(key)
                .and_then(|obj| obj.as_string())
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| ParseError::MissingKey(key.to_string()))
        };
        let owner_hash = bytes_of("O")?;
        let user_hash = bytes_of("U")?;
        let permissions = dict
            .get("P")
            .and_then(|obj| obj.as_integer())
            // P is a 32-bit field; some writers store it unsigned
            .map(|p| p as u32 as i32)
            .ok_or_else(|| ParseError::MissingKey("P".to_string()))?;

        let key_bits = dict
            .get("Length")
            .and_then(|obj| obj.as_integer())
            .unwrap_or(if v <= 1 { 40 } else { 128 });
        let key_length = if v <= 1 { 5 } else { (key_bits / 8) as usize };

        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(|obj| obj.as_bool())
            .unwrap_or(true);

        let (string_method, stream_method) = if v == 4 {
            let crypt_filters = dict.get("CF").and_then(|obj| obj.as_dict());
            let method_of = |key: &str| {
                let name = dict
                    .get(key)
                    .and_then(|obj| obj.as_name())
                    .map(|n| n.as_str())
                    .unwrap_or("Identity");
                crypt_method(name, crypt_filters)
            };
            (method_of("StrF")?, method_of("StmF")?)
        } else {
            (CryptMethod::Rc4, CryptMethod::Rc4)
        };

        let key_length = if stream_method == CryptMethod::AesV2 || string_method == CryptMethod::AesV2 {
            16
        } else {
            key_length
        };

        Ok(Self {
            security_handler: StandardSecurityHandler::new(
                revision,
                key_length,
                owner_hash,
                user_hash,
                permissions,
                file_id.map(<[u8]>::to_vec).unwrap_or_default(),
                encrypt_metadata,
            ),
            string_method,
            stream_method,
            encrypt_metadata,
            encryption_key: None,
        })
    }

    /// Check if a trailer declares encryption
    pub fn detect_encryption(trailer: &PdfDictionary) -> bool {
        trailer.get("Encrypt").is_some_and(|obj| !obj.is_null())
    }

    /// Authenticate with `password` as user then as owner password. Without a
    /// password the empty user password is tried.
    pub fn unlock(&mut self, password: Option<&str>) -> ParseResult<()> {
        let candidate = password.unwrap_or("");
        let key = self
            .security_handler
            .authenticate_user_password(candidate.as_bytes())
            .or_else(|| {
                self.security_handler
                    .authenticate_owner_password(candidate.as_bytes())
            });

        match key {
            Some(key) => {
                tracing::debug!(
                    "document unlocked ({:?}, {}-bit key)",
                    self.security_handler.revision(),
                    self.security_handler.key_length() * 8
                );
                self.encryption_key = Some(key);
                Ok(())
            }
            None if password.is_some() => Err(ParseError::InvalidPassword),
            None => Err(ParseError::EncryptionRequired),
        }
    }

    /// Check if the PDF is currently unlocked
    pub fn is_unlocked(&self) -> bool {
        self.encryption_key.is_some()
    }

    /// Short description of the algorithm in use
    pub fn algorithm_info(&self) -> String {
        match (self.stream_method, self.security_handler.revision()) {
            (CryptMethod::AesV2, _) => "AES-128".to_string(),
            (_, SecurityHandlerRevision::R2) => "RC4 40-bit".to_string(),
            (_, _) => format!("RC4 {}-bit", self.security_handler.key_length() * 8),
        }
    }

    /// Decrypt every string and the stream data of an object loaded as `id`
    pub fn decrypt_object(&self, id: ObjectId, object: PdfObject) -> PdfObject {
        let Some(key) = &self.encryption_key else {
            return object;
        };
        match object {
            PdfObject::Stream(stream) => {
                let PdfStream { dict, data } = stream;
                let dict = self.decrypt_dict(key, id, dict);
                let data = if self.stream_is_encrypted(&dict) {
                    self.decrypt_bytes(key, self.stream_method, id, data)
                } else {
                    data
                };
                PdfObject::Stream(PdfStream { dict, data })
            }
            other => self.decrypt_value(key, id, other),
        }
    }

    fn decrypt_value(&self, key: &EncryptionKey, id: ObjectId, object: PdfObject) -> PdfObject {
        match object {
            PdfObject::String(s) => PdfObject::String(PdfString(self.decrypt_bytes(
                key,
                self.string_method,
                id,
                s.0,
            ))),
            PdfObject::Array(mut array) => {
                array.0 = array
                    .0
                    .into_iter()
                    .map(|item| self.decrypt_value(key, id, item))
                    .collect();
                PdfObject::Array(array)
            }
            PdfObject::Dictionary(dict) => PdfObject::Dictionary(self.decrypt_dict(key, id, dict)),
            other => other,
        }
    }

    fn decrypt_dict(&self, key: &EncryptionKey, id: ObjectId, mut dict: PdfDictionary) -> PdfDictionary {
        let entries = std::mem::take(&mut dict.0);
        dict.0 = entries
            .into_iter()
            .map(|(name, value)| (name, self.decrypt_value(key, id, value)))
            .collect();
        dict
    }

    fn stream_is_encrypted(&self, dict: &PdfDictionary) -> bool {
        match dict.get_type() {
            Some("XRef") => return false,
            Some("Metadata") if !self.encrypt_metadata => return false,
            _ => {}
        }
        // A stream-level Crypt filter naming Identity opts out
        let identity_crypt = match dict.get("Filter") {
            Some(PdfObject::Name(name)) => name.as_str() == "Crypt",
            Some(PdfObject::Array(filters)) => filters
                .get(0)
                .and_then(|f| f.as_name())
                .is_some_and(|n| n.as_str() == "Crypt"),
            _ => false,
        } && dict
            .get("DecodeParms")
            .and_then(|p| match p {
                PdfObject::Array(a) => a.get(0).and_then(|d| d.as_dict()),
                other => other.as_dict(),
            })
            .and_then(|p| p.get("Name"))
            .and_then(|n| n.as_name())
            .map_or(true, |n| n.as_str() == "Identity");
        !identity_crypt
    }

    fn decrypt_bytes(&self, key: &EncryptionKey, method: CryptMethod, id: ObjectId, data: Vec<u8>) -> Vec<u8> {
        match method {
            CryptMethod::Identity => data,
            CryptMethod::Rc4 => {
                let object_key = self.security_handler.compute_object_key(key, id, false);
                rc4_apply(&object_key, &data)
            }
            CryptMethod::AesV2 => {
                let object_key = self.security_handler.compute_object_key(key, id, true);
                match decrypt_aes(&object_key, &data) {
                    Ok(plain) => plain,
                    Err(e) => {
                        tracing::warn!("cannot decrypt data of object {}: {}", id, e);
                        data
                    }
                }
            }
        }
    }
}

fn crypt_method(name: &str, crypt_filters: Option<&PdfDictionary>) -> ParseResult<CryptMethod> {
    if name == "Identity" {
        return Ok(CryptMethod::Identity);
    }
    let cfm = crypt_filters
        .and_then(|cf| cf.get(name))
        .and_then(|obj| obj.as_dict())
        .and_then(|filter| filter.get("CFM"))
        .and_then(|obj| obj.as_name())
        .map(|n| n.as_str())
        .unwrap_or("None");
    match cfm {
        "None" => Ok(CryptMethod::Identity),
        "V2" => Ok(CryptMethod::Rc4),
        "AESV2" => Ok(CryptMethod::AesV2),
        other => Err(ParseError::UnsupportedEncryption(format!(
            "crypt filter method /{other}"
        ))),
    }
}
