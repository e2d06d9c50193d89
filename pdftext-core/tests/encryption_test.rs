//! Documents protected by the standard security handler

mod common;

use common::{page_object, show, PdfBuilder, HELVETICA};
use pdftext::encryption::{rc4_apply, SecurityHandlerRevision, StandardSecurityHandler};
use pdftext::parser::ObjectId;
use pdftext::{
    extract_all_text, extract_text_with, ErrorKind, ExtractionOptions, ParseOptions, PdfDocument,
    PdfError,
};

const FILE_ID: &[u8] = b"0123456789abcdef";

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// One page whose content stream and document title are RC4 encrypted
fn encrypted_pdf(user: &str, owner: &str) -> Vec<u8> {
    let handler = |owner_hash: Vec<u8>| {
        StandardSecurityHandler::new(
            SecurityHandlerRevision::R3,
            16,
            owner_hash,
            Vec::new(),
            -4,
            FILE_ID.to_vec(),
            true,
        )
    };
    let owner_hash = handler(Vec::new()).compute_owner_hash(owner.as_bytes(), user.as_bytes());
    let handler = handler(owner_hash.clone());
    let key = handler.compute_encryption_key(user.as_bytes());
    let user_hash = handler.compute_user_hash(&key);

    let encrypt = |num: u32, data: &[u8]| {
        rc4_apply(&handler.compute_object_key(&key, ObjectId::new(num, 0), false), data)
    };
    let content = encrypt(5, show("top secret").as_bytes());
    let title = encrypt(6, b"Classified");

    PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [4 0 R] /Count 1 >>")
        .object(3, HELVETICA)
        .object(4, &page_object(5))
        .stream(5, "", &content)
        .object(6, &format!("<< /Title <{}> >>", hex(&title)))
        .object(
            7,
            &format!(
                "<< /Filter /Standard /V 2 /R 3 /Length 128 /P -4 /O <{}> /U <{}> >>",
                hex(&owner_hash),
                hex(&user_hash)
            ),
        )
        .trailer(&format!(
            "/Info 6 0 R /Encrypt 7 0 R /ID [<{0}> <{0}>]",
            hex(FILE_ID)
        ))
        .build()
}

#[test]
fn test_empty_user_password_opens_transparently() {
    let data = encrypted_pdf("", "owner");
    let doc = PdfDocument::open(data.clone(), ParseOptions::default()).unwrap();
    assert!(doc.is_encrypted());
    assert_eq!(doc.info().title.as_deref(), Some("Classified"));
    assert_eq!(extract_all_text(data).unwrap(), "top secret");
}

#[test]
fn test_user_password_required() {
    let data = encrypted_pdf("reader", "owner");

    let err = extract_all_text(data.clone()).unwrap_err();
    assert!(matches!(err, PdfError::EncryptionRequired));
    assert_eq!(err.kind(), ErrorKind::EncryptionRequired);

    let err = extract_text_with(
        data.clone(),
        ParseOptions::default().with_password("guess"),
        ExtractionOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PdfError::InvalidPassword));

    let text = extract_text_with(
        data,
        ParseOptions::default().with_password("reader"),
        ExtractionOptions::default(),
    )
    .unwrap();
    assert_eq!(text.pages, vec!["top secret".to_string()]);
}

#[test]
fn test_owner_password_also_unlocks() {
    let data = encrypted_pdf("reader", "admin");
    let doc = PdfDocument::open(data, ParseOptions::default().with_password("admin")).unwrap();
    assert_eq!(doc.info().title.as_deref(), Some("Classified"));
}
