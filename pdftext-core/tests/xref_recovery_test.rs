//! Cross-reference resolution: incremental updates, xref streams and
//! reconstruction of damaged files

mod common;

use common::{append_update, content_object, show, startxref, text_pages, PdfBuilder, HELVETICA};
use pdftext::{extract_all_text, page_count, ParseOptions, PdfDocument, Quality};
use std::io::Write;
use tempfile::NamedTempFile;

fn find(data: &[u8], needle: &[u8]) -> usize {
    data.windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present")
}

#[test]
fn test_missing_xref_and_trailer() {
    let data = text_pages(&["one", "two"]).build_without_xref();
    let doc = PdfDocument::open(data.clone(), ParseOptions::default()).unwrap();
    assert!(doc.xref_rebuilt());
    assert_eq!(doc.quality(), Quality::Recovered);
    assert_eq!(extract_all_text(data).unwrap(), "one\n\ntwo");
}

#[test]
fn test_wrong_startxref_offset() {
    let mut data = text_pages(&["offset"]).build();
    let pos = find(&data, b"startxref\n") + b"startxref\n".len();
    data.truncate(pos);
    data.extend_from_slice(b"7\n%%EOF\n");
    assert_eq!(extract_all_text(data).unwrap(), "offset");
}

#[test]
fn test_stale_object_offsets() {
    let data = text_pages(&["moved"]).build();
    let split = find(&data, b"1 0 obj");
    let mut shifted = data[..split].to_vec();
    shifted.extend_from_slice(b"%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%\n");
    shifted.extend_from_slice(&data[split..]);
    assert_eq!(extract_all_text(shifted).unwrap(), "moved");
}

#[test]
fn test_truncated_file() {
    let data = text_pages(&["kept", "lost"]).build();
    // Cut inside the second page's content stream
    let cut = find(&data, b"(lost)");
    let text = extract_all_text(data[..cut].to_vec()).unwrap();
    assert!(text.starts_with("kept"));
}

#[test]
fn test_strict_mode_rejects_damaged_xref() {
    let data = text_pages(&["x"]).build_without_xref();
    assert!(PdfDocument::open(data.clone(), ParseOptions::strict()).is_err());
    assert!(PdfDocument::open(data, ParseOptions::lenient()).is_ok());
}

#[test]
fn test_incremental_update_newest_definition_wins() {
    let base = text_pages(&["original"]).build();
    let updated = append_update(&base, 6, &[(5, content_object(show("revised").as_bytes()))]);

    assert_eq!(extract_all_text(base).unwrap(), "original");
    let doc = PdfDocument::open(updated.clone(), ParseOptions::default()).unwrap();
    assert_eq!(doc.quality(), Quality::Clean);
    assert_eq!(extract_all_text(updated).unwrap(), "revised");
}

#[test]
fn test_chained_updates_add_pages() {
    let base = text_pages(&["first"]).build();
    let with_page = append_update(
        &base,
        8,
        &[
            (2, b"<< /Type /Pages /Kids [4 0 R 6 0 R] /Count 2 >>".to_vec()),
            (6, common::page_object(7).into_bytes()),
            (7, content_object(show("second").as_bytes())),
        ],
    );
    let retitled = append_update(
        &with_page,
        8,
        &[(7, content_object(show("second, edited").as_bytes()))],
    );

    assert_eq!(page_count(with_page.clone()).unwrap(), 2);
    assert_eq!(extract_all_text(with_page).unwrap(), "first\n\nsecond");
    assert_eq!(extract_all_text(retitled).unwrap(), "first\n\nsecond, edited");
}

#[test]
fn test_prev_cycle_terminates() {
    let base = text_pages(&["loop"]).build();
    let update = append_update(&base, 6, &[(5, content_object(show("newer").as_bytes()))]);
    // Point the update's /Prev at itself; the trailer follows every offset
    let from = format!("/Prev {}", startxref(&base)).into_bytes();
    let to = format!("/Prev {}", startxref(&update)).into_bytes();
    let pos = find(&update, &from);
    let mut looped = update[..pos].to_vec();
    looped.extend_from_slice(&to);
    looped.extend_from_slice(&update[pos + from.len()..]);

    assert_eq!(extract_all_text(looped).unwrap(), "newer");
}

#[test]
fn test_xref_stream_with_object_stream() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .stream(5, "", show("packed").as_bytes())
        .build_with_object_stream(&[
            (2, "<< /Type /Pages /Kids [4 0 R] /Count 1 >>"),
            (3, HELVETICA),
            (
                4,
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents 5 0 R >>",
            ),
        ]);

    let doc = PdfDocument::open(data.clone(), ParseOptions::default()).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert!(!doc.xref_rebuilt());
    assert_eq!(extract_all_text(data).unwrap(), "packed");
}

#[test]
fn test_object_stream_members_found_by_scan() {
    let mut data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .stream(5, "", show("rescued").as_bytes())
        .build_with_object_stream(&[
            (2, "<< /Type /Pages /Kids [4 0 R] /Count 1 >>"),
            (3, HELVETICA),
            (
                4,
                "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 3 0 R >> >> \
                 /Contents 5 0 R >>",
            ),
        ]);
    data.truncate(startxref(&data));

    let doc = PdfDocument::open(data.clone(), ParseOptions::default()).unwrap();
    assert!(doc.xref_rebuilt());
    assert_eq!(extract_all_text(data).unwrap(), "rescued");
}

#[test]
fn test_damaged_file_read_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "%PDF-1.4").unwrap();
    writeln!(file, "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj").unwrap();
    writeln!(file, "2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj").unwrap();
    writeln!(
        file,
        "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj"
    )
    .unwrap();
    write!(file, "xref\n0 4\ngarbage garbage\ntrailer\n<< /Size 4 >>\n%%EOF").unwrap();
    file.flush().unwrap();

    let data = std::fs::read(file.path()).unwrap();
    assert_eq!(page_count(data).unwrap(), 1);
}
