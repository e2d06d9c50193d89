//! Page counting through the public API

mod common;

use common::{text_pages, PdfBuilder, HELVETICA};
use pdftext::{page_count, ErrorKind, ParseOptions, PdfDocument, PdfError, Quality};

#[test]
fn test_flat_page_tree() {
    assert_eq!(page_count(text_pages(&["a"]).build()).unwrap(), 1);
    assert_eq!(page_count(text_pages(&["a", "b", "c", "d"]).build()).unwrap(), 4);
}

/// Rewrite the single `0 N` xref subsection as `split..N` followed by `0..split`
fn reorder_xref_subsections(data: &[u8], split: usize) -> Vec<u8> {
    let start = common::startxref(data);
    let line_end = |from: usize| from + data[from..].iter().position(|&b| b == b'\n').unwrap() + 1;
    let header_end = line_end(start);
    let subsection_end = line_end(header_end);
    let count: usize = std::str::from_utf8(&data[header_end..subsection_end])
        .unwrap()
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();
    let entries = &data[subsection_end..subsection_end + 20 * count];

    let mut out = data[..header_end].to_vec();
    out.extend_from_slice(format!("{split} {}\n", count - split).as_bytes());
    out.extend_from_slice(&entries[20 * split..]);
    out.extend_from_slice(format!("0 {split}\n").as_bytes());
    out.extend_from_slice(&entries[..20 * split]);
    out.extend_from_slice(&data[subsection_end + 20 * count..]);
    out
}

#[test]
fn test_count_ignores_xref_subsection_order() {
    let original = text_pages(&["a", "b", "c"]).build();
    let reordered = reorder_xref_subsections(&original, 5);
    assert_ne!(original, reordered);
    assert!(String::from_utf8_lossy(&reordered).contains("xref\n5 5\n"));

    let before = PdfDocument::open(original, ParseOptions::strict()).unwrap();
    let after = PdfDocument::open(reordered, ParseOptions::strict()).unwrap();
    assert_eq!(before.page_count(), 3);
    assert_eq!(after.page_count(), before.page_count());
    assert!(!after.xref_rebuilt());
    assert_eq!(after.quality(), Quality::Clean);
}

#[test]
fn test_empty_page_tree() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .build();
    assert_eq!(page_count(data).unwrap(), 0);
}

#[test]
fn test_nested_tree_counts_leaves_not_count_entries() {
    // Intermediate /Count values are wrong on purpose
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 99 >>")
        .object(3, "<< /Type /Pages /Parent 2 0 R /Kids [5 0 R 6 0 R] /Count 1 >>")
        .object(4, "<< /Type /Pages /Parent 2 0 R /Kids [7 0 R] /Count 0 >>")
        .object(5, "<< /Type /Page /Parent 3 0 R >>")
        .object(6, "<< /Type /Page /Parent 3 0 R >>")
        .object(7, "<< /Type /Page /Parent 4 0 R >>")
        .build();
    assert_eq!(page_count(data).unwrap(), 3);
}

#[test]
fn test_page_tree_cycle_terminates() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .object(4, "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R 5 0 R] /Count 1 >>")
        .object(5, "<< /Type /Page /Parent 4 0 R >>")
        .build();

    let doc = PdfDocument::open(data, ParseOptions::default()).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert!(doc.structural_cycles() > 0);
    assert_eq!(doc.quality(), Quality::Recovered);
}

#[test]
fn test_page_listed_twice_counts_once() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R 3 0 R] /Count 2 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .build();
    assert_eq!(page_count(data).unwrap(), 1);
}

#[test]
fn test_resources_inherited_from_ancestors() {
    let data = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R] /Count 1 /Resources << /Font << /F1 5 0 R >> >> \
             /MediaBox [0 0 300 400] >>",
        )
        .object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>")
        .stream(4, "", b"BT /F1 10 Tf 10 10 Td (inherited) Tj ET")
        .object(5, HELVETICA)
        .build();

    let doc = PdfDocument::open(data.clone(), ParseOptions::default()).unwrap();
    let page = doc.page(0).unwrap();
    assert!(page.get_resources().is_some());
    assert_eq!(pdftext::extract_all_text(data).unwrap(), "inherited");
}

#[test]
fn test_unreadable_documents() {
    for data in [
        Vec::new(),
        b"plain text, not a document".to_vec(),
        b"%PDF-1.7\n%%EOF\n".to_vec(),
    ] {
        let err = page_count(data).unwrap_err();
        assert!(matches!(err, PdfError::UnreadableDocument(_)), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::UnreadableDocument);
    }
}
