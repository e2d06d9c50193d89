//! Integration tests for the pdftext CLI
//!
//! Runs the built binary against documents written to a temporary directory.

use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::{tempdir, TempDir};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdftext"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pdftext")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// One page per string, each drawn with Helvetica
fn text_pdf(pages: &[&str]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        String::new(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    let mut kids = Vec::new();
    for text in pages {
        let page = objects.len() + 1;
        kids.push(format!("{page} 0 R"));
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            page + 1
        ));
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }
    objects[1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    );

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

fn write_pdf(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, data).expect("failed to write test PDF");
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is UTF-8")
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let help = stdout(&output);
    for command in ["pages", "extract", "info"] {
        assert!(help.contains(command), "help should mention {command}");
    }
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_pages() {
    let dir = tempdir().unwrap();
    let path = write_pdf(&dir, "three.pdf", &text_pdf(&["a", "b", "c"]));

    let output = run(&["pages", path_str(&path)]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "3\n");
}

#[test]
fn test_cli_extract_all_pages() {
    let dir = tempdir().unwrap();
    let path = write_pdf(&dir, "doc.pdf", &text_pdf(&["Hello", "World"]));

    let output = run(&["extract", path_str(&path)]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Hello\n\nWorld\n");
}

#[test]
fn test_cli_extract_single_page_and_separator() {
    let dir = tempdir().unwrap();
    let path = write_pdf(&dir, "doc.pdf", &text_pdf(&["one", "two", "three"]));

    let output = run(&["extract", path_str(&path), "--page", "2"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "two\n");

    let output = run(&["extract", path_str(&path), "--separator", "|", "--parallel"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "one|two|three\n");
}

#[test]
fn test_cli_extract_to_file() {
    let dir = tempdir().unwrap();
    let path = write_pdf(&dir, "doc.pdf", &text_pdf(&["saved"]));
    let out = dir.path().join("out.txt");

    let output = run(&["extract", path_str(&path), "-o", path_str(&out)]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&out).unwrap(), "saved");
}

#[test]
fn test_cli_extract_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pdftext"))
        .args(["extract", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn pdftext");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(&text_pdf(&["piped"]))
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output), "piped\n");
}

#[test]
fn test_cli_invalid_page_number() {
    let dir = tempdir().unwrap();
    let path = write_pdf(&dir, "doc.pdf", &text_pdf(&["only"]));

    for page in ["0", "2"] {
        let output = run(&["extract", path_str(&path), "--page", page]);
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid page number"));
    }
}

#[test]
fn test_cli_info() {
    let dir = tempdir().unwrap();
    let path = write_pdf(&dir, "doc.pdf", &text_pdf(&["x", "y"]));

    let output = run(&["info", path_str(&path), "--detailed"]);
    assert!(output.status.success());
    let info = stdout(&output);
    assert!(info.contains("Version: 1.4"));
    assert!(info.contains("Pages: 2"));
    assert!(info.contains("Encrypted: no"));
    assert!(info.contains("Structure: clean"));
    assert!(info.contains("Page 2: 612x792 pts"));
}

#[test]
fn test_cli_recovers_damaged_file() {
    let dir = tempdir().unwrap();
    let mut data = text_pdf(&["damaged"]);
    let xref = data
        .windows(5)
        .rposition(|w| w == b"xref\n")
        .expect("xref table");
    data.truncate(xref);
    let path = write_pdf(&dir, "damaged.pdf", &data);

    let output = run(&["extract", path_str(&path)]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "damaged\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("recovered"));

    let output = run(&["pages", "--strict", path_str(&path)]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_errors() {
    let output = run(&["pages", "/nonexistent/file.pdf"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));

    let dir = tempdir().unwrap();
    let path = write_pdf(&dir, "junk.pdf", b"this is not a pdf");
    let output = run(&["extract", path_str(&path)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open"));

    let output = run(&["convert"]);
    assert!(!output.status.success());
}
