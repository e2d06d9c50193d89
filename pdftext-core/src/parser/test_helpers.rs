//! Helper functions for creating valid test PDFs with correct offsets

/// Assembles a PDF from object bodies, computing the xref offsets
pub struct TestPdf {
    version: String,
    objects: Vec<(u32, Vec<u8>)>,
    trailer_extra: String,
}

impl TestPdf {
    pub fn new() -> Self {
        Self {
            version: "1.4".to_string(),
            objects: Vec::new(),
            trailer_extra: String::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add `num 0 obj <body> endobj`
    pub fn object(self, num: u32, body: &str) -> Self {
        self.object_bytes(num, body.as_bytes().to_vec())
    }

    pub fn object_bytes(mut self, num: u32, body: Vec<u8>) -> Self {
        self.objects.push((num, body));
        self
    }

    /// Add a stream object with a correct `/Length`
    pub fn stream(self, num: u32, dict_entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< /Length {} {} >>\nstream\n", data.len(), dict_entries).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object_bytes(num, body)
    }

    /// Extra trailer entries besides `/Size` and `/Root 1 0 R`
    pub fn trailer(mut self, entries: &str) -> Self {
        self.trailer_extra = entries.to_string();
        self
    }

    /// Header plus object bodies, and the offset of every object
    fn body(&self) -> (Vec<u8>, Vec<(u32, usize)>) {
        let mut out = format!("%PDF-{}\n%\u{e2}\u{e3}\n", self.version).into_bytes();
        let mut offsets = Vec::new();
        for (num, body) in &self.objects {
            offsets.push((*num, out.len()));
            out.extend_from_slice(format!("{num} 0 obj\n").as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        (out, offsets)
    }

    fn size(&self) -> u32 {
        self.objects.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1
    }

    /// Complete file with a classic xref table
    pub fn build(&self) -> Vec<u8> {
        let (mut out, offsets) = self.body();
        let xref_start = out.len();
        let size = self.size();

        out.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
        for num in 0..size {
            match offsets.iter().find(|(n, _)| *n == num) {
                Some((_, offset)) => out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {size} /Root 1 0 R {} >>\nstartxref\n{xref_start}\n%%EOF\n",
                self.trailer_extra
            )
            .as_bytes(),
        );
        out
    }

    /// Objects only, with no xref table, trailer or startxref
    pub fn build_without_xref(&self) -> Vec<u8> {
        self.body().0
    }
}

/// Catalog, page tree and one Helvetica font shared by every page, each page
/// showing its string with a single `Tj`
pub fn simple_text_pdf(pages: &[&str]) -> Vec<u8> {
    let first_page = 4;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page + 2 * i as u32))
        .collect();

    let mut pdf = TestPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            &format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        )
        .object(
            3,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        );

    for (i, text) in pages.iter().enumerate() {
        let page = first_page + 2 * i as u32;
        pdf = pdf
            .object(
                page,
                &format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                     /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                    page + 1
                ),
            )
            .stream(
                page + 1,
                "",
                format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET").as_bytes(),
            );
    }
    pdf.build()
}

/// Catalog, page tree and a single page (object 3) whose content stream is
/// object 4; callers add resources from object 5 up
pub fn one_page(resources: &str, content: &[u8]) -> TestPdf {
    TestPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources {resources} /Contents 4 0 R >>"
            ),
        )
        .stream(4, "", content)
}

/// Creates a minimal valid PDF with an empty page tree
pub fn create_minimal_pdf() -> Vec<u8> {
    TestPdf::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pdf_structure() {
        let pdf = create_minimal_pdf();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));

        let pdf_str = String::from_utf8_lossy(&pdf);
        assert!(pdf_str.contains("xref\n0 3\n"));
        assert!(pdf_str.contains("startxref"));
    }

    #[test]
    fn test_offsets_point_at_objects() {
        let pdf = TestPdf::new().object(1, "<< >>").object(3, "42").build();
        let text = String::from_utf8_lossy(&pdf);
        let xref = text.find("xref\n").unwrap();
        let entries: Vec<&str> = text[xref..].lines().skip(2).take(4).collect();
        let offset: usize = entries[3][..10].parse().unwrap();
        assert!(pdf[offset..].starts_with(b"3 0 obj"));
        assert!(entries[2].ends_with("f "));
    }

    #[test]
    fn test_pdf_with_version() {
        let pdf = TestPdf::new().version("1.7").build();
        assert!(pdf.starts_with(b"%PDF-1.7\n"));
    }
}
