//! Document builders shared by the integration tests

#![allow(dead_code)]

/// Assembles a PDF from numbered object bodies and writes a matching xref table
#[derive(Default, Clone)]
pub struct PdfBuilder {
    objects: Vec<(u32, Vec<u8>)>,
    trailer_extra: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, num: u32, body: &str) -> Self {
        self.objects.push((num, body.as_bytes().to_vec()));
        self
    }

    /// Stream object with a correct `/Length`
    pub fn stream(mut self, num: u32, dict_entries: &str, data: &[u8]) -> Self {
        self.objects.push((num, stream_body(dict_entries, data)));
        self
    }

    pub fn trailer(mut self, entries: &str) -> Self {
        self.trailer_extra = entries.to_string();
        self
    }

    fn size(&self) -> u32 {
        self.objects.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1
    }

    fn body(&self) -> (Vec<u8>, Vec<(u32, usize)>) {
        let mut out = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::new();
        for (num, body) in &self.objects {
            offsets.push((*num, out.len()));
            write_object(&mut out, *num, body);
        }
        (out, offsets)
    }

    /// Complete file with a classic xref table
    pub fn build(&self) -> Vec<u8> {
        let (mut out, offsets) = self.body();
        let xref_start = out.len();
        let size = self.size();

        out.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
        for num in 0..size {
            match offsets.iter().find(|(n, _)| *n == num) {
                Some((_, offset)) => {
                    out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes())
                }
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

    /// Objects only: no xref, no trailer, no startxref
    pub fn build_without_xref(&self) -> Vec<u8> {
        let (mut out, _) = self.body();
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    /// Direct objects followed by one object stream holding `packed`, indexed
    /// by a cross-reference stream
    pub fn build_with_object_stream(&self, packed: &[(u32, &str)]) -> Vec<u8> {
        let (mut out, offsets) = self.body();
        let max_packed = packed.iter().map(|(n, _)| *n).max().unwrap_or(0);
        let objstm_num = self.size().max(max_packed + 1);
        let xref_num = objstm_num + 1;

        let mut index = String::new();
        let mut objects = String::new();
        for (num, body) in packed {
            index.push_str(&format!("{num} {} ", objects.len()));
            objects.push_str(body);
            objects.push('\n');
        }
        let first = index.len();
        let objstm_offset = out.len();
        write_object(
            &mut out,
            objstm_num,
            &stream_body(
                &format!("/Type /ObjStm /N {} /First {first}", packed.len()),
                format!("{index}{objects}").as_bytes(),
            ),
        );

        let size = xref_num + 1;
        let xref_offset = out.len();
        let mut entries = Vec::new();
        for num in 0..size {
            let (kind, field2, field3): (u8, u32, u16) =
                if let Some((_, offset)) = offsets.iter().find(|(n, _)| *n == num) {
                    (1, *offset as u32, 0)
                } else if let Some(pos) = packed.iter().position(|(n, _)| *n == num) {
                    (2, objstm_num, pos as u16)
                } else if num == objstm_num {
                    (1, objstm_offset as u32, 0)
                } else if num == xref_num {
                    (1, xref_offset as u32, 0)
                } else {
                    (0, 0, 65535)
                };
            entries.push(kind);
            entries.extend_from_slice(&field2.to_be_bytes());
            entries.extend_from_slice(&field3.to_be_bytes());
        }
        write_object(
            &mut out,
            xref_num,
            &stream_body(
                &format!(
                    "/Type /XRef /Size {size} /W [1 4 2] /Root 1 0 R {}",
                    self.trailer_extra
                ),
                &entries,
            ),
        );
        out.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
        out
    }
}

fn stream_body(dict_entries: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< /Length {} {dict_entries} >>\nstream\n", data.len()).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

fn write_object(out: &mut Vec<u8>, num: u32, body: &[u8]) {
    out.extend_from_slice(format!("{num} 0 obj\n").as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
}

/// Offset recorded after the last `startxref`
pub fn startxref(data: &[u8]) -> usize {
    let text = String::from_utf8_lossy(data);
    let pos = text.rfind("startxref").expect("startxref present");
    text[pos + "startxref".len()..]
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .expect("startxref offset")
}

/// Append an incremental update redefining `objects`, chained with `/Prev`
pub fn append_update(base: &[u8], size: u32, objects: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let prev = startxref(base);
    let mut out = base.to_vec();
    let mut offsets = Vec::new();
    for (num, body) in objects {
        offsets.push((*num, out.len()));
        write_object(&mut out, *num, body);
    }

    let xref_start = out.len();
    out.extend_from_slice(b"xref\n");
    for (num, offset) in offsets {
        out.extend_from_slice(format!("{num} 1\n{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {size} /Root 1 0 R /Prev {prev} >>\nstartxref\n{xref_start}\n%%EOF\n"
        )
        .as_bytes(),
    );
    out
}

/// Content stream object body for [`append_update`]
pub fn content_object(data: &[u8]) -> Vec<u8> {
    stream_body("", data)
}

/// Font dictionary shared by the text documents
pub const HELVETICA: &str =
    "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>";

/// Catalog (1), page tree (2), Helvetica (3) and, for each page, a page
/// object followed by its content stream
pub fn text_pages(pages: &[&str]) -> PdfBuilder {
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();
    let mut pdf = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                pages.len()
            ),
        )
        .object(3, HELVETICA);

    for (i, text) in pages.iter().enumerate() {
        let page = 4 + 2 * i as u32;
        pdf = pdf
            .object(page, &page_object(page + 1))
            .stream(page + 1, "", show(text).as_bytes());
    }
    pdf
}

/// Page using the font in object 3 and the content stream `contents`
pub fn page_object(contents: u32) -> String {
    format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 3 0 R >> >> /Contents {contents} 0 R >>"
    )
}

/// Content stream showing one string at the top left of the page
pub fn show(text: &str) -> String {
    format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET")
}
