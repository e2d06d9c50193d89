//! Text extraction from PDF content streams
//!
//! Interprets the text subset of each page's content: text state, text and
//! line matrices, the graphics state stack and `cm`, and form XObjects. Glyph
//! positions are tracked in device space; word and line breaks are inferred
//! from the gap between the end of one glyph and the start of the next,
//! measured along and across the writing direction in units of the font size.

use super::font::{Font, Glyph};
use crate::parser::content::{ContentOperation, ContentParser, TextElement};
use crate::parser::document::{PdfDocument, Quality};
use crate::parser::objects::{ObjectId, PdfDictionary, PdfObject};
use crate::parser::page_tree::ParsedPage;
use crate::parser::{ErrorKind, ParseResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Text extraction options
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Gap along the baseline, as a fraction of the font size, above which a
    /// space is inserted
    pub space_threshold: f64,
    /// Offset across the baseline, as a fraction of the font size, above which
    /// a line break is inserted
    pub newline_threshold: f64,
    /// Inserted between pages by [`DocumentText::join`] and friends
    pub page_separator: String,
    /// Emitted for character codes the font cannot map to Unicode
    pub placeholder: char,
    /// Interpret form XObjects painted with `Do`
    pub include_form_xobjects: bool,
    /// Form XObjects interpreted per page, counting every nested `Do`
    pub max_form_invocations: usize,
    /// Extract pages on worker threads
    pub parallel: bool,
    /// Worker count for parallel extraction; 0 uses the available parallelism
    pub threads: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            space_threshold: 0.2,
            newline_threshold: 0.5,
            page_separator: "\n\n".to_string(),
            placeholder: '\u{FFFD}',
            include_form_xobjects: true,
            max_form_invocations: 1024,
            parallel: false,
            threads: 0,
        }
    }
}

/// Text of one page plus what went wrong while producing it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    /// Codes replaced by the placeholder
    pub unmapped_glyphs: usize,
    /// Fonts decoded with a fallback encoding
    pub unsupported_encodings: usize,
    /// Form XObjects skipped because their data could not be decoded
    pub unsupported_filters: usize,
}

/// Summary of everything extraction had to work around
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// The cross-reference index was rebuilt by scanning
    pub xref_rebuilt: bool,
    /// Page tree nodes skipped because they were already visited
    pub structural_cycles: usize,
    pub unsupported_filters: usize,
    pub unsupported_encodings: usize,
    /// Placeholder characters emitted
    pub unmapped_glyphs: usize,
    /// Zero-based indices of pages whose text could not be extracted
    pub failed_pages: Vec<usize>,
}

impl Diagnostics {
    fn for_document(doc: &PdfDocument) -> Self {
        Self {
            xref_rebuilt: doc.xref_rebuilt(),
            structural_cycles: doc.structural_cycles(),
            ..Self::default()
        }
    }

    fn absorb(&mut self, page: &PageText) {
        self.unmapped_glyphs += page.unmapped_glyphs;
        self.unsupported_encodings += page.unsupported_encodings;
        self.unsupported_filters += page.unsupported_filters;
    }

    /// Structural quality of the parse the text came from
    pub fn quality(&self) -> Quality {
        if self.xref_rebuilt || self.structural_cycles > 0 {
            Quality::Recovered
        } else {
            Quality::Clean
        }
    }

    /// True when nothing was recovered, skipped or replaced
    pub fn is_clean(&self) -> bool {
        self.quality() == Quality::Clean
            && self.unsupported_filters == 0
            && self.unsupported_encodings == 0
            && self.unmapped_glyphs == 0
            && self.failed_pages.is_empty()
    }
}

/// Text of every page in document order
#[derive(Debug, Clone, Default)]
pub struct DocumentText {
    pub pages: Vec<String>,
    pub diagnostics: Diagnostics,
}

impl DocumentText {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All pages joined by `separator`
    pub fn join(&self, separator: &str) -> String {
        self.pages.join(separator)
    }
}

/// Text extractor for PDF pages
#[derive(Debug, Clone, Default)]
pub struct TextExtractor {
    options: ExtractionOptions,
}

impl TextExtractor {
    /// Create a new text extractor with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a text extractor with custom options
    pub fn with_options(options: ExtractionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// All page text joined by the configured page separator
    pub fn extract_text(&self, doc: &PdfDocument) -> String {
        self.extract_document(doc).join(&self.options.page_separator)
    }

    /// Extract every page. A page that fails yields an empty string and is
    /// recorded in the diagnostics; the remaining pages are still extracted.
    pub fn extract_document(&self, doc: &PdfDocument) -> DocumentText {
        let pages = doc.pages();
        let workers = self.worker_count(pages.len());
        let outcomes = if workers > 1 {
            self.extract_parallel(doc, pages, workers)
        } else {
            pages.iter().map(|page| self.extract_page(doc, page)).collect()
        };

        let mut diagnostics = Diagnostics::for_document(doc);
        let pages = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| match outcome {
                Ok(page) => {
                    diagnostics.absorb(&page);
                    page.text
                }
                Err(e) => {
                    tracing::warn!("page {}: text extraction failed: {}", index + 1, e);
                    if e.kind() == ErrorKind::UnsupportedFilter {
                        diagnostics.unsupported_filters += 1;
                    }
                    diagnostics.failed_pages.push(index);
                    String::new()
                }
            })
            .collect();

        DocumentText { pages, diagnostics }
    }

    /// Extract the text of one page.
    ///
    /// Fails when the page's content streams cannot be decoded; everything
    /// below that (fonts, form XObjects, malformed operators) degrades
    /// instead.
    pub fn extract_page(&self, doc: &PdfDocument, page: &ParsedPage) -> ParseResult<PageText> {
        let mut content = Vec::new();
        for part in doc.page_content_streams(page) {
            content.extend_from_slice(&part?);
            content.push(b'\n');
        }

        let operations = ContentParser::parse(&content);
        let mut interpreter = PageInterpreter::new(doc, &self.options);
        interpreter.run(&operations, page.get_resources());
        Ok(interpreter.finish())
    }

    fn worker_count(&self, pages: usize) -> usize {
        if !self.options.parallel {
            return 1;
        }
        let threads = match self.options.threads {
            0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        threads.min(pages).max(1)
    }

    #[cfg(feature = "parallel")]
    fn extract_parallel(
        &self,
        doc: &PdfDocument,
        pages: &[ParsedPage],
        workers: usize,
    ) -> Vec<ParseResult<PageText>> {
        use rayon::prelude::*;

        let run = || -> Vec<ParseResult<PageText>> {
            pages
                .par_iter()
                .map(|page| self.extract_page(doc, page))
                .collect()
        };
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!("cannot start {} extraction workers ({}), using the global pool", workers, e);
                run()
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn extract_parallel(
        &self,
        doc: &PdfDocument,
        pages: &[ParsedPage],
        _workers: usize,
    ) -> Vec<ParseResult<PageText>> {
        pages.iter().map(|page| self.extract_page(doc, page)).collect()
    }
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a × b` for PDF row-vector matrices: apply `a`, then `b`
pub fn multiply_matrix(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn transform_point(x: f64, y: f64, m: &Matrix) -> (f64, f64) {
    (x * m[0] + y * m[2] + m[4], x * m[1] + y * m[3] + m[5])
}

fn translate(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn unit(x: f64, y: f64) -> (f64, f64) {
    let len = x.hypot(y);
    if len > f64::EPSILON {
        (x / len, y / len)
    } else {
        (1.0, 0.0)
    }
}

/// Text state parameters; saved and restored with the graphics state
#[derive(Debug, Clone)]
struct TextState {
    char_space: f64,
    word_space: f64,
    /// `Tz / 100`
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
    font: Option<Arc<Font>>,
    font_size: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_space: 0.0,
            word_space: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// End of the last emitted glyph in device space
#[derive(Debug, Clone, Copy)]
struct Pen {
    x: f64,
    y: f64,
    /// Unit vector of the writing direction
    dir: (f64, f64),
    size: f64,
}

struct PageInterpreter<'a> {
    doc: &'a PdfDocument,
    options: &'a ExtractionOptions,
    fonts: HashMap<ObjectId, Arc<Font>>,
    fallback_font: Arc<Font>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    /// Form XObjects currently being interpreted
    forms: Vec<ObjectId>,
    form_invocations: usize,
    pen: Option<Pen>,
    page: PageText,
}

impl<'a> PageInterpreter<'a> {
    fn new(doc: &'a PdfDocument, options: &'a ExtractionOptions) -> Self {
        Self {
            doc,
            options,
            fonts: HashMap::new(),
            fallback_font: Arc::new(Font::fallback()),
            state: GraphicsState {
                ctm: IDENTITY,
                text: TextState::default(),
            },
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            forms: Vec::new(),
            form_invocations: 0,
            pen: None,
            page: PageText::default(),
        }
    }

    fn finish(mut self) -> PageText {
        let trimmed = self.page.text.trim_end().len();
        self.page.text.truncate(trimmed);
        self.page
    }

    fn run(&mut self, operations: &[ContentOperation], resources: Option<&PdfDictionary>) {
        for op in operations {
            match op {
                ContentOperation::BeginText => {
                    self.text_matrix = IDENTITY;
                    self.line_matrix = IDENTITY;
                }
                ContentOperation::EndText => {}
                ContentOperation::SetCharSpacing(v) => self.state.text.char_space = *v as f64,
                ContentOperation::SetWordSpacing(v) => self.state.text.word_space = *v as f64,
                ContentOperation::SetHorizontalScaling(v) => {
                    self.state.text.horizontal_scale = *v as f64 / 100.0
                }
                ContentOperation::SetLeading(v) => self.state.text.leading = *v as f64,
                ContentOperation::SetTextRise(v) => self.state.text.rise = *v as f64,
                ContentOperation::SetTextRenderMode(_) => {}
                ContentOperation::SetFont(name, size) => {
                    let font = self.select_font(name, resources);
                    self.state.text.font = Some(font);
                    self.state.text.font_size = *size as f64;
                }
                ContentOperation::MoveText(tx, ty) => self.move_line(*tx as f64, *ty as f64),
                ContentOperation::MoveTextSetLeading(tx, ty) => {
                    self.state.text.leading = -(*ty as f64);
                    self.move_line(*tx as f64, *ty as f64);
                }
                ContentOperation::SetTextMatrix(a, b, c, d, e, f) => {
                    let m = [*a, *b, *c, *d, *e, *f].map(f64::from);
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
                ContentOperation::NextLine => self.next_line(),
                ContentOperation::ShowText(bytes) => self.show(bytes),
                ContentOperation::ShowTextArray(elements) => {
                    for element in elements {
                        match element {
                            TextElement::Text(bytes) => self.show(bytes),
                            TextElement::Spacing(adjustment) => self.adjust(*adjustment as f64),
                        }
                    }
                }
                ContentOperation::NextLineShowText(bytes) => {
                    self.next_line();
                    self.show(bytes);
                }
                ContentOperation::SetSpacingNextLineShowText(aw, ac, bytes) => {
                    self.state.text.word_space = *aw as f64;
                    self.state.text.char_space = *ac as f64;
                    self.next_line();
                    self.show(bytes);
                }
                ContentOperation::SaveGraphicsState => self.stack.push(self.state.clone()),
                ContentOperation::RestoreGraphicsState => {
                    if let Some(state) = self.stack.pop() {
                        self.state = state;
                    }
                }
                ContentOperation::SetTransformMatrix(a, b, c, d, e, f) => {
                    let m = [*a, *b, *c, *d, *e, *f].map(f64::from);
                    self.state.ctm = multiply_matrix(&m, &self.state.ctm);
                }
                ContentOperation::PaintXObject(name) => self.paint_xobject(name, resources),
            }
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply_matrix(&translate(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.state.text.leading);
    }

    /// `TJ` number: shift the text position without showing anything
    fn adjust(&mut self, thousandths: f64) {
        let ts = &self.state.text;
        let amount = -thousandths / 1000.0 * ts.font_size;
        let vertical = ts.font.as_ref().is_some_and(|f| f.is_vertical());
        let shift = if vertical {
            translate(0.0, amount)
        } else {
            translate(amount * ts.horizontal_scale, 0.0)
        };
        self.text_matrix = multiply_matrix(&shift, &self.text_matrix);
    }

    fn show(&mut self, bytes: &[u8]) {
        let font = self
            .state
            .text
            .font
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.fallback_font));
        let vertical = font.is_vertical();

        for glyph in font.decode(bytes) {
            let ts = &self.state.text;
            let (size, rise) = (ts.font_size, ts.rise);
            let spacing = ts.char_space + if glyph.is_space { ts.word_space } else { 0.0 };
            let advance = if vertical {
                translate(0.0, -size + spacing)
            } else {
                translate((glyph.width as f64 * size + spacing) * ts.horizontal_scale, 0.0)
            };

            let trm = multiply_matrix(&self.text_matrix, &self.state.ctm);
            let start = transform_point(0.0, rise, &trm);
            let device_size = size.abs() * trm[2].hypot(trm[3]);
            let dir = if vertical {
                unit(-trm[2], -trm[3])
            } else {
                unit(trm[0], trm[1])
            };

            self.text_matrix = multiply_matrix(&advance, &self.text_matrix);
            let end = transform_point(
                0.0,
                rise,
                &multiply_matrix(&self.text_matrix, &self.state.ctm),
            );

            self.emit(glyph, start, Pen {
                x: end.0,
                y: end.1,
                dir,
                size: device_size,
            });
        }
    }

    fn emit(&mut self, glyph: Glyph, start: (f64, f64), end: Pen) {
        if let Some(pen) = self.pen {
            let (dx, dy) = (start.0 - pen.x, start.1 - pen.y);
            let along = dx * pen.dir.0 + dy * pen.dir.1;
            let across = (dx * pen.dir.1 - dy * pen.dir.0).abs();
            let size = pen.size.max(end.size).max(1.0);
            if across > self.options.newline_threshold * size {
                self.push_newline();
            } else if along > self.options.space_threshold * size {
                self.push_space(glyph.text.as_deref());
            }
        }

        match glyph.text {
            Some(text) => self.page.text.push_str(&text),
            None => {
                self.page.text.push(self.options.placeholder);
                self.page.unmapped_glyphs += 1;
            }
        }
        self.pen = Some(end);
    }

    fn push_space(&mut self, next: Option<&str>) {
        let out = &mut self.page.text;
        let next_is_space = next.is_some_and(|t| t.starts_with(char::is_whitespace));
        if !out.is_empty() && !out.ends_with(char::is_whitespace) && !next_is_space {
            out.push(' ');
        }
    }

    fn push_newline(&mut self) {
        let out = &mut self.page.text;
        let trimmed = out.trim_end_matches([' ', '\t']).len();
        out.truncate(trimmed);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    fn select_font(&mut self, name: &str, resources: Option<&PdfDictionary>) -> Arc<Font> {
        let fonts = resources
            .and_then(|r| r.get("Font"))
            .map(|f| self.doc.resolve(f));
        let entry = fonts
            .as_deref()
            .and_then(|f| f.as_dict())
            .and_then(|f| f.get(name))
            .cloned();

        match entry {
            Some(PdfObject::Reference(id)) => {
                if let Some(font) = self.fonts.get(&id) {
                    return Arc::clone(font);
                }
                let resolved = self.doc.resolve(&PdfObject::Reference(id));
                let font = match resolved.as_dict() {
                    Some(dict) => Arc::new(self.load_font(dict)),
                    None => {
                        tracing::debug!("font /{} ({}) is not a dictionary", name, id);
                        Arc::clone(&self.fallback_font)
                    }
                };
                self.fonts.insert(id, Arc::clone(&font));
                font
            }
            Some(PdfObject::Dictionary(dict)) => Arc::new(self.load_font(&dict)),
            _ => {
                tracing::debug!("font resource /{} not found", name);
                Arc::clone(&self.fallback_font)
            }
        }
    }

    fn load_font(&mut self, dict: &PdfDictionary) -> Font {
        let font = Font::load(self.doc, dict);
        if let Some(reason) = font.unsupported_encoding() {
            tracing::warn!("font {}: {}", font.base_font(), reason);
            self.page.unsupported_encodings += 1;
        }
        font
    }

    fn paint_xobject(&mut self, name: &str, resources: Option<&PdfDictionary>) {
        if !self.options.include_form_xobjects {
            return;
        }
        let xobjects = resources
            .and_then(|r| r.get("XObject"))
            .map(|x| self.doc.resolve(x));
        let Some(entry) = xobjects.as_deref().and_then(|x| x.as_dict()).and_then(|x| x.get(name))
        else {
            tracing::debug!("XObject /{} not found", name);
            return;
        };

        let id = entry.as_reference();
        if let Some(id) = id {
            if self.forms.contains(&id) {
                tracing::warn!("form XObject {} paints itself; skipped", id);
                return;
            }
        }
        if self.forms.len() >= self.doc.options().max_tree_depth {
            tracing::warn!("form XObjects nested too deeply; /{} skipped", name);
            return;
        }
        if self.form_invocations >= self.options.max_form_invocations {
            if self.form_invocations == self.options.max_form_invocations {
                tracing::warn!(
                    "more than {} form XObjects painted on one page; the rest are skipped",
                    self.options.max_form_invocations
                );
                self.form_invocations += 1;
            }
            return;
        }
        self.form_invocations += 1;

        let object = self.doc.resolve(entry);
        let Some(stream) = object.as_stream() else {
            return;
        };
        if stream.dict.get("Subtype").and_then(|s| s.as_name()).map(|n| n.as_str()) != Some("Form") {
            return;
        }
        let data = match self.doc.decode_stream(stream) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("form XObject /{}: {}", name, e);
                if e.kind() == ErrorKind::UnsupportedFilter {
                    self.page.unsupported_filters += 1;
                }
                return;
            }
        };

        let form_resources = stream.dict.get("Resources").map(|r| self.doc.resolve(r));
        let form_resources = form_resources
            .as_deref()
            .and_then(|r| r.as_dict())
            .or(resources);
        let matrix = stream
            .dict
            .get("Matrix")
            .map(|m| self.doc.resolve(m))
            .and_then(|m| m.as_array().and_then(|a| a.to_f32_vec()))
            .and_then(|v| <[f32; 6]>::try_from(v).ok())
            .map_or(IDENTITY, |m| m.map(f64::from));

        let saved_state = self.state.clone();
        let saved_depth = self.stack.len();
        let saved_matrices = (self.text_matrix, self.line_matrix);

        self.state.ctm = multiply_matrix(&matrix, &self.state.ctm);
        if let Some(id) = id {
            self.forms.push(id);
        }
        let operations = ContentParser::parse(&data);
        self.run(&operations, form_resources);
        if id.is_some() {
            self.forms.pop();
        }

        self.stack.truncate(saved_depth);
        self.state = saved_state;
        (self.text_matrix, self.line_matrix) = saved_matrices;
    }
}
