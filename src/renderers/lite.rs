//! Lite renderer: HTML stripped to text, laid out with the standard PDF fonts.
//!
//! No browser, no network, no images. Headings keep their structure (bold,
//! larger), `pre` blocks keep their line breaks in a monospace face, and
//! page/section-break markers start a new page. Header/footer templates and
//! diagrams are dropped.
//!
//! Text is encoded as WinAnsi; characters outside it print as `?`.

use super::geometry::PageGeometry;
use super::{RenderRequest, Renderer};
use crate::error::Md2PdfError;
use crate::pipeline::markup::dom;
use futures::future::BoxFuture;
use markup5ever_rcdom::{Handle, NodeData};
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use tracing::debug;

const BODY_SIZE: f32 = 11.0;
const LINE_SPACING: f32 = 1.4;
// Average glyph advance as a fraction of the font size.
const SANS_ADVANCE: f32 = 0.5;
const MONO_ADVANCE: f32 = 0.6;

const SKIPPED: [&str; 7] = ["head", "script", "style", "template", "img", "svg", "math"];
const BLOCKS: [&str; 20] = [
    "p", "div", "section", "main", "article", "header", "footer", "blockquote", "ul", "ol", "li", "table", "tr",
    "figure", "figcaption", "dl", "dt", "dd", "hr", "nav",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LiteRenderer;

impl Renderer for LiteRenderer {
    fn name(&self) -> &'static str {
        "lite"
    }

    fn render(&self, request: RenderRequest) -> BoxFuture<'_, Result<Vec<u8>, Md2PdfError>> {
        Box::pin(async move {
            let timeout = request.timeout;
            let job = tokio::task::spawn_blocking(move || render_blocking(&request.html, &request.geometry));
            match tokio::time::timeout(timeout, job).await {
                Ok(joined) => joined.map_err(|e| Md2PdfError::RenderFailed {
                    renderer: "lite".into(),
                    reason: format!("layout task panicked: {e}"),
                })?,
                Err(_) => Err(Md2PdfError::RenderTimeout {
                    renderer: "lite".into(),
                    millis: timeout.as_millis() as u64,
                }),
            }
        })
    }
}

fn render_blocking(html: &str, geometry: &PageGeometry) -> Result<Vec<u8>, Md2PdfError> {
    let tree = dom::parse(html).map_err(|e| Md2PdfError::RenderFailed {
        renderer: "lite".into(),
        reason: e.to_string(),
    })?;
    let blocks = extract_blocks(&tree.body);
    let pages = layout(&blocks, geometry);
    debug!("lite layout: {} blocks on {} pages", blocks.len(), pages.len());
    Ok(write_pdf(&pages, geometry))
}

// ── Text extraction ──────────────────────────────────────────────────────

/// A unit of laid-out content.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Preformatted(String),
    PageBreak,
}

pub(crate) fn extract_blocks(body: &Handle) -> Vec<Block> {
    let mut out = Extractor::default();
    out.walk(body);
    out.flush();
    out.blocks
}

#[derive(Default)]
struct Extractor {
    blocks: Vec<Block>,
    current: String,
}

impl Extractor {
    fn flush(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(text.to_string()));
        }
        self.current.clear();
    }

    fn push_text(&mut self, text: &str) {
        for word in text.split_whitespace() {
            if !self.current.is_empty() && !self.current.ends_with(' ') {
                self.current.push(' ');
            }
            self.current.push_str(word);
        }
        if text.ends_with(char::is_whitespace) && !self.current.is_empty() {
            self.current.push(' ');
        }
    }

    fn walk(&mut self, node: &Handle) {
        for child in node.children.borrow().iter() {
            match &child.data {
                NodeData::Text { contents } => {
                    let text = contents.borrow();
                    if text.starts_with(char::is_whitespace) && !self.current.is_empty() {
                        self.current.push(' ');
                    }
                    self.push_text(&text);
                }
                NodeData::Element { .. } => self.element(child),
                _ => {}
            }
        }
    }

    fn element(&mut self, node: &Handle) {
        let Some(tag) = dom::tag_name(node) else {
            return;
        };
        match tag {
            t if SKIPPED.contains(&t) => {}
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = tag.as_bytes()[1] - b'0';
                let text = dom::text_content(node).split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    self.blocks.push(Block::Heading { level, text });
                }
            }
            "pre" => {
                self.flush();
                let text = dom::text_content(node);
                self.blocks
                    .push(Block::Preformatted(text.trim_end_matches('\n').to_string()));
            }
            "br" => self.flush(),
            "td" | "th" => {
                self.walk(node);
                self.current.push_str("   ");
            }
            _ if dom::has_class(node, "page-break") || dom::has_class(node, "section-break") => {
                self.flush();
                self.blocks.push(Block::PageBreak);
            }
            "li" => {
                self.flush();
                self.current.push_str("\u{2022} ");
                self.walk(node);
                self.flush();
            }
            t if BLOCKS.contains(&t) => {
                self.flush();
                self.walk(node);
                self.flush();
            }
            _ => self.walk(node),
        }
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Face {
    Regular,
    Bold,
    Mono,
}

impl Face {
    fn resource(self) -> Name<'static> {
        match self {
            Face::Regular => Name(b"F1"),
            Face::Bold => Name(b"F2"),
            Face::Mono => Name(b"F3"),
        }
    }

    fn advance(self) -> f32 {
        match self {
            Face::Mono => MONO_ADVANCE,
            _ => SANS_ADVANCE,
        }
    }
}

/// One positioned line of text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Line {
    pub face: Face,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 20.0,
        2 => 16.0,
        3 => 14.0,
        _ => 12.0,
    }
}

struct Cursor {
    pages: Vec<Vec<Line>>,
    y: f32,
    top: f32,
    bottom: f32,
    left: f32,
    width: f32,
}

impl Cursor {
    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = self.top;
    }

    fn line(&mut self, face: Face, size: f32, text: String) {
        let height = size * LINE_SPACING;
        if self.y - height < self.bottom && self.pages.last().is_some_and(|p| !p.is_empty()) {
            self.new_page();
        }
        self.y -= height;
        let (x, y) = (self.left, self.y);
        if let Some(page) = self.pages.last_mut() {
            page.push(Line { face, size, x, y, text });
        }
    }

    fn gap(&mut self, amount: f32) {
        if self.pages.last().is_some_and(|p| !p.is_empty()) {
            self.y -= amount;
        }
    }

    fn columns(&self, face: Face, size: f32) -> usize {
        ((self.width / (size * face.advance())).floor() as usize).max(8)
    }
}

/// Lay blocks out into pages of positioned lines. Always yields at least one page.
pub(crate) fn layout(blocks: &[Block], geometry: &PageGeometry) -> Vec<Vec<Line>> {
    let (page_w, page_h) = geometry.size.points();
    let [top, right, bottom, left] = geometry.margins.points();
    let mut cursor = Cursor {
        pages: vec![Vec::new()],
        y: (page_h - top) as f32,
        top: (page_h - top) as f32,
        bottom: bottom as f32,
        left: left as f32,
        width: ((page_w - left - right) as f32).max(72.0),
    };

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let size = heading_size(*level);
                cursor.gap(size * 0.6);
                let cols = cursor.columns(Face::Bold, size);
                for line in wrap(text, cols) {
                    cursor.line(Face::Bold, size, line);
                }
                cursor.gap(size * 0.3);
            }
            Block::Paragraph(text) => {
                let cols = cursor.columns(Face::Regular, BODY_SIZE);
                for line in wrap(text, cols) {
                    cursor.line(Face::Regular, BODY_SIZE, line);
                }
                cursor.gap(BODY_SIZE * 0.5);
            }
            Block::Preformatted(text) => {
                let size = BODY_SIZE - 1.5;
                let cols = cursor.columns(Face::Mono, size);
                for raw in text.lines() {
                    let expanded = raw.replace('\t', "    ");
                    let chars: Vec<char> = expanded.chars().collect();
                    if chars.is_empty() {
                        cursor.line(Face::Mono, size, String::new());
                    }
                    for chunk in chars.chunks(cols) {
                        cursor.line(Face::Mono, size, chunk.iter().collect());
                    }
                }
                cursor.gap(BODY_SIZE * 0.5);
            }
            Block::PageBreak => {
                if cursor.pages.last().is_some_and(|p| !p.is_empty()) {
                    cursor.new_page();
                }
            }
        }
    }
    cursor.pages
}

/// Greedy word wrap at `columns` characters; over-long words are split.
pub(crate) fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > columns {
            if len > 0 {
                lines.push(std::mem::take(&mut current));
                len = 0;
            }
            lines.push(word.drain(..columns).collect());
        }
        let wlen = word.len();
        if wlen == 0 {
            continue;
        }
        if len > 0 && len + 1 + wlen > columns {
            lines.push(std::mem::take(&mut current));
            len = 0;
        }
        if len > 0 {
            current.push(' ');
            len += 1;
        }
        current.extend(word);
        len += wlen;
    }
    if len > 0 {
        lines.push(current);
    }
    lines
}

// ── PDF output ───────────────────────────────────────────────────────────

fn write_pdf(pages: &[Vec<Line>], geometry: &PageGeometry) -> Vec<u8> {
    let (page_w, page_h) = geometry.size.points();
    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let fonts = [
        (Ref::new(3), Face::Regular, b"Helvetica".as_slice()),
        (Ref::new(4), Face::Bold, b"Helvetica-Bold".as_slice()),
        (Ref::new(5), Face::Mono, b"Courier".as_slice()),
    ];
    let page_ids: Vec<(Ref, Ref)> = (0..pages.len() as i32)
        .map(|i| (Ref::new(6 + 2 * i), Ref::new(7 + 2 * i)))
        .collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().map(|(page, _)| *page))
        .count(page_ids.len() as i32);

    for (id, _, base) in fonts {
        pdf.type1_font(id)
            .base_font(Name(base))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    for (lines, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        {
            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, page_w as f32, page_h as f32));
            page.parent(tree_id);
            page.contents(*content_id);
            let mut resources = page.resources();
            let mut font_dict = resources.fonts();
            for (id, face, _) in fonts {
                font_dict.pair(face.resource(), id);
            }
        }

        let mut content = Content::new();
        for line in lines.iter().filter(|l| !l.text.is_empty()) {
            content.begin_text();
            content.set_font(line.face.resource(), line.size);
            content.next_line(line.x, line.y);
            content.show(Str(&encode_win_ansi(&line.text)));
            content.end_text();
        }
        pdf.stream(*content_id, &content.finish());
    }

    pdf.finish()
}

/// Encode text as WinAnsi (Windows-1252); unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2122}' => 0x99,
            _ => b'?',
        })
        .collect()
}
