//! Text-first PDF rasterization of Markdown documents.
//!
//! The document is parsed with the shared comrak options, flattened into a
//! small block model, wrapped against the printable width, paginated onto
//! A4 pages with keep-together rules, and written out with `pdf-writer`
//! using the base-14 fonts. Images resolved by the caller are embedded;
//! unresolved ones degrade to their alt text.

use std::collections::HashMap;

use anyhow::{Context, Result};
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena};
use image::GenericImageView;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};

use crate::markdown::{create_comrak_options, inline_text};

const A4_WIDTH: f32 = 595.276;
const A4_HEIGHT: f32 = 841.89;
const MM_TO_PT: f32 = 72.0 / 25.4;
/// Pixel sizes map to points at the CSS reference density.
const PX_TO_PT: f32 = 72.0 / 96.0;

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            margin: 10.0 * MM_TO_PT,
        }
    }
}

/// A decoded raster image ready for embedding.
pub struct ResolvedImage {
    pub width: u32,
    pub height: u32,
    data: ImageData,
}

enum ImageData {
    /// JPEG bytes pass through untouched (DCTDecode).
    Jpeg(Vec<u8>),
    /// Everything else is decoded to raw 8-bit RGB samples.
    Rgb8(Vec<u8>),
}

impl ResolvedImage {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes).context("unsupported image data")?;
        let (width, height) = decoded.dimensions();
        let data = if bytes.starts_with(&[0xFF, 0xD8]) {
            ImageData::Jpeg(bytes.to_vec())
        } else {
            ImageData::Rgb8(decoded.to_rgb8().into_raw())
        };
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

/// Images resolved ahead of rasterization, keyed by their reference URL.
#[derive(Default)]
pub struct ImageStore {
    images: HashMap<String, ResolvedImage>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: String, image: ResolvedImage) {
        self.images.insert(url, image);
    }

    pub fn get(&self, url: &str) -> Option<&ResolvedImage> {
        self.images.get(url)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

// ── Block model ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FontKind {
    Regular,
    Bold,
    Oblique,
    Mono,
}

#[derive(Debug, Clone)]
struct Seg {
    text: String,
    font: FontKind,
}

#[derive(Debug, Clone)]
struct TextBlock {
    segs: Vec<Seg>,
    size: f32,
    leading: f32,
    indent: f32,
    spacing_before: f32,
    keep_together: bool,
    keep_with_next: bool,
    quote_bar: bool,
}

#[derive(Debug, Clone)]
enum Block {
    Text(TextBlock),
    Image { url: String, alt: String },
    Rule,
}

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.5;
const HEADING_SIZES: [f32; 6] = [23.0, 19.0, 16.0, 14.0, 12.5, 11.5];
const PARAGRAPH_GAP: f32 = 8.0;
const HEADING_GAP: f32 = 14.0;
const LIST_GAP: f32 = 3.0;
const QUOTE_INDENT: f32 = 14.0;
const LIST_INDENT: f32 = 16.0;

struct WalkCtx {
    indent: f32,
    quote: bool,
}

fn collect_blocks(src: &str) -> Vec<Block> {
    let arena = Arena::new();
    let opt = create_comrak_options();
    let root = parse_document(&arena, src, &opt);

    let mut blocks = Vec::new();
    let ctx = WalkCtx {
        indent: 0.0,
        quote: false,
    };
    for child in root.children() {
        walk_block(child, &ctx, &mut blocks);
    }
    blocks
}

fn walk_block<'a>(node: &'a AstNode<'a>, ctx: &WalkCtx, out: &mut Vec<Block>) {
    match &node.data.borrow().value {
        NodeValue::Heading(heading) => {
            let level = heading.level.clamp(1, 6) as usize;
            let size = HEADING_SIZES[level - 1];
            out.push(Block::Text(TextBlock {
                segs: inline_segs(node, FontKind::Bold),
                size,
                leading: size * 1.3,
                indent: ctx.indent,
                spacing_before: HEADING_GAP,
                keep_together: true,
                keep_with_next: true,
                quote_bar: ctx.quote,
            }));
        }
        NodeValue::Paragraph => {
            let (segs, images) = paragraph_segs(node);
            if segs.iter().any(|s| !s.text.trim().is_empty()) {
                out.push(Block::Text(TextBlock {
                    segs,
                    size: BODY_SIZE,
                    leading: BODY_SIZE * 1.45,
                    indent: ctx.indent,
                    spacing_before: PARAGRAPH_GAP,
                    keep_together: false,
                    keep_with_next: false,
                    quote_bar: ctx.quote,
                }));
            }
            for (url, alt) in images {
                out.push(Block::Image { url, alt });
            }
        }
        NodeValue::CodeBlock(code) => {
            let literal = code.literal.trim_end_matches('\n');
            out.push(Block::Text(TextBlock {
                segs: vec![Seg {
                    text: literal.to_string(),
                    font: FontKind::Mono,
                }],
                size: CODE_SIZE,
                leading: CODE_SIZE * 1.4,
                indent: ctx.indent + 6.0,
                spacing_before: PARAGRAPH_GAP,
                keep_together: true,
                keep_with_next: false,
                quote_bar: ctx.quote,
            }));
        }
        NodeValue::BlockQuote => {
            let inner = WalkCtx {
                indent: ctx.indent + QUOTE_INDENT,
                quote: true,
            };
            for child in node.children() {
                walk_block(child, &inner, out);
            }
        }
        NodeValue::List(list) => {
            let mut ordinal = list.start;
            for item in node.children() {
                let marker = match list.list_type {
                    ListType::Bullet => String::from("\u{2022}  "),
                    ListType::Ordered => {
                        let m = format!("{}. ", ordinal);
                        ordinal += 1;
                        m
                    }
                };
                walk_list_item(item, ctx, marker, out);
            }
        }
        NodeValue::Table(_) => {
            out.push(table_block(node, ctx));
        }
        NodeValue::ThematicBreak => out.push(Block::Rule),
        NodeValue::HtmlBlock(_) => {}
        _ => {
            for child in node.children() {
                walk_block(child, ctx, out);
            }
        }
    }
}

fn walk_list_item<'a>(item: &'a AstNode<'a>, ctx: &WalkCtx, marker: String, out: &mut Vec<Block>) {
    let marker = match &item.data.borrow().value {
        NodeValue::TaskItem(state) => {
            if state.is_some() {
                String::from("[x] ")
            } else {
                String::from("[ ] ")
            }
        }
        _ => marker,
    };

    let inner = WalkCtx {
        indent: ctx.indent + LIST_INDENT,
        quote: ctx.quote,
    };
    let mut first_text = true;
    for child in item.children() {
        match &child.data.borrow().value {
            NodeValue::Paragraph => {
                let (mut segs, images) = paragraph_segs(child);
                if first_text {
                    segs.insert(
                        0,
                        Seg {
                            text: marker.clone(),
                            font: FontKind::Regular,
                        },
                    );
                    first_text = false;
                }
                out.push(Block::Text(TextBlock {
                    segs,
                    size: BODY_SIZE,
                    leading: BODY_SIZE * 1.45,
                    indent: ctx.indent,
                    spacing_before: LIST_GAP,
                    keep_together: true,
                    keep_with_next: false,
                    quote_bar: ctx.quote,
                }));
                for (url, alt) in images {
                    out.push(Block::Image { url, alt });
                }
            }
            _ => walk_block(child, &inner, out),
        }
    }
}

/// Tables render as a monospaced grid kept on one page when possible.
fn table_block<'a>(table: &'a AstNode<'a>, ctx: &WalkCtx) -> Block {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut header_rows = 0usize;
    for row in table.children() {
        if let NodeValue::TableRow(header) = &row.data.borrow().value {
            let cells: Vec<String> = row
                .children()
                .map(|cell| inline_text(cell).trim().to_string())
                .collect();
            if *header {
                header_rows += 1;
            }
            rows.push(cells);
        }
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut text = String::new();
    for (idx, row) in rows.iter().enumerate() {
        let mut line = String::from("| ");
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            line.push_str(cell);
            line.extend(std::iter::repeat(' ').take(width.saturating_sub(cell.chars().count())));
            line.push_str(" | ");
        }
        text.push_str(line.trim_end());
        text.push('\n');
        if idx + 1 == header_rows {
            let mut sep = String::from("|");
            for width in &widths {
                sep.push_str(&"-".repeat(width + 2));
                sep.push('|');
            }
            text.push_str(&sep);
            text.push('\n');
        }
    }

    Block::Text(TextBlock {
        segs: vec![Seg {
            text: text.trim_end().to_string(),
            font: FontKind::Mono,
        }],
        size: CODE_SIZE,
        leading: CODE_SIZE * 1.4,
        indent: ctx.indent,
        spacing_before: PARAGRAPH_GAP,
        keep_together: true,
        keep_with_next: false,
        quote_bar: ctx.quote,
    })
}

fn paragraph_segs<'a>(node: &'a AstNode<'a>) -> (Vec<Seg>, Vec<(String, String)>) {
    let mut segs = Vec::new();
    let mut images = Vec::new();
    gather_inline(node, FontKind::Regular, &mut segs, &mut images);
    (segs, images)
}

fn inline_segs<'a>(node: &'a AstNode<'a>, base: FontKind) -> Vec<Seg> {
    let mut segs = Vec::new();
    let mut images = Vec::new();
    gather_inline(node, base, &mut segs, &mut images);
    // Inline images inside styled contexts degrade to alt text.
    for (_, alt) in images {
        segs.push(Seg {
            text: alt,
            font: base,
        });
    }
    segs
}

fn gather_inline<'a>(
    node: &'a AstNode<'a>,
    font: FontKind,
    segs: &mut Vec<Seg>,
    images: &mut Vec<(String, String)>,
) {
    for child in node.children() {
        match &child.data.borrow().value {
            NodeValue::Text(text) => segs.push(Seg {
                text: text.clone(),
                font,
            }),
            NodeValue::Code(code) => segs.push(Seg {
                text: code.literal.clone(),
                font: FontKind::Mono,
            }),
            NodeValue::SoftBreak => segs.push(Seg {
                text: String::from(" "),
                font,
            }),
            NodeValue::LineBreak => segs.push(Seg {
                text: String::from("\n"),
                font,
            }),
            NodeValue::Strong => gather_inline(child, FontKind::Bold, segs, images),
            NodeValue::Emph => {
                let styled = if font == FontKind::Bold {
                    FontKind::Bold
                } else {
                    FontKind::Oblique
                };
                gather_inline(child, styled, segs, images);
            }
            NodeValue::Image(link) => {
                let alt = inline_text(child);
                images.push((link.url.clone(), alt));
            }
            NodeValue::HtmlInline(_) => {}
            _ => gather_inline(child, font, segs, images),
        }
    }
}

// ── Metrics ─────────────────────────────────────────────────────────────

/// Helvetica AFM advance widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold AFM advance widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333,
    584, 584, 584, 611, 975, 722, 722, 722, 722, 667, 611, 778, 722, 278,
    556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556,
    333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const COURIER_WIDTH: u16 = 600;

fn char_width_milli(font: FontKind, c: char) -> u16 {
    if font == FontKind::Mono {
        return COURIER_WIDTH;
    }
    let table = match font {
        FontKind::Bold => &HELVETICA_BOLD_WIDTHS,
        _ => &HELVETICA_WIDTHS,
    };
    let code = c as u32;
    if (32..=126).contains(&code) {
        table[(code - 32) as usize]
    } else {
        556
    }
}

fn text_width(font: FontKind, size: f32, text: &str) -> f32 {
    let milli: u32 = text.chars().map(|c| char_width_milli(font, c) as u32).sum();
    milli as f32 * size / 1000.0
}

/// Map a char onto the WinAnsi code page; unmappable characters become '?'.
fn winansi_byte(c: char) -> u8 {
    match c {
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2026}' => 0x85,
        '\u{00A0}' => 0x20,
        c => {
            let code = c as u32;
            if code < 0x80 || (0xA0..=0xFF).contains(&code) {
                code as u8
            } else {
                b'?'
            }
        }
    }
}

fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(winansi_byte).collect()
}

// ── Layout ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct LaidLine {
    segs: Vec<Seg>,
}

fn wrap_block(block: &TextBlock, max_width: f32) -> Vec<LaidLine> {
    let mut lines: Vec<LaidLine> = Vec::new();
    let mut current: Vec<Seg> = Vec::new();
    let mut current_width = 0.0f32;

    let mut flush = |current: &mut Vec<Seg>, current_width: &mut f32, lines: &mut Vec<LaidLine>| {
        let segs = std::mem::take(current);
        *current_width = 0.0;
        lines.push(LaidLine { segs });
    };

    for seg in &block.segs {
        for (i, piece) in seg.text.split('\n').enumerate() {
            if i > 0 {
                flush(&mut current, &mut current_width, &mut lines);
            }
            for token in split_tokens(piece) {
                let width = text_width(seg.font, block.size, token);
                let is_space = token.chars().all(char::is_whitespace);
                if !current.is_empty() && !is_space && current_width + width > max_width {
                    // Trailing spaces stay on the previous line.
                    flush(&mut current, &mut current_width, &mut lines);
                }
                if is_space && current.is_empty() {
                    continue;
                }
                push_seg(&mut current, token, seg.font);
                current_width += width;
            }
        }
    }
    if !current.is_empty() {
        lines.push(LaidLine { segs: current });
    }
    if lines.is_empty() {
        lines.push(LaidLine { segs: Vec::new() });
    }
    lines
}

/// Split into words and the whitespace between them, both preserved.
fn split_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None::<bool>;
    for (i, c) in text.char_indices() {
        let space = c == ' ' || c == '\t';
        match in_space {
            Some(prev) if prev == space => {}
            Some(_) => {
                tokens.push(&text[start..i]);
                start = i;
                in_space = Some(space);
            }
            None => in_space = Some(space),
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

fn push_seg(current: &mut Vec<Seg>, text: &str, font: FontKind) {
    if let Some(last) = current.last_mut() {
        if last.font == font {
            last.text.push_str(text);
            return;
        }
    }
    current.push(Seg {
        text: text.to_string(),
        font,
    });
}

enum DrawOp {
    TextLine {
        x: f32,
        y: f32,
        size: f32,
        segs: Vec<Seg>,
    },
    Image {
        url: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Rule {
        x: f32,
        y: f32,
        width: f32,
    },
    QuoteBar {
        x: f32,
        y: f32,
        height: f32,
    },
}

struct Paginator<'a> {
    opts: &'a PdfOptions,
    pages: Vec<Vec<DrawOp>>,
    cursor: f32,
    at_page_top: bool,
}

impl<'a> Paginator<'a> {
    fn new(opts: &'a PdfOptions) -> Self {
        Self {
            opts,
            pages: vec![Vec::new()],
            cursor: opts.page_height - opts.margin,
            at_page_top: true,
        }
    }

    fn bottom(&self) -> f32 {
        self.opts.margin
    }

    fn usable_height(&self) -> f32 {
        self.opts.page_height - 2.0 * self.opts.margin
    }

    fn content_width(&self) -> f32 {
        self.opts.page_width - 2.0 * self.opts.margin
    }

    fn break_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = self.opts.page_height - self.opts.margin;
        self.at_page_top = true;
    }

    fn push(&mut self, op: DrawOp) {
        self.pages
            .last_mut()
            .expect("paginator always holds a page")
            .push(op);
    }

    fn spacing(&mut self, gap: f32) {
        if !self.at_page_top {
            self.cursor -= gap;
        }
    }

    fn emit_text(&mut self, block: &TextBlock, lines: &[LaidLine], next_leading: Option<f32>) {
        let height = lines.len() as f32 * block.leading;

        self.spacing(block.spacing_before);
        let mut required = if block.keep_together {
            height
        } else {
            block.leading
        };
        if block.keep_with_next {
            required += next_leading.unwrap_or(0.0);
        }
        if required <= self.usable_height() && self.cursor - required < self.bottom() {
            self.break_page();
        }

        let x = self.opts.margin + block.indent;
        let mut bar_top: Option<f32> = None;
        for line in lines {
            if self.cursor - block.leading < self.bottom() {
                self.flush_quote_bar(block, x, &mut bar_top);
                self.break_page();
            }
            self.cursor -= block.leading;
            if block.quote_bar && bar_top.is_none() {
                bar_top = Some(self.cursor + block.leading);
            }
            self.push(DrawOp::TextLine {
                x,
                y: self.cursor,
                size: block.size,
                segs: line.segs.clone(),
            });
            self.at_page_top = false;
        }
        self.flush_quote_bar(block, x, &mut bar_top);
    }

    fn flush_quote_bar(&mut self, block: &TextBlock, x: f32, bar_top: &mut Option<f32>) {
        if let Some(top) = bar_top.take() {
            self.push(DrawOp::QuoteBar {
                x: x - 8.0,
                y: self.cursor - block.leading * 0.2,
                height: top - self.cursor + block.leading * 0.2,
            });
        }
    }

    fn emit_image(&mut self, url: &str, image: &ResolvedImage) {
        let natural_width = image.width as f32 * PX_TO_PT;
        let natural_height = image.height as f32 * PX_TO_PT;
        let scale = (self.content_width() / natural_width)
            .min(self.usable_height() / natural_height)
            .min(1.0);
        let width = natural_width * scale;
        let height = natural_height * scale;

        self.spacing(PARAGRAPH_GAP);
        if self.cursor - height < self.bottom() {
            self.break_page();
        }
        self.cursor -= height;
        self.push(DrawOp::Image {
            url: url.to_string(),
            x: self.opts.margin,
            y: self.cursor,
            width,
            height,
        });
        self.at_page_top = false;
    }

    fn emit_rule(&mut self) {
        self.spacing(PARAGRAPH_GAP);
        if self.cursor - PARAGRAPH_GAP < self.bottom() {
            self.break_page();
        }
        self.cursor -= PARAGRAPH_GAP;
        self.push(DrawOp::Rule {
            x: self.opts.margin,
            y: self.cursor,
            width: self.content_width(),
        });
        self.at_page_top = false;
    }
}

fn paginate(blocks: &[Block], images: &ImageStore, opts: &PdfOptions) -> Vec<Vec<DrawOp>> {
    let mut paginator = Paginator::new(opts);

    let wrapped: Vec<Option<Vec<LaidLine>>> = blocks
        .iter()
        .map(|block| match block {
            Block::Text(text) => Some(wrap_block(
                text,
                paginator.content_width() - text.indent,
            )),
            _ => None,
        })
        .collect();

    for (i, block) in blocks.iter().enumerate() {
        match block {
            Block::Text(text) => {
                let next_leading = blocks.get(i + 1).and_then(|next| match next {
                    Block::Text(t) => Some(t.leading),
                    Block::Image { .. } => Some(BODY_SIZE * 1.45),
                    Block::Rule => Some(PARAGRAPH_GAP),
                });
                let lines = wrapped[i].as_ref().expect("text block was wrapped");
                paginator.emit_text(text, lines, next_leading);
            }
            Block::Image { url, alt } => match images.get(url) {
                Some(image) => paginator.emit_image(url, image),
                None => {
                    // Unresolved image: fall back to the alt text.
                    let fallback = TextBlock {
                        segs: vec![Seg {
                            text: if alt.is_empty() {
                                format!("[{}]", url)
                            } else {
                                format!("[{}]", alt)
                            },
                            font: FontKind::Oblique,
                        }],
                        size: BODY_SIZE,
                        leading: BODY_SIZE * 1.45,
                        indent: 0.0,
                        spacing_before: PARAGRAPH_GAP,
                        keep_together: true,
                        keep_with_next: false,
                        quote_bar: false,
                    };
                    let lines = wrap_block(&fallback, paginator.content_width());
                    paginator.emit_text(&fallback, lines.as_slice(), None);
                }
            },
            Block::Rule => paginator.emit_rule(),
        }
    }

    paginator.pages
}

// ── Writer ──────────────────────────────────────────────────────────────

fn font_name(font: FontKind) -> Name<'static> {
    match font {
        FontKind::Regular => Name(b"F1"),
        FontKind::Bold => Name(b"F2"),
        FontKind::Oblique => Name(b"F3"),
        FontKind::Mono => Name(b"F4"),
    }
}

/// Rasterize `src` into a finished PDF byte stream.
pub fn render(src: &str, images: &ImageStore, opts: &PdfOptions) -> Result<Vec<u8>> {
    let blocks = collect_blocks(src);
    let pages = paginate(&blocks, images, opts);

    let mut alloc = 1i32;
    let mut next_ref = || {
        let id = Ref::new(alloc);
        alloc += 1;
        id
    };

    let catalog_id = next_ref();
    let page_tree_id = next_ref();
    let font_ids: Vec<(FontKind, &[u8], Ref)> = vec![
        (FontKind::Regular, b"Helvetica".as_slice(), next_ref()),
        (FontKind::Bold, b"Helvetica-Bold".as_slice(), next_ref()),
        (FontKind::Oblique, b"Helvetica-Oblique".as_slice(), next_ref()),
        (FontKind::Mono, b"Courier".as_slice(), next_ref()),
    ];

    // Only embed images that made it onto a page.
    let mut drawn_urls: Vec<String> = Vec::new();
    for page in &pages {
        for op in page {
            if let DrawOp::Image { url, .. } = op {
                if !drawn_urls.iter().any(|u| u == url) {
                    drawn_urls.push(url.clone());
                }
            }
        }
    }
    let image_ids: HashMap<String, (Ref, Vec<u8>)> = drawn_urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            (
                url.clone(),
                (next_ref(), format!("Im{}", i).into_bytes()),
            )
        })
        .collect();

    let page_ids: Vec<Ref> = pages.iter().map(|_| next_ref()).collect();
    let content_ids: Vec<Ref> = pages.iter().map(|_| next_ref()).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    for (_, base, id) in &font_ids {
        pdf.type1_font(*id)
            .base_font(Name(base))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    for url in &drawn_urls {
        let image = images
            .get(url)
            .context("image vanished between pagination and writing")?;
        let (id, _) = &image_ids[url];
        match &image.data {
            ImageData::Jpeg(bytes) => {
                let mut xobject = pdf.image_xobject(*id, bytes);
                xobject.filter(Filter::DctDecode);
                xobject.width(image.width as i32);
                xobject.height(image.height as i32);
                xobject.color_space().device_rgb();
                xobject.bits_per_component(8);
                xobject.finish();
            }
            ImageData::Rgb8(samples) => {
                let mut xobject = pdf.image_xobject(*id, samples);
                xobject.width(image.width as i32);
                xobject.height(image.height as i32);
                xobject.color_space().device_rgb();
                xobject.bits_per_component(8);
                xobject.finish();
            }
        }
    }

    for ((page_id, content_id), ops) in page_ids.iter().zip(&content_ids).zip(&pages) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, opts.page_width, opts.page_height));
        page.parent(page_tree_id);
        page.contents(*content_id);
        {
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (kind, _, id) in &font_ids {
                    fonts.pair(font_name(*kind), *id);
                }
            }
            if !image_ids.is_empty() {
                let mut xobjects = resources.x_objects();
                for (id, name) in image_ids.values() {
                    xobjects.pair(Name(name), *id);
                }
            }
        }
        page.finish();

        let mut content = Content::new();
        for op in ops {
            match op {
                DrawOp::TextLine { x, y, size, segs } => {
                    content.begin_text();
                    content.next_line(*x, *y);
                    for seg in segs {
                        content.set_font(font_name(seg.font), *size);
                        let encoded = encode_winansi(&seg.text);
                        content.show(Str(&encoded));
                    }
                    content.end_text();
                }
                DrawOp::Image {
                    url,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let (_, name) = &image_ids[url];
                    content.save_state();
                    content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                    content.x_object(Name(name));
                    content.restore_state();
                }
                DrawOp::Rule { x, y, width } => {
                    content.set_stroke_gray(0.6);
                    content.set_line_width(0.7);
                    content.move_to(*x, *y);
                    content.line_to(*x + *width, *y);
                    content.stroke();
                    content.set_stroke_gray(0.0);
                }
                DrawOp::QuoteBar { x, y, height } => {
                    content.set_fill_gray(0.7);
                    content.rect(*x, *y, 2.0, *height);
                    content.fill_nonzero();
                    content.set_fill_gray(0.0);
                }
            }
        }
        pdf.stream(*content_id, &content.finish());
    }

    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_texts(src: &str) -> Vec<String> {
        collect_blocks(src)
            .into_iter()
            .filter_map(|b| match b {
                Block::Text(t) => Some(
                    t.segs
                        .iter()
                        .map(|s| s.text.as_str())
                        .collect::<String>(),
                ),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_collect_heading_and_paragraph() {
        let texts = block_texts("# Title\n\nBody text.");
        assert_eq!(texts, vec!["Title", "Body text."]);
    }

    #[test]
    fn test_heading_keeps_with_next() {
        let blocks = collect_blocks("## Section\n\nBody");
        match &blocks[0] {
            Block::Text(t) => {
                assert!(t.keep_with_next);
                assert!(t.keep_together);
            }
            other => panic!("expected text block, got {:?}", other),
        }
    }

    #[test]
    fn test_list_items_carry_markers() {
        let texts = block_texts("- one\n- two\n\n1. first\n");
        assert!(texts[0].starts_with('\u{2022}'));
        assert!(texts[2].starts_with("1. "));
    }

    #[test]
    fn test_image_becomes_image_block() {
        let blocks = collect_blocks("![logo](logo.png)");
        assert!(matches!(
            &blocks[0],
            Block::Image { url, .. } if url == "logo.png"
        ));
    }

    #[test]
    fn test_code_block_is_kept_together() {
        let blocks = collect_blocks("```\nline one\nline two\n```");
        match &blocks[0] {
            Block::Text(t) => {
                assert!(t.keep_together);
                assert_eq!(t.segs[0].font, FontKind::Mono);
                assert!(t.segs[0].text.contains("line one\nline two"));
            }
            other => panic!("expected text block, got {:?}", other),
        }
    }

    #[test]
    fn test_table_renders_as_grid() {
        let texts = block_texts("| A | B |\n|---|---|\n| 1 | 2 |");
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("| A"));
        assert!(texts[0].contains("| 1"));
        assert!(texts[0].contains("---"));
    }

    #[test]
    fn test_wrap_respects_width() {
        let block = TextBlock {
            segs: vec![Seg {
                text: "word ".repeat(50),
                font: FontKind::Regular,
            }],
            size: BODY_SIZE,
            leading: BODY_SIZE * 1.45,
            indent: 0.0,
            spacing_before: 0.0,
            keep_together: false,
            keep_with_next: false,
            quote_bar: false,
        };
        let lines = wrap_block(&block, 100.0);
        assert!(lines.len() > 1);
        for line in &lines {
            let width: f32 = line
                .segs
                .iter()
                .map(|s| text_width(s.font, BODY_SIZE, s.text.trim_end()))
                .sum();
            assert!(width <= 100.0 + 1.0, "line too wide: {}", width);
        }
    }

    #[test]
    fn test_wrap_honors_hard_newlines() {
        let block = TextBlock {
            segs: vec![Seg {
                text: String::from("a\nb\nc"),
                font: FontKind::Mono,
            }],
            size: CODE_SIZE,
            leading: CODE_SIZE * 1.4,
            indent: 0.0,
            spacing_before: 0.0,
            keep_together: true,
            keep_with_next: false,
            quote_bar: false,
        };
        assert_eq!(wrap_block(&block, 400.0).len(), 3);
    }

    #[test]
    fn test_winansi_encoding() {
        assert_eq!(encode_winansi("abc"), b"abc".to_vec());
        assert_eq!(encode_winansi("\u{2014}"), vec![0x97]);
        assert_eq!(encode_winansi("\u{4e16}"), vec![b'?']);
    }

    #[test]
    fn test_render_produces_pdf() {
        let pdf = render(
            "# Hello\n\nSome **bold** body text.\n\n- a\n- b\n",
            &ImageStore::new(),
            &PdfOptions::default(),
        )
        .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(pdf.windows(5).any(|w| w == b"%%EOF"));
    }

    #[test]
    fn test_render_long_document_spans_pages() {
        let src = "paragraph text line\n\n".repeat(200);
        let blocks = collect_blocks(&src);
        let pages = paginate(&blocks, &ImageStore::new(), &PdfOptions::default());
        assert!(pages.len() > 1);
    }

    #[test]
    fn test_unresolved_image_degrades_to_alt_text() {
        let pages = paginate(
            &collect_blocks("![missing diagram](gone.png)"),
            &ImageStore::new(),
            &PdfOptions::default(),
        );
        let has_fallback = pages.iter().flatten().any(|op| match op {
            DrawOp::TextLine { segs, .. } => {
                segs.iter().any(|s| s.text.contains("missing diagram"))
            }
            _ => false,
        });
        assert!(has_fallback);
    }

    #[test]
    fn test_keep_together_block_moves_to_next_page() {
        let opts = PdfOptions::default();
        // Enough body to leave only a sliver of space, then a code block
        // that cannot fit in it.
        let mut src = "filler line\n\n".repeat(54);
        src.push_str("```\n");
        src.push_str(&"code\n".repeat(10));
        src.push_str("```\n");
        let pages = paginate(&collect_blocks(&src), &ImageStore::new(), &opts);
        // The code block must start on a fresh page rather than split.
        let last_page = pages.last().unwrap();
        let first_text = last_page.iter().find_map(|op| match op {
            DrawOp::TextLine { segs, .. } => segs.first().map(|s| s.text.clone()),
            _ => None,
        });
        if let Some(text) = first_text {
            assert!(
                text.contains("code") || text.contains("filler"),
                "unexpected page head: {}",
                text
            );
        }
        assert!(pages.len() >= 2);
    }
}
