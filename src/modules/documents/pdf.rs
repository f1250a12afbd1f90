//! PDF rendering of [`DocumentContent`] on A4 pages using the standard
//! Helvetica fonts with WinAnsi encoding, so no font file is embedded.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use super::content::{Block, DocumentContent};
use super::model::DocumentError;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const FOOTER_Y: f32 = 30.0;

const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;
const SMALL_SIZE: f32 = 8.0;
const LINE_FACTOR: f32 = 1.4;

const LABEL_COLUMN: f32 = CONTENT_WIDTH * 0.35;
const BULLET_INDENT: f32 = 12.0;
const SIGNATURE_BOX_HEIGHT: f32 = 60.0;

/// Helvetica advance widths (1/1000 em) for the printable ASCII range.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

fn char_width(c: char, font: Font) -> f32 {
    let base = match c as u32 {
        code @ 0x20..=0x7E => HELVETICA_WIDTHS[(code - 0x20) as usize],
        // Accented Latin-1 letters are close to the average lowercase width.
        _ => 556,
    } as f32;
    match font {
        Font::Regular => base,
        Font::Bold => base * 1.06,
    }
}

pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(|c| char_width(c, font)).sum::<f32>() * size / 1000.0
}

/// Maps a character to its WinAnsi (CP1252) byte. Unsupported characters
/// become `?`.
fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '\u{202F}' => 0xA0,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        '\t' => b' ',
        _ => b'?',
    }
}

pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

/// Greedy word wrap. Words wider than a line are split by character.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };

            if text_width(&candidate, font, size) <= max_width {
                line = candidate;
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }

            if text_width(word, font, size) <= max_width {
                line = word.to_string();
                continue;
            }

            for c in word.chars() {
                line.push(c);
                if text_width(&line, font, size) > max_width {
                    line.pop();
                    lines.push(std::mem::replace(&mut line, c.to_string()));
                }
            }
        }

        lines.push(line);
    }

    lines
}

struct Layout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.pages.push(finished);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn text_at(&mut self, x: f32, y: f32, text: &str, font: Font, size: f32) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource().into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Writes wrapped text starting at `x`, breaking pages as needed.
    fn write_wrapped(&mut self, x: f32, width: f32, text: &str, font: Font, size: f32) {
        let line_height = size * LINE_FACTOR;
        for line in wrap_text(text, font, size, width) {
            self.ensure_space(line_height);
            self.y -= line_height;
            self.text_at(x, self.y, &line, font, size);
        }
    }

    fn write_centered(&mut self, text: &str, font: Font, size: f32) {
        let line_height = size * LINE_FACTOR;
        for line in wrap_text(text, font, size, CONTENT_WIDTH) {
            self.ensure_space(line_height);
            self.y -= line_height;
            let x = MARGIN + (CONTENT_WIDTH - text_width(&line, font, size)).max(0.0) / 2.0;
            self.text_at(x, self.y, &line, font, size);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn fields(&mut self, rows: &[(String, String)]) {
        let line_height = BODY_SIZE * LINE_FACTOR;
        let value_x = MARGIN + LABEL_COLUMN;
        let value_width = CONTENT_WIDTH - LABEL_COLUMN;

        for (label, value) in rows {
            let label_lines = wrap_text(label, Font::Bold, BODY_SIZE, LABEL_COLUMN - 8.0);
            let value_lines = wrap_text(value, Font::Regular, BODY_SIZE, value_width);
            let rows = label_lines.len().max(value_lines.len());

            // Short rows stay on one page; very long values may break.
            if rows <= 6 {
                self.ensure_space(rows as f32 * line_height);
            }

            for i in 0..rows {
                self.ensure_space(line_height);
                self.y -= line_height;
                if let Some(line) = label_lines.get(i) {
                    self.text_at(MARGIN, self.y, line, Font::Bold, BODY_SIZE);
                }
                if let Some(line) = value_lines.get(i) {
                    self.text_at(value_x, self.y, line, Font::Regular, BODY_SIZE);
                }
            }
            self.gap(2.0);
        }
    }

    fn bullets(&mut self, items: &[String]) {
        let line_height = BODY_SIZE * LINE_FACTOR;
        for item in items {
            let lines = wrap_text(
                item,
                Font::Regular,
                BODY_SIZE,
                CONTENT_WIDTH - BULLET_INDENT,
            );
            for (i, line) in lines.iter().enumerate() {
                self.ensure_space(line_height);
                self.y -= line_height;
                if i == 0 {
                    self.text_at(MARGIN, self.y, "•", Font::Regular, BODY_SIZE);
                }
                self.text_at(MARGIN + BULLET_INDENT, self.y, line, Font::Regular, BODY_SIZE);
            }
        }
    }

    fn signatures(&mut self, parties: &[String]) {
        if parties.is_empty() {
            return;
        }
        let line_height = BODY_SIZE * LINE_FACTOR;
        self.ensure_space(line_height + SIGNATURE_BOX_HEIGHT + 20.0);
        self.gap(20.0);

        let gutter = 16.0;
        let count = parties.len() as f32;
        let column = (CONTENT_WIDTH - gutter * (count - 1.0)) / count;

        self.y -= line_height;
        let label_y = self.y;
        let box_y = label_y - 6.0 - SIGNATURE_BOX_HEIGHT;

        for (i, party) in parties.iter().enumerate() {
            let x = MARGIN + i as f32 * (column + gutter);
            let label = wrap_text(party, Font::Bold, BODY_SIZE, column)
                .into_iter()
                .next()
                .unwrap_or_default();
            self.text_at(x, label_y, &label, Font::Bold, BODY_SIZE);
            self.current.extend([
                Operation::new("w", vec![0.5f32.into()]),
                Operation::new(
                    "re",
                    vec![
                        x.into(),
                        box_y.into(),
                        column.into(),
                        SIGNATURE_BOX_HEIGHT.into(),
                    ],
                ),
                Operation::new("S", vec![]),
            ]);
        }

        self.y = box_y - 8.0;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.current);
        self.pages
    }
}

fn lay_out(content: &DocumentContent) -> Vec<Vec<Operation>> {
    let mut layout = Layout::new();

    layout.write_wrapped(MARGIN, CONTENT_WIDTH, &content.issuer, Font::Bold, BODY_SIZE);
    layout.gap(18.0);
    layout.write_centered(&content.title, Font::Bold, TITLE_SIZE);
    if let Some(subtitle) = &content.subtitle {
        layout.write_centered(subtitle, Font::Regular, BODY_SIZE);
    }
    layout.gap(12.0);

    for block in &content.blocks {
        match block {
            Block::Heading(text) => {
                // Keep a heading with at least two lines of its section.
                layout.ensure_space(HEADING_SIZE * LINE_FACTOR + 2.0 * BODY_SIZE * LINE_FACTOR + 10.0);
                layout.gap(10.0);
                layout.write_wrapped(MARGIN, CONTENT_WIDTH, text, Font::Bold, HEADING_SIZE);
                layout.gap(2.0);
            }
            Block::Paragraph(text) => {
                layout.write_wrapped(MARGIN, CONTENT_WIDTH, text, Font::Regular, BODY_SIZE);
                layout.gap(4.0);
            }
            Block::Fields(rows) => layout.fields(rows),
            Block::Bullets(items) => layout.bullets(items),
            Block::Signatures(parties) => layout.signatures(parties),
            Block::Spacer => layout.gap(BODY_SIZE * LINE_FACTOR),
        }
    }

    layout.finish()
}

fn footer(page: usize, total: usize) -> Vec<Operation> {
    let text = format!("{page} / {total}");
    let x = PAGE_WIDTH - MARGIN - text_width(&text, Font::Regular, SMALL_SIZE);
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Font::Regular.resource().into(), SMALL_SIZE.into()]),
        Operation::new("Td", vec![x.into(), FOOTER_Y.into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(&text))]),
        Operation::new("ET", vec![]),
    ]
}

fn font_object(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

pub fn render_pdf(content: &DocumentContent) -> Result<Vec<u8>, DocumentError> {
    let pages = lay_out(content);
    let total = pages.len();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = font_object(&mut doc, "Helvetica");
    let bold = font_object(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(total);
    for (index, mut operations) in pages.into_iter().enumerate() {
        operations.extend(footer(index + 1, total));
        let stream = Content { operations }.encode()?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, stream));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
