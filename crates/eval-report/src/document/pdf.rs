//! A small page-oriented drawing surface over `lopdf`.
//!
//! [`PdfCanvas`] mimics a classic canvas API: set a font size and fill
//! colour, draw strings and images at absolute coordinates (origin bottom
//! left, points), and call [`PdfCanvas::show_page`] to start a new page.
//! Text uses the standard Helvetica font with WinAnsi encoding, so no font
//! file is embedded. Every string drawn is also kept in a per-page text log,
//! which callers use to inspect what a document contains.

use crate::error::{ReportError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::path::Path;

/// US Letter, in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

const FONT_NAME: &str = "F1";
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

/// Encode text for a WinAnsi simple font.
///
/// Latin-1 characters map to themselves, typographic punctuation to its
/// WinAnsi slot, Romanian letters outside WinAnsi to their base letter, and
/// anything else to `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => b' ',
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            'Š' => 0x8a,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            'š' => 0x9a,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            'ă' => b'a',
            'Ă' => b'A',
            'ș' | 'ş' => b's',
            'Ș' | 'Ş' => b'S',
            'ț' | 'ţ' => b't',
            'Ț' | 'Ţ' => b'T',
            _ => b'?',
        })
        .collect()
}

/// Page-at-a-time PDF writer.
pub struct PdfCanvas {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    operations: Vec<Operation>,
    xobjects: Dictionary,
    image_count: usize,
    font_size: f32,
    fill: (f32, f32, f32),
    page_text: Vec<String>,
    finished_text: Vec<Vec<String>>,
}

impl PdfCanvas {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        Self {
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
            operations: Vec::new(),
            xobjects: Dictionary::new(),
            image_count: 0,
            font_size: 12.0,
            fill: BLACK,
            page_text: Vec::new(),
            finished_text: Vec::new(),
        }
    }

    pub fn set_font_size(&mut self, size: f32) {
        self.font_size = size;
    }

    /// Fill colour for subsequent text, components in `0.0..=1.0`.
    pub fn set_fill_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.fill = (r, g, b);
        self.operations
            .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
    }

    pub fn reset_fill(&mut self) {
        self.set_fill_rgb(BLACK.0, BLACK.1, BLACK.2);
    }

    /// Draw one line of text with its baseline starting at `(x, y)`.
    pub fn draw_string(&mut self, x: f32, y: f32, text: &str) {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![FONT_NAME.into(), self.font_size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        self.page_text.push(text.to_string());
    }

    /// Place a raster image with its lower-left corner at `(x, y)`, scaled to
    /// `width` x `height` points.
    pub fn draw_image(&mut self, path: &Path, x: f32, y: f32, width: f32, height: f32) -> Result<()> {
        let img = image::open(path)?.to_rgb8();
        let (pixel_width, pixel_height) = img.dimensions();

        let image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => pixel_width as i64,
            "Height" => pixel_height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        let image_id = self
            .doc
            .add_object(Stream::new(image_dict, img.into_raw()));

        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.xobjects.set(name.as_bytes().to_vec(), image_id);

        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    /// Close the current page and start a new one. Font size and fill colour
    /// carry over.
    pub fn show_page(&mut self) -> Result<()> {
        let content = Content {
            operations: std::mem::take(&mut self.operations),
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let resources = dictionary! {
            "Font" => dictionary! { FONT_NAME => self.font_id },
            "XObject" => std::mem::take(&mut self.xobjects),
        };
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        self.finished_text.push(std::mem::take(&mut self.page_text));

        if self.fill != BLACK {
            let (r, g, b) = self.fill;
            self.operations
                .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        }
        Ok(())
    }

    /// Pages closed so far, plus the open one.
    pub fn page_count(&self) -> usize {
        self.page_ids.len() + 1
    }

    /// Close the open page, write the document and return the text drawn on
    /// each page.
    pub fn save(mut self, path: &Path, title: &str) -> Result<Vec<Vec<String>>> {
        self.show_page()?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
            "Producer" => Object::string_literal("eval-report"),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        self.doc
            .save(path)
            .map_err(|e| ReportError::Compose(format!("{}: {}", path.display(), e)))?;
        Ok(self.finished_text)
    }
}

impl Default for PdfCanvas {
    fn default() -> Self {
        Self::new()
    }
}
