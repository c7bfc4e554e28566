use std::{fs::File, io::BufReader, path::Path};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};

use crate::{constants::SHOPPING_LIST_TITLE, error::Error};

const LAYER_NAME: &str = "Layer 1";

/// WinAnsiEncoding characters outside Latin-1. The builtin fonts cannot draw anything else.
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

/// Page geometry in millimetres. Defaults to A4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub line_height: f32,
    pub font_size: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 20.0,
            line_height: 7.0,
            font_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Baseline, measured from the bottom of the page.
    pub y: f32,
}

/// Lays lines out top to bottom.
/// A new page starts once the next baseline would fall below the bottom margin.
pub fn layout_pages(lines: &[String], layout: &PageLayout) -> Vec<Vec<PlacedLine>> {
    let top = layout.height - layout.margin;
    let mut pages = Vec::new();
    let mut page = Vec::new();
    let mut y = top;

    for line in lines {
        if y < layout.margin {
            pages.push(std::mem::take(&mut page));
            y = top;
        }
        page.push(PlacedLine {
            text: line.to_owned(),
            y,
        });
        y -= layout.line_height;
    }

    if !page.is_empty() {
        pages.push(page);
    }

    pages
}

pub fn render_pdf(
    lines: &[String],
    font_path: Option<&Path>,
    layout: &PageLayout,
) -> Result<Vec<u8>, Error> {
    if font_path.is_none() {
        if let Some(line) = lines.iter().find(|line| !line.chars().all(is_win_ansi)) {
            return Err(Error::Export(format!(
                "{line:?} needs a TTF font, set PDF_FONT_PATH"
            )));
        }
    }

    let pages = layout_pages(lines, layout);

    let (doc, page, layer) = PdfDocument::new(
        SHOPPING_LIST_TITLE,
        Mm(layout.width),
        Mm(layout.height),
        LAYER_NAME,
    );
    let font = load_font(&doc, font_path)?;

    let mut current = doc.get_page(page).get_layer(layer);
    for (i, placed) in pages.iter().enumerate() {
        if i > 0 {
            let (page, layer) = doc.add_page(Mm(layout.width), Mm(layout.height), LAYER_NAME);
            current = doc.get_page(page).get_layer(layer);
        }
        for line in placed {
            current.use_text(
                line.text.as_str(),
                layout.font_size,
                Mm(layout.margin),
                Mm(line.y),
                &font,
            );
        }
    }

    doc.save_to_bytes()
        .map_err(|e| Error::Export(format!("Failed to write PDF: {e}")))
}

fn load_font(doc: &PdfDocumentReference, path: Option<&Path>) -> Result<IndirectFontRef, Error> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                Error::Export(format!("Failed to open font {}: {e}", path.display()))
            })?;
            doc.add_external_font(BufReader::new(file))
                .map_err(|e| Error::Export(format!("Failed to load font: {e}")))
        }
        None => doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::Export(format!("Failed to load font: {e}"))),
    }
}

fn is_win_ansi(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}') || WIN_ANSI_EXTRAS.contains(c)
}
