use std::{path::PathBuf, str::FromStr};

use serde_json::Value;

use crate::{
    constants::SHOPPING_LIST_PDF_FILENAME,
    error::{Error, TypeError},
    schema::ShoppingListItem,
};

pub mod pdf;
pub mod text;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Pdf,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn filename(self, username: &str) -> String {
        match self {
            ExportFormat::Text => format!("{username}_shopping_list.txt"),
            ExportFormat::Pdf => SHOPPING_LIST_PDF_FILENAME.to_owned(),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            _ => Err(TypeError::new("Unknown export format")),
        }
    }
}

impl TryFrom<Value> for ExportFormat {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => value.parse(),
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// TTF font used for PDFs. Builtin Helvetica when unset, which only covers Latin text.
    pub pdf_font_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Renders an aggregated shopping list. An empty list is never rendered.
pub fn render(
    items: &[ShoppingListItem],
    username: &str,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<ExportedDocument, Error> {
    if items.is_empty() {
        return Err(Error::EmptyShoppingCart);
    }

    let bytes = match format {
        ExportFormat::Text => text::render_text(items, Some(username)).into_bytes(),
        ExportFormat::Pdf => {
            let lines = text::document_lines(items, Some(username));
            pdf::render_pdf(
                &lines,
                options.pdf_font_path.as_deref(),
                &pdf::PageLayout::default(),
            )?
        }
    };

    log::trace!(
        "> Rendered {} shopping list items for {username} as {format:?}",
        items.len()
    );

    Ok(ExportedDocument {
        filename: format.filename(username),
        content_type: format.content_type(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<ShoppingListItem> {
        vec![ShoppingListItem {
            name: String::from("flour"),
            measurement_unit: String::from("g"),
            total_amount: 300,
        }]
    }

    #[test]
    fn empty_list_is_rejected() {
        for format in [ExportFormat::Text, ExportFormat::Pdf] {
            assert!(matches!(
                render(&[], "cook", format, &ExportOptions::default()),
                Err(Error::EmptyShoppingCart)
            ));
        }
    }

    #[test]
    fn text_document() {
        let document =
            render(&items(), "cook", ExportFormat::Text, &ExportOptions::default()).unwrap();
        assert_eq!(document.filename, "cook_shopping_list.txt");
        assert!(document.content_type.starts_with("text/plain"));
        assert!(String::from_utf8(document.bytes)
            .unwrap()
            .contains("flour (g) \u{2014} 300"));
    }

    #[test]
    fn pdf_document() {
        let document =
            render(&items(), "cook", ExportFormat::Pdf, &ExportOptions::default()).unwrap();
        assert_eq!(document.filename, SHOPPING_LIST_PDF_FILENAME);
        assert_eq!(document.content_type, "application/pdf");
        assert!(document.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!(
            ExportFormat::try_from(Value::String("txt".into())).unwrap(),
            ExportFormat::Text
        );
        assert!("docx".parse::<ExportFormat>().is_err());
        assert!(ExportFormat::try_from(Value::Null).is_err());
    }
}
