use crate::{constants::SHOPPING_LIST_TITLE, schema::ShoppingListItem};

const SEPARATOR: &str = "\u{2014}";

pub fn header(username: Option<&str>) -> String {
    match username {
        Some(username) => format!("{SHOPPING_LIST_TITLE} for @{username}"),
        None => SHOPPING_LIST_TITLE.to_owned(),
    }
}

pub fn item_line(item: &ShoppingListItem) -> String {
    format!(
        "{} ({}) {SEPARATOR} {}",
        item.name, item.measurement_unit, item.total_amount
    )
}

/// Header, blank line, then one line per item. Shared by every export format.
pub fn document_lines(items: &[ShoppingListItem], username: Option<&str>) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() + 2);
    lines.push(header(username));
    lines.push(String::new());
    lines.extend(items.iter().map(item_line));
    lines
}

pub fn render_text(items: &[ShoppingListItem], username: Option<&str>) -> String {
    let mut text = document_lines(items, username).join("\n");
    text.push('\n');
    text
}
