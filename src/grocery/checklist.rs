//! Grocery list rendering
//!
//! Turns aggregated items into display lines and downloadable checklists.

use serde::Serialize;

use super::aggregator::GroceryItem;
use super::format::format_quantity;
use super::units::UnitKind;

impl GroceryItem {
    /// Quantity as shown to the user ("1 1/2", "" for unspecified)
    pub fn formatted_quantity(&self) -> String {
        format_quantity(self.quantity)
    }

    /// "1 1/2 cup Flour", "2 each Eggs", "Salt"
    pub fn display_line(&self) -> String {
        let quantity = self.formatted_quantity();
        let unit = self.unit.trim();
        [quantity.as_str(), unit, self.display_name.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A grocery item with its rendered strings, as returned by tools
#[derive(Debug, Clone, Serialize)]
pub struct GroceryLine {
    pub name: String,
    pub display_name: String,
    pub quantity: f64,
    pub formatted_quantity: String,
    pub unit: String,
    pub unit_kind: UnitKind,
    pub line: String,
}

impl From<&GroceryItem> for GroceryLine {
    fn from(item: &GroceryItem) -> Self {
        Self {
            name: item.name.clone(),
            display_name: item.display_name.clone(),
            quantity: item.quantity,
            formatted_quantity: item.formatted_quantity(),
            unit: item.unit.clone(),
            unit_kind: item.unit_kind,
            line: item.display_line(),
        }
    }
}

/// One line per item
pub fn render_plain_text(items: &[GroceryItem]) -> String {
    let mut text = String::new();
    for item in items {
        text.push_str(&item.display_line());
        text.push('\n');
    }
    text
}

/// Markdown checklist suitable for download
pub fn render_markdown_checklist(
    title: &str,
    recipe_names: &[String],
    generated_at: &str,
    items: &[GroceryItem],
) -> String {
    let mut markdown = String::new();

    markdown.push_str(&format!("# {}\n\n", title));
    markdown.push_str(&format!("**Generated:** {}\n\n", generated_at));
    if !recipe_names.is_empty() {
        markdown.push_str(&format!("**Recipes:** {}\n\n", recipe_names.join(", ")));
    }
    markdown.push_str("---\n\n");

    if items.is_empty() {
        markdown.push_str("_Nothing to buy._\n");
        return markdown;
    }

    for item in items {
        markdown.push_str(&format!("- [ ] {}\n", item.display_line()));
    }
    markdown.push_str(&format!("\n*{} items*\n", items.len()));

    markdown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(display_name: &str, quantity: f64, unit: &str, unit_kind: UnitKind) -> GroceryItem {
        GroceryItem {
            name: display_name.to_lowercase(),
            display_name: display_name.to_string(),
            quantity,
            unit: unit.to_string(),
            unit_kind,
        }
    }

    #[test]
    fn test_display_line() {
        assert_eq!(item("Flour", 1.5, "cup", UnitKind::Volume).display_line(), "1 1/2 cup Flour");
        assert_eq!(item("Eggs", 4.0, "each", UnitKind::Count).display_line(), "4 each Eggs");
    }

    #[test]
    fn test_display_line_skips_empty_parts() {
        assert_eq!(item("Salt", 0.0, "", UnitKind::Other).display_line(), "Salt");
        assert_eq!(item("Salt", 0.0, "pinch", UnitKind::Other).display_line(), "pinch Salt");
        assert_eq!(item("Lemons", 2.0, "", UnitKind::Other).display_line(), "2 Lemons");
    }

    #[test]
    fn test_grocery_line_from_item() {
        let line = GroceryLine::from(&item("Milk", 0.75, "cup", UnitKind::Volume));
        assert_eq!(line.formatted_quantity, "3/4");
        assert_eq!(line.line, "3/4 cup Milk");
    }

    #[test]
    fn test_render_plain_text() {
        let text = render_plain_text(&[
            item("Flour", 2.0, "cup", UnitKind::Volume),
            item("Salt", 0.0, "", UnitKind::Other),
        ]);
        assert_eq!(text, "2 cup Flour\nSalt\n");
    }

    #[test]
    fn test_render_markdown_checklist() {
        let markdown = render_markdown_checklist(
            "Grocery List",
            &["Pancakes".to_string(), "Omelette".to_string()],
            "2026-01-13 08:30:00 UTC",
            &[item("Eggs", 6.0, "each", UnitKind::Count)],
        );

        assert!(markdown.starts_with("# Grocery List\n"));
        assert!(markdown.contains("**Recipes:** Pancakes, Omelette"));
        assert!(markdown.contains("- [ ] 6 each Eggs\n"));
        assert!(markdown.contains("*1 items*"));
    }

    #[test]
    fn test_render_markdown_checklist_empty() {
        let markdown = render_markdown_checklist("Grocery List", &[], "now", &[]);
        assert!(markdown.contains("_Nothing to buy._"));
        assert!(!markdown.contains("**Recipes:**"));
    }
}
