//! Grocery list engine
//!
//! Unit taxonomy, conversions, quantity formatting and ingredient aggregation.

pub mod aggregator;
pub mod checklist;
pub mod converter;
pub mod format;
pub mod units;

pub use aggregator::{
    aggregate, aggregate_with_policy, merge_count_entries, CountMergePolicy, GroceryItem,
    IngredientEntry,
};
pub use checklist::{render_markdown_checklist, render_plain_text, GroceryLine};
pub use converter::{are_compatible, choose_display_unit, from_base, to_base, BaseQuantity};
pub use format::format_quantity;
pub use units::{classify, grams_per_unit, ml_per_unit, normalize_unit, UnitKind};
