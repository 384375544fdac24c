//! Ingredient aggregation
//!
//! Merges the ingredient lines of several recipes into one grocery list:
//! entries are grouped by normalized name, then by unit kind, and each
//! compatible sub-group is summed through its base unit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::converter::{choose_display_unit, from_base, to_base};
use super::units::{classify, normalize_unit, UnitKind};

/// One ingredient line from a recipe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientEntry {
    pub name: String,
    /// None or 0 means an unspecified amount
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep: Option<String>,
    /// Optional ingredients still count towards totals
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl IngredientEntry {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: Some(quantity),
            unit: unit.into(),
            ..Default::default()
        }
    }
}

/// One merged line of the grocery list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    /// Lowercased, trimmed ingredient name
    pub name: String,
    pub display_name: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_kind: UnitKind,
}

impl GroceryItem {
    /// Feed an item back in as an entry, e.g. to merge two lists
    pub fn to_entry(&self) -> IngredientEntry {
        IngredientEntry::new(self.name.clone(), self.quantity, self.unit.clone())
    }
}

/// How count-kind entries with different unit strings are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMergePolicy {
    /// Sum every count entry of a name ("2 clove" + "1 each" = "3 clove")
    #[default]
    SumAcrossUnits,
    /// Only sum entries whose normalized unit strings match
    SameUnitOnly,
}

/// Aggregate with the default count-merge policy
pub fn aggregate(entries: &[IngredientEntry]) -> Vec<GroceryItem> {
    aggregate_with_policy(entries, CountMergePolicy::default())
}

/// Aggregate ingredient entries into grocery items
///
/// Items come out in first-seen name order, then first-seen unit kind
/// within a name. `other`-kind entries are never merged.
pub fn aggregate_with_policy(
    entries: &[IngredientEntry],
    policy: CountMergePolicy,
) -> Vec<GroceryItem> {
    let mut items = Vec::new();

    for group in group_by_name(entries) {
        let display_name = choose_display_name(&group.key, &group.entries);

        for (kind, members) in group_by_kind(&group.entries) {
            match kind {
                UnitKind::Other => {
                    for entry in members {
                        items.push(GroceryItem {
                            name: group.key.clone(),
                            display_name: display_name.clone(),
                            quantity: entry_quantity(entry),
                            unit: entry.unit.clone(),
                            unit_kind: kind,
                        });
                    }
                }
                UnitKind::Count => {
                    for (quantity, unit) in merge_count_entries(&members, policy) {
                        items.push(GroceryItem {
                            name: group.key.clone(),
                            display_name: display_name.clone(),
                            quantity,
                            unit,
                            unit_kind: kind,
                        });
                    }
                }
                UnitKind::Volume | UnitKind::Weight => match merge_convertible(&members) {
                    Some((quantity, unit)) => items.push(GroceryItem {
                        name: group.key.clone(),
                        display_name: display_name.clone(),
                        quantity,
                        unit,
                        unit_kind: kind,
                    }),
                    None => tracing::warn!(
                        "Dropping {} group for '{}': display unit did not convert back",
                        kind,
                        group.key
                    ),
                },
            }
        }
    }

    tracing::debug!("Aggregated {} entries into {} grocery items", entries.len(), items.len());
    items
}

// ============================================================================
// Grouping
// ============================================================================

struct NameGroup<'a> {
    key: String,
    entries: Vec<&'a IngredientEntry>,
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Group entries by normalized name, keeping first-seen order
fn group_by_name(entries: &[IngredientEntry]) -> Vec<NameGroup<'_>> {
    let mut groups: Vec<NameGroup<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let key = normalize_name(&entry.name);
        match index.get(&key) {
            Some(&i) => groups[i].entries.push(entry),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(NameGroup {
                    key,
                    entries: vec![entry],
                });
            }
        }
    }

    groups
}

/// Sub-group one name's entries by unit kind, keeping first-seen order
fn group_by_kind<'a>(entries: &[&'a IngredientEntry]) -> Vec<(UnitKind, Vec<&'a IngredientEntry>)> {
    let mut groups: Vec<(UnitKind, Vec<&'a IngredientEntry>)> = Vec::new();
    for &entry in entries {
        let kind = classify(&entry.unit);
        match groups.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, members)) => members.push(entry),
            None => groups.push((kind, vec![entry])),
        }
    }
    groups
}

/// First capitalized spelling seen, else the key with its first letter raised
fn choose_display_name(key: &str, entries: &[&IngredientEntry]) -> String {
    entries
        .iter()
        .map(|e| e.name.trim())
        .find(|name| name.chars().next().is_some_and(char::is_uppercase))
        .map(str::to_string)
        .unwrap_or_else(|| capitalize_first(key))
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Merging
// ============================================================================

/// Quantity used for summing; missing, negative and non-finite become 0
fn entry_quantity(entry: &IngredientEntry) -> f64 {
    match entry.quantity {
        Some(q) if q.is_finite() && q >= 0.0 => q,
        Some(q) => {
            tracing::warn!("Treating quantity {} for '{}' as unspecified", q, entry.name);
            0.0
        }
        None => 0.0,
    }
}

/// Combine count-kind entries into (quantity, unit) lines
///
/// This is the one place that decides whether "2 clove" and "1 head" of the
/// same ingredient may be added together; see [`CountMergePolicy`].
pub fn merge_count_entries(
    entries: &[&IngredientEntry],
    policy: CountMergePolicy,
) -> Vec<(f64, String)> {
    match policy {
        CountMergePolicy::SumAcrossUnits => {
            let total: f64 = entries.iter().map(|e| entry_quantity(e)).sum();
            let units: Vec<&str> = entries.iter().map(|e| e.unit.as_str()).collect();
            vec![(total, choose_display_unit(&units))]
        }
        CountMergePolicy::SameUnitOnly => {
            let mut lines: Vec<(f64, String)> = Vec::new();
            for entry in entries {
                let unit = normalize_unit(&entry.unit);
                let quantity = entry_quantity(entry);
                match lines.iter_mut().find(|(_, u)| *u == unit) {
                    Some((total, _)) => *total += quantity,
                    None => lines.push((quantity, unit)),
                }
            }
            lines
        }
    }
}

/// Sum volume or weight entries through their base unit
///
/// Returns the total in the most frequent unit, or None if that unit does not
/// convert back.
fn merge_convertible(entries: &[&IngredientEntry]) -> Option<(f64, String)> {
    let mut total_base = 0.0;
    let mut units: Vec<&str> = Vec::with_capacity(entries.len());

    for entry in entries {
        if let Some(base) = to_base(entry_quantity(entry), &entry.unit) {
            total_base += base.value;
            units.push(entry.unit.as_str());
        }
    }

    let display_unit = choose_display_unit(&units);
    from_base(total_base, &display_unit).map(|quantity| (quantity, display_unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grocery::units::{ML_PER_CUP, ML_PER_TBSP};

    fn entry(name: &str, quantity: f64, unit: &str) -> IngredientEntry {
        IngredientEntry::new(name, quantity, unit)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_flour_cup_and_tbsp_merge() {
        let items = aggregate(&[entry("Flour", 1.0, "cup"), entry("flour", 2.0, "tbsp")]);

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.name, "flour");
        assert_eq!(item.display_name, "Flour");
        assert_eq!(item.unit_kind, UnitKind::Volume);
        assert_eq!(item.unit, "cup");
        let expected = (ML_PER_CUP + 2.0 * ML_PER_TBSP) / ML_PER_CUP;
        assert!(approx(item.quantity, expected), "{}", item.quantity);
    }

    #[test]
    fn test_eggs_count_merge_uses_most_frequent_unit() {
        let items = aggregate(&[
            entry("Eggs", 2.0, "each"),
            entry("Eggs", 1.0, "each"),
            entry("Eggs", 1.0, "large"),
        ]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4.0);
        assert_eq!(items[0].unit, "each");
        assert_eq!(items[0].unit_kind, UnitKind::Count);
        assert_eq!(items[0].display_name, "Eggs");
    }

    #[test]
    fn test_no_cross_kind_merge() {
        let items = aggregate(&[entry("x", 1.0, "cup"), entry("x", 1.0, "each")]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_kind, UnitKind::Volume);
        assert_eq!(items[1].unit_kind, UnitKind::Count);
        assert!(items.iter().all(|i| i.name == "x"));
    }

    #[test]
    fn test_other_kind_never_merges() {
        let salt = IngredientEntry {
            name: "salt".to_string(),
            unit: "pinch".to_string(),
            ..Default::default()
        };
        let items = aggregate(&[salt.clone(), salt]);

        assert_eq!(items.len(), 2);
        for item in &items {
            assert_eq!(item.unit_kind, UnitKind::Other);
            assert_eq!(item.unit, "pinch");
            assert_eq!(item.quantity, 0.0);
        }
    }

    #[test]
    fn test_other_kind_keeps_unit_verbatim() {
        let items = aggregate(&[entry("Pepper", 1.0, "To Taste")]);
        assert_eq!(items[0].unit, "To Taste");
        assert_eq!(items[0].quantity, 1.0);
    }

    #[test]
    fn test_sum_conservation_single_unit() {
        let quantities = [0.5, 1.25, 2.0, 0.75];
        let entries: Vec<_> = quantities.iter().map(|&q| entry("milk", q, "cup")).collect();
        let items = aggregate(&entries);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit, "cup");
        assert!(approx(items[0].quantity, quantities.iter().sum()));
    }

    #[test]
    fn test_weight_merge() {
        let items = aggregate(&[
            entry("Chicken", 1.0, "lb"),
            entry("chicken", 8.0, "oz"),
            entry("chicken", 1.0, "lb"),
        ]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit, "lb");
        assert_eq!(items[0].unit_kind, UnitKind::Weight);
        let expected = 2.0 + 8.0 * 28.3495 / 453.592;
        assert!(approx(items[0].quantity, expected));
    }

    #[test]
    fn test_volume_and_weight_of_same_name_stay_apart() {
        let items = aggregate(&[
            entry("butter", 2.0, "tbsp"),
            entry("butter", 100.0, "g"),
            entry("butter", 1.0, "stick"),
        ]);

        let kinds: Vec<_> = items.iter().map(|i| i.unit_kind).collect();
        assert_eq!(kinds, vec![UnitKind::Volume, UnitKind::Weight, UnitKind::Count]);
    }

    #[test]
    fn test_missing_quantity_counts_as_zero() {
        let mut garlic = entry("garlic", 0.0, "clove");
        garlic.quantity = None;
        let items = aggregate(&[garlic, entry("garlic", 3.0, "clove")]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3.0);
    }

    #[test]
    fn test_negative_quantity_is_clamped() {
        let items = aggregate(&[entry("rice", -1.0, "cup"), entry("rice", 2.0, "cup")]);
        assert!(approx(items[0].quantity, 2.0));
    }

    #[test]
    fn test_optional_entries_still_count() {
        let mut parsley = entry("parsley", 1.0, "bunch");
        parsley.optional = true;
        let items = aggregate(&[parsley, entry("parsley", 1.0, "bunch")]);
        assert_eq!(items[0].quantity, 2.0);
    }

    #[test]
    fn test_display_name_prefers_capitalized_variant() {
        let items = aggregate(&[
            entry("olive oil", 1.0, "tbsp"),
            entry("Olive Oil", 1.0, "tbsp"),
            entry("OLIVE OIL", 1.0, "tbsp"),
        ]);
        assert_eq!(items[0].display_name, "Olive Oil");
    }

    #[test]
    fn test_display_name_falls_back_to_capitalized_key() {
        let items = aggregate(&[entry("  basil ", 2.0, "sprig")]);
        assert_eq!(items[0].name, "basil");
        assert_eq!(items[0].display_name, "Basil");
    }

    #[test]
    fn test_items_follow_first_seen_order() {
        let items = aggregate(&[
            entry("onion", 1.0, "medium"),
            entry("carrot", 2.0, "each"),
            entry("Onion", 1.0, "large"),
        ]);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["onion", "carrot"]);
    }

    #[test]
    fn test_count_policy_sum_across_units() {
        let items = aggregate(&[entry("garlic", 2.0, "clove"), entry("garlic", 1.0, "head")]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3.0);
        assert_eq!(items[0].unit, "clove");
    }

    #[test]
    fn test_count_policy_same_unit_only() {
        let items = aggregate_with_policy(
            &[
                entry("garlic", 2.0, "clove"),
                entry("garlic", 1.0, "head"),
                entry("Garlic", 3.0, "Clove"),
            ],
            CountMergePolicy::SameUnitOnly,
        );

        assert_eq!(items.len(), 2);
        assert_eq!((items[0].quantity, items[0].unit.as_str()), (5.0, "clove"));
        assert_eq!((items[1].quantity, items[1].unit.as_str()), (1.0, "head"));
    }

    #[test]
    fn test_reaggregation_is_idempotent() {
        let entries = vec![
            entry("Flour", 1.0, "cup"),
            entry("flour", 2.0, "tbsp"),
            entry("Butter", 4.0, "oz"),
            entry("butter", 100.0, "g"),
            entry("eggs", 2.0, "each"),
            entry("Eggs", 1.0, "large"),
            entry("salt", 1.0, "pinch"),
            entry("milk", 1.0, "cup"),
        ];
        let first = aggregate(&entries);
        let second = aggregate(&first.iter().map(GroceryItem::to_entry).collect::<Vec<_>>());

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.unit_kind, b.unit_kind);
            assert_eq!(a.unit, b.unit);
            assert!(approx(a.quantity, b.quantity), "{} vs {}", a.quantity, b.quantity);
        }
    }

    #[test]
    fn test_one_item_per_name_and_mergeable_kind() {
        let entries = vec![
            entry("a", 1.0, "cup"),
            entry("A", 1.0, "ml"),
            entry("b", 1.0, "g"),
            entry("a", 2.0, "each"),
            entry("b", 1.0, "kg"),
            entry("a", 1.0, "slice"),
        ];
        let items = aggregate(&entries);
        let mut seen = std::collections::HashSet::new();
        for item in &items {
            assert!(seen.insert((item.name.clone(), item.unit_kind)));
        }
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_entry_deserializes_with_defaults() {
        let entry: IngredientEntry =
            serde_json::from_str(r#"{"name": "Salt", "section": "Spices"}"#).unwrap();
        assert_eq!(entry.quantity, None);
        assert_eq!(entry.unit, "");
        assert!(!entry.optional);
    }
}
