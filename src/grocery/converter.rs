//! Unit conversion functions
//!
//! Converts quantities to and from their kind's base unit and picks the
//! display unit for a merged group.

use serde::Serialize;

use super::units::{classify, grams_per_unit, is_count_unit, ml_per_unit, normalize_unit, UnitKind};

/// A quantity expressed in its kind's base unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseQuantity {
    pub value: f64,
    /// "ml", "g", or the normalized count unit itself
    pub base_unit: String,
}

/// Convert a quantity in `unit` to its base unit
///
/// Returns None for [`UnitKind::Other`] units, which cannot be merged.
pub fn to_base(quantity: f64, unit: &str) -> Option<BaseQuantity> {
    match classify(unit) {
        UnitKind::Volume => ml_per_unit(unit).map(|factor| BaseQuantity {
            value: quantity * factor,
            base_unit: "ml".to_string(),
        }),
        UnitKind::Weight => grams_per_unit(unit).map(|factor| BaseQuantity {
            value: quantity * factor,
            base_unit: "g".to_string(),
        }),
        UnitKind::Count => Some(BaseQuantity {
            value: quantity,
            base_unit: normalize_unit(unit),
        }),
        UnitKind::Other => None,
    }
}

/// Convert a base-unit value back into `target_unit`
pub fn from_base(value: f64, target_unit: &str) -> Option<f64> {
    if let Some(factor) = ml_per_unit(target_unit) {
        return Some(value / factor);
    }
    if let Some(factor) = grams_per_unit(target_unit) {
        return Some(value / factor);
    }
    if is_count_unit(target_unit) {
        return Some(value);
    }
    None
}

/// Two units can be summed only when they share a mergeable kind
pub fn are_compatible(unit_a: &str, unit_b: &str) -> bool {
    let kind = classify(unit_a);
    kind == classify(unit_b) && kind.is_mergeable()
}

/// Pick the most frequent normalized unit
///
/// Ties go to whichever tied unit appears first in the input.
/// Empty input yields an empty string.
pub fn choose_display_unit<S: AsRef<str>>(units: &[S]) -> String {
    // (unit, count) in first-seen order
    let mut counts: Vec<(String, usize)> = Vec::new();
    for unit in units {
        let normalized = normalize_unit(unit.as_ref());
        match counts.iter_mut().find(|(u, _)| *u == normalized) {
            Some((_, count)) => *count += 1,
            None => counts.push((normalized, 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (unit, count) in counts {
        if best.as_ref().map_or(true, |(_, max)| count > *max) {
            best = Some((unit, count));
        }
    }

    best.map(|(unit, _)| unit).unwrap_or_default()
}
