//! Unit taxonomy and conversion constants
//!
//! Classifies free-text unit strings into a [`UnitKind`] and holds the
//! multipliers from each concrete unit to its kind's base unit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Aggregation-compatibility class of a unit string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Converted through milliliters
    Volume,
    /// Converted through grams
    Weight,
    /// Discrete objects (cloves, cans, eggs); the unit is its own base
    Count,
    /// Not numerically comparable (pinch, to taste, unknown strings)
    Other,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Volume => "volume",
            UnitKind::Weight => "weight",
            UnitKind::Count => "count",
            UnitKind::Other => "other",
        }
    }

    /// Canonical base unit for kinds that convert through one
    pub fn base_unit(&self) -> Option<&'static str> {
        match self {
            UnitKind::Volume => Some("ml"),
            UnitKind::Weight => Some("g"),
            UnitKind::Count | UnitKind::Other => None,
        }
    }

    /// Whether quantities of this kind may be summed together
    pub fn is_mergeable(&self) -> bool {
        !matches!(self, UnitKind::Other)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Volume Conversion Constants (to milliliters)
// ============================================================================

pub const ML_PER_TSP: f64 = 4.929;
pub const ML_PER_TBSP: f64 = 14.787;
pub const ML_PER_FL_OZ: f64 = 29.574;
pub const ML_PER_CUP: f64 = 236.588;
pub const ML_PER_PINT: f64 = 473.176;
pub const ML_PER_QUART: f64 = 946.353;
pub const ML_PER_GALLON: f64 = 3785.41;
pub const ML_PER_LITER: f64 = 1000.0;

// ============================================================================
// Weight Conversion Constants (to grams)
// ============================================================================

pub const G_PER_OZ: f64 = 28.3495;
pub const G_PER_LB: f64 = 453.592;
pub const G_PER_KG: f64 = 1000.0;

// ============================================================================
// Unit Recognition
// ============================================================================

/// Lowercase and trim a unit string; every lookup goes through this
pub fn normalize_unit(unit: &str) -> String {
    unit.trim().to_lowercase()
}

/// Milliliters per one of `unit`, for volume units
pub fn ml_per_unit(unit: &str) -> Option<f64> {
    match normalize_unit(unit).as_str() {
        "tsp" | "teaspoon" | "teaspoons" => Some(ML_PER_TSP),
        "tbsp" | "tablespoon" | "tablespoons" => Some(ML_PER_TBSP),
        "cup" | "cups" => Some(ML_PER_CUP),
        "fl oz" | "floz" | "fluid ounce" | "fluid ounces" => Some(ML_PER_FL_OZ),
        "pt" | "pint" | "pints" => Some(ML_PER_PINT),
        "qt" | "quart" | "quarts" => Some(ML_PER_QUART),
        "gal" | "gallon" | "gallons" => Some(ML_PER_GALLON),
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Some(1.0),
        "l" | "liter" | "liters" | "litre" | "litres" => Some(ML_PER_LITER),
        _ => None,
    }
}

/// Grams per one of `unit`, for weight units
pub fn grams_per_unit(unit: &str) -> Option<f64> {
    match normalize_unit(unit).as_str() {
        "oz" | "ounce" | "ounces" => Some(G_PER_OZ),
        "lb" | "lbs" | "pound" | "pounds" => Some(G_PER_LB),
        "g" | "gram" | "grams" => Some(1.0),
        "kg" | "kilogram" | "kilograms" => Some(G_PER_KG),
        _ => None,
    }
}

/// Whether `unit` names a discrete object (or a size used as a unit)
pub fn is_count_unit(unit: &str) -> bool {
    matches!(
        normalize_unit(unit).as_str(),
        "each"
            | "pc"
            | "pcs"
            | "piece"
            | "pieces"
            | "whole"
            | "clove"
            | "cloves"
            | "slice"
            | "slices"
            | "can"
            | "cans"
            | "pkg"
            | "package"
            | "packages"
            | "stick"
            | "sticks"
            | "bunch"
            | "bunches"
            | "sprig"
            | "sprigs"
            | "leaf"
            | "leaves"
            | "head"
            | "heads"
            | "medium"
            | "large"
            | "small"
    )
}

/// Classify a unit string. Unknown and empty strings are [`UnitKind::Other`].
pub fn classify(unit: &str) -> UnitKind {
    if ml_per_unit(unit).is_some() {
        UnitKind::Volume
    } else if grams_per_unit(unit).is_some() {
        UnitKind::Weight
    } else if is_count_unit(unit) {
        UnitKind::Count
    } else {
        UnitKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_volume_units() {
        for unit in ["tsp", "teaspoon", "tbsp", "Tablespoons", "cup", "fl oz", "pt", "quart", "gal", "ml", "L", "litre"] {
            assert_eq!(classify(unit), UnitKind::Volume, "{unit}");
        }
    }

    #[test]
    fn test_classify_weight_units() {
        for unit in ["oz", "ounce", "lb", "Pounds", "g", "grams", "kg", "kilogram"] {
            assert_eq!(classify(unit), UnitKind::Weight, "{unit}");
        }
    }

    #[test]
    fn test_classify_count_units() {
        for unit in ["each", "pc", "piece", "clove", "slices", "can", "pkg", "stick", "bunch", "sprig", "leaves", "head", "medium", "large", "small"] {
            assert_eq!(classify(unit), UnitKind::Count, "{unit}");
        }
    }

    #[test]
    fn test_classify_other_units() {
        for unit in ["pinch", "dash", "to taste", "handful", "", "   ", "scoop"] {
            assert_eq!(classify(unit), UnitKind::Other, "{unit:?}");
        }
    }

    #[test]
    fn test_classify_normalizes_case_and_whitespace() {
        assert_eq!(classify("  CUP "), UnitKind::Volume);
        assert_eq!(classify(" Clove"), UnitKind::Count);
    }

    #[test]
    fn test_fluid_ounce_is_not_weight_ounce() {
        assert_eq!(classify("fl oz"), UnitKind::Volume);
        assert_eq!(classify("oz"), UnitKind::Weight);
    }

    #[test]
    fn test_base_units() {
        assert_eq!(UnitKind::Volume.base_unit(), Some("ml"));
        assert_eq!(UnitKind::Weight.base_unit(), Some("g"));
        assert_eq!(UnitKind::Count.base_unit(), None);
        assert!(!UnitKind::Other.is_mergeable());
    }

    #[test]
    fn test_unit_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UnitKind::Volume).unwrap(), "\"volume\"");
        let kind: UnitKind = serde_json::from_str("\"count\"").unwrap();
        assert_eq!(kind, UnitKind::Count);
    }
}
