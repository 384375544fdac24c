//! Quantity formatting
//!
//! Renders quantities the way a recipe card would: culinary fractions where
//! they fit, otherwise a short decimal.

/// Common culinary fractions and their rendering
const FRACTIONS: &[(f64, &str)] = &[
    (0.125, "1/8"),
    (0.25, "1/4"),
    (0.333, "1/3"),
    (0.375, "3/8"),
    (0.5, "1/2"),
    (0.625, "5/8"),
    (0.667, "2/3"),
    (0.75, "3/4"),
    (0.875, "7/8"),
];

/// Absolute distance within which a remainder snaps to a fraction
const FRACTION_TOLERANCE: f64 = 0.02;

/// Format a quantity for display
///
/// - `0.0` -> `""`
/// - `0.5` -> `"1/2"`
/// - `1.5` -> `"1 1/2"`
/// - `2.0` -> `"2"`
/// - `1.4567` -> `"1.46"`
pub fn format_quantity(quantity: f64) -> String {
    if quantity == 0.0 {
        return String::new();
    }
    if !quantity.is_finite() || quantity < 0.0 {
        return format_decimal(quantity);
    }

    let whole = quantity.floor();
    let remainder = quantity - whole;

    if let Some(fraction) = match_fraction(remainder) {
        return if whole == 0.0 {
            fraction.to_string()
        } else {
            format!("{} {}", whole, fraction)
        };
    }

    if remainder == 0.0 {
        return format!("{}", whole);
    }

    format_decimal(quantity)
}

fn match_fraction(remainder: f64) -> Option<&'static str> {
    FRACTIONS
        .iter()
        .find(|(value, _)| (remainder - value).abs() < FRACTION_TOLERANCE)
        .map(|(_, text)| *text)
}

/// Up to two decimals, trailing zeros and point stripped
fn format_decimal(quantity: f64) -> String {
    let fixed = format!("{:.2}", quantity);
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed
    }
}
