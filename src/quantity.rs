// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes resource quantity parsing.
//!
//! The API server stores quantities in canonical form (`1000m` comes back as `1`,
//! `1024Mi` as `1Gi`), so two quantities must be compared by value, never as text.
//! Values are parsed into an exact integer count of nano-units, the smallest scale
//! Kubernetes keeps.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Nano-units per unit
const NANO_EXPONENT: i32 = 9;

/// Parse a quantity string into nano-units.
///
/// Accepts an optional sign, a decimal number and one suffix:
/// - binary: `Ki`, `Mi`, `Gi`, `Ti`, `Pi`, `Ei`
/// - decimal: `n`, `u`, `m`, (none), `k`, `M`, `G`, `T`, `P`, `E`
/// - exponent: `e3`, `E-2`
///
/// Precision below one nano-unit is rounded up, as the API server does.
///
/// # Examples
///
/// ```
/// use flowconsole::quantity::parse_quantity;
///
/// assert_eq!(parse_quantity("1000m"), parse_quantity("1"));
/// assert_eq!(parse_quantity("1024Mi"), parse_quantity("1Gi"));
/// assert_eq!(parse_quantity("1.5k"), parse_quantity("1500"));
/// assert!(parse_quantity("12x").is_none());
/// ```
///
/// Returns `None` for malformed input and for values that do not fit.
#[must_use]
pub fn parse_quantity(quantity: &str) -> Option<i128> {
    let quantity = quantity.trim();
    let (negative, unsigned) = match quantity.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, quantity.strip_prefix('+').unwrap_or(quantity)),
    };

    let number_end = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_end);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return None;
    }

    let mantissa: i128 = format!("{whole}{fraction}").parse().ok()?;
    let (multiplier, exponent) = suffix_scale(suffix)?;
    let exponent = exponent
        .checked_add(NANO_EXPONENT)?
        .checked_sub(i32::try_from(fraction.len()).ok()?)?;

    let scaled = mantissa.checked_mul(multiplier)?;
    let value = if exponent >= 0 {
        scaled.checked_mul(10_i128.checked_pow(u32::try_from(exponent).ok()?)?)?
    } else {
        let divisor = 10_i128.checked_pow(exponent.unsigned_abs())?;
        scaled / divisor + i128::from(scaled % divisor != 0)
    };
    Some(if negative { -value } else { value })
}

/// Binary multiplier and decimal exponent of a suffix.
fn suffix_scale(suffix: &str) -> Option<(i128, i32)> {
    let scale = match suffix {
        "Ki" => (1 << 10, 0),
        "Mi" => (1 << 20, 0),
        "Gi" => (1 << 30, 0),
        "Ti" => (1 << 40, 0),
        "Pi" => (1 << 50, 0),
        "Ei" => (1 << 60, 0),
        "n" => (1, -9),
        "u" => (1, -6),
        "m" => (1, -3),
        "" => (1, 0),
        "k" => (1, 3),
        "M" => (1, 6),
        "G" => (1, 9),
        "T" => (1, 12),
        "P" => (1, 15),
        "E" => (1, 18),
        _ => (1, suffix.strip_prefix(['e', 'E'])?.parse().ok()?),
    };
    Some(scale)
}

/// Whether two quantities hold the same value. Unparseable quantities only
/// match themselves textually.
#[must_use]
pub fn quantities_equal(a: &Quantity, b: &Quantity) -> bool {
    if a.0 == b.0 {
        return true;
    }
    match (parse_quantity(&a.0), parse_quantity(&b.0)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Value-based form of a quantity, suitable for structural comparison.
///
/// Unparseable quantities are returned unchanged.
#[must_use]
pub fn canonical(quantity: &Quantity) -> Quantity {
    parse_quantity(&quantity.0).map_or_else(|| quantity.clone(), |n| Quantity(n.to_string()))
}

#[cfg(test)]
#[path = "quantity_tests.rs"]
mod quantity_tests;
