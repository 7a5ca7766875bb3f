//! Exact decimal helpers
//!
//! Scale conversions (ratio styles, percent, compact units) go through
//! `rust_decimal` so that e.g. `0.123 × 1000` is exactly `123` instead of the
//! `122.99999999999999` native floating point would give. Values outside the
//! range of `Decimal` fall back to `f64` arithmetic.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Exact decimal of the shortest round-trip representation of `value`
///
/// Returns `None` for non-finite values and for magnitudes `Decimal` cannot hold.
pub fn from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    let decimal = Decimal::from_str(&value.to_string()).ok()?;
    // Underflow past 28 fractional digits rounds to zero
    if decimal.is_zero() && value != 0.0 {
        return None;
    }
    Some(decimal)
}

/// Nearest `f64` to `value`
pub fn to_f64(value: Decimal) -> f64 {
    // Going through the decimal string gives a correctly rounded result
    value.to_string().parse::<f64>().unwrap_or(f64::NAN)
}

/// Largest scale and power of ten a `Decimal` holds
const MAX_SCALE: u32 = 28;

/// Multiplies `d` by 10^`exp`
///
/// Returns `None` when the result leaves the range or precision of `Decimal`;
/// callers fall back to `f64`.
pub fn mul_pow10(d: Decimal, exp: i32) -> Option<Decimal> {
    if d.is_zero() || exp == 0 {
        return Some(d);
    }
    let shift = exp.unsigned_abs();
    if shift > MAX_SCALE {
        return None;
    }
    if exp > 0 {
        let factor = Decimal::try_from_i128_with_scale(10i128.pow(shift), 0).ok()?;
        d.checked_mul(factor)
    } else {
        let scale = d.scale() + shift;
        if scale > MAX_SCALE {
            return None;
        }
        let mut scaled = d;
        scaled.set_scale(scale).ok()?;
        Some(scaled)
    }
}

/// `value × factor`, exact when both fit in a `Decimal`
pub fn multiply(value: f64, factor: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value * factor as f64;
    }
    from_f64(value)
        .and_then(|d| d.checked_mul(Decimal::from(factor)))
        .map(to_f64)
        .unwrap_or(value * factor as f64)
}

/// `value ÷ divisor`, exact when both fit in a `Decimal`
pub fn divide(value: f64, divisor: u32) -> f64 {
    if value == 0.0 || !value.is_finite() || divisor == 0 {
        return value / divisor as f64;
    }
    from_f64(value)
        .and_then(|d| d.checked_div(Decimal::from(divisor)))
        .map(to_f64)
        .unwrap_or(value / divisor as f64)
}

/// Parses an already validated canonical numeral (`digits[.digits]`)
///
/// Numerals longer than `Decimal` can hold are converted directly; the string
/// is exact, so the conversion is still correctly rounded.
pub fn parse_canonical(canonical: &str) -> Option<f64> {
    match Decimal::from_str(canonical) {
        Ok(d) => Some(to_f64(d)),
        Err(_) => canonical.parse::<f64>().ok(),
    }
}

/// Parses a canonical numeral and scales it by 10^`exp`
pub fn parse_scaled(canonical: &str, exp: i32) -> Option<f64> {
    if exp == 0 {
        return parse_canonical(canonical);
    }
    match Decimal::from_str(canonical)
        .ok()
        .and_then(|d| mul_pow10(d, exp))
    {
        Some(d) => Some(to_f64(d)),
        None => format!("{canonical}e{exp}").parse::<f64>().ok(),
    }
    .filter(|v| v.is_finite())
}
