//! Per-style decoders
//!
//! Every decoder reduces its input to a canonical numeral (`[-]digits[.digits]`)
//! and converts that with exact decimal arithmetic. Decoders never fail with an
//! [`Error`](crate::error::Error); a failure is a message that becomes the
//! parse error.

use winnow::ascii::{dec_int, digit0};
use winnow::combinator::{opt, preceded};
use winnow::token::one_of;
use winnow::{ModalResult, Parser};

use crate::decimal;
use crate::locale::CompactUnit;

pub type Decoded = std::result::Result<f64, String>;

/// Group and decimal separators of the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separators {
    pub group: String,
    pub decimal: String,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            group: ",".to_string(),
            decimal: ".".to_string(),
        }
    }
}

/// Compact units understood in every locale
const GLOBAL_COMPACT_UNITS: [(&str, i32); 25] = [
    ("K", 3),
    ("k", 3),
    ("M", 6),
    ("m", 6),
    ("B", 9),
    ("b", 9),
    ("G", 9),
    ("g", 9),
    ("T", 12),
    ("t", 12),
    ("P", 15),
    ("p", 15),
    ("E", 18),
    ("e", 18),
    ("Z", 21),
    ("z", 21),
    ("Y", 24),
    ("y", 24),
    ("千", 3),
    ("万", 4),
    ("萬", 4),
    ("亿", 8),
    ("億", 8),
    ("兆", 12),
    ("만", 4),
];

/// Korean units missing from the table above
const HANGUL_UNITS: [(&str, i32); 2] = [("억", 8), ("조", 12)];

/// Map the characters of `text` onto the canonical alphabet
///
/// Group separators and whitespace are dropped, the decimal separator becomes
/// `.` and the Unicode minus becomes `-`. Any other character is an error.
/// Strict mode also rejects a `.` when the locale's decimal separator differs.
pub fn normalize(text: &str, separators: &Separators, strict: bool) -> Result<String, String> {
    let mut s = text.trim().to_string();
    if !separators.group.is_empty() && separators.group != separators.decimal {
        s = s.replace(separators.group.as_str(), "");
    }
    if separators.decimal != "." {
        if s.contains('.') && strict {
            return Err(format!("Unexpected '.' with decimal separator '{}'", separators.decimal));
        }
        s = s.replace(separators.decimal.as_str(), ".");
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '0'..='9' | '.' | '+' | '-' => out.push(c),
            '\u{2212}' => out.push('-'),
            c if c.is_whitespace() => {}
            c => return Err(format!("Unexpected character '{c}'")),
        }
    }
    Ok(out)
}

/// `[+-]digits[.digits]` with at least one digit
fn numeral(input: &mut &str) -> ModalResult<String> {
    (opt(one_of(['+', '-'])), digit0, opt(preceded('.', digit0)))
        .verify_map(|(sign, integer, fraction): (Option<char>, &str, Option<&str>)| {
            let fraction = fraction.filter(|f| !f.is_empty());
            if integer.is_empty() && fraction.is_none() {
                return None;
            }
            let mut out = String::new();
            if sign == Some('-') {
                out.push('-');
            }
            out.push_str(if integer.is_empty() { "0" } else { integer });
            if let Some(fraction) = fraction {
                out.push('.');
                out.push_str(fraction);
            }
            Some(out)
        })
        .parse_next(input)
}

/// `E[+-]digits`, case-insensitive
fn exponent(input: &mut &str) -> ModalResult<i32> {
    preceded(one_of(['e', 'E']), dec_int::<_, i32, _>).parse_next(input)
}

/// Validate a normalized string as a whole canonical numeral
pub fn canonical(normalized: &str) -> Result<String, String> {
    let mut rest = normalized;
    let value = numeral
        .parse_next(&mut rest)
        .map_err(|_| format!("No number found in '{normalized}'"))?;
    if !rest.is_empty() {
        return Err(format!("Unexpected trailing characters '{rest}'"));
    }
    Ok(value)
}

fn to_value(canonical: &str, exp: i32) -> Decoded {
    let value = decimal::parse_scaled(canonical, exp)
        .ok_or_else(|| format!("Number out of range: '{canonical}'"))?;
    // Keep the sign of "-0"
    if value == 0.0 && canonical.starts_with('-') {
        return Ok(-0.0);
    }
    Ok(value)
}

/// Plain decimal numbers such as `-1,234.5`
pub fn decode_decimal(text: &str, separators: &Separators, strict: bool) -> Decoded {
    let normalized = normalize(text, separators, strict)?;
    to_value(&canonical(&normalized)?, 0)
}

/// Decimal numbers scaled by 10^`exp`
pub fn decode_scaled(text: &str, separators: &Separators, strict: bool, exp: i32) -> Decoded {
    let normalized = normalize(text, separators, strict)?;
    to_value(&canonical(&normalized)?, exp)
}

/// Percentages; the value is divided by 100
pub fn decode_percent(text: &str, separators: &Separators, percent_sign: &str, strict: bool) -> Decoded {
    let trimmed = text.trim();
    let stripped = [percent_sign.trim(), "%", "٪"]
        .iter()
        .filter(|sign| !sign.is_empty())
        .find_map(|&sign| {
            trimmed
                .strip_suffix(sign)
                .or_else(|| trimmed.strip_prefix(sign))
        });
    let body = match stripped {
        Some(body) => body,
        None if strict => return Err("Expected percent sign (%)".to_string()),
        None => trimmed,
    };
    decode_scaled(body, separators, strict, -2)
}

/// Currency amounts; accounting parentheses mean a negative amount
///
/// `symbols` are tried in order, so longer symbols must come first. A
/// three-letter ISO code is also accepted as the currency marker.
pub fn decode_currency(text: &str, separators: &Separators, symbols: &[String], strict: bool) -> Decoded {
    let trimmed = text.trim();
    let (negative, body) = match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };

    let stripped = symbols
        .iter()
        .filter(|symbol| !symbol.is_empty())
        .find_map(|symbol| body.find(symbol.as_str()).map(|at| (at, symbol.len())))
        .or_else(|| find_iso_code(body).map(|at| (at, 3)))
        .map(|(at, len)| format!("{}{}", &body[..at], &body[at + len..]));

    let amount = match stripped {
        Some(amount) => amount,
        None if strict => return Err("Expected a currency symbol or code".to_string()),
        None => body.to_string(),
    };

    let value = decode_decimal(&amount, separators, strict)?;
    Ok(if negative { -value.abs() } else { value })
}

/// Byte offset of the first run of exactly three ASCII capitals
fn find_iso_code(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(2)).find(|&i| {
        bytes[i..i + 3].iter().all(u8::is_ascii_uppercase)
            && (i == 0 || !bytes[i - 1].is_ascii_alphabetic())
            && bytes.get(i + 3).is_none_or(|b| !b.is_ascii_alphabetic())
    })
}

/// Checks if `text` contains a currency marker
pub fn has_currency_marker(text: &str, symbols: &[String]) -> bool {
    symbols
        .iter()
        .any(|symbol| !symbol.is_empty() && text.contains(symbol.as_str()))
        || find_iso_code(text).is_some()
}

/// Scientific and engineering notation such as `1.235E5` or `1,5e-3`
pub fn decode_scientific(text: &str, separators: &Separators, exponent_separator: &str, strict: bool) -> Decoded {
    let mut text = text.trim().to_string();
    if !exponent_separator.is_empty() && !exponent_separator.eq_ignore_ascii_case("e") {
        text = text.replace(exponent_separator, "E");
    }

    let Some(at) = text.rfind(['e', 'E']) else {
        return decode_decimal(&text, separators, strict);
    };
    let mantissa = canonical(&normalize(&text[..at], separators, strict)?)?;

    let tail = text[at..].replace('\u{2212}', "-");
    let mut rest = tail.as_str();
    let exp = exponent
        .parse_next(&mut rest)
        .map_err(|_| format!("Invalid exponent in '{text}'"))?;
    if !rest.trim().is_empty() {
        return Err(format!("Unexpected trailing characters '{rest}'"));
    }
    to_value(&mantissa, exp)
}

/// Compact unit suffixes of a locale plus the global table, longest first
pub fn compact_units(locale_units: &[CompactUnit]) -> Vec<(String, i32)> {
    let mut units: Vec<(String, i32)> = locale_units
        .iter()
        .map(|u| (u.suffix.trim().to_string(), u.exponent))
        .filter(|(suffix, _)| !suffix.is_empty())
        .chain(
            GLOBAL_COMPACT_UNITS
                .iter()
                .chain(HANGUL_UNITS.iter())
                .map(|(suffix, exp)| (suffix.to_string(), *exp)),
        )
        .collect();
    // Stable sort: locale suffixes win ties over the global table
    units.sort_by_key(|(suffix, _)| std::cmp::Reverse(suffix.chars().count()));
    units
}

/// Checks if `text` ends with one of `units`
pub fn has_compact_suffix(text: &str, units: &[(String, i32)]) -> bool {
    let trimmed = text.trim_end();
    let ends_with_digit = trimmed.chars().last().is_some_and(|c| c.is_ascii_digit());
    !ends_with_digit && units.iter().any(|(suffix, _)| trimmed.ends_with(suffix.as_str()))
}

/// Compact notation such as `1.2K`, `12万` or `3,4 Mio.`
///
/// A unit without a number reads as one of that unit.
pub fn decode_compact(text: &str, separators: &Separators, units: &[(String, i32)], strict: bool) -> Decoded {
    let trimmed = text.trim();
    let split = trimmed
        .char_indices()
        .find(|&(_, c)| {
            !(c.is_ascii_digit()
                || c.is_whitespace()
                || matches!(c, '+' | '-' | '\u{2212}')
                || separators.group.contains(c)
                || separators.decimal.contains(c))
        })
        .map_or(trimmed.len(), |(at, _)| at);
    let (number, unit) = trimmed.split_at(split);
    let unit = unit.trim();

    let exp = if unit.is_empty() {
        0
    } else {
        units
            .iter()
            .find(|(suffix, _)| suffix == unit)
            .map(|(_, exp)| *exp)
            .ok_or_else(|| format!("Unknown compact unit '{unit}'"))?
    };

    let normalized = normalize(number, separators, strict)?;
    let digits = match normalized.as_str() {
        "" | "+" => "1".to_string(),
        "-" => "-1".to_string(),
        _ => canonical(&normalized)?,
    };
    to_value(&digits, exp)
}
