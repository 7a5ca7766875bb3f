//! Style and notation detection for input of unknown shape

use crate::locale::{self, LocaleSettings};
use crate::parser::decode;
use crate::plugin::{ratio, uppercase};
use crate::types::{Notation, ParseOptions, Style};

/// Checks for a digit followed by `e`/`E`, an optional sign and a digit
fn has_exponent(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.iter().enumerate().any(|(i, c)| {
        if !matches!(c, 'e' | 'E') || i == 0 || !chars[i - 1].is_ascii_digit() {
            return false;
        }
        let next = match chars.get(i + 1) {
            Some('+' | '-' | '\u{2212}') => chars.get(i + 2),
            other => other,
        };
        next.is_some_and(char::is_ascii_digit)
    })
}

/// Style and notation suggested by the markers in `text`
///
/// Markers are checked in a fixed order: percent, per-myriad, per-mille,
/// percentage-point, exponent, currency, compact unit, uppercase numerals.
pub fn detect(text: &str, symbols: &LocaleSettings) -> (Style, Notation) {
    let text = text.trim();
    if text.contains('%') || (!symbols.percent_sign.is_empty() && text.contains(&symbols.percent_sign)) {
        return (Style::Percent, Notation::Standard);
    }
    if text.contains(ratio::PER_MYRIAD.symbol) {
        return (Style::PerMyriad, Notation::Standard);
    }
    if text.contains(ratio::PER_MILLE.symbol) {
        return (Style::PerMille, Notation::Standard);
    }
    if ratio::PERCENTAGE_POINT.has_suffix(text) {
        return (Style::PercentagePoint, Notation::Standard);
    }
    if has_exponent(text) {
        return (Style::Decimal, Notation::Scientific);
    }
    if decode::has_currency_marker(text, &locale::known_currency_symbols()) {
        return (Style::Currency, Notation::Standard);
    }

    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    let units = decode::compact_units(&symbols.compact_units);
    if has_digit && decode::has_compact_suffix(text, &units) {
        return (Style::Decimal, Notation::Compact);
    }
    if text.chars().any(uppercase::is_numeral_char) {
        return (Style::LocalizedUppercase, Notation::Standard);
    }
    (Style::Decimal, Notation::Standard)
}

/// `base` with the style and notation detected for `text`
pub fn auto_options(text: &str, base: &ParseOptions) -> ParseOptions {
    let tag = base.locale.as_deref().unwrap_or(locale::DEFAULT_LOCALE);
    let symbols = locale::resolve_locale(tag).unwrap_or_default();
    let (style, notation) = detect(text, &symbols);
    ParseOptions {
        style: Some(style),
        notation: Some(notation),
        ..base.clone()
    }
}
