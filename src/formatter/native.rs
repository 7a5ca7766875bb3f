//! Base number formatter
//!
//! This is the formatting primitive the plugin pipeline delegates to. It
//! understands only the base styles (decimal, percent, currency); extension
//! styles are translated to `Decimal` before they reach it.

use crate::error::{Error, Result};
use crate::formatter::digits::DigitString;
use crate::locale::{self, AffixPart, AffixPattern, CompactUnit, CurrencyData, LocaleSettings};
use crate::types::{
    CurrencyDisplay, CurrencySign, FormatOptions, NegativeZero, Notation, NumberPart, PartKind,
    ResolvedFormatOptions, SignDisplay, SignZeroMode, Style, TrailingZeroDisplay,
};

const MAX_FRACTION_DIGITS: u8 = 100;
const MAX_SIGNIFICANT_DIGITS: u8 = 21;

/// Which sign, if any, precedes the number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignMark {
    None,
    Minus,
    Plus,
    Parentheses,
}

/// A configured base formatter
#[derive(Debug, Clone)]
pub struct NativeNumberFormat {
    resolved: ResolvedFormatOptions,
    symbols: LocaleSettings,
    currency: Option<CurrencyData>,
}

impl NativeNumberFormat {
    /// Resolve `options` into a complete option set
    ///
    /// Fails on malformed locales, invalid currency codes, a currency style
    /// without a currency and out-of-range digit options. Extension styles
    /// resolve as `Decimal`.
    pub fn resolve(options: &FormatOptions) -> Result<ResolvedFormatOptions> {
        let locale_tag = options.locale.as_deref().unwrap_or(locale::DEFAULT_LOCALE);
        let settings = locale::resolve_locale(locale_tag)?;
        let style = options.style.unwrap_or_default().native();

        let currency = match (style, options.currency.as_deref()) {
            (Style::Currency, None) => {
                return Err(Error::InvalidOptions(
                    "currency is required with the currency style".to_string(),
                ));
            }
            (_, Some(code)) => Some(locale::currency_data(code)?),
            (_, None) => None,
        };

        let (default_min, default_max) = match (style, &currency) {
            (Style::Currency, Some(c)) => (c.digits, c.digits),
            (Style::Percent, _) => (0, 0),
            _ => (0, 3),
        };

        let (minimum_fraction_digits, maximum_fraction_digits) =
            match (options.minimum_fraction_digits, options.maximum_fraction_digits) {
                (Some(min), Some(max)) => {
                    if min > max {
                        return Err(Error::InvalidOptions(format!(
                            "minimumFractionDigits ({min}) is greater than maximumFractionDigits ({max})"
                        )));
                    }
                    (min, max)
                }
                (Some(min), None) => (min, default_max.max(min)),
                (None, Some(max)) => (default_min.min(max), max),
                (None, None) => (default_min, default_max),
            };
        if maximum_fraction_digits > MAX_FRACTION_DIGITS {
            return Err(Error::InvalidOptions(format!(
                "maximumFractionDigits must be at most {MAX_FRACTION_DIGITS}"
            )));
        }

        let (minimum_significant_digits, maximum_significant_digits) =
            if options.has_significant_digits() {
                let min = options.minimum_significant_digits.unwrap_or(1);
                let max = options
                    .maximum_significant_digits
                    .unwrap_or(MAX_SIGNIFICANT_DIGITS);
                if !(1..=MAX_SIGNIFICANT_DIGITS).contains(&min)
                    || !(min..=MAX_SIGNIFICANT_DIGITS).contains(&max)
                {
                    return Err(Error::InvalidOptions(format!(
                        "significant digits out of range: minimum {min}, maximum {max}"
                    )));
                }
                (Some(min), Some(max))
            } else {
                (None, None)
            };

        let minimum_integer_digits = options.minimum_integer_digits.unwrap_or(1);
        if !(1..=21).contains(&minimum_integer_digits) {
            return Err(Error::InvalidOptions(format!(
                "minimumIntegerDigits out of range: {minimum_integer_digits}"
            )));
        }

        let notation = options.notation.unwrap_or_default();
        let include_sign = options.extend.include_sign.unwrap_or(false);
        let sign_display = options.sign_display.unwrap_or(if include_sign {
            match options.extend.sign_zero_mode.unwrap_or_default() {
                SignZeroMode::Always => SignDisplay::Always,
                SignZeroMode::Auto => SignDisplay::ExceptZero,
            }
        } else {
            SignDisplay::Auto
        });

        Ok(ResolvedFormatOptions {
            locale: settings.id.replace('_', "-"),
            style,
            currency: currency.map(|c| c.code),
            currency_display: options.currency_display.unwrap_or_default(),
            currency_sign: options.currency_sign.unwrap_or_default(),
            notation,
            sign_display,
            use_grouping: options.use_grouping.unwrap_or(true),
            minimum_integer_digits,
            minimum_fraction_digits,
            maximum_fraction_digits,
            minimum_significant_digits,
            maximum_significant_digits,
            trailing_zero_display: options.trailing_zero_display.unwrap_or_default(),
            compact_rounding: notation == Notation::Compact
                && !options.has_significant_digits()
                && !options.has_fraction_digits(),
            negative_zero: options.extend.negative_zero.unwrap_or_default(),
            original_style: options.style.filter(|s| s.is_extension()),
            include_sign,
        })
    }

    /// Build a formatter for already resolved options
    pub fn try_new(resolved: &ResolvedFormatOptions) -> Result<Self> {
        let symbols = locale::resolve_locale(&resolved.locale)?;
        let currency = match resolved.currency.as_deref() {
            Some(code) => Some(locale::currency_data(code)?),
            None if resolved.style == Style::Currency => {
                return Err(Error::InvalidOptions(
                    "currency is required with the currency style".to_string(),
                ));
            }
            None => None,
        };
        Ok(Self {
            resolved: resolved.clone(),
            symbols,
            currency,
        })
    }

    /// Resolve and build in one step
    pub fn from_options(options: &FormatOptions) -> Result<Self> {
        Self::try_new(&Self::resolve(options)?)
    }

    pub fn resolved_options(&self) -> &ResolvedFormatOptions {
        &self.resolved
    }

    pub fn symbols(&self) -> &LocaleSettings {
        &self.symbols
    }

    /// Format `value` to a string
    pub fn format(&self, value: f64) -> String {
        self.format_to_parts(value)
            .iter()
            .map(|p| p.value.as_str())
            .collect()
    }

    /// Format `value` to its sequence of typed parts
    pub fn format_to_parts(&self, value: f64) -> Vec<NumberPart> {
        let (body, is_zero) = if value.is_nan() {
            (vec![NumberPart::new(PartKind::Nan, &self.symbols.nan)], false)
        } else if value.is_infinite() {
            (
                vec![NumberPart::new(PartKind::Infinity, &self.symbols.infinity)],
                false,
            )
        } else {
            self.number_parts(value)
        };

        let negative = !value.is_nan()
            && value.is_sign_negative()
            && !(is_zero && self.resolved.negative_zero == NegativeZero::AsZero);
        let sign = self.sign_mark(negative, is_zero || value.is_nan());

        let mut parts = Vec::with_capacity(body.len() + 4);
        match sign {
            SignMark::Minus => parts.push(NumberPart::new(
                PartKind::MinusSign,
                &self.symbols.minus_sign,
            )),
            SignMark::Plus => {
                parts.push(NumberPart::new(PartKind::PlusSign, &self.symbols.plus_sign))
            }
            SignMark::Parentheses => parts.push(NumberPart::new(PartKind::Literal, "(")),
            SignMark::None => {}
        }

        match self.resolved.style {
            Style::Percent => {
                let pattern = &self.symbols.percent_pattern;
                self.push_affix(&mut parts, &pattern.prefix, PartKind::PercentSign, &self.symbols.percent_sign);
                parts.extend(body);
                self.push_affix(&mut parts, &pattern.suffix, PartKind::PercentSign, &self.symbols.percent_sign);
            }
            Style::Currency => self.push_currency(&mut parts, body),
            _ => parts.extend(body),
        }

        if sign == SignMark::Parentheses {
            parts.push(NumberPart::new(PartKind::Literal, ")"));
        }
        parts
    }

    fn sign_mark(&self, negative: bool, is_zero: bool) -> SignMark {
        let mark = match self.resolved.sign_display {
            SignDisplay::Auto => {
                if negative {
                    SignMark::Minus
                } else {
                    SignMark::None
                }
            }
            SignDisplay::Always => {
                if negative {
                    SignMark::Minus
                } else {
                    SignMark::Plus
                }
            }
            SignDisplay::ExceptZero => {
                if is_zero {
                    SignMark::None
                } else if negative {
                    SignMark::Minus
                } else {
                    SignMark::Plus
                }
            }
            SignDisplay::Negative => {
                if negative && !is_zero {
                    SignMark::Minus
                } else {
                    SignMark::None
                }
            }
            SignDisplay::Never => SignMark::None,
        };
        if mark == SignMark::Minus && self.resolved.currency_sign == CurrencySign::Accounting {
            SignMark::Parentheses
        } else {
            mark
        }
    }

    fn push_affix(
        &self,
        parts: &mut Vec<NumberPart>,
        affix: &[AffixPart],
        symbol_kind: PartKind,
        symbol: &str,
    ) {
        for part in affix {
            match part {
                AffixPart::Symbol => parts.push(NumberPart::new(symbol_kind, symbol)),
                AffixPart::Literal(text) => parts.push(NumberPart::new(PartKind::Literal, text)),
            }
        }
    }

    fn push_currency(&self, parts: &mut Vec<NumberPart>, body: Vec<NumberPart>) {
        let Some(currency) = &self.currency else {
            parts.extend(body);
            return;
        };

        if self.resolved.currency_display == CurrencyDisplay::Name {
            parts.extend(body);
            parts.push(NumberPart::new(PartKind::Literal, " "));
            parts.push(NumberPart::new(PartKind::Currency, &currency.name));
            return;
        }

        let symbol = match self.resolved.currency_display {
            CurrencyDisplay::Code => currency.code.clone(),
            CurrencyDisplay::NarrowSymbol => currency.narrow_symbol.clone(),
            _ => self.symbols.currency_symbol(currency),
        };
        let pattern: &AffixPattern = &self.symbols.currency_pattern;
        // Alphabetic symbols are separated from the digits
        let spaced = symbol.chars().last().is_some_and(char::is_alphabetic)
            && pattern.prefix.last() == Some(&AffixPart::Symbol);

        self.push_affix(parts, &pattern.prefix, PartKind::Currency, &symbol);
        if spaced {
            parts.push(NumberPart::new(PartKind::Literal, "\u{a0}"));
        }
        parts.extend(body);
        self.push_affix(parts, &pattern.suffix, PartKind::Currency, &symbol);
    }

    /// Digits, separators, exponent and compact suffix of a finite value
    fn number_parts(&self, value: f64) -> (Vec<NumberPart>, bool) {
        let mut digits = DigitString::from_f64(value);
        if self.resolved.style == Style::Percent {
            digits.shift(2);
        }

        match self.resolved.notation {
            Notation::Standard => {
                self.round(&mut digits);
                (self.fixed_parts(&digits), digits.is_zero())
            }
            Notation::Scientific | Notation::Engineering => {
                let step = if self.resolved.notation == Notation::Engineering {
                    3
                } else {
                    1
                };
                let mut exponent = 0;
                if let Some(magnitude) = digits.magnitude() {
                    exponent = magnitude.div_euclid(step) * step;
                    digits.shift(-exponent);
                    self.round(&mut digits);
                    // Rounding may carry into an extra integer digit, e.g. 9.99 → 10.0
                    if digits.magnitude().is_some_and(|m| m >= step) {
                        digits.shift(-step);
                        exponent += step;
                    }
                } else {
                    self.round(&mut digits);
                }

                let mut parts = self.fixed_parts(&digits);
                parts.push(NumberPart::new(
                    PartKind::ExponentSeparator,
                    &self.symbols.exponent_separator,
                ));
                if exponent < 0 {
                    parts.push(NumberPart::new(
                        PartKind::ExponentMinusSign,
                        &self.symbols.minus_sign,
                    ));
                }
                parts.push(NumberPart::new(
                    PartKind::ExponentInteger,
                    exponent.unsigned_abs().to_string(),
                ));
                (parts, digits.is_zero())
            }
            Notation::Compact => {
                let original = digits.clone();
                let mut unit = self.compact_unit(digits.magnitude());
                let exponent = unit.map_or(0, |u| u.exponent);
                digits.shift(-exponent);
                self.round(&mut digits);

                // 999_999 rounds to 1000K; select the unit again for the rounded value
                let rounded_magnitude = digits.magnitude().map(|m| m + exponent);
                let reselected = self.compact_unit(rounded_magnitude);
                if reselected.map(|u| u.exponent) != unit.map(|u| u.exponent) {
                    unit = reselected;
                    digits = original;
                    digits.shift(-unit.map_or(0, |u| u.exponent));
                    self.round(&mut digits);
                }

                let mut parts = self.fixed_parts(&digits);
                if let Some(unit) = unit {
                    let label = unit.suffix.trim_start();
                    let spacing = &unit.suffix[..unit.suffix.len() - label.len()];
                    if !spacing.is_empty() {
                        parts.push(NumberPart::new(PartKind::Literal, spacing));
                    }
                    parts.push(NumberPart::new(PartKind::Compact, label));
                }
                (parts, digits.is_zero())
            }
        }
    }

    /// Largest compact unit not above `magnitude`
    fn compact_unit(&self, magnitude: Option<i32>) -> Option<&CompactUnit> {
        let magnitude = magnitude?;
        self.symbols
            .compact_units
            .iter()
            .rev()
            .find(|u| u.exponent <= magnitude)
    }

    fn round(&self, digits: &mut DigitString) {
        let r = &self.resolved;
        if let Some(max) = r.maximum_significant_digits {
            digits.round_to_significant(max as u32);
        } else if r.compact_rounding {
            if digits.integer_len() >= 2 {
                digits.round_to_fraction(0);
            } else {
                digits.round_to_significant(2);
            }
        } else {
            digits.round_to_fraction(r.maximum_fraction_digits as u32);
        }
    }

    /// Integer groups and fraction of an already rounded digit string
    fn fixed_parts(&self, digits: &DigitString) -> Vec<NumberPart> {
        let r = &self.resolved;
        let (mut integer, mut fraction) = digits.split();

        if let Some(min_sig) = r.minimum_significant_digits {
            let shown = if digits.is_zero() {
                1 + fraction.len()
            } else if !integer.is_empty() {
                integer.len() + fraction.len()
            } else {
                fraction.trim_start_matches('0').len()
            };
            for _ in shown..min_sig as usize {
                fraction.push('0');
            }
        } else if !r.compact_rounding {
            while fraction.len() < r.minimum_fraction_digits as usize {
                fraction.push('0');
            }
        }

        if r.trailing_zero_display == TrailingZeroDisplay::StripIfInteger
            && fraction.chars().all(|c| c == '0')
        {
            fraction.clear();
        }

        while integer.len() < r.minimum_integer_digits as usize {
            integer.insert(0, '0');
        }

        let mut parts = Vec::new();
        if r.use_grouping && integer.len() > 3 {
            let head = integer.len() % 3;
            let mut chunks: Vec<&str> = Vec::new();
            if head > 0 {
                chunks.push(&integer[..head]);
            }
            let mut i = head;
            while i < integer.len() {
                chunks.push(&integer[i..i + 3]);
                i += 3;
            }
            for (i, chunk) in chunks.iter().enumerate() {
                if i > 0 {
                    parts.push(NumberPart::new(PartKind::Group, &self.symbols.group));
                }
                parts.push(NumberPart::new(PartKind::Integer, *chunk));
            }
        } else {
            parts.push(NumberPart::new(PartKind::Integer, integer));
        }

        if !fraction.is_empty() {
            parts.push(NumberPart::new(PartKind::Decimal, &self.symbols.decimal));
            parts.push(NumberPart::new(PartKind::Fraction, fraction));
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: f64, options: FormatOptions) -> String {
        NativeNumberFormat::from_options(&options)
            .unwrap()
            .format(value)
    }

    #[test]
    fn test_decimal_defaults() {
        assert_eq!(fmt(1234.5678, FormatOptions::new()), "1,234.568");
        assert_eq!(fmt(-0.5, FormatOptions::new()), "-0.5");
        assert_eq!(fmt(0.0, FormatOptions::new()), "0");
        assert_eq!(fmt(1234567.0, FormatOptions::new().with_use_grouping(false)), "1234567");
    }

    #[test]
    fn test_percent_and_currency() {
        let percent = FormatOptions::new().with_style(Style::Percent);
        assert_eq!(fmt(0.1234, percent.clone()), "12%");
        assert_eq!(fmt(0.1234, percent.with_maximum_fraction_digits(2)), "12.34%");

        let usd = FormatOptions::new()
            .with_style(Style::Currency)
            .with_currency("USD");
        assert_eq!(fmt(1234.5, usd.clone()), "$1,234.50");
        assert_eq!(fmt(-1234.5, usd.clone()), "-$1,234.50");

        let code = usd.with_currency_display(CurrencyDisplay::Code);
        assert_eq!(fmt(1.0, code), "USD\u{a0}1.00");

        let eur_de = FormatOptions::new()
            .with_locale("de-DE")
            .with_style(Style::Currency)
            .with_currency("EUR");
        assert_eq!(fmt(1234.5, eur_de), "1.234,50\u{a0}€");
    }

    #[test]
    fn test_accounting_sign() {
        let mut options = FormatOptions::new()
            .with_style(Style::Currency)
            .with_currency("USD");
        options.currency_sign = Some(CurrencySign::Accounting);
        assert_eq!(fmt(-5.0, options), "($5.00)");
    }

    #[test]
    fn test_scientific_and_engineering() {
        let sci = FormatOptions::new().with_notation(Notation::Scientific);
        assert_eq!(fmt(123456.0, sci.clone()), "1.235E5");
        assert_eq!(fmt(0.00123, sci.clone()), "1.23E-3");
        assert_eq!(fmt(0.0, sci.clone()), "0E0");
        assert_eq!(fmt(9.9999, sci.with_maximum_fraction_digits(2)), "1E1");

        let eng = FormatOptions::new().with_notation(Notation::Engineering);
        assert_eq!(fmt(123456.0, eng), "123.456E3");
    }

    #[test]
    fn test_compact() {
        let compact = FormatOptions::new().with_notation(Notation::Compact);
        assert_eq!(fmt(1234.0, compact.clone()), "1.2K");
        assert_eq!(fmt(12345.0, compact.clone()), "12K");
        assert_eq!(fmt(123456.0, compact.clone()), "123K");
        assert_eq!(fmt(999999.0, compact.clone()), "1M");
        assert_eq!(fmt(1.5e9, compact.clone()), "1.5B");
        assert_eq!(fmt(999.0, compact.clone()), "999");

        let zh = compact.with_locale("zh-CN");
        assert_eq!(fmt(123456.0, zh), "12万");
    }

    #[test]
    fn test_sign_display() {
        let always = FormatOptions::new().with_sign_display(SignDisplay::Always);
        assert_eq!(fmt(5.0, always.clone()), "+5");
        assert_eq!(fmt(0.0, always), "+0");

        let except_zero = FormatOptions::new().with_sign_display(SignDisplay::ExceptZero);
        assert_eq!(fmt(0.0, except_zero.clone()), "0");
        assert_eq!(fmt(-1.0, except_zero), "-1");
    }

    #[test]
    fn test_negative_zero() {
        let options = FormatOptions::new().with_maximum_fraction_digits(2);
        assert_eq!(fmt(-0.0001, options.clone()), "0");

        let mut keep = options;
        keep.extend.negative_zero = Some(NegativeZero::Keep);
        assert_eq!(fmt(-0.0001, keep.clone()), "-0");
        assert_eq!(fmt(-0.0, keep), "-0");
    }

    #[test]
    fn test_significant_digits() {
        let options = FormatOptions::new().with_significant_digits(3, 3);
        assert_eq!(fmt(1.0, options.clone()), "1.00");
        assert_eq!(fmt(123456.0, options.clone()), "123,000");
        assert_eq!(fmt(0.0, options), "0.00");
    }

    #[test]
    fn test_resolve_errors() {
        let bad_digits = FormatOptions::new().with_fraction_digits(5, 2);
        assert!(matches!(
            NativeNumberFormat::resolve(&bad_digits),
            Err(Error::InvalidOptions(_))
        ));

        let bad_currency = FormatOptions::new()
            .with_style(Style::Currency)
            .with_currency("DOLLARS");
        assert!(matches!(
            NativeNumberFormat::resolve(&bad_currency),
            Err(Error::InvalidCurrency(_))
        ));

        let bad_locale = FormatOptions::new().with_locale("!!");
        assert!(matches!(
            NativeNumberFormat::resolve(&bad_locale),
            Err(Error::InvalidLocale(_))
        ));
    }

    #[test]
    fn test_resolved_extension_style() {
        let resolved =
            NativeNumberFormat::resolve(&FormatOptions::new().with_style(Style::PerMille)).unwrap();
        assert_eq!(resolved.style, Style::Decimal);
        assert_eq!(resolved.original_style, Some(Style::PerMille));
        assert_eq!(resolved.locale, "en-US");
    }
}
