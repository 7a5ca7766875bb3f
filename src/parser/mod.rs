//! Number parsing pipeline
//!
//! [`NumberParser`] reverses what the formatter produces: pre-parse plugins
//! normalize the input (strip ratio suffixes, convert uppercase numerals), a
//! decoder chosen by notation and style reads the number, and post-parse
//! plugins adjust the value (undo ratio scaling).
//!
//! Parsing never returns an error. Failures are reported through
//! [`ParseResult::success`] and [`ParseResult::error`].

pub mod auto;
pub mod decode;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::formatter::native::NativeNumberFormat;
use crate::locale::{self, LocaleSettings};
use crate::plugin::registry::PluginRegistry;
use crate::plugin::{ParseContext, Phase, PluginHandler, PreParseOutcome, ratio};
use crate::types::{FormatOptions, Notation, NumericInput, ParseOptions, ParseResult, PartKind, Style};

use decode::{Decoded, Separators};

/// Value of a recognized special literal; `None` for ordinary input
fn special_literal(text: &str, symbols: &LocaleSettings) -> Option<f64> {
    match text {
        "∞" | "+∞" | "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-∞" | "\u{2212}∞" | "-Infinity" => Some(f64::NEG_INFINITY),
        "N/A" | "NA" | "-" | "--" | "—" | "NaN" => Some(f64::NAN),
        _ if text == symbols.infinity => Some(f64::INFINITY),
        _ if text == symbols.nan => Some(f64::NAN),
        _ => None,
    }
}

/// Separators of `symbols`, read back from a formatted sample
fn sample_separators(symbols: &LocaleSettings) -> Separators {
    let options = FormatOptions::new()
        .with_locale(symbols.id.replace('_', "-"))
        .with_use_grouping(true)
        .with_fraction_digits(1, 1);
    let Ok(native) = NativeNumberFormat::from_options(&options) else {
        return Separators {
            group: symbols.group.clone(),
            decimal: symbols.decimal.clone(),
        };
    };

    let parts = native.format_to_parts(1234567.5);
    let find = |kind: PartKind, default: &str| {
        parts
            .iter()
            .find(|p| p.kind == kind)
            .map_or_else(|| default.to_string(), |p| p.value.clone())
    };
    Separators {
        group: find(PartKind::Group, &symbols.group),
        decimal: find(PartKind::Decimal, &symbols.decimal),
    }
}

/// Currency symbols to look for, most specific first
fn currency_symbols(options: &ParseOptions, symbols: &LocaleSettings) -> Vec<String> {
    let mut list = Vec::new();
    if let Some(currency) = options
        .currency
        .as_deref()
        .and_then(|code| locale::currency_data(code).ok())
    {
        list.push(symbols.currency_symbol(&currency));
        list.push(currency.symbol.clone());
        list.push(currency.narrow_symbol.clone());
        list.push(currency.code.clone());
    }
    for symbol in locale::known_currency_symbols() {
        if !list.contains(&symbol) {
            list.push(symbol);
        }
    }
    list.retain(|s| !s.is_empty());
    // Longest first so "US$" is stripped whole rather than leaving "US"
    list.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));
    list
}

/// A configured number parser
pub struct NumberParser {
    options: Arc<ParseOptions>,
    style: Style,
    notation: Notation,
    symbols: LocaleSettings,
    separators: Separators,
    currency_symbols: Vec<String>,
    compact_units: Vec<(String, i32)>,
    registry: Arc<PluginRegistry>,
}

impl std::fmt::Debug for NumberParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NumberParser")
            .field("options", &self.options)
            .field("separators", &self.separators)
            .finish_non_exhaustive()
    }
}

impl NumberParser {
    /// Create a parser for `options`
    ///
    /// An unusable locale falls back to the default locale.
    pub fn new(options: &ParseOptions, registry: Arc<PluginRegistry>) -> Self {
        let tag = options
            .locale
            .clone()
            .unwrap_or_else(|| locale::DEFAULT_LOCALE.to_string());
        let symbols = locale::resolve_locale(&tag).unwrap_or_else(|e| {
            debug!(locale = %tag, error = %e, "Parser falls back to the default locale");
            locale::get_locale_settings(locale::DEFAULT_LOCALE).unwrap_or_default()
        });

        let sampled = sample_separators(&symbols);
        let separators = Separators {
            group: options.group_separator.clone().unwrap_or(sampled.group),
            decimal: options.decimal_separator.clone().unwrap_or(sampled.decimal),
        };

        Self {
            style: options.style.unwrap_or_default(),
            notation: options.notation.unwrap_or_default(),
            currency_symbols: currency_symbols(options, &symbols),
            compact_units: decode::compact_units(&symbols.compact_units),
            options: Arc::new(options.clone()),
            symbols,
            separators,
            registry,
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn separators(&self) -> &Separators {
        &self.separators
    }

    /// Parse untyped input; anything but text is rejected
    pub fn parse_input(&self, input: &NumericInput) -> ParseResult {
        match input {
            NumericInput::Text(text) => self.parse(text),
            other => ParseResult::failure(format!("{other:?}"), "Input must be a string").decorate(),
        }
    }

    /// Parse a formatted number
    ///
    /// # Arguments
    /// * `input` - The formatted number, e.g. `"1,234.5"` or `"12.3‰"`
    ///
    /// # Returns
    /// * `ParseResult` - The value and its classification, or the failure
    pub fn parse(&self, input: &str) -> ParseResult {
        let ctx = ParseContext {
            input: input.to_string(),
            style: self.style,
            options: self.options.clone(),
            strict: self.options.strict,
            group_separator: self.separators.group.clone(),
            decimal_separator: self.separators.decimal.clone(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ParseResult::failure(input, "Empty input").decorate();
        }

        // Pre-parse plugins see special literals before they are matched
        let text = match self.pre_parse(trimmed.to_string(), &ctx) {
            Ok(text) => text,
            Err(message) => match special_literal(trimmed, &self.symbols) {
                Some(value) => return ParseResult::success(input, value).decorate(),
                None => return ParseResult::failure(input, message).decorate(),
            },
        };
        let result = match special_literal(text.trim(), &self.symbols) {
            Some(value) => ParseResult::success(input, value),
            None => match self.decode(&text) {
                Ok(value) => ParseResult::success(input, value),
                Err(message) => {
                    debug!(input, %message, "Parse failed");
                    return ParseResult::failure(input, message).decorate();
                }
            },
        };

        self.post_parse(result, &ctx).decorate()
    }

    fn pre_parse(&self, mut text: String, ctx: &ParseContext) -> Result<String, String> {
        for plugin in self.registry.ordered_for_phase(Phase::PreParse) {
            let PluginHandler::PreParse(handler) = plugin.handler() else {
                continue;
            };
            if !handler.is_applicable(ctx) {
                continue;
            }
            match handler.process_parse_input(text, ctx) {
                PreParseOutcome::Continue(next) => text = next,
                PreParseOutcome::Reject(message) => {
                    debug!(plugin = plugin.name(), %message, "Input rejected");
                    return Err(message);
                }
            }
        }
        Ok(text)
    }

    fn post_parse(&self, mut result: ParseResult, ctx: &ParseContext) -> ParseResult {
        for plugin in self.registry.ordered_for_phase(Phase::PostParse) {
            let PluginHandler::PostParse(handler) = plugin.handler() else {
                continue;
            };
            if !handler.is_applicable(ctx) {
                continue;
            }
            match handler.process_parse_result(result.clone(), ctx) {
                Ok(next) => result = next,
                Err(e) => warn!(
                    plugin = plugin.name(),
                    error = %e,
                    "Post-parse plugin failed; keeping previous result"
                ),
            }
        }
        result
    }

    fn decode(&self, text: &str) -> Decoded {
        let strict = self.options.strict;
        let separators = &self.separators;
        match self.notation {
            Notation::Compact => {
                return decode::decode_compact(text, separators, &self.compact_units, strict);
            }
            Notation::Scientific | Notation::Engineering => {
                return decode::decode_scientific(
                    text,
                    separators,
                    &self.symbols.exponent_separator,
                    strict,
                );
            }
            Notation::Standard => {}
        }

        match self.style {
            Style::Percent => {
                decode::decode_percent(text, separators, &self.symbols.percent_sign, strict)
            }
            Style::Currency => {
                decode::decode_currency(text, separators, &self.currency_symbols, strict)
            }
            style => match ratio::for_style(style) {
                Some(spec) => {
                    let body = spec.strip_suffix(text).unwrap_or(text);
                    if strict {
                        let exp = spec.multiplier.ilog10() as i32;
                        decode::decode_scaled(body, separators, true, -exp)
                    } else {
                        decode::decode_decimal(body, separators, false)
                    }
                }
                None => decode::decode_decimal(text, separators, strict),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::BuiltinSettings;

    fn parser(options: ParseOptions) -> NumberParser {
        let registry = Arc::new(PluginRegistry::with_defaults(&BuiltinSettings::default()));
        NumberParser::new(&options, registry)
    }

    #[test]
    fn test_separators_from_locale() {
        let de = parser(ParseOptions::new().with_locale("de-DE"));
        assert_eq!(de.separators().group, ".");
        assert_eq!(de.separators().decimal, ",");

        let mut options = ParseOptions::new().with_locale("de-DE");
        options.decimal_separator = Some(".".to_string());
        options.group_separator = Some(",".to_string());
        let overridden = parser(options);
        assert_eq!(overridden.separators().decimal, ".");
    }

    #[test]
    fn test_parse_decimal() {
        let p = parser(ParseOptions::new());
        let result = p.parse(" 1,234.5 ");
        assert!(result.success);
        assert_eq!(result.value, 1234.5);
        assert_eq!(result.sign, 1);
        assert!(!result.is_integer);

        let result = parser(ParseOptions::new().with_locale("de-DE")).parse("-1.234,5");
        assert_eq!(result.value, -1234.5);
        assert_eq!(result.sign, -1);
    }

    #[test]
    fn test_parse_failures() {
        let p = parser(ParseOptions::new());
        let empty = p.parse("   ");
        assert!(!empty.success);
        assert!(empty.value.is_nan());
        assert!(empty.error.is_some());

        assert!(!p.parse("abc").success);
        assert!(!parser(ParseOptions::new().strict(true)).parse("12abc").success);
        assert!(!p.parse_input(&NumericInput::Number(1.0)).success);
    }

    #[test]
    fn test_special_literals() {
        let p = parser(ParseOptions::new());
        assert_eq!(p.parse("∞").value, f64::INFINITY);
        assert_eq!(p.parse("-Infinity").value, f64::NEG_INFINITY);
        for placeholder in ["N/A", "NA", "-", "--", "—", "NaN"] {
            let result = p.parse(placeholder);
            assert!(result.success, "{placeholder}");
            assert!(result.value.is_nan());
            assert_eq!(result.error, None);
            assert_eq!(result.sign, 0);
        }

        // A rejecting pre-parse plugin does not hide a literal
        let strict = parser(ParseOptions::new().with_style(Style::PerMille).strict(true));
        assert!(strict.parse("N/A").value.is_nan());
        assert!(strict.parse("N/A").success);
        assert_eq!(strict.parse("∞‰").value, f64::INFINITY);
    }

    #[test]
    fn test_pre_parse_rewrites_literals() {
        let registry = Arc::new(PluginRegistry::with_defaults(&BuiltinSettings::default()));
        registry.register(crate::plugin::Plugin::pre_parse(
            "infinity-as-max",
            |input: String, _ctx: &ParseContext| {
                if input == "∞" {
                    PreParseOutcome::Continue("1,000".to_string())
                } else {
                    PreParseOutcome::Continue(input)
                }
            },
        ), None);
        let p = NumberParser::new(&ParseOptions::new(), registry);
        assert_eq!(p.parse("∞").value, 1000.0);
        assert_eq!(p.parse("-∞").value, f64::NEG_INFINITY);
    }

    #[test]
    fn test_parse_negative_zero() {
        let result = parser(ParseOptions::new()).parse("-0");
        assert!(result.is_zero);
        assert!(result.is_negative_zero);
        assert_eq!(result.sign, 0);
    }

    #[test]
    fn test_parse_styles() {
        let percent = parser(ParseOptions::new().with_style(Style::Percent));
        assert_eq!(percent.parse("12.5%").value, 0.125);

        let currency = parser(ParseOptions::new().with_style(Style::Currency).with_currency("USD"));
        assert_eq!(currency.parse("$1,234.50").value, 1234.5);
        assert_eq!(currency.parse("($5.00)").value, -5.0);
        assert_eq!(currency.parse("-US$3").value, -3.0);

        let compact = parser(ParseOptions::new().with_notation(Notation::Compact));
        assert_eq!(compact.parse("1.2K").value, 1200.0);
        assert!(!compact.parse("1.2Q").success);

        let scientific = parser(ParseOptions::new().with_notation(Notation::Scientific));
        assert_eq!(scientific.parse("1.235E5").value, 123500.0);
    }

    #[test]
    fn test_parse_ratio() {
        let per_mille = parser(ParseOptions::new().with_style(Style::PerMille));
        assert_eq!(per_mille.parse("123‰").value, 0.123);
        assert_eq!(per_mille.parse("123").value, 0.123);

        let strict = parser(ParseOptions::new().with_style(Style::PerMille).strict(true));
        assert_eq!(strict.parse("123‰").value, 0.123);
        let missing = strict.parse("123");
        assert!(!missing.success);
        assert_eq!(missing.error.as_deref(), Some("Expected per-mille sign (‰)"));

        let pp = parser(ParseOptions::new().with_style(Style::PercentagePoint));
        assert_eq!(pp.parse("12.34pp").value, 0.1234);
    }

    #[test]
    fn test_parse_uppercase() {
        let p = parser(ParseOptions::new().with_style(Style::LocalizedUppercase));
        assert_eq!(p.parse("壹仟贰佰叁拾肆点伍陆").value, 1234.56);
        assert_eq!(p.parse("负叁拾贰").value, -32.0);
        assert!(!p.parse("壹壹").success);
        assert_eq!(p.parse("42").value, 42.0);

        let strict = parser(
            ParseOptions::new()
                .with_style(Style::LocalizedUppercase)
                .strict(true),
        );
        assert!(!strict.parse("42").success);
    }
}
