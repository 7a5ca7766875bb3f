//! Type definitions for the format/parse pipeline
//!
//! This module defines the option surface shared by the formatter, the parser
//! and the specifier resolver, plus the result shapes both pipelines produce.

use serde::{Deserialize, Serialize};

/// Display style of a formatted number
///
/// The first three styles are rendered directly by the base formatter. The
/// remaining ones are extension styles implemented by plugins on top of the
/// base `Decimal` style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Decimal,
    Percent,
    Currency,
    /// Value × 1000 followed by ‰
    PerMille,
    /// Value × 10000 followed by ‱
    PerMyriad,
    /// Value × 100 followed by pp
    PercentagePoint,
    /// Chinese financial (uppercase) numerals
    LocalizedUppercase,
}

impl Style {
    /// Checks if the style is implemented by plugins rather than the base formatter
    pub fn is_extension(self) -> bool {
        matches!(
            self,
            Style::PerMille | Style::PerMyriad | Style::PercentagePoint | Style::LocalizedUppercase
        )
    }

    /// The style handed to the base formatter
    pub fn native(self) -> Style {
        if self.is_extension() {
            Style::Decimal
        } else {
            self
        }
    }

    pub fn is_ratio(self) -> bool {
        matches!(
            self,
            Style::PerMille | Style::PerMyriad | Style::PercentagePoint
        )
    }
}

/// Notation used for the numeric part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    #[default]
    Standard,
    Scientific,
    Engineering,
    Compact,
}

/// When to display the sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignDisplay {
    #[default]
    Auto,
    Always,
    ExceptZero,
    Negative,
    Never,
}

/// How the currency is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CurrencyDisplay {
    #[default]
    Symbol,
    NarrowSymbol,
    Code,
    Name,
}

/// Negative rendering for currency amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CurrencySign {
    #[default]
    Standard,
    /// Negative amounts wrapped in parentheses
    Accounting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrailingZeroDisplay {
    #[default]
    Auto,
    StripIfInteger,
}

/// Sign handling of zero when `extend_includeSign` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignZeroMode {
    /// Zero is shown without a sign
    #[default]
    Auto,
    /// Zero is shown as +0
    Always,
}

/// Rendering of negative zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NegativeZero {
    #[default]
    AsZero,
    Keep,
}

/// Whether configuration errors are raised or silently corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Development,
    Production,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ExecutionMode::Development
        } else {
            ExecutionMode::Production
        }
    }
}

/// Settings of the dynamic-decimals extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DynamicDecimalsOptions {
    pub enabled: bool,
    /// Largest fraction digit count before switching to the fallback notation
    pub max_fraction_digits: u8,
    /// Digits shown after the first non-zero fraction digit
    pub additional_digits: u8,
    pub fallback_notation: Notation,
    pub fallback_maximum_fraction_digits: u8,
    /// Styles the extension applies to; empty means every style
    pub apply_to_styles: Vec<Style>,
}

impl Default for DynamicDecimalsOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_fraction_digits: 20,
            additional_digits: 0,
            fallback_notation: Notation::Scientific,
            fallback_maximum_fraction_digits: 2,
            apply_to_styles: Vec::new(),
        }
    }
}

/// Namespaced extension options understood only by plugins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendOptions {
    #[serde(rename = "extend_includeSign", default)]
    pub include_sign: Option<bool>,
    #[serde(rename = "extend_signZeroMode", default)]
    pub sign_zero_mode: Option<SignZeroMode>,
    #[serde(rename = "extend_negativeZero", default)]
    pub negative_zero: Option<NegativeZero>,
    #[serde(rename = "extend_fixDecimals", default)]
    pub fix_decimals: Option<u8>,
    #[serde(rename = "extend_dynamicDecimals", default)]
    pub dynamic_decimals: Option<DynamicDecimalsOptions>,
}

impl ExtendOptions {
    fn merged_over(&self, base: &ExtendOptions) -> ExtendOptions {
        ExtendOptions {
            include_sign: self.include_sign.or(base.include_sign),
            sign_zero_mode: self.sign_zero_mode.or(base.sign_zero_mode),
            negative_zero: self.negative_zero.or(base.negative_zero),
            fix_decimals: self.fix_decimals.or(base.fix_decimals),
            dynamic_decimals: self
                .dynamic_decimals
                .clone()
                .or_else(|| base.dynamic_decimals.clone()),
        }
    }
}

/// Caller-facing format options
///
/// Every field is optional; unset fields are filled from context defaults and
/// then from the per-style defaults of the base formatter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatOptions {
    pub locale: Option<String>,
    pub style: Option<Style>,
    pub currency: Option<String>,
    pub currency_display: Option<CurrencyDisplay>,
    pub currency_sign: Option<CurrencySign>,
    pub notation: Option<Notation>,
    pub sign_display: Option<SignDisplay>,
    pub use_grouping: Option<bool>,
    pub minimum_integer_digits: Option<u8>,
    pub minimum_fraction_digits: Option<u8>,
    pub maximum_fraction_digits: Option<u8>,
    pub minimum_significant_digits: Option<u8>,
    pub maximum_significant_digits: Option<u8>,
    pub trailing_zero_display: Option<TrailingZeroDisplay>,
    #[serde(flatten)]
    pub extend: ExtendOptions,
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_currency_display(mut self, display: CurrencyDisplay) -> Self {
        self.currency_display = Some(display);
        self
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = Some(notation);
        self
    }

    pub fn with_sign_display(mut self, sign_display: SignDisplay) -> Self {
        self.sign_display = Some(sign_display);
        self
    }

    pub fn with_use_grouping(mut self, use_grouping: bool) -> Self {
        self.use_grouping = Some(use_grouping);
        self
    }

    pub fn with_minimum_fraction_digits(mut self, digits: u8) -> Self {
        self.minimum_fraction_digits = Some(digits);
        self
    }

    pub fn with_maximum_fraction_digits(mut self, digits: u8) -> Self {
        self.maximum_fraction_digits = Some(digits);
        self
    }

    /// Sets both fraction digit bounds
    pub fn with_fraction_digits(self, min: u8, max: u8) -> Self {
        self.with_minimum_fraction_digits(min)
            .with_maximum_fraction_digits(max)
    }

    pub fn with_significant_digits(mut self, min: u8, max: u8) -> Self {
        self.minimum_significant_digits = Some(min);
        self.maximum_significant_digits = Some(max);
        self
    }

    pub fn with_extend(mut self, extend: ExtendOptions) -> Self {
        self.extend = extend;
        self
    }

    pub fn has_fraction_digits(&self) -> bool {
        self.minimum_fraction_digits.is_some() || self.maximum_fraction_digits.is_some()
    }

    pub fn has_significant_digits(&self) -> bool {
        self.minimum_significant_digits.is_some() || self.maximum_significant_digits.is_some()
    }

    /// Returns a copy in which every field set on `self` wins over `base`
    pub fn merged_over(&self, base: &FormatOptions) -> FormatOptions {
        FormatOptions {
            locale: self.locale.clone().or_else(|| base.locale.clone()),
            style: self.style.or(base.style),
            currency: self.currency.clone().or_else(|| base.currency.clone()),
            currency_display: self.currency_display.or(base.currency_display),
            currency_sign: self.currency_sign.or(base.currency_sign),
            notation: self.notation.or(base.notation),
            sign_display: self.sign_display.or(base.sign_display),
            use_grouping: self.use_grouping.or(base.use_grouping),
            minimum_integer_digits: self.minimum_integer_digits.or(base.minimum_integer_digits),
            minimum_fraction_digits: self
                .minimum_fraction_digits
                .or(base.minimum_fraction_digits),
            maximum_fraction_digits: self
                .maximum_fraction_digits
                .or(base.maximum_fraction_digits),
            minimum_significant_digits: self
                .minimum_significant_digits
                .or(base.minimum_significant_digits),
            maximum_significant_digits: self
                .maximum_significant_digits
                .or(base.maximum_significant_digits),
            trailing_zero_display: self.trailing_zero_display.or(base.trailing_zero_display),
            extend: self.extend.merged_over(&base.extend),
        }
    }
}

/// Fully resolved options of one formatter
///
/// `style` is always a base style; the requested extension style, if any, is
/// kept in `original_style`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFormatOptions {
    pub locale: String,
    pub style: Style,
    pub currency: Option<String>,
    pub currency_display: CurrencyDisplay,
    pub currency_sign: CurrencySign,
    pub notation: Notation,
    pub sign_display: SignDisplay,
    pub use_grouping: bool,
    pub minimum_integer_digits: u8,
    pub minimum_fraction_digits: u8,
    pub maximum_fraction_digits: u8,
    pub minimum_significant_digits: Option<u8>,
    pub maximum_significant_digits: Option<u8>,
    pub trailing_zero_display: TrailingZeroDisplay,
    /// Compact notation without explicit digit options uses compact rounding
    pub compact_rounding: bool,
    pub negative_zero: NegativeZero,
    pub original_style: Option<Style>,
    pub include_sign: bool,
}

/// Classification of the raw input of a format call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueState {
    Valid,
    Null,
    Undefined,
    NotANumber,
    PositiveInfinity,
    NegativeInfinity,
}

impl ValueState {
    pub fn of(value: f64) -> Self {
        if value.is_nan() {
            ValueState::NotANumber
        } else if value == f64::INFINITY {
            ValueState::PositiveInfinity
        } else if value == f64::NEG_INFINITY {
            ValueState::NegativeInfinity
        } else {
            ValueState::Valid
        }
    }

    pub fn is_valid(self) -> bool {
        self == ValueState::Valid
    }
}

/// Untyped input of a format call
#[derive(Debug, Clone, PartialEq)]
pub enum NumericInput {
    Number(f64),
    /// Text that is read as a number when it holds one
    Text(String),
    Null,
    Undefined,
}

impl NumericInput {
    /// The numeric value seen by the pipeline (NaN for missing values)
    pub fn numeric_value(&self) -> f64 {
        match self {
            NumericInput::Number(v) => *v,
            NumericInput::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            NumericInput::Null | NumericInput::Undefined => f64::NAN,
        }
    }

    pub fn value_state(&self) -> ValueState {
        match self {
            NumericInput::Null => ValueState::Null,
            NumericInput::Undefined => ValueState::Undefined,
            _ => ValueState::of(self.numeric_value()),
        }
    }
}

impl From<f64> for NumericInput {
    fn from(v: f64) -> Self {
        NumericInput::Number(v)
    }
}

impl From<f32> for NumericInput {
    fn from(v: f32) -> Self {
        NumericInput::Number(v as f64)
    }
}

impl From<i32> for NumericInput {
    fn from(v: i32) -> Self {
        NumericInput::Number(v as f64)
    }
}

impl From<i64> for NumericInput {
    fn from(v: i64) -> Self {
        NumericInput::Number(v as f64)
    }
}

impl From<u32> for NumericInput {
    fn from(v: u32) -> Self {
        NumericInput::Number(v as f64)
    }
}

impl From<Option<f64>> for NumericInput {
    fn from(v: Option<f64>) -> Self {
        v.map_or(NumericInput::Null, NumericInput::Number)
    }
}

impl From<&str> for NumericInput {
    fn from(v: &str) -> Self {
        NumericInput::Text(v.to_string())
    }
}

impl From<String> for NumericInput {
    fn from(v: String) -> Self {
        NumericInput::Text(v)
    }
}

impl From<rust_decimal::Decimal> for NumericInput {
    fn from(v: rust_decimal::Decimal) -> Self {
        NumericInput::Number(crate::decimal::to_f64(v))
    }
}

/// Kind of one segment of a formatted number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PartKind {
    Integer,
    Group,
    Decimal,
    Fraction,
    MinusSign,
    PlusSign,
    PercentSign,
    Currency,
    Literal,
    ExponentSeparator,
    ExponentMinusSign,
    ExponentInteger,
    Compact,
    Nan,
    Infinity,
    /// Suffix appended by an extension style
    Unit,
}

/// One segment of a formatted number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberPart {
    pub kind: PartKind,
    pub value: String,
}

impl NumberPart {
    pub fn new(kind: PartKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// The (string, parts) pair threaded through the format and post-process phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutput {
    pub formatted: String,
    pub parts: Vec<NumberPart>,
}

impl FormatOutput {
    pub fn from_parts(parts: Vec<NumberPart>) -> Self {
        let formatted = parts.iter().map(|p| p.value.as_str()).collect();
        Self { formatted, parts }
    }

    /// The literal output used when formatting could not run
    pub fn nan() -> Self {
        Self::from_parts(vec![NumberPart::new(PartKind::Nan, "NaN")])
    }
}

/// Result of a format call. Always well formed, even for invalid input.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatResult {
    pub formatted: String,
    pub parts: Vec<NumberPart>,
    pub value_state: ValueState,
    /// Set when the pipeline had to short-circuit
    pub error: Option<String>,
}

/// Caller-facing parse options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    pub locale: Option<String>,
    pub style: Option<Style>,
    pub currency: Option<String>,
    pub notation: Option<Notation>,
    pub strict: bool,
    pub group_separator: Option<String>,
    pub decimal_separator: Option<String>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = Some(notation);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Result of a parse call
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// Parsed value, NaN on failure
    pub value: f64,
    pub success: bool,
    pub input: String,
    pub error: Option<String>,
    /// -1, 0 or 1; 0 for NaN
    pub sign: i8,
    pub is_zero: bool,
    pub is_negative_zero: bool,
    pub is_integer: bool,
}

impl ParseResult {
    pub fn success(input: impl Into<String>, value: f64) -> Self {
        Self {
            value,
            success: true,
            input: input.into(),
            error: None,
            sign: 0,
            is_zero: false,
            is_negative_zero: false,
            is_integer: false,
        }
    }

    pub fn failure(input: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            value: f64::NAN,
            success: false,
            input: input.into(),
            error: Some(error.into()),
            sign: 0,
            is_zero: false,
            is_negative_zero: false,
            is_integer: false,
        }
    }

    /// Derives the classification fields from `value`
    pub fn decorate(mut self) -> Self {
        let v = self.value;
        self.sign = if v.is_nan() || v == 0.0 {
            0
        } else if v < 0.0 {
            -1
        } else {
            1
        };
        self.is_zero = v == 0.0;
        self.is_negative_zero = v == 0.0 && v.is_sign_negative();
        self.is_integer = v.is_finite() && v.fract() == 0.0;
        self
    }
}
