//! Fraction digit extensions: fixed decimals and dynamic decimals

use tracing::trace;

use crate::error::Result;
use crate::formatter::digits::DigitString;
use crate::formatter::native::NativeNumberFormat;
use crate::plugin::{FormatContext, Plugin, PreProcessHandler};
use crate::types::{FormatOptions, Notation, Style};

pub const FIXED_DECIMALS: &str = "fixed-decimals";
pub const DYNAMIC_DECIMALS: &str = "dynamic-decimals";

/// Fraction digits scanned for the first significant digit
pub const MAX_SCANNED_DIGITS: usize = 100;

struct FixedDecimals;

impl PreProcessHandler for FixedDecimals {
    fn is_applicable(&self, ctx: &FormatContext) -> bool {
        ctx.extend().fix_decimals.is_some()
    }

    fn process_options(&self, mut options: FormatOptions, _ctx: &FormatContext) -> Result<FormatOptions> {
        if let Some(digits) = options.extend.fix_decimals {
            options.minimum_fraction_digits = Some(digits);
            options.maximum_fraction_digits = Some(digits);
            options.minimum_significant_digits = None;
            options.maximum_significant_digits = None;
        }
        Ok(options)
    }
}

/// Where the first significant digit of a displayed value sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leading {
    /// The value has integer digits
    Integer,
    /// 1-based position of the first non-zero fraction digit
    Fraction(usize),
    /// No non-zero digit within [`MAX_SCANNED_DIGITS`]
    Beyond,
}

/// Locate the first significant digit of `value` as `style` displays it
fn leading_digit(value: f64, style: Style) -> Leading {
    let mut digits = DigitString::from_f64(value);
    if style == Style::Percent {
        digits.shift(2);
    }
    let (integer, fraction) = digits.split();
    if !integer.is_empty() {
        return Leading::Integer;
    }
    fraction
        .bytes()
        .take(MAX_SCANNED_DIGITS)
        .position(|b| b != b'0')
        .map_or(Leading::Beyond, |i| Leading::Fraction(i + 1))
}

struct DynamicDecimals;

impl PreProcessHandler for DynamicDecimals {
    fn is_applicable(&self, ctx: &FormatContext) -> bool {
        let Some(dynamic) = &ctx.extend().dynamic_decimals else {
            return false;
        };
        let abs = ctx.value.abs();
        dynamic.enabled
            && abs > 0.0
            && abs < 1.0
            && !ctx.options.has_significant_digits()
            && ctx.options.notation.unwrap_or_default() == Notation::Standard
            && (dynamic.apply_to_styles.is_empty() || dynamic.apply_to_styles.contains(&ctx.style))
            && ctx.extend().fix_decimals.is_none()
    }

    fn process_options(&self, mut options: FormatOptions, ctx: &FormatContext) -> Result<FormatOptions> {
        let Some(dynamic) = options.extend.dynamic_decimals.clone() else {
            return Ok(options);
        };

        let style = ctx.current_style();
        let current_max = match options.maximum_fraction_digits {
            Some(max) => max,
            None => NativeNumberFormat::resolve(&options)
                .map(|r| r.maximum_fraction_digits)
                .unwrap_or(3),
        };

        let limit = usize::from(dynamic.max_fraction_digits).min(MAX_SCANNED_DIGITS);
        match leading_digit(ctx.value, style) {
            // Shifted into the integer part, e.g. 0.5 as "50%"
            Leading::Integer => {}
            Leading::Fraction(first) if first <= limit => {
                let needed = (first + usize::from(dynamic.additional_digits)).min(limit);
                let max = (current_max as usize).max(needed) as u8;
                trace!(value = ctx.value, max, "Dynamic fraction digits");
                options.maximum_fraction_digits = Some(max);
            }
            Leading::Fraction(_) | Leading::Beyond => {
                trace!(
                    value = ctx.value,
                    notation = ?dynamic.fallback_notation,
                    "Dynamic decimals fell back to notation"
                );
                let max = dynamic.fallback_maximum_fraction_digits;
                options.notation = Some(dynamic.fallback_notation);
                options.maximum_fraction_digits = Some(max);
                options.minimum_fraction_digits = options.minimum_fraction_digits.map(|min| min.min(max));
            }
        }
        Ok(options)
    }
}

/// The fixed and dynamic decimals plugins
pub fn plugins() -> Vec<Plugin> {
    vec![
        Plugin::pre_process(FIXED_DECIMALS, FixedDecimals)
            .with_priority(50)
            .with_description("Pins the fraction digit count"),
        Plugin::pre_process(DYNAMIC_DECIMALS, DynamicDecimals)
            .with_priority(60)
            .with_description("Widens fraction digits for small values"),
    ]
}
