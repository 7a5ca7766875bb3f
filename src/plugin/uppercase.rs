//! Localized uppercase numerals (Chinese financial numerals)
//!
//! `1234.56` renders as `壹仟贰佰叁拾肆点伍陆`: the integer part in four-digit
//! groups with small units 拾佰仟 and a big unit per group, the fraction digit
//! by digit after `点`, and `负` in front of negative values.

use crate::error::{Error, Result};
use crate::formatter::digits::DigitString;
use crate::plugin::{
    FormatContext, FormatHandler, ParseContext, Plugin, PluginGroup, PreParseHandler,
    PreParseOutcome, PreProcessHandler,
};
use crate::specifier::{SpecifierFields, SpecifierType, TypeKey, fraction_precision};
use crate::types::{FormatOptions, FormatOutput, NumberPart, PartKind, Style};

pub const GROUP_NAME: &str = "localized-uppercase";

const DIGITS: [char; 10] = ['零', '壹', '贰', '叁', '肆', '伍', '陆', '柒', '捌', '玖'];
const SMALL_UNITS: [&str; 4] = ["", "拾", "佰", "仟"];
/// Big unit of each four-digit group, lowest group first
const BIG_UNITS: [&str; 6] = ["", "万", "亿", "万亿", "亿亿", "万亿亿"];
const NEGATIVE: char = '负';
const POINT: char = '点';
const DEFAULT_FRACTION_DIGITS: u8 = 3;

/// Value of a numeral character, including traditional variants
fn digit_value(c: char) -> Option<u32> {
    match c {
        '零' | '〇' => Some(0),
        '壹' => Some(1),
        '贰' | '貳' => Some(2),
        '叁' | '參' => Some(3),
        '肆' => Some(4),
        '伍' => Some(5),
        '陆' | '陸' => Some(6),
        '柒' => Some(7),
        '捌' => Some(8),
        '玖' => Some(9),
        _ => None,
    }
}

fn small_unit_value(c: char) -> Option<u32> {
    match c {
        '拾' => Some(10),
        '佰' => Some(100),
        '仟' => Some(1000),
        _ => None,
    }
}

/// Checks if `c` can appear in an uppercase numeral
pub fn is_numeral_char(c: char) -> bool {
    digit_value(c).is_some()
        || small_unit_value(c).is_some()
        || matches!(c, '万' | '萬' | '亿' | '億' | NEGATIVE | POINT)
}

/// One four-digit group, without its big unit
fn render_group(group: u32, out: &mut String) {
    let mut pending_zero = false;
    let mut started = false;
    for position in (0..4).rev() {
        let digit = (group / 10u32.pow(position)) % 10;
        if digit == 0 {
            pending_zero = started;
            continue;
        }
        if pending_zero {
            out.push(DIGITS[0]);
            pending_zero = false;
        }
        out.push(DIGITS[digit as usize]);
        out.push_str(SMALL_UNITS[position as usize]);
        started = true;
    }
}

/// Render the integer digits `integer` (no sign, no leading zeros)
fn render_integer(integer: &str) -> Result<String> {
    let integer = integer.trim_start_matches('0');
    if integer.is_empty() {
        return Ok(DIGITS[0].to_string());
    }

    let bytes = integer.as_bytes();
    let group_count = bytes.len().div_ceil(4);
    if group_count > BIG_UNITS.len() {
        return Err(Error::plugin(
            GROUP_NAME,
            format!("{} integer digits exceed the largest unit", bytes.len()),
        ));
    }

    let mut out = String::new();
    let mut pending_zero = false;
    for index in (0..group_count).rev() {
        let end = bytes.len() - index * 4;
        let start = end.saturating_sub(4);
        let group = bytes[start..end]
            .iter()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));

        if group == 0 {
            pending_zero = !out.is_empty();
            continue;
        }
        // A gap inside or before this group is read as a single 零
        if !out.is_empty() && (pending_zero || group < 1000) {
            out.push(DIGITS[0]);
        }
        pending_zero = false;
        render_group(group, &mut out);
        out.push_str(BIG_UNITS[index]);
    }
    Ok(out)
}

/// Render `value` rounded to at most `max_fraction` fraction digits
pub fn to_uppercase_numerals(value: f64, min_fraction: u8, max_fraction: u8) -> Result<String> {
    if !value.is_finite() {
        return Err(Error::plugin(GROUP_NAME, "value is not finite"));
    }

    let mut digits = DigitString::from_f64(value);
    digits.round_to_fraction(u32::from(max_fraction));
    let (integer, mut fraction) = digits.split();
    while fraction.len() < usize::from(min_fraction) {
        fraction.push('0');
    }

    let mut out = String::new();
    if value.is_sign_negative() && !digits.is_zero() {
        out.push(NEGATIVE);
    }
    out.push_str(&render_integer(&integer)?);
    if !fraction.is_empty() {
        out.push(POINT);
        for b in fraction.bytes() {
            out.push(DIGITS[usize::from(b - b'0')]);
        }
    }
    Ok(out)
}

/// Value of a section without big units, e.g. `叁仟零伍拾`
fn parse_section(chars: &[char]) -> std::result::Result<u128, String> {
    let mut total: u128 = 0;
    let mut digit: Option<u32> = None;
    let mut last_unit = u32::MAX;

    for &c in chars {
        if let Some(d) = digit_value(c) {
            if d == 0 {
                if digit.is_some() {
                    return Err(format!("Unexpected '{c}' after a digit"));
                }
                continue;
            }
            if digit.is_some() {
                return Err(format!("Two digits in a row at '{c}'"));
            }
            digit = Some(d);
        } else if let Some(unit) = small_unit_value(c) {
            if unit >= last_unit {
                return Err(format!("Unit '{c}' out of order"));
            }
            // 拾 on its own reads as 壹拾
            let d = match digit.take() {
                Some(d) => d,
                None if total == 0 && unit == 10 => 1,
                None => return Err(format!("Unit '{c}' without a digit")),
            };
            total += u128::from(d) * u128::from(unit);
            last_unit = unit;
        } else {
            return Err(format!("Unexpected character '{c}'"));
        }
    }
    Ok(total + u128::from(digit.unwrap_or(0)))
}

/// The big unit starting at `chars[at]`, longest match first
fn big_unit_at(chars: &[char], at: usize) -> Option<(usize, usize)> {
    (1..BIG_UNITS.len()).rev().find_map(|index| {
        let unit: Vec<char> = BIG_UNITS[index].chars().collect();
        let end = at + unit.len();
        let matches = end <= chars.len()
            && chars[at..end]
                .iter()
                .zip(&unit)
                .all(|(c, u)| normalize_big(*c) == *u);
        matches.then_some((index, unit.len()))
    })
}

fn normalize_big(c: char) -> char {
    match c {
        '萬' => '万',
        '億' => '亿',
        other => other,
    }
}

/// Reduce around the largest big unit: `left × unit + right`
fn parse_integer(chars: &[char]) -> std::result::Result<u128, String> {
    let mut largest: Option<(usize, usize, usize)> = None;
    let mut i = 0;
    while i < chars.len() {
        match big_unit_at(chars, i) {
            Some((index, len)) => {
                if largest.is_none_or(|(best, _, _)| index > best) {
                    largest = Some((index, i, len));
                }
                i += len;
            }
            None => i += 1,
        }
    }

    let Some((index, at, len)) = largest else {
        return parse_section(chars);
    };
    let left = &chars[..at];
    if left.is_empty() {
        return Err(format!("Unit '{}' without a value", BIG_UNITS[index]));
    }
    let scale = 10u128.pow(4 * index as u32);
    let high = parse_integer(left)?;
    if high >= 10_000 {
        return Err(format!("Value before '{}' is too large", BIG_UNITS[index]));
    }
    let low = parse_integer(&chars[at + len..])?;
    if low >= scale {
        return Err(format!("Value after '{}' is too large", BIG_UNITS[index]));
    }
    Ok(high * scale + low)
}

/// Convert uppercase numerals to a plain numeral using `decimal_separator`
pub fn from_uppercase_numerals(input: &str, decimal_separator: &str) -> std::result::Result<String, String> {
    let trimmed = input.trim();
    let (negative, body) = match trimmed.strip_prefix(NEGATIVE) {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (integer, fraction) = match body.split_once(POINT) {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (body, None),
    };

    let integer_chars: Vec<char> = integer.chars().collect();
    if integer_chars.is_empty() {
        return Err("Missing integer part".to_string());
    }
    let value = parse_integer(&integer_chars)?;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&value.to_string());
    if let Some(fraction) = fraction {
        if fraction.is_empty() {
            return Err("Missing digits after '点'".to_string());
        }
        out.push_str(decimal_separator);
        for c in fraction.chars() {
            let d = digit_value(c).ok_or_else(|| format!("Unexpected fraction character '{c}'"))?;
            out.push(char::from(b'0' + d as u8));
        }
    }
    Ok(out)
}

struct RewriteStyle;

impl PreProcessHandler for RewriteStyle {
    fn is_applicable(&self, ctx: &FormatContext) -> bool {
        ctx.options.style == Some(Style::LocalizedUppercase)
    }

    fn process_options(&self, mut options: FormatOptions, _ctx: &FormatContext) -> Result<FormatOptions> {
        options.style = Some(Style::Decimal);
        Ok(options)
    }
}

struct RenderNumerals;

impl FormatHandler for RenderNumerals {
    fn is_applicable(&self, ctx: &FormatContext) -> bool {
        ctx.style == Style::LocalizedUppercase && ctx.value_state.is_valid()
    }

    fn process_result(&self, _output: FormatOutput, ctx: &FormatContext) -> Result<FormatOutput> {
        let max = ctx
            .options
            .maximum_fraction_digits
            .unwrap_or(DEFAULT_FRACTION_DIGITS);
        let min = ctx.options.minimum_fraction_digits.unwrap_or(0).min(max);
        let text = to_uppercase_numerals(ctx.value, min, max)?;
        Ok(FormatOutput::from_parts(vec![NumberPart::new(
            PartKind::Literal,
            text,
        )]))
    }
}

struct ParseNumerals;

impl PreParseHandler for ParseNumerals {
    fn is_applicable(&self, ctx: &ParseContext) -> bool {
        ctx.style == Style::LocalizedUppercase
    }

    fn process_parse_input(&self, input: String, ctx: &ParseContext) -> PreParseOutcome {
        let has_numerals = input.chars().any(is_numeral_char);
        if !has_numerals {
            // Plain numerals pass through unless the marker is required
            return if ctx.strict {
                PreParseOutcome::Reject("Expected localized uppercase numerals".to_string())
            } else {
                PreParseOutcome::Continue(input)
            };
        }
        match from_uppercase_numerals(&input, &ctx.decimal_separator) {
            Ok(numeral) => PreParseOutcome::Continue(numeral),
            Err(e) => PreParseOutcome::Reject(format!("Invalid uppercase numeral: {e}")),
        }
    }
}

pub fn plugin_group() -> PluginGroup {
    let token = SpecifierType::new(TypeKey::token(GROUP_NAME), |fields: &SpecifierFields| {
        let mut options = FormatOptions::new().with_style(Style::LocalizedUppercase);
        fraction_precision(&mut options, fields);
        options
    });

    PluginGroup::new(
        GROUP_NAME,
        vec![
            Plugin::pre_process("localized-uppercase-pre-process", RewriteStyle)
                .with_priority(20)
                .with_specifier_type(token),
            Plugin::format("localized-uppercase-format", RenderNumerals),
            Plugin::pre_parse("localized-uppercase-pre-parse", ParseNumerals),
        ],
    )
}
