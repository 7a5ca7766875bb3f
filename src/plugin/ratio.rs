//! Ratio styles: per-mille, per-myriad and percentage-point
//!
//! All three are generated from one [`RatioSpec`]. Formatting scales the value
//! up and appends the symbol; parsing strips the symbol and scales back down.
//! Scaling goes through exact decimal arithmetic.

use crate::decimal;
use crate::error::Result;
use crate::plugin::{
    FormatContext, ParseContext, Plugin, PluginGroup, PostParseHandler, PostProcessHandler,
    PreParseHandler, PreParseOutcome, PreProcessHandler,
};
use crate::specifier::{SpecifierFields, SpecifierType, TypeKey, fraction_precision};
use crate::types::{FormatOptions, FormatOutput, NumberPart, ParseResult, PartKind, Style};

const PRE_PROCESS_PRIORITY: i32 = 20;

/// Parameters of one ratio style
#[derive(Debug, PartialEq, Eq)]
pub struct RatioSpec {
    pub style: Style,
    /// Plugin group and specifier token name
    pub name: &'static str,
    pub multiplier: u32,
    pub symbol: &'static str,
    /// Suffixes accepted when parsing, matched case-insensitively
    pub suffixes: &'static [&'static str],
    pub strict_error: &'static str,
}

pub const PER_MILLE: RatioSpec = RatioSpec {
    style: Style::PerMille,
    name: "per-mille",
    multiplier: 1000,
    symbol: "‰",
    suffixes: &["‰"],
    strict_error: "Expected per-mille sign (‰)",
};

pub const PER_MYRIAD: RatioSpec = RatioSpec {
    style: Style::PerMyriad,
    name: "per-myriad",
    multiplier: 10000,
    symbol: "‱",
    suffixes: &["‱"],
    strict_error: "Expected per-myriad sign (‱)",
};

pub const PERCENTAGE_POINT: RatioSpec = RatioSpec {
    style: Style::PercentagePoint,
    name: "percentage-point",
    multiplier: 100,
    symbol: "pp",
    suffixes: &["pp", "p.p."],
    strict_error: "Expected percentage-point suffix (pp)",
};

pub const RATIO_SPECS: [&RatioSpec; 3] = [&PER_MILLE, &PER_MYRIAD, &PERCENTAGE_POINT];

/// The ratio parameters of `style`, if it is a ratio style
pub fn for_style(style: Style) -> Option<&'static RatioSpec> {
    RATIO_SPECS.iter().copied().find(|spec| spec.style == style)
}

impl RatioSpec {
    /// Input without its trailing suffix, or `None` when no suffix is present
    pub fn strip_suffix<'a>(&self, input: &'a str) -> Option<&'a str> {
        let trimmed = input.trim_end();
        self.suffixes.iter().find_map(|suffix| {
            let split = trimmed.len().checked_sub(suffix.len())?;
            let (head, tail) = (trimmed.get(..split)?, trimmed.get(split..)?);
            tail.eq_ignore_ascii_case(suffix).then(|| head.trim_end())
        })
    }

    /// Checks if `input` ends with one of the suffixes
    pub fn has_suffix(&self, input: &str) -> bool {
        self.strip_suffix(input).is_some()
    }
}

struct ScaleUp(&'static RatioSpec);

impl PreProcessHandler for ScaleUp {
    fn is_applicable(&self, ctx: &FormatContext) -> bool {
        ctx.options.style == Some(self.0.style)
    }

    fn process_value(&self, value: f64, _ctx: &FormatContext) -> Result<f64> {
        Ok(decimal::multiply(value, self.0.multiplier))
    }

    fn process_options(&self, mut options: FormatOptions, _ctx: &FormatContext) -> Result<FormatOptions> {
        options.style = Some(Style::Decimal);
        Ok(options)
    }
}

struct AppendSymbol(&'static RatioSpec);

impl PostProcessHandler for AppendSymbol {
    fn is_applicable(&self, ctx: &FormatContext) -> bool {
        ctx.style == self.0.style && ctx.value_state.is_valid()
    }

    fn process_result(&self, mut output: FormatOutput, _ctx: &FormatContext) -> Result<FormatOutput> {
        output.formatted.push_str(self.0.symbol);
        output
            .parts
            .push(NumberPart::new(PartKind::Unit, self.0.symbol));
        Ok(output)
    }
}

struct StripSuffix(&'static RatioSpec);

impl PreParseHandler for StripSuffix {
    fn is_applicable(&self, ctx: &ParseContext) -> bool {
        ctx.style == self.0.style
    }

    fn process_parse_input(&self, input: String, ctx: &ParseContext) -> PreParseOutcome {
        match self.0.strip_suffix(&input) {
            Some(stripped) => PreParseOutcome::Continue(stripped.to_string()),
            None if ctx.strict => PreParseOutcome::Reject(self.0.strict_error.to_string()),
            None => PreParseOutcome::Continue(input),
        }
    }
}

struct ScaleDown(&'static RatioSpec);

impl PostParseHandler for ScaleDown {
    // The strict decoder already scales
    fn is_applicable(&self, ctx: &ParseContext) -> bool {
        ctx.style == self.0.style && !ctx.strict
    }

    fn process_parse_result(&self, mut result: ParseResult, _ctx: &ParseContext) -> Result<ParseResult> {
        if result.success && result.value.is_finite() {
            result.value = decimal::divide(result.value, self.0.multiplier);
        }
        Ok(result)
    }
}

/// The four plugins of one ratio style, plus its specifier token
pub fn plugin_group(spec: &'static RatioSpec) -> PluginGroup {
    let style = spec.style;
    let token = SpecifierType::new(TypeKey::token(spec.name), move |fields: &SpecifierFields| {
        let mut options = FormatOptions::new().with_style(style);
        fraction_precision(&mut options, fields);
        options
    });

    PluginGroup::new(
        spec.name,
        vec![
            Plugin::pre_process(format!("{}-pre-process", spec.name), ScaleUp(spec))
                .with_priority(PRE_PROCESS_PRIORITY)
                .with_description(format!("Scales values by {} for display", spec.multiplier))
                .with_specifier_type(token),
            Plugin::post_process(format!("{}-post-process", spec.name), AppendSymbol(spec)),
            Plugin::pre_parse(format!("{}-pre-parse", spec.name), StripSuffix(spec)),
            Plugin::post_parse(format!("{}-post-parse", spec.name), ScaleDown(spec)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_suffix() {
        assert_eq!(PER_MILLE.strip_suffix("123‰"), Some("123"));
        assert_eq!(PER_MILLE.strip_suffix("123 ‰ "), Some("123"));
        assert_eq!(PER_MILLE.strip_suffix("123"), None);
        assert_eq!(PERCENTAGE_POINT.strip_suffix("12.34PP"), Some("12.34"));
        assert_eq!(PERCENTAGE_POINT.strip_suffix("1p.p."), Some("1"));
        // The suffix must not cut a multi-byte character
        assert_eq!(PERCENTAGE_POINT.strip_suffix("‰"), None);
    }

    #[test]
    fn test_for_style() {
        assert_eq!(for_style(Style::PerMyriad).map(|s| s.multiplier), Some(10000));
        assert!(for_style(Style::Percent).is_none());
    }

    #[test]
    fn test_plugin_group_shape() {
        let group = plugin_group(&PER_MILLE);
        assert_eq!(group.name, "per-mille");
        assert_eq!(group.plugins.len(), 4);
        assert_eq!(group.plugins[0].priority(), PRE_PROCESS_PRIORITY);
        assert_eq!(group.plugins[0].specifier_types().len(), 1);
    }
}
