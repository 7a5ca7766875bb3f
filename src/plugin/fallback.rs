//! Placeholders for values that cannot be formatted
//!
//! Runs in the post-process phase for every input whose [`ValueState`] is not
//! `Valid` and replaces the output with a configurable placeholder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formatter::native::NativeNumberFormat;
use crate::plugin::{FormatContext, Plugin, PostProcessHandler, ratio};
use crate::types::{FormatOutput, NumberPart, PartKind, ValueState};

pub const PLUGIN_NAME: &str = "fallback";

/// Placeholder text per value state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FallbackOptions {
    pub null: String,
    pub undefined: String,
    pub nan: String,
    pub positive_infinity: String,
    pub negative_infinity: String,
    /// Keep the prefix and suffix of the style around the placeholder
    pub preserve_formatting: bool,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            null: "N/A".to_string(),
            undefined: "N/A".to_string(),
            nan: "N/A".to_string(),
            positive_infinity: "∞".to_string(),
            negative_infinity: "-∞".to_string(),
            preserve_formatting: false,
        }
    }
}

impl FallbackOptions {
    /// Placeholder for `state`, `None` for valid values
    pub fn placeholder(&self, state: ValueState) -> Option<&str> {
        match state {
            ValueState::Valid => None,
            ValueState::Null => Some(&self.null),
            ValueState::Undefined => Some(&self.undefined),
            ValueState::NotANumber => Some(&self.nan),
            ValueState::PositiveInfinity => Some(&self.positive_infinity),
            ValueState::NegativeInfinity => Some(&self.negative_infinity),
        }
    }
}

fn is_affix(kind: PartKind) -> bool {
    matches!(kind, PartKind::Currency | PartKind::PercentSign | PartKind::Literal)
}

struct Fallback(FallbackOptions);

impl Fallback {
    /// Affixes of a formatted zero with the number replaced by `placeholder`
    fn preserved_parts(&self, placeholder: NumberPart, ctx: &FormatContext) -> Vec<NumberPart> {
        let base = ctx
            .base
            .clone()
            .or_else(|| NativeNumberFormat::from_options(&ctx.options).ok().map(Arc::new));
        let Some(base) = base else {
            return vec![placeholder];
        };

        let mut parts = Vec::new();
        let mut placeholder = Some(placeholder);
        for part in base.format_to_parts(0.0) {
            if is_affix(part.kind) {
                parts.push(part);
            } else if let Some(p) = placeholder.take() {
                parts.push(p);
            }
        }
        parts.extend(placeholder);
        if let Some(spec) = ratio::for_style(ctx.style) {
            parts.push(NumberPart::new(PartKind::Unit, spec.symbol));
        }
        parts
    }
}

impl PostProcessHandler for Fallback {
    fn is_applicable(&self, ctx: &FormatContext) -> bool {
        !ctx.value_state.is_valid()
    }

    fn process_result(&self, output: FormatOutput, ctx: &FormatContext) -> Result<FormatOutput> {
        let Some(text) = self.0.placeholder(ctx.value_state) else {
            return Ok(output);
        };
        let kind = match ctx.value_state {
            ValueState::PositiveInfinity | ValueState::NegativeInfinity => PartKind::Infinity,
            _ => PartKind::Nan,
        };
        let placeholder = NumberPart::new(kind, text);

        let parts = if self.0.preserve_formatting {
            self.preserved_parts(placeholder, ctx)
        } else {
            vec![placeholder]
        };
        Ok(FormatOutput::from_parts(parts))
    }
}

pub fn plugin(options: FallbackOptions) -> Plugin {
    Plugin::post_process(PLUGIN_NAME, Fallback(options))
        .with_priority(0)
        .with_description("Renders placeholders for missing and non-finite values")
}
