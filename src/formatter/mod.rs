//! Number formatting pipeline
//!
//! A [`Formatter`] owns one resolved option set and runs every format call
//! through the plugin phases:
//!
//! 1. classify the input into a [`ValueState`]
//! 2. pre-process plugins rewrite the value and the options
//! 3. the base formatter renders the (possibly rewritten) value once
//! 4. format-phase plugins may replace that rendering
//! 5. post-process plugins decorate the result
//!
//! A failure in steps 2 or 3 skips straight to step 5 with a `NaN` rendering,
//! so a format call always yields a well-formed [`FormatResult`].

pub mod digits;
pub mod native;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{self, MemoCache};
use crate::error::Result;
use crate::locale;
use crate::plugin::registry::PluginRegistry;
use crate::plugin::{FormatContext, Phase, PluginHandler, validator};
use crate::types::{
    CurrencyDisplay, CurrencySign, ExecutionMode, FormatOptions, FormatOutput, FormatResult,
    Notation, NumericInput, ResolvedFormatOptions, SignDisplay, TrailingZeroDisplay, ValueState,
};

use native::NativeNumberFormat;

/// Capacity of the per-formatter cache of base formatters
const NATIVE_CACHE_CAPACITY: usize = 16;

/// Resolve the complete option set for `options` laid over `defaults`
///
/// Extension styles are resolved as `Decimal` and reported back through
/// `original_style`. Options the base formatter rejects fall back to a plain
/// decimal resolution, so this never fails.
///
/// # Arguments
/// * `options` - Caller options
/// * `defaults` - Context defaults, overridden by `options`
///
/// # Returns
/// * `ResolvedFormatOptions` - The resolved options
pub fn resolve_options(options: &FormatOptions, defaults: Option<&FormatOptions>) -> ResolvedFormatOptions {
    let merged = match defaults {
        Some(defaults) => options.merged_over(defaults),
        None => options.clone(),
    };
    let requested = merged.style.unwrap_or_default();

    let mut base = merged.clone();
    base.style = Some(requested.native());
    base.use_grouping = Some(merged.use_grouping.unwrap_or(true));

    let resolved = NativeNumberFormat::resolve(&base)
        .or_else(|e| {
            debug!(error = %e, "Options rejected by the base formatter; using decimal");
            let plain = FormatOptions {
                locale: merged.locale.clone(),
                use_grouping: base.use_grouping,
                extend: merged.extend.clone(),
                ..FormatOptions::default()
            };
            NativeNumberFormat::resolve(&plain)
        })
        .unwrap_or_else(|_| plain_decimal(&merged));

    ResolvedFormatOptions {
        original_style: requested.is_extension().then_some(requested),
        ..resolved
    }
}

/// Last-resort resolution used when even the locale is rejected
///
/// The raw locale is kept so building a base formatter fails later.
fn plain_decimal(options: &FormatOptions) -> ResolvedFormatOptions {
    ResolvedFormatOptions {
        locale: options
            .locale
            .clone()
            .unwrap_or_else(|| locale::DEFAULT_LOCALE.replace('_', "-")),
        style: crate::types::Style::Decimal,
        currency: None,
        currency_display: CurrencyDisplay::default(),
        currency_sign: CurrencySign::default(),
        notation: Notation::Standard,
        sign_display: SignDisplay::Auto,
        use_grouping: options.use_grouping.unwrap_or(true),
        minimum_integer_digits: 1,
        minimum_fraction_digits: 0,
        maximum_fraction_digits: 3,
        minimum_significant_digits: None,
        maximum_significant_digits: None,
        trailing_zero_display: TrailingZeroDisplay::Auto,
        compact_rounding: false,
        negative_zero: options.extend.negative_zero.unwrap_or_default(),
        original_style: None,
        include_sign: options.extend.include_sign.unwrap_or(false),
    }
}

/// A configured number formatter
pub struct Formatter {
    options: FormatOptions,
    resolved: ResolvedFormatOptions,
    registry: Arc<PluginRegistry>,
    mode: ExecutionMode,
    natives: MemoCache<String, Arc<NativeNumberFormat>>,
}

impl std::fmt::Debug for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("options", &self.options)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Formatter {
    /// Create a formatter for `options`
    ///
    /// Fails only in development mode, when the validator plugin is enabled
    /// and the digit options conflict.
    pub fn new(options: &FormatOptions, registry: Arc<PluginRegistry>, mode: ExecutionMode) -> Result<Self> {
        Self::with_defaults(options, None, registry, mode)
    }

    /// Create a formatter for `options` laid over `defaults`
    pub fn with_defaults(
        options: &FormatOptions,
        defaults: Option<&FormatOptions>,
        registry: Arc<PluginRegistry>,
        mode: ExecutionMode,
    ) -> Result<Self> {
        let mut merged = match defaults {
            Some(defaults) => options.merged_over(defaults),
            None => options.clone(),
        };
        if registry.is_enabled(validator::PLUGIN_NAME) {
            merged = validator::validate(merged, mode)?;
        }
        let resolved = resolve_options(&merged, None);

        Ok(Self {
            options: merged,
            resolved,
            registry,
            mode,
            natives: MemoCache::new(NATIVE_CACHE_CAPACITY),
        })
    }

    /// The merged caller options
    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn resolved_options(&self) -> &ResolvedFormatOptions {
        &self.resolved
    }

    /// Format `input` through the plugin pipeline
    ///
    /// # Arguments
    /// * `input` - A number, a numeric string, or a missing value
    ///
    /// # Returns
    /// * `FormatResult` - The rendering, its parts and the input classification
    pub fn format(&self, input: impl Into<NumericInput>) -> FormatResult {
        let input = input.into();
        let value_state = input.value_state();
        let initial = FormatContext {
            value: input.numeric_value(),
            input,
            style: self.options.style.unwrap_or_default(),
            options: Arc::new(self.options.clone()),
            value_state,
            locale: self.resolved.locale.clone(),
            mode: self.mode,
            base: None,
        };

        let prepared = self.pre_process(initial.clone()).and_then(|ctx| {
            let base = self.native_for(&ctx.options)?;
            Ok(FormatContext {
                base: Some(base),
                ..ctx
            })
        });

        match prepared {
            Ok(ctx) => {
                let base_output = ctx
                    .base
                    .as_ref()
                    .map(|base| FormatOutput::from_parts(base.format_to_parts(ctx.value)))
                    .unwrap_or_else(FormatOutput::nan);
                let output = self.run_output_phase(Phase::Format, base_output, &ctx);
                let output = self.run_output_phase(Phase::PostProcess, output, &ctx);
                FormatResult {
                    formatted: output.formatted,
                    parts: output.parts,
                    value_state,
                    error: None,
                }
            }
            Err(e) => {
                debug!(error = %e, "Format pipeline short-circuited");
                let ctx = FormatContext {
                    value: f64::NAN,
                    value_state: ValueState::NotANumber,
                    ..initial
                };
                let output = self.run_output_phase(Phase::PostProcess, FormatOutput::nan(), &ctx);
                FormatResult {
                    formatted: output.formatted,
                    parts: output.parts,
                    value_state: ValueState::NotANumber,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Run the pre-process phase, rebuilding the context after each step
    fn pre_process(&self, mut ctx: FormatContext) -> Result<FormatContext> {
        for plugin in self.registry.ordered_for_phase(Phase::PreProcess) {
            let PluginHandler::PreProcess(handler) = plugin.handler() else {
                continue;
            };
            if !handler.is_applicable(&ctx) {
                continue;
            }

            let value = handler.process_value(ctx.value, &ctx).map_err(|e| {
                warn!(plugin = plugin.name(), error = %e, "Pre-process plugin failed");
                e
            })?;
            if value.to_bits() != ctx.value.to_bits() {
                ctx = ctx.with_step(value, (*ctx.options).clone());
            }

            let options = handler
                .process_options((*ctx.options).clone(), &ctx)
                .map_err(|e| {
                    warn!(plugin = plugin.name(), error = %e, "Pre-process plugin failed");
                    e
                })?;
            if options != *ctx.options {
                ctx = ctx.with_step(ctx.value, options);
            }
        }
        Ok(ctx)
    }

    /// Run the format or post-process phase; a failing plugin is skipped
    fn run_output_phase(&self, phase: Phase, mut output: FormatOutput, ctx: &FormatContext) -> FormatOutput {
        for plugin in self.registry.ordered_for_phase(phase) {
            let step = match plugin.handler() {
                PluginHandler::Format(h) if h.is_applicable(ctx) => h.process_result(output.clone(), ctx),
                PluginHandler::PostProcess(h) if h.is_applicable(ctx) => {
                    h.process_result(output.clone(), ctx)
                }
                _ => continue,
            };
            match step {
                Ok(next) => output = next,
                Err(e) => warn!(
                    plugin = plugin.name(),
                    %phase,
                    error = %e,
                    "Plugin failed; keeping previous output"
                ),
            }
        }
        output
    }

    /// The base formatter for `options`, built once per resolved option set
    fn native_for(&self, options: &FormatOptions) -> Result<Arc<NativeNumberFormat>> {
        let resolved = resolve_options(options, None);
        let key = cache::canonical_key(&resolved, "native");
        self.natives
            .get_or_try_insert_with(key, || NativeNumberFormat::try_new(&resolved).map(Arc::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::plugin::{BuiltinSettings, Plugin};
    use crate::types::{ExtendOptions, NumberPart, PartKind, Style};

    fn formatter(options: FormatOptions) -> Formatter {
        let registry = Arc::new(PluginRegistry::with_defaults(&BuiltinSettings::default()));
        Formatter::new(&options, registry, ExecutionMode::Development).unwrap()
    }

    #[test]
    fn test_resolve_defaults() {
        let resolved = resolve_options(&FormatOptions::new(), None);
        assert_eq!(resolved.style, Style::Decimal);
        assert!(resolved.use_grouping);
        assert_eq!(resolved.maximum_fraction_digits, 3);
        assert_eq!(resolved.original_style, None);
    }

    #[test]
    fn test_resolve_extension_style() {
        let resolved = resolve_options(&FormatOptions::new().with_style(Style::PerMille), None);
        assert_eq!(resolved.style, Style::Decimal);
        assert_eq!(resolved.original_style, Some(Style::PerMille));
    }

    #[test]
    fn test_resolve_invalid_currency_falls_back() {
        let options = FormatOptions::new()
            .with_style(Style::Currency)
            .with_currency("NOPE");
        let resolved = resolve_options(&options, None);
        assert_eq!(resolved.style, Style::Decimal);
        assert_eq!(resolved.currency, None);
    }

    #[test]
    fn test_resolve_defaults_are_overridden() {
        let defaults = FormatOptions::new()
            .with_locale("de-DE")
            .with_maximum_fraction_digits(1);
        let resolved = resolve_options(&FormatOptions::new().with_maximum_fraction_digits(4), Some(&defaults));
        assert_eq!(resolved.locale, "de-DE");
        assert_eq!(resolved.maximum_fraction_digits, 4);
    }

    #[test]
    fn test_format_basic() {
        let result = formatter(FormatOptions::new()).format(1234.5678);
        assert_eq!(result.formatted, "1,234.568");
        assert_eq!(result.value_state, ValueState::Valid);
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_format_include_sign() {
        let options = FormatOptions::new().with_extend(ExtendOptions {
            include_sign: Some(true),
            ..ExtendOptions::default()
        });
        let f = formatter(options);
        assert_eq!(f.format(5).formatted, "+5");
        assert_eq!(f.format(0).formatted, "0");
        assert_eq!(f.format(-5).formatted, "-5");
    }

    #[test]
    fn test_format_fallback_states() {
        let f = formatter(FormatOptions::new());
        let null = f.format(NumericInput::Null);
        assert_eq!(null.formatted, "N/A");
        assert_eq!(null.value_state, ValueState::Null);
        assert_eq!(f.format(f64::INFINITY).formatted, "∞");
        assert_eq!(f.format("abc").value_state, ValueState::NotANumber);
    }

    #[test]
    fn test_bad_locale_short_circuits() {
        let f = formatter(FormatOptions::new().with_locale("not a locale!"));
        let result = f.format(1.0);
        assert_eq!(result.value_state, ValueState::NotANumber);
        assert_eq!(result.formatted, "N/A");
        assert!(result.error.is_some());
    }

    #[test]
    fn test_failing_format_plugin_is_skipped() {
        let registry = Arc::new(PluginRegistry::with_defaults(&BuiltinSettings::default()));
        registry.register(
            Plugin::format("broken", |_output: FormatOutput, _ctx: &FormatContext| -> Result<FormatOutput> {
                Err(Error::plugin("broken", "boom"))
            }),
            None,
        );
        registry.register(
            Plugin::post_process("suffix", |mut output: FormatOutput, _ctx: &FormatContext| -> Result<FormatOutput> {
                output.formatted.push_str(" units");
                output.parts.push(NumberPart::new(PartKind::Literal, " units"));
                Ok(output)
            }),
            None,
        );
        let f = Formatter::new(&FormatOptions::new(), registry, ExecutionMode::Development).unwrap();
        assert_eq!(f.format(12).formatted, "12 units");
    }

    #[test]
    fn test_base_formatter_is_cached() {
        let f = formatter(FormatOptions::new());
        f.format(1.0);
        f.format(2.0);
        assert_eq!(f.natives.len(), 1);
    }

    #[test]
    fn test_validation_at_construction() {
        let registry = Arc::new(PluginRegistry::with_defaults(&BuiltinSettings::default()));
        let options = FormatOptions::new().with_fraction_digits(5, 2);
        assert!(Formatter::new(&options, registry.clone(), ExecutionMode::Development).is_err());

        let f = Formatter::new(&options, registry.clone(), ExecutionMode::Production).unwrap();
        assert_eq!(f.resolved_options().maximum_fraction_digits, 5);

        registry.set_enabled(validator::PLUGIN_NAME, false);
        let f = Formatter::new(&options, registry, ExecutionMode::Development).unwrap();
        // The base formatter rejects the range, so resolution falls back
        assert_eq!(f.resolved_options().maximum_fraction_digits, 3);
    }
}
