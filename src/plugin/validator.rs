//! Option consistency checks
//!
//! In development mode conflicting digit options are reported as
//! [`Error::InvalidOptions`]. In production mode they are corrected: a maximum
//! below its minimum is raised to the minimum, and fraction digits are dropped
//! when significant digits are also set.

use tracing::debug;

use crate::error::{Error, Result};
use crate::plugin::{FormatContext, Plugin, PreProcessHandler};
use crate::types::{ExecutionMode, FormatOptions};

pub const PLUGIN_NAME: &str = "validator";

/// Check `options`, returning them (possibly corrected) or an error
///
/// # Arguments
/// * `options` - The options to check
/// * `mode` - Whether conflicts are raised or corrected
///
/// # Returns
/// * `Result<FormatOptions>` - The checked options
pub fn validate(mut options: FormatOptions, mode: ExecutionMode) -> Result<FormatOptions> {
    if let (Some(min), Some(max)) = (options.minimum_fraction_digits, options.maximum_fraction_digits) {
        if min > max {
            reject_or_log(
                mode,
                format!("minimumFractionDigits ({min}) is greater than maximumFractionDigits ({max})"),
            )?;
            options.maximum_fraction_digits = Some(min);
        }
    }

    if let (Some(min), Some(max)) = (
        options.minimum_significant_digits,
        options.maximum_significant_digits,
    ) {
        if min > max {
            reject_or_log(
                mode,
                format!(
                    "minimumSignificantDigits ({min}) is greater than maximumSignificantDigits ({max})"
                ),
            )?;
            options.maximum_significant_digits = Some(min);
        }
    }

    if options.has_significant_digits() && options.has_fraction_digits() {
        reject_or_log(
            mode,
            "significant digits and fraction digits cannot be combined".to_string(),
        )?;
        options.minimum_fraction_digits = None;
        options.maximum_fraction_digits = None;
    }

    Ok(options)
}

fn reject_or_log(mode: ExecutionMode, message: String) -> Result<()> {
    match mode {
        ExecutionMode::Development => Err(Error::InvalidOptions(message)),
        ExecutionMode::Production => {
            debug!(plugin = PLUGIN_NAME, %message, "Corrected format options");
            Ok(())
        }
    }
}

struct Validate;

impl PreProcessHandler for Validate {
    fn process_options(&self, options: FormatOptions, ctx: &FormatContext) -> Result<FormatOptions> {
        validate(options, ctx.mode)
    }
}

pub fn plugin() -> Plugin {
    Plugin::pre_process(PLUGIN_NAME, Validate)
        .with_priority(0)
        .with_description("Checks digit options for conflicts")
}
