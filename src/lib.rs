//! Locale-aware number formatting and parsing
//!
//! Numbers are formatted through a plugin pipeline on top of a base
//! formatter, and formatted strings are read back by a parser that undoes
//! each formatting decision. Besides the decimal, percent and currency
//! styles, built-in plugins provide per-mille (‰), per-myriad (‱),
//! percentage-point (pp) and Chinese uppercase numerals.
//!
//! ```
//! use number_pipeline::{Engine, FormatOptions, ParseOptions, Style};
//!
//! let engine = Engine::default();
//! let options = FormatOptions::new().with_style(Style::PerMille);
//! let formatted = engine.format(0.1234, &options).unwrap();
//! assert_eq!(formatted.formatted, "123.4‰");
//!
//! let parsed = engine.parse("123.4‰", &ParseOptions::new().with_style(Style::PerMille));
//! assert_eq!(parsed.value, 0.1234);
//! ```

pub mod cache;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod locale;
pub mod parser;
pub mod plugin;
pub mod specifier;
pub mod types;

pub use config::EngineConfig;
pub use engine::{Engine, global, init_global, reset_global};
pub use error::{Error, Result};
pub use formatter::{Formatter, resolve_options};
pub use parser::NumberParser;
pub use plugin::{Phase, Plugin, PluginGroup, PluginRegistry};
pub use specifier::{SpecifierResolution, SpecifierResolver, parse_specifier};
pub use types::*;

/// Format `input` with the process-wide engine
///
/// # Arguments
/// * `input` - The value to format
/// * `options` - Format options, laid over the engine defaults
///
/// # Returns
/// * `Result<FormatResult>` - Fails only on invalid options in development mode
pub fn format_number(input: impl Into<NumericInput>, options: &FormatOptions) -> Result<FormatResult> {
    global().format(input, options)
}

/// Parse `input` with the process-wide engine
pub fn parse_number(input: &str, options: &ParseOptions) -> ParseResult {
    global().parse(input, options)
}

/// Format `input` with a specifier string using the process-wide engine
pub fn format_with_specifier(specifier: &str, input: impl Into<NumericInput>) -> Result<FormatResult> {
    global().format_specifier(specifier, input, None)
}
