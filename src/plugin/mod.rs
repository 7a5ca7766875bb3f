//! Plugin contract for the format and parse pipelines
//!
//! A plugin runs in exactly one [`Phase`], fixed by the [`PluginHandler`]
//! variant it is built from. Format-side handlers only ever see a
//! [`FormatContext`] and parse-side handlers a [`ParseContext`].

pub mod decimals;
pub mod fallback;
pub mod ratio;
pub mod registry;
pub mod uppercase;
pub mod validator;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::formatter::native::NativeNumberFormat;
use crate::specifier::SpecifierType;
use crate::types::{
    ExecutionMode, ExtendOptions, FormatOptions, FormatOutput, NumericInput, ParseOptions,
    ParseResult, Style, ValueState,
};

pub use registry::{BuiltinSettings, PluginRegistry, RegistrationInfo};

/// Priority of plugins that do not set one; lower runs first
pub const DEFAULT_PRIORITY: i32 = 100;

/// Pipeline stage a plugin runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    PreProcess,
    Format,
    PostProcess,
    PreParse,
    PostParse,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::PreProcess,
        Phase::Format,
        Phase::PostProcess,
        Phase::PreParse,
        Phase::PostParse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::PreProcess => "pre-process",
            Phase::Format => "format",
            Phase::PostProcess => "post-process",
            Phase::PreParse => "pre-parse",
            Phase::PostParse => "post-parse",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one step of the format pipeline
///
/// A new context is built whenever a pre-process plugin changes the value or
/// the options.
#[derive(Debug, Clone)]
pub struct FormatContext {
    pub input: NumericInput,
    pub value: f64,
    /// The style the caller asked for, which may be an extension style
    pub style: Style,
    /// Current options; pre-process plugins may have rewritten them
    pub options: Arc<FormatOptions>,
    pub value_state: ValueState,
    pub locale: String,
    pub mode: ExecutionMode,
    /// Base formatter for `options`, once it has been built
    pub base: Option<Arc<NativeNumberFormat>>,
}

impl FormatContext {
    pub fn extend(&self) -> &ExtendOptions {
        &self.options.extend
    }

    /// Style of the current options, as seen by the base formatter
    pub fn current_style(&self) -> Style {
        self.options.style.unwrap_or(self.style)
    }

    pub(crate) fn with_step(&self, value: f64, options: FormatOptions) -> Self {
        Self {
            value,
            options: Arc::new(options),
            base: None,
            ..self.clone()
        }
    }
}

/// Snapshot of one parse call
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub input: String,
    pub style: Style,
    pub options: Arc<ParseOptions>,
    pub strict: bool,
    pub group_separator: String,
    pub decimal_separator: String,
}

/// A context of either pipeline, used for applicability checks
#[derive(Debug, Clone, Copy)]
pub enum PhaseContext<'a> {
    Format(&'a FormatContext),
    Parse(&'a ParseContext),
}

/// Result of a pre-parse step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreParseOutcome {
    /// Continue with the transformed input
    Continue(String),
    /// Stop parsing; the message becomes the parse error
    Reject(String),
}

pub trait PreProcessHandler: Send + Sync {
    fn is_applicable(&self, _ctx: &FormatContext) -> bool {
        true
    }

    fn process_value(&self, value: f64, _ctx: &FormatContext) -> Result<f64> {
        Ok(value)
    }

    fn process_options(&self, options: FormatOptions, _ctx: &FormatContext) -> Result<FormatOptions> {
        Ok(options)
    }
}

pub trait FormatHandler: Send + Sync {
    fn is_applicable(&self, _ctx: &FormatContext) -> bool {
        true
    }

    fn process_result(&self, output: FormatOutput, ctx: &FormatContext) -> Result<FormatOutput>;
}

pub trait PostProcessHandler: Send + Sync {
    fn is_applicable(&self, _ctx: &FormatContext) -> bool {
        true
    }

    fn process_result(&self, output: FormatOutput, ctx: &FormatContext) -> Result<FormatOutput>;
}

pub trait PreParseHandler: Send + Sync {
    fn is_applicable(&self, _ctx: &ParseContext) -> bool {
        true
    }

    fn process_parse_input(&self, input: String, ctx: &ParseContext) -> PreParseOutcome;
}

pub trait PostParseHandler: Send + Sync {
    fn is_applicable(&self, _ctx: &ParseContext) -> bool {
        true
    }

    fn process_parse_result(&self, result: ParseResult, ctx: &ParseContext) -> Result<ParseResult>;
}

impl<F> FormatHandler for F
where
    F: Fn(FormatOutput, &FormatContext) -> Result<FormatOutput> + Send + Sync,
{
    fn process_result(&self, output: FormatOutput, ctx: &FormatContext) -> Result<FormatOutput> {
        self(output, ctx)
    }
}

impl<F> PostProcessHandler for F
where
    F: Fn(FormatOutput, &FormatContext) -> Result<FormatOutput> + Send + Sync,
{
    fn process_result(&self, output: FormatOutput, ctx: &FormatContext) -> Result<FormatOutput> {
        self(output, ctx)
    }
}

impl<F> PreParseHandler for F
where
    F: Fn(String, &ParseContext) -> PreParseOutcome + Send + Sync,
{
    fn process_parse_input(&self, input: String, ctx: &ParseContext) -> PreParseOutcome {
        self(input, ctx)
    }
}

impl<F> PostParseHandler for F
where
    F: Fn(ParseResult, &ParseContext) -> Result<ParseResult> + Send + Sync,
{
    fn process_parse_result(&self, result: ParseResult, ctx: &ParseContext) -> Result<ParseResult> {
        self(result, ctx)
    }
}

/// The phase-specific behavior of a plugin
pub enum PluginHandler {
    PreProcess(Box<dyn PreProcessHandler>),
    Format(Box<dyn FormatHandler>),
    PostProcess(Box<dyn PostProcessHandler>),
    PreParse(Box<dyn PreParseHandler>),
    PostParse(Box<dyn PostParseHandler>),
}

impl PluginHandler {
    pub fn phase(&self) -> Phase {
        match self {
            PluginHandler::PreProcess(_) => Phase::PreProcess,
            PluginHandler::Format(_) => Phase::Format,
            PluginHandler::PostProcess(_) => Phase::PostProcess,
            PluginHandler::PreParse(_) => Phase::PreParse,
            PluginHandler::PostParse(_) => Phase::PostParse,
        }
    }

    /// A handler is never applicable to a context of the other pipeline
    pub fn is_applicable(&self, ctx: PhaseContext<'_>) -> bool {
        match (self, ctx) {
            (PluginHandler::PreProcess(h), PhaseContext::Format(c)) => h.is_applicable(c),
            (PluginHandler::Format(h), PhaseContext::Format(c)) => h.is_applicable(c),
            (PluginHandler::PostProcess(h), PhaseContext::Format(c)) => h.is_applicable(c),
            (PluginHandler::PreParse(h), PhaseContext::Parse(c)) => h.is_applicable(c),
            (PluginHandler::PostParse(h), PhaseContext::Parse(c)) => h.is_applicable(c),
            _ => false,
        }
    }
}

/// A named, prioritized pipeline extension
pub struct Plugin {
    name: String,
    version: Option<String>,
    description: Option<String>,
    priority: i32,
    handler: PluginHandler,
    specifier_types: Vec<SpecifierType>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, handler: PluginHandler) -> Self {
        Self {
            name: name.into(),
            version: None,
            description: None,
            priority: DEFAULT_PRIORITY,
            handler,
            specifier_types: Vec::new(),
        }
    }

    pub fn pre_process(name: impl Into<String>, handler: impl PreProcessHandler + 'static) -> Self {
        Self::new(name, PluginHandler::PreProcess(Box::new(handler)))
    }

    pub fn format(name: impl Into<String>, handler: impl FormatHandler + 'static) -> Self {
        Self::new(name, PluginHandler::Format(Box::new(handler)))
    }

    pub fn post_process(name: impl Into<String>, handler: impl PostProcessHandler + 'static) -> Self {
        Self::new(name, PluginHandler::PostProcess(Box::new(handler)))
    }

    pub fn pre_parse(name: impl Into<String>, handler: impl PreParseHandler + 'static) -> Self {
        Self::new(name, PluginHandler::PreParse(Box::new(handler)))
    }

    pub fn post_parse(name: impl Into<String>, handler: impl PostParseHandler + 'static) -> Self {
        Self::new(name, PluginHandler::PostParse(Box::new(handler)))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Contribute a specifier type, installed while the plugin is registered
    pub fn with_specifier_type(mut self, specifier_type: SpecifierType) -> Self {
        self.specifier_types.push(specifier_type);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn phase(&self) -> Phase {
        self.handler.phase()
    }

    pub fn handler(&self) -> &PluginHandler {
        &self.handler
    }

    pub fn specifier_types(&self) -> &[SpecifierType] {
        &self.specifier_types
    }

    pub fn is_applicable(&self, ctx: PhaseContext<'_>) -> bool {
        self.handler.is_applicable(ctx)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("priority", &self.priority)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Plugins registered and toggled together under one name
#[derive(Debug)]
pub struct PluginGroup {
    pub name: String,
    pub plugins: Vec<Plugin>,
}

impl PluginGroup {
    pub fn new(name: impl Into<String>, plugins: Vec<Plugin>) -> Self {
        Self {
            name: name.into(),
            plugins,
        }
    }
}

/// The built-in plugin groups
pub fn builtin_groups(settings: &BuiltinSettings) -> Vec<PluginGroup> {
    let mut groups = vec![
        PluginGroup::new("validation", vec![validator::plugin()]),
        PluginGroup::new("decimals", decimals::plugins()),
        PluginGroup::new("fallback", vec![fallback::plugin(settings.fallback.clone())]),
    ];
    groups.extend(ratio::RATIO_SPECS.iter().copied().map(ratio::plugin_group));
    groups.push(uppercase::plugin_group());
    groups
}
