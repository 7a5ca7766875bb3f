//! The engine ties the registry, the caches and the specifier resolver together
//!
//! An [`Engine`] is an explicit context object: callers own it and pass it
//! around. A process-wide default instance is available through [`global`],
//! replaced with [`init_global`] and restored with [`reset_global`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::cache::{MemoCache, canonical_key};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::formatter::Formatter;
use crate::parser::{NumberParser, auto};
use crate::plugin::{Plugin, PluginGroup, PluginRegistry};
use crate::specifier::{SpecifierResolution, SpecifierResolver};
use crate::types::{FormatOptions, FormatResult, NumericInput, ParseOptions, ParseResult};

pub struct Engine {
    config: EngineConfig,
    registry: Arc<PluginRegistry>,
    formatters: MemoCache<String, Arc<Formatter>>,
    parsers: MemoCache<String, Arc<NumberParser>>,
    resolver: SpecifierResolver,
    /// Plugins whose specifier types are installed in the resolver
    specifier_sources: Mutex<Vec<String>>,
    /// Registry generation the installed specifier types match
    synced_generation: AtomicU64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine with the built-in plugins registered
    pub fn new(config: EngineConfig) -> Self {
        let registry = Arc::new(PluginRegistry::with_defaults(&config.builtins));
        let resolver = SpecifierResolver::new(
            config.specifier_defaults.clone(),
            Some(config.default_currency.clone()),
            config.cache_capacity,
        );
        let engine = Self {
            formatters: MemoCache::new(config.cache_capacity),
            parsers: MemoCache::new(config.cache_capacity),
            registry,
            resolver,
            specifier_sources: Mutex::new(Vec::new()),
            synced_generation: AtomicU64::new(0),
            config,
        };
        engine.install_all_specifier_types();
        engine.mark_synced();
        engine
    }

    /// Create an engine from a TOML configuration
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(Self::new(EngineConfig::from_toml_str(text)?))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The plugin registry
    ///
    /// Mutating it directly is allowed; specifier types of added or removed
    /// plugins are brought in line before the next specifier is resolved.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &SpecifierResolver {
        &self.resolver
    }

    fn install_specifier_types(&self, plugin: &Plugin) {
        if plugin.specifier_types().is_empty() {
            return;
        }
        let mut sources = self.specifier_sources.lock();
        if sources.iter().any(|s| s == plugin.name()) {
            return;
        }
        self.resolver
            .register_source(plugin.name(), plugin.specifier_types());
        sources.push(plugin.name().to_string());
    }

    fn install_all_specifier_types(&self) {
        for info in self.registry.get_all() {
            if let Some(plugin) = self.registry.get(&info.name) {
                self.install_specifier_types(&plugin);
            }
        }
    }

    fn mark_synced(&self) {
        self.synced_generation
            .store(self.registry.generation(), Ordering::Release);
    }

    /// Reconcile the resolver with registry changes made behind the engine's back
    fn sync_specifier_types(&self) {
        let generation = self.registry.generation();
        if self.synced_generation.load(Ordering::Acquire) == generation {
            return;
        }
        let stale: Vec<String> = self
            .specifier_sources
            .lock()
            .iter()
            .filter(|name| self.registry.get(name).is_none())
            .cloned()
            .collect();
        for name in stale {
            debug!(plugin = %name, "Dropping specifier types of a removed plugin");
            self.uninstall_specifier_types(&name);
        }
        self.install_all_specifier_types();
        self.synced_generation.store(generation, Ordering::Release);
    }

    fn uninstall_specifier_types(&self, name: &str) {
        let mut sources = self.specifier_sources.lock();
        if let Some(at) = sources.iter().position(|s| s == name) {
            sources.remove(at);
            drop(sources);
            self.resolver.unregister_source(name);
        }
    }

    /// Register `plugin` and any specifier types it contributes
    ///
    /// Returns false when a plugin of the same name is already registered.
    pub fn register_plugin(&self, plugin: Plugin) -> bool {
        let name = plugin.name().to_string();
        if !self.registry.register(plugin, None) {
            return false;
        }
        if let Some(plugin) = self.registry.get(&name) {
            self.install_specifier_types(&plugin);
        }
        true
    }

    /// Register every plugin of `group`; returns how many were accepted
    pub fn register_plugin_group(&self, group: PluginGroup) -> usize {
        let names: Vec<String> = group.plugins.iter().map(|p| p.name().to_string()).collect();
        let accepted = self.registry.register_group(group);
        for name in names {
            if let Some(plugin) = self.registry.get(&name) {
                self.install_specifier_types(&plugin);
            }
        }
        accepted
    }

    /// Unregister `name` and roll back the specifier types it installed
    pub fn unregister_plugin(&self, name: &str) -> bool {
        let removed = self.registry.unregister(name);
        if removed {
            self.uninstall_specifier_types(name);
        }
        removed
    }

    /// Unregister every plugin of `group` along with its specifier types
    pub fn unregister_plugin_group(&self, group: &str) -> bool {
        let removed = self.registry.unregister_group(group);
        if removed {
            self.sync_specifier_types();
        }
        removed
    }

    /// Restore the built-in plugins and specifier types and drop all caches
    pub fn reset_to_defaults(&self) {
        let sources: Vec<String> = self.specifier_sources.lock().drain(..).collect();
        for source in sources {
            self.resolver.unregister_source(&source);
        }
        self.registry.reset_to_defaults(&self.config.builtins);
        self.install_all_specifier_types();
        self.mark_synced();
        self.clear_caches();
        debug!("Engine reset to defaults");
    }

    pub fn clear_caches(&self) {
        self.formatters.clear();
        self.parsers.clear();
        self.resolver.clear_cache();
    }

    /// The formatter for `options`, shared between calls with equal options
    ///
    /// # Arguments
    /// * `options` - Caller options, laid over the configured defaults
    ///
    /// # Returns
    /// * `Result<Arc<Formatter>>` - Fails in development mode on conflicting
    ///   digit options
    pub fn formatter(&self, options: &FormatOptions) -> Result<Arc<Formatter>> {
        let key = canonical_key(options, "formatter");
        self.formatters.get_or_try_insert_with(key, || {
            let defaults = self.config.effective_format_defaults();
            Formatter::with_defaults(options, Some(&defaults), self.registry.clone(), self.config.mode)
                .map(Arc::new)
        })
    }

    pub fn format(&self, input: impl Into<NumericInput>, options: &FormatOptions) -> Result<FormatResult> {
        Ok(self.formatter(options)?.format(input))
    }

    /// The parser for `options`, shared between calls with equal options
    pub fn parser(&self, options: &ParseOptions) -> Arc<NumberParser> {
        let options = self.config.effective_parse_options(options);
        let key = canonical_key(&options, "parser");
        self.parsers
            .get_or_insert_with(key, || Arc::new(NumberParser::new(&options, self.registry.clone())))
    }

    pub fn parse(&self, input: &str, options: &ParseOptions) -> ParseResult {
        self.parser(options).parse(input)
    }

    /// Parse `input` with the style and notation its markers suggest
    pub fn parse_auto(&self, input: &str, options: Option<&ParseOptions>) -> ParseResult {
        let base = self
            .config
            .effective_parse_options(options.unwrap_or(&ParseOptions::default()));
        let detected = auto::auto_options(input, &base);
        debug!(input, style = ?detected.style, notation = ?detected.notation, "Detected parse options");
        self.parser(&detected).parse(input)
    }

    pub fn resolve_specifier(&self, specifier: &str, overrides: Option<&FormatOptions>) -> Result<SpecifierResolution> {
        self.sync_specifier_types();
        self.resolver.resolve(specifier, overrides)
    }

    /// Format `input` with a specifier such as `"+,.2f"` or `"per-mille|.1"`
    ///
    /// # Arguments
    /// * `specifier` - The specifier string
    /// * `input` - The value to format
    /// * `overrides` - Options that win over everything the specifier derives
    ///
    /// # Returns
    /// * `Result<FormatResult>` - The padded result; fails on unsupported
    ///   specifiers
    pub fn format_specifier(
        &self,
        specifier: &str,
        input: impl Into<NumericInput>,
        overrides: Option<&FormatOptions>,
    ) -> Result<FormatResult> {
        let resolution = self.resolve_specifier(specifier, overrides)?;
        let result = self.formatter(&resolution.options)?.format(input);
        Ok(resolution.apply_layout(result))
    }
}

static GLOBAL: OnceLock<RwLock<Arc<Engine>>> = OnceLock::new();

fn global_slot() -> &'static RwLock<Arc<Engine>> {
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(Engine::default())))
}

/// The process-wide default engine
pub fn global() -> Arc<Engine> {
    global_slot().read().clone()
}

/// Replace the process-wide engine
pub fn init_global(config: EngineConfig) -> Arc<Engine> {
    let engine = Arc::new(Engine::new(config));
    *global_slot().write() = engine.clone();
    engine
}

/// Restore the process-wide engine to the default configuration
pub fn reset_global() {
    *global_slot().write() = Arc::new(Engine::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::specifier::{SpecifierFields, SpecifierType, TypeKey};
    use crate::types::{ExecutionMode, FormatOutput, Style};
    use crate::plugin::FormatContext;

    #[test]
    fn test_formatter_is_cached() {
        let engine = Engine::default();
        let options = FormatOptions::new().with_maximum_fraction_digits(2);
        let a = engine.formatter(&options).unwrap();
        let b = engine.formatter(&options.clone()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        engine.clear_caches();
        let c = engine.formatter(&options).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_parser_is_cached() {
        let engine = Engine::default();
        let a = engine.parser(&ParseOptions::new());
        let b = engine.parser(&ParseOptions::new().with_locale("en-US"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_development_errors_surface() {
        let engine = Engine::new(EngineConfig::default().with_mode(ExecutionMode::Development));
        let options = FormatOptions::new().with_fraction_digits(4, 1);
        assert!(matches!(engine.formatter(&options), Err(Error::InvalidOptions(_))));

        let engine = Engine::new(EngineConfig::default().with_mode(ExecutionMode::Production));
        assert!(engine.format(1.5, &options).is_ok());
    }

    #[test]
    fn test_builtin_specifier_tokens() {
        let engine = Engine::default();
        let result = engine.format_specifier("per-mille|.1", 0.1234, None).unwrap();
        assert_eq!(result.formatted, "123.4‰");

        let result = engine
            .format_specifier("localized-uppercase|", 1234.56, None)
            .unwrap();
        assert_eq!(result.formatted, "壹仟贰佰叁拾肆点伍陆");
    }

    #[test]
    fn test_unregister_rolls_back_tokens() {
        let engine = Engine::default();
        assert!(engine.unregister_plugin("per-mille-pre-process"));
        assert!(matches!(
            engine.resolve_specifier("per-mille|.1", None),
            Err(Error::UnsupportedSpecifier(_))
        ));

        engine.reset_to_defaults();
        assert!(engine.resolve_specifier("per-mille|.1", None).is_ok());
    }

    #[test]
    fn test_direct_registry_changes_reach_the_resolver() {
        let engine = Engine::default();
        assert!(engine.resolve_specifier("per-myriad|.0", None).is_ok());

        assert!(engine.registry().unregister_group("per-myriad"));
        assert!(matches!(
            engine.format_specifier("per-myriad|.0", 0.05, None),
            Err(Error::UnsupportedSpecifier(_))
        ));

        engine.registry().clear();
        assert!(engine.resolve_specifier("per-mille|.1", None).is_err());

        engine.registry().reset_to_defaults(&engine.config().builtins);
        let result = engine.format_specifier("per-myriad|.0", 0.05, None).unwrap();
        assert_eq!(result.formatted, "500‱");
    }

    #[test]
    fn test_unregister_plugin_group() {
        let engine = Engine::default();
        assert!(engine.unregister_plugin_group("percentage-point"));
        assert!(!engine.unregister_plugin_group("percentage-point"));
        assert!(engine.resolve_specifier("percentage-point|.1", None).is_err());
        assert!(engine.resolve_specifier("per-mille|.1", None).is_ok());
    }

    #[test]
    fn test_register_plugin_with_specifier_type() {
        let engine = Engine::default();
        let plugin = Plugin::post_process(
            "stars",
            |mut output: FormatOutput, _ctx: &FormatContext| -> Result<FormatOutput> {
                output.formatted = format!("*{}*", output.formatted);
                Ok(output)
            },
        )
        .with_specifier_type(SpecifierType::new(
            TypeKey::Char('z'),
            |_fields: &SpecifierFields| FormatOptions::new().with_style(Style::Percent),
        ));
        assert!(engine.register_plugin(plugin));

        let result = engine.format_specifier("z", 0.5, None).unwrap();
        assert_eq!(result.formatted, "*50%*");

        assert!(engine.unregister_plugin("stars"));
        assert!(engine.format_specifier("z", 0.5, None).is_err());
    }

    #[test]
    fn test_parse_auto() {
        let engine = Engine::default();
        assert_eq!(engine.parse_auto("12.5%", None).value, 0.125);
        assert_eq!(engine.parse_auto("123‰", None).value, 0.123);
        assert_eq!(engine.parse_auto("$1,234.50", None).value, 1234.5);
        assert_eq!(engine.parse_auto("1.2K", None).value, 1200.0);
        assert_eq!(engine.parse_auto("负叁拾贰", None).value, -32.0);
        assert_eq!(engine.parse_auto("1,234", None).value, 1234.0);
    }

    #[test]
    fn test_global_lifecycle() {
        let engine = init_global(EngineConfig::default().with_locale("de-DE"));
        assert!(Arc::ptr_eq(&engine, &global()));
        reset_global();
        assert_eq!(global().config().locale, "en-US");
    }
}
