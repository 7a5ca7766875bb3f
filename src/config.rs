//! Engine configuration
//!
//! Every field has a default, so a configuration file only needs the values
//! it changes:
//!
//! ```toml
//! locale = "de-DE"
//! mode = "production"
//! defaultCurrency = "EUR"
//!
//! [formatDefaults]
//! maximumFractionDigits = 2
//!
//! [builtins.fallback]
//! null = "-"
//! ```

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CAPACITY;
use crate::error::{Error, Result};
use crate::locale;
use crate::plugin::BuiltinSettings;
use crate::types::{ExecutionMode, FormatOptions, ParseOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Locale used when options name none
    pub locale: String,
    pub mode: ExecutionMode,
    /// Currency used by the currency style when options name none
    pub default_currency: String,
    /// Applied under the caller options of every formatter
    pub format_defaults: FormatOptions,
    /// Lowest layer of every specifier resolution
    pub specifier_defaults: FormatOptions,
    pub builtins: BuiltinSettings,
    /// Capacity of each formatter, parser and specifier cache
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            mode: ExecutionMode::default(),
            default_currency: "USD".to_string(),
            format_defaults: FormatOptions::default(),
            specifier_defaults: FormatOptions::new().with_use_grouping(false),
            builtins: BuiltinSettings::default(),
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Read a configuration from TOML text
    ///
    /// # Arguments
    /// * `text` - TOML document; missing keys keep their defaults
    ///
    /// # Returns
    /// * `Result<EngineConfig>` - The checked configuration
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the locale and currency
    pub fn validate(&self) -> Result<()> {
        if !locale::is_well_formed(&self.locale) {
            return Err(Error::Config(format!("invalid locale '{}'", self.locale)));
        }
        locale::currency_data(&self.default_currency)
            .map_err(|e| Error::Config(e.to_string()))?;
        if self.cache_capacity == 0 {
            return Err(Error::Config("cacheCapacity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Format defaults with the engine locale and currency filled in
    pub fn effective_format_defaults(&self) -> FormatOptions {
        let mut defaults = self.format_defaults.clone();
        defaults.locale.get_or_insert_with(|| self.locale.clone());
        defaults
            .currency
            .get_or_insert_with(|| self.default_currency.clone());
        defaults
    }

    /// `options` with the engine locale filled in
    pub fn effective_parse_options(&self, options: &ParseOptions) -> ParseOptions {
        let mut options = options.clone();
        options.locale.get_or_insert_with(|| self.locale.clone());
        options
    }
}
