//! Locale support for number formatting and parsing
//!
//! This module loads the embedded locale data (number symbols, affix patterns,
//! compact units and currency metadata) and resolves locale tags against it.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::error::{Error, Result};

/// Locale used when a well-formed tag matches no known locale
pub const DEFAULT_LOCALE: &str = "en_US";

/// One element of an affix pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffixPart {
    /// The percent or currency symbol
    Symbol,
    Literal(String),
}

/// Where a symbol goes relative to the number, e.g. `¤#` or `#\u{a0}%`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AffixPattern {
    pub prefix: Vec<AffixPart>,
    pub suffix: Vec<AffixPart>,
}

impl AffixPattern {
    /// Parse a pattern where `#` is the number and `%` or `¤` the symbol
    pub fn parse(pattern: &str) -> Self {
        let mut result = AffixPattern::default();
        let mut after_number = false;
        let mut literal = String::new();

        let flush = |literal: &mut String, target: &mut Vec<AffixPart>| {
            if !literal.is_empty() {
                target.push(AffixPart::Literal(std::mem::take(literal)));
            }
        };

        for c in pattern.chars() {
            let target = if after_number {
                &mut result.suffix
            } else {
                &mut result.prefix
            };
            match c {
                '#' => {
                    flush(&mut literal, target);
                    after_number = true;
                }
                '%' | '¤' => {
                    flush(&mut literal, target);
                    target.push(AffixPart::Symbol);
                }
                _ => literal.push(c),
            }
        }
        let target = if after_number {
            &mut result.suffix
        } else {
            &mut result.prefix
        };
        flush(&mut literal, target);
        result
    }

    pub fn is_prefix(&self) -> bool {
        self.prefix.contains(&AffixPart::Symbol)
    }
}

/// A compact-notation magnitude, e.g. 10^6 → "M"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactUnit {
    pub exponent: i32,
    pub suffix: String,
}

/// Metadata of one currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyData {
    pub code: String,
    pub symbol: String,
    pub narrow_symbol: String,
    pub digits: u8,
    pub name: String,
}

impl CurrencyData {
    /// Metadata for a well-formed code missing from the embedded table
    pub fn unknown(code: &str) -> Self {
        Self {
            code: code.to_string(),
            symbol: code.to_string(),
            narrow_symbol: code.to_string(),
            digits: 2,
            name: code.to_string(),
        }
    }
}

/// Number symbols of one locale
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleSettings {
    pub id: String,
    pub decimal: String,
    pub group: String,
    pub percent_sign: String,
    pub minus_sign: String,
    pub plus_sign: String,
    pub infinity: String,
    pub nan: String,
    pub exponent_separator: String,
    pub percent_pattern: AffixPattern,
    pub currency_pattern: AffixPattern,
    pub compact_units: Vec<CompactUnit>,
    /// Locale-specific currency symbols overriding the global table
    pub currency_symbols: HashMap<String, String>,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            id: DEFAULT_LOCALE.to_string(),
            decimal: ".".to_string(),
            group: ",".to_string(),
            percent_sign: "%".to_string(),
            minus_sign: "-".to_string(),
            plus_sign: "+".to_string(),
            infinity: "∞".to_string(),
            nan: "NaN".to_string(),
            exponent_separator: "E".to_string(),
            percent_pattern: AffixPattern::parse("#%"),
            currency_pattern: AffixPattern::parse("¤#"),
            compact_units: Vec::new(),
            currency_symbols: HashMap::new(),
        }
    }
}

impl LocaleSettings {
    /// The symbol shown for `currency` in this locale
    pub fn currency_symbol(&self, currency: &CurrencyData) -> String {
        self.currency_symbols
            .get(&currency.code)
            .cloned()
            .unwrap_or_else(|| currency.symbol.clone())
    }

    pub fn with_decimal(mut self, decimal: impl Into<String>) -> Self {
        self.decimal = decimal.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }
}

/// Provides access to the embedded locale data
struct LocaleManager {
    aliases: HashMap<String, String>,
    locale_settings: HashMap<String, LocaleSettings>,
    currencies: HashMap<String, CurrencyData>,
}

// Global singleton for locale data
static LOCALE_MANAGER: OnceLock<LocaleManager> = OnceLock::new();

impl LocaleManager {
    fn new() -> Self {
        let mut manager = Self {
            aliases: HashMap::new(),
            locale_settings: HashMap::new(),
            currencies: HashMap::new(),
        };

        if let Err(e) = manager.load_embedded_data() {
            // Continue with the built-in defaults only
            tracing::error!(error = %e, "Failed to load embedded locale data");
            manager
                .locale_settings
                .insert(DEFAULT_LOCALE.to_string(), LocaleSettings::default());
        }

        manager
    }

    fn load_embedded_data(&mut self) -> Result<()> {
        let toml_str = include_str!("locale/locale_settings.toml");
        let parsed: toml::Value =
            toml::from_str(toml_str).map_err(|e| Error::LocaleData(e.to_string()))?;

        let table = parsed
            .as_table()
            .ok_or_else(|| Error::LocaleData("Root is not a table".to_string()))?;

        let base_settings = match table.get("base") {
            Some(base) => {
                let mut settings = LocaleSettings::default();
                Self::apply_locale_specific_settings(&mut settings, base)?;
                settings
            }
            None => LocaleSettings::default(),
        };

        if let Some(aliases) = table.get("aliases").and_then(|v| v.as_table()) {
            for (alias, target) in aliases {
                if let Some(target) = target.as_str() {
                    self.aliases.insert(alias.to_string(), target.to_string());
                }
            }
        }

        if let Some(currencies) = table.get("currencies").and_then(|v| v.as_table()) {
            for (code, value) in currencies {
                let data = Self::parse_currency(code, value)?;
                self.currencies.insert(code.to_string(), data);
            }
        }

        let locales = table
            .get("locales")
            .and_then(|v| v.as_table())
            .ok_or_else(|| Error::LocaleData("Missing [locales] table".to_string()))?;

        for (locale_id, value) in locales {
            let mut settings = base_settings.clone();
            settings.id = locale_id.to_string();
            Self::apply_locale_specific_settings(&mut settings, value)?;
            self.locale_settings.insert(locale_id.to_string(), settings);
        }

        Ok(())
    }

    fn parse_currency(code: &str, value: &toml::Value) -> Result<CurrencyData> {
        let table = value
            .as_table()
            .ok_or_else(|| Error::LocaleData(format!("currency {code} is not a table")))?;

        let symbol = table
            .get("symbol")
            .and_then(|v| v.as_str())
            .unwrap_or(code)
            .to_string();
        let narrow_symbol = table
            .get("narrow")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| symbol.clone());
        let digits = table
            .get("digits")
            .and_then(|v| v.as_integer())
            .unwrap_or(2);
        let digits = u8::try_from(digits)
            .map_err(|_| Error::LocaleData(format!("invalid digits for currency {code}")))?;
        let name = table
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(code)
            .to_string();

        Ok(CurrencyData {
            code: code.to_string(),
            symbol,
            narrow_symbol,
            digits,
            name,
        })
    }

    /// Apply the keys present in `value` over `settings`
    fn apply_locale_specific_settings(
        settings: &mut LocaleSettings,
        value: &toml::Value,
    ) -> Result<()> {
        let table = value
            .as_table()
            .ok_or_else(|| Error::LocaleData("Locale setting is not a table".to_string()))?;

        let string_field = |key: &str| table.get(key).and_then(|v| v.as_str()).map(str::to_string);

        if let Some(decimal) = string_field("decimal") {
            settings.decimal = decimal;
        }
        if let Some(group) = string_field("group") {
            settings.group = group;
        }
        if let Some(percent) = string_field("percent") {
            settings.percent_sign = percent;
        }
        if let Some(minus) = string_field("minus") {
            settings.minus_sign = minus;
        }
        if let Some(plus) = string_field("plus") {
            settings.plus_sign = plus;
        }
        if let Some(infinity) = string_field("infinity") {
            settings.infinity = infinity;
        }
        if let Some(nan) = string_field("nan") {
            settings.nan = nan;
        }
        if let Some(exponent) = string_field("exponent") {
            settings.exponent_separator = exponent;
        }
        if let Some(pattern) = string_field("percent_pattern") {
            settings.percent_pattern = AffixPattern::parse(&pattern);
        }
        if let Some(pattern) = string_field("currency_pattern") {
            settings.currency_pattern = AffixPattern::parse(&pattern);
        }

        if let Some(units) = table.get("compact").and_then(|v| v.as_array()) {
            let mut compact_units = Vec::with_capacity(units.len());
            for unit in units {
                let pair = unit.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
                    Error::LocaleData("compact unit must be [exponent, suffix]".to_string())
                })?;
                let exponent = pair[0]
                    .as_integer()
                    .and_then(|e| i32::try_from(e).ok())
                    .ok_or_else(|| Error::LocaleData("invalid compact exponent".to_string()))?;
                let suffix = pair[1]
                    .as_str()
                    .ok_or_else(|| Error::LocaleData("invalid compact suffix".to_string()))?;
                compact_units.push(CompactUnit {
                    exponent,
                    suffix: suffix.to_string(),
                });
            }
            compact_units.sort_by_key(|u| u.exponent);
            settings.compact_units = compact_units;
        }

        if let Some(symbols) = table.get("currency_symbols").and_then(|v| v.as_table()) {
            for (code, symbol) in symbols {
                if let Some(symbol) = symbol.as_str() {
                    settings
                        .currency_symbols
                        .insert(code.to_string(), symbol.to_string());
                }
            }
        }

        Ok(())
    }

    fn get() -> &'static Self {
        LOCALE_MANAGER.get_or_init(Self::new)
    }

    /// Find the settings for a normalized `lang_REGION` key, then by language
    fn lookup(&self, key: &str) -> Option<&LocaleSettings> {
        if let Some(settings) = self.locale_settings.get(key) {
            return Some(settings);
        }
        let language = key.split('_').next().unwrap_or(key);
        self.aliases
            .get(language)
            .and_then(|target| self.locale_settings.get(target))
    }
}

/// Checks that `tag` is a well-formed BCP 47 style tag (`-` or `_` separated)
pub fn is_well_formed(tag: &str) -> bool {
    let mut subtags = tag.split(['-', '_']);
    let Some(language) = subtags.next() else {
        return false;
    };
    let language_ok = matches!(language.len(), 2..=3 | 5..=8)
        && language.chars().all(|c| c.is_ascii_alphabetic());
    language_ok
        && subtags.all(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Normalize a tag like `zh-Hant-TW` or `en_us` to the `lang_REGION` key form
pub fn normalize_tag(tag: &str) -> String {
    let mut subtags = tag.split(['-', '_']);
    let language = subtags.next().unwrap_or_default().to_ascii_lowercase();
    let region = subtags.find(|s| {
        (s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
            || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()))
    });
    match region {
        Some(region) => format!("{language}_{}", region.to_ascii_uppercase()),
        None => language,
    }
}

/// Get locale settings by locale identifier (e.g., "en_US", "de-DE", "zh")
///
/// Returns `None` when neither the full tag nor its language is known.
pub fn get_locale_settings(locale_id: &str) -> Option<LocaleSettings> {
    LocaleManager::get()
        .lookup(&normalize_tag(locale_id))
        .cloned()
}

/// Resolve a locale tag the way locale negotiation does
///
/// Malformed tags are an error; well-formed but unknown tags fall back to
/// [`DEFAULT_LOCALE`].
pub fn resolve_locale(tag: &str) -> Result<LocaleSettings> {
    if !is_well_formed(tag) {
        return Err(Error::InvalidLocale(tag.to_string()));
    }
    let manager = LocaleManager::get();
    if let Some(settings) = manager.lookup(&normalize_tag(tag)) {
        return Ok(settings.clone());
    }
    debug!(locale = tag, fallback = DEFAULT_LOCALE, "Unknown locale, using default");
    Ok(manager
        .locale_settings
        .get(DEFAULT_LOCALE)
        .cloned()
        .unwrap_or_default())
}

/// Look up currency metadata; well-formed unknown codes get generic metadata
pub fn currency_data(code: &str) -> Result<CurrencyData> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidCurrency(code.to_string()));
    }
    let code = code.to_ascii_uppercase();
    Ok(LocaleManager::get()
        .currencies
        .get(&code)
        .cloned()
        .unwrap_or_else(|| CurrencyData::unknown(&code)))
}

/// Every currency symbol known to the embedded data, longest first
pub fn known_currency_symbols() -> Vec<String> {
    let manager = LocaleManager::get();
    let mut symbols: Vec<String> = manager
        .currencies
        .values()
        .flat_map(|c| [c.symbol.clone(), c.narrow_symbol.clone()])
        .chain(
            manager
                .locale_settings
                .values()
                .flat_map(|s| s.currency_symbols.values().cloned()),
        )
        .collect();
    symbols.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    symbols.dedup();
    symbols
}

/// List all available locale identifiers
pub fn list_available_locales() -> Vec<String> {
    let mut locales: Vec<String> = LocaleManager::get()
        .locale_settings
        .keys()
        .cloned()
        .collect();
    locales.sort();
    locales
}
