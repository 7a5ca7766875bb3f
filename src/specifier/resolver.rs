//! Specifier resolution
//!
//! Maps parsed specifier fields to a [`FormatOptions`] set through a table of
//! type handlers. Handlers and per-type defaults can be contributed by named
//! sources (plugins); each contribution records what it replaced so that
//! removing the source restores the previous table state exactly.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::MemoCache;
use crate::error::{Error, Result};
use crate::specifier::grammar::parse_specifier;
use crate::specifier::tokens::{Align, SignFlag, SpecifierFields, SymbolFlag};
use crate::types::{
    CurrencyDisplay, CurrencySign, FormatOptions, FormatResult, Notation, NumberPart, PartKind,
    SignDisplay, Style,
};

/// Key of the type table: a single type character or a named token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Char(char),
    /// Lower-cased token name
    Token(String),
}

impl TypeKey {
    pub fn token(name: &str) -> Self {
        TypeKey::Token(name.to_ascii_lowercase())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Char(c) => write!(f, "type '{c}'"),
            TypeKey::Token(t) => write!(f, "token '{t}'"),
        }
    }
}

/// Builds the option set of one specifier type
pub type TypeHandler = Arc<dyn Fn(&SpecifierFields) -> FormatOptions + Send + Sync>;

/// A type handler plus optional per-type defaults
#[derive(Clone)]
pub struct SpecifierType {
    pub key: TypeKey,
    pub handler: TypeHandler,
    pub defaults: Option<FormatOptions>,
}

impl SpecifierType {
    pub fn new<F>(key: TypeKey, handler: F) -> Self
    where
        F: Fn(&SpecifierFields) -> FormatOptions + Send + Sync + 'static,
    {
        Self {
            key,
            handler: Arc::new(handler),
            defaults: None,
        }
    }

    pub fn with_defaults(mut self, defaults: FormatOptions) -> Self {
        self.defaults = Some(defaults);
        self
    }
}

impl fmt::Debug for SpecifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecifierType")
            .field("key", &self.key)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Padding applied after formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub fill: char,
    pub align: Align,
    pub width: usize,
}

/// The outcome of resolving one specifier
#[derive(Debug, Clone, PartialEq)]
pub struct SpecifierResolution {
    pub specifier: String,
    pub fields: SpecifierFields,
    /// `None` when the specifier has no type
    pub key: Option<TypeKey>,
    pub options: FormatOptions,
}

impl SpecifierResolution {
    pub fn padding(&self) -> Option<Padding> {
        let width = self.fields.width?;
        let (fill, align) = if self.fields.zero {
            (
                self.fields.fill.unwrap_or('0'),
                self.fields.align.unwrap_or(Align::SignAware),
            )
        } else {
            (
                self.fields.fill.unwrap_or(' '),
                self.fields.align.unwrap_or(Align::Right),
            )
        };
        Some(Padding { fill, align, width })
    }

    /// Apply the space-sign flag and padding to a formatted result
    ///
    /// `formatted` is rebuilt from the parts only when the layout changes them.
    pub fn apply_layout(&self, mut result: FormatResult) -> FormatResult {
        let mut changed = false;
        if self.fields.sign == Some(SignFlag::Space)
            && result.value_state.is_valid()
            && !result.parts.iter().any(|p| {
                matches!(p.kind, PartKind::MinusSign)
                    || (p.kind == PartKind::Literal && p.value == "(")
            })
        {
            result.parts.insert(0, NumberPart::new(PartKind::Literal, " "));
            changed = true;
        }

        if let Some(padding) = self.padding() {
            let len: usize = result.parts.iter().map(|p| p.value.chars().count()).sum();
            if padding.width > len {
                pad_parts(&mut result.parts, padding, padding.width - len);
                changed = true;
            }
        }

        if changed {
            result.formatted = result.parts.iter().map(|p| p.value.as_str()).collect();
        }
        result
    }
}

fn pad_parts(parts: &mut Vec<NumberPart>, padding: Padding, count: usize) {
    let fill = |n: usize| NumberPart::new(PartKind::Literal, padding.fill.to_string().repeat(n));
    match padding.align {
        Align::Left => parts.push(fill(count)),
        Align::Right => parts.insert(0, fill(count)),
        Align::Center => {
            let left = count / 2;
            parts.push(fill(count - left));
            if left > 0 {
                parts.insert(0, fill(left));
            }
        }
        Align::SignAware => {
            // After the leading sign and symbol, before the first digit
            let at = parts
                .iter()
                .position(|p| {
                    !matches!(
                        p.kind,
                        PartKind::MinusSign
                            | PartKind::PlusSign
                            | PartKind::Currency
                            | PartKind::Literal
                    )
                })
                .unwrap_or(parts.len());
            parts.insert(at, fill(count));
        }
    }
}

#[derive(Clone)]
struct Slot<T> {
    value: T,
    /// Contributing source; `None` for the built-in table
    owner: Option<String>,
}

/// What one registration replaced, captured when it was installed
#[derive(Clone)]
struct Undo<T> {
    key: TypeKey,
    previous: Option<Slot<T>>,
}

#[derive(Default)]
struct SourceUndo {
    handlers: Vec<Undo<TypeHandler>>,
    defaults: Vec<Undo<FormatOptions>>,
}

#[derive(Default)]
struct ResolverState {
    handlers: HashMap<TypeKey, Slot<TypeHandler>>,
    defaults: HashMap<TypeKey, Slot<FormatOptions>>,
    undo: HashMap<String, SourceUndo>,
}

/// Resolves specifier strings into option sets
pub struct SpecifierResolver {
    state: Mutex<ResolverState>,
    global_defaults: FormatOptions,
    default_currency: Option<String>,
    cache: MemoCache<String, Arc<SpecifierResolution>>,
}

impl fmt::Debug for SpecifierResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecifierResolver")
            .field("global_defaults", &self.global_defaults)
            .field("default_currency", &self.default_currency)
            .finish_non_exhaustive()
    }
}

impl SpecifierResolver {
    /// Create a resolver with the built-in type table
    pub fn new(global_defaults: FormatOptions, default_currency: Option<String>, cache_capacity: usize) -> Self {
        let mut state = ResolverState::default();
        for t in builtin_types() {
            state.handlers.insert(
                t.key.clone(),
                Slot {
                    value: t.handler,
                    owner: None,
                },
            );
            if let Some(defaults) = t.defaults {
                state.defaults.insert(
                    t.key,
                    Slot {
                        value: defaults,
                        owner: None,
                    },
                );
            }
        }
        Self {
            state: Mutex::new(state),
            global_defaults,
            default_currency,
            cache: MemoCache::new(cache_capacity),
        }
    }

    /// Install the types contributed by `source`
    ///
    /// Each replaced entry is recorded so [`unregister_source`](Self::unregister_source)
    /// can restore it.
    pub fn register_source(&self, source: &str, types: &[SpecifierType]) {
        if types.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        let mut undo = state.undo.remove(source).unwrap_or_default();
        for t in types {
            let previous = state.handlers.insert(
                t.key.clone(),
                Slot {
                    value: t.handler.clone(),
                    owner: Some(source.to_string()),
                },
            );
            undo.handlers.push(Undo {
                key: t.key.clone(),
                previous,
            });

            if let Some(defaults) = &t.defaults {
                let previous = state.defaults.insert(
                    t.key.clone(),
                    Slot {
                        value: defaults.clone(),
                        owner: Some(source.to_string()),
                    },
                );
                undo.defaults.push(Undo {
                    key: t.key.clone(),
                    previous,
                });
            }
            debug!(source, key = %t.key, "Registered specifier type");
        }
        state.undo.insert(source.to_string(), undo);
        drop(state);
        self.cache.clear();
    }

    /// Roll back everything `source` installed; returns false if it installed nothing
    pub fn unregister_source(&self, source: &str) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(undo) = state.undo.remove(source) else {
            return false;
        };

        for record in undo.handlers.into_iter().rev() {
            restore(&mut state.handlers, &mut state.undo, |u| &mut u.handlers, record, source);
        }
        for record in undo.defaults.into_iter().rev() {
            restore(&mut state.defaults, &mut state.undo, |u| &mut u.defaults, record, source);
        }
        drop(guard);
        self.cache.clear();
        debug!(source, "Unregistered specifier types");
        true
    }

    pub fn has_type(&self, key: &TypeKey) -> bool {
        self.state.lock().handlers.contains_key(key)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolve `specifier`, letting `overrides` win over everything it derives
    ///
    /// # Arguments
    /// * `specifier` - The specifier string
    /// * `overrides` - Caller options applied last
    ///
    /// # Returns
    /// * `Result<SpecifierResolution>` - Fails with `UnsupportedSpecifier` for
    ///   malformed specifiers and unknown types or tokens
    pub fn resolve(
        &self,
        specifier: &str,
        overrides: Option<&FormatOptions>,
    ) -> Result<SpecifierResolution> {
        let base = self
            .cache
            .get_or_try_insert_with(specifier.to_string(), || {
                self.resolve_uncached(specifier).map(Arc::new)
            })?;

        let mut resolution = (*base).clone();
        if let Some(overrides) = overrides {
            resolution.options = overrides.merged_over(&resolution.options);
        }
        if resolution.options.style == Some(Style::Currency) && resolution.options.currency.is_none() {
            resolution.options.currency = self.default_currency.clone();
        }
        Ok(resolution)
    }

    fn resolve_uncached(&self, specifier: &str) -> Result<SpecifierResolution> {
        let fields = parse_specifier(specifier)
            .map_err(|e| Error::UnsupportedSpecifier(format!("'{specifier}': {e}")))?;

        let key = match (&fields.token, fields.type_char) {
            (Some(token), _) => Some(TypeKey::Token(token.clone())),
            (None, Some(c)) => Some(TypeKey::Char(c)),
            (None, None) => None,
        };

        let (type_defaults, type_options) = match &key {
            Some(key) => {
                let state = self.state.lock();
                let handler = state
                    .handlers
                    .get(key)
                    .map(|slot| slot.value.clone())
                    .ok_or_else(|| {
                        Error::UnsupportedSpecifier(format!("Unknown {key} in '{specifier}'"))
                    })?;
                let defaults = state.defaults.get(key).map(|slot| slot.value.clone());
                drop(state);
                (defaults, handler(&fields))
            }
            None => (None, untyped_options(&fields)),
        };

        let mut options = self.global_defaults.clone();
        if let Some(defaults) = type_defaults {
            options = defaults.merged_over(&options);
        }
        options = type_options.merged_over(&options);
        apply_flags(&mut options, &fields);

        if fields.symbol.is_some() {
            options.style = Some(Style::Currency);
            options.use_grouping = Some(true);
            options.currency_display = Some(match fields.symbol {
                Some(SymbolFlag::Code) => CurrencyDisplay::Code,
                _ => CurrencyDisplay::Symbol,
            });
        }
        if options.style == Some(Style::Currency) && options.currency.is_none() {
            options.currency = self.default_currency.clone();
        }

        Ok(SpecifierResolution {
            specifier: specifier.to_string(),
            fields,
            key,
            options,
        })
    }
}

/// Put back what `record` replaced, or hand it to the later source that
/// replaced this source's entry in turn
fn restore<T: Clone>(
    table: &mut HashMap<TypeKey, Slot<T>>,
    undo: &mut HashMap<String, SourceUndo>,
    records_of: fn(&mut SourceUndo) -> &mut Vec<Undo<T>>,
    record: Undo<T>,
    source: &str,
) {
    let owned_here = table
        .get(&record.key)
        .is_some_and(|slot| slot.owner.as_deref() == Some(source));

    if owned_here {
        match record.previous {
            Some(previous) => {
                table.insert(record.key, previous);
            }
            None => {
                table.remove(&record.key);
            }
        }
        return;
    }

    for other in undo.values_mut() {
        for later in records_of(other).iter_mut() {
            let replaced_ours = later.key == record.key
                && later
                    .previous
                    .as_ref()
                    .is_some_and(|slot| slot.owner.as_deref() == Some(source));
            if replaced_ours {
                later.previous = record.previous.clone();
            }
        }
    }
}

/// Fraction digits from the precision: fixed, or a maximum with `~`
pub fn fraction_precision(options: &mut FormatOptions, fields: &SpecifierFields) {
    if let Some(precision) = fields.precision {
        if fields.trim {
            options.minimum_fraction_digits = Some(0);
            options.maximum_fraction_digits = Some(precision);
        } else {
            options.minimum_fraction_digits = Some(precision);
            options.maximum_fraction_digits = Some(precision);
        }
    }
}

/// Significant digits from the precision: fixed, or a maximum with `~`
fn significant_precision(options: &mut FormatOptions, fields: &SpecifierFields, trim: bool) {
    if let Some(precision) = fields.precision {
        let precision = precision.clamp(1, 21);
        options.maximum_significant_digits = Some(precision);
        options.minimum_significant_digits = Some(if trim || fields.trim { 1 } else { precision });
    }
}

fn untyped_options(fields: &SpecifierFields) -> FormatOptions {
    let mut options = FormatOptions::new();
    significant_precision(&mut options, fields, true);
    options
}

fn apply_flags(options: &mut FormatOptions, fields: &SpecifierFields) {
    match fields.sign {
        Some(SignFlag::Plus) => {
            options.sign_display = Some(SignDisplay::Always);
            options.extend.include_sign = Some(true);
        }
        Some(SignFlag::Parenthesis) => options.currency_sign = Some(CurrencySign::Accounting),
        Some(SignFlag::Minus) | Some(SignFlag::Space) | None => {}
    }
    if fields.grouping {
        options.use_grouping = Some(true);
    }
}

fn builtin_types() -> Vec<SpecifierType> {
    let fixed = |fields: &SpecifierFields| {
        let mut o = FormatOptions::new().with_style(Style::Decimal);
        fraction_precision(&mut o, fields);
        o
    };
    let significant = |trim: bool| {
        move |fields: &SpecifierFields| {
            let mut o = FormatOptions::new().with_style(Style::Decimal);
            significant_precision(&mut o, fields, trim);
            o
        }
    };
    let fixed_defaults = FormatOptions::new().with_fraction_digits(2, 2);

    vec![
        SpecifierType::new(TypeKey::Char('f'), fixed).with_defaults(fixed_defaults.clone()),
        SpecifierType::new(TypeKey::Char('F'), move |fields: &SpecifierFields| {
            fixed(fields).with_use_grouping(true)
        })
        .with_defaults(fixed_defaults),
        SpecifierType::new(TypeKey::Char('%'), |fields: &SpecifierFields| {
            let mut o = FormatOptions::new().with_style(Style::Percent);
            fraction_precision(&mut o, fields);
            o
        }),
        SpecifierType::new(TypeKey::Char('p'), |fields: &SpecifierFields| {
            let mut o = FormatOptions::new().with_style(Style::Percent);
            significant_precision(&mut o, fields, false);
            o
        }),
        SpecifierType::new(TypeKey::Char('e'), |fields: &SpecifierFields| {
            let mut o = FormatOptions::new().with_notation(Notation::Scientific);
            fraction_precision(&mut o, fields);
            o
        }),
        SpecifierType::new(TypeKey::Char('E'), |fields: &SpecifierFields| {
            let mut o = FormatOptions::new().with_notation(Notation::Engineering);
            fraction_precision(&mut o, fields);
            o
        }),
        SpecifierType::new(TypeKey::Char('g'), significant(false)),
        SpecifierType::new(TypeKey::Char('G'), move |fields: &SpecifierFields| {
            significant(false)(fields).with_use_grouping(true)
        }),
        SpecifierType::new(TypeKey::Char('r'), significant(true)),
        SpecifierType::new(TypeKey::Char('R'), move |fields: &SpecifierFields| {
            significant(true)(fields).with_use_grouping(true)
        }),
        SpecifierType::new(TypeKey::Char('d'), integer_options),
        SpecifierType::new(TypeKey::Char('i'), integer_options),
        SpecifierType::new(TypeKey::Char('s'), |fields: &SpecifierFields| {
            let mut o = FormatOptions::new().with_notation(Notation::Compact);
            significant_precision(&mut o, fields, true);
            o
        }),
    ]
}

fn integer_options(_fields: &SpecifierFields) -> FormatOptions {
    FormatOptions::new()
        .with_style(Style::Decimal)
        .with_fraction_digits(0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> SpecifierResolver {
        SpecifierResolver::new(
            FormatOptions::new().with_use_grouping(false),
            Some("USD".to_string()),
            16,
        )
    }

    #[test]
    fn test_fixed_types() {
        let r = resolver();
        let res = r.resolve(".2f", None).unwrap();
        assert_eq!(res.key, Some(TypeKey::Char('f')));
        assert_eq!(res.options.minimum_fraction_digits, Some(2));
        assert_eq!(res.options.maximum_fraction_digits, Some(2));
        assert_eq!(res.options.use_grouping, Some(false));

        let trimmed = r.resolve(".3~f", None).unwrap();
        assert_eq!(trimmed.options.minimum_fraction_digits, Some(0));
        assert_eq!(trimmed.options.maximum_fraction_digits, Some(3));

        let grouped = r.resolve(",.1F", None).unwrap();
        assert_eq!(grouped.options.use_grouping, Some(true));
    }

    #[test]
    fn test_flags_and_currency() {
        let r = resolver();
        let res = r.resolve("+.2f", None).unwrap();
        assert_eq!(res.options.sign_display, Some(SignDisplay::Always));

        let res = r.resolve("$.2f", None).unwrap();
        assert_eq!(res.options.style, Some(Style::Currency));
        assert_eq!(res.options.currency.as_deref(), Some("USD"));
        assert_eq!(res.options.use_grouping, Some(true));

        let res = r
            .resolve("#.0f", Some(&FormatOptions::new().with_currency("EUR")))
            .unwrap();
        assert_eq!(res.options.currency.as_deref(), Some("EUR"));
        assert_eq!(res.options.currency_display, Some(CurrencyDisplay::Code));
    }

    #[test]
    fn test_caller_overrides_win() {
        let r = resolver();
        let overrides = FormatOptions::new().with_maximum_fraction_digits(4);
        let res = r.resolve(".2f", Some(&overrides)).unwrap();
        assert_eq!(res.options.maximum_fraction_digits, Some(4));
        assert_eq!(res.options.minimum_fraction_digits, Some(2));
    }

    #[test]
    fn test_unknown_type_and_token() {
        let r = resolver();
        assert!(matches!(r.resolve(".2x", None), Err(Error::UnsupportedSpecifier(_))));
        assert!(matches!(r.resolve("nope|.2", None), Err(Error::UnsupportedSpecifier(_))));
        assert!(matches!(r.resolve(".f", None), Err(Error::UnsupportedSpecifier(_))));
    }

    #[test]
    fn test_register_and_rollback() {
        let r = resolver();
        let key = TypeKey::Char('x');
        r.register_source(
            "alpha",
            &[SpecifierType::new(key.clone(), |_| {
                FormatOptions::new().with_maximum_fraction_digits(1)
            })],
        );
        assert_eq!(
            r.resolve("x", None).unwrap().options.maximum_fraction_digits,
            Some(1)
        );

        assert!(r.unregister_source("alpha"));
        assert!(!r.has_type(&key));
        assert!(r.resolve("x", None).is_err());
        assert!(!r.unregister_source("alpha"));
    }

    #[test]
    fn test_override_of_builtin_is_restored() {
        let r = resolver();
        r.register_source(
            "alpha",
            &[SpecifierType::new(TypeKey::Char('f'), |_| {
                FormatOptions::new().with_maximum_fraction_digits(7)
            })],
        );
        assert_eq!(
            r.resolve(".2f", None).unwrap().options.maximum_fraction_digits,
            Some(7)
        );
        r.unregister_source("alpha");
        assert_eq!(
            r.resolve(".2f", None).unwrap().options.maximum_fraction_digits,
            Some(2)
        );
    }

    #[test]
    fn test_out_of_order_unregister_splices() {
        let r = resolver();
        let key = TypeKey::Char('x');
        let handler = |digits: u8| {
            SpecifierType::new(TypeKey::Char('x'), move |_| {
                FormatOptions::new().with_maximum_fraction_digits(digits)
            })
        };
        r.register_source("alpha", &[handler(1)]);
        r.register_source("beta", &[handler(2)]);

        // alpha leaves first; beta now remembers the empty slot alpha found
        assert!(r.unregister_source("alpha"));
        assert_eq!(
            r.resolve("x", None).unwrap().options.maximum_fraction_digits,
            Some(2)
        );
        assert!(r.unregister_source("beta"));
        assert!(!r.has_type(&key));
    }

    #[test]
    fn test_layout() {
        let r = resolver();
        let res = r.resolve("*>8.1f", None).unwrap();
        let result = FormatResult {
            formatted: "-1.5".to_string(),
            parts: vec![
                NumberPart::new(PartKind::MinusSign, "-"),
                NumberPart::new(PartKind::Integer, "1"),
                NumberPart::new(PartKind::Decimal, "."),
                NumberPart::new(PartKind::Fraction, "5"),
            ],
            value_state: crate::types::ValueState::Valid,
            error: None,
        };
        assert_eq!(res.apply_layout(result.clone()).formatted, "****-1.5");

        let zero = r.resolve("06.1f", None).unwrap();
        assert_eq!(zero.apply_layout(result).formatted, "-001.5");
    }
}
