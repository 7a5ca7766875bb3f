//! Specifier strings
//!
//! A specifier is a compact format string such as `"+,.2f"` that expands to a
//! full [`FormatOptions`](crate::types::FormatOptions) set. The main entry
//! point is [`SpecifierResolver::resolve`].

mod grammar;
mod resolver;
mod tokens;

pub use grammar::parse_specifier;
pub use resolver::{
    Padding, SpecifierResolution, SpecifierResolver, SpecifierType, TypeHandler, TypeKey,
    fraction_precision,
};
pub use tokens::{Align, SignFlag, SpecifierFields, SymbolFlag};
