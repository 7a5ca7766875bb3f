use winnow::ascii::dec_uint;
use winnow::combinator::{alt, preceded};
use winnow::error::ErrMode;
use winnow::token::{any, one_of};
use winnow::{ModalResult, Parser};

/// Alignment of a padded result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Align {
    /// `<`
    Left,
    /// `>`
    Right,
    /// `=`, padding goes between the sign/symbol and the digits
    SignAware,
    /// `^`
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignFlag {
    /// `+`: show the sign of positive numbers too
    Plus,
    /// `-`: default sign handling
    Minus,
    /// `(`: accounting parentheses for negatives
    Parenthesis,
    /// ` `: leading space for non-negative numbers
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolFlag {
    /// `$`: currency symbol
    Currency,
    /// `#`: currency code
    Code,
}

/// Fields of a parsed specifier string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecifierFields {
    /// Named rule from a `token|` prefix, lower-cased
    pub token: Option<String>,
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign: Option<SignFlag>,
    pub symbol: Option<SymbolFlag>,
    pub zero: bool,
    pub width: Option<usize>,
    pub grouping: bool,
    pub precision: Option<u8>,
    pub trim: bool,
    pub type_char: Option<char>,
}

pub fn parse_align(input: &mut &str) -> ModalResult<Align> {
    alt((
        '<'.value(Align::Left),
        '>'.value(Align::Right),
        '='.value(Align::SignAware),
        '^'.value(Align::Center),
    ))
    .parse_next(input)
    .map_err(ErrMode::Backtrack)
}

/// `[fill]align`; a fill character is only taken when an align follows it
pub fn parse_fill_align(input: &mut &str) -> ModalResult<(Option<char>, Align)> {
    alt((
        (any, parse_align).map(|(fill, align)| (Some(fill), align)),
        parse_align.map(|align| (None, align)),
    ))
    .parse_next(input)
}

pub fn parse_sign(input: &mut &str) -> ModalResult<SignFlag> {
    alt((
        '+'.value(SignFlag::Plus),
        '-'.value(SignFlag::Minus),
        '('.value(SignFlag::Parenthesis),
        ' '.value(SignFlag::Space),
    ))
    .parse_next(input)
    .map_err(ErrMode::Backtrack)
}

pub fn parse_symbol(input: &mut &str) -> ModalResult<SymbolFlag> {
    alt(('$'.value(SymbolFlag::Currency), '#'.value(SymbolFlag::Code)))
        .parse_next(input)
        .map_err(ErrMode::Backtrack)
}

pub fn parse_width(input: &mut &str) -> ModalResult<usize> {
    dec_uint::<_, u32, _>
        .map(|w| w as usize)
        .parse_next(input)
        .map_err(ErrMode::Backtrack)
}

pub fn parse_precision(input: &mut &str) -> ModalResult<u8> {
    preceded('.', dec_uint::<_, u32, _>)
        .verify_map(|p| u8::try_from(p).ok())
        .parse_next(input)
        .map_err(ErrMode::Backtrack)
}

/// Any single non-digit character; validity is decided by the type table
pub fn parse_type_char(input: &mut &str) -> ModalResult<char> {
    one_of(|c: char| !c.is_ascii_digit() && !c.is_whitespace())
        .parse_next(input)
        .map_err(ErrMode::Backtrack)
}
