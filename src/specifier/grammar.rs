use winnow::combinator::opt;
use winnow::{ModalResult, Parser};

use crate::specifier::tokens::*;

/// Parse a specifier string
///
/// The grammar is `[token|][[fill]align][sign][symbol][0][width][,][.precision][~][type]`.
///
/// # Arguments
/// * `input` - The specifier to parse, e.g. `"+,.2f"` or `"per-mille|.1"`
///
/// # Returns
/// * `Result<SpecifierFields, String>` - The parsed fields, or an error message
pub fn parse_specifier(input: &str) -> Result<SpecifierFields, String> {
    let (token, body) = match split_token(input) {
        Some((token, body)) => {
            let token = token.trim();
            if token.is_empty() {
                return Err(format!("Empty token before '|' in '{input}'"));
            }
            (Some(token.to_ascii_lowercase()), body)
        }
        None => (None, input),
    };

    let mut rest = body;
    let mut fields = parse_body
        .parse_next(&mut rest)
        .map_err(|e| format!("Parse error: {e:?} at remaining input '{rest}'"))?;

    if !rest.is_empty() {
        return Err(format!("Unexpected trailing characters '{rest}' in '{input}'"));
    }

    fields.token = token;
    Ok(fields)
}

/// Split off the `token|` prefix
///
/// A leading `|` followed by an alignment character is a fill, not a separator.
fn split_token(input: &str) -> Option<(&str, &str)> {
    let at = input.find('|')?;
    if at == 0 && input[1..].starts_with(['<', '>', '=', '^']) {
        return None;
    }
    Some((&input[..at], &input[at + 1..]))
}

/// An optional single-character flag
fn flag(c: char) -> impl FnMut(&mut &str) -> ModalResult<bool> {
    move |input: &mut &str| opt(c).map(|f| f.is_some()).parse_next(input)
}

fn parse_body(input: &mut &str) -> ModalResult<SpecifierFields> {
    let fill_align = opt(parse_fill_align).parse_next(input)?;
    let sign = opt(parse_sign).parse_next(input)?;
    let symbol = opt(parse_symbol).parse_next(input)?;
    let zero = flag('0').parse_next(input)?;
    let width = opt(parse_width).parse_next(input)?;
    let grouping = flag(',').parse_next(input)?;
    let precision = opt(parse_precision).parse_next(input)?;
    let trim = flag('~').parse_next(input)?;
    let type_char = opt(parse_type_char).parse_next(input)?;

    let (fill, align) = match fill_align {
        Some((fill, align)) => (fill, Some(align)),
        None => (None, None),
    };

    Ok(SpecifierFields {
        token: None,
        fill,
        align,
        sign,
        symbol,
        zero,
        width,
        grouping,
        precision,
        trim,
        type_char,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_grammar() {
        let fields = parse_specifier("*^+$012,.3~f").unwrap();
        assert_eq!(fields.fill, Some('*'));
        assert_eq!(fields.align, Some(Align::Center));
        assert_eq!(fields.sign, Some(SignFlag::Plus));
        assert_eq!(fields.symbol, Some(SymbolFlag::Currency));
        assert!(fields.zero);
        assert_eq!(fields.width, Some(12));
        assert!(fields.grouping);
        assert_eq!(fields.precision, Some(3));
        assert!(fields.trim);
        assert_eq!(fields.type_char, Some('f'));
    }

    #[test]
    fn test_parse_short_forms() {
        assert_eq!(parse_specifier("").unwrap(), SpecifierFields::default());

        let fields = parse_specifier(".2f").unwrap();
        assert_eq!(fields.precision, Some(2));
        assert_eq!(fields.type_char, Some('f'));
        assert_eq!(fields.align, None);

        let fields = parse_specifier("(#d").unwrap();
        assert_eq!(fields.sign, Some(SignFlag::Parenthesis));
        assert_eq!(fields.symbol, Some(SymbolFlag::Code));

        let fields = parse_specifier("08").unwrap();
        assert!(fields.zero);
        assert_eq!(fields.width, Some(8));
        assert_eq!(fields.type_char, None);
    }

    #[test]
    fn test_parse_token_prefix() {
        let fields = parse_specifier("Per-Mille|.1").unwrap();
        assert_eq!(fields.token.as_deref(), Some("per-mille"));
        assert_eq!(fields.precision, Some(1));

        assert!(parse_specifier("|.1f").is_err());
    }

    #[test]
    fn test_parse_pipe_fill() {
        let fields = parse_specifier("|>8d").unwrap();
        assert_eq!(fields.token, None);
        assert_eq!(fields.fill, Some('|'));
        assert_eq!(fields.align, Some(Align::Right));
        assert_eq!(fields.width, Some(8));

        let fields = parse_specifier("per-mille||^9.1").unwrap();
        assert_eq!(fields.token.as_deref(), Some("per-mille"));
        assert_eq!(fields.fill, Some('|'));
        assert_eq!(fields.align, Some(Align::Center));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_specifier(".f").is_err());
        assert!(parse_specifier("ff").is_err());
        assert!(parse_specifier(".2f ").is_err());
    }
}
