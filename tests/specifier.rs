#[cfg(test)]
mod tests {
    use number_pipeline::specifier::{Align, SignFlag};
    use number_pipeline::{Engine, Error, FormatOptions, Style, parse_specifier};

    fn spec(specifier: &str, value: f64) -> String {
        Engine::default()
            .format_specifier(specifier, value, None)
            .unwrap()
            .formatted
    }

    #[test]
    fn test_parse_fields() {
        let fields = parse_specifier("_^+12,.3~f").unwrap();
        assert_eq!(fields.fill, Some('_'));
        assert_eq!(fields.align, Some(Align::Center));
        assert_eq!(fields.sign, Some(SignFlag::Plus));
        assert_eq!(fields.width, Some(12));
        assert!(fields.grouping);
        assert_eq!(fields.precision, Some(3));
        assert!(fields.trim);
        assert_eq!(fields.type_char, Some('f'));
    }

    #[test]
    fn test_fixed_and_integer() {
        assert_eq!(spec(".2f", 1234.5), "1234.50");
        assert_eq!(spec(",.2f", 1234.5), "1,234.50");
        assert_eq!(spec("f", 3.14159), "3.14");
        assert_eq!(spec(".2F", 1234.5), "1,234.50");
        assert_eq!(spec(".3~f", 1.5), "1.5");
        assert_eq!(spec("d", 12345.6), "12346");
    }

    #[test]
    fn test_percent_and_exponent() {
        assert_eq!(spec(".0%", 0.256), "26%");
        assert_eq!(spec(".1%", 0.256), "25.6%");
        assert_eq!(spec(".3e", 123456.0), "1.235E5");
    }

    #[test]
    fn test_significant() {
        assert_eq!(spec(".3g", 1234.5), "1230");
        assert_eq!(spec(".3r", 1.5), "1.5");
    }

    #[test]
    fn test_currency_flags() {
        assert_eq!(spec("$.2f", 1234.5), "$1,234.50");
        assert_eq!(spec("#.2f", 1234.5), "USD\u{a0}1,234.50");
        assert_eq!(spec("($.2f", -5.0), "($5.00)");
    }

    #[test]
    fn test_sign_flags() {
        assert_eq!(spec("+.1f", 2.0), "+2.0");
        assert_eq!(spec("+.1f", -2.0), "-2.0");
        assert_eq!(spec(" .1f", 2.0), " 2.0");
        assert_eq!(spec(" .1f", -2.0), "-2.0");
    }

    #[test]
    fn test_width_and_alignment() {
        assert_eq!(spec("<8.1f", 3.14159), "3.1     ");
        assert_eq!(spec(">8.1f", 3.14159), "     3.1");
        assert_eq!(spec("^9.1f", 3.14159), "   3.1   ");
        assert_eq!(spec("08.2f", -1.5), "-0001.50");
        assert_eq!(spec("*=8.2f", -1.5), "-***1.50");
        assert_eq!(spec("|>8d", 5.0), "|||||||5");
        assert_eq!(spec("|<4d", 5.0), "5|||");
        // Width smaller than the output leaves it unchanged
        assert_eq!(spec("3.2f", 1234.5), "1234.50");
    }

    #[test]
    fn test_extension_tokens() {
        assert_eq!(spec("per-myriad|.0", 0.05), "500‱");
        assert_eq!(spec("percentage-point|.1", 0.034), "3.4pp");
        assert_eq!(spec("PER-MILLE|.1", 0.1234), "123.4‰");
    }

    #[test]
    fn test_overrides() {
        let engine = Engine::default();
        let overrides = FormatOptions::new().with_locale("de-DE");
        let result = engine.format_specifier(",.2f", 1234.5, Some(&overrides)).unwrap();
        assert_eq!(result.formatted, "1.234,50");

        let resolution = engine.resolve_specifier("$.2f", None).unwrap();
        assert_eq!(resolution.options.style, Some(Style::Currency));
        assert_eq!(resolution.options.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_unsupported() {
        let engine = Engine::default();
        for bad in ["unknown|.2", ".2x", "..2f", ".f"] {
            assert!(
                matches!(engine.format_specifier(bad, 1.0, None), Err(Error::UnsupportedSpecifier(_))),
                "{bad}"
            );
        }
    }
}
