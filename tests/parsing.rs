#[cfg(test)]
mod tests {
    use number_pipeline::{Engine, FormatOptions, Notation, ParseOptions, Style, parse_number};

    fn parse(text: &str, options: ParseOptions) -> f64 {
        let result = Engine::default().parse(text, &options);
        assert!(result.success, "{text}: {:?}", result.error);
        result.value
    }

    #[test]
    fn test_parse_locales() {
        assert_eq!(parse("1,234,567.891", ParseOptions::new()), 1234567.891);
        assert_eq!(parse("1.234.567,891", ParseOptions::new().with_locale("de-DE")), 1234567.891);
        assert_eq!(parse("1’234.5", ParseOptions::new().with_locale("de-CH")), 1234.5);
        assert_eq!(
            parse("1\u{202f}234,5", ParseOptions::new().with_locale("fr-FR")),
            1234.5
        );
    }

    #[test]
    fn test_explicit_separators() {
        let mut options = ParseOptions::new();
        options.group_separator = Some("'".to_string());
        options.decimal_separator = Some(",".to_string());
        assert_eq!(parse("1'234,5", options), 1234.5);
    }

    #[test]
    fn test_parse_signs() {
        assert_eq!(parse("-12.5", ParseOptions::new()), -12.5);
        assert_eq!(parse("+12.5", ParseOptions::new()), 12.5);
        assert_eq!(parse("\u{2212}3", ParseOptions::new()), -3.0);
    }

    #[test]
    fn test_parse_result_flags() {
        let engine = Engine::default();
        let result = engine.parse("42", &ParseOptions::new());
        assert!(result.is_integer);
        assert_eq!(result.sign, 1);
        assert!(!result.is_zero);
        assert_eq!(result.input, "42");

        let result = engine.parse("-0.0", &ParseOptions::new());
        assert!(result.is_zero);
        assert!(result.is_negative_zero);
    }

    #[test]
    fn test_parse_notations() {
        let scientific = ParseOptions::new().with_notation(Notation::Scientific);
        assert_eq!(parse("1.5E3", scientific.clone()), 1500.0);
        assert_eq!(parse("2e-2", scientific), 0.02);

        let compact = ParseOptions::new().with_notation(Notation::Compact);
        assert_eq!(parse("2.5M", compact.clone()), 2_500_000.0);
        assert_eq!(parse("12万", compact.clone().with_locale("zh-CN")), 120_000.0);
        assert_eq!(parse("3억", compact.clone().with_locale("ko-KR")), 300_000_000.0);
        assert_eq!(parse("2,5\u{a0}Mio.", compact.with_locale("de-DE")), 2_500_000.0);
    }

    #[test]
    fn test_parse_extension_styles() {
        assert_eq!(parse("250‰", ParseOptions::new().with_style(Style::PerMille)), 0.25);
        assert_eq!(parse("25‱", ParseOptions::new().with_style(Style::PerMyriad)), 0.0025);
        assert_eq!(parse("3 p.p.", ParseOptions::new().with_style(Style::PercentagePoint)), 0.03);
        assert_eq!(
            parse("壹万零叁拾", ParseOptions::new().with_style(Style::LocalizedUppercase)),
            10030.0
        );
    }

    #[test]
    fn test_stray_characters_are_rejected() {
        let engine = Engine::default();
        for text in ["12abc", "1x2", "a1b2c3"] {
            let lenient = engine.parse(text, &ParseOptions::new());
            assert!(!lenient.success, "{text}");
            assert!(lenient.value.is_nan());
        }
        // Whitespace is still dropped in lenient mode
        assert_eq!(engine.parse("1 234", &ParseOptions::new()).value, 1234.0);

        let strict = engine.parse("12abc", &ParseOptions::new().strict(true));
        assert!(!strict.success);
        assert!(strict.value.is_nan());
        assert!(strict.error.is_some());

        let pp = engine.parse("3", &ParseOptions::new().with_style(Style::PercentagePoint).strict(true));
        assert_eq!(pp.error.as_deref(), Some("Expected percentage-point suffix (pp)"));
    }

    #[test]
    fn test_parse_auto_detects_style() {
        let engine = Engine::default();
        assert_eq!(engine.parse_auto("25%", None).value, 0.25);
        assert_eq!(engine.parse_auto("25‱", None).value, 0.0025);
        assert_eq!(engine.parse_auto("1.5pp", None).value, 0.015);
        assert_eq!(engine.parse_auto("1.5E3", None).value, 1500.0);
        assert_eq!(engine.parse_auto("€12.50", None).value, 12.5);

        let german = ParseOptions::new().with_locale("de-DE");
        assert_eq!(engine.parse_auto("12,5\u{a0}%", Some(&german)).value, 0.125);
    }

    #[test]
    fn test_format_then_parse_scientific() {
        let engine = Engine::default();
        let options = FormatOptions::new()
            .with_notation(Notation::Scientific)
            .with_maximum_fraction_digits(6);
        let formatted = engine.format(0.000123456, &options).unwrap();
        assert_eq!(formatted.formatted, "1.23456E-4");
        let parsed = engine.parse(
            &formatted.formatted,
            &ParseOptions::new().with_notation(Notation::Scientific),
        );
        assert_eq!(parsed.value, 0.000123456);
    }

    #[test]
    fn test_global_parse() {
        let result = parse_number("1,000", &ParseOptions::new());
        assert_eq!(result.value, 1000.0);
    }
}
