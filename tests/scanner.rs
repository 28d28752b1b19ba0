#[cfg(test)]
mod scanner_tests {
    use kix::diagnostics::Diagnostics;
    use kix::scanner::*;
    use kix::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len(), "tokens: {:?}", tokens);

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})?:",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "var fun_1 = nil; while _x and class",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "fun_1"),
                (TokenType::EQUAL, "="),
                (TokenType::NIL, "nil"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                (TokenType::IDENTIFIER, "_x"),
                (TokenType::AND, "and"),
                (TokenType::CLASS, "class"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_number_literals_are_doubles() {
        let tokens: Vec<Token> = Scanner::new("12 3.5 7.").filter_map(Result::ok).collect();

        assert_eq!(tokens[0].literal, Some(LiteralValue::Number(12.0)));
        assert_eq!(tokens[1].literal, Some(LiteralValue::Number(3.5)));
        // "7." is a number followed by a dot
        assert_eq!(tokens[2].literal, Some(LiteralValue::Number(7.0)));
        assert_eq!(tokens[3].token_type, TokenType::DOT);
        assert_eq!(tokens[0].token_type, TokenType::NUMBER);
        assert_eq!(tokens[4].literal, None);
    }

    #[test]
    fn test_multiline_string_counts_lines() {
        let tokens: Vec<Token> = Scanner::new("\"a\nb\" x").filter_map(Result::ok).collect();

        assert_eq!(tokens[0].literal, Some(LiteralValue::Str("a\nb".into())));
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_token_sequence(
            "a // line comment\n/* block\ncomment */ b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );

        let tokens: Vec<Token> = Scanner::new("/* one\ntwo\n*/ x").filter_map(Result::ok).collect();
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_block_comments_do_not_nest() {
        // The first `*/` closes the comment, leaving `*/` as tokens.
        assert_token_sequence(
            "/* /* */ */",
            &[
                (TokenType::STAR, "*"),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut diags = Diagnostics::new();
        let tokens = scan("x /* never\nclosed", &mut diags);

        assert_eq!(tokens.len(), 2);
        assert!(diags.had_error());
        assert_eq!(
            diags.reports()[0].to_string(),
            "[line 2] Error: Unterminated block comment."
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut diags = Diagnostics::new();
        let tokens = scan("print \"oops", &mut diags);

        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
        assert_eq!(
            diags.reports()[0].to_string(),
            "[line 1] Error: Unterminated string."
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().contains("Unexpected character"),
                "got: {}",
                err
            );
        }

        assert_eq!(
            results[3].as_ref().map(|t| t.token_type).ok(),
            Some(TokenType::LEFT_PAREN)
        );
    }

    #[test]
    fn test_non_ascii_character_is_skipped_whole() {
        let mut diags = Diagnostics::new();
        let tokens = scan("a é b", &mut diags);

        assert_eq!(tokens.len(), 3);
        assert_eq!(
            diags.reports()[0].to_string(),
            "[line 1] Error: Unexpected character: é"
        );
    }

    #[test]
    fn test_exactly_one_eof() {
        let mut scanner = Scanner::new("");
        assert!(matches!(scanner.next(), Some(Ok(ref t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
