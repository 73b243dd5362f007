//! Unit tests for status line and banner recognition

use autocard::protocol::{Pattern, PromptKind, StatusParser, StatusToken};

#[cfg(test)]
mod status_parser_tests {
    use super::*;

    #[test]
    fn test_parse_line_prompt() {
        let parser = StatusParser::default();
        let token = parser.parse_line("[GNUPG:] GET_LINE keygen.size\n").unwrap();

        assert_eq!(
            token,
            StatusToken::Prompt {
                kind: PromptKind::Line,
                field: "keygen.size".to_string(),
            }
        );
        assert!(token.is_prompt_for("keygen.size"));
        assert!(!token.is_prompt_for("keygen"));
    }

    #[test]
    fn test_parse_ack_and_key_created() {
        let parser = StatusParser::default();

        assert_eq!(parser.parse_line("[GNUPG:] GOT_IT"), Some(StatusToken::Ack));
        assert_eq!(
            parser.parse_line("[GNUPG:] KEY_CREATED B 0123456789ABCDEF0123456789ABCDEF01234567\r\n"),
            Some(StatusToken::KeyCreated {
                kind: "B".to_string(),
                identifier: "0123456789ABCDEF0123456789ABCDEF01234567".to_string(),
            })
        );
    }

    #[test]
    fn test_other_keywords_are_kept() {
        let parser = StatusParser::default();
        let token = parser.parse_line("[GNUPG:] CARDCTRL 3 D2760001240103040006").unwrap();

        assert!(!token.is_prompt());
        assert_eq!(
            token,
            StatusToken::Other {
                keyword: "CARDCTRL".to_string(),
                args: vec!["3".to_string(), "D2760001240103040006".to_string()],
            }
        );
    }

    #[test]
    fn test_line_without_marker_is_not_status() {
        let parser = StatusParser::default();
        assert!(parser.parse_line("GET_LINE keygen.size").is_none());
        assert!(parser.parse_line("[GNUPG:]GET_LINE keygen.size").is_none());
    }

    #[test]
    fn test_scan_finds_marker_mid_line() {
        let parser = StatusParser::default();
        let text = "Your selection? [GNUPG:] GET_LINE keygen.algo\n";

        let tokens: Vec<_> = parser.scan(text).collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span, 16..text.len());
        assert!(tokens[0].token.is_prompt_for("keygen.algo"));
    }

    #[test]
    fn test_scan_stops_at_incomplete_line() {
        let parser = StatusParser::default();
        let text = "[GNUPG:] GOT_IT\n[GNUPG:] GET_LINE keyedit.pro";

        let tokens: Vec<_> = parser.scan(text).map(|t| t.token).collect();
        assert_eq!(tokens, vec![StatusToken::Ack]);
        assert!(parser.first_prompt(text).is_none());
    }

    #[test]
    fn test_first_prompt_skips_other_tokens() {
        let parser = StatusParser::default();
        let text = "[GNUPG:] GOT_IT\nsec  rsa4096/ABCDEF\n[GNUPG:] GET_BOOL keyedit.save.okay\n";

        let prompt = parser.first_prompt(text).unwrap();
        assert_eq!(
            prompt.token,
            StatusToken::Prompt {
                kind: PromptKind::Bool,
                field: "keyedit.save.okay".to_string(),
            }
        );
        assert_eq!(&text[prompt.span.clone()], "[GNUPG:] GET_BOOL keyedit.save.okay\n");
    }

    #[test]
    fn test_custom_prefix() {
        let parser = StatusParser::new("TEST:");
        assert_eq!(parser.marker(), "[TEST:] ");

        assert!(parser.parse_line("[GNUPG:] GOT_IT").is_none());
        assert_eq!(parser.parse_line("[TEST:] GOT_IT"), Some(StatusToken::Ack));
        assert_eq!(parser.render(&StatusToken::Ack), "[TEST:] GOT_IT\n");
    }

    #[test]
    fn test_prompt_with_extra_arguments_is_not_a_prompt() {
        assert!(StatusParser::parse_body("GET_HIDDEN").is_none());
        assert!(StatusParser::parse_body("GET_HIDDEN passphrase.enter extra").is_none());
    }
}

#[cfg(test)]
mod pattern_tests {
    use super::*;

    #[test]
    fn test_literal_matches_anywhere() {
        let pattern = Pattern::literal("Application ID");
        assert_eq!(pattern.find("Reader ...\nApplication ID ...: D276"), Some(11..25));
        assert!(pattern.find("application id").is_none());
    }

    #[test]
    fn test_line_start_respects_cursor_position() {
        let pattern = Pattern::line_start("ssb*");
        let text = "ssb*  rsa4096/0011223344556677\n";

        assert_eq!(pattern.find_at(text, true), Some(0..4));
        assert!(pattern.find_at(text, false).is_none());
        assert_eq!(pattern.find_at(&format!("\n{}", text), false), Some(1..5));
    }

    #[test]
    fn test_line_start_ignores_mid_line_occurrence() {
        let pattern = Pattern::line_start("sec");
        assert!(pattern.find_at("  sec  rsa4096\n", true).is_none());
    }

    #[test]
    fn test_line_tail_escapes_text() {
        let pattern = Pattern::line_tail("(1) Signature key").unwrap();
        assert!(pattern.find("   (1) Signature key\n").is_some());
        assert!(pattern.find("   (1) Signature keys\n").is_none());
    }

    #[test]
    fn test_regex_pattern_uses_description() {
        let pattern = Pattern::regex(r"usage: [SCEA]+", "usage line").unwrap();
        assert_eq!(pattern.describe(), "usage line");
        assert_eq!(pattern.to_string(), "'usage line'");
        assert!(Pattern::regex("(unclosed", "broken").is_err());
    }
}
