//! Property-based tests for status line recognition
//!
//! Status lines share the PTY with free-form output, so recognition has to
//! hold up against arbitrary surrounding text and arbitrary chunking.

use autocard::protocol::{PromptKind, StatusParser, StatusToken};
use proptest::prelude::*;

fn prompt_kind() -> impl Strategy<Value = PromptKind> {
    prop_oneof![
        Just(PromptKind::Line),
        Just(PromptKind::Hidden),
        Just(PromptKind::Bool),
    ]
}

proptest! {
    #[test]
    fn test_rendered_prompt_is_found_after_noise(
        noise in "[a-zA-Z0-9 ?:.()]{0,80}",
        field in "[a-z]{1,10}(\\.[a-z_]{1,10}){0,2}",
        kind in prompt_kind(),
    ) {
        let parser = StatusParser::default();
        let token = StatusToken::Prompt { kind, field: field.clone() };
        let text = format!("{}{}", noise, parser.render(&token));

        let found = parser.first_prompt(&text);
        prop_assert!(found.is_some());
        let found = found.unwrap();
        prop_assert_eq!(found.token, token);
        prop_assert_eq!(found.span.end, text.len());
        prop_assert_eq!(found.span.start, noise.len());
    }

    #[test]
    fn test_noise_without_marker_yields_nothing(text in "[^\\[]{0,200}") {
        let parser = StatusParser::default();
        prop_assert_eq!(parser.scan(&text).count(), 0);
    }

    #[test]
    fn test_parse_never_panics(text in "\\PC*") {
        let parser = StatusParser::default();
        let _ = parser.parse_line(&text);
        let _ = parser.scan(&text).count();
        let _ = StatusParser::parse_body(&text);
    }

    #[test]
    fn test_truncated_status_line_is_not_recognized(
        field in "[a-z]{1,10}\\.[a-z]{1,10}",
        cut in 0usize..1000,
    ) {
        let parser = StatusParser::default();
        let line = parser.render(&StatusToken::Prompt { kind: PromptKind::Line, field });
        // Everything short of the newline
        let cut = cut % line.len();

        prop_assert!(parser.first_prompt(&line[..cut]).is_none());
        prop_assert!(parser.first_prompt(&line).is_some());
    }
}
