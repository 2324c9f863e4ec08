//! Strict decoding of the model's `[matchFound, label]` reply.

use super::MatchOutcome;
use crate::error::MatchParseError;

/// Placeholder some models echo back from the prompt instead of a blank label.
const PLACEHOLDER_LABEL: &str = "<>";

/// Longest reply excerpt kept in a [`MatchParseError::Malformed`].
const EXCERPT_CHARS: usize = 120;

/// Decode a reply that must be exactly a JSON array `[bool, string]`.
///
/// Anything else is a typed error: code fences, prose around the array,
/// extra elements, or wrong element types. A well-formed reply with `false`
/// or a blank label decodes to [`MatchOutcome::NoMatch`].
pub fn parse_match_response(text: &str) -> Result<MatchOutcome, MatchParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MatchParseError::Empty);
    }
    if trimmed.contains('`') {
        return Err(MatchParseError::Fenced(excerpt(trimmed)));
    }

    let (found, label): (bool, String) =
        serde_json::from_str(trimmed).map_err(|e| MatchParseError::Malformed {
            text: excerpt(trimmed),
            reason: e.to_string(),
        })?;

    let label = label.trim();
    if !found || label.is_empty() || label == PLACEHOLDER_LABEL {
        return Ok(MatchOutcome::NoMatch);
    }
    Ok(MatchOutcome::Matched(label.to_string()))
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(EXCERPT_CHARS).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_label() {
        assert_eq!(
            parse_match_response(r#"[true, "Tomato"]"#),
            Ok(MatchOutcome::Matched("Tomato".into()))
        );
    }

    #[test]
    fn test_false_is_no_match() {
        assert_eq!(parse_match_response(r#"[false, ""]"#), Ok(MatchOutcome::NoMatch));
        assert_eq!(parse_match_response(r#"[false, "<>"]"#), Ok(MatchOutcome::NoMatch));
        assert_eq!(
            parse_match_response(r#"[false, "Tomato"]"#),
            Ok(MatchOutcome::NoMatch)
        );
    }

    #[test]
    fn test_true_with_blank_label_is_no_match() {
        assert_eq!(parse_match_response(r#"[true, "  "]"#), Ok(MatchOutcome::NoMatch));
        assert_eq!(parse_match_response(r#"[true, "<>"]"#), Ok(MatchOutcome::NoMatch));
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        assert_eq!(
            parse_match_response("\n  [true, \" Green Pepper \"]  \n"),
            Ok(MatchOutcome::Matched("Green Pepper".into()))
        );
    }

    #[test]
    fn test_fenced_reply_rejected() {
        let err = parse_match_response("```[true,\"X\"]```").unwrap_err();
        assert!(matches!(err, MatchParseError::Fenced(_)));

        let err = parse_match_response("```json\n[true, \"X\"]\n```").unwrap_err();
        assert!(matches!(err, MatchParseError::Fenced(_)));
    }

    #[test]
    fn test_not_json_rejected() {
        let err = parse_match_response("not json").unwrap_err();
        assert!(matches!(err, MatchParseError::Malformed { .. }));
    }

    #[test]
    fn test_wrong_shapes_rejected() {
        for reply in [
            r#"[true]"#,
            r#"[true, "X", "Y"]"#,
            r#"["true", "X"]"#,
            r#"[true, 5]"#,
            r#"{"match": true, "label": "X"}"#,
            r#"Sure! [true, "X"]"#,
        ] {
            assert!(
                matches!(
                    parse_match_response(reply),
                    Err(MatchParseError::Malformed { .. })
                ),
                "accepted {reply}"
            );
        }
    }

    #[test]
    fn test_empty_reply() {
        assert_eq!(parse_match_response("   "), Err(MatchParseError::Empty));
    }

    #[test]
    fn test_malformed_excerpt_is_bounded() {
        let long = "x".repeat(500);
        match parse_match_response(&long).unwrap_err() {
            MatchParseError::Malformed { text, .. } => {
                assert_eq!(text.chars().count(), EXCERPT_CHARS + 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
