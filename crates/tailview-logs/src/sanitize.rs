use std::borrow::Cow;
use std::fmt::Write;

/// Make a producer-supplied message safe to write to a terminal
///
/// Control characters (ANSI escape introducers included) are replaced with
/// their visible `\u{..}` form and tabs become a single space, so a log line
/// can never move the cursor, recolor the screen or span several rows.
pub fn sanitize_message(input: &str) -> Cow<'_, str> {
    if !input.chars().any(|c| c.is_control()) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '\t' => out.push(' '),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(sanitize_message("all good ✓"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_sequences_are_neutralised() {
        let cleaned = sanitize_message("\x1b[2J\x1b[31mred\x1b[0m");
        assert!(!cleaned.contains('\x1b'));
        assert_eq!(cleaned, "\\u{1b}[2J\\u{1b}[31mred\\u{1b}[0m");
    }

    #[test]
    fn test_newlines_and_tabs() {
        assert_eq!(sanitize_message("a\tb\nc\r"), "a b\\nc\\r");
    }
}
