//! Free-text sanitizers for listing names and descriptions.
//!
//! Removing `<` and `>` only defeats naive markup injection; output encoding
//! is still the renderer's job. Length minimums apply to the sanitized value,
//! so callers sanitize first and then check [`MIN_NAME_LEN`] /
//! [`MIN_DESCRIPTION_LEN`].

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_NAME_LEN: usize = 200;
pub const MIN_DESCRIPTION_LEN: usize = 10;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

pub fn sanitize_name(name: &str) -> String {
    sanitize_text(name, MAX_NAME_LEN)
}

pub fn sanitize_description(description: &str) -> String {
    sanitize_text(description, MAX_DESCRIPTION_LEN)
}

/// Strip angle brackets, lower-case, trim, then truncate to `max_chars`.
/// The output is a fixed point: sanitizing it again changes nothing.
pub fn sanitize_text(input: &str, max_chars: usize) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .flat_map(char::to_lowercase)
        .collect();

    let truncated: String = cleaned.trim().chars().take(max_chars).collect();

    // truncation can expose whitespace at the cut
    truncated.trim_end().to_string()
}

pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_lowercases() {
        assert_eq!(sanitize_name("  <b>Bicicleta</b> Aro 26  "), "bbicicleta/b aro 26");
        assert_eq!(sanitize_name("<script>"), "script");
        assert_eq!(sanitize_description("\tÓtimo Estado\n"), "ótimo estado");
    }

    #[test]
    fn truncates_by_characters() {
        let long = "é".repeat(MAX_NAME_LEN + 50);
        let out = sanitize_name(&long);
        assert_eq!(char_len(&out), MAX_NAME_LEN);

        let desc = "a".repeat(MAX_DESCRIPTION_LEN * 2);
        assert_eq!(char_len(&sanitize_description(&desc)), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn can_shrink_below_minimum() {
        assert!(char_len(&sanitize_name(" <> a <> ")) < MIN_NAME_LEN);
        assert!(char_len(&sanitize_description("<<<<<<<<<<<<short>>>>>>>>>")) < MIN_DESCRIPTION_LEN);
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let inputs = [
            "  Plain Name ",
            "< leading bracket exposes space",
            "trailing bracket exposes space >",
            &format!("{} tail", "x".repeat(MAX_NAME_LEN - 1)),
            "İstanbul ÇAMERA",
            "",
            "   ",
        ];
        for input in inputs {
            let once = sanitize_name(input);
            assert_eq!(sanitize_name(&once), once, "name: {input:?}");

            let once = sanitize_description(input);
            assert_eq!(sanitize_description(&once), once, "description: {input:?}");
        }
    }
}
