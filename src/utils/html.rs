/// Strips markup from teacher-authored text (quiz names, questions, choices)
/// before it is stored.
///
/// Uses ammonia's whitelist: harmless inline tags like <b> survive, while
/// <script> (with its content), <iframe> and event-handler attributes are
/// removed. Text without markup is only trimmed, so "Is 2 < 3?" is kept as
/// typed instead of being entity-escaped.
pub fn clean_html(input: &str) -> String {
    if !contains_markup(input) {
        return input.trim().to_string();
    }
    ammonia::clean(input).trim().to_string()
}

/// A `<` opens a tag, comment or processing instruction only when followed by
/// a letter, `/`, `!` or `?`.
fn contains_markup(input: &str) -> bool {
    input.match_indices('<').any(|(i, _)| {
        input[i + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_strips_script() {
        assert_eq!(clean_html("What is 2+2?<script>alert(1)</script>"), "What is 2+2?");
    }

    #[test]
    fn test_clean_html_keeps_plain_text() {
        assert_eq!(clean_html("  Capital of France  "), "Capital of France");
    }

    #[test]
    fn test_clean_html_keeps_comparisons_and_ampersands() {
        assert_eq!(clean_html("Is 2 < 3?"), "Is 2 < 3?");
        assert_eq!(clean_html("x<5 & y>2"), "x<5 & y>2");
    }

    #[test]
    fn test_clean_html_strips_event_handlers() {
        assert_eq!(clean_html("<b onclick=\"steal()\">Bold</b>"), "<b>Bold</b>");
    }
}
