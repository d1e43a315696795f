//! Askama filters used by the page templates.

use std::fmt::Display;

/// Longest product blurb shown on a listing card, in characters.
const EXCERPT_CHARS: usize = 90;

/// Year for the footer copyright line.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Shorten a description for listing cards, cutting at a word boundary.
///
/// Usage in templates: `{{ product.description|excerpt }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn excerpt(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(shorten(&value.to_string(), EXCERPT_CHARS))
}

fn shorten(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let cut: &str = match cut.rfind(char::is_whitespace) {
        Some(end) => cut.get(..end).unwrap_or(cut.as_str()),
        None => cut.as_str(),
    };
    format!("{}…", cut.trim_end_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_keeps_short_text() {
        assert_eq!(shorten("  Hand-woven basket ", 90), "Hand-woven basket");
    }

    #[test]
    fn test_shorten_cuts_at_word_boundary() {
        assert_eq!(shorten("Wheel-thrown red clay vase, sun dried", 20), "Wheel-thrown red…");
        assert_eq!(shorten("टेराकोटा फूलदान हाथ से बना", 10), "टेराकोटा…");
    }
}
