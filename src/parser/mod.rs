pub mod contact;
pub mod directory;
pub mod listing;

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run (line breaks included) to one space and trim.
pub fn normalize_whitespace(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_trims() {
        assert_eq!(normalize_whitespace("a \n\t b  c "), "a b c");
    }

    #[test]
    fn multiline_address() {
        let raw = "\n      123 Main St\n      Suite 4\r\n      Springfield, IL 62701\n    ";
        assert_eq!(normalize_whitespace(raw), "123 Main St Suite 4 Springfield, IL 62701");
    }

    #[test]
    fn blank_input() {
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }
}
