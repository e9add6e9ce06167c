use regex::Regex;
use std::sync::OnceLock;

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[ \t]*<br\s*/?>[ \t]*").expect("valid regex"))
}

/// Inline `<br>` markup becomes a single space; labels must stay on one line.
pub fn normalize_line_breaks(input: &str) -> String {
    line_break_regex().replace_all(input, " ").into_owned()
}
