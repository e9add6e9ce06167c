use regex::Regex;
use std::sync::OnceLock;

fn quoted_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[ \t]*--[ \t]*"[^"\n]*"[ \t]*-->[ \t]*"#).expect("valid regex"))
}

fn piped_between_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]*--[ \t]*\|[^|\n]*\|[ \t]*-->[ \t]*").expect("valid regex"))
}

fn piped_after_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[ \t]*(<?--+>|<?-\.+->|<?==+>|---+|===+|-\.+-)[ \t]*\|[^|\n]*\|[ \t]*")
            .expect("valid regex")
    })
}

fn bare_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The leading class keeps `A --- B --> C` from reading as a labelled edge.
    RE.get_or_init(|| {
        Regex::new(r#"(?m)(^|[^-=.<])[ \t]*--[ \t]+([^-\n>|"\[\](){}]+?)[ \t]+-->[ \t]*"#)
            .expect("valid regex")
    })
}

/// Removes edge annotations, keeping only the connector.
///
/// Handles `A -- "text" --> B`, `A --|text|--> B`, `A -->|text| B` and `A -- text --> B`.
pub fn strip_edge_labels(input: &str) -> String {
    let pass = quoted_label_regex().replace_all(input, " --> ");
    let pass = piped_between_regex().replace_all(&pass, " --> ");
    let pass = piped_after_regex().replace_all(&pass, " $1 ");
    bare_text_regex().replace_all(&pass, "$1 --> ").into_owned()
}
