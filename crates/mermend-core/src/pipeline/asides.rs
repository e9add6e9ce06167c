use regex::{Captures, Regex};
use std::sync::OnceLock;

fn paren_aside_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `Q[/policies (GET)]` style labels carry a leading slash before the aside.
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z0-9_])\[([^\]\[\(\n"]*?)/?\([^)\n]*\)[^\]\n]*\]"#).expect("valid regex")
    })
}

fn bracket_aside_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z0-9_])\[([^\]\[\(\n"]*?)\[[^\]\n]*\][^\]\n]*\]"#).expect("valid regex")
    })
}

fn truncate_label(caps: &Captures<'_>) -> String {
    let whole = &caps[0];
    let core = caps[2].trim().trim_start_matches('/').trim();
    if core.is_empty() {
        // `A[(Database)]`, `A[[Sub]]`: a shape, not an aside.
        return whole.to_string();
    }
    format!("{}[{}]", &caps[1], core)
}

/// Truncates labels at a parenthetical or bracketed aside: `A[ASP Pages (e.g. Rlv_2)]` becomes
/// `A[ASP Pages]`. The aside is dropped, not moved.
pub fn strip_asides(input: &str) -> String {
    let pass = paren_aside_regex().replace_all(input, |caps: &Captures<'_>| truncate_label(caps));
    bracket_aside_regex()
        .replace_all(&pass, |caps: &Captures<'_>| truncate_label(caps))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_trailing_parenthetical() {
        assert_eq!(
            strip_asides("A[ASP Pages (e.g., Rlv_ISLLPOL_2)] --> B[Policy API]"),
            "A[ASP Pages] --> B[Policy API]"
        );
    }

    #[test]
    fn drops_slash_prefixed_method_hint() {
        assert_eq!(strip_asides("Q[/policies (GET)]"), "Q[policies]");
    }

    #[test]
    fn drops_nested_bracket_aside() {
        assert_eq!(strip_asides("API[Gateway [v2 beta]]"), "API[Gateway]");
    }

    #[test]
    fn keeps_cylinder_and_subroutine_shapes() {
        let src = "DB[(Customer DB)] --> S[[Batch Job]]";
        assert_eq!(strip_asides(src), src);
    }

    #[test]
    fn multi_letter_ids_keep_their_prefix() {
        assert_eq!(strip_asides("SVC[Billing (legacy)]"), "SVC[Billing]");
    }
}
