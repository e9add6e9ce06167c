//! Label-aware line scanning.
//!
//! Flowchart text mixes structure (ids, arrows, keywords) with free-form label text. Passes that
//! touch structure must leave label text alone, so every line is first classified byte by byte:
//! bytes inside `[...]`, `(...)`, `{...}`, `>...]`, `"..."`, `|...|` or after `%%` are label
//! bytes, everything else is code. The delimiters themselves count as code.
//!
//! This is a lexical approximation, not a grammar: a label with unbalanced brackets shifts the
//! classification for the rest of its line.

use std::ops::Range;

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Statement keywords that may open a line and are never node references themselves.
const LEADING_KEYWORDS: &[&str] = &[
    "flowchart",
    "graph",
    "subgraph",
    "style",
    "linkStyle",
    "click",
    "direction",
];

/// Per-byte label mask for one line (`true` = inside label text).
pub(crate) fn label_mask(line: &str) -> Vec<bool> {
    let bytes = line.as_bytes();
    let mut mask = vec![false; bytes.len()];
    let mut depth = 0usize;
    let mut quoted = false;
    let mut piped = false;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if depth > 0 {
            if quoted {
                if b == b'"' {
                    quoted = false;
                }
                mask[i] = true;
            } else {
                match b {
                    b'"' => {
                        quoted = true;
                        mask[i] = true;
                    }
                    b'[' | b'(' | b'{' => {
                        depth += 1;
                        mask[i] = true;
                    }
                    b']' | b')' | b'}' => {
                        depth -= 1;
                        mask[i] = depth > 0;
                    }
                    _ => mask[i] = true,
                }
            }
        } else if quoted {
            mask[i] = b != b'"';
            if b == b'"' {
                quoted = false;
            }
        } else if piped {
            mask[i] = b != b'|';
            if b == b'|' {
                piped = false;
            }
        } else {
            match b {
                b'[' | b'(' | b'{' => depth = 1,
                b'>' if i > 0 && is_ident_byte(bytes[i - 1]) => depth = 1,
                b'"' => quoted = true,
                b'|' => piped = true,
                b'%' if bytes.get(i + 1) == Some(&b'%') => {
                    for slot in &mut mask[i..] {
                        *slot = true;
                    }
                    break;
                }
                _ => {}
            }
        }
        i += 1;
    }
    mask
}

/// Word tokens (`[A-Za-z0-9_]+`) that lie entirely in code regions.
pub(crate) fn code_tokens(line: &str, mask: &[bool]) -> Vec<Range<usize>> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if mask[i] || !is_ident_byte(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !mask[i] && is_ident_byte(bytes[i]) {
            i += 1;
        }
        out.push(start..i);
    }
    out
}

/// Index of the delimiter closing the label opened at `open` (a code byte), if any.
pub(crate) fn closing_delimiter(mask: &[bool], open: usize) -> Option<usize> {
    (open + 1..mask.len()).find(|&j| !mask[j])
}

/// Node definitions on a line: an id token directly followed (after optional spaces) by `[`.
///
/// Returns the id range and the range of the full bracketed label including delimiters.
pub(crate) fn square_definitions(line: &str) -> Vec<(Range<usize>, Range<usize>)> {
    let mask = label_mask(line);
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    for token in code_tokens(line, &mask) {
        let mut j = token.end;
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        if j >= bytes.len() || bytes[j] != b'[' || mask[j] {
            continue;
        }
        if let Some(close) = closing_delimiter(&mask, j) {
            out.push((token, j..close + 1));
        }
    }
    out
}

/// Rewrites node references outside label text.
///
/// `rename` is consulted for every code token that can be a node reference; returning `Some`
/// replaces it. Skipped: `classDef` lines, bare `end` lines, leading statement keywords, the
/// class name of `class` statements, anything following `:::` and `o`/`x` arrow heads.
pub fn rename_identifiers(code: &str, rename: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(code.len() + 16);
    for (idx, line) in code.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&rename_line(line, rename));
    }
    out
}

fn rename_line(line: &str, rename: &dyn Fn(&str) -> Option<String>) -> String {
    let trimmed = line.trim_start();
    let first_word = trimmed
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("");
    if first_word == "classDef" {
        return line.to_string();
    }
    if matches!(trimmed.trim_end(), "end" | "end;") {
        return line.to_string();
    }
    if first_word == "class" {
        return rename_class_statement(line, rename);
    }

    let mask = label_mask(line);
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len() + 8);
    let mut last = 0usize;
    let lead_offset = line.len() - trimmed.len();
    for token in code_tokens(line, &mask) {
        let word = &line[token.clone()];
        if token.start == lead_offset && LEADING_KEYWORDS.contains(&word) {
            continue;
        }
        if token.start >= 3 && &bytes[token.start - 3..token.start] == b":::" {
            continue;
        }
        // `--o` / `==x`: arrow heads, not references.
        if matches!(word, "o" | "x")
            && token.start > 0
            && matches!(bytes[token.start - 1], b'-' | b'=')
        {
            continue;
        }
        let Some(replacement) = rename(word) else {
            continue;
        };
        out.push_str(&line[last..token.start]);
        out.push_str(&replacement);
        last = token.end;
    }
    out.push_str(&line[last..]);
    out
}

/// `class A,B,C styleName;`: only the id list is renamed.
fn rename_class_statement(line: &str, rename: &dyn Fn(&str) -> Option<String>) -> String {
    let indent = &line[..line.len() - line.trim_start().len()];
    let body = line.trim();
    let (body, semi) = match body.strip_suffix(';') {
        Some(b) => (b.trim_end(), ";"),
        None => (body, ""),
    };
    let rest = body["class".len()..].trim();
    let Some(split) = rest.rfind(char::is_whitespace) else {
        return line.to_string();
    };
    let ids = rest[..split].trim();
    let class_name = rest[split..].trim();
    let mapped = ids
        .split(',')
        .map(|id| {
            let id = id.trim();
            rename(id).unwrap_or_else(|| id.to_string())
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("{indent}class {mapped} {class_name}{semi}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masked(line: &str) -> String {
        label_mask(line)
            .iter()
            .zip(line.chars())
            .map(|(m, c)| if *m { '_' } else { c })
            .collect()
    }

    #[test]
    fn mask_covers_bracket_quote_and_pipe_labels() {
        assert_eq!(masked("A[Plan A] --> B"), "A[______] --> B");
        assert_eq!(masked("A -->|yes A| B"), "A -->|_____| B");
        assert_eq!(masked(r#"A -- "go A" --> B"#), r#"A -- "____" --> B"#);
        assert_eq!(masked("A((db)) --> B"), "A(____) --> B");
        assert_eq!(masked("A>flag] --> B"), "A>____] --> B");
    }

    #[test]
    fn arrows_are_not_asymmetric_shapes() {
        assert_eq!(masked("A-->B"), "A-->B");
        assert_eq!(masked("A ==> B"), "A ==> B");
    }

    #[test]
    fn quoted_brackets_do_not_close_labels() {
        assert_eq!(masked(r#"A["x ] y"] --> B"#), r#"A[_______] --> B"#);
    }

    #[test]
    fn square_definitions_find_ids_anywhere_on_line() {
        let line = "A[Login] --> B [Auth]";
        let defs = square_definitions(line);
        let ids: Vec<&str> = defs.iter().map(|(id, _)| &line[id.clone()]).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(&line[defs[1].1.clone()], "[Auth]");
    }

    #[test]
    fn rename_skips_labels_keywords_and_class_names() {
        let rename = |w: &str| (w == "A").then(|| "NODE_A".to_string());
        assert_eq!(
            rename_identifiers("A[Plan A]:::A --> B", &rename),
            "NODE_A[Plan A]:::A --> B"
        );
        assert_eq!(rename_identifiers("classDef A fill:#fff", &rename), "classDef A fill:#fff");
        assert_eq!(rename_identifiers("  class A,B A;", &rename), "  class NODE_A,B A;");
        assert_eq!(rename_identifiers("style A fill:#fff", &rename), "style NODE_A fill:#fff");
    }

    #[test]
    fn rename_leaves_arrow_heads() {
        let rename = |w: &str| (w.len() == 1).then(|| format!("n_{w}"));
        assert_eq!(rename_identifiers("A --o B", &rename), "n_A --o n_B");
        assert_eq!(rename_identifiers("A ==x B", &rename), "n_A ==x n_B");
        assert_eq!(rename_identifiers("A --> x", &rename), "n_A --> n_x");
    }
}
