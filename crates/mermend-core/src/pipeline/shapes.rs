use crate::scan::{closing_delimiter, code_tokens, label_mask};

/// Statements whose arguments are not node definitions.
const SKIPPED_STATEMENTS: &[&str] = &["style", "classDef", "class", "linkStyle", "click"];

/// Rewrites alternate node shapes to `ID[label]`.
///
/// Covers round `A(x)`, circle `A((x))`, double circle, stadium `A([x])`, cylinder `A[(x)]`,
/// subroutine `A[[x]]`, rhombus `A{x}`, hexagon `A{{x}}`, trapezoids `A[/x\]` and asymmetric
/// `A>x]`. Parentheses inside an unquoted square label are dropped, their content kept.
pub fn normalize_shapes(input: &str) -> String {
    input
        .split('\n')
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> String {
    let first_word = line
        .trim_start()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("");
    if SKIPPED_STATEMENTS.contains(&first_word) {
        return line.to_string();
    }

    let mask = label_mask(line);
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut last = 0usize;
    for token in code_tokens(line, &mask) {
        let open = token.end;
        if open >= bytes.len() || mask[open] || !matches!(bytes[open], b'[' | b'(' | b'{' | b'>') {
            continue;
        }
        let Some(close) = closing_delimiter(&mask, open) else {
            continue;
        };
        let inner = &line[open + 1..close];
        let Some(label) = rewrite_label(bytes[open], inner) else {
            continue;
        };
        out.push_str(&line[last..open]);
        out.push('[');
        out.push_str(&label);
        out.push(']');
        last = close + 1;
    }
    out.push_str(&line[last..]);
    out
}

/// New label text, or `None` when the definition is already a plain square label.
fn rewrite_label(open: u8, inner: &str) -> Option<String> {
    let trimmed = inner.trim();
    let unwrapped = match open {
        b'[' => {
            let wrapped = (trimmed.starts_with('(') && trimmed.ends_with(')'))
                || (trimmed.starts_with('[') && trimmed.ends_with(']'))
                || (trimmed.starts_with(['/', '\\']) && trimmed.ends_with(['/', '\\']) && trimmed.len() > 1);
            if wrapped {
                unwrap_shape(trimmed)
            } else if is_quoted(trimmed) || !trimmed.contains(['(', ')']) {
                return None;
            } else {
                trimmed
            }
        }
        b'>' => trimmed,
        _ => unwrap_shape(trimmed),
    };

    if is_quoted(unwrapped) {
        return Some(unwrapped.to_string());
    }
    let label = unwrapped
        .replace(['(', ')'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!label.is_empty()).then_some(label)
}

fn unwrap_shape(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '/' | '\\'))
        .trim()
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}
