use crate::scan::label_mask;
use regex::Regex;
use std::sync::OnceLock;

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([ \t]*)(flowchart|graph)[ \t]*(TB|TD|BT|RL|LR)\b").expect("valid regex")
    })
}

fn is_arrow_byte(b: u8) -> bool {
    matches!(b, b'-' | b'=' | b'.' | b'<' | b'>' | b'~')
}

/// Length of the connector starting at `start`, if any.
fn arrow_len(bytes: &[u8], mask: &[bool], start: usize) -> Option<usize> {
    let mut end = start;
    while end < bytes.len() && !mask[end] && is_arrow_byte(bytes[end]) {
        end += 1;
    }
    let run = &bytes[start..end];
    let has_body =
        run.windows(2).any(|w| w == b"--" || w == b"==" || w == b"-.") || run == b"~~~";
    if !has_body {
        return None;
    }
    // `--o` / `--x` circle and cross heads.
    if matches!(run.last(), Some(b'-' | b'='))
        && matches!(bytes.get(end), Some(b'o' | b'x'))
        && bytes.get(end + 1).is_none_or(|b| b.is_ascii_whitespace())
    {
        end += 1;
    }
    if end - start < 3 {
        return None;
    }
    Some(end - start)
}

fn space_connectors(line: &str) -> String {
    let mask = label_mask(line);
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len() + 8);
    let mut last = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        if mask[i] || !is_arrow_byte(bytes[i]) {
            i += 1;
            continue;
        }
        let Some(len) = arrow_len(bytes, &mask, i) else {
            while i < bytes.len() && !mask[i] && is_arrow_byte(bytes[i]) {
                i += 1;
            }
            continue;
        };
        out.push_str(&line[last..i]);
        let kept = out.trim_end_matches([' ', '\t']).len();
        out.truncate(kept);
        if !out.trim().is_empty() {
            out.push(' ');
        }
        out.push_str(&line[i..i + len]);
        i += len;
        if bytes.get(i) != Some(&b'|') {
            out.push(' ');
        }
        while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
            i += 1;
        }
        last = i;
    }
    out.push_str(&line[last..]);
    out
}

/// Canonical whitespace: LF line endings, `flowchart TD` headers, single spaces around
/// connectors, no trailing whitespace and no blank lines.
pub fn normalize_spacing(input: &str) -> String {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    unified
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let line = header_regex().replace(line, "$1$2 $3");
            space_connectors(&line).trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
