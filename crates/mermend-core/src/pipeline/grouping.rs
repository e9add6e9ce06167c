use super::{NormalizeOutcome, Step};
use crate::extract::{GENERIC_ARCHITECTURE, extract_nodes, flatten_nodes};
use crate::scan::{closing_delimiter, label_mask};

fn subgraph_title(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("subgraph")?;
    if rest.is_empty() {
        return Some("");
    }
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

fn is_end(line: &str) -> bool {
    matches!(line.trim(), "end" | "end;")
}

fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Fixes spacing and brace-delimited blocks: `subgraph  Api {` ... `}` becomes
/// `subgraph Api` ... `end`.
fn repair(input: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut brace_blocks = 0usize;
    for line in input.lines() {
        if let Some(title) = subgraph_title(line) {
            let (title, braced) = match title.strip_suffix('{') {
                Some(t) => (t.trim_end(), true),
                None => (title, false),
            };
            if braced {
                brace_blocks += 1;
            }
            out.push(format!("{}subgraph {}", indent_of(line), title));
            continue;
        }

        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix('}') {
            let rest = rest.trim();
            if rest == "end" || rest == "end;" {
                brace_blocks = brace_blocks.saturating_sub(1);
                out.push(format!("{}end", indent_of(line)));
                continue;
            }
            if rest.is_empty() && brace_blocks > 0 {
                brace_blocks -= 1;
                out.push(format!("{}end", indent_of(line)));
                continue;
            }
        }
        if is_end(line) {
            out.push(format!("{}end", indent_of(line)));
            continue;
        }
        out.push(line.to_string());
    }
    out.join("\n")
}

/// Balanced `subgraph`/`end` pairs, non-empty titles, balanced title brackets, no braces left.
fn is_well_formed(code: &str) -> bool {
    let mut depth = 0usize;
    for line in code.lines() {
        if let Some(title) = subgraph_title(line) {
            if title.is_empty() || title.contains('{') || title.contains('}') {
                return false;
            }
            let mask = label_mask(title);
            for (i, b) in title.bytes().enumerate() {
                if b == b'[' && !mask[i] && closing_delimiter(&mask, i).is_none() {
                    return false;
                }
            }
            depth += 1;
        } else if is_end(line) {
            let Some(next) = depth.checked_sub(1) else {
                return false;
            };
            depth = next;
        } else if line.trim() == "}" {
            return false;
        }
    }
    depth == 0
}

/// Repairs `subgraph` blocks, or flattens the diagram when they stay malformed.
///
/// Flattening keeps every `ID[label]` node in encounter order and links consecutive nodes. With
/// no extractable node, [`GENERIC_ARCHITECTURE`] is substituted.
pub fn repair_grouping(input: &str) -> Step {
    if !input.lines().any(|l| subgraph_title(l).is_some()) {
        return Step::Continue(input.to_string());
    }

    let repaired = repair(input);
    if is_well_formed(&repaired) {
        return Step::Continue(repaired);
    }

    tracing::info!("subgraph blocks could not be repaired; flattening");
    let nodes = extract_nodes(input);
    if nodes.is_empty() {
        tracing::warn!("no nodes extracted from grouped diagram; substituting generic architecture");
        return Step::Finish(GENERIC_ARCHITECTURE.to_string(), NormalizeOutcome::Placeholder);
    }
    Step::Finish(flatten_nodes(&nodes), NormalizeOutcome::Flattened)
}
