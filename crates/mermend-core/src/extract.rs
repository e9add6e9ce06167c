use crate::DiagramNode;
use crate::pipeline::normalize_line_breaks;
use crate::scan::square_definitions;
use rustc_hash::FxHashSet;

/// Stand-in used when a grouping construct cannot be repaired and no node survives extraction.
pub const GENERIC_ARCHITECTURE: &str = "flowchart TD
    UI[User Interface Layer] --> BL[Business Logic Layer]
    BL --> DAL[Data Access Layer]
    DAL --> DB[Database]
    BL --> API[External APIs]
    BL --> SEC[Security Layer]
    UI --> AUTH[Authentication]
    AUTH --> SEC
    style UI fill:#e1f5fe
    style BL fill:#f3e5f5
    style DAL fill:#e8f5e8
    style DB fill:#fff3e0
    style API fill:#fce4ec
    style SEC fill:#ffebee
    style AUTH fill:#f1f8e9";

/// Stand-in used by the simplified render attempt when the original text has no usable nodes.
pub const SYSTEM_OVERVIEW: &str = "flowchart TD
    START[System Architecture] --> FE[Frontend Layer]
    START --> BE[Backend Layer]
    FE --> AUTH[Authentication Service]
    BE --> BL[Business Logic]
    BL --> DB[Database Layer]
    BE --> API[External APIs]
    style START fill:#e3f2fd
    style FE fill:#f3e5f5
    style BE fill:#e8f5e8
    style AUTH fill:#fff3e0
    style BL fill:#fce4ec
    style DB fill:#ffebee
    style API fill:#f1f8e9";

/// Every `ID[label]` node in encounter order, ignoring grouping structure.
///
/// The first definition of an id wins. Subgraph titles (`subgraph S1[Title]`) are not nodes.
/// Label text loses characters that would reopen or close a label.
pub fn extract_nodes(code: &str) -> Vec<DiagramNode> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut out = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        let header_end = trimmed
            .strip_prefix("subgraph")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .map(|rest| {
                let lead = line.len() - trimmed.len() + "subgraph".len();
                lead + (rest.len() - rest.trim_start().len())
            });

        for (id_range, label_range) in square_definitions(line) {
            if header_end == Some(id_range.start) {
                continue;
            }
            let id = &line[id_range];
            if !id.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
                continue;
            }
            let inner = &line[label_range.start + 1..label_range.end - 1];
            let label = clean_label(inner);
            if label.is_empty() || !seen.insert(id.to_string()) {
                continue;
            }
            out.push(DiagramNode::new(id, label));
        }
    }
    out
}

/// Breaks become spaces before markup characters are dropped, so the words they separated stay
/// apart.
fn clean_label(raw: &str) -> String {
    let stripped: String = normalize_line_breaks(raw)
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '[' | ']' | '"'))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flat flowchart: every node, then a chain linking each node to the next in encounter order.
pub fn flatten_nodes(nodes: &[DiagramNode]) -> String {
    let mut out = String::from("flowchart TD");
    for node in nodes {
        out.push_str(&format!("\n  {}[{}]", node.id, node.label));
    }
    for pair in nodes.windows(2) {
        out.push_str(&format!("\n  {} --> {}", pair[0].id, pair[1].id));
    }
    out
}

/// Minimal diagram for the permissive render attempt: nodes only, no edges.
///
/// Built from the original text, so it does not depend on any normalization pass having
/// succeeded.
pub fn simplified_diagram(original: &str) -> String {
    let nodes = extract_nodes(original);
    if nodes.is_empty() {
        return SYSTEM_OVERVIEW.to_string();
    }
    let mut out = String::from("graph TD");
    for node in &nodes {
        out.push_str(&format!("\n  {}[{}]", node.id, node.label));
    }
    out
}
