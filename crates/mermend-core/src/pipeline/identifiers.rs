use crate::scan::{code_tokens, is_ident_byte, label_mask, rename_identifiers, square_definitions};
use rustc_hash::{FxHashMap, FxHashSet};

/// Style-class hints recognised as id categories. Anything else maps to `NODE`.
pub const CATEGORY_HINTS: &[&str] = &[
    "UI", "APP", "BIZ", "DATA", "SEC", "INFRA", "API", "CTRL", "SVC", "REPO", "DB", "UTIL", "EXT",
];

const GENERIC_CATEGORY: &str = "NODE";

/// The `:::cls` hint attached right after a definition's closing bracket.
fn attached_hint(line: &str, label_end: usize) -> Option<String> {
    let rest = line[label_end..].strip_prefix(":::")?;
    let len = rest.bytes().take_while(|b| is_ident_byte(*b)).count();
    (len > 0).then(|| rest[..len].to_ascii_uppercase())
}

fn category(hint: Option<&str>) -> &'static str {
    hint.and_then(|h| CATEGORY_HINTS.iter().find(|c| **c == h).copied())
        .unwrap_or(GENERIC_CATEGORY)
}

/// Expands single-letter node ids to `<CATEGORY>_<letter>`.
///
/// Only ids that have a square-bracket definition are expanded. Every reference outside label
/// text is rewritten to the same expanded id; `:::class` names and `classDef` lines are left
/// alone. An expansion that would collide with an existing id gets a trailing underscore.
pub fn disambiguate_identifiers(code: &str) -> String {
    let mut existing: FxHashSet<&str> = FxHashSet::default();
    for line in code.lines() {
        let mask = label_mask(line);
        for token in code_tokens(line, &mask) {
            existing.insert(&line[token]);
        }
    }

    let mut renames: FxHashMap<String, String> = FxHashMap::default();
    let mut taken: FxHashSet<String> = FxHashSet::default();
    for line in code.lines() {
        for (id_range, label_range) in square_definitions(line) {
            let id = &line[id_range];
            if id.len() != 1 || !id.as_bytes()[0].is_ascii_alphabetic() || renames.contains_key(id)
            {
                continue;
            }
            let hint = attached_hint(line, label_range.end);
            let mut expanded = format!("{}_{}", category(hint.as_deref()), id);
            while existing.contains(expanded.as_str()) || taken.contains(&expanded) {
                expanded.push('_');
            }
            taken.insert(expanded.clone());
            renames.insert(id.to_string(), expanded);
        }
    }

    if renames.is_empty() {
        return code.to_string();
    }
    tracing::debug!(count = renames.len(), "expanding single-letter ids");
    rename_identifiers(code, &|word| renames.get(word).cloned())
}
