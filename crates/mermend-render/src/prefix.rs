//! Defensive id prefixing for the second render attempt.

use crate::flowchart::RESERVED_WORDS;
use mermend_core::rename_identifiers;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::OnceLock;

pub const ID_PREFIX: &str = "n_";

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_]+").expect("valid regex"))
}

fn needs_prefix(word: &str) -> bool {
    RESERVED_WORDS.contains(&word) || (word.len() == 1 && word.as_bytes()[0].is_ascii_alphabetic())
}

/// Prefixes node references that collide with renderer keywords or are a single letter.
///
/// Label text, `:::class` names and `classDef` lines are untouched. A prefixed id that already
/// exists somewhere in the text gets trailing underscores until it is unique.
pub fn prefix_identifiers(code: &str) -> String {
    let mut words: Vec<&str> = Vec::new();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for m in word_regex().find_iter(code) {
        if seen.insert(m.as_str()) {
            words.push(m.as_str());
        }
    }

    let mut renames: FxHashMap<&str, String> = FxHashMap::default();
    let mut taken: FxHashSet<String> = FxHashSet::default();
    for word in words.iter().copied().filter(|w| needs_prefix(w)) {
        let mut prefixed = format!("{ID_PREFIX}{word}");
        while seen.contains(prefixed.as_str()) || taken.contains(&prefixed) {
            prefixed.push('_');
        }
        taken.insert(prefixed.clone());
        renames.insert(word, prefixed);
    }

    if renames.is_empty() {
        return code.to_string();
    }
    rename_identifiers(code, &|word| renames.get(word).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_single_letters_and_reserved_words() {
        assert_eq!(
            prefix_identifiers("flowchart TD\nA[Start] --> end\nclass A hot;\nstyle end fill:#fff"),
            "flowchart TD\nn_A[Start] --> n_end\nclass n_A hot;\nstyle n_end fill:#fff"
        );
    }

    #[test]
    fn keeps_subgraph_terminators_and_labels() {
        let src = "graph LR\nsubgraph Core\nB[Plan B] --o C\nend";
        assert_eq!(
            prefix_identifiers(src),
            "graph LR\nsubgraph Core\nn_B[Plan B] --o n_C\nend"
        );
    }

    #[test]
    fn avoids_existing_ids() {
        assert_eq!(
            prefix_identifiers("A[One] --> n_A[Two]"),
            "n_A_[One] --> n_A[Two]"
        );
    }

    #[test]
    fn nothing_to_prefix_is_identity() {
        let src = "flowchart TD\nNODE_A[Web] --> NODE_B[Api]";
        assert_eq!(prefix_identifiers(src), src);
    }
}
