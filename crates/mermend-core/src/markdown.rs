//! Diagram text embedded in Markdown analysis results.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

fn fence_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```mermaid\n|```").expect("valid regex"))
}

/// Bodies of every ```` ```mermaid ```` fenced block, in document order.
pub fn extract_mermaid_blocks(markdown: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let lang = info.split_whitespace().next().unwrap_or("");
                if lang.eq_ignore_ascii_case("mermaid") {
                    current = Some(String::new());
                }
            }
            Event::Text(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(buf) = current.take() {
                    blocks.push(buf.trim_end().to_string());
                }
            }
            _ => {}
        }
    }
    blocks
}

/// Removes fence markers from a single diagram field, keeping everything else verbatim.
///
/// Unlike [`extract_mermaid_blocks`] this does not parse Markdown, so prose around the fence
/// survives.
pub fn strip_mermaid_fences(text: &str) -> String {
    fence_marker_regex().replace_all(text, "").into_owned()
}
