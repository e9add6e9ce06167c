#![forbid(unsafe_code)]

//! Repair of LLM-written Mermaid flowchart text (headless).
//!
//! Raw diagram text runs through an ordered list of pure passes ([`pipeline`]). Each pass keeps
//! its output as a separate candidate so fallbacks can reach back to earlier stages, and the
//! original text is never modified. Passes are best-effort: a pass that cannot confidently
//! transform its input returns it unchanged.

pub mod config;
pub mod error;
pub mod extract;
pub mod markdown;
pub mod notice;
pub mod pipeline;
mod scan;
pub mod source;

pub use config::RenderConfig;
pub use error::{Error, Result};
pub use extract::{
    GENERIC_ARCHITECTURE, SYSTEM_OVERVIEW, extract_nodes, flatten_nodes, simplified_diagram,
};
pub use markdown::{extract_mermaid_blocks, strip_mermaid_fences};
pub use notice::{Notice, NoticeLevel};
pub use pipeline::{Candidate, NormalizeOutcome, Normalized, Pipeline, Stage, Step, normalize};
pub use scan::rename_identifiers;
pub use source::{DiagramInput, DiagramNode, EMBED_PREFIX, parse_embed};

#[cfg(test)]
mod tests;
