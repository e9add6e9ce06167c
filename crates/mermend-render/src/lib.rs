#![forbid(unsafe_code)]

//! Rendering for repaired Mermaid flowcharts.
//!
//! [`Ladder`] runs normalized text through an injected [`RenderEngine`] and degrades through a
//! prefixed retry and a simplified diagram before falling back to showing the original text.
//! [`RenderSession`] adds debouncing and stale-result suppression on top for long-lived views.

pub mod boundary;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod flowchart;
pub mod ladder;
pub mod prefix;
pub mod preview;
pub mod session;

pub use boundary::{Recovery, RecoveryAction, guard, guard_async};
pub use engine::{EngineHandle, RenderEngine, sanitize_svg_id};
pub use error::{LadderError, PreviewError, RenderError, Result};
pub use fallback::TextPanel;
pub use flowchart::FlowchartEngine;
pub use ladder::{
    Attempt, AttemptRecord, Ladder, LadderState, RenderMode, RenderOutput, RenderResult,
    SIMPLIFIED_NOTICE, TEXT_FALLBACK_NOTICE, Transition, transition,
};
pub use prefix::prefix_identifiers;
pub use preview::{PngSource, PreviewImage, PreviewStore};
pub use session::{RenderSession, RenderedView, SessionOptions, ViewState};

#[cfg(test)]
mod tests;
