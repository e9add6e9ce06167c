#![forbid(unsafe_code)]

//! `mermend` repairs Mermaid flowchart text produced by language models and renders it without
//! ever leaving the user with nothing to look at.
//!
//! # Features
//!
//! - `render` (default): the fallback ladder, the built-in flowchart engine and render sessions
//! - `client`: the typed backend client plus [`DiagramView`], which wires a session to it
//! - `raster`: local PNG output via pure-Rust SVG rasterization

pub use mermend_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use mermend_render::*;

    #[cfg(feature = "raster")]
    pub mod raster;

    /// A ladder over the built-in [`FlowchartEngine`] with the stock configuration presets.
    pub fn flowchart_ladder() -> Ladder {
        Ladder::new(EngineHandle::new(FlowchartEngine::default()))
    }

    /// Runs one diagram through the default ladder. Never fails for non-empty input.
    pub async fn render_diagram(
        diagram_id: &str,
        source: &str,
    ) -> std::result::Result<RenderResult, LadderError> {
        flowchart_ladder().render(diagram_id, source).await
    }
}

#[cfg(feature = "client")]
pub mod client {
    pub use mermend_client::*;
}

#[cfg(feature = "client")]
mod view;

#[cfg(feature = "client")]
pub use view::{ApiPngSource, DiagramView};
