//! Built-in headless flowchart engine: strict parse, layered layout, SVG.

mod layout;
mod parse;
mod svg;
mod text;

pub use layout::{
    FlowLayout, LayoutCluster, LayoutEdge, LayoutNode, LayoutOptions, Point, layout_flowchart,
    rank_nodes,
};
pub use parse::{
    Direction, EdgeHead, EdgeStroke, FlowEdge, FlowGraph, FlowNode, NodeShape, RESERVED_WORDS,
    Subgraph, parse_flowchart,
};
pub use svg::{Curve, SvgOptions, render_flowchart_svg};
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};

use crate::engine::RenderEngine;
use crate::error::{RenderError, Result};
use async_trait::async_trait;
use mermend_core::RenderConfig;

const DEFAULT_FONT_FAMILY: &str = "\"trebuchet ms\", verdana, arial, sans-serif";

/// Renders `flowchart`/`graph` diagrams without a browser.
///
/// The engine reads `fontFamily`, `fontSize` and the `flowchart.*` keys `htmlLabels`, `curve`,
/// `nodeSpacing`, `rankSpacing` and `useMaxWidth` from the render config.
#[derive(Debug, Clone, Default)]
pub struct FlowchartEngine {
    measurer: DeterministicTextMeasurer,
}

impl FlowchartEngine {
    pub fn new(measurer: DeterministicTextMeasurer) -> Self {
        Self { measurer }
    }

    /// Synchronous entry point used by [`RenderEngine::render`].
    pub fn render_sync(&self, render_id: &str, code: &str, config: &RenderConfig) -> Result<String> {
        let html_labels = config.get_bool("flowchart.htmlLabels").unwrap_or(true);
        let graph = parse_flowchart(code, html_labels)?;

        let mut options = LayoutOptions::default();
        if let Some(v) = config.try_get_f64("flowchart.nodeSpacing").map_err(config_error)? {
            options.node_spacing = v;
        }
        if let Some(v) = config.try_get_f64("flowchart.rankSpacing").map_err(config_error)? {
            options.rank_spacing = v;
        }
        if !(options.node_spacing.is_finite() && options.rank_spacing.is_finite())
            || options.node_spacing < 0.0
            || options.rank_spacing < 0.0
        {
            return Err(RenderError::Layout {
                message: "spacing must be a non-negative number".to_string(),
            });
        }

        let font_size = config
            .try_get_f64("fontSize")
            .map_err(config_error)?
            .filter(|v| *v > 0.0)
            .unwrap_or(16.0);
        let font_family = config
            .get_str("fontFamily")
            .unwrap_or(DEFAULT_FONT_FAMILY)
            .to_string();
        let style = TextStyle {
            font_family: Some(font_family.clone()),
            font_size,
        };

        let layout = layout_flowchart(&graph, &self.measurer, &style, options);
        tracing::trace!(
            nodes = layout.nodes.len(),
            edges = layout.edges.len(),
            width = layout.width,
            height = layout.height,
            "flowchart laid out"
        );

        let svg_options = SvgOptions {
            html_labels,
            curve: Curve::from_config(config.get_str("flowchart.curve")),
            use_max_width: config.get_bool("flowchart.useMaxWidth").unwrap_or(true),
            font_family,
            font_size,
        };
        Ok(render_flowchart_svg(render_id, &graph, &layout, &svg_options))
    }
}

fn config_error(err: mermend_core::Error) -> RenderError {
    RenderError::Engine {
        message: err.to_string(),
    }
}

#[async_trait]
impl RenderEngine for FlowchartEngine {
    fn name(&self) -> &str {
        "flowchart"
    }

    async fn render(&self, render_id: &str, code: &str, config: &RenderConfig) -> Result<String> {
        self.render_sync(render_id, code, config)
    }
}
