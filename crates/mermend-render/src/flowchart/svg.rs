//! SVG emission for a laid-out flowchart.

use super::layout::{FlowLayout, LayoutNode, Point};
use super::parse::{EdgeHead, EdgeStroke, FlowGraph, NodeShape};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    Basis,
}

impl Curve {
    pub fn from_config(name: Option<&str>) -> Self {
        match name {
            Some("linear") | Some("step") | Some("stepBefore") | Some("stepAfter") => {
                Self::Linear
            }
            _ => Self::Basis,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SvgOptions {
    pub html_labels: bool,
    pub curve: Curve,
    pub use_max_width: bool,
    pub font_family: String,
    pub font_size: f64,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            html_labels: true,
            curve: Curve::Basis,
            use_max_width: true,
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 16.0,
        }
    }
}

/// Formats a coordinate with at most three decimals and no trailing zeros.
pub(crate) fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{v:.3}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        let esc = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        out.push_str(&text[start..i]);
        out.push_str(esc);
        start = i + 1;
    }
    out.push_str(&text[start..]);
    out
}

/// `fill:#f9f,stroke:#333` as written in `style`/`classDef` statements, turned into CSS.
fn css_declarations(raw: &str) -> String {
    raw.split(',')
        .map(str::trim)
        .filter(|d| d.contains(':'))
        .collect::<Vec<_>>()
        .join(";")
}

fn node_css(graph: &FlowGraph, id: &str) -> Option<String> {
    let node = graph.nodes.get(id)?;
    let mut parts: Vec<String> = node
        .classes
        .iter()
        .filter_map(|c| graph.class_defs.get(c))
        .map(|d| css_declarations(d))
        .collect();
    if let Some(style) = &node.style {
        parts.push(css_declarations(style));
    }
    parts.retain(|p| !p.is_empty());
    (!parts.is_empty()).then(|| parts.join(";"))
}

fn edge_path(points: &[Point], curve: Curve) -> String {
    let mut d = String::new();
    let Some(first) = points.first() else {
        return d;
    };
    let _ = write!(d, "M{},{}", fmt(first.x), fmt(first.y));
    match (curve, points) {
        (Curve::Basis, [a, b]) => {
            let (c1, c2) = if (b.y - a.y).abs() >= (b.x - a.x).abs() {
                let mid = (a.y + b.y) / 2.0;
                (Point { x: a.x, y: mid }, Point { x: b.x, y: mid })
            } else {
                let mid = (a.x + b.x) / 2.0;
                (Point { x: mid, y: a.y }, Point { x: mid, y: b.y })
            };
            let _ = write!(
                d,
                "C{},{},{},{},{},{}",
                fmt(c1.x),
                fmt(c1.y),
                fmt(c2.x),
                fmt(c2.y),
                fmt(b.x),
                fmt(b.y)
            );
        }
        (Curve::Basis, [_, c1, c2, end]) => {
            let _ = write!(
                d,
                "C{},{},{},{},{},{}",
                fmt(c1.x),
                fmt(c1.y),
                fmt(c2.x),
                fmt(c2.y),
                fmt(end.x),
                fmt(end.y)
            );
        }
        _ => {
            for p in &points[1..] {
                let _ = write!(d, "L{},{}", fmt(p.x), fmt(p.y));
            }
        }
    }
    d
}

fn shape_markup(node: &LayoutNode, style_attr: &str) -> String {
    let (w, h) = (node.width, node.height);
    let (hw, hh) = (w / 2.0, h / 2.0);
    let polygon = |pts: &[(f64, f64)]| {
        let points: Vec<String> = pts
            .iter()
            .map(|(x, y)| format!("{},{}", fmt(*x), fmt(*y)))
            .collect();
        format!(
            r#"<polygon points="{}" class="label-container"{style_attr}/>"#,
            points.join(" ")
        )
    };
    let rect = |rx: f64| {
        format!(
            r#"<rect class="basic label-container" rx="{r}" ry="{r}" x="{x}" y="{y}" width="{w}" height="{h}"{style_attr}/>"#,
            r = fmt(rx),
            x = fmt(-hw),
            y = fmt(-hh),
            w = fmt(w),
            h = fmt(h),
        )
    };

    match node.shape {
        NodeShape::Square => rect(0.0),
        NodeShape::Round => rect(5.0),
        NodeShape::Stadium => rect(hh),
        NodeShape::Subroutine => {
            let inset = 8.0;
            format!(
                r#"{}<path d="M{a},{t}L{a},{b}M{c},{t}L{c},{b}" class="divider"/>"#,
                rect(0.0),
                a = fmt(-hw + inset),
                c = fmt(hw - inset),
                t = fmt(-hh),
                b = fmt(hh),
            )
        }
        NodeShape::Cylinder => {
            let ry = (h * 0.1).max(4.0);
            let rx = hw;
            format!(
                r#"<path d="M{l},{t}a{rx},{ry} 0,0,0 {w},0a{rx},{ry} 0,0,0 {nw},0l0,{body}a{rx},{ry} 0,0,0 {w},0l0,{nbody}" class="basic label-container"{style_attr}/>"#,
                l = fmt(-hw),
                t = fmt(-hh + ry),
                rx = fmt(rx),
                ry = fmt(ry),
                w = fmt(w),
                nw = fmt(-w),
                body = fmt(h - 2.0 * ry),
                nbody = fmt(-(h - 2.0 * ry)),
            )
        }
        NodeShape::Circle => format!(
            r#"<circle class="basic label-container" r="{}" cx="0" cy="0"{style_attr}/>"#,
            fmt(hw)
        ),
        NodeShape::DoubleCircle => format!(
            r#"<g class="basic label-container"><circle class="outer-circle" r="{}" cx="0" cy="0"{style_attr}/><circle class="inner-circle" r="{}" cx="0" cy="0"{style_attr}/></g>"#,
            fmt(hw),
            fmt((hw - 5.0).max(1.0))
        ),
        NodeShape::Rhombus => polygon(&[(0.0, -hh), (hw, 0.0), (0.0, hh), (-hw, 0.0)]),
        NodeShape::Hexagon => {
            let m = hh / 2.0;
            polygon(&[
                (-hw + m, -hh),
                (hw - m, -hh),
                (hw, 0.0),
                (hw - m, hh),
                (-hw + m, hh),
                (-hw, 0.0),
            ])
        }
        NodeShape::Trapezoid => {
            let m = hh / 2.0;
            polygon(&[(-hw + m, -hh), (hw - m, -hh), (hw, hh), (-hw, hh)])
        }
        NodeShape::Asymmetric => polygon(&[
            (-hw, -hh),
            (hw, -hh),
            (hw, hh),
            (-hw, hh),
            (-hw + hh, 0.0),
        ]),
    }
}

fn label_markup(text: &str, width: f64, height: f64, html_labels: bool) -> String {
    if html_labels {
        format!(
            r#"<foreignObject x="{x}" y="{y}" width="{w}" height="{h}"><div xmlns="http://www.w3.org/1999/xhtml" style="display: table-cell; white-space: nowrap; text-align: center;"><span class="nodeLabel">{t}</span></div></foreignObject>"#,
            x = fmt(-width / 2.0),
            y = fmt(-height / 2.0),
            w = fmt(width),
            h = fmt(height),
            t = escape_xml(text),
        )
    } else {
        format!(
            r#"<text x="0" y="0" text-anchor="middle" dominant-baseline="central">{}</text>"#,
            escape_xml(text)
        )
    }
}

fn stylesheet(id: &str, opts: &SvgOptions) -> String {
    let mut css = String::new();
    let _ = write!(
        css,
        "#{id}{{font-family:{};font-size:{}px;fill:#333;}}",
        opts.font_family,
        fmt(opts.font_size)
    );
    let _ = write!(
        css,
        "#{id} .node rect,#{id} .node circle,#{id} .node polygon,#{id} .node path{{fill:#ECECFF;stroke:#9370DB;stroke-width:1px;}}"
    );
    let _ = write!(css, "#{id} .cluster rect{{fill:#ffffde;stroke:#aaaa33;stroke-width:1px;}}");
    let _ = write!(css, "#{id} .flowchart-link{{stroke:#333333;fill:none;}}");
    let _ = write!(css, "#{id} .edge-thickness-normal{{stroke-width:2px;}}");
    let _ = write!(css, "#{id} .edge-thickness-thick{{stroke-width:3.5px;}}");
    let _ = write!(css, "#{id} .edge-pattern-dotted{{stroke-dasharray:2;}}");
    let _ = write!(css, "#{id} .edge-thickness-invisible{{stroke-width:0;fill:none;}}");
    let _ = write!(css, "#{id} .edgeLabel{{background-color:#e8e8e8;}}");
    css
}

fn markers(id: &str) -> String {
    format!(
        concat!(
            r#"<marker id="{id}_arrow" class="marker flowchart-v2" viewBox="0 0 10 10" refX="9" refY="5" markerUnits="userSpaceOnUse" markerWidth="8" markerHeight="8" orient="auto"><path d="M 0 0 L 10 5 L 0 10 z" class="arrowMarkerPath"/></marker>"#,
            r#"<marker id="{id}_cross" class="marker cross flowchart-v2" viewBox="0 0 11 11" refX="10" refY="5.2" markerUnits="userSpaceOnUse" markerWidth="11" markerHeight="11" orient="auto"><path d="M 1,1 l 9,9 M 10,1 l -9,9" class="arrowMarkerPath" style="stroke-width:2;"/></marker>"#,
            r#"<marker id="{id}_circle" class="marker flowchart-v2" viewBox="0 0 10 10" refX="10" refY="5" markerUnits="userSpaceOnUse" markerWidth="11" markerHeight="11" orient="auto"><circle cx="5" cy="5" r="5" class="arrowMarkerPath"/></marker>"#,
        ),
        id = id
    )
}

/// Writes the SVG document. `id` must already be a valid XML id.
pub fn render_flowchart_svg(
    id: &str,
    graph: &FlowGraph,
    layout: &FlowLayout,
    opts: &SvgOptions,
) -> String {
    let (w, h) = (fmt(layout.width), fmt(layout.height));
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" class="flowchart" role="graphics-document document" aria-roledescription="flowchart-v2" viewBox="0 0 {w} {h}""#
    );
    if opts.use_max_width {
        let _ = write!(out, r#" width="100%" style="max-width: {w}px;""#);
    } else {
        let _ = write!(out, r#" width="{w}" height="{h}""#);
    }
    out.push('>');
    let _ = write!(out, "<style>{}</style>", stylesheet(id, opts));
    let _ = write!(out, "<defs>{}</defs>", markers(id));
    out.push_str(r#"<g class="root">"#);

    out.push_str(r#"<g class="clusters">"#);
    for cluster in &layout.clusters {
        let _ = write!(
            out,
            r#"<g class="cluster" id="{id}-{cid}"><rect x="{x}" y="{y}" width="{cw}" height="{ch}"/><text class="cluster-label" x="{tx}" y="{ty}" text-anchor="middle" dominant-baseline="hanging">{title}</text></g>"#,
            cid = escape_xml(&cluster.id),
            x = fmt(cluster.x),
            y = fmt(cluster.y),
            cw = fmt(cluster.width),
            ch = fmt(cluster.height),
            tx = fmt(cluster.x + cluster.width / 2.0),
            ty = fmt(cluster.y + 4.0),
            title = escape_xml(&cluster.title),
        );
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="edgePaths">"#);
    for (i, edge) in layout.edges.iter().enumerate() {
        let thickness = match edge.stroke {
            EdgeStroke::Thick => "thick",
            EdgeStroke::Invisible => "invisible",
            EdgeStroke::Normal | EdgeStroke::Dotted => "normal",
        };
        let pattern = match edge.stroke {
            EdgeStroke::Dotted => "dotted",
            _ => "solid",
        };
        let marker = match edge.head {
            EdgeHead::None => String::new(),
            EdgeHead::Arrow => format!(r#" marker-end="url(#{id}_arrow)""#),
            EdgeHead::Cross => format!(r#" marker-end="url(#{id}_cross)""#),
            EdgeHead::Circle => format!(r#" marker-end="url(#{id}_circle)""#),
        };
        let _ = write!(
            out,
            r#"<path d="{d}" id="{id}-L_{from}_{to}_{i}" class="flowchart-link edge-thickness-{thickness} edge-pattern-{pattern}"{marker}/>"#,
            d = edge_path(&edge.points, opts.curve),
            from = escape_xml(&edge.from),
            to = escape_xml(&edge.to),
        );
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="edgeLabels">"#);
    for edge in &layout.edges {
        let Some(label) = edge.label.as_deref() else {
            continue;
        };
        let lw = label.chars().count() as f64 * opts.font_size * 0.6;
        let lh = opts.font_size * 1.2;
        let _ = write!(
            out,
            r#"<g class="edgeLabel" transform="translate({}, {})">{}</g>"#,
            fmt(edge.label_pos.x),
            fmt(edge.label_pos.y),
            label_markup(label, lw, lh, opts.html_labels)
        );
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="nodes">"#);
    for (i, node) in layout.nodes.iter().enumerate() {
        let style_attr = node_css(graph, &node.id)
            .map(|css| format!(r#" style="{}""#, escape_xml(&css)))
            .unwrap_or_default();
        let classes = graph
            .nodes
            .get(&node.id)
            .map(|n| n.classes.join(" "))
            .unwrap_or_default();
        let _ = write!(
            out,
            r#"<g class="node default {classes}" id="{id}-flowchart-{nid}-{i}" transform="translate({x}, {y})">{shape}<g class="label">{label}</g></g>"#,
            classes = escape_xml(classes.trim()),
            nid = escape_xml(&node.id),
            x = fmt(node.x),
            y = fmt(node.y),
            shape = shape_markup(node, &style_attr),
            label = label_markup(&node.label, node.width, node.height, opts.html_labels),
        );
    }
    out.push_str("</g>");

    out.push_str("</g></svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(fmt(10.0), "10");
        assert_eq!(fmt(10.5), "10.5");
        assert_eq!(fmt(1.0 / 3.0), "0.333");
        assert_eq!(fmt(-0.0001), "0");
        assert_eq!(fmt(f64::NAN), "0");
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_xml(r#"a<b> & "c" 'd'"#), "a&lt;b&gt; &amp; &quot;c&quot; &#39;d&#39;");
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn curve_names_map_to_path_styles() {
        assert_eq!(Curve::from_config(Some("linear")), Curve::Linear);
        assert_eq!(Curve::from_config(Some("basis")), Curve::Basis);
        assert_eq!(Curve::from_config(None), Curve::Basis);
    }

    #[test]
    fn straight_and_curved_paths() {
        let pts = [Point { x: 0.0, y: 0.0 }, Point { x: 0.0, y: 40.0 }];
        assert_eq!(edge_path(&pts, Curve::Linear), "M0,0L0,40");
        assert_eq!(edge_path(&pts, Curve::Basis), "M0,0C0,20,0,20,0,40");
    }

    #[test]
    fn class_defs_and_styles_become_css() {
        let mut graph = crate::flowchart::parse_flowchart(
            "flowchart TD\nA[x]:::hot\nclassDef hot fill:#f00,stroke:#333\nstyle A color:#fff",
            false,
        )
        .unwrap();
        assert_eq!(
            node_css(&graph, "A").as_deref(),
            Some("fill:#f00;stroke:#333;color:#fff")
        );
        graph.class_defs.clear();
        assert_eq!(node_css(&graph, "A").as_deref(), Some("color:#fff"));
    }
}
