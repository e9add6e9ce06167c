//! Layered layout: longest-path ranks, first-appearance order inside a rank.

use super::parse::{Direction, EdgeHead, EdgeStroke, FlowGraph, NodeShape};
use super::text::{TextMeasurer, TextStyle};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::VecDeque;

const NODE_PADDING_X: f64 = 15.0;
const NODE_PADDING_Y: f64 = 10.0;
const CLUSTER_PADDING: f64 = 16.0;
const MARGIN: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    pub node_spacing: f64,
    pub rank_spacing: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 50.0,
        }
    }
}

/// A positioned node; `x`/`y` is the center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEdge {
    pub from: String,
    pub to: String,
    pub points: Vec<Point>,
    pub stroke: EdgeStroke,
    pub head: EdgeHead,
    pub label: Option<String>,
    pub label_pos: Point,
}

/// A subgraph box; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutCluster {
    pub id: String,
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub clusters: Vec<LayoutCluster>,
    pub width: f64,
    pub height: f64,
}

/// Longest-path ranks via Kahn's algorithm.
///
/// When only cycles remain, the earliest remaining node is released as if it had no pending
/// predecessors, which breaks the cycle at its first-declared member.
pub fn rank_nodes(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut indegree = vec![0usize; node_count];
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        if from == to {
            continue;
        }
        out[from].push(to);
        indegree[to] += 1;
    }

    let mut rank = vec![0usize; node_count];
    let mut done = vec![false; node_count];
    let mut queue: VecDeque<usize> = (0..node_count).filter(|&v| indegree[v] == 0).collect();
    let mut remaining = node_count;
    while remaining > 0 {
        let v = match queue.pop_front() {
            Some(v) => v,
            None => match (0..node_count).find(|&v| !done[v]) {
                Some(v) => v,
                None => break,
            },
        };
        if done[v] {
            continue;
        }
        done[v] = true;
        remaining -= 1;
        for &w in &out[v] {
            if done[w] {
                continue;
            }
            rank[w] = rank[w].max(rank[v] + 1);
            indegree[w] = indegree[w].saturating_sub(1);
            if indegree[w] == 0 {
                queue.push_back(w);
            }
        }
    }
    rank
}

pub fn layout_flowchart(
    graph: &FlowGraph,
    measurer: &dyn TextMeasurer,
    style: &TextStyle,
    options: LayoutOptions,
) -> FlowLayout {
    let index: FxHashMap<&str, usize> = graph
        .nodes
        .keys()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let edge_pairs: Vec<(usize, usize)> = graph
        .edges
        .iter()
        .filter_map(|e| Some((*index.get(e.from.as_str())?, *index.get(e.to.as_str())?)))
        .collect();
    let ranks = rank_nodes(graph.nodes.len(), &edge_pairs);

    let mut nodes: Vec<LayoutNode> = graph
        .nodes
        .values()
        .zip(&ranks)
        .map(|(node, &rank)| {
            let (width, height) = node_size(node.shape, &node.label, measurer, style);
            LayoutNode {
                id: node.id.clone(),
                label: node.label.clone(),
                shape: node.shape,
                x: 0.0,
                y: 0.0,
                width,
                height,
                rank,
            }
        })
        .collect();

    let horizontal = graph.direction.is_horizontal();
    let rank_count = ranks.iter().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    for (i, &r) in ranks.iter().enumerate() {
        layers[r].push(i);
    }

    // Extent of each layer along the rank axis, and along the cross axis.
    let depth_of = |n: &LayoutNode| if horizontal { n.width } else { n.height };
    let breadth_of = |n: &LayoutNode| if horizontal { n.height } else { n.width };
    let layer_depth: Vec<f64> = layers
        .iter()
        .map(|l| l.iter().map(|&i| depth_of(&nodes[i])).fold(0.0, f64::max))
        .collect();
    let layer_breadth: Vec<f64> = layers
        .iter()
        .map(|l| {
            let sum: f64 = l.iter().map(|&i| breadth_of(&nodes[i])).sum();
            sum + options.node_spacing * l.len().saturating_sub(1) as f64
        })
        .collect();
    let max_breadth = layer_breadth.iter().copied().fold(0.0, f64::max);

    let mut rank_offset = 0.0;
    for (r, layer) in layers.iter().enumerate() {
        let rank_center = rank_offset + layer_depth[r] / 2.0;
        let mut cross = (max_breadth - layer_breadth[r]) / 2.0;
        for &i in layer {
            let b = breadth_of(&nodes[i]);
            let cross_center = cross + b / 2.0;
            let node = &mut nodes[i];
            if horizontal {
                node.x = rank_center;
                node.y = cross_center;
            } else {
                node.x = cross_center;
                node.y = rank_center;
            }
            cross += b + options.node_spacing;
        }
        rank_offset += layer_depth[r] + options.rank_spacing;
    }
    let total_depth = (rank_offset - options.rank_spacing).max(0.0);

    if matches!(graph.direction, Direction::BottomTop | Direction::RightLeft) {
        for node in &mut nodes {
            if horizontal {
                node.x = total_depth - node.x;
            } else {
                node.y = total_depth - node.y;
            }
        }
    }

    // Room for subgraph titles and padding around the whole drawing.
    let title_height = style.font_size * 1.5;
    let shift = MARGIN
        + CLUSTER_PADDING
        + if graph.subgraphs.is_empty() {
            0.0
        } else {
            title_height
        };
    for node in &mut nodes {
        node.x += shift;
        node.y += shift;
    }

    let by_id: FxHashMap<&str, &LayoutNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let edges: Vec<LayoutEdge> = graph
        .edges
        .iter()
        .filter_map(|e| {
            let from = by_id.get(e.from.as_str())?;
            let to = by_id.get(e.to.as_str())?;
            let points = route(from, to, horizontal);
            let label_pos = midpoint(&points);
            Some(LayoutEdge {
                from: e.from.clone(),
                to: e.to.clone(),
                points,
                stroke: e.stroke,
                head: e.head,
                label: e.label.clone(),
                label_pos,
            })
        })
        .collect();

    let clusters: Vec<LayoutCluster> = graph
        .subgraphs
        .iter()
        .filter_map(|sg| {
            let members: Vec<&&LayoutNode> =
                sg.nodes.iter().filter_map(|id| by_id.get(id.as_str())).collect();
            if members.is_empty() {
                return None;
            }
            let min_x = members.iter().map(|n| n.x - n.width / 2.0).fold(f64::INFINITY, f64::min);
            let min_y = members.iter().map(|n| n.y - n.height / 2.0).fold(f64::INFINITY, f64::min);
            let max_x = members.iter().map(|n| n.x + n.width / 2.0).fold(f64::NEG_INFINITY, f64::max);
            let max_y = members.iter().map(|n| n.y + n.height / 2.0).fold(f64::NEG_INFINITY, f64::max);
            Some(LayoutCluster {
                id: sg.id.clone(),
                title: sg.title.clone(),
                x: min_x - CLUSTER_PADDING,
                y: min_y - CLUSTER_PADDING - title_height,
                width: max_x - min_x + 2.0 * CLUSTER_PADDING,
                height: max_y - min_y + 2.0 * CLUSTER_PADDING + title_height,
            })
        })
        .collect();
    drop(by_id);

    let mut width = nodes.iter().map(|n| n.x + n.width / 2.0).fold(0.0, f64::max);
    let mut height = nodes.iter().map(|n| n.y + n.height / 2.0).fold(0.0, f64::max);
    for c in &clusters {
        width = width.max(c.x + c.width);
        height = height.max(c.y + c.height);
    }

    FlowLayout {
        nodes,
        edges,
        clusters,
        width: width + MARGIN + CLUSTER_PADDING,
        height: height + MARGIN + CLUSTER_PADDING,
    }
}

fn node_size(shape: NodeShape, label: &str, measurer: &dyn TextMeasurer, style: &TextStyle) -> (f64, f64) {
    let m = measurer.measure(label, style);
    let w = m.width + 2.0 * NODE_PADDING_X;
    let h = m.height + 2.0 * NODE_PADDING_Y;
    match shape {
        NodeShape::Circle | NodeShape::DoubleCircle => {
            let d = w.max(h);
            (d, d)
        }
        NodeShape::Rhombus => {
            let side = w + h;
            (side, side)
        }
        NodeShape::Hexagon => (w + h / 2.0, h),
        NodeShape::Stadium | NodeShape::Trapezoid | NodeShape::Asymmetric => (w + h / 2.0, h),
        NodeShape::Cylinder => (w, h + 10.0),
        _ => (w, h),
    }
}

/// Straight segment between the facing sides of two boxes; self loops get a small detour.
fn route(from: &LayoutNode, to: &LayoutNode, horizontal: bool) -> Vec<Point> {
    if from.id == to.id {
        let x = from.x + from.width / 2.0;
        let y = from.y;
        return vec![
            Point { x, y: y - from.height / 4.0 },
            Point { x: x + 20.0, y: y - from.height / 4.0 },
            Point { x: x + 20.0, y: y + from.height / 4.0 },
            Point { x, y: y + from.height / 4.0 },
        ];
    }
    let (start, end) = if horizontal {
        let dir = if to.x >= from.x { 1.0 } else { -1.0 };
        (
            Point { x: from.x + dir * from.width / 2.0, y: from.y },
            Point { x: to.x - dir * to.width / 2.0, y: to.y },
        )
    } else {
        let dir = if to.y >= from.y { 1.0 } else { -1.0 };
        (
            Point { x: from.x, y: from.y + dir * from.height / 2.0 },
            Point { x: to.x, y: to.y - dir * to.height / 2.0 },
        )
    };
    vec![start, end]
}

fn midpoint(points: &[Point]) -> Point {
    match points {
        [] => Point { x: 0.0, y: 0.0 },
        [only] => *only,
        _ => {
            let a = points[points.len() / 2 - 1];
            let b = points[points.len() / 2];
            Point {
                x: (a.x + b.x) / 2.0,
                y: (a.y + b.y) / 2.0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowchart::parse::parse_flowchart;
    use crate::flowchart::text::DeterministicTextMeasurer;

    fn layout(code: &str) -> FlowLayout {
        let g = parse_flowchart(code, false).unwrap();
        layout_flowchart(
            &g,
            &DeterministicTextMeasurer::default(),
            &TextStyle::default(),
            LayoutOptions::default(),
        )
    }

    #[test]
    fn ranks_follow_longest_path() {
        assert_eq!(rank_nodes(4, &[(0, 1), (1, 2), (0, 2), (2, 3)]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn ranks_survive_cycles() {
        let ranks = rank_nodes(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(ranks, vec![0, 1, 2]);
        assert_eq!(rank_nodes(2, &[(0, 0)]), vec![0, 0]);
    }

    #[test]
    fn top_down_stacks_ranks_vertically() {
        let l = layout("flowchart TD\nA[Top] --> B[Bottom]");
        assert!(l.nodes[0].y < l.nodes[1].y);
        assert!((l.nodes[0].x - l.nodes[1].x).abs() < 1e-9);
        assert_eq!(l.edges[0].points.len(), 2);
        assert!(l.width > 0.0 && l.height > l.nodes[1].y);
    }

    #[test]
    fn left_right_and_reversed_directions() {
        let lr = layout("flowchart LR\nA --> B");
        assert!(lr.nodes[0].x < lr.nodes[1].x);
        let bt = layout("flowchart BT\nA --> B");
        assert!(bt.nodes[0].y > bt.nodes[1].y);
    }

    #[test]
    fn clusters_enclose_members() {
        let l = layout("flowchart TD\nsubgraph S[Group]\nA --> B\nend\nB --> C");
        let c = &l.clusters[0];
        for n in &l.nodes[..2] {
            assert!(n.x - n.width / 2.0 >= c.x && n.x + n.width / 2.0 <= c.x + c.width);
            assert!(n.y - n.height / 2.0 >= c.y && n.y + n.height / 2.0 <= c.y + c.height);
        }
    }
}
