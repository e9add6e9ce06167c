//! Strict flowchart grammar.
//!
//! Statements are separated by newlines or `;`. Everything the grammar does not recognise is an
//! error carrying the 1-based line number, so a failed parse can drive the fallback ladder.

use crate::error::{RenderError, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Words that may not be used as node ids.
pub const RESERVED_WORDS: &[&str] = &[
    "end",
    "graph",
    "flowchart",
    "subgraph",
    "style",
    "class",
    "classDef",
    "click",
    "linkStyle",
    "direction",
];

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(\s[^<>]*)?/?>").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    TopDown,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    Square,
    Round,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    DoubleCircle,
    Rhombus,
    Hexagon,
    Trapezoid,
    Asymmetric,
}

/// Opening and closing delimiters, longest first.
const SHAPES: &[(&str, &[&str], NodeShape)] = &[
    ("(((", &[")))"], NodeShape::DoubleCircle),
    ("((", &["))"], NodeShape::Circle),
    ("([", &["])"], NodeShape::Stadium),
    ("[[", &["]]"], NodeShape::Subroutine),
    ("[(", &[")]"], NodeShape::Cylinder),
    ("[/", &["/]", "\\]"], NodeShape::Trapezoid),
    ("[\\", &["\\]", "/]"], NodeShape::Trapezoid),
    ("{{", &["}}"], NodeShape::Hexagon),
    ("(", &[")"], NodeShape::Round),
    ("[", &["]"], NodeShape::Square),
    ("{", &["}"], NodeShape::Rhombus),
    (">", &["]"], NodeShape::Asymmetric),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    pub classes: Vec<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeStroke {
    Normal,
    Dotted,
    Thick,
    Invisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeHead {
    None,
    Arrow,
    Cross,
    Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub stroke: EdgeStroke,
    pub head: EdgeHead,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgraph {
    pub id: String,
    pub title: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowGraph {
    pub direction: Direction,
    pub nodes: IndexMap<String, FlowNode>,
    pub edges: Vec<FlowEdge>,
    pub subgraphs: Vec<Subgraph>,
    pub class_defs: IndexMap<String, String>,
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), None | Some(b';'))
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.src[start..self.pos])
    }

    /// The remainder of the current statement, consumed.
    fn take_statement(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.find(';').unwrap_or(rest.len());
        self.pos += len;
        rest[..len].trim()
    }

    fn error(&self, message: impl Into<String>) -> RenderError {
        RenderError::parse(self.line, message)
    }

    fn unexpected(&self) -> RenderError {
        let found: String = self.rest().chars().take(12).collect();
        self.error(format!("unexpected `{found}`"))
    }
}

struct Parser {
    html_labels: bool,
    graph: FlowGraph,
    open_subgraphs: Vec<usize>,
    anonymous_subgraphs: usize,
}

/// Parses flowchart text. With `html_labels == false` any HTML markup in a label is an error.
pub fn parse_flowchart(code: &str, html_labels: bool) -> Result<FlowGraph> {
    let mut parser = Parser {
        html_labels,
        graph: FlowGraph {
            direction: Direction::TopDown,
            nodes: IndexMap::new(),
            edges: Vec::new(),
            subgraphs: Vec::new(),
            class_defs: IndexMap::new(),
        },
        open_subgraphs: Vec::new(),
        anonymous_subgraphs: 0,
    };

    let mut saw_header = false;
    let mut last_line = 0usize;
    for (idx, line) in code.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }
        last_line = idx + 1;
        let mut cur = Cursor {
            src: trimmed,
            pos: 0,
            line: idx + 1,
        };
        if !saw_header {
            parser.header(&mut cur)?;
            saw_header = true;
        }
        loop {
            cur.skip_ws();
            while cur.eat(";") {
                cur.skip_ws();
            }
            if cur.peek().is_none() {
                break;
            }
            parser.statement(&mut cur)?;
        }
    }

    if !saw_header {
        return Err(RenderError::parse(1, "expected `flowchart` or `graph` header"));
    }
    if let Some(&open) = parser.open_subgraphs.last() {
        let id = &parser.graph.subgraphs[open].id;
        return Err(RenderError::parse(
            last_line,
            format!("subgraph `{id}` is missing `end`"),
        ));
    }
    Ok(parser.graph)
}

impl Parser {
    fn header(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        match cur.ident() {
            Some("flowchart" | "graph") => {}
            _ => return Err(cur.error("expected `flowchart` or `graph` header")),
        }
        cur.skip_ws();
        if let Some(token) = cur.ident() {
            self.graph.direction = Direction::parse(token)
                .ok_or_else(|| cur.error(format!("unknown direction `{token}`")))?;
        }
        cur.skip_ws();
        if !cur.at_statement_end() {
            return Err(cur.unexpected());
        }
        Ok(())
    }

    fn statement(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        let start = cur.pos;
        let keyword = cur.ident();
        let followed_by_space = matches!(cur.peek(), None | Some(b' ' | b'\t' | b';'));
        match keyword {
            Some("end") if followed_by_space => {
                if self.open_subgraphs.pop().is_none() {
                    return Err(cur.error("`end` without matching `subgraph`"));
                }
                Ok(())
            }
            Some("subgraph") if followed_by_space => {
                let rest = cur.take_statement();
                self.subgraph(cur, rest)
            }
            Some("direction") if followed_by_space => {
                let rest = cur.take_statement();
                Direction::parse(rest)
                    .map(|_| ())
                    .ok_or_else(|| cur.error(format!("unknown direction `{rest}`")))
            }
            Some("style") if followed_by_space => {
                let rest = cur.take_statement();
                let (id, css) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if id.is_empty() {
                    return Err(cur.error("`style` needs a node id"));
                }
                if let Some(node) = self.graph.nodes.get_mut(id) {
                    node.style = Some(css.trim().to_string());
                }
                Ok(())
            }
            Some("classDef") if followed_by_space => {
                let rest = cur.take_statement();
                let (names, css) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    self.graph
                        .class_defs
                        .insert(name.to_string(), css.trim().to_string());
                }
                Ok(())
            }
            Some("class") if followed_by_space => {
                let rest = cur.take_statement();
                let Some((ids, class)) = rest.rsplit_once(char::is_whitespace) else {
                    return Err(cur.error("`class` needs node ids and a class name"));
                };
                for id in ids.split(',').map(str::trim) {
                    if let Some(node) = self.graph.nodes.get_mut(id) {
                        node.classes.push(class.to_string());
                    }
                }
                Ok(())
            }
            Some("linkStyle" | "click") if followed_by_space => {
                cur.take_statement();
                Ok(())
            }
            _ => {
                cur.pos = start;
                self.chain(cur)
            }
        }
    }

    fn subgraph(&mut self, cur: &Cursor<'_>, rest: &str) -> Result<()> {
        if rest.is_empty() {
            return Err(cur.error("`subgraph` needs a title"));
        }
        let (id, title) = if let Some(quoted) = rest.strip_prefix('"') {
            let title = quoted
                .strip_suffix('"')
                .ok_or_else(|| cur.error("unterminated subgraph title"))?;
            (self.anonymous_subgraph_id(), title.to_string())
        } else if let Some(open) = rest.find('[') {
            let id = rest[..open].trim();
            let title = rest[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| cur.error("unterminated subgraph title"))?;
            if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                return Err(cur.error(format!("invalid subgraph id `{id}`")));
            }
            (id.to_string(), title.trim_matches('"').to_string())
        } else if rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            (rest.to_string(), rest.to_string())
        } else {
            (self.anonymous_subgraph_id(), rest.to_string())
        };

        self.graph.subgraphs.push(Subgraph {
            id,
            title,
            nodes: Vec::new(),
        });
        self.open_subgraphs.push(self.graph.subgraphs.len() - 1);
        Ok(())
    }

    fn anonymous_subgraph_id(&mut self) -> String {
        self.anonymous_subgraphs += 1;
        format!("subGraph{}", self.anonymous_subgraphs - 1)
    }

    /// `a & b --> c -.-> d` and friends.
    fn chain(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        let mut left = self.node_group(cur)?;
        loop {
            cur.skip_ws();
            if cur.at_statement_end() {
                return Ok(());
            }
            let (stroke, head, label) = self.connector(cur)?;
            cur.skip_ws();
            let right = self.node_group(cur)?;
            for from in &left {
                for to in &right {
                    self.graph.edges.push(FlowEdge {
                        from: from.clone(),
                        to: to.clone(),
                        stroke,
                        head,
                        label: label.clone(),
                    });
                }
            }
            left = right;
        }
    }

    fn node_group(&mut self, cur: &mut Cursor<'_>) -> Result<Vec<String>> {
        let mut ids = vec![self.node(cur)?];
        loop {
            let save = cur.pos;
            cur.skip_ws();
            if !cur.eat("&") {
                cur.pos = save;
                return Ok(ids);
            }
            cur.skip_ws();
            ids.push(self.node(cur)?);
        }
    }

    fn node(&mut self, cur: &mut Cursor<'_>) -> Result<String> {
        let Some(id) = cur.ident() else {
            return Err(if cur.peek().is_none() {
                cur.error("expected a node id")
            } else {
                cur.unexpected()
            });
        };
        if RESERVED_WORDS.contains(&id) {
            return Err(cur.error(format!("`{id}` is reserved and cannot be used as a node id")));
        }

        let mut shaped: Option<(String, NodeShape)> = None;
        for (open, closers, shape) in SHAPES {
            if cur.eat(open) {
                let label = self.node_label(cur, id, closers)?;
                shaped = Some((label, *shape));
                break;
            }
        }

        let mut classes = Vec::new();
        if cur.eat(":::") {
            let class = cur
                .ident()
                .ok_or_else(|| cur.error("expected a class name after `:::`"))?;
            classes.push(class.to_string());
        }

        let node = self
            .graph
            .nodes
            .entry(id.to_string())
            .or_insert_with(|| FlowNode {
                id: id.to_string(),
                label: id.to_string(),
                shape: NodeShape::Square,
                classes: Vec::new(),
                style: None,
            });
        if let Some((label, shape)) = shaped {
            node.label = label;
            node.shape = shape;
        }
        node.classes.extend(classes);

        if let Some(&open) = self.open_subgraphs.last() {
            let in_any = self.graph.subgraphs.iter().any(|s| s.nodes.iter().any(|n| n == id));
            if !in_any {
                self.graph.subgraphs[open].nodes.push(id.to_string());
            }
        }
        Ok(id.to_string())
    }

    fn node_label(&self, cur: &mut Cursor<'_>, id: &str, closers: &[&str]) -> Result<String> {
        let rest = cur.rest();
        let (label, consumed) = if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| cur.error(format!("unterminated quoted label on `{id}`")))?;
            let after = &quoted[end + 1..];
            let closer = closers
                .iter()
                .find(|c| after.starts_with(**c))
                .ok_or_else(|| cur.error(format!("expected `{}` after quoted label on `{id}`", closers[0])))?;
            (quoted[..end].to_string(), 1 + end + 1 + closer.len())
        } else {
            let mut found = None;
            for (i, ch) in rest.char_indices() {
                if let Some(closer) = closers.iter().find(|c| rest[i..].starts_with(**c)) {
                    found = Some((i, closer.len()));
                    break;
                }
                if matches!(ch, '[' | ']' | '(' | ')' | '{' | '}' | '"') {
                    return Err(cur.error(format!(
                        "unexpected `{ch}` in label of `{id}`; quote the label instead"
                    )));
                }
            }
            let (end, closer_len) =
                found.ok_or_else(|| cur.error(format!("unterminated label on `{id}`")))?;
            (rest[..end].trim().to_string(), end + closer_len)
        };
        self.check_markup(cur, &label)?;
        cur.pos += consumed;
        Ok(label)
    }

    fn check_markup(&self, cur: &Cursor<'_>, label: &str) -> Result<()> {
        if !self.html_labels && markup_regex().is_match(label) {
            return Err(cur.error(format!("HTML markup in label `{label}` requires htmlLabels")));
        }
        Ok(())
    }

    /// A connector with its optional label: `-->`, `-- text -->`, `-->|text|`, `-.->`, `==>`, ...
    fn connector(&self, cur: &mut Cursor<'_>) -> Result<(EdgeStroke, EdgeHead, Option<String>)> {
        let (stroke, head, open_text) = parse_arrow(cur)?;
        let mut label = None;
        if open_text {
            // `-- text -->`: the text runs up to the closing connector.
            let rest = cur.rest();
            let closers: &[&str] = match stroke {
                EdgeStroke::Thick => &["==>", "==="],
                _ => &["-->", "---"],
            };
            let end = closers
                .iter()
                .filter_map(|c| rest.find(c))
                .min()
                .ok_or_else(|| cur.error("unterminated edge text"))?;
            let text = rest[..end].trim().trim_matches('"').to_string();
            self.check_markup(cur, &text)?;
            cur.pos += end;
            let (stroke, head, _) = parse_arrow(cur)?;
            return Ok((stroke, head, Some(text)));
        }

        let save = cur.pos;
        cur.skip_ws();
        if cur.eat("|") {
            let rest = cur.rest();
            let end = rest
                .find('|')
                .ok_or_else(|| cur.error("unterminated edge label"))?;
            let text = rest[..end].trim().trim_matches('"').to_string();
            self.check_markup(cur, &text)?;
            cur.pos += end + 1;
            label = Some(text);
        } else {
            cur.pos = save;
        }
        Ok((stroke, head, label))
    }
}

/// Parses one connector token. The flag is set for a bare `--`/`==` that opens edge text.
fn parse_arrow(cur: &mut Cursor<'_>) -> Result<(EdgeStroke, EdgeHead, bool)> {
    let start = cur.pos;
    let two_headed = cur.eat("<");
    let stroke;
    let mut body = 0usize;
    if cur.eat("~~~") {
        return Ok((EdgeStroke::Invisible, EdgeHead::None, false));
    } else if cur.eat("-.") {
        while cur.eat(".") {}
        if !cur.eat("-") {
            cur.pos = start;
            return Err(cur.error("malformed dotted connector"));
        }
        stroke = EdgeStroke::Dotted;
        body = 3;
    } else if matches!(cur.peek(), Some(b'-' | b'=')) {
        let ch = if cur.peek() == Some(b'-') { "-" } else { "=" };
        stroke = if ch == "-" {
            EdgeStroke::Normal
        } else {
            EdgeStroke::Thick
        };
        while cur.eat(ch) {
            body += 1;
        }
    } else {
        cur.pos = start;
        return Err(cur.unexpected());
    }

    let next_is_ident = |cur: &Cursor<'_>, offset: usize| {
        cur.src
            .as_bytes()
            .get(cur.pos + offset)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
    };
    let head = if cur.eat(">") {
        EdgeHead::Arrow
    } else if cur.peek() == Some(b'x') && !next_is_ident(cur, 1) {
        cur.pos += 1;
        EdgeHead::Cross
    } else if cur.peek() == Some(b'o') && !next_is_ident(cur, 1) {
        cur.pos += 1;
        EdgeHead::Circle
    } else {
        EdgeHead::None
    };

    if body < 2 {
        cur.pos = start;
        return Err(cur.error("connector needs at least two strokes"));
    }
    if head == EdgeHead::None && body == 2 && stroke != EdgeStroke::Dotted && !two_headed {
        return Ok((stroke, head, true));
    }
    Ok((stroke, head, false))
}
