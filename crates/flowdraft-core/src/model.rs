//! Diagram data model: nodes, connections and the persisted document.

use crate::viewport::Viewport;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

/// Edge length of a regular node, in canvas units.
pub const NODE_SIZE: f64 = 120.0;
/// Decision nodes are drawn at 90% of the regular size.
pub const DECISION_SCALE: f64 = 0.9;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Identifier of a node (`n-<k>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(crate) fn from_counter(counter: u64) -> Self {
        Self(format!("n-{counter}"))
    }

    /// Numeric suffix of a counter-allocated id.
    pub(crate) fn counter(&self) -> Option<u64> {
        self.0.strip_prefix("n-")?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a connection (`c-<k>`), independent of node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(crate) fn from_counter(counter: u64) -> Self {
        Self(format!("c-{counter}"))
    }

    pub(crate) fn counter(&self) -> Option<u64> {
        self.0.strip_prefix("c-")?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Side of a node where a connection attaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    Right,
    Bottom,
    Left,
}

impl Anchor {
    /// All anchors, in tie-breaking order.
    pub const ALL: [Anchor; 4] = [Anchor::Top, Anchor::Right, Anchor::Bottom, Anchor::Left];

    pub fn name(self) -> &'static str {
        match self {
            Anchor::Top => "top",
            Anchor::Right => "right",
            Anchor::Bottom => "bottom",
            Anchor::Left => "left",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flowchart node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    Assignment,
    Decision,
    Comment,
}

const DECISION_ANCHORS: [Anchor; 3] = [Anchor::Top, Anchor::Right, Anchor::Left];

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Assignment,
        NodeKind::Decision,
        NodeKind::Comment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Assignment => "assignment",
            NodeKind::Decision => "decision",
            NodeKind::Comment => "comment",
        }
    }

    /// Text shown for a freshly created node, and whenever its text is cleared.
    pub fn default_content(self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::End => "End",
            NodeKind::Assignment => "variable = value",
            NodeKind::Decision => "Condition?",
            NodeKind::Comment => "Comment",
        }
    }

    /// Fixed size of nodes of this type.
    pub fn size(self) -> Size {
        match self {
            NodeKind::Decision => Size::new(NODE_SIZE * DECISION_SCALE, NODE_SIZE * DECISION_SCALE),
            _ => Size::new(NODE_SIZE, NODE_SIZE),
        }
    }

    /// Anchors a connection may attach to.
    pub fn anchors(self) -> &'static [Anchor] {
        match self {
            NodeKind::Decision => &DECISION_ANCHORS,
            _ => &Anchor::ALL,
        }
    }

    pub fn accepts(self, anchor: Anchor) -> bool {
        self.anchors().contains(&anchor)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown node type: {s}"))
    }
}

/// A flowchart node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Top-left corner in canvas space.
    #[serde(flatten)]
    pub position: Point,
    pub content: String,
}

impl Node {
    /// Create a node with its type's default content.
    pub fn new(id: NodeId, kind: NodeKind, position: Point) -> Self {
        Self {
            id,
            kind,
            position,
            content: kind.default_content().to_string(),
        }
    }

    pub fn size(&self) -> Size {
        self.kind.size()
    }

    /// Bounding box in canvas space.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size())
    }
}

/// A directed edge between two node anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub from_anchor: Anchor,
    pub to: NodeId,
    pub to_anchor: Anchor,
}

impl Connection {
    /// Whether either endpoint is `node`.
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.from == node || &self.to == node
    }

    /// Whether this connection follows exactly the given route.
    pub fn has_route(&self, from: &NodeId, from_anchor: Anchor, to: &NodeId, to_anchor: Anchor) -> bool {
        &self.from == from && self.from_anchor == from_anchor && &self.to == to && self.to_anchor == to_anchor
    }
}

fn new_diagram_id() -> String {
    Uuid::new_v4().to_string()
}

/// The persisted diagram document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(default = "new_diagram_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub viewport: Viewport,
    /// Storage revision marker, bumped on every write.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl Diagram {
    /// Create a new empty diagram.
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_diagram_id(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            nodes: Vec::new(),
            connections: Vec::new(),
            viewport: Viewport::default(),
            revision: None,
        }
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
