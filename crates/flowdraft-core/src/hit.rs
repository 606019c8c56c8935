//! Hit-testing of nodes, anchors and connections.

use crate::config::EditorConfig;
use crate::geometry::{self, CurveParams};
use crate::model::{Anchor, Connection, ConnectionId, Node, NodeId};
use kurbo::{CubicBez, Point};

/// What lies under a canvas point, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    /// Anchor handle of a node.
    Anchor { node: NodeId, anchor: Anchor },
    /// Arrowhead handle of a connection.
    ConnectionHead(ConnectionId),
    /// Body of a node (topmost wins).
    NodeBody(NodeId),
    /// Curve of a connection.
    Connection(ConnectionId),
    Empty,
}

/// Hit radii in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerances {
    pub anchor: f64,
    pub head: f64,
    pub edge: f64,
}

impl HitTolerances {
    /// Convert the configured screen-pixel radii for the given zoom level.
    pub fn for_scale(config: &EditorConfig, scale: f64) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        Self {
            anchor: config.anchor_hit_radius / scale,
            head: config.head_hit_radius / scale,
            edge: config.edge_hit_tolerance / scale,
        }
    }
}

fn within(a: Point, b: Point, radius: f64) -> bool {
    (a - b).hypot2() <= radius * radius
}

fn find<'a>(nodes: &'a [Node], id: &NodeId) -> Option<&'a Node> {
    nodes.iter().find(|n| &n.id == id)
}

/// Curve of `connection`, or `None` if an endpoint is missing.
pub fn curve_for(nodes: &[Node], connection: &Connection, params: CurveParams) -> Option<CubicBez> {
    let from = find(nodes, &connection.from)?;
    let to = find(nodes, &connection.to)?;
    Some(geometry::connection_curve(
        from,
        connection.from_anchor,
        to,
        connection.to_anchor,
        params,
    ))
}

/// Anchor handle under `point`, topmost node first.
pub fn anchor_at(nodes: &[Node], point: Point, radius: f64) -> Option<(NodeId, Anchor)> {
    nodes.iter().rev().find_map(|node| {
        node.kind
            .anchors()
            .iter()
            .find(|&&anchor| within(geometry::anchor_point(node, anchor), point, radius))
            .map(|&anchor| (node.id.clone(), anchor))
    })
}

/// Topmost node whose body contains `point`.
pub fn node_body_at(nodes: &[Node], point: Point) -> Option<NodeId> {
    nodes
        .iter()
        .rev()
        .find(|node| node.bounds().contains(point))
        .map(|node| node.id.clone())
}

/// Classify `point` (canvas space).
pub fn hit_test(
    nodes: &[Node],
    connections: &[Connection],
    point: Point,
    tolerances: HitTolerances,
    params: CurveParams,
) -> Hit {
    if let Some((node, anchor)) = anchor_at(nodes, point, tolerances.anchor) {
        return Hit::Anchor { node, anchor };
    }

    let curves: Vec<(&Connection, CubicBez)> = connections
        .iter()
        .filter_map(|c| curve_for(nodes, c, params).map(|curve| (c, curve)))
        .collect();

    if let Some((conn, _)) = curves
        .iter()
        .rev()
        .find(|(_, curve)| within(geometry::arrowhead_handle(curve), point, tolerances.head))
    {
        return Hit::ConnectionHead(conn.id.clone());
    }

    if let Some(node) = node_body_at(nodes, point) {
        return Hit::NodeBody(node);
    }

    curves
        .iter()
        .rev()
        .find(|(_, curve)| geometry::curve_hit(curve, point, tolerances.edge))
        .map(|(conn, _)| Hit::Connection(conn.id.clone()))
        .unwrap_or(Hit::Empty)
}
