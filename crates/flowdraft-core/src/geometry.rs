//! Stateless coordinate and shape math.

use crate::model::{Anchor, Node};
use crate::viewport::Viewport;
use kurbo::{CubicBez, ParamCurveNearest, Point, Rect, Vec2};

/// Accuracy used for nearest-point queries on connection curves.
const NEAREST_ACCURACY: f64 = 0.1;
/// Distance from the target anchor back to the arrowhead handle, in canvas units.
pub const HEAD_HANDLE_OFFSET: f64 = 16.0;

/// Shape parameters for connection curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveParams {
    /// Fraction of the dominant-axis distance used as control offset.
    pub curvature: f64,
    /// Upper bound for the control offset, in canvas units.
    pub max_offset: f64,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            curvature: 0.4,
            max_offset: 150.0,
        }
    }
}

/// Convert a screen point to canvas space.
pub fn to_canvas_point(screen: Point, viewport: &Viewport) -> Point {
    viewport.screen_to_canvas(screen)
}

/// Convert a canvas point to screen space.
pub fn to_screen_point(canvas: Point, viewport: &Viewport) -> Point {
    viewport.canvas_to_screen(canvas)
}

/// Bounding box of a node in canvas space.
pub fn node_bounds(node: &Node) -> Rect {
    node.bounds()
}

/// Midpoint of the given side of the node's bounding box.
pub fn anchor_point(node: &Node, side: Anchor) -> Point {
    let bounds = node.bounds();
    let center = bounds.center();
    match side {
        Anchor::Top => Point::new(center.x, bounds.y0),
        Anchor::Right => Point::new(bounds.x1, center.y),
        Anchor::Bottom => Point::new(center.x, bounds.y1),
        Anchor::Left => Point::new(bounds.x0, center.y),
    }
}

/// The node's valid anchor nearest to `target`.
///
/// Ties go to the earlier anchor in top, right, bottom, left order.
pub fn closest_anchor(node: &Node, target: Point) -> Anchor {
    node.kind
        .anchors()
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = (anchor_point(node, *a) - target).hypot2();
            let db = (anchor_point(node, *b) - target).hypot2();
            da.total_cmp(&db)
        })
        .unwrap_or(Anchor::Top)
}

/// Cubic curve between two points, offset along the dominant axis.
pub fn curve_path(from: Point, to: Point, params: CurveParams) -> CubicBez {
    let delta = to - from;
    let offset = if delta.x.abs() > delta.y.abs() {
        let amount = (delta.x.abs() * params.curvature).min(params.max_offset);
        Vec2::new(amount.copysign(delta.x), 0.0)
    } else {
        let amount = (delta.y.abs() * params.curvature).min(params.max_offset);
        Vec2::new(0.0, amount.copysign(delta.y))
    };
    CubicBez::new(from, from + offset, to - offset, to)
}

/// Curve of a connection between two node anchors.
pub fn connection_curve(
    from: &Node,
    from_anchor: Anchor,
    to: &Node,
    to_anchor: Anchor,
    params: CurveParams,
) -> CubicBez {
    curve_path(anchor_point(from, from_anchor), anchor_point(to, to_anchor), params)
}

/// Grab point of a connection's arrowhead, set back from the curve end
/// along its final tangent so it does not sit on the target anchor.
pub fn arrowhead_handle(curve: &CubicBez) -> Point {
    let mut tangent = curve.p3 - curve.p2;
    if tangent.hypot2() < 1e-12 {
        tangent = curve.p3 - curve.p0;
    }
    let length = tangent.hypot();
    if length < 1e-12 {
        return curve.p3;
    }
    let back = length.min(HEAD_HANDLE_OFFSET) / length;
    curve.p3 - tangent * back
}

/// Whether `point` lies within `tolerance` of the curve.
pub fn curve_hit(curve: &CubicBez, point: Point, tolerance: f64) -> bool {
    curve.nearest(point, NEAREST_ACCURACY).distance_sq <= tolerance * tolerance
}

/// Round a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, spacing: f64) -> Point {
    if spacing <= 0.0 {
        return point;
    }
    Point::new(
        (point.x / spacing).round() * spacing,
        (point.y / spacing).round() * spacing,
    )
}

/// Dot spacing for the background grid at the given zoom level.
///
/// The grid gets sparser when zoomed out so the dot count stays bounded.
pub fn grid_step(scale: f64, spacing: f64) -> f64 {
    if scale < 0.3 {
        spacing * 4.0
    } else if scale < 0.6 {
        spacing * 2.0
    } else {
        spacing
    }
}

/// Union of the bounding boxes of all nodes.
pub fn bounds_of<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Option<Rect> {
    let mut result: Option<Rect> = None;
    for node in nodes {
        let bounds = node.bounds();
        result = Some(match result {
            Some(r) => r.union(bounds),
            None => bounds,
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, NodeKind};
    use kurbo::ParamCurve;

    fn node(kind: NodeKind, x: f64, y: f64) -> Node {
        Node::new(NodeId::new("n-1"), kind, Point::new(x, y))
    }

    #[test]
    fn test_roundtrip_conversion() {
        let viewport = Viewport::new(1.5, Vec2::new(30.0, -20.0));
        let original = Point::new(123.0, 456.0);
        let back = to_canvas_point(to_screen_point(original, &viewport), &viewport);
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_anchor_points() {
        let n = node(NodeKind::Start, 100.0, 100.0);
        assert_eq!(anchor_point(&n, Anchor::Top), Point::new(160.0, 100.0));
        assert_eq!(anchor_point(&n, Anchor::Right), Point::new(220.0, 160.0));
        assert_eq!(anchor_point(&n, Anchor::Bottom), Point::new(160.0, 220.0));
        assert_eq!(anchor_point(&n, Anchor::Left), Point::new(100.0, 160.0));
    }

    #[test]
    fn test_closest_anchor() {
        let n = node(NodeKind::Assignment, 0.0, 0.0);
        assert_eq!(closest_anchor(&n, Point::new(60.0, 300.0)), Anchor::Bottom);
        assert_eq!(closest_anchor(&n, Point::new(-50.0, 60.0)), Anchor::Left);
        // Center is equidistant from all four anchors.
        assert_eq!(closest_anchor(&n, Point::new(60.0, 60.0)), Anchor::Top);
    }

    #[test]
    fn test_closest_anchor_respects_decision_set() {
        let n = node(NodeKind::Decision, 0.0, 0.0);
        let best = closest_anchor(&n, Point::new(54.0, 500.0));
        assert_ne!(best, Anchor::Bottom);
    }

    #[test]
    fn test_curve_horizontal_dominant() {
        let curve = curve_path(Point::new(0.0, 0.0), Point::new(200.0, 50.0), CurveParams::default());
        assert_eq!(curve.p1, Point::new(80.0, 0.0));
        assert_eq!(curve.p2, Point::new(120.0, 50.0));
    }

    #[test]
    fn test_curve_vertical_dominant_and_capped() {
        let curve = curve_path(Point::new(0.0, 1000.0), Point::new(10.0, 0.0), CurveParams::default());
        assert_eq!(curve.p1, Point::new(0.0, 850.0));
        assert_eq!(curve.p2, Point::new(10.0, 150.0));
    }

    #[test]
    fn test_curve_degenerate() {
        let p = Point::new(5.0, 5.0);
        let curve = curve_path(p, p, CurveParams::default());
        assert!((curve.eval(0.5) - p).hypot() < 1e-12);
    }

    #[test]
    fn test_arrowhead_handle_sits_behind_anchor() {
        let curve = curve_path(Point::new(0.0, 0.0), Point::new(200.0, 0.0), CurveParams::default());
        let handle = arrowhead_handle(&curve);
        assert!((handle.x - (200.0 - HEAD_HANDLE_OFFSET)).abs() < 1e-9);
        assert!(handle.y.abs() < 1e-9);

        let p = Point::new(3.0, 3.0);
        assert_eq!(arrowhead_handle(&curve_path(p, p, CurveParams::default())), p);
    }

    #[test]
    fn test_curve_hit() {
        let curve = curve_path(Point::new(0.0, 0.0), Point::new(200.0, 0.0), CurveParams::default());
        assert!(curve_hit(&curve, Point::new(100.0, 3.0), 5.0));
        assert!(!curve_hit(&curve, Point::new(100.0, 30.0), 5.0));
    }

    #[test]
    fn test_grid_helpers() {
        assert_eq!(snap_to_grid(Point::new(29.0, 11.0), 20.0), Point::new(20.0, 20.0));
        assert_eq!(grid_step(0.25, 20.0), 80.0);
        assert_eq!(grid_step(0.5, 20.0), 40.0);
        assert_eq!(grid_step(1.0, 20.0), 20.0);
    }

    #[test]
    fn test_bounds_of() {
        let nodes = [node(NodeKind::Start, 0.0, 0.0), node(NodeKind::End, 200.0, 100.0)];
        let bounds = bounds_of(&nodes).unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 320.0, 220.0));
        assert!(bounds_of(&Vec::<Node>::new()).is_none());
    }
}
