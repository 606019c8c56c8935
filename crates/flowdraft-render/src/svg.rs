//! Retained SVG scene.
//!
//! Each node and connection is kept as a pre-rendered fragment keyed by id.
//! Model events mark fragments stale; only those are rebuilt on `sync`.

use crate::renderer::{GridStyle, RenderResult, RenderStats, Renderer, RendererError};
use crate::style::{Theme, css};
use flowdraft_core::geometry::{self, CurveParams};
use flowdraft_core::{
    ConnectionId, DiagramStore, ModelEvent, Node, NodeId, NodeKind, Overlay, Selection, Viewport,
};
use kurbo::{BezPath, Point, Rect, RoundedRect, Shape, Size};
use std::collections::{HashMap, HashSet};
use std::io::Write;

const PATH_TOLERANCE: f64 = 0.1;
const LINE_HEIGHT: f64 = 1.2;

/// SVG renderer with targeted rebuilds.
#[derive(Debug, Default)]
pub struct SvgRenderer {
    theme: Theme,
    grid_style: GridStyle,
    synced: bool,
    title: String,
    viewport: Viewport,
    viewport_size: Size,
    grid_spacing: f64,
    grid_step: f64,
    curve_params: CurveParams,
    selection: Selection,
    node_order: Vec<NodeId>,
    connection_order: Vec<ConnectionId>,
    nodes: HashMap<NodeId, String>,
    node_bounds: HashMap<NodeId, Rect>,
    connections: HashMap<ConnectionId, String>,
    overlay: String,
    stats: RenderStats,
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    pub fn grid_style(&self) -> GridStyle {
        self.grid_style
    }

    /// Grid spacing currently drawn, in canvas units.
    pub fn grid_step(&self) -> f64 {
        self.grid_step
    }

    /// Rendered fragment for a node.
    pub fn node_fragment(&self, id: &NodeId) -> Option<&str> {
        self.nodes.get(id).map(String::as_str)
    }

    pub fn connection_fragment(&self, id: &ConnectionId) -> Option<&str> {
        self.connections.get(id).map(String::as_str)
    }

    /// Complete SVG document of the current scene.
    pub fn to_svg(&self) -> RenderResult<String> {
        if !self.synced {
            return Err(RendererError::NotSynced);
        }
        let (width, height) = (num(self.viewport_size.width), num(self.viewport_size.height));
        let mut out = String::new();
        out.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
        ));
        out.push_str(&format!("<title>{}</title>\n", escape(&self.title)));
        out.push_str(&self.defs());
        out.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n",
            css(self.theme.background)
        ));

        let [a, b, c, d, e, f] = self.viewport.transform().as_coeffs();
        out.push_str(&format!(
            "<g class=\"canvas\" transform=\"matrix({} {} {} {} {} {})\">\n",
            num(a),
            num(b),
            num(c),
            num(d),
            num(e),
            num(f)
        ));
        out.push_str(&self.grid());

        out.push_str("<g class=\"connections\">\n");
        for id in &self.connection_order {
            if let Some(fragment) = self.connections.get(id) {
                out.push_str(fragment);
            }
        }
        out.push_str("</g>\n<g class=\"nodes\">\n");
        for id in &self.node_order {
            if let Some(fragment) = self.nodes.get(id) {
                out.push_str(fragment);
            }
        }
        out.push_str("</g>\n<g class=\"overlay\">\n");
        out.push_str(&self.overlay);
        out.push_str("</g>\n</g>\n</svg>\n");
        Ok(out)
    }

    /// Write the SVG document to `out`.
    pub fn write_svg<W: Write>(&self, mut out: W) -> RenderResult<()> {
        out.write_all(self.to_svg()?.as_bytes())?;
        Ok(())
    }

    fn defs(&self) -> String {
        let mut defs = String::from("<defs>\n");
        defs.push_str(&format!(
            "<marker id=\"arrowhead\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"8\" markerHeight=\"8\" orient=\"auto-start-reverse\"><path d=\"M0 0L10 5L0 10z\" fill=\"{}\"/></marker>\n",
            css(self.theme.connection)
        ));
        defs.push_str(&format!(
            "<marker id=\"arrowhead-selected\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"8\" markerHeight=\"8\" orient=\"auto-start-reverse\"><path d=\"M0 0L10 5L0 10z\" fill=\"{}\"/></marker>\n",
            css(self.theme.selection)
        ));
        let step = num(self.grid_step);
        match self.grid_style {
            GridStyle::None => {}
            GridStyle::Dots => defs.push_str(&format!(
                "<pattern id=\"grid\" width=\"{step}\" height=\"{step}\" patternUnits=\"userSpaceOnUse\"><circle cx=\"0\" cy=\"0\" r=\"1.5\" fill=\"{}\"/></pattern>\n",
                css(self.theme.grid)
            )),
            GridStyle::Lines => defs.push_str(&format!(
                "<pattern id=\"grid\" width=\"{step}\" height=\"{step}\" patternUnits=\"userSpaceOnUse\"><path d=\"M{step} 0L0 0L0 {step}\" fill=\"none\" stroke=\"{}\" stroke-width=\"0.5\"/></pattern>\n",
                css(self.theme.grid)
            )),
        }
        defs.push_str("</defs>\n");
        defs
    }

    /// Background rect covering the visible canvas area, snapped outward to the grid.
    fn grid(&self) -> String {
        if self.grid_style == GridStyle::None || self.grid_step <= 0.0 {
            return String::new();
        }
        let visible = self
            .viewport
            .transform()
            .inverse()
            .transform_rect_bbox(Rect::from_origin_size(Point::ZERO, self.viewport_size));
        let step = self.grid_step;
        let x0 = (visible.x0 / step).floor() * step;
        let y0 = (visible.y0 / step).floor() * step;
        let x1 = (visible.x1 / step).ceil() * step;
        let y1 = (visible.y1 / step).ceil() * step;
        format!(
            "<rect class=\"grid\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"url(#grid)\"/>\n",
            num(x0),
            num(y0),
            num(x1 - x0),
            num(y1 - y0)
        )
    }

    // --- Sync ---

    fn full_rebuild(&mut self, store: &DiagramStore) {
        self.nodes.clear();
        self.node_bounds.clear();
        self.connections.clear();
        for node in store.nodes() {
            self.render_node(store, &node.id);
        }
        for conn in store.connections() {
            self.render_connection(store, &conn.id);
        }
        self.stats.full_rebuilds += 1;
        log::debug!(
            "Full scene rebuild: {} nodes, {} connections",
            store.nodes().len(),
            store.connections().len()
        );
    }

    fn render_node(&mut self, store: &DiagramStore, id: &NodeId) {
        match store.node(id) {
            Some(node) => {
                let selected = store.selection().node() == Some(id);
                self.nodes.insert(id.clone(), node_svg(node, selected, &self.theme));
                self.node_bounds.insert(id.clone(), node.bounds());
                self.stats.node_renders += 1;
            }
            None => {
                self.nodes.remove(id);
                self.node_bounds.remove(id);
            }
        }
    }

    fn render_connection(&mut self, store: &DiagramStore, id: &ConnectionId) {
        match store.connection_curve(id) {
            Some(curve) => {
                let selected = store.selection().connection() == Some(id);
                let (stroke, width, marker) = if selected {
                    (self.theme.selection, self.theme.selected_stroke_width, "arrowhead-selected")
                } else {
                    (self.theme.connection, self.theme.stroke_width, "arrowhead")
                };
                let fragment = format!(
                    "<path class=\"connection\" data-id=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#{marker})\"/>\n",
                    escape(id.as_str()),
                    curve.to_path(PATH_TOLERANCE).to_svg(),
                    css(stroke),
                    num(width)
                );
                self.connections.insert(id.clone(), fragment);
                self.stats.connection_renders += 1;
            }
            None => {
                self.connections.remove(id);
            }
        }
    }

    fn mark_selection(&self, selection: &Selection, nodes: &mut HashSet<NodeId>, conns: &mut HashSet<ConnectionId>) {
        match selection {
            Selection::None => {}
            Selection::Node(id) => {
                nodes.insert(id.clone());
            }
            Selection::Connection(id) => {
                conns.insert(id.clone());
            }
        }
    }
}

impl Renderer for SvgRenderer {
    fn sync(&mut self, store: &DiagramStore, events: &[ModelEvent]) {
        let step = geometry::grid_step(store.viewport().scale, store.config().grid_spacing);
        let full = !self.synced
            || step != self.grid_step
            || store.config().grid_spacing != self.grid_spacing
            || events.contains(&ModelEvent::Restored);

        self.title = store.name().to_string();
        self.viewport = *store.viewport();
        self.viewport_size = store.viewport_size();
        self.grid_spacing = store.config().grid_spacing;
        self.grid_step = step;
        self.curve_params = store.curve_params();
        self.node_order = store.nodes().iter().map(|n| n.id.clone()).collect();
        self.connection_order = store.connections().iter().map(|c| c.id.clone()).collect();

        if full {
            self.full_rebuild(store);
            self.selection = store.selection().clone();
            self.synced = true;
            return;
        }

        let mut stale_nodes = HashSet::new();
        let mut stale_conns = HashSet::new();
        for event in events {
            match event {
                ModelEvent::NodeMoved(id) => {
                    stale_nodes.insert(id.clone());
                    // Curves follow the live anchor points.
                    stale_conns.extend(store.connections().iter().filter(|c| c.touches(id)).map(|c| c.id.clone()));
                }
                ModelEvent::NodeAdded(id) | ModelEvent::NodeContentChanged(id) | ModelEvent::NodeRemoved(id) => {
                    stale_nodes.insert(id.clone());
                }
                ModelEvent::ConnectionAdded(id)
                | ModelEvent::ConnectionRemoved(id)
                | ModelEvent::ConnectionRetargeted(id) => {
                    stale_conns.insert(id.clone());
                }
                ModelEvent::SelectionChanged => {
                    let previous = std::mem::replace(&mut self.selection, store.selection().clone());
                    self.mark_selection(&previous, &mut stale_nodes, &mut stale_conns);
                    self.mark_selection(store.selection(), &mut stale_nodes, &mut stale_conns);
                }
                ModelEvent::ViewportChanged | ModelEvent::Renamed | ModelEvent::Restored => {}
            }
        }
        // Deletion can clear the selection without a separate notification.
        if &self.selection != store.selection() {
            let previous = std::mem::replace(&mut self.selection, store.selection().clone());
            self.mark_selection(&previous, &mut stale_nodes, &mut stale_conns);
        }

        for id in &stale_nodes {
            self.render_node(store, id);
        }
        for id in &stale_conns {
            self.render_connection(store, id);
        }
    }

    fn set_overlay(&mut self, overlay: &Overlay) {
        let mut out = String::new();
        if let Some(id) = &overlay.hover {
            if let Some(bounds) = self.node_bounds.get(id) {
                let rect = bounds.inflate(4.0, 4.0);
                out.push_str(&format!(
                    "<rect class=\"hover\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"6\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\" stroke-dasharray=\"4 3\"/>\n",
                    num(rect.x0),
                    num(rect.y0),
                    num(rect.width()),
                    num(rect.height()),
                    css(self.theme.hover)
                ));
            }
        }
        if let Some(preview) = overlay.preview {
            let curve = geometry::curve_path(preview.from, preview.to, self.curve_params);
            out.push_str(&format!(
                "<path class=\"preview\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\" stroke-dasharray=\"6 4\" marker-end=\"url(#arrowhead)\"/>\n",
                curve.to_path(PATH_TOLERANCE).to_svg(),
                css(self.theme.preview)
            ));
        }
        self.overlay = out;
    }

    fn stats(&self) -> RenderStats {
        self.stats
    }
}

fn node_outline(node: &Node) -> BezPath {
    let bounds = node.bounds();
    match node.kind {
        NodeKind::Start | NodeKind::End => {
            RoundedRect::from_rect(bounds, bounds.height().min(bounds.width()) / 4.0).to_path(PATH_TOLERANCE)
        }
        NodeKind::Decision => {
            let center = bounds.center();
            let mut path = BezPath::new();
            path.move_to(Point::new(center.x, bounds.y0));
            path.line_to(Point::new(bounds.x1, center.y));
            path.line_to(Point::new(center.x, bounds.y1));
            path.line_to(Point::new(bounds.x0, center.y));
            path.close_path();
            path
        }
        NodeKind::Assignment | NodeKind::Comment => bounds.to_path(PATH_TOLERANCE),
    }
}

fn node_svg(node: &Node, selected: bool, theme: &Theme) -> String {
    let (stroke, width) = if selected {
        (theme.selection, theme.selected_stroke_width)
    } else {
        (theme.node_stroke, theme.stroke_width)
    };
    let dash = if node.kind == NodeKind::Comment { " stroke-dasharray=\"5 3\"" } else { "" };

    let mut out = format!(
        "<g class=\"node node-{}{}\" data-id=\"{}\">\n",
        node.kind,
        if selected { " selected" } else { "" },
        escape(node.id.as_str())
    );
    out.push_str(&format!(
        "<path d=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"{dash}/>\n",
        node_outline(node).to_svg(),
        css(theme.node_fill(node.kind)),
        css(stroke),
        num(width)
    ));
    out.push_str(&text_svg(node, theme));
    for &anchor in node.kind.anchors() {
        let p = geometry::anchor_point(node, anchor);
        out.push_str(&format!(
            "<circle class=\"anchor anchor-{anchor}\" cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\"/>\n",
            num(p.x),
            num(p.y),
            num(theme.anchor_radius),
            css(theme.anchor)
        ));
    }
    out.push_str("</g>\n");
    out
}

fn text_svg(node: &Node, theme: &Theme) -> String {
    let center = node.bounds().center();
    let lines: Vec<&str> = node.content.lines().collect();
    let first_dy = -((lines.len().max(1) - 1) as f64) * LINE_HEIGHT / 2.0;
    let mut out = format!(
        "<text x=\"{}\" y=\"{}\" font-size=\"{}\" text-anchor=\"middle\" dominant-baseline=\"middle\" fill=\"{}\">",
        num(center.x),
        num(center.y),
        num(theme.font_size),
        css(theme.text)
    );
    for (i, line) in lines.iter().enumerate() {
        let dy = if i == 0 { first_dy } else { LINE_HEIGHT };
        out.push_str(&format!(
            "<tspan x=\"{}\" dy=\"{}em\">{}</tspan>",
            num(center.x),
            num(dy),
            escape(line)
        ));
    }
    out.push_str("</text>\n");
    out
}

/// Escape text for use in SVG content and attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Two-decimal number without trailing zeros.
fn num(value: f64) -> String {
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        _ => text.to_string(),
    }
}
