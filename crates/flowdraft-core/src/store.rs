//! The model store: single source of truth for the open diagram.

use crate::config::EditorConfig;
use crate::geometry::{self, CurveParams};
use crate::history::Snapshot;
use crate::hit::{self, Hit, HitTolerances};
use crate::model::{Anchor, Connection, ConnectionId, Diagram, Node, NodeId, NodeKind};
use crate::viewport::{BASE_SCALE, Viewport};
use kurbo::{CubicBez, Point, Size, Vec2};
use std::collections::HashSet;
use thiserror::Error;

/// Rejected model mutations. The store is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A node cannot be connected to itself ({0})")]
    SelfConnection(NodeId),
    #[error("Connection {from}.{from_anchor} -> {to}.{to_anchor} already exists")]
    DuplicateConnection {
        from: NodeId,
        from_anchor: Anchor,
        to: NodeId,
        to_anchor: Anchor,
    },
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),
    #[error("{kind} nodes have no {anchor} anchor")]
    InvalidAnchor { kind: NodeKind, anchor: Anchor },
    #[error("Diagram name cannot be empty")]
    EmptyName,
}

/// Current selection. Node and connection selection exclude each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Connection(ConnectionId),
}

impl Selection {
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Selection::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn connection(&self) -> Option<&ConnectionId> {
        match self {
            Selection::Connection(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

/// Change notifications, drained by views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    NodeAdded(NodeId),
    NodeMoved(NodeId),
    NodeContentChanged(NodeId),
    NodeRemoved(NodeId),
    ConnectionAdded(ConnectionId),
    ConnectionRemoved(ConnectionId),
    ConnectionRetargeted(ConnectionId),
    SelectionChanged,
    ViewportChanged,
    Renamed,
    /// Bulk replacement (load, undo, redo).
    Restored,
}

impl ModelEvent {
    /// Whether the change affects the persisted document.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, ModelEvent::SelectionChanged)
    }
}

/// In-memory state of the open diagram.
#[derive(Debug, Clone)]
pub struct DiagramStore {
    id: String,
    name: String,
    created_at: u64,
    updated_at: u64,
    revision: Option<u64>,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    selection: Selection,
    viewport: Viewport,
    viewport_size: Size,
    next_node: u64,
    next_connection: u64,
    config: EditorConfig,
    events: Vec<ModelEvent>,
    generation: u64,
}

impl DiagramStore {
    /// Start a new empty diagram.
    pub fn new(name: impl Into<String>, config: EditorConfig) -> Self {
        Self::from_document(Diagram::new(name), config)
    }

    /// Open a persisted document.
    ///
    /// Connections that break the model invariants are dropped with a
    /// warning. Id counters resume after the largest numeric suffix present.
    pub fn from_document(diagram: Diagram, config: EditorConfig) -> Self {
        let config = config.normalized();
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(diagram.nodes.len());
        for node in diagram.nodes {
            if seen.insert(node.id.clone()) {
                nodes.push(node);
            } else {
                log::warn!("Dropping duplicate node {}", node.id);
            }
        }

        let mut store = Self {
            id: diagram.id,
            name: diagram.name,
            created_at: diagram.created_at,
            updated_at: diagram.updated_at,
            revision: diagram.revision,
            nodes,
            connections: Vec::new(),
            selection: Selection::None,
            viewport: diagram.viewport,
            viewport_size: config.viewport_size(),
            next_node: 1,
            next_connection: 1,
            config,
            events: Vec::new(),
            generation: 0,
        };

        for conn in diagram.connections {
            if store.connections.iter().any(|c| c.id == conn.id) {
                log::warn!("Dropping connection with duplicate id {}", conn.id);
                continue;
            }
            match store.validate_route(None, &conn.from, conn.from_anchor, &conn.to, conn.to_anchor) {
                Ok(()) => store.connections.push(conn),
                Err(err) => log::warn!("Dropping connection {}: {}", conn.id, err),
            }
        }

        store.viewport.scale = store.config.zoom_limits().clamp(store.viewport.scale);
        store.next_node = store.nodes.iter().filter_map(|n| n.id.counter()).max().unwrap_or(0) + 1;
        store.next_connection = store
            .connections
            .iter()
            .filter_map(|c| c.id.counter())
            .max()
            .unwrap_or(0)
            + 1;

        log::info!(
            "Opened diagram {} ({} nodes, {} connections)",
            store.id,
            store.nodes.len(),
            store.connections.len()
        );
        store.events.push(ModelEvent::Restored);
        store
    }

    /// The persisted form of the current state.
    pub fn to_document(&self) -> Diagram {
        Diagram {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            viewport: self.viewport,
            revision: self.revision,
        }
    }

    /// Adopt the timestamps and revision assigned by a successful save.
    pub fn mark_saved(&mut self, saved: &Diagram) {
        self.updated_at = saved.updated_at;
        self.revision = saved.revision;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Nodes in render order (last is topmost).
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| &c.id == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn curve_params(&self) -> CurveParams {
        self.config.curve_params()
    }

    /// Counter bumped by every persistent mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Take the pending change notifications.
    pub fn drain_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: ModelEvent) {
        if event.is_persistent() {
            self.generation += 1;
        }
        self.events.push(event);
    }

    fn node_index(&self, id: &NodeId) -> Result<usize, ValidationError> {
        self.nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| ValidationError::UnknownNode(id.clone()))
    }

    fn connection_index(&self, id: &ConnectionId) -> Result<usize, ValidationError> {
        self.connections
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| ValidationError::UnknownConnection(id.clone()))
    }

    // --- Nodes ---

    /// Append a node of `kind` with its top-left at `position` (canvas).
    pub fn add_node(&mut self, kind: NodeKind, position: Point) -> NodeId {
        let id = NodeId::from_counter(self.next_node);
        self.next_node += 1;
        self.nodes.push(Node::new(id.clone(), kind, position));
        log::debug!("Added {kind} node {id} at ({}, {})", position.x, position.y);
        self.emit(ModelEvent::NodeAdded(id.clone()));
        id
    }

    /// Move a node's top-left corner. Does not create a history entry.
    pub fn move_node(&mut self, id: &NodeId, position: Point) -> Result<(), ValidationError> {
        let index = self.node_index(id)?;
        if self.nodes[index].position != position {
            self.nodes[index].position = position;
            self.emit(ModelEvent::NodeMoved(id.clone()));
        }
        Ok(())
    }

    /// Set the final text of a node. Empty or whitespace text reverts to
    /// the type's default. Returns whether the content changed.
    pub fn set_node_content(&mut self, id: &NodeId, text: &str) -> Result<bool, ValidationError> {
        let index = self.node_index(id)?;
        let content = if text.trim().is_empty() {
            self.nodes[index].kind.default_content()
        } else {
            text
        };
        self.replace_content(index, content)
    }

    /// Set the text of a node while it is being edited.
    pub fn set_node_content_live(&mut self, id: &NodeId, text: &str) -> Result<bool, ValidationError> {
        let index = self.node_index(id)?;
        self.replace_content(index, text)
    }

    fn replace_content(&mut self, index: usize, content: &str) -> Result<bool, ValidationError> {
        if self.nodes[index].content == content {
            return Ok(false);
        }
        self.nodes[index].content = content.to_string();
        let id = self.nodes[index].id.clone();
        self.emit(ModelEvent::NodeContentChanged(id));
        Ok(true)
    }

    /// Remove a node together with every connection touching it.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<Node, ValidationError> {
        let index = self.node_index(id)?;
        let node = self.nodes.remove(index);

        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.connections).into_iter().partition(|c| c.touches(id));
        self.connections = kept;

        let selection_stale = match &self.selection {
            Selection::Node(selected) => selected == id,
            Selection::Connection(selected) => removed.iter().any(|c| &c.id == selected),
            Selection::None => false,
        };

        for conn in removed {
            self.emit(ModelEvent::ConnectionRemoved(conn.id));
        }
        self.emit(ModelEvent::NodeRemoved(id.clone()));
        if selection_stale {
            self.selection = Selection::None;
            self.emit(ModelEvent::SelectionChanged);
        }
        log::debug!("Deleted node {id}");
        Ok(node)
    }

    // --- Connections ---

    /// Check a route against the connection invariants, ignoring `exclude`.
    pub fn validate_route(
        &self,
        exclude: Option<&ConnectionId>,
        from: &NodeId,
        from_anchor: Anchor,
        to: &NodeId,
        to_anchor: Anchor,
    ) -> Result<(), ValidationError> {
        let from_node = self.node(from).ok_or_else(|| ValidationError::UnknownNode(from.clone()))?;
        let to_node = self.node(to).ok_or_else(|| ValidationError::UnknownNode(to.clone()))?;
        if from == to {
            return Err(ValidationError::SelfConnection(from.clone()));
        }
        for (node, anchor) in [(from_node, from_anchor), (to_node, to_anchor)] {
            if !node.kind.accepts(anchor) {
                return Err(ValidationError::InvalidAnchor {
                    kind: node.kind,
                    anchor,
                });
            }
        }
        let duplicate = self
            .connections
            .iter()
            .filter(|c| Some(&c.id) != exclude)
            .any(|c| c.has_route(from, from_anchor, to, to_anchor));
        if duplicate {
            return Err(ValidationError::DuplicateConnection {
                from: from.clone(),
                from_anchor,
                to: to.clone(),
                to_anchor,
            });
        }
        Ok(())
    }

    pub fn add_connection(
        &mut self,
        from: &NodeId,
        from_anchor: Anchor,
        to: &NodeId,
        to_anchor: Anchor,
    ) -> Result<ConnectionId, ValidationError> {
        if let Err(err) = self.validate_route(None, from, from_anchor, to, to_anchor) {
            log::warn!("Rejected connection: {err}");
            return Err(err);
        }
        let id = ConnectionId::from_counter(self.next_connection);
        self.next_connection += 1;
        self.connections.push(Connection {
            id: id.clone(),
            from: from.clone(),
            from_anchor,
            to: to.clone(),
            to_anchor,
        });
        log::debug!("Connected {from}.{from_anchor} -> {to}.{to_anchor} as {id}");
        self.emit(ModelEvent::ConnectionAdded(id.clone()));
        Ok(id)
    }

    pub fn delete_connection(&mut self, id: &ConnectionId) -> Result<Connection, ValidationError> {
        let index = self.connection_index(id)?;
        let conn = self.connections.remove(index);
        self.emit(ModelEvent::ConnectionRemoved(id.clone()));
        if self.selection.connection() == Some(id) {
            self.selection = Selection::None;
            self.emit(ModelEvent::SelectionChanged);
        }
        log::debug!("Deleted connection {id}");
        Ok(conn)
    }

    /// Point a connection's head at another node anchor.
    ///
    /// Validated as if the connection were deleted and re-added. Returns
    /// false when the route is unchanged.
    pub fn retarget_connection(
        &mut self,
        id: &ConnectionId,
        to: &NodeId,
        to_anchor: Anchor,
    ) -> Result<bool, ValidationError> {
        let index = self.connection_index(id)?;
        let conn = &self.connections[index];
        if &conn.to == to && conn.to_anchor == to_anchor {
            return Ok(false);
        }
        let (from, from_anchor) = (conn.from.clone(), conn.from_anchor);
        if let Err(err) = self.validate_route(Some(id), &from, from_anchor, to, to_anchor) {
            log::warn!("Rejected retarget of {id}: {err}");
            return Err(err);
        }
        let conn = &mut self.connections[index];
        conn.to = to.clone();
        conn.to_anchor = to_anchor;
        log::debug!("Retargeted {id} to {to}.{to_anchor}");
        self.emit(ModelEvent::ConnectionRetargeted(id.clone()));
        Ok(true)
    }

    /// Curve of a connection from the live anchor points.
    pub fn connection_curve(&self, id: &ConnectionId) -> Option<CubicBez> {
        let conn = self.connection(id)?;
        hit::curve_for(&self.nodes, conn, self.curve_params())
    }

    // --- Selection ---

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), ValidationError> {
        match &selection {
            Selection::Node(id) => {
                self.node_index(id)?;
            }
            Selection::Connection(id) => {
                self.connection_index(id)?;
            }
            Selection::None => {}
        }
        if self.selection != selection {
            self.selection = selection;
            self.emit(ModelEvent::SelectionChanged);
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_none() {
            self.selection = Selection::None;
            self.emit(ModelEvent::SelectionChanged);
        }
    }

    // --- Viewport ---

    /// Replace the viewport transform; scale is clamped to the zoom limits.
    pub fn set_viewport(&mut self, scale: f64, translation: Vec2) {
        let next = Viewport::new(self.config.zoom_limits().clamp(scale), translation);
        if next != self.viewport {
            self.viewport = next;
            self.emit(ModelEvent::ViewportChanged);
        }
    }

    /// Zoom keeping the canvas point under `focal` (screen) fixed.
    pub fn zoom_at(&mut self, focal: Point, scale: f64) -> bool {
        let before = self.viewport;
        self.viewport.zoom_to(scale, focal, self.config.zoom_limits());
        let changed = before != self.viewport;
        if changed {
            self.emit(ModelEvent::ViewportChanged);
        }
        changed
    }

    /// Zoom by `steps` configured increments (negative zooms out).
    pub fn zoom_by_steps(&mut self, focal: Point, steps: f64) -> bool {
        let target = self.viewport.scale + steps * self.config.zoom_step;
        self.zoom_at(focal, target)
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan_to(self.viewport.translation + delta);
    }

    pub fn pan_to(&mut self, translation: Vec2) {
        if self.viewport.translation != translation {
            self.viewport.translation = translation;
            self.emit(ModelEvent::ViewportChanged);
        }
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = size;
    }

    /// Center of the visible area in screen space.
    pub fn canvas_center_screen(&self) -> Point {
        Point::new(self.viewport_size.width / 2.0, self.viewport_size.height / 2.0)
    }

    /// Back to 100%, anchored at the canvas center.
    pub fn reset_zoom(&mut self) -> bool {
        self.zoom_at(self.canvas_center_screen(), BASE_SCALE)
    }

    /// Center the content at the largest scale that fits within the
    /// viewport. An empty diagram resets to 100% at the origin.
    pub fn fit_to_content(&mut self) {
        let before = self.viewport;
        match geometry::bounds_of(&self.nodes) {
            Some(bounds) => self.viewport.fit(
                bounds,
                self.viewport_size,
                self.config.fit_padding,
                self.config.zoom_limits(),
            ),
            None => self.viewport = Viewport::default(),
        }
        if before != self.viewport {
            self.emit(ModelEvent::ViewportChanged);
        }
    }

    // --- Document ---

    pub fn rename(&mut self, name: &str) -> Result<(), ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.name != name {
            self.name = name.to_string();
            self.emit(ModelEvent::Renamed);
        }
        Ok(())
    }

    /// Deep copy of the undoable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            viewport: self.viewport,
        }
    }

    /// Replace nodes, connections and viewport from a snapshot.
    ///
    /// Clears the selection. Id counters are left untouched so ids are
    /// never reused.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.nodes = snapshot.nodes.clone();
        self.connections = snapshot.connections.clone();
        self.viewport = snapshot.viewport;
        self.selection = Selection::None;
        self.emit(ModelEvent::Restored);
        log::debug!(
            "Restored snapshot ({} nodes, {} connections)",
            self.nodes.len(),
            self.connections.len()
        );
    }

    // --- Hit testing ---

    fn tolerances(&self) -> HitTolerances {
        HitTolerances::for_scale(&self.config, self.viewport.scale)
    }

    /// Classify a screen point.
    pub fn hit_test(&self, screen: Point) -> Hit {
        let point = self.viewport.screen_to_canvas(screen);
        hit::hit_test(
            &self.nodes,
            &self.connections,
            point,
            self.tolerances(),
            self.curve_params(),
        )
    }

    /// Node under a screen point, counting its anchor handles as part of it.
    pub fn node_at_screen(&self, screen: Point) -> Option<NodeId> {
        let point = self.viewport.screen_to_canvas(screen);
        hit::anchor_at(&self.nodes, point, self.tolerances().anchor)
            .map(|(node, _)| node)
            .or_else(|| hit::node_body_at(&self.nodes, point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DiagramStore {
        DiagramStore::new("Test", EditorConfig::default())
    }

    fn two_nodes(store: &mut DiagramStore) -> (NodeId, NodeId) {
        let a = store.add_node(NodeKind::Start, Point::new(100.0, 100.0));
        let b = store.add_node(NodeKind::End, Point::new(300.0, 100.0));
        (a, b)
    }

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let mut store = store();
        let (a, b) = two_nodes(&mut store);
        assert_eq!(a.as_str(), "n-1");
        assert_eq!(b.as_str(), "n-2");

        store.delete_node(&b).unwrap();
        let c = store.add_node(NodeKind::Comment, Point::ZERO);
        assert_eq!(c.as_str(), "n-3");
    }

    #[test]
    fn test_connection_validation() {
        let mut store = store();
        let (a, b) = two_nodes(&mut store);
        let d = store.add_node(NodeKind::Decision, Point::new(0.0, 300.0));

        assert_eq!(
            store.add_connection(&a, Anchor::Top, &a, Anchor::Bottom),
            Err(ValidationError::SelfConnection(a.clone()))
        );
        assert!(matches!(
            store.add_connection(&a, Anchor::Right, &d, Anchor::Bottom),
            Err(ValidationError::InvalidAnchor { .. })
        ));
        assert!(matches!(
            store.add_connection(&a, Anchor::Right, &NodeId::new("n-99"), Anchor::Left),
            Err(ValidationError::UnknownNode(_))
        ));

        let id = store.add_connection(&a, Anchor::Right, &b, Anchor::Left).unwrap();
        assert_eq!(id.as_str(), "c-1");
        assert!(matches!(
            store.add_connection(&a, Anchor::Right, &b, Anchor::Left),
            Err(ValidationError::DuplicateConnection { .. })
        ));
        // Reverse direction is a different route.
        assert!(store.add_connection(&b, Anchor::Left, &a, Anchor::Right).is_ok());
        assert_eq!(store.connections().len(), 2);
    }

    #[test]
    fn test_delete_node_cascades_and_clears_selection() {
        let mut store = store();
        let (a, b) = two_nodes(&mut store);
        let conn = store.add_connection(&a, Anchor::Right, &b, Anchor::Left).unwrap();
        store.set_selection(Selection::Connection(conn.clone())).unwrap();
        store.drain_events();

        store.delete_node(&a).unwrap();
        assert!(store.connections().is_empty());
        assert_eq!(store.nodes().len(), 1);
        assert!(store.selection().is_none());

        let events = store.drain_events();
        assert!(events.contains(&ModelEvent::ConnectionRemoved(conn)));
        assert!(events.contains(&ModelEvent::NodeRemoved(a)));
        assert!(events.contains(&ModelEvent::SelectionChanged));
    }

    #[test]
    fn test_content_defaults_on_empty() {
        let mut store = store();
        let id = store.add_node(NodeKind::Decision, Point::ZERO);
        assert_eq!(store.node(&id).unwrap().content, "Condition?");

        assert!(store.set_node_content(&id, "x > 3").unwrap());
        assert!(store.set_node_content(&id, "   ").unwrap());
        assert_eq!(store.node(&id).unwrap().content, "Condition?");
        assert!(!store.set_node_content(&id, "").unwrap());

        store.set_node_content_live(&id, "").unwrap();
        assert_eq!(store.node(&id).unwrap().content, "");
    }

    #[test]
    fn test_retarget() {
        let mut store = store();
        let (a, b) = two_nodes(&mut store);
        let c = store.add_node(NodeKind::Assignment, Point::new(300.0, 300.0));
        let first = store.add_connection(&a, Anchor::Right, &b, Anchor::Left).unwrap();
        let second = store.add_connection(&a, Anchor::Right, &c, Anchor::Top).unwrap();

        assert_eq!(store.retarget_connection(&first, &b, Anchor::Left), Ok(false));
        assert!(matches!(
            store.retarget_connection(&first, &c, Anchor::Top),
            Err(ValidationError::DuplicateConnection { .. })
        ));
        assert!(matches!(
            store.retarget_connection(&second, &a, Anchor::Top),
            Err(ValidationError::SelfConnection(_))
        ));
        assert_eq!(store.retarget_connection(&first, &c, Anchor::Left), Ok(true));
        let conn = store.connection(&first).unwrap();
        assert_eq!((&conn.to, conn.to_anchor), (&c, Anchor::Left));
    }

    #[test]
    fn test_selection_is_exclusive_and_checked() {
        let mut store = store();
        let (a, b) = two_nodes(&mut store);
        let conn = store.add_connection(&a, Anchor::Right, &b, Anchor::Left).unwrap();

        store.set_selection(Selection::Node(a.clone())).unwrap();
        store.set_selection(Selection::Connection(conn.clone())).unwrap();
        assert_eq!(store.selection().node(), None);
        assert_eq!(store.selection().connection(), Some(&conn));

        assert!(store.set_selection(Selection::Node(NodeId::new("n-42"))).is_err());
        assert_eq!(store.selection().connection(), Some(&conn));
    }

    #[test]
    fn test_viewport_clamp_and_generation() {
        let mut store = store();
        let before = store.generation();
        store.set_viewport(10.0, Vec2::new(5.0, 5.0));
        assert_eq!(store.viewport().scale, 2.5);
        assert!(store.generation() > before);

        let before = store.generation();
        store.set_selection(Selection::None).unwrap();
        store.clear_selection();
        assert_eq!(store.generation(), before);
    }

    #[test]
    fn test_inverted_zoom_config_is_repaired() {
        let config = EditorConfig {
            min_zoom: 3.0,
            max_zoom: 0.25,
            ..EditorConfig::default()
        };
        let mut store = DiagramStore::new("Odd", config);
        store.set_viewport(10.0, Vec2::ZERO);
        assert_eq!(store.viewport().scale, 3.0);
        store.set_viewport(0.01, Vec2::ZERO);
        assert_eq!(store.viewport().scale, 0.25);
    }

    #[test]
    fn test_fit_to_content_empty_resets() {
        let mut store = store();
        store.set_viewport(2.0, Vec2::new(40.0, 40.0));
        store.fit_to_content();
        assert_eq!(*store.viewport(), Viewport::default());
    }

    #[test]
    fn test_from_document_sanitizes_and_resumes_counters() {
        let mut diagram = Diagram::new("Loaded");
        diagram.nodes = vec![
            Node::new(NodeId::new("n-4"), NodeKind::Start, Point::ZERO),
            Node::new(NodeId::new("n-9"), NodeKind::End, Point::new(200.0, 0.0)),
        ];
        let route = |id: &str, from: &str, to: &str| Connection {
            id: ConnectionId::new(id),
            from: NodeId::new(from),
            from_anchor: Anchor::Right,
            to: NodeId::new(to),
            to_anchor: Anchor::Left,
        };
        diagram.connections = vec![
            route("c-2", "n-4", "n-9"),
            route("c-3", "n-4", "n-9"),
            route("c-7", "n-4", "n-404"),
            route("c-8", "n-9", "n-9"),
        ];
        diagram.viewport = Viewport::new(9.0, Vec2::ZERO);

        let mut store = DiagramStore::from_document(diagram, EditorConfig::default());
        assert_eq!(store.connections().len(), 1);
        assert_eq!(store.viewport().scale, 2.5);
        assert_eq!(store.drain_events(), vec![ModelEvent::Restored]);

        assert_eq!(store.add_node(NodeKind::Comment, Point::ZERO).as_str(), "n-10");
        let a = NodeId::new("n-9");
        let b = NodeId::new("n-4");
        assert_eq!(
            store.add_connection(&a, Anchor::Right, &b, Anchor::Left).unwrap().as_str(),
            "c-3"
        );
    }

    #[test]
    fn test_restore_clears_selection() {
        let mut store = store();
        let (a, _) = two_nodes(&mut store);
        let snapshot = store.snapshot();
        store.move_node(&a, Point::new(500.0, 500.0)).unwrap();
        store.set_selection(Selection::Node(a.clone())).unwrap();

        store.restore(&snapshot);
        assert_eq!(store.node(&a).unwrap().position, Point::new(100.0, 100.0));
        assert!(store.selection().is_none());
        assert_eq!(store.drain_events().last(), Some(&ModelEvent::Restored));
    }

    #[test]
    fn test_rename() {
        let mut store = store();
        assert_eq!(store.rename("  "), Err(ValidationError::EmptyName));
        store.rename("  Payroll  ").unwrap();
        assert_eq!(store.name(), "Payroll");
    }

    #[test]
    fn test_hit_test_through_viewport() {
        let mut store = store();
        let (a, _) = two_nodes(&mut store);
        store.set_viewport(2.0, Vec2::new(10.0, 10.0));
        // Canvas (150, 150) -> screen (310, 310).
        assert_eq!(store.hit_test(Point::new(310.0, 310.0)), Hit::NodeBody(a.clone()));
        // Top anchor at canvas (160, 100) -> screen (330, 210).
        assert_eq!(store.node_at_screen(Point::new(332.0, 206.0)), Some(a));
        assert_eq!(store.hit_test(Point::new(5.0, 5.0)), Hit::Empty);
    }
}
