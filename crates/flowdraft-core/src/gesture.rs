//! Interaction state machine.
//!
//! [`GestureController::handle`] is the single reducer that turns
//! [`GestureEvent`]s into model mutations, history commits and
//! [`GestureEffect`]s for the host.

use crate::geometry;
use crate::history::History;
use crate::hit::Hit;
use crate::input::{ClickTracker, GestureEvent, Key, Modifiers, PointerButton};
use crate::model::{Anchor, ConnectionId, NodeId, NodeKind};
use crate::shortcuts::{EditorCommand, ShortcutRegistry};
use crate::store::{DiagramStore, Selection, ValidationError};
use kurbo::{Point, Vec2};

/// Interaction states.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    DraggingNode {
        node: NodeId,
        /// Pointer minus node origin, in canvas space.
        grab_offset: Vec2,
        /// Position before the drag, for rollback.
        origin: Point,
        press: Point,
        moved: bool,
    },
    Panning {
        /// Pointer minus translation at press time.
        anchor: Vec2,
    },
    ConnectingFromAnchor {
        node: NodeId,
        anchor: Anchor,
        press: Point,
        dragged: bool,
    },
    DraggingConnectionHead {
        connection: ConnectionId,
        press: Point,
        moved: bool,
    },
    EditingText {
        node: NodeId,
        /// Content when editing began.
        original: String,
    },
}

/// Dashed curve shown while connecting or dragging an arrowhead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewCurve {
    /// Canvas space.
    pub from: Point,
    /// Canvas space.
    pub to: Point,
}

/// Transient visuals that are not part of the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub preview: Option<PreviewCurve>,
    /// Node highlighted as a drop target.
    pub hover: Option<NodeId>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.preview.is_none() && self.hover.is_none()
    }
}

/// Side effects for the host to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEffect {
    /// A mutation was rejected; show a transient warning.
    Warning(ValidationError),
    SaveRequested,
    BeginTextEdit(NodeId),
    EndTextEdit(NodeId),
    /// Undo or redo replaced the model.
    HistoryRestored,
    /// The overlay changed.
    Redraw,
}

/// Drives the interaction state machine.
#[derive(Debug, Default)]
pub struct GestureController {
    state: GestureState,
    overlay: Overlay,
    clicks: ClickTracker,
}

fn commit(store: &DiagramStore, history: &mut History) {
    history.commit(store.snapshot());
}

/// Whether a dragged node ended somewhere other than where it started.
fn left_origin(store: &DiagramStore, node: &NodeId, origin: Point) -> bool {
    store.node(node).is_some_and(|n| n.position != origin)
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Node whose text is being edited.
    pub fn editing(&self) -> Option<&NodeId> {
        match &self.state {
            GestureState::EditingText { node, .. } => Some(node),
            _ => None,
        }
    }

    /// Process one input event.
    pub fn handle(
        &mut self,
        event: GestureEvent,
        store: &mut DiagramStore,
        history: &mut History,
    ) -> Vec<GestureEffect> {
        let mut effects = Vec::new();
        match event {
            GestureEvent::PointerDown {
                position,
                button,
                modifiers,
            } => self.pointer_down(position, button, modifiers, store, history, &mut effects),
            GestureEvent::PointerMove { position } => self.pointer_move(position, store, &mut effects),
            GestureEvent::PointerUp { position } => self.pointer_up(position, store, history, &mut effects),
            GestureEvent::PointerCancel => self.pointer_cancel(store, history, &mut effects),
            GestureEvent::Wheel { position, delta_y } => {
                if delta_y != 0.0 {
                    let steps = if delta_y < 0.0 { 1.0 } else { -1.0 };
                    store.zoom_by_steps(position, steps);
                }
            }
            GestureEvent::Key { key, modifiers } => self.key(key, modifiers, store, history, &mut effects),
            GestureEvent::TextInput { text } => {
                if let GestureState::EditingText { node, .. } = &self.state {
                    if store.set_node_content_live(node, &text).is_err() {
                        self.state = GestureState::Idle;
                    }
                }
            }
            GestureEvent::TextCommit => self.finish_edit(store, history, &mut effects),
            GestureEvent::CreateNode { node_type, position } => {
                self.settle(store, history, &mut effects);
                self.create_node(node_type, position, store, history);
            }
            GestureEvent::ZoomIn => {
                store.zoom_by_steps(store.canvas_center_screen(), 1.0);
            }
            GestureEvent::ZoomOut => {
                store.zoom_by_steps(store.canvas_center_screen(), -1.0);
            }
            GestureEvent::ResetZoom => {
                store.reset_zoom();
            }
            GestureEvent::FitToView => store.fit_to_content(),
            GestureEvent::SetViewportSize { size } => store.set_viewport_size(size),
        }
        effects
    }

    fn set_overlay(&mut self, overlay: Overlay, effects: &mut Vec<GestureEffect>) {
        if self.overlay != overlay {
            self.overlay = overlay;
            effects.push(GestureEffect::Redraw);
        }
    }

    fn to_idle(&mut self, effects: &mut Vec<GestureEffect>) {
        if self.state != GestureState::Idle {
            log::debug!("Gesture -> Idle");
        }
        self.state = GestureState::Idle;
        self.set_overlay(Overlay::default(), effects);
    }

    // --- Pointer ---

    fn pointer_down(
        &mut self,
        position: Point,
        button: PointerButton,
        modifiers: Modifiers,
        store: &mut DiagramStore,
        history: &mut History,
        effects: &mut Vec<GestureEffect>,
    ) {
        // A press outside the text field ends editing, then is handled normally.
        self.finish_edit(store, history, effects);

        let pan = button == PointerButton::Middle || (button == PointerButton::Left && modifiers.shift);
        if button == PointerButton::Right {
            return;
        }

        if let GestureState::ConnectingFromAnchor { node, anchor, .. } = &self.state {
            let (origin, origin_anchor) = (node.clone(), *anchor);
            match self.drop_target(position, store) {
                Some((target, target_anchor)) if !pan => {
                    self.connect(&origin, origin_anchor, &target, target_anchor, store, history, effects);
                }
                _ => {
                    log::debug!("Connect from {origin}.{origin_anchor} cancelled");
                    self.to_idle(effects);
                }
            }
            return;
        }

        // A press without a release (lost events) settles the old gesture.
        if !self.is_idle() {
            self.pointer_cancel(store, history, effects);
        }

        if pan {
            self.begin_pan(position, store);
            return;
        }

        let double_click = self.clicks.register(position);
        match store.hit_test(position) {
            Hit::Anchor { node, anchor } => {
                let from = store.node(&node).map(|n| geometry::anchor_point(n, anchor));
                log::debug!("Gesture -> ConnectingFromAnchor({node}.{anchor})");
                self.state = GestureState::ConnectingFromAnchor {
                    node,
                    anchor,
                    press: position,
                    dragged: false,
                };
                if let Some(from) = from {
                    let to = store.viewport().screen_to_canvas(position);
                    self.set_overlay(
                        Overlay {
                            preview: Some(PreviewCurve { from, to }),
                            hover: None,
                        },
                        effects,
                    );
                }
            }
            Hit::ConnectionHead(connection) => {
                let _ = store.set_selection(Selection::Connection(connection.clone()));
                log::debug!("Gesture -> DraggingConnectionHead({connection})");
                self.state = GestureState::DraggingConnectionHead {
                    connection,
                    press: position,
                    moved: false,
                };
            }
            Hit::NodeBody(node) => {
                let _ = store.set_selection(Selection::Node(node.clone()));
                let Some(current) = store.node(&node) else {
                    return;
                };
                if double_click {
                    log::debug!("Gesture -> EditingText({node})");
                    self.state = GestureState::EditingText {
                        node: node.clone(),
                        original: current.content.clone(),
                    };
                    effects.push(GestureEffect::BeginTextEdit(node));
                    return;
                }
                let canvas = store.viewport().screen_to_canvas(position);
                log::debug!("Gesture -> DraggingNode({node})");
                self.state = GestureState::DraggingNode {
                    grab_offset: canvas - current.position,
                    origin: current.position,
                    node,
                    press: position,
                    moved: false,
                };
            }
            Hit::Connection(connection) => {
                let _ = store.set_selection(Selection::Connection(connection));
            }
            Hit::Empty => {
                store.clear_selection();
                self.begin_pan(position, store);
            }
        }
    }

    fn begin_pan(&mut self, position: Point, store: &DiagramStore) {
        log::debug!("Gesture -> Panning");
        self.state = GestureState::Panning {
            anchor: position.to_vec2() - store.viewport().translation,
        };
    }

    fn pointer_move(&mut self, position: Point, store: &mut DiagramStore, effects: &mut Vec<GestureEffect>) {
        let threshold = store.config().drag_threshold;
        let canvas = store.viewport().screen_to_canvas(position);
        match &mut self.state {
            GestureState::Idle | GestureState::EditingText { .. } => {}
            GestureState::DraggingNode {
                node,
                grab_offset,
                press,
                moved,
                ..
            } => {
                if !*moved && (position - *press).hypot() < threshold {
                    return;
                }
                *moved = true;
                let node = node.clone();
                let mut target = canvas - *grab_offset;
                if store.config().snap_to_grid {
                    target = geometry::snap_to_grid(target, store.config().grid_spacing);
                }
                if store.move_node(&node, target).is_err() {
                    self.to_idle(effects);
                }
            }
            GestureState::Panning { anchor } => {
                store.pan_to(position.to_vec2() - *anchor);
            }
            GestureState::ConnectingFromAnchor {
                node,
                anchor,
                press,
                dragged,
            } => {
                if (position - *press).hypot() >= threshold {
                    *dragged = true;
                }
                let origin = node.clone();
                let from = store.node(&origin).map(|n| geometry::anchor_point(n, *anchor));
                let hover = store.node_at_screen(position).filter(|n| n != &origin);
                let overlay = Overlay {
                    preview: from.map(|from| PreviewCurve { from, to: canvas }),
                    hover,
                };
                self.set_overlay(overlay, effects);
            }
            GestureState::DraggingConnectionHead {
                connection,
                press,
                moved,
            } => {
                if !*moved && (position - *press).hypot() < threshold {
                    return;
                }
                *moved = true;
                let Some(conn) = store.connection(connection).cloned() else {
                    self.to_idle(effects);
                    return;
                };
                let from = store.node(&conn.from).map(|n| geometry::anchor_point(n, conn.from_anchor));
                let hover = store.node_at_screen(position).filter(|n| n != &conn.from);
                let overlay = Overlay {
                    preview: from.map(|from| PreviewCurve { from, to: canvas }),
                    hover,
                };
                self.set_overlay(overlay, effects);
            }
        }
    }

    fn pointer_up(
        &mut self,
        position: Point,
        store: &mut DiagramStore,
        history: &mut History,
        effects: &mut Vec<GestureEffect>,
    ) {
        match std::mem::take(&mut self.state) {
            GestureState::Idle => {}
            state @ GestureState::EditingText { .. } => self.state = state,
            GestureState::DraggingNode { node, origin, moved, .. } => {
                if moved && left_origin(store, &node, origin) {
                    log::debug!("Drag of {node} committed");
                    commit(store, history);
                }
                self.to_idle(effects);
            }
            GestureState::Panning { .. } => self.to_idle(effects),
            GestureState::ConnectingFromAnchor {
                node,
                anchor,
                press,
                dragged,
            } => {
                if !dragged {
                    // Click-click connect: wait for the second press.
                    self.state = GestureState::ConnectingFromAnchor {
                        node,
                        anchor,
                        press,
                        dragged,
                    };
                    return;
                }
                match self.drop_target(position, store) {
                    Some((target, target_anchor)) if target != node => {
                        self.connect(&node, anchor, &target, target_anchor, store, history, effects);
                    }
                    _ => self.to_idle(effects),
                }
            }
            GestureState::DraggingConnectionHead { connection, moved, .. } => {
                if moved {
                    self.release_head(&connection, position, store, history, effects);
                }
                self.to_idle(effects);
            }
        }
    }

    fn release_head(
        &mut self,
        connection: &ConnectionId,
        position: Point,
        store: &mut DiagramStore,
        history: &mut History,
        effects: &mut Vec<GestureEffect>,
    ) {
        let Some(origin) = store.connection(connection).map(|c| c.from.clone()) else {
            return;
        };
        let target = store
            .node_at_screen(position)
            .filter(|n| n != &origin)
            .and_then(|n| store.node(&n))
            .map(|n| {
                let canvas = store.viewport().screen_to_canvas(position);
                (n.id.clone(), geometry::closest_anchor(n, canvas))
            });

        match target {
            Some((to, to_anchor)) => match store.retarget_connection(connection, &to, to_anchor) {
                Ok(true) => commit(store, history),
                Ok(false) => {}
                Err(err) => effects.push(GestureEffect::Warning(err)),
            },
            None => {
                if store.delete_connection(connection).is_ok() {
                    log::debug!("Connection {connection} dropped on empty space");
                    commit(store, history);
                }
            }
        }
    }

    fn pointer_cancel(&mut self, store: &mut DiagramStore, history: &mut History, effects: &mut Vec<GestureEffect>) {
        match std::mem::take(&mut self.state) {
            GestureState::DraggingNode {
                node,
                origin,
                moved: true,
                ..
            } if left_origin(store, &node, origin) => commit(store, history),
            state @ GestureState::EditingText { .. } => {
                self.state = state;
                return;
            }
            _ => {}
        }
        self.to_idle(effects);
    }

    /// Node and anchor a connection would attach to at a screen point.
    fn drop_target(&self, position: Point, store: &DiagramStore) -> Option<(NodeId, Anchor)> {
        match store.hit_test(position) {
            Hit::Anchor { node, anchor } => Some((node, anchor)),
            Hit::NodeBody(node) => {
                let canvas = store.viewport().screen_to_canvas(position);
                let anchor = geometry::closest_anchor(store.node(&node)?, canvas);
                Some((node, anchor))
            }
            _ => None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn connect(
        &mut self,
        from: &NodeId,
        from_anchor: Anchor,
        to: &NodeId,
        to_anchor: Anchor,
        store: &mut DiagramStore,
        history: &mut History,
        effects: &mut Vec<GestureEffect>,
    ) {
        match store.add_connection(from, from_anchor, to, to_anchor) {
            Ok(_) => commit(store, history),
            Err(err) => effects.push(GestureEffect::Warning(err)),
        }
        self.to_idle(effects);
    }

    // --- Keyboard ---

    fn key(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        store: &mut DiagramStore,
        history: &mut History,
        effects: &mut Vec<GestureEffect>,
    ) {
        if self.editing().is_some() {
            if key == Key::Escape {
                self.finish_edit(store, history, effects);
            }
            return;
        }

        let Some(command) = ShortcutRegistry::resolve(&key, modifiers) else {
            return;
        };
        log::debug!("Command {command:?}");
        match command {
            EditorCommand::Cancel => self.cancel(store, effects),
            EditorCommand::DeleteSelection => {
                self.settle(store, history, effects);
                self.delete_selection(store, history);
            }
            EditorCommand::Undo | EditorCommand::Redo => {
                self.settle(store, history, effects);
                let snapshot = if command == EditorCommand::Undo {
                    history.undo()
                } else {
                    history.redo()
                };
                if let Some(snapshot) = snapshot {
                    store.restore(snapshot);
                    self.clicks.reset();
                    effects.push(GestureEffect::HistoryRestored);
                }
            }
            EditorCommand::Save => effects.push(GestureEffect::SaveRequested),
            EditorCommand::ResetZoom => {
                store.reset_zoom();
            }
        }
    }

    /// Escape: drop in-progress work and clear the selection.
    fn cancel(&mut self, store: &mut DiagramStore, effects: &mut Vec<GestureEffect>) {
        if let GestureState::DraggingNode {
            node,
            origin,
            moved: true,
            ..
        } = &self.state
        {
            let _ = store.move_node(node, *origin);
        }
        self.to_idle(effects);
        store.clear_selection();
    }

    /// Bring an in-progress gesture to rest before a discrete command.
    fn settle(&mut self, store: &mut DiagramStore, history: &mut History, effects: &mut Vec<GestureEffect>) {
        self.finish_edit(store, history, effects);
        if !self.is_idle() {
            self.pointer_cancel(store, history, effects);
        }
    }

    fn delete_selection(&mut self, store: &mut DiagramStore, history: &mut History) {
        let deleted = match store.selection().clone() {
            Selection::Connection(id) => store.delete_connection(&id).is_ok(),
            Selection::Node(id) => store.delete_node(&id).is_ok(),
            Selection::None => false,
        };
        if deleted {
            commit(store, history);
        }
    }

    // --- Text editing ---

    fn finish_edit(&mut self, store: &mut DiagramStore, history: &mut History, effects: &mut Vec<GestureEffect>) {
        let GestureState::EditingText { node, original } = &self.state else {
            return;
        };
        let (node, original) = (node.clone(), original.clone());
        self.state = GestureState::Idle;
        let text = store.node(&node).map(|n| n.content.clone());
        if let Some(text) = text {
            let _ = store.set_node_content(&node, &text);
            let changed = store.node(&node).is_some_and(|n| n.content != original);
            if changed {
                log::debug!("Text edit of {node} committed");
                commit(store, history);
            }
        }
        self.clicks.reset();
        effects.push(GestureEffect::EndTextEdit(node));
    }

    // --- Creation ---

    fn create_node(
        &mut self,
        kind: NodeKind,
        position: Option<Point>,
        store: &mut DiagramStore,
        history: &mut History,
    ) {
        let top_left = match position {
            // Dropped: top-left under the pointer.
            Some(screen) => store.viewport().screen_to_canvas(screen),
            // Menu: centered in the visible area.
            None => {
                let center = store.viewport().screen_to_canvas(store.canvas_center_screen());
                let size = kind.size();
                center - Vec2::new(size.width / 2.0, size.height / 2.0)
            }
        };
        let id = store.add_node(kind, top_left);
        let _ = store.set_selection(Selection::Node(id));
        commit(store, history);
    }
}
