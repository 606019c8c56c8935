//! FlowDraft Core Library
//!
//! Platform-agnostic model, interaction and persistence logic for the
//! FlowDraft flowchart canvas.

pub mod config;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod hit;
pub mod input;
pub mod model;
pub mod session;
pub mod shortcuts;
pub mod storage;
pub mod store;
pub mod transfer;
pub mod viewport;

pub use config::{ConfigError, EditorConfig};
pub use geometry::CurveParams;
pub use gesture::{GestureController, GestureEffect, GestureState, Overlay, PreviewCurve};
pub use history::{History, Snapshot};
pub use hit::Hit;
pub use input::{GestureEvent, Key, Modifiers, PointerButton};
pub use model::{Anchor, Connection, ConnectionId, Diagram, Node, NodeId, NodeKind};
pub use session::EditorSession;
pub use shortcuts::{EditorCommand, Shortcut, ShortcutRegistry};
pub use storage::{DiagramLibrary, DiagramStorage, MemoryStorage, StorageError, StorageResult};
pub use store::{DiagramStore, ModelEvent, Selection, ValidationError};
pub use transfer::{ImportError, ImportMode, export_filename, export_json, import_diagram, parse_import};
pub use viewport::{Viewport, ZoomLimits};
