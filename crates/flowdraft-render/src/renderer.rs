//! Renderer trait abstraction.

use flowdraft_core::{DiagramStore, ModelEvent, Overlay};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Scene has not been synced with a store yet")]
    NotSynced,
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// Plain background.
    None,
    /// Dots at grid intersections.
    #[default]
    Dots,
    /// Full grid lines.
    Lines,
}

impl GridStyle {
    /// Lowercase name, as accepted by the CLI `--grid` flag.
    pub fn name(self) -> &'static str {
        match self {
            GridStyle::None => "none",
            GridStyle::Dots => "dots",
            GridStyle::Lines => "lines",
        }
    }
}

/// Element rebuild counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub full_rebuilds: u64,
    pub node_renders: u64,
    pub connection_renders: u64,
}

/// A view over the model store.
///
/// Renderers only read the store; they never feed state back into it.
pub trait Renderer: Send + Sync {
    /// Bring the scene up to date with `store` after `events`.
    fn sync(&mut self, store: &DiagramStore, events: &[ModelEvent]);

    /// Replace the transient overlay (connection preview, drop highlight).
    fn set_overlay(&mut self, overlay: &Overlay);

    fn stats(&self) -> RenderStats;
}
