//! FlowDraft Render Library
//!
//! Renderer abstraction and a retained SVG scene that follows the model
//! store through its change events.

mod renderer;
mod style;
mod svg;

pub use renderer::{GridStyle, RenderResult, RenderStats, Renderer, RendererError};
pub use style::Theme;
pub use svg::SvgRenderer;
