//! Editor configuration.

use crate::geometry::CurveParams;
use crate::viewport::ZoomLimits;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the interaction engine.
///
/// Distances suffixed with "radius", "tolerance" or "threshold" are in
/// screen pixels; they are divided by the zoom factor before hit-testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Additive zoom change per wheel notch or zoom button press.
    pub zoom_step: f64,
    /// Pointer travel that turns a press into a drag.
    pub drag_threshold: f64,
    pub anchor_hit_radius: f64,
    pub head_hit_radius: f64,
    pub edge_hit_tolerance: f64,
    pub max_history: usize,
    /// Quiet period after the last change before auto-saving.
    pub autosave_quiet_ms: u64,
    pub curvature: f64,
    pub max_curve_offset: f64,
    pub grid_spacing: f64,
    /// Round dragged node positions to the grid.
    pub snap_to_grid: bool,
    /// Padding used by fit-to-view.
    pub fit_padding: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 2.5,
            zoom_step: 0.1,
            drag_threshold: 3.0,
            anchor_hit_radius: 8.0,
            head_hit_radius: 10.0,
            edge_hit_tolerance: 6.0,
            max_history: 50,
            autosave_quiet_ms: 2000,
            curvature: 0.4,
            max_curve_offset: 150.0,
            grid_spacing: 20.0,
            snap_to_grid: false,
            fit_padding: 50.0,
            viewport_width: 1280.0,
            viewport_height: 800.0,
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Load a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Repair values that would break invariants (inverted bounds, zero sizes).
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if !self.min_zoom.is_finite() {
            self.min_zoom = defaults.min_zoom;
        }
        if !self.max_zoom.is_finite() {
            self.max_zoom = defaults.max_zoom;
        }
        if self.min_zoom > self.max_zoom {
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        if self.min_zoom <= 0.0 {
            log::warn!("min_zoom must be positive, using 0.1");
            self.min_zoom = 0.1;
            self.max_zoom = self.max_zoom.max(self.min_zoom);
        }
        self.max_history = self.max_history.max(1);
        self.zoom_step = self.zoom_step.abs();
        self
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min: self.min_zoom,
            max: self.max_zoom,
        }
    }

    pub fn curve_params(&self) -> CurveParams {
        CurveParams {
            curvature: self.curvature,
            max_offset: self.max_curve_offset,
        }
    }

    pub fn autosave_quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }

    pub fn viewport_size(&self) -> Size {
        Size::new(self.viewport_width, self.viewport_height)
    }
}
