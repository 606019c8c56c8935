//! Colors and stroke widths.

use flowdraft_core::NodeKind;
use peniko::Color;

/// Visual theme for the SVG scene.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub grid: Color,
    pub text: Color,
    pub node_stroke: Color,
    pub connection: Color,
    pub anchor: Color,
    pub selection: Color,
    pub preview: Color,
    pub hover: Color,
    pub stroke_width: f64,
    pub selected_stroke_width: f64,
    pub anchor_radius: f64,
    pub font_size: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::from_rgba8(250, 250, 250, 255),
            grid: Color::from_rgba8(160, 160, 160, 110),
            text: Color::from_rgba8(33, 37, 41, 255),
            node_stroke: Color::from_rgba8(73, 80, 87, 255),
            connection: Color::from_rgba8(73, 80, 87, 255),
            anchor: Color::from_rgba8(59, 130, 246, 200),
            selection: Color::from_rgba8(59, 130, 246, 255), // Blue
            preview: Color::from_rgba8(59, 130, 246, 180),
            hover: Color::from_rgba8(16, 185, 129, 200), // Emerald
            stroke_width: 2.0,
            selected_stroke_width: 3.0,
            anchor_radius: 4.0,
            font_size: 14.0,
        }
    }
}

impl Theme {
    pub fn node_fill(&self, kind: NodeKind) -> Color {
        match kind {
            NodeKind::Start => Color::from_rgba8(209, 250, 229, 255),
            NodeKind::End => Color::from_rgba8(254, 226, 226, 255),
            NodeKind::Assignment => Color::from_rgba8(255, 255, 255, 255),
            NodeKind::Decision => Color::from_rgba8(219, 234, 254, 255),
            NodeKind::Comment => Color::from_rgba8(254, 249, 195, 255),
        }
    }
}

/// CSS color notation: `#rrggbb`, or `rgba(...)` when translucent.
pub(crate) fn css(color: Color) -> String {
    let c = color.to_rgba8();
    if c.a == 255 {
        format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
    } else {
        format!("rgba({},{},{},{:.3})", c.r, c.g, c.b, f64::from(c.a) / 255.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_color() {
        assert_eq!(css(Color::from_rgba8(59, 130, 246, 255)), "#3b82f6");
        assert_eq!(css(Color::from_rgba8(0, 0, 0, 0)), "rgba(0,0,0,0.000)");
    }
}
