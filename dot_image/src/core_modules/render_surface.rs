// THEORY:
// A `RenderSurface` is the complete, backend-independent result of one render pass:
// a canvas-sized group holding one positioned, sized and colored shape per visible
// cell, plus an optional background fill. It is what the on-screen display draws and
// what the exporter serializes.
//
// A surface is never patched. Every change to the image, grid, transform or color
// adjustment produces a brand new surface that replaces the previous one, and the
// surface is dropped when the source image is removed.

use crate::core_modules::color_parse::ParsedColor;
use crate::core_modules::grid_manager::Cell;
use crate::core_modules::pixel::pixel::Rgb;
use serde::{Deserialize, Serialize};

/// How a visible cell is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotShape {
    /// A cell-sized rectangle, corners rounded by the dot border radius.
    #[default]
    Rect,
    /// A circle centred in the cell, radius scaled by the dot border radius.
    Circle,
}

/// Corner rounding of the background fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundRoundness {
    /// Square corners.
    #[default]
    None,
    /// The same radius as the canvas boundary.
    Inherit,
}

/// Background settings as requested by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundStyle {
    pub enabled: bool,
    pub color: ParsedColor,
    pub roundness: BackgroundRoundness,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            enabled: false,
            color: ParsedColor::opaque(Rgb::WHITE),
            roundness: BackgroundRoundness::None,
        }
    }
}

/// A resolved background fill, sized to the whole canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    pub fill: Rgb,
    pub opacity: f64,
    pub corner_radius: f64,
}

/// One drawable primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        corner_radius: f64,
        fill: Rgb,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Rgb,
    },
}

impl Shape {
    pub fn fill(&self) -> Rgb {
        match self {
            Shape::Rect { fill, .. } | Shape::Circle { fill, .. } => *fill,
        }
    }
}

/// The averaged, adjusted color of one visible cell for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellColor {
    pub cell: Cell,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSurface {
    width: u32,
    height: u32,
    /// Canvas boundary radius in canvas units.
    border_radius: f64,
    background: Option<Background>,
    shapes: Vec<Shape>,
    cell_colors: Vec<CellColor>,
}

impl RenderSurface {
    pub fn new(
        width: u32,
        height: u32,
        border_radius: f64,
        background: Option<Background>,
        shapes: Vec<Shape>,
        cell_colors: Vec<CellColor>,
    ) -> Self {
        Self { width, height, border_radius, background, shapes, cell_colors }
    }

    /// A surface with nothing on it, used for degenerate geometry.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, 0.0, None, Vec::new(), Vec::new())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel dimensions, `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn border_radius(&self) -> f64 {
        self.border_radius
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn cell_colors(&self) -> &[CellColor] {
        &self.cell_colors
    }

    pub fn color_of(&self, cell: Cell) -> Option<Rgb> {
        self.cell_colors.iter().find(|entry| entry.cell == cell).map(|entry| entry.color)
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.background.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_surface_keeps_its_dimensions() {
        let surface = RenderSurface::empty(0, 30);
        assert!(surface.is_empty());
        assert_eq!(surface.dimensions(), (0, 30));
        assert!(surface.cell_colors().is_empty());
    }

    #[test]
    fn color_lookup_by_cell() {
        let red = Rgb::new(255, 0, 0);
        let surface = RenderSurface::new(
            30,
            30,
            0.0,
            None,
            vec![Shape::Circle { cx: 15.0, cy: 15.0, r: 15.0, fill: red }],
            vec![CellColor { cell: Cell::new(0, 0), color: red }],
        );
        assert_eq!(surface.color_of(Cell::new(0, 0)), Some(red));
        assert_eq!(surface.color_of(Cell::new(0, 1)), None);
        assert_eq!(surface.shapes()[0].fill(), red);
    }

    #[test]
    fn shape_names_deserialize_in_lowercase() {
        let shape: DotShape = serde_json::from_str("\"circle\"").unwrap();
        assert_eq!(shape, DotShape::Circle);
        let roundness: BackgroundRoundness = serde_json::from_str("\"inherit\"").unwrap();
        assert_eq!(roundness, BackgroundRoundness::Inherit);
    }
}
