// THEORY:
// The `GridManager` owns the geometry of the dot grid. It is the renderer's
// equivalent of a layout pass: given column/row counts, the fixed cell size, the gap
// and the boundary radius, it decides how large the canvas is and which cells survive
// the rounded-boundary mask.
//
// Key architectural principles:
// 1.  **Derived Canvas**: The canvas size is never configured directly. It is
//     `cols * cell_size + (cols - 1) * gap` wide and the analogous height tall, so the
//     outermost cells touch the canvas edge exactly.
// 2.  **Normalized Radius**: The boundary radius arrives normalized to `[0, 1]` and is
//     converted into canvas units against `ceil(min(width, height) / 2)`. A radius kept
//     in absolute units by a host is re-clamped with `clamp_border_radius` whenever the
//     canvas shrinks below twice its value.
// 3.  **Row-Major Enumeration**: Cells are produced row by row, left to right, matching
//     the order the sampler reads them back and the exporter writes them out.
// 4.  **Stateless Between Passes**: A `GridManager` is rebuilt for every render pass;
//     nothing is cached across configuration changes.

use crate::core_modules::geometry::{Rect, is_rect_inside_rounded_rect};

/// Side length of one cell in canvas units.
pub const CELL_SIZE: u32 = 30;
/// Largest accepted column or row count.
pub const MAX_GRID_DIMENSION: u32 = 80;

/// The geometric description of a dot grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Number of columns, at least 1.
    pub cols: u32,
    /// Number of rows, at least 1.
    pub rows: u32,
    /// Side length of a cell in canvas units.
    pub cell_size: u32,
    /// Space between neighbouring cells in canvas units.
    pub gap: u32,
    /// Canvas corner rounding, normalized to `[0, 1]`.
    pub border_radius: f64,
    /// Per-cell corner rounding, normalized to `[0, 1]`.
    pub dot_border_radius: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: 30,
            rows: 30,
            cell_size: CELL_SIZE,
            gap: 5,
            border_radius: 0.0,
            dot_border_radius: 1.0,
        }
    }
}

/// A grid cell, identified by its integer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Re-clamps an absolute border radius against the current canvas size.
pub fn clamp_border_radius(radius: f64, total_width: u32, total_height: u32) -> f64 {
    radius.clamp(0.0, max_border_radius(total_width, total_height))
}

/// `ceil(min(width, height) / 2)`.
pub fn max_border_radius(total_width: u32, total_height: u32) -> f64 {
    (total_width.min(total_height) as f64 / 2.0).ceil()
}

/// Computes canvas dimensions and the visible cell set for one grid configuration.
#[derive(Debug, Clone)]
pub struct GridManager {
    config: GridConfig,
    total_width: u32,
    total_height: u32,
    visible_cells: Vec<Cell>,
}

impl GridManager {
    pub fn new(config: GridConfig) -> Self {
        let config = GridConfig {
            cols: config.cols.clamp(1, MAX_GRID_DIMENSION),
            rows: config.rows.clamp(1, MAX_GRID_DIMENSION),
            border_radius: clamp_unit(config.border_radius),
            dot_border_radius: clamp_unit(config.dot_border_radius),
            ..config
        };
        let total_width = config.cols * config.cell_size + (config.cols - 1) * config.gap;
        let total_height = config.rows * config.cell_size + (config.rows - 1) * config.gap;

        let mut manager = Self {
            config,
            total_width,
            total_height,
            visible_cells: Vec::new(),
        };
        manager.visible_cells = manager.cells().filter(|cell| manager.is_cell_visible(*cell)).collect();
        manager
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn total_width(&self) -> u32 {
        self.total_width
    }

    pub fn total_height(&self) -> u32 {
        self.total_height
    }

    pub fn is_degenerate(&self) -> bool {
        self.total_width == 0 || self.total_height == 0
    }

    /// Distance between the top-left corners of neighbouring cells.
    pub fn spacing(&self) -> u32 {
        self.config.cell_size + self.config.gap
    }

    pub fn max_border_radius(&self) -> f64 {
        max_border_radius(self.total_width, self.total_height)
    }

    /// The boundary radius in canvas units.
    pub fn effective_border_radius(&self) -> f64 {
        self.config.border_radius * self.max_border_radius()
    }

    /// Corner radius of a rectangular dot: `dot_border_radius / 2 * cell_size`.
    pub fn dot_corner_radius(&self) -> f64 {
        self.config.dot_border_radius / 2.0 * self.config.cell_size as f64
    }

    /// Largest circle that fits in a cell, `floor(cell_size / 2)`.
    pub fn max_dot_radius(&self) -> u32 {
        self.config.cell_size / 2
    }

    /// Radius of a circular dot: `floor(max_dot_radius * dot_border_radius)`.
    pub fn dot_circle_radius(&self) -> f64 {
        (self.max_dot_radius() as f64 * self.config.dot_border_radius).floor()
    }

    /// Top-left pixel position of `cell`.
    pub fn cell_position(&self, cell: Cell) -> (u32, u32) {
        (cell.col * self.spacing(), cell.row * self.spacing())
    }

    pub fn cell_rect(&self, cell: Cell) -> Rect {
        let (x, y) = self.cell_position(cell);
        let size = self.config.cell_size as f64;
        Rect::new(x as f64, y as f64, size, size)
    }

    /// Every cell of the grid in row-major order, visible or not.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let (rows, cols) = (self.config.rows, self.config.cols);
        (0..rows).flat_map(move |row| (0..cols).map(move |col| Cell::new(row, col)))
    }

    pub fn is_cell_visible(&self, cell: Cell) -> bool {
        let radius = self.effective_border_radius();
        radius == 0.0
            || is_rect_inside_rounded_rect(
                &self.cell_rect(cell),
                self.total_width as f64,
                self.total_height as f64,
                radius,
            )
    }

    /// The cells that survive the rounded-boundary mask, row-major.
    pub fn visible_cells(&self) -> &[Cell] {
        &self.visible_cells
    }

    pub fn cell_count(&self) -> usize {
        (self.config.cols * self.config.rows) as usize
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}
