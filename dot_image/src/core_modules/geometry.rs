// THEORY:
// The `geometry` module holds the small amount of plane geometry the renderer needs.
// It is a stateless utility layer: nothing here knows about images, colors or grids.
//
// Key architectural principles:
// 1.  **Rounded Boundary Test**: A cell is kept only when it lies inside the rounded
//     canvas outline. The test is corner-based: a rectangle counts as inside when
//     each of its four corners is inside. A cell whose *edge* crosses a corner arc
//     while all four corners stay inside is still kept.
// 2.  **Coordinate Spaces**: Pointer events arrive in screen pixels, while the grid
//     lives in its own canvas units (the viewBox). `screen_to_canvas` is the single
//     bridge between the two, so every gesture is scaled the same way.

use serde::{Deserialize, Serialize};

/// A point in either screen or canvas space, depending on the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle of the vector from `self` to `other`, in degrees.
    pub fn angle_to(&self, other: &Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x, self.y + self.height),
            Point::new(self.x + self.width, self.y + self.height),
        ]
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// The on-screen box of the rendered surface, as reported by the host's layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

/// Tests whether `point` lies inside a `container_width x container_height` rectangle
/// whose corners are rounded by `radius`.
///
/// The radius is clamped to half of the smaller container side. A point is inside when
/// it falls in the horizontal straight band, the vertical straight band, or within
/// `radius` of the nearest corner circle's centre.
pub fn is_point_in_rounded_rect(
    point: Point,
    container_width: f64,
    container_height: f64,
    radius: f64,
) -> bool {
    let radius = radius
        .min(container_width / 2.0)
        .min(container_height / 2.0)
        .max(0.0);

    if point.x >= radius && point.x <= container_width - radius {
        return true;
    }
    if point.y >= radius && point.y <= container_height - radius {
        return true;
    }

    let corner_x = if point.x < radius { radius } else { container_width - radius };
    let corner_y = if point.y < radius { radius } else { container_height - radius };
    let dx = point.x - corner_x;
    let dy = point.y - corner_y;

    dx * dx + dy * dy <= radius * radius
}

/// A rectangle is inside the rounded container iff all four of its corners are.
pub fn is_rect_inside_rounded_rect(
    rect: &Rect,
    container_width: f64,
    container_height: f64,
    radius: f64,
) -> bool {
    rect.corners()
        .into_iter()
        .all(|corner| is_point_in_rounded_rect(corner, container_width, container_height, radius))
}

/// Maps a screen-space point onto the canvas' own coordinate units.
///
/// `canvas_x = (screen_x - box_left) / box_width * view_box_width`, and likewise for y.
/// A collapsed bounding box maps everything onto the canvas origin.
pub fn screen_to_canvas(screen_point: Point, bounding_box: &BoundingBox, view_box: Size) -> Point {
    let (scale_x, scale_y) = canvas_scale_factor(bounding_box, view_box);
    Point::new(
        (screen_point.x - bounding_box.left) * scale_x,
        (screen_point.y - bounding_box.top) * scale_y,
    )
}

/// Canvas units per screen pixel along each axis.
pub fn canvas_scale_factor(bounding_box: &BoundingBox, view_box: Size) -> (f64, f64) {
    let scale_x = if bounding_box.width > 0.0 { view_box.width / bounding_box.width } else { 0.0 };
    let scale_y = if bounding_box.height > 0.0 { view_box.height / bounding_box.height } else { 0.0 };
    (scale_x, scale_y)
}

/// Size of the axis-aligned box that encloses a `width x height` rectangle rotated by
/// `degrees` about its centre.
pub fn rotated_bounding_box(width: f64, height: f64, degrees: f64) -> Size {
    let radians = degrees.to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    Size::new(width * cos + height * sin, width * sin + height * cos)
}
