// THEORY:
// The `InteractionController` turns pointer and touch input on the preview into new
// `Transform` values. It never renders anything itself: each handler computes the
// next transform synchronously and hands it to a caller-supplied callback, and the
// host feeds that value back into its configuration and re-renders.
//
// Key architectural principles:
// 1.  **Explicit Gesture State**: One controller per preview, in exactly one of
//     `Idle`, `Dragging` or `Pinching`. Move events that do not match the current
//     state are ignored, so a stray `pinch_move` during a drag cannot corrupt it.
// 2.  **Canvas Units**: Screen deltas are converted through the preview's on-screen
//     bounding box into canvas units and divided by the current zoom before they
//     become crop percentages. A drag therefore moves the image exactly under the
//     finger at any zoom level or display scale.
// 3.  **Bounded Crop**: The crop offset is clamped to 90% of the image extent after
//     zoom and rotation, expressed in percent of the grid, so the image can never be
//     pushed fully out of view.
// 4.  **Anchored Wheel Zoom**: The wheel zooms about the pointer, adjusting the crop
//     so the image point under the cursor stays where it is.

use crate::core_modules::geometry::{
    BoundingBox, Point, Size, canvas_scale_factor, rotated_bounding_box, screen_to_canvas,
};
use crate::core_modules::transform::{CropOffset, MAX_CROP_PERCENT, Transform, clamp_zoom};
use tracing::trace;

/// Fraction of the transformed image extent the crop offset may reach.
pub const CROP_LIMIT_FRACTION: f64 = 0.9;
pub const WHEEL_ZOOM_IN: f64 = 1.1;
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Receives every transform the controller produces.
pub type TransformCallback = Box<dyn FnMut(Transform) + Send>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Dragging {
        /// Screen point where the drag started.
        anchor: Point,
        /// Crop offset at drag start; every move is computed from it.
        origin: CropOffset,
    },
    Pinching {
        /// Finger distance at the last event.
        distance: f64,
        /// Finger angle in degrees at the last event.
        angle: f64,
    },
}

/// A scroll-wheel event over the preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    /// Pointer position in screen coordinates.
    pub position: Point,
    /// Negative scrolls up (zoom in), positive scrolls down (zoom out).
    pub delta_y: f64,
}

pub struct InteractionController {
    transform: Transform,
    /// Canvas size, the preview's view box.
    grid_size: Size,
    /// On-screen rectangle the preview occupies.
    bounding_box: BoundingBox,
    /// Cover-fitted image size in canvas units, before zoom and rotation.
    image_extent: Size,
    state: GestureState,
    on_change: Option<TransformCallback>,
}

impl std::fmt::Debug for InteractionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionController")
            .field("transform", &self.transform)
            .field("grid_size", &self.grid_size)
            .field("bounding_box", &self.bounding_box)
            .field("image_extent", &self.image_extent)
            .field("state", &self.state)
            .field("has_callback", &self.on_change.is_some())
            .finish()
    }
}

impl InteractionController {
    pub fn new(grid_size: Size, bounding_box: BoundingBox) -> Self {
        Self {
            transform: Transform::default(),
            grid_size,
            bounding_box,
            image_extent: grid_size,
            state: GestureState::Idle,
            on_change: None,
        }
    }

    pub fn with_callback(mut self, callback: impl FnMut(Transform) + Send + 'static) -> Self {
        self.set_callback(callback);
        self
    }

    pub fn set_callback(&mut self, callback: impl FnMut(Transform) + Send + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn clear_callback(&mut self) {
        self.on_change = None;
        self.state = GestureState::Idle;
    }

    /// Syncs the controller with a transform changed elsewhere. Does not notify.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn set_grid_size(&mut self, grid_size: Size) {
        self.grid_size = grid_size;
    }

    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) {
        self.bounding_box = bounding_box;
    }

    pub fn set_image_extent(&mut self, image_extent: Size) {
        self.image_extent = image_extent;
    }

    pub fn drag_start(&mut self, point: Point) {
        if self.on_change.is_none() {
            return;
        }
        self.state = GestureState::Dragging { anchor: point, origin: self.transform.crop };
    }

    pub fn drag_move(&mut self, point: Point) {
        let GestureState::Dragging { anchor, origin } = self.state else {
            return;
        };
        if self.on_change.is_none() || self.grid_size.is_empty() {
            return;
        }

        let (scale_x, scale_y) = canvas_scale_factor(&self.bounding_box, self.grid_size);
        let zoom = self.transform.zoom;
        let dx = (point.x - anchor.x) * scale_x / zoom;
        let dy = (point.y - anchor.y) * scale_y / zoom;

        let crop = CropOffset::new(
            origin.x + dx / self.grid_size.width * 100.0,
            origin.y + dy / self.grid_size.height * 100.0,
        );
        let next = Transform { crop: self.clamp_crop(crop, &self.transform), ..self.transform };
        self.emit(next);
    }

    pub fn drag_end(&mut self) {
        if matches!(self.state, GestureState::Dragging { .. }) {
            self.state = GestureState::Idle;
        }
    }

    pub fn pinch_start(&mut self, distance: f64, angle: f64) {
        if self.on_change.is_none() {
            return;
        }
        self.state = GestureState::Pinching { distance, angle };
    }

    /// Zoom scales by the distance ratio and rotation follows the angle delta, both
    /// measured against the previous event.
    pub fn pinch_move(&mut self, distance: f64, angle: f64) {
        let GestureState::Pinching { distance: last_distance, angle: last_angle } = self.state else {
            return;
        };
        self.state = GestureState::Pinching { distance, angle };
        if last_distance <= 0.0 || !distance.is_finite() {
            return;
        }

        let zoom = clamp_zoom(self.transform.zoom * distance / last_distance);
        let rotation = wrap_degrees(self.transform.rotation + angle - last_angle);
        let mut next = Transform { zoom, rotation, ..self.transform };
        next.crop = self.clamp_crop(next.crop, &next);
        self.emit(next);
    }

    pub fn pinch_end(&mut self) {
        if matches!(self.state, GestureState::Pinching { .. }) {
            self.state = GestureState::Idle;
        }
    }

    pub fn wheel(&mut self, event: WheelEvent) {
        if self.on_change.is_none() || self.grid_size.is_empty() {
            return;
        }
        // Horizontal-only scrolls carry no vertical delta.
        if event.delta_y == 0.0 || !event.delta_y.is_finite() {
            return;
        }
        let factor = if event.delta_y < 0.0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        let zoom = clamp_zoom(self.transform.zoom * factor);
        let ratio = zoom / self.transform.zoom;

        let pointer = screen_to_canvas(event.position, &self.bounding_box, self.grid_size);
        let from_center_x = pointer.x - self.grid_size.width / 2.0;
        let from_center_y = pointer.y - self.grid_size.height / 2.0;

        let crop = CropOffset::new(
            self.transform.crop.x - from_center_x * (ratio - 1.0) / zoom / self.grid_size.width * 100.0,
            self.transform.crop.y - from_center_y * (ratio - 1.0) / zoom / self.grid_size.height * 100.0,
        );
        let mut next = Transform { zoom, ..self.transform };
        next.crop = self.clamp_crop(crop, &next);
        self.emit(next);
    }

    /// One touch drags, two touches pinch.
    pub fn touch_start(&mut self, touches: &[Point]) {
        match touches {
            [point] => self.drag_start(*point),
            [first, second] => self.pinch_start(first.distance_to(second), first.angle_to(second)),
            _ => {}
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        match (touches, self.state) {
            ([point], GestureState::Dragging { .. }) => self.drag_move(*point),
            ([first, second], GestureState::Pinching { .. }) => {
                self.pinch_move(first.distance_to(second), first.angle_to(second))
            }
            ([first, second], _) => self.pinch_start(first.distance_to(second), first.angle_to(second)),
            _ => {}
        }
    }

    /// `remaining` are the touches still down after the lift.
    pub fn touch_end(&mut self, remaining: &[Point]) {
        match remaining {
            [] => self.state = GestureState::Idle,
            [point] => self.drag_start(*point),
            _ => {}
        }
    }

    /// Back to no crop, unit zoom and no rotation, delivered through the callback.
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
        self.emit(Transform::default());
    }

    /// Largest crop offset, in percent, along each axis for `transform`.
    pub fn crop_limit(&self, transform: &Transform) -> (f64, f64) {
        let extent = rotated_bounding_box(self.image_extent.width, self.image_extent.height, transform.rotation);
        let limit = |extent: f64, grid: f64| {
            if grid > 0.0 {
                (CROP_LIMIT_FRACTION * extent * transform.zoom / grid * 100.0).min(MAX_CROP_PERCENT)
            } else {
                0.0
            }
        };
        (limit(extent.width, self.grid_size.width), limit(extent.height, self.grid_size.height))
    }

    fn clamp_crop(&self, crop: CropOffset, transform: &Transform) -> CropOffset {
        let (limit_x, limit_y) = self.crop_limit(transform);
        CropOffset::new(crop.x.clamp(-limit_x, limit_x), crop.y.clamp(-limit_y, limit_y))
    }

    fn emit(&mut self, transform: Transform) {
        self.transform = transform;
        trace!(?transform, "interaction produced a new transform");
        if let Some(callback) = self.on_change.as_mut() {
            callback(transform);
        }
    }
}

/// Wraps an angle into `[-180, 180)`.
fn wrap_degrees(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::transform::canvas_transform;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<Transform>>>;

    /// 100x100 grid shown at 200x200 on screen, offset by (10, 20).
    fn controller() -> (InteractionController, Log) {
        let log: Log = Arc::default();
        let sink = Arc::clone(&log);
        let controller = InteractionController::new(Size::new(100.0, 100.0), BoundingBox::new(10.0, 20.0, 200.0, 200.0))
            .with_callback(move |transform| sink.lock().unwrap().push(transform));
        (controller, log)
    }

    fn last(log: &Log) -> Transform {
        *log.lock().unwrap().last().unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn drag_converts_screen_delta_to_grid_percent() {
        let (mut controller, log) = controller();
        controller.drag_start(Point::new(50.0, 50.0));
        // 20 screen px is 10 canvas px on a 100px grid.
        controller.drag_move(Point::new(70.0, 40.0));
        let transform = last(&log);
        assert!(approx(transform.crop.x, 10.0));
        assert!(approx(transform.crop.y, -5.0));
    }

    #[test]
    fn drag_moves_are_relative_to_the_start() {
        let (mut controller, log) = controller();
        controller.drag_start(Point::new(0.0, 0.0));
        controller.drag_move(Point::new(20.0, 0.0));
        controller.drag_move(Point::new(40.0, 0.0));
        assert!(approx(last(&log).crop.x, 20.0));
    }

    #[test]
    fn drag_delta_is_divided_by_zoom() {
        let (mut controller, log) = controller();
        controller.set_transform(Transform { zoom: 2.0, ..Transform::default() });
        controller.drag_start(Point::new(0.0, 0.0));
        controller.drag_move(Point::new(20.0, 0.0));
        assert!(approx(last(&log).crop.x, 5.0));
        assert_eq!(last(&log).zoom, 2.0);
    }

    #[test]
    fn drag_is_clamped_to_ninety_percent_of_the_extent() {
        let (mut controller, log) = controller();
        controller.drag_start(Point::new(0.0, 0.0));
        controller.drag_move(Point::new(10_000.0, -10_000.0));
        let transform = last(&log);
        assert!(approx(transform.crop.x, 90.0));
        assert!(approx(transform.crop.y, -90.0));
    }

    #[test]
    fn crop_limit_grows_with_rotation_and_caps_at_full_width() {
        let (controller, _) = controller();
        let rotated = Transform { rotation: 45.0, ..Transform::default() };
        let (limit_x, _) = controller.crop_limit(&rotated);
        assert_eq!(limit_x, MAX_CROP_PERCENT);
        let zoomed_out = Transform { zoom: 0.5, ..Transform::default() };
        assert!(approx(controller.crop_limit(&zoomed_out).0, 45.0));
    }

    #[test]
    fn drag_without_callback_is_a_no_op() {
        let mut controller = InteractionController::new(Size::new(100.0, 100.0), BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        controller.drag_start(Point::new(0.0, 0.0));
        controller.drag_move(Point::new(30.0, 0.0));
        assert_eq!(controller.state(), GestureState::Idle);
        assert_eq!(controller.transform(), Transform::default());
    }

    #[test]
    fn moves_outside_their_gesture_are_ignored() {
        let (mut controller, log) = controller();
        controller.drag_move(Point::new(30.0, 0.0));
        controller.pinch_move(200.0, 10.0);
        assert!(log.lock().unwrap().is_empty());
        controller.drag_start(Point::new(0.0, 0.0));
        controller.drag_end();
        assert_eq!(controller.state(), GestureState::Idle);
    }

    #[test]
    fn pinch_scales_zoom_and_follows_rotation() {
        let (mut controller, log) = controller();
        controller.pinch_start(100.0, 0.0);
        controller.pinch_move(150.0, 10.0);
        assert!(approx(last(&log).zoom, 1.5));
        assert!(approx(last(&log).rotation, 10.0));
        // Baseline resets each move.
        controller.pinch_move(300.0, 25.0);
        assert_eq!(last(&log).zoom, 3.0);
        assert!(approx(last(&log).rotation, 25.0));
        controller.pinch_end();
        assert_eq!(controller.state(), GestureState::Idle);
    }

    #[test]
    fn pinch_rotation_wraps() {
        let (mut controller, log) = controller();
        controller.set_transform(Transform { rotation: 170.0, ..Transform::default() });
        controller.pinch_start(100.0, 0.0);
        controller.pinch_move(100.0, 20.0);
        assert!(approx(last(&log).rotation, -170.0));
    }

    #[test]
    fn wheel_zooms_in_and_out_within_bounds() {
        let (mut controller, log) = controller();
        let center = WheelEvent { position: Point::new(110.0, 120.0), delta_y: -1.0 };
        controller.wheel(center);
        assert!(approx(last(&log).zoom, 1.1));
        assert_eq!(last(&log).crop, CropOffset::default());
        controller.wheel(WheelEvent { delta_y: 3.0, ..center });
        assert!(approx(last(&log).zoom, 0.99));

        controller.set_transform(Transform { zoom: 0.5, ..Transform::default() });
        controller.wheel(WheelEvent { delta_y: 1.0, ..center });
        assert_eq!(last(&log).zoom, 0.5);
    }

    #[test]
    fn wheel_without_vertical_delta_is_ignored() {
        let (mut controller, log) = controller();
        let before = controller.transform();
        for delta_y in [0.0, -0.0, f64::NAN] {
            controller.wheel(WheelEvent { position: Point::new(110.0, 120.0), delta_y });
        }
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(controller.transform(), before);
    }

    #[test]
    fn wheel_keeps_the_point_under_the_pointer_fixed() {
        let (mut controller, log) = controller();
        // Screen (160, 70) is canvas (75, 25).
        controller.wheel(WheelEvent { position: Point::new(160.0, 70.0), delta_y: -1.0 });
        let matrix = canvas_transform(&last(&log), 100.0, 100.0);
        let mut points = [resvg::tiny_skia::Point::from_xy(75.0, 25.0)];
        matrix.map_points(&mut points);
        assert!((points[0].x - 75.0).abs() < 1e-3, "{:?}", points[0]);
        assert!((points[0].y - 25.0).abs() < 1e-3, "{:?}", points[0]);
    }

    #[test]
    fn touches_dispatch_to_drag_and_pinch() {
        let (mut controller, log) = controller();
        controller.touch_start(&[Point::new(0.0, 0.0)]);
        assert!(matches!(controller.state(), GestureState::Dragging { .. }));
        controller.touch_move(&[Point::new(20.0, 0.0)]);
        assert!(approx(last(&log).crop.x, 10.0));

        // A second finger turns the drag into a pinch.
        controller.touch_move(&[Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        assert!(matches!(controller.state(), GestureState::Pinching { .. }));
        controller.touch_move(&[Point::new(0.0, 0.0), Point::new(0.0, 200.0)]);
        assert!(approx(last(&log).zoom, 2.0));
        assert!(approx(last(&log).rotation, 90.0));

        controller.touch_end(&[Point::new(0.0, 0.0)]);
        assert!(matches!(controller.state(), GestureState::Dragging { .. }));
        controller.touch_end(&[]);
        assert_eq!(controller.state(), GestureState::Idle);
    }

    #[test]
    fn reset_notifies_with_the_default_transform() {
        let (mut controller, log) = controller();
        controller.set_transform(Transform::new(CropOffset::new(5.0, 5.0), 2.0, 30.0));
        controller.reset();
        assert_eq!(last(&log), Transform::default());
        assert_eq!(controller.transform(), Transform::default());
    }
}
