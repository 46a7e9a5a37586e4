// THEORY:
// The `transform` module describes *where* the source image lands on the raster
// surface. Two independent pieces combine into the final drawing matrix:
//
// 1.  **Cover Fit**: The image is scaled uniformly so it fills the whole surface
//     (object-fit: cover), centred, with the overflowing dimension cropped. No
//     stretching, no letterboxing.
// 2.  **User Transform**: The crop offset, zoom and rotation chosen interactively.
//     They are applied to the drawing context in one fixed order:
//
//         translate(centre) . scale(zoom) . translate(-centre)
//         . translate(crop offset in surface pixels)
//         . translate(centre) . rotate(rotation) . translate(-centre)
//
//     Zoom is applied first and centred, the crop translate sits between, and the
//     centred rotation is innermost. Each step post-multiplies the context matrix the
//     way a 2D canvas `translate/scale/rotate` call does, so the interactive preview
//     and the sampled render agree pixel-for-pixel. Other orders (rotate before zoom,
//     or a single combined translate) produce visibly different crops and are not
//     interchangeable with this one.

use crate::core_modules::geometry::Rect;
use resvg::tiny_skia;
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
pub const MIN_ROTATION: f64 = -180.0;
pub const MAX_ROTATION: f64 = 360.0;
/// Crop offsets are percentages of the surface dimension.
pub const MAX_CROP_PERCENT: f64 = 100.0;

/// Translation of the image within the canvas, in percent of the canvas dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropOffset {
    pub x: f64,
    pub y: f64,
}

impl CropOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The interactive geometric transform of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub crop: CropOffset,
    /// Uniform scale, always positive.
    pub zoom: f64,
    /// Rotation in degrees, clockwise in canvas space.
    pub rotation: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            crop: CropOffset::default(),
            zoom: 1.0,
            rotation: 0.0,
        }
    }
}

impl Transform {
    pub fn new(crop: CropOffset, zoom: f64, rotation: f64) -> Self {
        Self { crop, zoom, rotation }
    }

    /// Back to no crop, unit zoom and no rotation.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Every component clamped into its valid range.
    pub fn clamped(&self) -> Self {
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        Self {
            crop: CropOffset::new(
                finite_or(self.crop.x, 0.0).clamp(-MAX_CROP_PERCENT, MAX_CROP_PERCENT),
                finite_or(self.crop.y, 0.0).clamp(-MAX_CROP_PERCENT, MAX_CROP_PERCENT),
            ),
            zoom: clamp_zoom(finite_or(self.zoom, 1.0)),
            rotation: finite_or(self.rotation, 0.0).clamp(MIN_ROTATION, MAX_ROTATION),
        }
    }

    /// Crop offset converted to surface pixels.
    pub fn crop_offset_pixels(&self, surface_width: f64, surface_height: f64) -> (f64, f64) {
        (
            self.crop.x / 100.0 * surface_width,
            self.crop.y / 100.0 * surface_height,
        )
    }
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Destination rectangle of an `image_width x image_height` image cover-fitted into
/// a `target_width x target_height` box.
pub fn cover_fit(image_width: f64, image_height: f64, target_width: f64, target_height: f64) -> Rect {
    if image_width <= 0.0 || image_height <= 0.0 {
        return Rect::new(0.0, 0.0, target_width, target_height);
    }
    let scale = (target_width / image_width).max(target_height / image_height);
    let width = image_width * scale;
    let height = image_height * scale;
    Rect::new((target_width - width) / 2.0, (target_height - height) / 2.0, width, height)
}

/// The canvas context matrix for `transform` on a `surface_width x surface_height`
/// surface, before the image itself is placed.
pub fn canvas_transform(transform: &Transform, surface_width: f64, surface_height: f64) -> tiny_skia::Transform {
    let center_x = (surface_width / 2.0) as f32;
    let center_y = (surface_height / 2.0) as f32;
    let (offset_x, offset_y) = transform.crop_offset_pixels(surface_width, surface_height);
    let zoom = transform.zoom as f32;

    tiny_skia::Transform::from_translate(center_x, center_y)
        .pre_scale(zoom, zoom)
        .pre_translate(-center_x, -center_y)
        .pre_translate(offset_x as f32, offset_y as f32)
        .pre_translate(center_x, center_y)
        .pre_concat(tiny_skia::Transform::from_rotate(transform.rotation as f32))
        .pre_translate(-center_x, -center_y)
}

/// The full matrix that maps source image pixels onto the surface: the canvas
/// context matrix followed by the cover-fit placement.
pub fn image_transform(
    transform: &Transform,
    image_width: u32,
    image_height: u32,
    surface_width: u32,
    surface_height: u32,
) -> tiny_skia::Transform {
    let (surface_width, surface_height) = (surface_width as f64, surface_height as f64);
    let destination = cover_fit(image_width as f64, image_height as f64, surface_width, surface_height);
    let scale_x = if image_width > 0 { destination.width / image_width as f64 } else { 1.0 };
    let scale_y = if image_height > 0 { destination.height / image_height as f64 } else { 1.0 };

    canvas_transform(transform, surface_width, surface_height)
        .pre_translate(destination.x as f32, destination.y as f32)
        .pre_scale(scale_x as f32, scale_y as f32)
}
