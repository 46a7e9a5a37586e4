// THEORY:
// The color adjustment stage turns a cell's raw mean color into the color that is
// actually drawn. It is a short chain of linear per-channel operations:
//
// 1.  **Brightness**: every channel is multiplied by `brightness / 100` and clamped.
// 2.  **Saturation**: each channel is pushed toward (or away from) the Rec. 601 gray
//     of the *already brightened* color by `saturation / 100`, clamped and rounded.
// 3.  **Contrast**: each channel is scaled about mid-gray (128) by `contrast / 100`.
//
// Brightness must run before saturation because the gray point is taken from the
// brightened channels. Contrast runs last, after the rounded saturation result.
//
// With every parameter at 100 the chain is the identity on integer input.

use crate::core_modules::pixel::pixel::{Rgb, luma};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERCENT: f64 = 100.0;
pub const MIN_PERCENT: f64 = 0.0;
pub const MAX_PERCENT: f64 = 200.0;

const CONTRAST_PIVOT: f64 = 128.0;

#[inline]
fn clamp_channel(value: f64) -> f64 {
    value.clamp(0.0, 255.0)
}

/// Applies brightness then saturation to an RGB triple.
///
/// Inputs may be fractional (a cell mean); the output is rounded to integers.
pub fn apply_color_adjustments(
    red: f64,
    green: f64,
    blue: f64,
    brightness: f64,
    saturation: f64,
) -> (u8, u8, u8) {
    let brightness_factor = brightness / 100.0;
    let red = clamp_channel(red * brightness_factor);
    let green = clamp_channel(green * brightness_factor);
    let blue = clamp_channel(blue * brightness_factor);

    let gray = luma(red, green, blue);
    let saturation_factor = saturation / 100.0;
    let saturate = |channel: f64| clamp_channel(gray + saturation_factor * (channel - gray)).round() as u8;

    (saturate(red), saturate(green), saturate(blue))
}

/// Scales each channel about mid-gray by `contrast / 100`.
pub fn apply_contrast(red: u8, green: u8, blue: u8, contrast: f64) -> (u8, u8, u8) {
    let factor = contrast / 100.0;
    let stretch =
        |channel: u8| clamp_channel((channel as f64 - CONTRAST_PIVOT) * factor + CONTRAST_PIVOT).round() as u8;
    (stretch(red), stretch(green), stretch(blue))
}

/// The user-facing color adjustment parameters, all in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorAdjustment {
    pub brightness: f64,
    pub saturation: f64,
    pub contrast: f64,
}

impl Default for ColorAdjustment {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_PERCENT,
            saturation: DEFAULT_PERCENT,
            contrast: DEFAULT_PERCENT,
        }
    }
}

impl ColorAdjustment {
    pub fn new(brightness: f64, saturation: f64, contrast: f64) -> Self {
        Self { brightness, saturation, contrast }
    }

    /// Each parameter clamped into `[0, 200]`; non-finite values fall back to 100.
    pub fn clamped(&self) -> Self {
        let clamp = |value: f64| {
            if value.is_finite() { value.clamp(MIN_PERCENT, MAX_PERCENT) } else { DEFAULT_PERCENT }
        };
        Self::new(clamp(self.brightness), clamp(self.saturation), clamp(self.contrast))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Runs the full chain on a mean color: brightness, saturation, then contrast.
    pub fn apply(&self, mean: [f64; 3]) -> Rgb {
        let (red, green, blue) =
            apply_color_adjustments(mean[0], mean[1], mean[2], self.brightness, self.saturation);
        if self.contrast == DEFAULT_PERCENT {
            return Rgb::new(red, green, blue);
        }
        apply_contrast(red, green, blue, self.contrast).into()
    }
}
