// THEORY:
// `DotImageConfig` is the single structured configuration object a host edits. It is
// the serde-facing shape of every knob the renderer has, in the camelCase layout of
// the JSON document a front-end keeps, and it knows how to turn itself into the typed
// inputs of a render pass.
//
// Key architectural principles:
// 1.  **Clamp, Don't Reject**: Out-of-range values are a policy matter, not an error.
//     `sanitized` forces every field into its valid range and logs what it changed.
//     Only a document that is not JSON at all, or a color string that cannot be
//     parsed, becomes a `DotImageError`.
// 2.  **Ratio Lock**: With `lock_ratio` on, `set_cols` and `set_rows` keep the
//     cols/rows ratio captured when the lock was engaged. While unlocked the ratio
//     simply tracks the current grid.
// 3.  **Typed Views**: `grid_config`, `transform`, `color_adjustment` and
//     `render_params` are the only way the rest of the crate reads the configuration.

use crate::core_modules::color_adjustment::{ColorAdjustment, DEFAULT_PERCENT, MAX_PERCENT, MIN_PERCENT};
use crate::core_modules::color_parse::{ParsedColor, parse_color};
use crate::core_modules::error::Result;
use crate::core_modules::grid_manager::{CELL_SIZE, GridConfig, MAX_GRID_DIMENSION};
use crate::core_modules::render_surface::{BackgroundRoundness, BackgroundStyle, DotShape};
use crate::core_modules::sampler::RenderParams;
use crate::core_modules::transform::{
    CropOffset, MAX_CROP_PERCENT, MAX_ROTATION, MAX_ZOOM, MIN_ROTATION, MIN_ZOOM, Transform,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MAX_GAP: i64 = 50;
pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DotImageConfig {
    pub cols: i64,
    pub rows: i64,
    /// cols / rows, held while the ratio is locked.
    pub ratio: Option<f64>,
    pub lock_ratio: bool,
    pub gap: i64,
    pub border_radius: f64,
    pub dot_border_radius: f64,
    pub dot_shape: DotShape,
    pub brightness: f64,
    pub saturation: f64,
    pub contrast: f64,
    pub crop: CropOffset,
    pub zoom: f64,
    pub rotation: f64,
    pub background_enabled: bool,
    pub background_color: String,
    pub background_roundness: BackgroundRoundness,
}

impl Default for DotImageConfig {
    fn default() -> Self {
        Self {
            cols: 30,
            rows: 30,
            ratio: None,
            lock_ratio: true,
            gap: 5,
            border_radius: 0.0,
            dot_border_radius: 1.0,
            dot_shape: DotShape::Rect,
            brightness: DEFAULT_PERCENT,
            saturation: DEFAULT_PERCENT,
            contrast: DEFAULT_PERCENT,
            crop: CropOffset::default(),
            zoom: 1.0,
            rotation: 0.0,
            background_enabled: false,
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            background_roundness: BackgroundRoundness::None,
        }
    }
}

impl DotImageConfig {
    /// Parses a (possibly partial) JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A copy with every field forced into range.
    pub fn sanitized(&self) -> Self {
        let max_dimension = MAX_GRID_DIMENSION as i64;
        let cols = clamp_int("cols", self.cols, 1, max_dimension);
        let rows = clamp_int("rows", self.rows, 1, max_dimension);
        // A locked grid always carries its ratio.
        let ratio = self
            .ratio
            .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
            .or_else(|| self.lock_ratio.then(|| cols as f64 / rows as f64));
        Self {
            cols,
            rows,
            ratio,
            lock_ratio: self.lock_ratio,
            gap: clamp_int("gap", self.gap, 0, MAX_GAP),
            border_radius: clamp_float("borderRadius", self.border_radius, 0.0, 1.0, 0.0),
            dot_border_radius: clamp_float("dotBorderRadius", self.dot_border_radius, 0.0, 1.0, 1.0),
            dot_shape: self.dot_shape,
            brightness: clamp_float("brightness", self.brightness, MIN_PERCENT, MAX_PERCENT, DEFAULT_PERCENT),
            saturation: clamp_float("saturation", self.saturation, MIN_PERCENT, MAX_PERCENT, DEFAULT_PERCENT),
            contrast: clamp_float("contrast", self.contrast, MIN_PERCENT, MAX_PERCENT, DEFAULT_PERCENT),
            crop: CropOffset::new(
                clamp_float("crop.x", self.crop.x, -MAX_CROP_PERCENT, MAX_CROP_PERCENT, 0.0),
                clamp_float("crop.y", self.crop.y, -MAX_CROP_PERCENT, MAX_CROP_PERCENT, 0.0),
            ),
            zoom: clamp_float("zoom", self.zoom, MIN_ZOOM, MAX_ZOOM, 1.0),
            rotation: clamp_float("rotation", self.rotation, MIN_ROTATION, MAX_ROTATION, 0.0),
            background_enabled: self.background_enabled,
            background_color: self.background_color.clone(),
            background_roundness: self.background_roundness,
        }
    }

    /// The locked ratio, or the current grid's when none was captured. Read before
    /// either dimension changes.
    fn current_ratio(&self) -> f64 {
        self.ratio.unwrap_or(self.cols.max(1) as f64 / self.rows.max(1) as f64)
    }

    pub fn set_cols(&mut self, cols: i64) {
        let max_dimension = MAX_GRID_DIMENSION as i64;
        let ratio = self.current_ratio();
        self.cols = cols.clamp(1, max_dimension);
        if self.lock_ratio {
            self.ratio = Some(ratio);
            self.rows = ((self.cols as f64 / ratio).round() as i64).clamp(1, max_dimension);
        } else {
            self.ratio = Some(self.cols as f64 / self.rows.max(1) as f64);
        }
    }

    pub fn set_rows(&mut self, rows: i64) {
        let max_dimension = MAX_GRID_DIMENSION as i64;
        let ratio = self.current_ratio();
        self.rows = rows.clamp(1, max_dimension);
        if self.lock_ratio {
            self.ratio = Some(ratio);
            self.cols = ((self.rows as f64 * ratio).round() as i64).clamp(1, max_dimension);
        } else {
            self.ratio = Some(self.cols.max(1) as f64 / self.rows as f64);
        }
    }

    /// Engaging the lock captures the current cols/rows ratio.
    pub fn set_lock_ratio(&mut self, locked: bool) {
        if locked && !self.lock_ratio {
            self.ratio = Some(self.cols.max(1) as f64 / self.rows.max(1) as f64);
        }
        self.lock_ratio = locked;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn grid_config(&self) -> GridConfig {
        let config = self.sanitized();
        GridConfig {
            cols: config.cols as u32,
            rows: config.rows as u32,
            cell_size: CELL_SIZE,
            gap: config.gap as u32,
            border_radius: config.border_radius,
            dot_border_radius: config.dot_border_radius,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.crop, self.zoom, self.rotation).clamped()
    }

    pub fn set_transform(&mut self, transform: Transform) {
        let transform = transform.clamped();
        self.crop = transform.crop;
        self.zoom = transform.zoom;
        self.rotation = transform.rotation;
    }

    pub fn color_adjustment(&self) -> ColorAdjustment {
        ColorAdjustment::new(self.brightness, self.saturation, self.contrast).clamped()
    }

    /// The background color is only parsed when the background is enabled.
    pub fn background(&self) -> Result<BackgroundStyle> {
        if !self.background_enabled {
            return Ok(BackgroundStyle { roundness: self.background_roundness, ..BackgroundStyle::default() });
        }
        let color: ParsedColor = parse_color(&self.background_color)?;
        Ok(BackgroundStyle { enabled: true, color, roundness: self.background_roundness })
    }

    pub fn render_params(&self) -> Result<RenderParams> {
        Ok(RenderParams {
            grid: self.grid_config(),
            transform: self.transform(),
            adjustment: self.color_adjustment(),
            dot_shape: self.dot_shape,
            background: self.background()?,
        })
    }
}

fn clamp_int(field: &str, value: i64, min: i64, max: i64) -> i64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(field, value, clamped, "configuration value out of range");
    }
    clamped
}

fn clamp_float(field: &str, value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        warn!(field, value, fallback, "non-finite configuration value");
        return fallback;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(field, value, clamped, "configuration value out of range");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::error::DotImageError;
    use crate::core_modules::pixel::pixel::Rgb;

    #[test]
    fn defaults_match_the_stock_grid() {
        let config = DotImageConfig::default();
        let grid = config.grid_config();
        assert_eq!((grid.cols, grid.rows, grid.gap), (30, 30, 5));
        assert_eq!(grid.cell_size, 30);
        assert_eq!(grid.dot_border_radius, 1.0);
        assert!(config.lock_ratio);
        assert!(config.color_adjustment().is_identity());
        assert_eq!(config.transform(), Transform::default());
    }

    #[test]
    fn partial_camel_case_documents_fill_in_defaults() {
        let config = DotImageConfig::from_json(
            r##"{"cols": 12, "dotBorderRadius": 0.25, "dotShape": "circle", "backgroundColor": "#000", "crop": {"x": 5, "y": -5}}"##,
        )
        .unwrap();
        assert_eq!(config.cols, 12);
        assert_eq!(config.rows, 30);
        assert_eq!(config.dot_border_radius, 0.25);
        assert_eq!(config.dot_shape, DotShape::Circle);
        assert_eq!(config.crop, CropOffset::new(5.0, -5.0));
    }

    #[test]
    fn out_of_range_values_are_clamped_not_rejected() {
        let config = DotImageConfig::from_json(
            r#"{"cols": 0, "rows": 500, "gap": -4, "borderRadius": 3, "brightness": 250, "zoom": 9, "rotation": -720}"#,
        )
        .unwrap();
        assert_eq!((config.cols, config.rows, config.gap), (1, 80, 0));
        assert_eq!(config.border_radius, 1.0);
        assert_eq!(config.brightness, 200.0);
        assert_eq!(config.zoom, 3.0);
        assert_eq!(config.rotation, -180.0);
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(matches!(
            DotImageConfig::from_json("{ cols: "),
            Err(DotImageError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn locked_ratio_follows_column_changes() {
        let mut config = DotImageConfig { cols: 40, rows: 20, lock_ratio: false, ..DotImageConfig::default() };
        config.set_lock_ratio(true);
        assert_eq!(config.ratio, Some(2.0));
        config.set_cols(30);
        assert_eq!(config.rows, 15);
        config.set_rows(7);
        assert_eq!(config.cols, 14);
        config.set_cols(1);
        assert_eq!(config.rows, 1);
    }

    #[test]
    fn default_config_is_locked_square() {
        let mut config = DotImageConfig::default();
        config.set_cols(40);
        assert_eq!((config.cols, config.rows), (40, 40));
        assert_eq!(config.ratio, Some(1.0));
        config.set_rows(12);
        assert_eq!((config.cols, config.rows), (12, 12));
    }

    #[test]
    fn documents_without_a_ratio_lock_the_given_grid() {
        let mut config = DotImageConfig::from_json(r#"{"cols": 40, "rows": 20}"#).unwrap();
        assert_eq!(config.ratio, Some(2.0));
        config.set_rows(10);
        assert_eq!(config.cols, 20);
        config.set_cols(30);
        assert_eq!(config.rows, 15);
    }

    #[test]
    fn unlocked_ratio_tracks_the_grid() {
        let mut config = DotImageConfig { lock_ratio: false, ..DotImageConfig::default() };
        config.set_cols(60);
        assert_eq!(config.rows, 30);
        assert_eq!(config.ratio, Some(2.0));
        config.set_lock_ratio(true);
        config.set_rows(10);
        assert_eq!(config.cols, 20);
    }

    #[test]
    fn reset_restores_every_default() {
        let mut config = DotImageConfig::from_json(r#"{"cols": 3, "zoom": 2, "backgroundEnabled": true}"#).unwrap();
        config.reset();
        assert_eq!(config, DotImageConfig::default());
    }

    #[test]
    fn set_transform_stores_a_clamped_transform() {
        let mut config = DotImageConfig::default();
        config.set_transform(Transform::new(CropOffset::new(12.0, 0.0), 0.1, 45.0));
        assert_eq!(config.crop.x, 12.0);
        assert_eq!(config.zoom, 0.5);
        assert_eq!(config.rotation, 45.0);
    }

    #[test]
    fn background_color_is_parsed_only_when_enabled() {
        let mut config = DotImageConfig { background_color: "not a color".into(), ..DotImageConfig::default() };
        assert!(!config.background().unwrap().enabled);

        config.background_enabled = true;
        assert!(matches!(config.render_params(), Err(DotImageError::InvalidColor(_))));

        config.background_color = "rgba(10, 20, 30, 0.25)".into();
        config.background_roundness = BackgroundRoundness::Inherit;
        let background = config.render_params().unwrap().background;
        assert_eq!(background.color.rgb, Rgb::new(10, 20, 30));
        assert_eq!(background.color.opacity, 0.25);
        assert_eq!(background.roundness, BackgroundRoundness::Inherit);
    }

    #[test]
    fn json_round_trip_keeps_camel_case_keys() {
        let json = DotImageConfig::default().to_json().unwrap();
        assert!(json.contains("\"lockRatio\": true"));
        assert!(json.contains("\"backgroundRoundness\": \"none\""));
    }
}
