// THEORY:
// The sampler is the heart of the renderer. It turns a decoded source image plus a
// full configuration snapshot into a `RenderSurface`, and it is a pure function of
// those inputs: no state survives between passes, so identical inputs always produce
// identical cell colors and a host can simply call it again on every change.
//
// One pass, in order:
// 1.  **Allocate**: an off-screen RGBA surface of exactly `total_width x total_height`.
// 2.  **Place**: cover-fit the image into the surface and apply the interactive
//     transform (see `transform`) as a single matrix.
// 3.  **Draw**: paint the image through that matrix with bilinear filtering. Whatever
//     the image does not cover stays transparent black.
// 4.  **Sample**: for every visible cell read back its `cell_size x cell_size` block,
//     average R, G and B, and run the color adjustment chain.
// 5.  **Emit**: one shape per visible cell, plus the optional background.
//
// A zero-area grid skips steps 1-4 and yields an empty surface.

use crate::core_modules::cell_block::cell_block::CellBlock;
use crate::core_modules::color_adjustment::ColorAdjustment;
use crate::core_modules::error::{DotImageError, MAX_IMAGE_BYTES, Result};
use crate::core_modules::grid_manager::{GridConfig, GridManager};
use crate::core_modules::pixel::pixel::CHANNELS;
use crate::core_modules::render_surface::{
    Background, BackgroundRoundness, BackgroundStyle, CellColor, DotShape, RenderSurface, Shape,
};
use crate::core_modules::transform::{Transform, image_transform};
use image::RgbaImage;
use resvg::tiny_skia;
use tracing::debug;

/// A decoded source image, held premultiplied and ready to be drawn.
#[derive(Clone)]
pub struct SourceImage {
    pixmap: tiny_skia::Pixmap,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl SourceImage {
    /// Decodes encoded image bytes (PNG, JPEG, WebP, ...).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(DotImageError::ImageTooLarge { size: bytes.len(), limit: MAX_IMAGE_BYTES });
        }
        let decoded = image::load_from_memory(bytes)?;
        Self::from_rgba(&decoded.to_rgba8())
    }

    pub fn from_rgba(image: &RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        let mut data = Vec::with_capacity((width * height) as usize * CHANNELS);
        for pixel in image.pixels() {
            let [red, green, blue, alpha] = pixel.0;
            let color = tiny_skia::ColorU8::from_rgba(red, green, blue, alpha).premultiply();
            data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        let pixmap = tiny_skia::IntSize::from_wh(width, height)
            .and_then(|size| tiny_skia::Pixmap::from_vec(data, size))
            .ok_or(DotImageError::Surface { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

/// A complete configuration snapshot for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderParams {
    pub grid: GridConfig,
    pub transform: Transform,
    pub adjustment: ColorAdjustment,
    pub dot_shape: DotShape,
    pub background: BackgroundStyle,
}

/// Draws the transformed, cover-fitted image into a surface sized to the grid.
///
/// Returns `None` for a zero-area grid.
pub fn rasterize_source(
    image: &SourceImage,
    grid: &GridManager,
    transform: &Transform,
) -> Result<Option<tiny_skia::Pixmap>> {
    if grid.is_degenerate() {
        return Ok(None);
    }
    let (width, height) = (grid.total_width(), grid.total_height());
    let mut surface = tiny_skia::Pixmap::new(width, height).ok_or(DotImageError::Surface { width, height })?;

    let matrix = image_transform(transform, image.width(), image.height(), width, height);
    let paint = tiny_skia::PixmapPaint {
        quality: tiny_skia::FilterQuality::Bilinear,
        ..tiny_skia::PixmapPaint::default()
    };
    surface.draw_pixmap(0, 0, image.pixmap.as_ref(), &paint, matrix, None);

    Ok(Some(surface))
}

/// Straight (non-premultiplied) RGBA bytes of a surface, as a canvas read-back returns them.
pub fn read_back(surface: &tiny_skia::Pixmap) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(surface.pixels().len() * CHANNELS);
    for pixel in surface.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    rgba
}

/// Mean, adjusted color of every visible cell, row-major.
pub fn sample_cells(
    image: &SourceImage,
    grid: &GridManager,
    transform: &Transform,
    adjustment: &ColorAdjustment,
) -> Result<Vec<CellColor>> {
    let Some(surface) = rasterize_source(image, grid, transform)? else {
        return Ok(Vec::new());
    };
    let rgba = read_back(&surface);
    let cell_size = grid.config().cell_size;

    let colors = grid
        .visible_cells()
        .iter()
        .map(|&cell| {
            let (x, y) = grid.cell_position(cell);
            let block = CellBlock::from_surface(&rgba, surface.width(), surface.height(), x, y, cell_size);
            let mean = block.mean_rgb().unwrap_or([0.0; 3]);
            CellColor { cell, color: adjustment.apply(mean) }
        })
        .collect();
    Ok(colors)
}

/// Runs one full render pass.
pub fn render(image: &SourceImage, params: &RenderParams) -> Result<RenderSurface> {
    let grid = GridManager::new(params.grid);
    let (width, height) = (grid.total_width(), grid.total_height());
    if grid.is_degenerate() {
        debug!(width, height, "zero-area grid, emitting an empty surface");
        return Ok(RenderSurface::empty(width, height));
    }

    let adjustment = params.adjustment.clamped();
    let cell_colors = sample_cells(image, &grid, &params.transform, &adjustment)?;
    let shapes = cell_colors
        .iter()
        .map(|entry| cell_shape(&grid, entry, params.dot_shape))
        .collect();
    let border_radius = grid.effective_border_radius();
    let background = resolve_background(&params.background, border_radius);

    debug!(
        cols = grid.config().cols,
        rows = grid.config().rows,
        visible = cell_colors.len(),
        width,
        height,
        "render pass complete"
    );
    Ok(RenderSurface::new(width, height, border_radius, background, shapes, cell_colors))
}

fn cell_shape(grid: &GridManager, entry: &CellColor, dot_shape: DotShape) -> Shape {
    let rect = grid.cell_rect(entry.cell);
    match dot_shape {
        DotShape::Rect => Shape::Rect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            corner_radius: grid.dot_corner_radius(),
            fill: entry.color,
        },
        DotShape::Circle => {
            let center = rect.center();
            Shape::Circle { cx: center.x, cy: center.y, r: grid.dot_circle_radius(), fill: entry.color }
        }
    }
}

fn resolve_background(style: &BackgroundStyle, border_radius: f64) -> Option<Background> {
    if !style.enabled {
        return None;
    }
    let corner_radius = match style.roundness {
        BackgroundRoundness::None => 0.0,
        BackgroundRoundness::Inherit => border_radius,
    };
    Some(Background { fill: style.color.rgb, opacity: style.color.opacity, corner_radius })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_parse::parse_color;
    use crate::core_modules::grid_manager::Cell;
    use crate::core_modules::pixel::pixel::Rgb;
    use crate::core_modules::transform::CropOffset;
    use image::Rgba;

    fn uniform(width: u32, height: u32, color: [u8; 3]) -> SourceImage {
        let image = RgbaImage::from_pixel(width, height, Rgba([color[0], color[1], color[2], 255]));
        SourceImage::from_rgba(&image).unwrap()
    }

    /// Blue image with a red square in the middle `inner x inner` pixels.
    fn centred_square(size: u32, inner: u32) -> SourceImage {
        let start = (size - inner) / 2;
        let image = RgbaImage::from_fn(size, size, |x, y| {
            let inside = (start..start + inner).contains(&x) && (start..start + inner).contains(&y);
            if inside { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) }
        });
        SourceImage::from_rgba(&image).unwrap()
    }

    fn params(cols: u32, rows: u32, gap: u32) -> RenderParams {
        RenderParams {
            grid: GridConfig { cols, rows, gap, ..GridConfig::default() },
            ..RenderParams::default()
        }
    }

    fn close(a: Rgb, b: Rgb, tolerance: u8) -> bool {
        a.red.abs_diff(b.red) <= tolerance
            && a.green.abs_diff(b.green) <= tolerance
            && a.blue.abs_diff(b.blue) <= tolerance
    }

    #[test]
    fn uniform_image_gives_uniform_cells() {
        let image = uniform(60, 30, [100, 150, 200]);
        let surface = render(&image, &params(2, 1, 0)).unwrap();
        assert_eq!(surface.dimensions(), (60, 30));
        assert_eq!(surface.cell_colors().len(), 2);
        for entry in surface.cell_colors() {
            assert_eq!(entry.color, Rgb::new(100, 150, 200));
        }
    }

    #[test]
    fn scaled_uniform_image_stays_uniform() {
        let image = uniform(17, 41, [100, 150, 200]);
        let surface = render(&image, &params(3, 2, 4)).unwrap();
        for entry in surface.cell_colors() {
            assert!(close(entry.color, Rgb::new(100, 150, 200), 2), "{:?}", entry);
        }
    }

    #[test]
    fn rendering_is_idempotent() {
        let image = centred_square(64, 30);
        let mut request = params(4, 4, 2);
        request.transform = Transform::new(CropOffset::new(7.0, -3.0), 1.6, 33.0);
        request.adjustment = ColorAdjustment::new(120.0, 80.0, 110.0);
        let first = render(&image, &request).unwrap();
        let second = render(&image, &request).unwrap();
        assert_eq!(first.cell_colors(), second.cell_colors());
        assert_eq!(first, second);
    }

    #[test]
    fn pure_zoom_keeps_the_centre_color() {
        // 60x60 image, red 40x40 centre. On a 3x3 grid (90x90) the centre cell covers
        // surface pixels 30..60, well inside the upscaled red square.
        let image = centred_square(60, 40);
        let grid = params(3, 3, 0);
        let centre = Cell::new(1, 1);

        let flat = render(&image, &grid).unwrap();
        let mut zoomed_request = grid;
        zoomed_request.transform.zoom = 2.0;
        let zoomed = render(&image, &zoomed_request).unwrap();

        let red = Rgb::new(255, 0, 0);
        assert!(close(flat.color_of(centre).unwrap(), red, 2));
        assert!(close(zoomed.color_of(centre).unwrap(), red, 2));
        // Corners change: unzoomed they are blue, zoomed in they are reddish.
        assert!(flat.color_of(Cell::new(0, 0)).unwrap().blue > 150);
        assert!(zoomed.color_of(Cell::new(0, 0)).unwrap().red > flat.color_of(Cell::new(0, 0)).unwrap().red);
    }

    #[test]
    fn uncovered_area_samples_as_black() {
        // Zoomed out to half size the image spans 37.5..112.5 of a 150px surface,
        // so the corner cells see only empty surface.
        let image = uniform(150, 150, [255, 255, 255]);
        let mut request = params(5, 5, 0);
        request.transform.zoom = 0.5;
        let surface = render(&image, &request).unwrap();
        assert_eq!(surface.color_of(Cell::new(0, 0)), Some(Rgb::BLACK));
        assert!(close(surface.color_of(Cell::new(2, 2)).unwrap(), Rgb::WHITE, 1));
    }

    #[test]
    fn crop_offset_moves_the_image() {
        // Shift right by a full third of the surface: the left column goes dark.
        let image = uniform(90, 90, [255, 255, 255]);
        let mut request = params(3, 3, 0);
        request.transform.crop = CropOffset::new(100.0 / 3.0, 0.0);
        let surface = render(&image, &request).unwrap();
        assert!(surface.color_of(Cell::new(1, 0)).unwrap().red < 5);
        assert!(surface.color_of(Cell::new(1, 2)).unwrap().red > 250);
    }

    #[test]
    fn rounded_boundary_drops_corner_cells() {
        let image = uniform(30, 30, [10, 20, 30]);
        let mut request = params(5, 5, 0);
        request.grid.border_radius = 1.0;
        let surface = render(&image, &request).unwrap();
        assert!(surface.color_of(Cell::new(0, 0)).is_none());
        assert!(surface.color_of(Cell::new(2, 2)).is_some());
        assert_eq!(surface.shapes().len(), surface.cell_colors().len());
        assert_eq!(surface.border_radius(), 75.0);
    }

    #[test]
    fn color_adjustment_runs_on_the_mean() {
        let image = uniform(30, 30, [100, 150, 200]);
        let mut request = params(1, 1, 0);
        request.adjustment = ColorAdjustment::new(0.0, 100.0, 100.0);
        let surface = render(&image, &request).unwrap();
        assert_eq!(surface.color_of(Cell::new(0, 0)), Some(Rgb::BLACK));
    }

    #[test]
    fn shapes_follow_the_dot_style() {
        let image = uniform(30, 30, [1, 2, 3]);
        let mut request = params(2, 1, 10);
        request.grid.dot_border_radius = 0.5;
        let surface = render(&image, &request).unwrap();
        let fill = surface.cell_colors()[1].color;
        assert_eq!(
            surface.shapes()[1],
            Shape::Rect { x: 40.0, y: 0.0, width: 30.0, height: 30.0, corner_radius: 7.5, fill }
        );

        request.dot_shape = DotShape::Circle;
        let surface = render(&image, &request).unwrap();
        assert_eq!(surface.shapes()[1], Shape::Circle { cx: 55.0, cy: 15.0, r: 7.0, fill });
    }

    #[test]
    fn circle_radius_scales_with_dot_roundness() {
        let image = uniform(30, 30, [1, 2, 3]);
        let mut request = params(1, 1, 0);
        request.dot_shape = DotShape::Circle;
        for (roundness, radius) in [(1.0, 15.0), (0.5, 7.0), (0.1, 1.0), (0.0, 0.0)] {
            request.grid.dot_border_radius = roundness;
            let surface = render(&image, &request).unwrap();
            let Shape::Circle { r, .. } = surface.shapes()[0] else { panic!("expected a circle") };
            assert_eq!(r, radius, "dot roundness {roundness}");
        }
    }

    #[test]
    fn background_inherits_the_boundary_radius() {
        let image = uniform(30, 30, [1, 2, 3]);
        let mut request = params(4, 4, 0);
        request.grid.border_radius = 0.5;
        request.background = BackgroundStyle {
            enabled: true,
            color: parse_color("rgba(0, 0, 0, 0.5)").unwrap(),
            roundness: BackgroundRoundness::Inherit,
        };
        let surface = render(&image, &request).unwrap();
        let background = surface.background().copied().unwrap();
        assert_eq!(background.corner_radius, 30.0);
        assert_eq!(background.opacity, 0.5);

        request.background.enabled = false;
        assert!(render(&image, &request).unwrap().background().is_none());
    }

    #[test]
    fn zero_area_grid_renders_empty() {
        let image = uniform(10, 10, [9, 9, 9]);
        let mut request = params(3, 3, 0);
        request.grid.cell_size = 0;
        let surface = render(&image, &request).unwrap();
        assert!(surface.is_empty());
        assert_eq!(surface.dimensions(), (0, 0));
    }

    #[test]
    fn oversized_input_is_rejected_before_decoding() {
        let bytes = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(matches!(SourceImage::decode(&bytes), Err(DotImageError::ImageTooLarge { .. })));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(SourceImage::decode(b"not an image"), Err(DotImageError::ImageDecode(_))));
    }

    #[test]
    fn encoded_png_round_trips_through_decode() {
        let image = RgbaImage::from_pixel(8, 4, Rgba([12, 34, 56, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = SourceImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }
}
