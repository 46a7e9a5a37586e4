// THEORY:
// Export turns the current `RenderSurface` into files a user can keep. There are two
// products and they are layered:
//
// 1.  **SVG**: The canonical output. `surface_to_svg` writes a self-contained document
//     whose `viewBox` is the canvas size, one element per visible cell with its color
//     resolved to `#rrggbb`, a background rect when enabled, and a clip path for the
//     rounded boundary.
// 2.  **PNG**: Always derived from the SVG, never from the sampler's raster surface.
//     The document is parsed with usvg, stretched onto a pixmap of the requested size
//     by resvg, and encoded through the `image` crate. What the PNG shows is therefore
//     exactly what the SVG shows.

use crate::core_modules::error::{DotImageError, Result};
use crate::core_modules::pixel::pixel::CHANNELS;
use crate::core_modules::render_surface::{RenderSurface, Shape};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use resvg::{tiny_skia, usvg};
use tracing::{debug, warn};

pub const DEFAULT_SVG_FILENAME: &str = "dot-image.svg";
pub const DEFAULT_PNG_FILENAME: &str = "dot-image.png";
/// Raster side length used when no target dimension is given.
pub const DEFAULT_RASTER_SIZE: u32 = 600;

const BOUNDARY_CLIP_ID: &str = "dot-image-boundary";

/// Serializes a surface as a standalone SVG document.
pub fn surface_to_svg(surface: &RenderSurface) -> String {
    let (width, height) = surface.dimensions();
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    ));

    let radius = surface.border_radius();
    if radius > 0.0 {
        svg.push_str(&format!(
            r#"<defs><clipPath id="{BOUNDARY_CLIP_ID}"><rect x="0" y="0" width="{width}" height="{height}" rx="{r}" ry="{r}"/></clipPath></defs><g clip-path="url(#{BOUNDARY_CLIP_ID})">"#,
            r = number(radius),
        ));
    } else {
        svg.push_str("<g>");
    }

    if let Some(background) = surface.background() {
        svg.push_str(&format!(
            r#"<rect x="0" y="0" width="{width}" height="{height}" rx="{r}" ry="{r}" fill="{fill}" fill-opacity="{opacity}"/>"#,
            r = number(background.corner_radius),
            fill = background.fill.to_hex(),
            opacity = number(background.opacity),
        ));
    }

    for shape in surface.shapes() {
        match *shape {
            Shape::Rect { x, y, width, height, corner_radius, fill } => {
                svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{r}" ry="{r}" fill="{}"/>"#,
                    number(x),
                    number(y),
                    number(width),
                    number(height),
                    fill.to_hex(),
                    r = number(corner_radius),
                ));
            }
            Shape::Circle { cx, cy, r, fill } => {
                svg.push_str(&format!(
                    r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                    number(cx),
                    number(cy),
                    number(r),
                    fill.to_hex(),
                ));
            }
        }
    }

    svg.push_str("</g></svg>");
    svg
}

/// The SVG document for the current surface, if there is one.
pub fn export_svg(surface: Option<&RenderSurface>) -> Result<String> {
    let surface = surface.ok_or_else(DotImageError::surface_not_found)?;
    Ok(surface_to_svg(surface))
}

/// Output pixel size for a raster export of a `view_width x view_height` document.
///
/// Both given: used as is. One given: the other follows the view box aspect ratio.
/// Neither: `DEFAULT_RASTER_SIZE` square.
pub fn resolve_raster_size(view_width: u32, view_height: u32, width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let follow = |given: u32, along: u32, across: u32| {
        if along == 0 {
            return given;
        }
        (across as f64 / along as f64 * given as f64).round() as u32
    };
    let (width, height) = match (width, height) {
        (Some(width), Some(height)) => (width, height),
        (Some(width), None) => (width, follow(width, view_width, view_height)),
        (None, Some(height)) => (follow(height, view_height, view_width), height),
        (None, None) => (DEFAULT_RASTER_SIZE, DEFAULT_RASTER_SIZE),
    };
    (width.max(1), height.max(1))
}

/// Renders an SVG document stretched onto a `width x height` bitmap.
pub fn rasterize_svg(svg: &str, width: u32, height: u32) -> Result<RgbaImage> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())?;
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or(DotImageError::Surface { width, height })?;

    let size = tree.size();
    let scale = tiny_skia::Transform::from_scale(width as f32 / size.width(), height as f32 / size.height());
    resvg::render(&tree, scale, &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * CHANNELS);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(width, height, rgba).ok_or(DotImageError::Surface { width, height })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(|error| {
            warn!(%error, "png encoder rejected the bitmap");
            DotImageError::png_encode_failed()
        })?;
    if buffer.is_empty() {
        return Err(DotImageError::png_encode_failed());
    }
    Ok(buffer)
}

/// SVG text straight to PNG bytes.
pub fn rasterize_png(svg: &str, width: u32, height: u32) -> Result<Vec<u8>> {
    encode_png(&rasterize_svg(svg, width, height)?)
}

/// PNG bytes for the current surface at the requested size.
pub fn export_png(surface: Option<&RenderSurface>, width: Option<u32>, height: Option<u32>) -> Result<Vec<u8>> {
    let surface = surface.ok_or_else(DotImageError::surface_not_found)?;
    let (view_width, view_height) = surface.dimensions();
    let (width, height) = resolve_raster_size(view_width, view_height, width, height);
    let png = rasterize_png(&surface_to_svg(surface), width, height)?;
    debug!(width, height, bytes = png.len(), "png export complete");
    Ok(png)
}

/// Shortest decimal form, rounded to thousandths.
fn number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 { "0".to_string() } else { rounded.to_string() }
}
