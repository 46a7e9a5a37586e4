// THEORY:
// The `CellBlock` module represents the square of surface pixels that backs one
// grid cell. It is the bridge between the raster surface the source image was drawn
// into and the single color a dot is painted with.
//
// Key architectural principles:
// 1.  **Spatial Pooling**: The core operation is `mean_rgb`, an unweighted arithmetic
//     mean of each color channel across every pixel in the block. Alpha is read but
//     ignored, exactly like reading back a canvas with `getImageData`: areas the image
//     never covered contribute transparent black.
// 2.  **Data Container**: Like `Pixel`, `CellBlock` is a "dumb" container. It does not
//     know about color adjustment or visibility; the sampler decides which blocks to
//     read and what to do with their means.
// 3.  **Clipped Reads**: A block that reaches past the surface edge is clipped to the
//     pixels that exist.

pub mod cell_block {
    use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};

    /// A rectangular block of surface pixels.
    pub struct CellBlock {
        /// The width of the block in pixels.
        pub width: u32,
        /// The height of the block in pixels.
        pub height: u32,
        /// A flattened, row-major vector of the block's pixels.
        pub pixels: Vec<Pixel>,
    }

    impl CellBlock {
        pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
            Self { width, height, pixels }
        }

        /// Reads the `size x size` block whose top-left corner is `(x, y)` out of a
        /// row-major RGBA buffer of `surface_width x surface_height` pixels.
        pub fn from_surface(
            rgba: &[u8],
            surface_width: u32,
            surface_height: u32,
            x: u32,
            y: u32,
            size: u32,
        ) -> Self {
            let right = x.saturating_add(size).min(surface_width);
            let bottom = y.saturating_add(size).min(surface_height);
            let width = right.saturating_sub(x);
            let height = bottom.saturating_sub(y);

            let mut pixels = Vec::with_capacity((width * height) as usize);
            for row in y..bottom {
                let start = ((row * surface_width + x) as usize) * CHANNELS;
                let end = start + width as usize * CHANNELS;
                let Some(line) = rgba.get(start..end) else {
                    break;
                };
                pixels.extend(
                    line.chunks_exact(CHANNELS)
                        .map(|bytes| Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])),
                );
            }

            Self::new(width, height, pixels)
        }

        /// Mean red, green and blue over the block, or `None` for an empty block.
        pub fn mean_rgb(&self) -> Option<[f64; 3]> {
            let count = self.pixels.len();
            if count == 0 {
                return None;
            }

            let (mut sum_r, mut sum_g, mut sum_b) = (0u64, 0u64, 0u64);
            for pixel in &self.pixels {
                sum_r += pixel.red as u64;
                sum_g += pixel.green as u64;
                sum_b += pixel.blue as u64;
            }

            let count = count as f64;
            Some([sum_r as f64 / count, sum_g as f64 / count, sum_b as f64 / count])
        }
    }
}
