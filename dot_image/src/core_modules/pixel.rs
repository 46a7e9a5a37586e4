// THEORY:
// The `Pixel` module is the most fundamental unit of the renderer. It is a "dumb"
// data container for a single RGBA pixel plus the one single-pixel heuristic the
// color stages need: Rec. 601 luma.
//
// Key architectural principles:
// 1.  **Data Purity**: `Pixel` holds the raw `u8` channels as read back from the
//     raster surface (straight, not premultiplied, alpha).
// 2.  **Intrinsic Knowledge**: `luma` depends only on the pixel's own data.
// 3.  **Output Color**: `Rgb` is the opaque triple that leaves the sampler as a cell's
//     color and is written into exported documents as `#rrggbb`.

pub mod pixel {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Luminance = f64;

    pub const CHANNELS: usize = 4;

    /// Rec. 601 luma weights, in the rounding used by the color adjustment stage.
    pub const LUMA_RED: f64 = 0.2989;
    pub const LUMA_GREEN: f64 = 0.587;
    pub const LUMA_BLUE: f64 = 0.114;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Self { red, green, blue, alpha }
        }

        pub fn opaque(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, 255)
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        pub fn luma(&self) -> Luminance {
            luma(self.red as f64, self.green as f64, self.blue as f64)
        }

        /// Drops alpha.
        pub fn rgb(&self) -> Rgb {
            Rgb::new(self.red, self.green, self.blue)
        }
    }

    /// Rec. 601 luma of a (possibly fractional) RGB triple.
    #[inline]
    pub fn luma(red: f64, green: f64, blue: f64) -> Luminance {
        LUMA_RED * red + LUMA_GREEN * green + LUMA_BLUE * blue
    }

    impl From<[Byte; CHANNELS]> for Pixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<Pixel> for [Byte; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }

    /// An opaque 8-bit RGB color.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Rgb {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
    }

    impl Rgb {
        pub const BLACK: Rgb = Rgb::new(0, 0, 0);
        pub const WHITE: Rgb = Rgb::new(255, 255, 255);

        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Six-digit lowercase hex, `#rrggbb`.
        pub fn to_hex(&self) -> String {
            format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
        }
    }

    impl fmt::Display for Rgb {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.to_hex())
        }
    }

    impl From<(u8, u8, u8)> for Rgb {
        fn from((red, green, blue): (u8, u8, u8)) -> Self {
            Rgb::new(red, green, blue)
        }
    }
}
