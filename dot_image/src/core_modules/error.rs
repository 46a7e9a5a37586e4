// THEORY:
// Every fallible operation in the crate reports through a single `DotImageError`.
// Errors are local to one operation: a failed decode, a failed export or an
// unparseable color never poisons the pipeline, and the next configuration change
// starts a fresh attempt.
//
// Out-of-range configuration values are not errors at all. They are clamped to the
// nearest valid bound by `DotImageConfig::sanitized`, and degenerate (zero-area)
// geometry renders as an empty surface. The variants below are what remains.

use thiserror::Error;

/// Upper bound on the encoded size of a source image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const SURFACE_NOT_FOUND: &str = "Preview surface not found";
pub const PNG_ENCODE_FAILED: &str = "Failed to create PNG blob";

#[derive(Debug, Error)]
pub enum DotImageError {
    /// The configuration document could not be read at all.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] serde_json::Error),

    /// A color string did not match any recognized notation.
    #[error("invalid color string: {0:?}")]
    InvalidColor(String),

    /// The source image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("image is {size} bytes, larger than the {limit} byte limit")]
    ImageTooLarge { size: usize, limit: usize },

    /// The off-screen raster surface could not be allocated.
    #[error("failed to allocate a {width}x{height} raster surface")]
    Surface { width: u32, height: u32 },

    /// Vector or raster export failed.
    #[error("{0}")]
    Export(String),

    #[error("failed to parse SVG document: {0}")]
    SvgParse(#[from] resvg::usvg::Error),

    /// A blocking decode or encode task panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl DotImageError {
    pub fn surface_not_found() -> Self {
        Self::Export(SURFACE_NOT_FOUND.to_string())
    }

    pub fn png_encode_failed() -> Self {
        Self::Export(PNG_ENCODE_FAILED.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DotImageError>;
