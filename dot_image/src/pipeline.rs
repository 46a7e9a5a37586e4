// THEORY:
// The `pipeline` module is the top-level API of the dot renderer. A
// `DotImagePipeline` is one editing session: it owns the configuration, the decoded
// source image and the last `RenderSurface`, and it re-renders whenever any of them
// change. Hosts that only want "bytes in, SVG/PNG out" never need to touch
// `core_modules` directly.
//
// Key architectural principles:
// 1.  **Synchronous Core, Async Edges**: Rendering itself is a synchronous, pure
//     function. Only image decode and PNG encode run on tokio's blocking pool, each a
//     one-shot `spawn_blocking` task with no retry.
// 2.  **Last Writer Wins**: Every decode is tagged with a request id from a
//     monotonically increasing counter. A decode that finishes after a newer request
//     was issued is reported as `LoadOutcome::Superseded` and dropped, so a slow
//     large file can never overwrite a fast small one picked after it.
// 3.  **Keep the Last Good Result**: A failed decode returns an error and leaves the
//     previous image and surface untouched. A decoded image is installed before it is
//     rendered, so a render failure keeps the new image and the previous surface until
//     the next configuration change. Removing the image is the only thing that clears
//     the surface.

use crate::core_modules::error::Result;
use crate::core_modules::export;
use crate::core_modules::geometry::{BoundingBox, Size};
use crate::core_modules::grid_manager::GridManager;
use crate::core_modules::interaction::InteractionController;
use crate::core_modules::sampler::{self, SourceImage};
use crate::core_modules::transform::{Transform, cover_fit};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::config::DotImageConfig;
pub use crate::core_modules::export::{DEFAULT_PNG_FILENAME, DEFAULT_SVG_FILENAME};
pub use crate::core_modules::render_surface::{RenderSurface, Shape};

/// Result of handing a finished decode back to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The image is now current and a surface was rendered from it.
    Loaded { width: u32, height: u32 },
    /// A newer request was issued while this one was decoding.
    Superseded { request_id: u64 },
}

/// A decode running on the blocking pool.
#[derive(Debug)]
pub struct PendingImage {
    request_id: u64,
    task: JoinHandle<Result<SourceImage>>,
}

impl PendingImage {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub async fn wait(self) -> Result<DecodedImage> {
        let image = self.task.await??;
        Ok(DecodedImage { request_id: self.request_id, image })
    }
}

/// A successfully decoded image, still tagged with the request that produced it.
#[derive(Debug)]
pub struct DecodedImage {
    request_id: u64,
    image: SourceImage,
}

impl DecodedImage {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

#[derive(Debug, Default)]
pub struct DotImagePipeline {
    config: DotImageConfig,
    image: Option<Arc<SourceImage>>,
    surface: Option<RenderSurface>,
    latest_request: Arc<AtomicU64>,
}

impl DotImagePipeline {
    pub fn new(config: DotImageConfig) -> Self {
        Self {
            config: config.sanitized(),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &DotImageConfig {
        &self.config
    }

    /// Replaces the configuration and re-renders if an image is loaded.
    pub fn update_config(&mut self, config: DotImageConfig) -> Result<()> {
        self.config = config.sanitized();
        self.render().map(|_| ())
    }

    /// Applies a transform produced by an `InteractionController`.
    pub fn set_transform(&mut self, transform: Transform) -> Result<()> {
        self.config.set_transform(transform);
        self.render().map(|_| ())
    }

    /// Starts decoding `bytes` in the background. Must be called inside a tokio runtime.
    pub fn request_image(&self, bytes: Vec<u8>) -> PendingImage {
        let request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(request_id, bytes = bytes.len(), "image decode requested");
        let task = tokio::task::spawn_blocking(move || SourceImage::decode(&bytes));
        PendingImage { request_id, task }
    }

    /// Installs a finished decode, unless a newer request has been issued since. The
    /// image is kept even when the render that follows fails.
    pub fn accept_image(&mut self, decoded: DecodedImage) -> Result<LoadOutcome> {
        let latest = self.latest_request.load(Ordering::SeqCst);
        if decoded.request_id != latest {
            warn!(request_id = decoded.request_id, latest, "discarding stale image decode");
            return Ok(LoadOutcome::Superseded { request_id: decoded.request_id });
        }

        let (width, height) = (decoded.image.width(), decoded.image.height());
        self.image = Some(Arc::new(decoded.image));
        info!(width, height, "image loaded");
        self.render()?;
        Ok(LoadOutcome::Loaded { width, height })
    }

    /// Decodes and installs `bytes` in one step.
    pub async fn load_image(&mut self, bytes: Vec<u8>) -> Result<LoadOutcome> {
        let decoded = self.request_image(bytes).wait().await?;
        self.accept_image(decoded)
    }

    /// Drops the image and its surface. Decodes still in flight become stale.
    pub fn remove_image(&mut self) {
        self.latest_request.fetch_add(1, Ordering::SeqCst);
        self.image = None;
        self.surface = None;
        debug!("image removed");
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Re-renders from the current image and configuration. Without an image nothing
    /// is produced and `Ok(None)` is returned.
    pub fn render(&mut self) -> Result<Option<&RenderSurface>> {
        let Some(image) = self.image.as_ref() else {
            return Ok(None);
        };
        let params = self.config.render_params()?;
        let surface = sampler::render(image, &params)?;
        Ok(Some(&*self.surface.insert(surface)))
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    pub fn export_svg(&self) -> Result<String> {
        export::export_svg(self.surface.as_ref())
    }

    /// Rasterizes the current surface on the blocking pool.
    pub async fn export_png(&self, width: Option<u32>, height: Option<u32>) -> Result<Vec<u8>> {
        let surface = self.surface.clone();
        tokio::task::spawn_blocking(move || export::export_png(surface.as_ref(), width, height)).await?
    }

    /// An interaction controller for a preview shown at `bounding_box` on screen,
    /// synced to the current transform and image extent.
    pub fn controller(&self, bounding_box: BoundingBox) -> InteractionController {
        let grid = GridManager::new(self.config.grid_config());
        let grid_size = Size::new(grid.total_width() as f64, grid.total_height() as f64);
        let mut controller = InteractionController::new(grid_size, bounding_box);
        controller.set_transform(self.config.transform());
        if let Some(image) = self.image.as_ref() {
            let fitted = cover_fit(image.width() as f64, image.height() as f64, grid_size.width, grid_size.height);
            controller.set_image_extent(Size::new(fitted.width, fitted.height));
        }
        controller
    }
}
