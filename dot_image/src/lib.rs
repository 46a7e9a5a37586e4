// THEORY:
// This file is the main entry point for the `dot_image` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (a UI state holder, the
// `dot_image_tester` runner, or any other host that owns the configuration).
//
// The primary goal is to export the `DotImagePipeline` and its associated data
// structures (`DotImageConfig`, `RenderSurface`, etc.) as the high-level interface
// for the dot renderer. The building blocks in `core_modules` stay public so a host
// can drive the geometry, sampling and export stages on its own, but most callers
// only need the pipeline.

pub mod core_modules;
pub mod pipeline;

pub use core_modules::error::{DotImageError, Result};
