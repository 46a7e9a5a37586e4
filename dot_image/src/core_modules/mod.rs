// Leaf modules first; each one only depends on the modules listed above it.
pub mod error;
pub mod geometry;
pub mod pixel;
pub mod color_adjustment;
pub mod color_parse;
pub mod grid_manager;
pub mod cell_block;
pub mod transform;
pub mod render_surface;
pub mod sampler;
pub mod interaction;
pub mod export;
pub mod config;
