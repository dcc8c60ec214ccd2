//! # vellum
//!
//! Software 2D anti-aliased path rendering and compositing engine. Turns
//! vector geometry (lines, curves, filled and stroked paths, rounded
//! rectangles) and paint effects (gradients, blur-based shadows) into pixels
//! in an in-memory framebuffer, under an affine transform / clip / layer
//! composition model.
//!
//! The numeric cores are implemented from scratch:
//!
//! - An integer incremental ellipse-coverage algorithm (no supersampling)
//! - An edge-flag path rasterizer with 8× supersampling and box-filter
//!   reduction
//! - A sliding-window "stack blur" with O(1)-per-pixel cost at any radius
//! - A nine-patch shadow and rounded-corner-clip cache
//!
//! ## Architecture
//!
//! Rendering flows through five stages:
//!
//! 1. **Geometry** — [`path::Path`] segments, flattened on demand
//! 2. **Transform** — [`transform::AffineTransform`], composed per layer
//! 3. **Rasterization** — [`path_rasterizer::PathRasterizer`] coverage or
//!    direct [`aa_painter::AntiAliasingPainter`] primitives
//! 4. **Paint** — [`paint_style::PaintStyle`] per-pixel sampling
//! 5. **Composition** — [`canvas::Canvas`] layers writing through
//!    [`painter::Painter`] into [`bitmap::Bitmap`]
//!
//! Everything is single-threaded and synchronous; fallible allocations
//! surface as [`error::RenderError`] and skip a single draw operation
//! without disturbing previously rendered pixels.

// Foundation types and math
pub mod basics;
pub mod color;
pub mod error;
pub mod transform;

// Geometry and pixel storage
pub mod bitmap;
pub mod painter;
pub mod path;

// Rasterization and anti-aliased primitives
pub mod aa_painter;
pub mod path_rasterizer;

// Paint, fill, and post-processing
pub mod blur;
pub mod fill;
pub mod paint_style;
pub mod shadow;

// Layer composition
pub mod canvas;

pub use aa_painter::{AntiAliasingPainter, BorderRadii, CornerRadius, CoveragePolicy};
pub use basics::{PointD, PointI, RectD, RectI};
pub use bitmap::Bitmap;
pub use blur::stack_blur;
pub use canvas::Canvas;
pub use color::Color;
pub use error::{RenderError, Result};
pub use fill::{fill_path, WindingRule};
pub use paint_style::{ColorStop, PaintStyle};
pub use painter::Painter;
pub use path::{Path, PathBuilder, PathSegment};
pub use path_rasterizer::PathRasterizer;
pub use shadow::{CornerClipper, ShadowCompositor, ShadowPlacement, ShadowSpec};
pub use transform::AffineTransform;
