//! Fill engine: dispatches path fills through the edge-flag rasterizer.
//!
//! The fast fill path realizes even-odd coverage only. A nonzero winding
//! request is rejected with an explicit error instead of silently drawing
//! nothing, so callers can fall back or report it.

use crate::basics::{iceil, ifloor, PointD, RectD};
use crate::error::{RenderError, Result};
use crate::painter::Painter;
use crate::paint_style::PaintStyle;
use crate::path::Path;
use crate::path_rasterizer::PathRasterizer;

/// Policy for deciding whether a point is inside a self-intersecting path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindingRule {
    EvenOdd,
    NonZero,
}

/// Fill `path` with `style` under `winding_rule`, optionally translated.
///
/// The path's device-space bounding box sizes a scratch rasterizer; the path
/// is re-expressed in rasterizer-local coordinates, accumulated into a
/// coverage mask, and composited through `painter` with
/// `out_alpha = coverage · style_alpha / 255`. An empty bounding box is a
/// successful no-op. Allocation failure skips the whole operation, leaving
/// previously rendered pixels untouched.
pub fn fill_path(
    painter: &mut Painter,
    path: &Path,
    style: &PaintStyle,
    winding_rule: WindingRule,
    translation: Option<PointD>,
) -> Result<()> {
    if winding_rule != WindingRule::EvenOdd {
        return Err(RenderError::UnsupportedWindingRule(winding_rule));
    }

    let path = match translation {
        Some(t) if t.x != 0.0 || t.y != 0.0 => path.translated(t.x, t.y),
        _ => path.clone(),
    };

    let Some(bounds) = path.bounding_box() else {
        return Ok(());
    };

    let x0 = ifloor(bounds.x1);
    let y0 = ifloor(bounds.y1);
    let width = iceil(bounds.x2) - x0;
    let height = iceil(bounds.y2) - y0;
    if width <= 0 || height <= 0 {
        return Ok(());
    }

    // Validate the style before any rasterization work happens.
    let sampler = style.sampler(RectD::new(0.0, 0.0, width as f64, height as f64))?;

    let mut rasterizer = PathRasterizer::new(width, height)?;
    rasterizer.draw_path(&path.translated(-x0 as f64, -y0 as f64));
    let coverage = rasterizer.accumulate();

    for y in 0..height {
        for x in 0..width {
            let cover = coverage.alpha_at(x, y);
            if cover == 0 {
                continue;
            }
            let color = sampler.sample(x as f64, y as f64);
            painter.blend_pixel(x0 + x, y0 + y, color, cover);
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
