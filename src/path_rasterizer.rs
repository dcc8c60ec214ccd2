//! Edge-flag path rasterizer with 8× supersampling.
//!
//! Paths are rendered in three steps: line segments mark edge crossings on a
//! sample grid scaled 8× in both axes (one mark per scaled scanline), a
//! per-row parity walk turns the marks into even-odd coverage at sample
//! resolution, and an 8×8 box filter reduces the samples to one anti-aliased
//! coverage byte per output pixel.
//!
//! Only even-odd winding is representable by this construction; there is no
//! notion of signed winding direction.

use crate::basics::{iround, PointD};
use crate::error::{RenderError, Result};
use crate::path::Path;

/// Supersampling factor in each axis.
pub const SUPERSAMPLE_SCALE: i32 = 8;

/// Flattening tolerance used when feeding paths into the sample grid; finer
/// than the general default because chords are judged at 8× resolution.
const PATH_TOLERANCE: f64 = 0.1;

// ============================================================================
// CoverageMask
// ============================================================================

/// Anti-aliased coverage output at target resolution, one byte per pixel.
pub struct CoverageMask {
    width: i32,
    height: i32,
    data: Vec<u8>,
}

impl CoverageMask {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        debug_assert!(x >= 0 && y >= 0 && x < self.width && y < self.height);
        self.data[y as usize * self.width as usize + x as usize]
    }
}

// ============================================================================
// PathRasterizer
// ============================================================================

/// Edge-flag rasterizer for one fill operation.
///
/// Created at the size of the fill's device-space bounding box; geometry is
/// expressed in that local space (`[0, width] × [0, height]`).
pub struct PathRasterizer {
    width: i32,
    height: i32,
    samples: Vec<u8>,
}

impl PathRasterizer {
    /// Allocate the 8×-scaled sample grid for a `width × height` output.
    pub fn new(width: i32, height: i32) -> Result<PathRasterizer> {
        let err = || RenderError::AllocationFailed { width, height };
        if width <= 0 || height <= 0 {
            return Err(err());
        }
        let len = (width as usize * SUPERSAMPLE_SCALE as usize)
            .checked_mul(height as usize * SUPERSAMPLE_SCALE as usize)
            .ok_or_else(err)?;
        let mut samples = Vec::new();
        samples.try_reserve_exact(len).map_err(|_| err())?;
        samples.resize(len, 0);
        Ok(PathRasterizer {
            width,
            height,
            samples,
        })
    }

    /// Flatten `path` and mark every chord.
    pub fn draw_path(&mut self, path: &Path) {
        let mut chords: Vec<(PointD, PointD)> = Vec::new();
        path.flatten(PATH_TOLERANCE, &mut |a, b| chords.push((a, b)));
        for (from, to) in chords {
            self.draw_line(from, to);
        }
    }

    /// Mark the edge crossings of one line segment.
    ///
    /// Segments with an endpoint outside `[0, size]` in either axis are
    /// dropped with a diagnostic rather than failing the whole operation —
    /// partial paths still render.
    pub fn draw_line(&mut self, from: PointD, to: PointD) {
        let w = self.width as f64;
        let h = self.height as f64;
        let inside = |p: &PointD| {
            p.is_finite() && p.x >= 0.0 && p.y >= 0.0 && p.x <= w && p.y <= h
        };
        if !inside(&from) || !inside(&to) {
            log::warn!(
                "dropping path segment outside rasterizer bounds {w}x{h}: \
                 ({:.2},{:.2})-({:.2},{:.2})",
                from.x,
                from.y,
                to.x,
                to.y
            );
            return;
        }

        let scale = SUPERSAMPLE_SCALE as f64;
        let (x0, y0) = (from.x * scale, from.y * scale);
        let (x1, y1) = (to.x * scale, to.y * scale);

        let (top_x, top_y, bot_x, bot_y) = if y0 <= y1 {
            (x0, y0, x1, y1)
        } else {
            (x1, y1, x0, y0)
        };
        if top_y == bot_y {
            // Horizontal edges never cross a scanline.
            return;
        }

        let sample_w = self.width * SUPERSAMPLE_SCALE;
        let dxdy = (bot_x - top_x) / (bot_y - top_y);

        // Half-open row span [ceil(top), bot): a vertex shared by two chained
        // edges toggles parity exactly once.
        let mut row = top_y.ceil() as i32;
        while (row as f64) < bot_y {
            let x = top_x + (row as f64 - top_y) * dxdy;
            let xi = iround(x).max(0);
            // A crossing at or beyond the right boundary has no samples to
            // its right; skipping the mark leaves the row parity correct.
            if xi < sample_w {
                let idx = row as usize * sample_w as usize + xi as usize;
                self.samples[idx] ^= 0xFF;
            }
            row += 1;
        }
    }

    /// Two-stage reduction: parity fill at sample resolution, then an 8×8
    /// box filter down to the output size.
    pub fn accumulate(mut self) -> CoverageMask {
        let sample_w = (self.width * SUPERSAMPLE_SCALE) as usize;

        // Stage 1: running even-odd parity per row, written as sample alpha.
        for row in self.samples.chunks_exact_mut(sample_w) {
            let mut parity: u8 = 0;
            for sample in row.iter_mut() {
                if *sample != 0 {
                    parity ^= 0xFF;
                }
                *sample = parity;
            }
        }

        // Stage 2: average each 8x8 block into one output pixel.
        let w = self.width as usize;
        let h = self.height as usize;
        let mut data = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let mut sum: u32 = 0;
                for sy in 0..SUPERSAMPLE_SCALE as usize {
                    let row_base = (y * SUPERSAMPLE_SCALE as usize + sy) * sample_w;
                    let start = row_base + x * SUPERSAMPLE_SCALE as usize;
                    for &s in &self.samples[start..start + SUPERSAMPLE_SCALE as usize] {
                        sum += s as u32;
                    }
                }
                data[y * w + x] = ((sum + 32) >> 6) as u8;
            }
        }

        CoverageMask {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_coverage(w: i32, h: i32, rect: [f64; 4]) -> CoverageMask {
        let mut r = PathRasterizer::new(w, h).unwrap();
        r.draw_path(&Path::rectangle(rect[0], rect[1], rect[2], rect[3]));
        r.accumulate()
    }

    #[test]
    fn test_full_rect_is_fully_covered() {
        let cov = rect_coverage(4, 4, [0.0, 0.0, 4.0, 4.0]);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(cov.alpha_at(x, y), 255, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn test_zero_outside_bounding_box_of_shape() {
        let cov = rect_coverage(6, 6, [1.0, 1.0, 2.0, 2.0]);
        assert_eq!(cov.alpha_at(0, 0), 0);
        assert_eq!(cov.alpha_at(5, 5), 0);
        assert_eq!(cov.alpha_at(1, 1), 255);
        assert_eq!(cov.alpha_at(2, 2), 255);
        assert_eq!(cov.alpha_at(3, 3), 0);
    }

    #[test]
    fn test_half_pixel_coverage() {
        // A rect covering the left half of each pixel column 0.
        let cov = rect_coverage(2, 2, [0.0, 0.0, 0.5, 2.0]);
        let a = cov.alpha_at(0, 0);
        assert!((a as i32 - 128).abs() <= 4, "half coverage was {a}");
        assert_eq!(cov.alpha_at(1, 0), 0);
    }

    #[test]
    fn test_triangle_coverage_is_proportional() {
        // Right triangle covering half of a square.
        let mut b = Path::builder();
        b.move_to(0.0, 0.0).line_to(8.0, 0.0).line_to(0.0, 8.0).close();
        let mut r = PathRasterizer::new(8, 8).unwrap();
        r.draw_path(&b.build());
        let cov = r.accumulate();
        let total: u64 = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .map(|(x, y)| cov.alpha_at(x, y) as u64)
            .sum();
        let expected = (8 * 8) as u64 * 255 / 2;
        let diff = total.abs_diff(expected);
        assert!(diff < expected / 20, "triangle mass {total} vs {expected}");
        // The diagonal midpoint pixel is half covered.
        let mid = cov.alpha_at(3, 4);
        assert!(mid > 60 && mid < 200, "diagonal coverage was {mid}");
    }

    #[test]
    fn test_even_odd_hole() {
        // Two nested rects: the inner one punches a hole.
        let mut b = Path::builder();
        b.move_to(0.0, 0.0).line_to(8.0, 0.0).line_to(8.0, 8.0).line_to(0.0, 8.0).close();
        b.move_to(2.0, 2.0).line_to(6.0, 2.0).line_to(6.0, 6.0).line_to(2.0, 6.0).close();
        let mut r = PathRasterizer::new(8, 8).unwrap();
        r.draw_path(&b.build());
        let cov = r.accumulate();
        assert_eq!(cov.alpha_at(1, 1), 255);
        assert_eq!(cov.alpha_at(4, 4), 0, "inner rect should be a hole");
        assert_eq!(cov.alpha_at(6, 6), 255);
    }

    #[test]
    fn test_out_of_bounds_segment_dropped() {
        let mut r = PathRasterizer::new(4, 4).unwrap();
        // One edge far outside: dropped; the shape renders partially
        // instead of the whole operation failing.
        r.draw_line(PointD::new(-10.0, 0.0), PointD::new(2.0, 2.0));
        r.draw_line(PointD::new(1.0, 1.0), PointD::new(1.0, 3.0));
        r.draw_line(PointD::new(1.0, 3.0), PointD::new(3.0, 3.0));
        let cov = r.accumulate();
        // The in-bounds vertical edge still toggled parity on its rows.
        assert!(cov.alpha_at(2, 1) > 0);
    }

    #[test]
    fn test_coincident_edges_cancel() {
        let mut r = PathRasterizer::new(4, 4).unwrap();
        r.draw_line(PointD::new(1.0, 0.0), PointD::new(1.0, 4.0));
        r.draw_line(PointD::new(1.0, 0.0), PointD::new(1.0, 4.0));
        let cov = r.accumulate();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(cov.alpha_at(x, y), 0);
            }
        }
    }
}
