//! Box-shadow compositing and rounded-corner clipping.
//!
//! Shadows avoid blurring a bitmap the size of the shadowed box: a small
//! nine-patch bitmap holds the four blurred corner tiles plus one pixel of
//! straight edge per side. It is filled once with the rounded shadow shape,
//! blurred once, and then tiled — edges as repeated 1px strips, the interior
//! as a flat fill (blur over a uniform fill is a no-op away from edges). The
//! nine-patch is cached on the compositor and regenerated only when its
//! parameters change; the backing allocation is reused while the required
//! size stays the same.
//!
//! The corner clipper reuses the idea in reverse: save the pixels under each
//! corner, let the caller overdraw freely, then restore the saved pixels
//! weighted by a rounded-corner alpha mask for anti-aliased clipping without
//! a full-size mask bitmap.

use crate::aa_painter::{AntiAliasingPainter, BorderRadii};
use crate::basics::{PointI, RectI};
use crate::bitmap::Bitmap;
use crate::blur::stack_blur;
use crate::color::Color;
use crate::error::Result;
use crate::painter::Painter;

// ============================================================================
// ShadowSpec
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowPlacement {
    Outer,
    Inner,
}

/// One box shadow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowSpec {
    pub color: Color,
    pub blur_radius: i32,
    pub spread_distance: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub placement: ShadowPlacement,
}

// ============================================================================
// ShadowCompositor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NinePatchKey {
    corner_size: i32,
    corner_radius: i32,
    blur_radius: i32,
    color: Color,
}

struct NinePatch {
    key: NinePatchKey,
    bitmap: Bitmap,
}

/// Paints box shadows through a cached nine-patch.
#[derive(Default)]
pub struct ShadowCompositor {
    nine_patch: Option<NinePatch>,
}

impl ShadowCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side length of the cached nine-patch bitmap, if one is held.
    pub fn cached_patch_size(&self) -> Option<i32> {
        self.nine_patch.as_ref().map(|p| p.bitmap.width())
    }

    /// Paint `spec` for a box occupying `content_rect` with uniformly rounded
    /// corners of `corner_radius`.
    pub fn paint_box_shadow(
        &mut self,
        painter: &mut Painter,
        content_rect: &RectI,
        corner_radius: i32,
        spec: &ShadowSpec,
    ) -> Result<()> {
        match spec.placement {
            ShadowPlacement::Outer => {
                self.paint_outer_shadow(painter, content_rect, corner_radius, spec)
            }
            ShadowPlacement::Inner => {
                paint_inner_shadow(painter, content_rect, corner_radius, spec)
            }
        }
    }

    fn paint_outer_shadow(
        &mut self,
        painter: &mut Painter,
        content_rect: &RectI,
        corner_radius: i32,
        spec: &ShadowSpec,
    ) -> Result<()> {
        let shadow_rect = content_rect
            .translated(spec.offset_x, spec.offset_y)
            .inflated(spec.spread_distance, spec.spread_distance);
        if !shadow_rect.is_valid() {
            return Ok(());
        }

        // Spread grows the corner rounding along with the box.
        let radius = if corner_radius > 0 {
            (corner_radius + spec.spread_distance).max(0)
        } else {
            0
        };
        let blur = spec.blur_radius.max(0);

        if radius == 0 && blur == 0 {
            // Degenerate case: a plain offset/inflated rectangle.
            painter.fill_rect(&shadow_rect, spec.color);
            return Ok(());
        }

        // The blurred footprint extends `blur` beyond the shadow rect on
        // every side; tiling covers that inflated region. Corner tiles hold
        // the arc plus the blur falloff on both sides, clamped to at most
        // half the footprint in each axis.
        let footprint = shadow_rect.inflated(blur, blur);
        let s = (radius + 2 * blur)
            .min(footprint.width() / 2)
            .min(footprint.height() / 2);
        if s == 0 {
            painter.fill_rect(&shadow_rect, spec.color);
            return Ok(());
        }

        let key = NinePatchKey {
            corner_size: s,
            corner_radius: radius,
            blur_radius: blur,
            color: spec.color,
        };
        self.ensure_nine_patch(key)?;
        let patch = &self.nine_patch.as_ref().unwrap().bitmap;
        let n = patch.width();

        let (x1, y1, x2, y2) = (footprint.x1, footprint.y1, footprint.x2, footprint.y2);

        // Corner tiles.
        painter.blit_rect(patch, &RectI::new(0, 0, s - 1, s - 1), x1, y1, 255);
        painter.blit_rect(patch, &RectI::new(n - s, 0, n - 1, s - 1), x2 - s + 1, y1, 255);
        painter.blit_rect(
            patch,
            &RectI::new(n - s, n - s, n - 1, n - 1),
            x2 - s + 1,
            y2 - s + 1,
            255,
        );
        painter.blit_rect(patch, &RectI::new(0, n - s, s - 1, n - 1), x1, y2 - s + 1, 255);

        // Straight edges: tile the middle 1px strip of the patch along each
        // run. Every strip row/column holds a single color, so the runs
        // collapse to clipped fills.
        let run_x1 = x1 + s;
        let run_x2 = x2 - s;
        let run_y1 = y1 + s;
        let run_y2 = y2 - s;
        if run_x1 <= run_x2 {
            for r in 0..s {
                let top = patch.get_pixel(s, r);
                painter.blend_hline(run_x1, y1 + r, run_x2 - run_x1 + 1, top, 255);
                let bottom = patch.get_pixel(s, n - 1 - r);
                painter.blend_hline(run_x1, y2 - r, run_x2 - run_x1 + 1, bottom, 255);
            }
        }
        if run_y1 <= run_y2 {
            for c in 0..s {
                let left = patch.get_pixel(c, s);
                painter.fill_rect(&RectI::new(x1 + c, run_y1, x1 + c, run_y2), left);
                let right = patch.get_pixel(n - 1 - c, s);
                painter.fill_rect(&RectI::new(x2 - c, run_y1, x2 - c, run_y2), right);
            }
        }

        // Interior: flat fill, no blur needed.
        if run_x1 <= run_x2 && run_y1 <= run_y2 {
            painter.fill_rect(&RectI::new(run_x1, run_y1, run_x2, run_y2), spec.color);
        }
        Ok(())
    }

    /// Build (or reuse) the nine-patch for `key`.
    fn ensure_nine_patch(&mut self, key: NinePatchKey) -> Result<()> {
        if let Some(patch) = &self.nine_patch {
            if patch.key == key {
                return Ok(());
            }
        }
        let n = key.corner_size * 2 + 1;

        // Reuse the allocation when only the content changed.
        let mut bitmap = match self.nine_patch.take() {
            Some(old) if old.bitmap.width() == n && old.bitmap.height() == n => {
                let mut b = old.bitmap;
                b.fill(Color::TRANSPARENT);
                b
            }
            _ => Bitmap::create(n, n)?,
        };

        {
            let mut painter = Painter::new(&mut bitmap);
            let mut aa = AntiAliasingPainter::new(&mut painter);
            let inset = key.blur_radius;
            aa.fill_rect_with_rounded_corners(
                &RectI::new(inset, inset, n - 1 - inset, n - 1 - inset),
                key.color,
                BorderRadii::uniform(key.corner_radius),
            );
        }
        stack_blur(&mut bitmap, key.blur_radius as u32, key.color);

        self.nine_patch = Some(NinePatch { key, bitmap });
        Ok(())
    }
}

/// Inner shadows paint the inverted shape — the shadow color minus the
/// offset/deflated rounded hole — blurred and clipped to the box.
fn paint_inner_shadow(
    painter: &mut Painter,
    content_rect: &RectI,
    corner_radius: i32,
    spec: &ShadowSpec,
) -> Result<()> {
    let blur = spec.blur_radius.max(0);
    let margin = blur * 2;
    let w = content_rect.width() + margin * 2;
    let h = content_rect.height() + margin * 2;

    let hole = content_rect
        .translated(spec.offset_x, spec.offset_y)
        .inflated(-spec.spread_distance, -spec.spread_distance);
    let hole_radius = (corner_radius - spec.spread_distance).max(0);

    // Rasterize the hole coverage, then write the inverse as shadow alpha.
    let mut coverage = Bitmap::create(w, h)?;
    if hole.is_valid() {
        let mut p = Painter::new(&mut coverage);
        let mut aa = AntiAliasingPainter::new(&mut p);
        aa.fill_rect_with_rounded_corners(
            &hole.translated(margin - content_rect.x1, margin - content_rect.y1),
            Color::WHITE,
            BorderRadii::uniform(hole_radius),
        );
    }

    let mut shadow = Bitmap::create(w, h)?;
    for y in 0..h {
        for x in 0..w {
            let inside = coverage.get_pixel(x, y).a;
            let alpha = Color::multiply(spec.color.a, 255 - inside);
            shadow.set_pixel(x, y, spec.color.with_alpha(alpha));
        }
    }
    stack_blur(&mut shadow, blur as u32, spec.color);

    painter.push_clip(content_rect);
    painter.blit(&shadow, content_rect.x1 - margin, content_rect.y1 - margin, 255);
    painter.pop_clip();
    Ok(())
}

// ============================================================================
// CornerClipper
// ============================================================================

struct SavedCorner {
    rect: RectI,
    pixels: Bitmap,
    /// Ellipse center for the corner's mask, in device coordinates.
    center: PointI,
}

/// Anti-aliased rounded-corner clipping for arbitrary overdraw.
///
/// Usage: [`CornerClipper::sample_under_corners`] before drawing,
/// overdraw normally, then [`CornerClipper::blit_corner_clipping`] to
/// restore everything outside the rounded shape. Corner masks are cached on
/// the clipper and reallocated only when a corner's size changes.
pub struct CornerClipper {
    rect: RectI,
    radii: BorderRadii,
    saved: Vec<SavedCorner>,
    masks: [Option<Bitmap>; 4],
}

impl CornerClipper {
    pub fn new(rect: RectI, mut radii: BorderRadii) -> Self {
        radii.shrink_to_fit(rect.width(), rect.height());
        Self {
            rect,
            radii,
            saved: Vec::new(),
            masks: [None, None, None, None],
        }
    }

    fn corner_rects(&self) -> [(RectI, PointI); 4] {
        let r = &self.rect;
        let (tl, tr, br, bl) = (
            self.radii.top_left,
            self.radii.top_right,
            self.radii.bottom_right,
            self.radii.bottom_left,
        );
        [
            (
                RectI::new(r.x1, r.y1, r.x1 + tl.horizontal - 1, r.y1 + tl.vertical - 1),
                PointI::new(r.x1 + tl.horizontal, r.y1 + tl.vertical),
            ),
            (
                RectI::new(r.x2 - tr.horizontal + 1, r.y1, r.x2, r.y1 + tr.vertical - 1),
                PointI::new(r.x2 - tr.horizontal, r.y1 + tr.vertical),
            ),
            (
                RectI::new(r.x2 - br.horizontal + 1, r.y2 - br.vertical + 1, r.x2, r.y2),
                PointI::new(r.x2 - br.horizontal, r.y2 - br.vertical),
            ),
            (
                RectI::new(r.x1, r.y2 - bl.vertical + 1, r.x1 + bl.horizontal - 1, r.y2),
                PointI::new(r.x1 + bl.horizontal, r.y2 - bl.vertical),
            ),
        ]
    }

    /// Save the pixels currently under each corner region.
    pub fn sample_under_corners(&mut self, painter: &Painter) -> Result<()> {
        self.saved.clear();
        for (rect, center) in self.corner_rects() {
            if !rect.is_valid() {
                continue;
            }
            let mut pixels = Bitmap::create(rect.width(), rect.height())?;
            for y in 0..rect.height() {
                for x in 0..rect.width() {
                    pixels.set_pixel(x, y, painter.get_pixel(rect.x1 + x, rect.y1 + y));
                }
            }
            self.saved.push(SavedCorner {
                rect,
                pixels,
                center,
            });
        }
        Ok(())
    }

    /// Restore the saved corner pixels wherever the rounded-corner mask says
    /// "outside", weighted by the mask for anti-aliased edges.
    pub fn blit_corner_clipping(&mut self, painter: &mut Painter) -> Result<()> {
        let radii = [
            self.radii.top_left,
            self.radii.top_right,
            self.radii.bottom_right,
            self.radii.bottom_left,
        ];
        let saved = std::mem::take(&mut self.saved);
        for (index, corner) in saved.iter().enumerate() {
            let rect = corner.rect;
            let radius = radii[index];
            let mask = Self::ensure_mask(
                &mut self.masks[index],
                rect,
                corner.center,
                radius.horizontal,
                radius.vertical,
            )?;
            for y in 0..rect.height() {
                for x in 0..rect.width() {
                    let inside = mask.get_pixel(x, y).a;
                    if inside == 255 {
                        continue;
                    }
                    let current = painter.get_pixel(rect.x1 + x, rect.y1 + y);
                    let saved_px = corner.pixels.get_pixel(x, y);
                    let keep = 255 - inside;
                    let restored = Color::from_rgba(
                        Color::lerp(current.r, saved_px.r, keep),
                        Color::lerp(current.g, saved_px.g, keep),
                        Color::lerp(current.b, saved_px.b, keep),
                        Color::lerp(current.a, saved_px.a, keep),
                    );
                    painter.set_pixel(rect.x1 + x, rect.y1 + y, restored);
                }
            }
        }
        Ok(())
    }

    /// Rasterize (or reuse) one corner's inside-coverage mask.
    fn ensure_mask<'m>(
        slot: &'m mut Option<Bitmap>,
        rect: RectI,
        center: PointI,
        rx: i32,
        ry: i32,
    ) -> Result<&'m Bitmap> {
        let (w, h) = (rect.width(), rect.height());
        let reusable = matches!(slot, Some(m) if m.width() == w && m.height() == h);
        if !reusable {
            let mut mask = Bitmap::create(w, h)?;
            {
                let mut p = Painter::new(&mut mask);
                let mut aa = AntiAliasingPainter::new(&mut p);
                // The quarter arc in quadrant-local coordinates.
                aa.draw_ellipse_at(
                    PointI::new(center.x - rect.x1, center.y - rect.y1),
                    rx,
                    ry,
                    Color::WHITE,
                );
            }
            *slot = Some(mask);
        }
        Ok(slot.as_ref().unwrap())
    }
}

// ============================================================================
// Tests
// ============================================================================
