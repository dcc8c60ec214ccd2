//! Pixel-primitive painter: clipped pixel access, fills, and blits.
//!
//! The narrow surface the rest of the engine writes through. A painter
//! borrows one destination [`Bitmap`] and carries an axis-aligned clip-rect
//! stack; every operation is bounded by the top of that stack before it
//! touches pixels.

use crate::basics::{CoverType, RectI};
use crate::bitmap::Bitmap;
use crate::color::Color;

/// Clipping painter over a borrowed destination bitmap.
pub struct Painter<'a> {
    target: &'a mut Bitmap,
    clip_stack: Vec<RectI>,
}

impl<'a> Painter<'a> {
    /// Create a painter clipped to the bitmap extent.
    pub fn new(target: &'a mut Bitmap) -> Self {
        let full = target.rect();
        Self {
            target,
            clip_stack: vec![full],
        }
    }

    pub fn width(&self) -> i32 {
        self.target.width()
    }

    pub fn height(&self) -> i32 {
        self.target.height()
    }

    // ========================================================================
    // Clip stack
    // ========================================================================

    /// Current clip rectangle. An empty (invalid) rect means everything is
    /// clipped away.
    pub fn clip_box(&self) -> RectI {
        *self.clip_stack.last().unwrap()
    }

    /// Push the intersection of the current clip and `rect`.
    pub fn push_clip(&mut self, rect: &RectI) {
        let mut r = *rect;
        r.normalize();
        let top = self.clip_box();
        if !r.clip(&top) {
            // Degenerate rect that clips everything away.
            r = RectI::new(1, 1, 0, 0);
        }
        self.clip_stack.push(r);
    }

    /// Pop the most recent clip. The base (full-extent) entry stays.
    pub fn pop_clip(&mut self) {
        if self.clip_stack.len() > 1 {
            self.clip_stack.pop();
        }
    }

    /// Drop every pushed clip, restoring the full bitmap extent.
    pub fn clear_clip(&mut self) {
        self.clip_stack.truncate(1);
    }

    #[inline]
    fn inbox(&self, x: i32, y: i32) -> bool {
        let cb = self.clip_stack.last().unwrap();
        x >= cb.x1 && y >= cb.y1 && x <= cb.x2 && y <= cb.y2
    }

    // ========================================================================
    // Pixel operations (clip then delegate)
    // ========================================================================

    /// Read the pixel at (x, y); transparent outside the clip.
    pub fn get_pixel(&self, x: i32, y: i32) -> Color {
        if self.inbox(x, y) {
            self.target.get_pixel(x, y)
        } else {
            Color::TRANSPARENT
        }
    }

    /// Overwrite the pixel at (x, y) (clipped).
    pub fn set_pixel(&mut self, x: i32, y: i32, c: Color) {
        if self.inbox(x, y) {
            self.target.set_pixel(x, y, c);
        }
    }

    /// Source-over blend at (x, y) with coverage (clipped).
    pub fn blend_pixel(&mut self, x: i32, y: i32, c: Color, cover: CoverType) {
        if self.inbox(x, y) {
            let alpha = Color::mult_cover(c.a, cover);
            self.target.blend_pixel(x, y, c.with_alpha(alpha));
        }
    }

    /// Blend a horizontal run of `len` pixels with uniform color/coverage.
    pub fn blend_hline(&mut self, x: i32, y: i32, len: i32, c: Color, cover: CoverType) {
        if len <= 0 {
            return;
        }
        let cb = self.clip_box();
        if y < cb.y1 || y > cb.y2 {
            return;
        }
        let x1 = x.max(cb.x1);
        let x2 = (x + len - 1).min(cb.x2);
        let alpha = Color::mult_cover(c.a, cover);
        if alpha == 0 {
            return;
        }
        let src = c.with_alpha(alpha);
        for xi in x1..=x2 {
            self.target.blend_pixel(xi, y, src);
        }
    }

    /// Blend a filled rectangle (clipped).
    pub fn fill_rect(&mut self, rect: &RectI, c: Color) {
        let mut r = *rect;
        r.normalize();
        if !r.clip(&self.clip_box()) {
            return;
        }
        for y in r.y1..=r.y2 {
            self.blend_hline(r.x1, y, r.width(), c, 255);
        }
    }

    // ========================================================================
    // Blits
    // ========================================================================

    /// Blend the whole of `src` at (dx, dy), scaled by `opacity`.
    pub fn blit(&mut self, src: &Bitmap, dx: i32, dy: i32, opacity: u8) {
        self.blit_rect(src, &src.rect(), dx, dy, opacity);
    }

    /// Blend a sub-rect of `src` at (dx, dy), scaled by `opacity`.
    pub fn blit_rect(&mut self, src: &Bitmap, src_rect: &RectI, dx: i32, dy: i32, opacity: u8) {
        if opacity == 0 {
            return;
        }
        let mut sr = *src_rect;
        if !sr.clip(&src.rect()) {
            return;
        }
        for sy in sr.y1..=sr.y2 {
            let ty = dy + (sy - sr.y1);
            for sx in sr.x1..=sr.x2 {
                let tx = dx + (sx - sr.x1);
                let c = src.get_pixel(sx, sy);
                if c.a == 0 {
                    continue;
                }
                self.blend_pixel(tx, ty, c, opacity);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_stack_intersects() {
        let mut bmp = Bitmap::create(10, 10).unwrap();
        let mut p = Painter::new(&mut bmp);
        assert_eq!(p.clip_box(), RectI::new(0, 0, 9, 9));
        p.push_clip(&RectI::new(2, 2, 20, 20));
        assert_eq!(p.clip_box(), RectI::new(2, 2, 9, 9));
        p.push_clip(&RectI::new(0, 0, 4, 4));
        assert_eq!(p.clip_box(), RectI::new(2, 2, 4, 4));
        p.pop_clip();
        assert_eq!(p.clip_box(), RectI::new(2, 2, 9, 9));
        p.clear_clip();
        assert_eq!(p.clip_box(), RectI::new(0, 0, 9, 9));
    }

    #[test]
    fn test_set_pixel_respects_clip() {
        let mut bmp = Bitmap::create(10, 10).unwrap();
        {
            let mut p = Painter::new(&mut bmp);
            p.push_clip(&RectI::new(5, 5, 9, 9));
            p.set_pixel(0, 0, Color::BLACK);
            p.set_pixel(5, 5, Color::BLACK);
        }
        assert_eq!(bmp.get_pixel(0, 0), Color::TRANSPARENT);
        assert_eq!(bmp.get_pixel(5, 5), Color::BLACK);
    }

    #[test]
    fn test_disjoint_clip_blocks_everything() {
        let mut bmp = Bitmap::create(10, 10).unwrap();
        {
            let mut p = Painter::new(&mut bmp);
            p.push_clip(&RectI::new(20, 20, 30, 30));
            p.fill_rect(&RectI::new(0, 0, 9, 9), Color::BLACK);
        }
        assert_eq!(bmp.get_pixel(4, 4), Color::TRANSPARENT);
    }

    #[test]
    fn test_blend_pixel_cover_scales_alpha() {
        let mut bmp = Bitmap::create(2, 2).unwrap();
        {
            let mut p = Painter::new(&mut bmp);
            p.blend_pixel(0, 0, Color::WHITE, 128);
        }
        let c = bmp.get_pixel(0, 0);
        assert!((c.a as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_fill_rect_clipped_to_bitmap() {
        let mut bmp = Bitmap::create(4, 4).unwrap();
        {
            let mut p = Painter::new(&mut bmp);
            p.fill_rect(&RectI::new(-5, -5, 1, 1), Color::BLACK);
        }
        assert_eq!(bmp.get_pixel(0, 0), Color::BLACK);
        assert_eq!(bmp.get_pixel(1, 1), Color::BLACK);
        assert_eq!(bmp.get_pixel(2, 2), Color::TRANSPARENT);
    }

    #[test]
    fn test_blit_with_opacity() {
        let mut src = Bitmap::create(2, 2).unwrap();
        src.fill(Color::WHITE);
        let mut dst = Bitmap::create(4, 4).unwrap();
        {
            let mut p = Painter::new(&mut dst);
            p.blit(&src, 1, 1, 128);
        }
        assert_eq!(dst.get_pixel(0, 0), Color::TRANSPARENT);
        let c = dst.get_pixel(1, 1);
        assert!((c.a as i32 - 128).abs() <= 1);
        assert_eq!(dst.get_pixel(3, 3), Color::TRANSPARENT);
    }

    #[test]
    fn test_blit_rect_sub_region() {
        let mut src = Bitmap::create(4, 4).unwrap();
        src.set_pixel(2, 2, Color::BLACK);
        let mut dst = Bitmap::create(4, 4).unwrap();
        {
            let mut p = Painter::new(&mut dst);
            p.blit_rect(&src, &RectI::new(2, 2, 3, 3), 0, 0, 255);
        }
        assert_eq!(dst.get_pixel(0, 0), Color::BLACK);
        assert_eq!(dst.get_pixel(1, 1), Color::TRANSPARENT);
    }
}
