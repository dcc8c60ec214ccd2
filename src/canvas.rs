//! Canvas: transform, clip, and layer composition over a destination bitmap.
//!
//! The canvas owns an ordered, never-empty stack of layers modeled as plain
//! values in a vector. A layer either owns a full-size offscreen target
//! (opacity below 1.0) or aliases the nearest owning ancestor's target
//! (opacity 1.0 — no allocation). Draw calls apply the active layer's
//! transform, resolve the active target through the stack, and write through
//! a clipped [`Painter`].

use crate::aa_painter::{AntiAliasingPainter, BorderRadii};
use crate::basics::{iceil, ifloor, PointD, RectD, RectI};
use crate::bitmap::Bitmap;
use crate::color::Color;
use crate::error::Result;
use crate::fill::{fill_path, WindingRule};
use crate::painter::Painter;
use crate::paint_style::PaintStyle;
use crate::path::Path;
use crate::shadow::{ShadowCompositor, ShadowSpec};
use crate::transform::AffineTransform;

// ============================================================================
// Layer
// ============================================================================

struct Layer {
    transform: AffineTransform,
    /// Effective device-space clip at this level (already intersected with
    /// every ancestor's clip). `None` means unclipped.
    clip: Option<RectI>,
    opacity: f32,
    /// Owned offscreen target, or `None` to share the nearest owning
    /// ancestor's target.
    target: Option<Bitmap>,
}

// ============================================================================
// Canvas
// ============================================================================

/// Layered drawing surface over a caller-owned destination bitmap.
pub struct Canvas<'a> {
    root: &'a mut Bitmap,
    layers: Vec<Layer>,
    shadow: ShadowCompositor,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a mut Bitmap) -> Canvas<'a> {
        Canvas {
            root: target,
            layers: vec![Layer {
                transform: AffineTransform::identity(),
                clip: None,
                opacity: 1.0,
                target: None,
            }],
            shadow: ShadowCompositor::new(),
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.layers.last().unwrap().transform
    }

    // ========================================================================
    // Layer stack
    // ========================================================================

    /// Push a layer. Opacity 1.0 shares the parent's target and painter;
    /// anything lower owns a fresh, fully transparent offscreen target that
    /// is composited back on pop.
    pub fn push_layer(&mut self, opacity: f32) -> Result<()> {
        let top = self.layers.last().unwrap();
        let (transform, clip) = (top.transform, top.clip);
        let target = if opacity >= 1.0 {
            None
        } else {
            Some(Bitmap::create(self.root.width(), self.root.height())?)
        };
        self.layers.push(Layer {
            transform,
            clip,
            opacity: opacity.clamp(0.0, 1.0),
            target,
        });
        Ok(())
    }

    /// Pop the top layer, compositing an owned target into the new top at
    /// the popped layer's opacity, clipped to its recorded clip rectangle.
    ///
    /// Popping the last remaining layer is a programming error.
    pub fn pop_layer(&mut self) {
        assert!(
            self.layers.len() > 1,
            "cannot pop the last remaining canvas layer"
        );
        let popped = self.layers.pop().unwrap();
        if let Some(offscreen) = popped.target {
            let opacity = (popped.opacity.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
            let target = Self::resolve_target(&mut self.layers, self.root);
            let mut painter = Painter::new(target);
            if let Some(clip) = popped.clip {
                painter.push_clip(&clip);
            }
            painter.blit(&offscreen, 0, 0, opacity);
        }
    }

    /// Pop layers until exactly one remains.
    pub fn flatten(&mut self) {
        while self.layers.len() > 1 {
            self.pop_layer();
        }
    }

    // ========================================================================
    // Transform and clip
    // ========================================================================

    /// Multiply `t` into the current layer's transform. The new transform
    /// applies in the pre-existing coordinate space: points map through `t`
    /// first, then through everything applied before it.
    pub fn apply_transform(&mut self, t: &AffineTransform) {
        self.layers.last_mut().unwrap().transform.premultiply(t);
    }

    /// Intersect the current clip with `rect` (given in the current layer's
    /// coordinate space).
    ///
    /// Pure translations intersect the axis-aligned rectangle exactly;
    /// transforms with rotation or skew fall back to clipping against the
    /// transformed rect's bounding box, an approximation.
    pub fn set_clip_rect(&mut self, rect: &RectD) {
        let top = self.layers.last_mut().unwrap();
        let device = if top.transform.is_identity_or_translation() {
            RectD::new(
                rect.x1 + top.transform.tx,
                rect.y1 + top.transform.ty,
                rect.x2 + top.transform.tx,
                rect.y2 + top.transform.ty,
            )
        } else {
            let corners = [
                top.transform.transform(rect.x1, rect.y1),
                top.transform.transform(rect.x2, rect.y1),
                top.transform.transform(rect.x2, rect.y2),
                top.transform.transform(rect.x1, rect.y2),
            ];
            let xs = corners.iter().map(|c| c.0);
            let ys = corners.iter().map(|c| c.1);
            RectD::new(
                xs.clone().fold(f64::INFINITY, f64::min),
                ys.clone().fold(f64::INFINITY, f64::min),
                xs.fold(f64::NEG_INFINITY, f64::max),
                ys.fold(f64::NEG_INFINITY, f64::max),
            )
        };
        let device = RectI::new(
            ifloor(device.x1),
            ifloor(device.y1),
            iceil(device.x2) - 1,
            iceil(device.y2) - 1,
        );
        top.clip = Some(match top.clip {
            Some(existing) => {
                let mut r = existing;
                if !r.clip(&device) {
                    // Disjoint: everything is clipped away.
                    RectI::new(1, 1, 0, 0)
                } else {
                    r
                }
            }
            None => device,
        });
    }

    /// Clip against a path. Arbitrary-shape clipping reduces to the
    /// transformed path's bounding box, an approximation shared with rotated
    /// rect clips.
    pub fn set_clip_path(&mut self, path: &Path) {
        let transform = self.layers.last().unwrap().transform;
        if let Some(bounds) = path.transformed(&transform).bounding_box() {
            // The bbox is already in device space; intersect it directly.
            let top = self.layers.last_mut().unwrap();
            let device = RectI::new(
                ifloor(bounds.x1),
                ifloor(bounds.y1),
                iceil(bounds.x2) - 1,
                iceil(bounds.y2) - 1,
            );
            top.clip = Some(match top.clip {
                Some(mut existing) => {
                    if existing.clip(&device) {
                        existing
                    } else {
                        RectI::new(1, 1, 0, 0)
                    }
                }
                None => device,
            });
        }
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Fill a path with a paint style under the given winding rule.
    pub fn fill_path(
        &mut self,
        path: &Path,
        style: &PaintStyle,
        winding_rule: WindingRule,
    ) -> Result<()> {
        let transform = self.layers.last().unwrap().transform;
        let device_path = path.transformed(&transform);
        let clip = self.layers.last().unwrap().clip;
        let target = Self::resolve_target(&mut self.layers, self.root);
        let mut painter = Painter::new(target);
        if let Some(c) = clip {
            painter.push_clip(&c);
        }
        fill_path(&mut painter, &device_path, style, winding_rule, None)
    }

    /// Fill an axis-aligned rect with a solid color; non-translation
    /// transforms route through the path pipeline.
    pub fn fill_rect(&mut self, rect: &RectD, color: Color) -> Result<()> {
        let transform = self.layers.last().unwrap().transform;
        if transform.is_identity_or_translation() {
            let device = RectI::new(
                ifloor(rect.x1 + transform.tx),
                ifloor(rect.y1 + transform.ty),
                iceil(rect.x2 + transform.tx) - 1,
                iceil(rect.y2 + transform.ty) - 1,
            );
            let clip = self.layers.last().unwrap().clip;
            let target = Self::resolve_target(&mut self.layers, self.root);
            let mut painter = Painter::new(target);
            if let Some(c) = clip {
                painter.push_clip(&c);
            }
            painter.fill_rect(&device, color);
            Ok(())
        } else {
            self.fill_path(
                &Path::rectangle(rect.x1, rect.y1, rect.width(), rect.height()),
                &PaintStyle::Solid(color),
                WindingRule::EvenOdd,
            )
        }
    }

    /// Anti-aliased line in the current coordinate space.
    pub fn draw_line(&mut self, p0: PointD, p1: PointD, color: Color, thickness: i32) {
        let transform = self.layers.last().unwrap().transform;
        let (x0, y0) = transform.transform(p0.x, p0.y);
        let (x1, y1) = transform.transform(p1.x, p1.y);
        let clip = self.layers.last().unwrap().clip;
        let target = Self::resolve_target(&mut self.layers, self.root);
        let mut painter = Painter::new(target);
        if let Some(c) = clip {
            painter.push_clip(&c);
        }
        let mut aa = AntiAliasingPainter::new(&mut painter);
        aa.draw_line(PointD::new(x0, y0), PointD::new(x1, y1), color, thickness);
    }

    /// Stroke a path in the current coordinate space.
    pub fn stroke_path(&mut self, path: &Path, color: Color, thickness: i32) {
        let transform = self.layers.last().unwrap().transform;
        let device_path = path.transformed(&transform);
        let clip = self.layers.last().unwrap().clip;
        let target = Self::resolve_target(&mut self.layers, self.root);
        let mut painter = Painter::new(target);
        if let Some(c) = clip {
            painter.push_clip(&c);
        }
        let mut aa = AntiAliasingPainter::new(&mut painter);
        aa.stroke_path(&device_path, color, thickness);
    }

    /// Fill a rounded rect. Translation-only transforms use the direct
    /// primitive; anything else routes the rounded outline through the path
    /// pipeline.
    pub fn fill_rect_with_rounded_corners(
        &mut self,
        rect: &RectD,
        color: Color,
        radii: BorderRadii,
    ) -> Result<()> {
        let transform = self.layers.last().unwrap().transform;
        if transform.is_identity_or_translation() {
            let device = RectI::new(
                ifloor(rect.x1 + transform.tx),
                ifloor(rect.y1 + transform.ty),
                iceil(rect.x2 + transform.tx) - 1,
                iceil(rect.y2 + transform.ty) - 1,
            );
            let clip = self.layers.last().unwrap().clip;
            let target = Self::resolve_target(&mut self.layers, self.root);
            let mut painter = Painter::new(target);
            if let Some(c) = clip {
                painter.push_clip(&c);
            }
            let mut aa = AntiAliasingPainter::new(&mut painter);
            aa.fill_rect_with_rounded_corners(&device, color, radii);
            Ok(())
        } else {
            self.fill_path(
                &rounded_rect_path(rect, &radii),
                &PaintStyle::Solid(color),
                WindingRule::EvenOdd,
            )
        }
    }

    /// Paint a box shadow for a box at `rect` in the current space.
    /// The transform's translation applies; rotation and skew do not reach
    /// the shadow tiles.
    pub fn draw_box_shadow(
        &mut self,
        rect: &RectD,
        corner_radius: i32,
        spec: &ShadowSpec,
    ) -> Result<()> {
        let transform = self.layers.last().unwrap().transform;
        let device = RectI::new(
            ifloor(rect.x1 + transform.tx),
            ifloor(rect.y1 + transform.ty),
            iceil(rect.x2 + transform.tx) - 1,
            iceil(rect.y2 + transform.ty) - 1,
        );
        let clip = self.layers.last().unwrap().clip;
        let target = Self::resolve_target(&mut self.layers, self.root);
        let mut painter = Painter::new(target);
        if let Some(c) = clip {
            painter.push_clip(&c);
        }
        self.shadow
            .paint_box_shadow(&mut painter, &device, corner_radius, spec)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// The active draw target: the topmost owning layer, or the root.
    fn resolve_target<'t>(layers: &'t mut [Layer], root: &'t mut Bitmap) -> &'t mut Bitmap {
        match layers.iter().rposition(|l| l.target.is_some()) {
            Some(i) => layers[i].target.as_mut().unwrap(),
            None => root,
        }
    }
}

/// Rounded-rect outline as a path (lines joined by quarter arcs).
fn rounded_rect_path(rect: &RectD, radii: &BorderRadii) -> Path {
    let (x1, y1, x2, y2) = (rect.x1, rect.y1, rect.x2, rect.y2);
    let tl = radii.top_left;
    let tr = radii.top_right;
    let br = radii.bottom_right;
    let bl = radii.bottom_left;
    let mut b = Path::builder();
    b.move_to(x1 + tl.horizontal as f64, y1);
    b.line_to(x2 - tr.horizontal as f64, y1);
    if !tr.is_zero() {
        b.elliptical_arc_to(
            x2,
            y1 + tr.vertical as f64,
            tr.horizontal as f64,
            tr.vertical as f64,
            0.0,
            false,
            true,
        );
    }
    b.line_to(x2, y2 - br.vertical as f64);
    if !br.is_zero() {
        b.elliptical_arc_to(
            x2 - br.horizontal as f64,
            y2,
            br.horizontal as f64,
            br.vertical as f64,
            0.0,
            false,
            true,
        );
    }
    b.line_to(x1 + bl.horizontal as f64, y2);
    if !bl.is_zero() {
        b.elliptical_arc_to(
            x1,
            y2 - bl.vertical as f64,
            bl.horizontal as f64,
            bl.vertical as f64,
            0.0,
            false,
            true,
        );
    }
    b.line_to(x1, y1 + tl.vertical as f64);
    if !tl.is_zero() {
        b.elliptical_arc_to(
            x1 + tl.horizontal as f64,
            y1,
            tl.horizontal as f64,
            tl.vertical as f64,
            0.0,
            false,
            true,
        );
    }
    b.close();
    b.build()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::ShadowPlacement;

    fn draw_scene(canvas: &mut Canvas) {
        canvas
            .fill_rect(&RectD::new(2.0, 2.0, 12.0, 12.0), Color::from_rgb(200, 0, 0))
            .unwrap();
        canvas.draw_line(
            PointD::new(1.0, 14.0),
            PointD::new(15.0, 14.0),
            Color::BLACK,
            1,
        );
    }

    #[test]
    fn test_opacity_one_layer_is_identity() {
        let mut with_layer = Bitmap::create(16, 16).unwrap();
        {
            let mut canvas = Canvas::new(&mut with_layer);
            canvas.push_layer(1.0).unwrap();
            draw_scene(&mut canvas);
            canvas.pop_layer();
        }
        let mut without_layer = Bitmap::create(16, 16).unwrap();
        {
            let mut canvas = Canvas::new(&mut without_layer);
            draw_scene(&mut canvas);
        }
        assert_eq!(with_layer, without_layer);
    }

    #[test]
    fn test_translucent_layer_scales_alpha_on_pop() {
        let mut bmp = Bitmap::create(16, 16).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.push_layer(0.5).unwrap();
            canvas
                .fill_rect(&RectD::new(0.0, 0.0, 16.0, 16.0), Color::BLACK)
                .unwrap();
            // Offscreen until popped.
            canvas.pop_layer();
        }
        let a = bmp.get_pixel(8, 8).a;
        assert!((a as i32 - 128).abs() <= 2, "alpha was {a}");
    }

    #[test]
    fn test_layer_is_isolated_until_pop() {
        let mut bmp = Bitmap::create(8, 8).unwrap();
        let mut canvas = Canvas::new(&mut bmp);
        canvas.push_layer(0.5).unwrap();
        canvas
            .fill_rect(&RectD::new(0.0, 0.0, 8.0, 8.0), Color::BLACK)
            .unwrap();
        canvas.flatten();
        assert_eq!(canvas.layer_count(), 1);
    }

    #[test]
    #[should_panic(expected = "last remaining canvas layer")]
    fn test_popping_last_layer_panics() {
        let mut bmp = Bitmap::create(4, 4).unwrap();
        let mut canvas = Canvas::new(&mut bmp);
        canvas.pop_layer();
    }

    #[test]
    fn test_apply_transform_translates_drawing() {
        let mut bmp = Bitmap::create(20, 20).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.apply_transform(&AffineTransform::translation(10.0, 10.0));
            canvas
                .fill_rect(&RectD::new(0.0, 0.0, 4.0, 4.0), Color::BLACK)
                .unwrap();
        }
        assert_eq!(bmp.get_pixel(1, 1), Color::TRANSPARENT);
        assert_eq!(bmp.get_pixel(11, 11), Color::BLACK);
    }

    #[test]
    fn test_transform_composes_in_existing_space() {
        // Scale already applied: a translation multiplied in afterwards is
        // expressed in the scaled space.
        let mut bmp = Bitmap::create(30, 30).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.apply_transform(&AffineTransform::scaling(2.0, 2.0));
            canvas.apply_transform(&AffineTransform::translation(5.0, 5.0));
            canvas
                .fill_rect(&RectD::new(0.0, 0.0, 2.0, 2.0), Color::BLACK)
                .unwrap();
        }
        // Device position: (5,5) scaled by 2 → (10,10); extent 2×2 → 4×4.
        assert_eq!(bmp.get_pixel(10, 10), Color::BLACK);
        assert_eq!(bmp.get_pixel(13, 13), Color::BLACK);
        assert_eq!(bmp.get_pixel(15, 15), Color::TRANSPARENT);
    }

    #[test]
    fn test_clip_rect_translation_fast_path() {
        let mut bmp = Bitmap::create(20, 20).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.set_clip_rect(&RectD::new(5.0, 5.0, 10.0, 10.0));
            canvas
                .fill_rect(&RectD::new(0.0, 0.0, 20.0, 20.0), Color::BLACK)
                .unwrap();
        }
        assert_eq!(bmp.get_pixel(4, 4), Color::TRANSPARENT);
        assert_eq!(bmp.get_pixel(7, 7), Color::BLACK);
        assert_eq!(bmp.get_pixel(9, 9), Color::BLACK);
        assert_eq!(bmp.get_pixel(11, 11), Color::TRANSPARENT);
    }

    #[test]
    fn test_rotated_clip_uses_bounding_box() {
        let mut bmp = Bitmap::create(40, 40).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.apply_transform(&AffineTransform::translation(20.0, 20.0));
            canvas.apply_transform(&AffineTransform::rotation(std::f64::consts::FRAC_PI_4));
            canvas.set_clip_rect(&RectD::new(-5.0, -5.0, 5.0, 5.0));
            let top_clip = canvas.layers.last().unwrap().clip.unwrap();
            // Bounding box of the rotated square: ±5·√2 around (20, 20).
            assert!(top_clip.x1 <= 13 && top_clip.x2 >= 27);
        }
    }

    #[test]
    fn test_nested_clips_intersect() {
        let mut bmp = Bitmap::create(20, 20).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.set_clip_rect(&RectD::new(0.0, 0.0, 10.0, 10.0));
            canvas.push_layer(1.0).unwrap();
            canvas.set_clip_rect(&RectD::new(5.0, 5.0, 15.0, 15.0));
            canvas
                .fill_rect(&RectD::new(0.0, 0.0, 20.0, 20.0), Color::BLACK)
                .unwrap();
            canvas.pop_layer();
        }
        assert_eq!(bmp.get_pixel(3, 3), Color::TRANSPARENT);
        assert_eq!(bmp.get_pixel(7, 7), Color::BLACK);
        assert_eq!(bmp.get_pixel(12, 12), Color::TRANSPARENT);
    }

    #[test]
    fn test_fill_path_under_rotation() {
        let mut bmp = Bitmap::create(40, 40).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.apply_transform(&AffineTransform::translation(20.0, 20.0));
            canvas.apply_transform(&AffineTransform::rotation(std::f64::consts::FRAC_PI_4));
            canvas
                .fill_path(
                    &Path::rectangle(-8.0, -8.0, 16.0, 16.0),
                    &PaintStyle::Solid(Color::BLACK),
                    WindingRule::EvenOdd,
                )
                .unwrap();
        }
        // The rotated square is a diamond: solid at center, corners of the
        // device-space bbox empty.
        assert_eq!(bmp.get_pixel(20, 20), Color::BLACK);
        assert_eq!(bmp.get_pixel(10, 10), Color::TRANSPARENT);
        assert_eq!(bmp.get_pixel(30, 10), Color::TRANSPARENT);
    }

    #[test]
    fn test_box_shadow_through_canvas() {
        let mut bmp = Bitmap::create(40, 40).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.apply_transform(&AffineTransform::translation(5.0, 5.0));
            canvas
                .draw_box_shadow(
                    &RectD::new(5.0, 5.0, 25.0, 25.0),
                    0,
                    &ShadowSpec {
                        color: Color::BLACK,
                        blur_radius: 0,
                        spread_distance: 0,
                        offset_x: 2,
                        offset_y: 2,
                        placement: ShadowPlacement::Outer,
                    },
                )
                .unwrap();
        }
        // Content rect (10,10)-(29,29) offset by (2,2).
        assert_eq!(bmp.get_pixel(12, 12), Color::BLACK);
        assert_eq!(bmp.get_pixel(31, 31), Color::BLACK);
        assert_eq!(bmp.get_pixel(11, 11), Color::TRANSPARENT);
    }

    #[test]
    fn test_rounded_rect_under_rotation_goes_through_paths() {
        let mut bmp = Bitmap::create(40, 40).unwrap();
        {
            let mut canvas = Canvas::new(&mut bmp);
            canvas.apply_transform(&AffineTransform::translation(20.0, 20.0));
            canvas.apply_transform(&AffineTransform::rotation(0.3));
            canvas
                .fill_rect_with_rounded_corners(
                    &RectD::new(-10.0, -10.0, 10.0, 10.0),
                    Color::BLACK,
                    BorderRadii::uniform(4),
                )
                .unwrap();
        }
        assert_eq!(bmp.get_pixel(20, 20), Color::BLACK);
    }
}
