//! Anti-aliased drawing primitives.
//!
//! Lines use Xiaolin Wu's algorithm with two coverage policies; circles and
//! ellipses use an integer incremental coverage machine that tracks the
//! perimeter at a subpixel resolution of 255 and fills the interior with
//! solid spans, touching every destination pixel exactly once so translucent
//! colors never double-blend. Rounded-rectangle fills and path strokes are
//! built on top of these primitives.

use crate::basics::{ifloor, iround, PointD, PointI, RectI};
use crate::color::Color;
use crate::painter::Painter;
use crate::path::{Path, DEFAULT_FLATTEN_TOLERANCE};

/// Fixed subpixel resolution of the perimeter tracker.
const SUBPIXEL_RESOLUTION: i64 = 255;

// ============================================================================
// Corner radii
// ============================================================================

/// Elliptical corner radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CornerRadius {
    pub horizontal: i32,
    pub vertical: i32,
}

impl CornerRadius {
    pub fn new(horizontal: i32, vertical: i32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn uniform(r: i32) -> Self {
        Self::new(r, r)
    }

    pub fn is_zero(&self) -> bool {
        self.horizontal <= 0 || self.vertical <= 0
    }
}

/// Radii of the four corners of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderRadii {
    pub top_left: CornerRadius,
    pub top_right: CornerRadius,
    pub bottom_right: CornerRadius,
    pub bottom_left: CornerRadius,
}

impl BorderRadii {
    pub fn uniform(r: i32) -> Self {
        let c = CornerRadius::uniform(r);
        Self {
            top_left: c,
            top_right: c,
            bottom_right: c,
            bottom_left: c,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top_left.is_zero()
            && self.top_right.is_zero()
            && self.bottom_right.is_zero()
            && self.bottom_left.is_zero()
    }

    /// Scale all four radii by a single factor when the sum of two adjacent
    /// radii exceeds the corresponding side length. The factor comes from the
    /// worst-case side, so corner pairs never overlap.
    pub fn shrink_to_fit(&mut self, width: i32, height: i32) {
        let mut f = 1.0_f64;
        let mut consider = |sum: i32, side: i32| {
            if sum > 0 {
                let t = side as f64 / sum as f64;
                if t < f {
                    f = t;
                }
            }
        };
        consider(self.top_left.horizontal + self.top_right.horizontal, width);
        consider(
            self.bottom_left.horizontal + self.bottom_right.horizontal,
            width,
        );
        consider(self.top_left.vertical + self.bottom_left.vertical, height);
        consider(self.top_right.vertical + self.bottom_right.vertical, height);
        if f < 1.0 {
            for c in [
                &mut self.top_left,
                &mut self.top_right,
                &mut self.bottom_right,
                &mut self.bottom_left,
            ] {
                c.horizontal = (c.horizontal as f64 * f) as i32;
                c.vertical = (c.vertical as f64 * f) as i32;
            }
        }
    }
}

// ============================================================================
// Coverage policy
// ============================================================================

/// How much of a line receives fractional coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoveragePolicy {
    /// True anti-aliasing along the whole line.
    Full,
    /// Only the endpoint columns are anti-aliased; interior columns are
    /// plotted at full coverage on the rounded sample row.
    OnlyEnds,
}

// ============================================================================
// AntiAliasingPainter
// ============================================================================

/// Anti-aliased primitive painter over a clipping [`Painter`].
pub struct AntiAliasingPainter<'a, 'b> {
    painter: &'a mut Painter<'b>,
}

impl<'a, 'b> AntiAliasingPainter<'a, 'b> {
    pub fn new(painter: &'a mut Painter<'b>) -> Self {
        Self { painter }
    }

    pub fn painter(&mut self) -> &mut Painter<'b> {
        self.painter
    }

    // ========================================================================
    // Lines
    // ========================================================================

    /// Anti-aliased line with full coverage.
    ///
    /// A thickness above 1 is approximated by stamping a filled square of
    /// side `thickness` at each sampled point — not a true thick-line
    /// anti-aliasing.
    pub fn draw_line(&mut self, p0: PointD, p1: PointD, color: Color, thickness: i32) {
        self.draw_line_with_policy(p0, p1, color, thickness, CoveragePolicy::Full);
    }

    /// Line with anti-aliasing at the endpoints only.
    pub fn draw_aliased_line(&mut self, p0: PointD, p1: PointD, color: Color, thickness: i32) {
        self.draw_line_with_policy(p0, p1, color, thickness, CoveragePolicy::OnlyEnds);
    }

    /// Xiaolin Wu's line algorithm.
    ///
    /// Steep lines transpose the axes; iteration always runs from low x to
    /// high x. Interior columns plot two weighted pixels from the fractional
    /// part of the y intercept (policy `Full`) or one full pixel on the
    /// rounded row (policy `OnlyEnds`); the endpoint columns weigh coverage
    /// by both the fractional position and the remaining gap to the pixel
    /// edge.
    pub fn draw_line_with_policy(
        &mut self,
        p0: PointD,
        p1: PointD,
        color: Color,
        thickness: i32,
        policy: CoveragePolicy,
    ) {
        if !p0.is_finite() || !p1.is_finite() {
            log::debug!("dropping line with non-finite endpoints");
            return;
        }

        let (mut x0, mut y0, mut x1, mut y1) = (p0.x, p0.y, p1.x, p1.y);
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            std::mem::swap(&mut x0, &mut y0);
            std::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let gradient = if dx == 0.0 { 1.0 } else { (y1 - y0) / dx };

        let fpart = |v: f64| v - v.floor();
        let rfpart = |v: f64| 1.0 - (v - v.floor());

        let mut plot = |painter: &mut Painter<'_>, x: i32, y: i32, c: f64| {
            let cover = (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
            if cover == 0 {
                return;
            }
            let (px, py) = if steep { (y, x) } else { (x, y) };
            if thickness <= 1 {
                painter.blend_pixel(px, py, color, cover);
            } else {
                let half = thickness / 2;
                let rect = RectI::from_origin_size(px - half, py - half, thickness, thickness, 1);
                painter.fill_rect(&rect, color.with_alpha(Color::mult_cover(color.a, cover)));
            }
        };

        // First endpoint.
        let xend = iround(x0);
        let yend = y0 + gradient * (xend as f64 - x0);
        let xgap = rfpart(x0 + 0.5);
        let xpxl1 = xend;
        let ypxl1 = ifloor(yend);
        plot(self.painter, xpxl1, ypxl1, rfpart(yend) * xgap);
        plot(self.painter, xpxl1, ypxl1 + 1, fpart(yend) * xgap);
        let mut intery = yend + gradient;

        // Second endpoint.
        let xend2 = iround(x1);
        let yend2 = y1 + gradient * (xend2 as f64 - x1);
        let xgap2 = fpart(x1 + 0.5);
        let xpxl2 = xend2;
        let ypxl2 = ifloor(yend2);
        plot(self.painter, xpxl2, ypxl2, rfpart(yend2) * xgap2);
        plot(self.painter, xpxl2, ypxl2 + 1, fpart(yend2) * xgap2);

        // Interior columns.
        for x in (xpxl1 + 1)..xpxl2 {
            match policy {
                CoveragePolicy::Full => {
                    let row = ifloor(intery);
                    plot(self.painter, x, row, rfpart(intery));
                    plot(self.painter, x, row + 1, fpart(intery));
                }
                CoveragePolicy::OnlyEnds => {
                    plot(self.painter, x, iround(intery), 1.0);
                }
            }
            intery += gradient;
        }
    }

    // ========================================================================
    // Circles and ellipses
    // ========================================================================

    /// Anti-aliased filled circle.
    ///
    /// `center` names the pixel whose center the circle is centered on; the
    /// disc spans `2·radius + 1` pixel rows and columns. One octant is traced
    /// by the incremental machine and mirrored eight ways.
    pub fn draw_circle(&mut self, center: PointI, radius: i32, color: Color) {
        if radius <= 0 {
            if radius == 0 {
                self.painter.blend_pixel(center.x, center.y, color, 255);
            }
            return;
        }
        let cols = trace_quadrant(radius, radius);
        let handoff = cols.last().map(|c| c.0 - 1).unwrap_or(-1);
        // The transposed octant: identical to `cols` by symmetry, so the
        // eight-way mirror stays exact.
        let rows = trace_rows(radius, radius, handoff);
        self.compose_ellipse(center, &cols, &rows, color);
    }

    /// Anti-aliased filled ellipse inscribed in `rect`.
    pub fn draw_ellipse(&mut self, rect: &RectI, color: Color) {
        let rx = (rect.width() - 1) / 2;
        let ry = (rect.height() - 1) / 2;
        let center = PointI::new(rect.x1 + rx, rect.y1 + ry);
        self.draw_ellipse_at(center, rx, ry, color);
    }

    /// Anti-aliased filled ellipse with explicit semi-axes.
    pub fn draw_ellipse_at(&mut self, center: PointI, rx: i32, ry: i32, color: Color) {
        if rx <= 0 || ry <= 0 {
            if rx == 0 && ry == 0 {
                self.painter.blend_pixel(center.x, center.y, color, 255);
            } else if rx >= 0 && ry >= 0 {
                // Degenerate: a 1-pixel-thick bar.
                let r = RectI::new(center.x - rx, center.y - ry, center.x + rx, center.y + ry);
                self.painter.fill_rect(&r, color);
            }
            return;
        }
        if rx == ry {
            self.draw_circle(center, rx, color);
            return;
        }

        // First pass walks columns along the major direction of the flat
        // arcs; the swapped-axis pass owns the remaining rows outright.
        let cols = trace_quadrant(rx, ry);
        let handoff = cols.last().map(|c| c.0 - 1).unwrap_or(-1);
        let rows = trace_rows(ry, rx, handoff);
        self.compose_ellipse(center, &cols, &rows, color);
    }

    /// Emit spans and perimeter pixels for the traced quadrant data.
    ///
    /// Row ownership keeps the two sources disjoint: the row-wise data (the
    /// mirror arm for circles, the swapped-axis pass for ellipses) owns rows
    /// `0..=handoff`; the column-wise cap data owns every row above. Each
    /// destination pixel is painted exactly once.
    fn compose_ellipse(
        &mut self,
        center: PointI,
        cols: &[(i32, u8)],
        rows: &[(i32, u8)],
        color: Color,
    ) {
        if cols.is_empty() {
            return;
        }

        // Rows 0..=handoff: solid span plus one AA pixel per side.
        for (j, &(p, g)) in rows.iter().enumerate() {
            let j = j as i32;
            self.mirrored_span(center, j, p - 1, color);
            self.mirrored_pixels(center, p, j, color, g);
        }

        // Cap rows (handoff+1 ..= q0): every traced column contributes its
        // perimeter pixel; interior spans come from the run boundaries where
        // the perimeter steps down a row.
        for (i, &(q, f)) in cols.iter().enumerate() {
            self.mirrored_pixels(center, i as i32, q, color, f);
        }
        for i in 1..cols.len() {
            let (q_here, _) = cols[i];
            let (q_prev, _) = cols[i - 1];
            // Rows q_here .. q_prev-1 first reach the interior at column i.
            for j in q_here..q_prev {
                self.mirrored_span(center, j, i as i32 - 1, color);
            }
        }
    }

    /// Solid horizontal span at rows `center.y ± j`, columns
    /// `center.x − half ..= center.x + half`.
    fn mirrored_span(&mut self, center: PointI, j: i32, half: i32, color: Color) {
        if half < 0 {
            return;
        }
        let len = half * 2 + 1;
        self.painter
            .blend_hline(center.x - half, center.y - j, len, color, 255);
        if j != 0 {
            self.painter
                .blend_hline(center.x - half, center.y + j, len, color, 255);
        }
    }

    /// Anti-aliased perimeter pixels at the four mirrors of (±dx, ±dy).
    fn mirrored_pixels(&mut self, center: PointI, dx: i32, dy: i32, color: Color, cover: u8) {
        if cover == 0 {
            return;
        }
        let xs: &[i32] = if dx == 0 { &[0] } else { &[-1, 1] };
        let ys: &[i32] = if dy == 0 { &[0] } else { &[-1, 1] };
        for &sy in ys {
            for &sx in xs {
                self.painter
                    .blend_pixel(center.x + sx * dx, center.y + sy * dy, color, cover);
            }
        }
    }

    // ========================================================================
    // Rounded rectangles
    // ========================================================================

    /// Fill `rect` with rounded corners.
    ///
    /// The straight regions are filled with clipped horizontal runs; each
    /// corner draws a quarter ellipse clipped to its corner quadrant, which
    /// keeps every pixel painted exactly once.
    pub fn fill_rect_with_rounded_corners(&mut self, rect: &RectI, color: Color, radii: BorderRadii) {
        let mut rect = *rect;
        rect.normalize();
        if radii.is_zero() {
            self.painter.fill_rect(&rect, color);
            return;
        }
        let mut radii = radii;
        radii.shrink_to_fit(rect.width(), rect.height());

        let tl = radii.top_left;
        let tr = radii.top_right;
        let br = radii.bottom_right;
        let bl = radii.bottom_left;

        // Straight region, row by row: each row's bounds step past whichever
        // corner quadrants cover it.
        for y in rect.y1..=rect.y2 {
            let mut left = rect.x1;
            let mut right = rect.x2;
            if y < rect.y1 + tl.vertical {
                left = left.max(rect.x1 + tl.horizontal);
            }
            if y < rect.y1 + tr.vertical {
                right = right.min(rect.x2 - tr.horizontal);
            }
            if y > rect.y2 - bl.vertical {
                left = left.max(rect.x1 + bl.horizontal);
            }
            if y > rect.y2 - br.vertical {
                right = right.min(rect.x2 - br.horizontal);
            }
            if left <= right {
                self.painter
                    .blend_hline(left, y, right - left + 1, color, 255);
            }
        }

        // Corner quadrants.
        let corners = [
            // (quadrant clip, ellipse center, radii)
            (
                RectI::new(
                    rect.x1,
                    rect.y1,
                    rect.x1 + tl.horizontal - 1,
                    rect.y1 + tl.vertical - 1,
                ),
                PointI::new(rect.x1 + tl.horizontal, rect.y1 + tl.vertical),
                tl,
            ),
            (
                RectI::new(
                    rect.x2 - tr.horizontal + 1,
                    rect.y1,
                    rect.x2,
                    rect.y1 + tr.vertical - 1,
                ),
                PointI::new(rect.x2 - tr.horizontal, rect.y1 + tr.vertical),
                tr,
            ),
            (
                RectI::new(
                    rect.x2 - br.horizontal + 1,
                    rect.y2 - br.vertical + 1,
                    rect.x2,
                    rect.y2,
                ),
                PointI::new(rect.x2 - br.horizontal, rect.y2 - br.vertical),
                br,
            ),
            (
                RectI::new(
                    rect.x1,
                    rect.y2 - bl.vertical + 1,
                    rect.x1 + bl.horizontal - 1,
                    rect.y2,
                ),
                PointI::new(rect.x1 + bl.horizontal, rect.y2 - bl.vertical),
                bl,
            ),
        ];
        for (clip, center, radius) in corners {
            if radius.is_zero() || !clip.is_valid() {
                continue;
            }
            self.painter.push_clip(&clip);
            self.draw_ellipse_at(center, radius.horizontal, radius.vertical, color);
            self.painter.pop_clip();
        }
    }

    // ========================================================================
    // Path strokes
    // ========================================================================

    /// Stroke a path: straight segments draw directly, curved segments are
    /// flattened into chords by tolerance-based subdivision, and every chord
    /// is drawn with [`Self::draw_line`].
    pub fn stroke_path(&mut self, path: &Path, color: Color, thickness: i32) {
        let mut chords: Vec<(PointD, PointD)> = Vec::new();
        path.flatten(DEFAULT_FLATTEN_TOLERANCE, &mut |a, b| chords.push((a, b)));
        for (from, to) in chords {
            self.draw_line(from, to, color, thickness);
        }
    }
}

// ============================================================================
// Incremental quadrant tracer
// ============================================================================

/// Trace the flat quadrant arc of an ellipse with semi-axes `(a, b)`:
/// columns `i = 0..`, each yielding the perimeter row `q` and its coverage
/// fraction `f` (0..=254 at a subpixel resolution of 255).
///
/// Per column the machine runs three states: `predict` advances the tracked
/// subpixel height by its running difference, `minimize` walks the height by
/// single integer steps to the exact minimum of the squared ellipse-equation
/// error, and `correct` feeds the prediction residual back into the
/// difference (divided by 4 for non-circular ellipses, whose curvature
/// otherwise biases the prediction). The trace stops at the `i·b² ≥ q·a²`
/// boundary — for circles that is `i ≥ q`.
fn trace_quadrant(a: i32, b: i32) -> Vec<(i32, u8)> {
    let mut tracer = QuadrantTracer::new(a, b);
    let mut cols = Vec::with_capacity(a as usize + 1);

    let (q, f) = tracer.emit();
    cols.push((q, f));

    let a2 = a as i64 * a as i64;
    let b2 = b as i64 * b as i64;
    loop {
        tracer.advance();
        let (q, f) = tracer.emit();
        let lhs = tracer.i * b2;
        let rhs = q as i64 * a2;
        // The boundary column belongs to both octants; emit it, then stop.
        if lhs <= rhs {
            cols.push((q, f));
        }
        if lhs >= rhs {
            break;
        }
    }
    cols
}

/// Trace perimeter columns for rows `0..=limit` with swapped axes. Used by
/// the ellipse's second pass, which owns those rows outright regardless of
/// where its own region boundary would fall.
fn trace_rows(a: i32, b: i32, limit: i32) -> Vec<(i32, u8)> {
    let mut tracer = QuadrantTracer::new(a, b);
    let mut rows = Vec::new();
    if limit < 0 {
        return rows;
    }
    let (q, f) = tracer.emit();
    rows.push((q, f));
    for _ in 0..limit {
        tracer.advance();
        rows.push(tracer.emit());
    }
    rows
}

/// Incremental integer state for one quadrant trace.
///
/// Tracks `y` — the subpixel height of the true arc over the current column —
/// and the squared-equation error `e = b²·(R·i)² + a²·y² − a²·b²·R²`, which
/// is zero exactly on the arc.
struct QuadrantTracer {
    a2: i128,
    b2: i128,
    /// Current column.
    i: i64,
    /// Subpixel height of the arc at column `i`.
    y: i64,
    /// Running first-order difference of `y` (prediction step).
    dy: i64,
    /// Squared-equation error at (i, y).
    e: i128,
    circular: bool,
}

impl QuadrantTracer {
    fn new(a: i32, b: i32) -> Self {
        Self {
            a2: (a as i128) * (a as i128),
            b2: (b as i128) * (b as i128),
            i: 0,
            y: SUBPIXEL_RESOLUTION * b as i64,
            dy: 0,
            e: 0,
            circular: a == b,
        }
    }

    /// Perimeter row and coverage fraction for the current column, measured
    /// from the column's center sample.
    fn emit(&self) -> (i32, u8) {
        let v = self.y + SUBPIXEL_RESOLUTION / 2;
        let q = (v / SUBPIXEL_RESOLUTION) as i32;
        let f = (v % SUBPIXEL_RESOLUTION) as u8;
        (q, f)
    }

    fn advance(&mut self) {
        const R: i128 = SUBPIXEL_RESOLUTION as i128;
        self.i += 1;

        // The x term of the error grows by b²·R²·(2i − 1).
        self.e += self.b2 * R * R * (2 * self.i as i128 - 1);

        // predict: step the height by its running difference.
        let predicted = self.y + self.dy;
        self.e += self.a2
            * ((predicted as i128) * (predicted as i128) - (self.y as i128) * (self.y as i128));
        self.y = predicted;

        // minimize: integer descent on |e|; moving y by ∓1 changes e by
        // a²·(1 ∓ 2y).
        loop {
            let down = self.e + self.a2 * (1 - 2 * self.y as i128);
            if down.abs() < self.e.abs() {
                self.e = down;
                self.y -= 1;
                continue;
            }
            let up = self.e + self.a2 * (1 + 2 * self.y as i128);
            if up.abs() < self.e.abs() {
                self.e = up;
                self.y += 1;
                continue;
            }
            break;
        }

        // correct: feed the residual back into the difference. Non-circular
        // ellipses damp the feedback to a quarter.
        let residual = self.y - predicted;
        self.dy += if self.circular {
            residual
        } else {
            residual / 4
        };
    }
}

// ============================================================================
// Tests
// ============================================================================
