//! Path geometry: segment storage, transformation, and flattening.
//!
//! A [`Path`] is an ordered, immutable sequence of segments produced by a
//! [`PathBuilder`]. Transforming a path yields a new path; the engine never
//! mutates path data in place. Curved segments are consumed through
//! [`Path::flatten`], which subdivides quadratic/cubic Beziers adaptively
//! (de Casteljau splitting against a distance tolerance) and converts
//! elliptical arcs to cubic runs first.

use crate::basics::{PointD, RectD};
use crate::transform::AffineTransform;

const CURVE_RECURSION_LIMIT: u32 = 32;

/// Default chord deviation tolerance, in device pixels.
pub const DEFAULT_FLATTEN_TOLERANCE: f64 = 0.25;

// ============================================================================
// Segments
// ============================================================================

/// One drawing command within a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(PointD),
    LineTo(PointD),
    QuadraticBezierTo {
        ctrl: PointD,
        to: PointD,
    },
    CubicBezierTo {
        ctrl1: PointD,
        ctrl2: PointD,
        to: PointD,
    },
    /// SVG endpoint-parameterized elliptical arc.
    EllipticalArcTo {
        to: PointD,
        radii: PointD,
        x_rotation: f64,
        large_arc: bool,
        sweep: bool,
    },
    Close,
}

// ============================================================================
// PathBuilder
// ============================================================================

/// Accumulates segments and produces an immutable [`Path`].
#[derive(Debug, Default, Clone)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::MoveTo(PointD::new(x, y)));
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::LineTo(PointD::new(x, y)));
        self
    }

    pub fn quadratic_bezier_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) -> &mut Self {
        self.segments.push(PathSegment::QuadraticBezierTo {
            ctrl: PointD::new(cx, cy),
            to: PointD::new(x, y),
        });
        self
    }

    pub fn cubic_bezier_to(
        &mut self,
        c1x: f64,
        c1y: f64,
        c2x: f64,
        c2y: f64,
        x: f64,
        y: f64,
    ) -> &mut Self {
        self.segments.push(PathSegment::CubicBezierTo {
            ctrl1: PointD::new(c1x, c1y),
            ctrl2: PointD::new(c2x, c2y),
            to: PointD::new(x, y),
        });
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn elliptical_arc_to(
        &mut self,
        x: f64,
        y: f64,
        rx: f64,
        ry: f64,
        x_rotation: f64,
        large_arc: bool,
        sweep: bool,
    ) -> &mut Self {
        self.segments.push(PathSegment::EllipticalArcTo {
            to: PointD::new(x, y),
            radii: PointD::new(rx, ry),
            x_rotation,
            large_arc,
            sweep,
        });
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(PathSegment::Close);
        self
    }

    pub fn build(&mut self) -> Path {
        Path {
            segments: std::mem::take(&mut self.segments),
        }
    }
}

// ============================================================================
// Path
// ============================================================================

/// Immutable segment sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn builder() -> PathBuilder {
        PathBuilder::new()
    }

    /// Convenience: a closed axis-aligned rectangle.
    pub fn rectangle(x: f64, y: f64, w: f64, h: f64) -> Path {
        let mut b = PathBuilder::new();
        b.move_to(x, y)
            .line_to(x + w, y)
            .line_to(x + w, y + h)
            .line_to(x, y + h)
            .close();
        b.build()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path with every coordinate mapped through `t`.
    ///
    /// Arc radii are scaled by the matrix axis scales and the arc rotation is
    /// advanced by the matrix rotation; a skewing transform therefore maps
    /// arcs approximately (flatten before transforming when exactness under
    /// skew matters).
    pub fn transformed(&self, t: &AffineTransform) -> Path {
        let map = |p: &PointD| -> PointD {
            let (x, y) = t.transform(p.x, p.y);
            PointD::new(x, y)
        };
        let rotation = t.shy.atan2(t.sx);
        let scale_x = (t.sx * t.sx + t.shy * t.shy).sqrt();
        let scale_y = (t.shx * t.shx + t.sy * t.sy).sqrt();
        let segments = self
            .segments
            .iter()
            .map(|seg| match seg {
                PathSegment::MoveTo(p) => PathSegment::MoveTo(map(p)),
                PathSegment::LineTo(p) => PathSegment::LineTo(map(p)),
                PathSegment::QuadraticBezierTo { ctrl, to } => PathSegment::QuadraticBezierTo {
                    ctrl: map(ctrl),
                    to: map(to),
                },
                PathSegment::CubicBezierTo { ctrl1, ctrl2, to } => PathSegment::CubicBezierTo {
                    ctrl1: map(ctrl1),
                    ctrl2: map(ctrl2),
                    to: map(to),
                },
                PathSegment::EllipticalArcTo {
                    to,
                    radii,
                    x_rotation,
                    large_arc,
                    sweep,
                } => PathSegment::EllipticalArcTo {
                    to: map(to),
                    radii: PointD::new(radii.x * scale_x, radii.y * scale_y),
                    x_rotation: x_rotation + rotation,
                    large_arc: *large_arc,
                    sweep: *sweep,
                },
                PathSegment::Close => PathSegment::Close,
            })
            .collect();
        Path { segments }
    }

    /// Shorthand for transforming by a pure translation.
    pub fn translated(&self, dx: f64, dy: f64) -> Path {
        self.transformed(&AffineTransform::translation(dx, dy))
    }

    /// Bounding box of the flattened geometry, or `None` for an empty path.
    pub fn bounding_box(&self) -> Option<RectD> {
        let mut bounds: Option<RectD> = None;
        let mut extend = |p: PointD| match &mut bounds {
            None => bounds = Some(RectD::new(p.x, p.y, p.x, p.y)),
            Some(r) => {
                r.x1 = r.x1.min(p.x);
                r.y1 = r.y1.min(p.y);
                r.x2 = r.x2.max(p.x);
                r.y2 = r.y2.max(p.y);
            }
        };
        self.flatten(DEFAULT_FLATTEN_TOLERANCE, &mut |from, to| {
            extend(from);
            extend(to);
        });
        bounds
    }

    /// Walk the path emitting straight-line chords `(from, to)` into `sink`.
    ///
    /// Curves are subdivided until their deviation from the chord is within
    /// `tolerance`. Segments with non-finite coordinates are dropped with a
    /// diagnostic; the rest of the path still renders.
    pub fn flatten(&self, tolerance: f64, sink: &mut dyn FnMut(PointD, PointD)) {
        let mut cursor = PointD::new(0.0, 0.0);
        let mut subpath_start = cursor;
        let mut have_cursor = false;

        let mut emit = |from: PointD, to: PointD, sink: &mut dyn FnMut(PointD, PointD)| {
            if !from.is_finite() || !to.is_finite() {
                log::debug!("dropping path chord with non-finite coordinates");
                return;
            }
            sink(from, to);
        };

        for seg in &self.segments {
            match seg {
                PathSegment::MoveTo(p) => {
                    cursor = *p;
                    subpath_start = *p;
                    have_cursor = true;
                }
                PathSegment::LineTo(p) => {
                    if have_cursor {
                        emit(cursor, *p, sink);
                    }
                    cursor = *p;
                    have_cursor = true;
                }
                PathSegment::QuadraticBezierTo { ctrl, to } => {
                    if have_cursor {
                        // Elevate to cubic; one subdivision routine serves both.
                        let c1 = PointD::new(
                            cursor.x + 2.0 / 3.0 * (ctrl.x - cursor.x),
                            cursor.y + 2.0 / 3.0 * (ctrl.y - cursor.y),
                        );
                        let c2 = PointD::new(
                            to.x + 2.0 / 3.0 * (ctrl.x - to.x),
                            to.y + 2.0 / 3.0 * (ctrl.y - to.y),
                        );
                        flatten_cubic(cursor, c1, c2, *to, tolerance, 0, &mut |a, b| {
                            emit(a, b, sink)
                        });
                    }
                    cursor = *to;
                    have_cursor = true;
                }
                PathSegment::CubicBezierTo { ctrl1, ctrl2, to } => {
                    if have_cursor {
                        flatten_cubic(cursor, *ctrl1, *ctrl2, *to, tolerance, 0, &mut |a, b| {
                            emit(a, b, sink)
                        });
                    }
                    cursor = *to;
                    have_cursor = true;
                }
                PathSegment::EllipticalArcTo {
                    to,
                    radii,
                    x_rotation,
                    large_arc,
                    sweep,
                } => {
                    if have_cursor {
                        flatten_arc(
                            cursor,
                            *to,
                            *radii,
                            *x_rotation,
                            *large_arc,
                            *sweep,
                            tolerance,
                            &mut |a, b| emit(a, b, sink),
                        );
                    }
                    cursor = *to;
                    have_cursor = true;
                }
                PathSegment::Close => {
                    if have_cursor
                        && (cursor.x != subpath_start.x || cursor.y != subpath_start.y)
                    {
                        emit(cursor, subpath_start, sink);
                    }
                    cursor = subpath_start;
                }
            }
        }
    }
}

// ============================================================================
// Curve subdivision
// ============================================================================

/// Recursive de Casteljau subdivision of a cubic Bezier.
///
/// The flatness test bounds the control-point deviation from the chord; when
/// the combined deviation squared falls within `tolerance * chord_length²`
/// the chord is emitted directly.
fn flatten_cubic(
    p0: PointD,
    p1: PointD,
    p2: PointD,
    p3: PointD,
    tolerance: f64,
    depth: u32,
    sink: &mut dyn FnMut(PointD, PointD),
) {
    if depth >= CURVE_RECURSION_LIMIT {
        sink(p0, p3);
        return;
    }

    let dx = p3.x - p0.x;
    let dy = p3.y - p0.y;
    let d1 = ((p1.x - p3.x) * dy - (p1.y - p3.y) * dx).abs();
    let d2 = ((p2.x - p3.x) * dy - (p2.y - p3.y) * dx).abs();
    let len_sq = dx * dx + dy * dy;

    if (d1 + d2) * (d1 + d2) <= tolerance * len_sq || len_sq < 1e-30 {
        sink(p0, p3);
        return;
    }

    // Split at t = 0.5.
    let mid = |a: PointD, b: PointD| PointD::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5);
    let p01 = mid(p0, p1);
    let p12 = mid(p1, p2);
    let p23 = mid(p2, p3);
    let p012 = mid(p01, p12);
    let p123 = mid(p12, p23);
    let p0123 = mid(p012, p123);

    flatten_cubic(p0, p01, p012, p0123, tolerance, depth + 1, sink);
    flatten_cubic(p0123, p123, p23, p3, tolerance, depth + 1, sink);
}

// ============================================================================
// Elliptical arc conversion
// ============================================================================

/// Convert an SVG endpoint-parameterized arc to cubic runs and flatten them.
///
/// Center parameterization follows the SVG rules: radii grown when the
/// endpoints cannot be joined, sweep split into at-most-quarter-turn cubic
/// slices.
#[allow(clippy::too_many_arguments)]
fn flatten_arc(
    from: PointD,
    to: PointD,
    radii: PointD,
    x_rotation: f64,
    large_arc: bool,
    sweep: bool,
    tolerance: f64,
    sink: &mut dyn FnMut(PointD, PointD),
) {
    let mut rx = radii.x.abs();
    let mut ry = radii.y.abs();
    if rx < 1e-12 || ry < 1e-12 {
        sink(from, to);
        return;
    }

    let (sin_a, cos_a) = x_rotation.sin_cos();

    // Midpoint in the rotated frame.
    let dx2 = (from.x - to.x) / 2.0;
    let dy2 = (from.y - to.y) / 2.0;
    let x1 = cos_a * dx2 + sin_a * dy2;
    let y1 = -sin_a * dx2 + cos_a * dy2;

    // Grow radii that cannot span the endpoints.
    let radii_check = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
    if radii_check > 1.0 {
        let s = radii_check.sqrt();
        rx *= s;
        ry *= s;
    }

    let prx = rx * rx;
    let pry = ry * ry;
    let px1 = x1 * x1;
    let py1 = y1 * y1;

    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let sq = ((prx * pry - prx * py1 - pry * px1) / (prx * py1 + pry * px1)).max(0.0);
    let coef = sign * sq.sqrt();
    let cx1 = coef * ((rx * y1) / ry);
    let cy1 = coef * -((ry * x1) / rx);

    let cx = (from.x + to.x) / 2.0 + cos_a * cx1 - sin_a * cy1;
    let cy = (from.y + to.y) / 2.0 + sin_a * cx1 + cos_a * cy1;

    let ux = (x1 - cx1) / rx;
    let uy = (y1 - cy1) / ry;
    let vx = (-x1 - cx1) / rx;
    let vy = (-y1 - cy1) / ry;

    let start_angle = uy.atan2(ux);
    let mut sweep_angle = {
        let n = ((ux * ux + uy * uy) * (vx * vx + vy * vy)).sqrt();
        let p = (ux * vx + uy * vy) / n;
        let sign = if ux * vy - uy * vx < 0.0 { -1.0 } else { 1.0 };
        sign * p.clamp(-1.0, 1.0).acos()
    };
    if !sweep && sweep_angle > 0.0 {
        sweep_angle -= 2.0 * std::f64::consts::PI;
    } else if sweep && sweep_angle < 0.0 {
        sweep_angle += 2.0 * std::f64::consts::PI;
    }

    if sweep_angle.abs() < 1e-10 {
        sink(from, to);
        return;
    }

    // Emit at-most-quarter-turn cubic slices.
    let slices = (sweep_angle.abs() / std::f64::consts::FRAC_PI_2).ceil().max(1.0) as usize;
    let slice_sweep = sweep_angle / slices as f64;
    let mut angle = start_angle;
    let mut prev = from;

    for i in 0..slices {
        let half = slice_sweep / 2.0;
        let x0 = half.cos();
        let y0 = half.sin();
        let t = (1.0 - x0) * 4.0 / 3.0;
        let ty = y0 - t * x0 / y0;

        let px = [x0, x0 + t, x0 + t, x0];
        let py = [-y0, -ty, ty, y0];

        let (sn, cs) = (angle + half).sin_cos();

        let mut pts = [PointD::new(0.0, 0.0); 4];
        for (j, pt) in pts.iter_mut().enumerate() {
            // Unit-arc control point, scaled and rotated into place.
            let ex = rx * (px[j] * cs - py[j] * sn);
            let ey = ry * (px[j] * sn + py[j] * cs);
            *pt = PointD::new(
                cx + cos_a * ex - sin_a * ey,
                cy + sin_a * ex + cos_a * ey,
            );
        }
        // Pin the slice ends so consecutive slices join exactly.
        pts[0] = prev;
        if i == slices - 1 {
            pts[3] = to;
        }

        flatten_cubic(pts[0], pts[1], pts[2], pts[3], tolerance, 0, sink);
        prev = pts[3];
        angle += slice_sweep;
    }
}

// ============================================================================
// Tests
// ============================================================================
