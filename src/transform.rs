//! Affine transformation matrix.
//!
//! 2D affine transformations: rotation, scaling, translation, and skewing.
//! `multiply` composes by post-multiplication, so applying a transform to a
//! canvas layer maps new geometry through the pre-existing coordinate space.

/// Epsilon for affine matrix comparisons.
pub const AFFINE_EPSILON: f64 = 1e-14;

/// 2D affine transformation matrix.
///
/// Stores six components: `[sx, shy, shx, sy, tx, ty]` representing the
/// matrix:
///
/// ```text
///   | sx  shx tx |
///   | shy  sy ty |
///   |  0    0  1 |
/// ```
///
/// Transform: `x' = x*sx + y*shx + tx`, `y' = x*shy + y*sy + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub sx: f64,
    pub shy: f64,
    pub shx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    // ====================================================================
    // Construction
    // ====================================================================

    /// Identity matrix.
    pub fn identity() -> Self {
        Self {
            sx: 1.0,
            shy: 0.0,
            shx: 0.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Custom matrix from six components.
    pub fn new(sx: f64, shy: f64, shx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self {
            sx,
            shy,
            shx,
            sy,
            tx,
            ty,
        }
    }

    /// Translation matrix.
    pub fn translation(x: f64, y: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    /// Rotation matrix (angle in radians).
    pub fn rotation(a: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        Self::new(ca, sa, -sa, ca, 0.0, 0.0)
    }

    /// Non-uniform scaling matrix.
    pub fn scaling(x: f64, y: f64) -> Self {
        Self::new(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    /// Skewing (shear) matrix (angles in radians).
    pub fn skewing(x: f64, y: f64) -> Self {
        Self::new(1.0, y.tan(), x.tan(), 1.0, 0.0, 0.0)
    }

    // ====================================================================
    // Operations
    // ====================================================================

    /// Post-multiply: `self = self * m`.
    pub fn multiply(&mut self, m: &AffineTransform) -> &mut Self {
        let t0 = self.sx * m.sx + self.shy * m.shx;
        let t2 = self.shx * m.sx + self.sy * m.shx;
        let t4 = self.tx * m.sx + self.ty * m.shx + m.tx;
        self.shy = self.sx * m.shy + self.shy * m.sy;
        self.sy = self.shx * m.shy + self.sy * m.sy;
        self.ty = self.tx * m.shy + self.ty * m.sy + m.ty;
        self.sx = t0;
        self.shx = t2;
        self.tx = t4;
        self
    }

    /// Pre-multiply: `self = m * self`.
    pub fn premultiply(&mut self, m: &AffineTransform) -> &mut Self {
        let mut t = *m;
        t.multiply(self);
        *self = t;
        self
    }

    /// Returning variant of `multiply`.
    pub fn multiplied(&self, m: &AffineTransform) -> Self {
        let mut t = *self;
        t.multiply(m);
        t
    }

    /// Translate in place.
    pub fn translate(&mut self, x: f64, y: f64) -> &mut Self {
        self.tx += x;
        self.ty += y;
        self
    }

    /// Invert the matrix in place. Degenerate matrices produce non-finite
    /// components; callers guard with `determinant()` where it matters.
    pub fn invert(&mut self) -> &mut Self {
        let d = 1.0 / self.determinant();
        let t0 = self.sy * d;
        self.sy = self.sx * d;
        self.shy = -self.shy * d;
        self.shx = -self.shx * d;
        let t4 = -self.tx * t0 - self.ty * self.shx;
        self.ty = -self.tx * self.shy - self.ty * self.sy;
        self.sx = t0;
        self.tx = t4;
        self
    }

    pub fn determinant(&self) -> f64 {
        self.sx * self.sy - self.shy * self.shx
    }

    // ====================================================================
    // Application
    // ====================================================================

    /// Map a point through the matrix.
    #[inline]
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.sx + y * self.shx + self.tx,
            x * self.shy + y * self.sy + self.ty,
        )
    }

    // ====================================================================
    // Queries
    // ====================================================================

    /// True when the matrix carries no rotation, scale, or skew — only a
    /// translation (or nothing). The canvas clip logic uses this to keep
    /// axis-aligned clip rectangles exact.
    pub fn is_identity_or_translation(&self) -> bool {
        (self.sx - 1.0).abs() <= AFFINE_EPSILON
            && self.shy.abs() <= AFFINE_EPSILON
            && self.shx.abs() <= AFFINE_EPSILON
            && (self.sy - 1.0).abs() <= AFFINE_EPSILON
    }

    pub fn is_identity(&self) -> bool {
        self.is_identity_or_translation()
            && self.tx.abs() <= AFFINE_EPSILON
            && self.ty.abs() <= AFFINE_EPSILON
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_identity_transform() {
        let m = AffineTransform::identity();
        let (x, y) = m.transform(3.0, 4.0);
        assert_close(x, 3.0);
        assert_close(y, 4.0);
        assert!(m.is_identity());
    }

    #[test]
    fn test_translation() {
        let m = AffineTransform::translation(10.0, -5.0);
        let (x, y) = m.transform(1.0, 2.0);
        assert_close(x, 11.0);
        assert_close(y, -3.0);
        assert!(m.is_identity_or_translation());
        assert!(!m.is_identity());
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let m = AffineTransform::rotation(std::f64::consts::FRAC_PI_2);
        let (x, y) = m.transform(1.0, 0.0);
        assert_close(x, 0.0);
        assert_close(y, 1.0);
        assert!(!m.is_identity_or_translation());
    }

    #[test]
    fn test_scaling() {
        let m = AffineTransform::scaling(2.0, 3.0);
        let (x, y) = m.transform(4.0, 5.0);
        assert_close(x, 8.0);
        assert_close(y, 15.0);
    }

    #[test]
    fn test_multiply_is_post_multiplication() {
        // Scale then translate: point is scaled first, then moved.
        let mut m = AffineTransform::scaling(2.0, 2.0);
        m.multiply(&AffineTransform::translation(10.0, 0.0));
        let (x, y) = m.transform(1.0, 1.0);
        assert_close(x, 12.0);
        assert_close(y, 2.0);
    }

    #[test]
    fn test_invert_roundtrip() {
        let mut m = AffineTransform::rotation(0.7);
        m.multiply(&AffineTransform::scaling(2.0, 0.5));
        m.multiply(&AffineTransform::translation(3.0, -8.0));

        let mut inv = m;
        inv.invert();

        let (x, y) = m.transform(5.0, 6.0);
        let (rx, ry) = inv.transform(x, y);
        assert_close(rx, 5.0);
        assert_close(ry, 6.0);
    }

    #[test]
    fn test_determinant() {
        assert_close(AffineTransform::scaling(2.0, 3.0).determinant(), 6.0);
        assert_close(AffineTransform::rotation(1.2).determinant(), 1.0);
    }
}
