//! Sliding-window stack blur.
//!
//! Two orthogonal 1-D passes (horizontal, then vertical), each a sliding
//! weighted sum over a circular stack of `2·radius + 1` entries carrying a
//! triangular (tent) weighting that peaks at the center. The normalization
//! divide is replaced by a per-radius `(multiplier, shift)` table lookup.
//! Out-of-bounds samples clamp to the nearest edge pixel. Cost is
//! O(width·height) per pass independent of the radius; that asymptotic
//! property is part of the contract.

use crate::bitmap::Bitmap;
use crate::color::Color;

// ============================================================================
// Lookup tables (fast division replacement)
// ============================================================================

/// Multiplication factors approximating `1 / kernel_weight`, indexed by
/// radius (0..254).
#[rustfmt::skip]
const STACK_BLUR_MUL: [u32; 255] = [
    512,512,456,512,328,456,335,512,405,328,271,456,388,335,292,512,
    454,405,364,328,298,271,496,456,420,388,360,335,312,292,273,512,
    482,454,428,405,383,364,345,328,312,298,284,271,259,496,475,456,
    437,420,404,388,374,360,347,335,323,312,302,292,282,273,265,512,
    497,482,468,454,441,428,417,405,394,383,373,364,354,345,337,328,
    320,312,305,298,291,284,278,271,265,259,507,496,485,475,465,456,
    446,437,428,420,412,404,396,388,381,374,367,360,354,347,341,335,
    329,323,318,312,307,302,297,292,287,282,278,273,269,265,261,512,
    505,497,489,482,475,468,461,454,447,441,435,428,422,417,411,405,
    399,394,389,383,378,373,368,364,359,354,350,345,341,337,332,328,
    324,320,316,312,309,305,301,298,294,291,287,284,281,278,274,271,
    268,265,262,259,257,507,501,496,491,485,480,475,470,465,460,456,
    451,446,442,437,433,428,424,420,416,412,408,404,400,396,392,388,
    385,381,377,374,370,367,363,360,357,354,350,347,344,341,338,335,
    332,329,326,323,320,318,315,312,310,307,304,302,299,297,294,292,
    289,287,285,282,280,278,275,273,271,269,267,265,263,261,259,
];

/// Right-shift amounts paired with [`STACK_BLUR_MUL`], indexed by radius.
#[rustfmt::skip]
const STACK_BLUR_SHR: [u32; 255] = [
     9, 11, 12, 13, 13, 14, 14, 15, 15, 15, 15, 16, 16, 16, 16, 17,
    17, 17, 17, 17, 17, 17, 18, 18, 18, 18, 18, 18, 18, 18, 18, 19,
    19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 20, 20, 20,
    20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 21,
    21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 21,
    21, 21, 21, 21, 21, 21, 21, 21, 21, 21, 22, 22, 22, 22, 22, 22,
    22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22,
    22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 22, 23,
    23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23,
    23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23,
    23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23, 23,
    23, 23, 23, 23, 23, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
    24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24, 24,
];

const MAX_RADIUS: u32 = 254;

// ============================================================================
// Stack blur
// ============================================================================

/// Blur `bitmap` in place with the given radius.
///
/// `transparent_fill` supplies the color channels used for fully transparent
/// source pixels (their alpha stays 0), so the blur does not bleed stale
/// channel data into transparent regions. A radius of 0 is the identity.
pub fn stack_blur(bitmap: &mut Bitmap, radius: u32, transparent_fill: Color) {
    if radius == 0 || bitmap.width() == 0 || bitmap.height() == 0 {
        return;
    }
    let radius = radius.min(MAX_RADIUS) as usize;

    // Transparent pixels contribute the fill color (alpha forced to 0).
    let fill = transparent_fill.with_alpha(0);
    for px in bitmap.data_mut().chunks_exact_mut(4) {
        if px[3] == 0 {
            px[0] = fill.r;
            px[1] = fill.g;
            px[2] = fill.b;
        }
    }

    let w = bitmap.width() as usize;
    let h = bitmap.height() as usize;

    let mut line: Vec<[u8; 4]> = Vec::with_capacity(w.max(h));

    // Horizontal pass.
    for y in 0..h {
        line.clear();
        let row = bitmap.row(y as i32);
        line.extend(row.chunks_exact(4).map(|p| [p[0], p[1], p[2], p[3]]));
        blur_span(&mut line, radius);
        let row = bitmap.row_mut(y as i32);
        for (px, src) in row.chunks_exact_mut(4).zip(&line) {
            px.copy_from_slice(src);
        }
    }

    // Vertical pass.
    let stride = w * 4;
    for x in 0..w {
        let data = bitmap.data_mut();
        line.clear();
        line.extend((0..h).map(|y| {
            let off = y * stride + x * 4;
            [data[off], data[off + 1], data[off + 2], data[off + 3]]
        }));
        blur_span(&mut line, radius);
        for (y, src) in line.iter().enumerate() {
            let off = y * stride + x * 4;
            data[off..off + 4].copy_from_slice(src);
        }
    }
}

/// One sliding-window pass over a single line of pixels, in place.
///
/// The circular stack holds the `2·radius + 1` samples currently inside the
/// window; `sum_in`/`sum_out` track the rising and falling halves of the tent
/// so each step is O(1). Reads lead writes by `radius`, so operating in place
/// is sound.
fn blur_span(line: &mut [[u8; 4]], radius: usize) {
    let n = line.len();
    if n == 0 {
        return;
    }
    let last = n - 1;
    let div = radius * 2 + 1;
    let mul = STACK_BLUR_MUL[radius] as u64;
    let shr = STACK_BLUR_SHR[radius];

    let mut stack = vec![[0u8; 4]; div];
    let mut sum = [0u64; 4];
    let mut sum_in = [0u64; 4];
    let mut sum_out = [0u64; 4];

    let add = |acc: &mut [u64; 4], p: [u8; 4], w: u64| {
        for c in 0..4 {
            acc[c] += p[c] as u64 * w;
        }
    };
    let sub = |acc: &mut [u64; 4], p: [u8; 4]| {
        for c in 0..4 {
            acc[c] -= p[c] as u64;
        }
    };

    // Prime the window: the left half clamps to the first pixel, the right
    // half reads ahead with edge clamping.
    let first = line[0];
    for i in 0..=radius {
        stack[i] = first;
        add(&mut sum, first, (i + 1) as u64);
        add(&mut sum_out, first, 1);
    }
    for i in 1..=radius {
        let p = line[i.min(last)];
        stack[i + radius] = p;
        add(&mut sum, p, (radius + 1 - i) as u64);
        add(&mut sum_in, p, 1);
    }

    let mut stack_ptr = radius;
    let mut read_pos = radius.min(last);

    for x in 0..n {
        line[x] = [
            ((sum[0] * mul) >> shr) as u8,
            ((sum[1] * mul) >> shr) as u8,
            ((sum[2] * mul) >> shr) as u8,
            ((sum[3] * mul) >> shr) as u8,
        ];

        for c in 0..4 {
            sum[c] -= sum_out[c];
        }

        let mut stack_start = stack_ptr + div - radius;
        if stack_start >= div {
            stack_start -= div;
        }
        sub(&mut sum_out, stack[stack_start]);

        if read_pos < last {
            read_pos += 1;
        }
        let incoming = line[read_pos];
        stack[stack_start] = incoming;
        add(&mut sum_in, incoming, 1);
        for c in 0..4 {
            sum[c] += sum_in[c];
        }

        stack_ptr += 1;
        if stack_ptr >= div {
            stack_ptr = 0;
        }
        let center = stack[stack_ptr];
        add(&mut sum_out, center, 1);
        sub(&mut sum_in, center);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_radius_is_identity() {
        let mut bmp = Bitmap::create(9, 9).unwrap();
        bmp.set_pixel(4, 4, Color::from_rgba(200, 100, 50, 255));
        let before = bmp.clone();
        stack_blur(&mut bmp, 0, Color::TRANSPARENT);
        assert_eq!(bmp, before);
    }

    #[test]
    fn test_blur_spreads_to_neighbors() {
        let mut bmp = Bitmap::create(21, 21).unwrap();
        bmp.set_pixel(10, 10, Color::WHITE);
        stack_blur(&mut bmp, 3, Color::WHITE);
        assert!(bmp.get_pixel(10, 10).a > 0);
        assert!(bmp.get_pixel(11, 10).a > 0);
        assert!(bmp.get_pixel(10, 12).a > 0);
        // Far corner stays untouched.
        assert_eq!(bmp.get_pixel(0, 0).a, 0);
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let mut bmp = Bitmap::create(12, 12).unwrap();
        bmp.fill(Color::from_rgba(128, 64, 32, 255));
        stack_blur(&mut bmp, 4, Color::TRANSPARENT);
        for y in 0..12 {
            for x in 0..12 {
                let p = bmp.get_pixel(x, y);
                assert!((p.r as i32 - 128).abs() <= 1, "r at ({x},{y}) = {}", p.r);
                assert!((p.g as i32 - 64).abs() <= 1);
                assert!((p.b as i32 - 32).abs() <= 1);
                assert_eq!(p.a, 255);
            }
        }
    }

    #[test]
    fn test_alpha_mass_conserved_away_from_edges() {
        // A spot far from the bitmap edge keeps its total alpha mass.
        let mut bmp = Bitmap::create(41, 41).unwrap();
        bmp.set_pixel(20, 20, Color::from_rgba(0, 0, 0, 200));
        let mass_before: u64 = bmp.data().chunks_exact(4).map(|p| p[3] as u64).sum();
        stack_blur(&mut bmp, 4, Color::BLACK);
        let mass_after: u64 = bmp.data().chunks_exact(4).map(|p| p[3] as u64).sum();
        let diff = mass_before.abs_diff(mass_after);
        // Rounding may shave a little mass; it must stay within a tight bound.
        assert!(
            diff <= mass_before / 10 + 81,
            "mass drifted: {mass_before} -> {mass_after}"
        );
    }

    #[test]
    fn test_transparent_fill_prevents_color_bleed() {
        // A transparent region with stale red channel data must not leak red
        // into the blur when the fill color is white.
        let mut bmp = Bitmap::create(11, 11).unwrap();
        for y in 0..11 {
            for x in 0..11 {
                bmp.set_pixel(x, y, Color::from_rgba(255, 0, 0, 0));
            }
        }
        bmp.set_pixel(5, 5, Color::WHITE);
        stack_blur(&mut bmp, 2, Color::WHITE);
        let p = bmp.get_pixel(6, 5);
        assert!(p.a > 0);
        assert_eq!(p.r, p.g, "stale red bled into the blur");
        assert_eq!(p.g, p.b);
    }

    #[test]
    fn test_blur_cost_window_radius_clamped() {
        // Oversized radii clamp to the table range instead of panicking.
        let mut bmp = Bitmap::create(8, 8).unwrap();
        bmp.set_pixel(4, 4, Color::WHITE);
        stack_blur(&mut bmp, 10_000, Color::TRANSPARENT);
    }
}
