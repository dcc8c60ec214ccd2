//! Paint styles and gradient resolution.
//!
//! A [`PaintStyle`] is a tagged variant — solid color or linear/conic/radial
//! gradient — sampled per pixel through a single match-dispatched
//! [`PaintSampler`]. Gradients share one [`ColorStop`] contract: positions are
//! fractions of the gradient length, stop lists are normalized with the exact
//! rules in [`normalize_color_stops`], and colors between stops compose as a
//! sequence of clamped linear steps in raw (non-gamma-corrected) channel
//! space.

use crate::basics::{deg2rad, PointD, RectD};
use crate::color::Color;
use crate::error::{RenderError, Result};

// ============================================================================
// ColorStop
// ============================================================================

/// One point along a gradient.
///
/// `position` is a fraction of the gradient length in `[0, 1]`, or `None` for
/// a stop whose position is resolved by normalization. `transition_hint`
/// moves the color midpoint between this stop and the next (CSS interpolation
/// hint), as a fraction of the distance between the two stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub color: Color,
    pub position: Option<f32>,
    pub transition_hint: Option<f32>,
}

impl ColorStop {
    pub fn new(color: Color, position: f32) -> Self {
        Self {
            color,
            position: Some(position),
            transition_hint: None,
        }
    }

    pub fn unpositioned(color: Color) -> Self {
        Self {
            color,
            position: None,
            transition_hint: None,
        }
    }
}

// ============================================================================
// PaintStyle
// ============================================================================

/// Tagged paint variant, dispatched with a single `match` at sampling time.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintStyle {
    Solid(Color),
    /// Angle in degrees, 0° pointing up, increasing clockwise.
    LinearGradient {
        angle_degrees: f32,
        stops: Vec<ColorStop>,
    },
    /// `center` is relative to the painted rect's origin.
    ConicGradient {
        center: PointD,
        start_angle_degrees: f32,
        stops: Vec<ColorStop>,
    },
    /// `size` holds the per-axis radii in device units.
    RadialGradient {
        center: PointD,
        size: PointD,
        stops: Vec<ColorStop>,
    },
}

impl PaintStyle {
    /// Build a per-pixel sampler for painting into `rect` (device space).
    ///
    /// Gradient stop lists are validated and normalized here so that
    /// per-pixel sampling never fails.
    pub fn sampler(&self, rect: RectD) -> Result<PaintSampler> {
        let resolved = match self {
            PaintStyle::Solid(color) => ResolvedStyle::Solid(*color),
            PaintStyle::LinearGradient {
                angle_degrees,
                stops,
            } => {
                // 0° points up; convert to the mathematical axis angle.
                let real_angle = deg2rad(90.0 - *angle_degrees as f64);
                let (sin_a, cos_a) = real_angle.sin_cos();
                let length =
                    (rect.height() * sin_a).abs() + (rect.width() * cos_a).abs();
                let stops = normalize_color_stops(stops)?;
                ResolvedStyle::Linear {
                    // Unit direction from gradient start toward gradient end.
                    dir: PointD::new(cos_a, -sin_a),
                    center: PointD::new(rect.width() / 2.0, rect.height() / 2.0),
                    length,
                    stops,
                }
            }
            PaintStyle::ConicGradient {
                center,
                start_angle_degrees,
                stops,
            } => ResolvedStyle::Conic {
                center: *center,
                start_angle: *start_angle_degrees as f64,
                stops: normalize_color_stops(stops)?,
            },
            PaintStyle::RadialGradient {
                center,
                size,
                stops,
            } => ResolvedStyle::Radial {
                center: *center,
                size: *size,
                stops: normalize_color_stops(stops)?,
            },
        };
        Ok(PaintSampler { resolved })
    }

    /// The constant color, when no per-pixel work is needed.
    pub fn as_solid(&self) -> Option<Color> {
        match self {
            PaintStyle::Solid(c) => Some(*c),
            _ => None,
        }
    }
}

impl From<Color> for PaintStyle {
    fn from(c: Color) -> Self {
        PaintStyle::Solid(c)
    }
}

// ============================================================================
// Stop normalization
// ============================================================================

/// A stop with its position resolved to a fraction of the gradient length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedColorStop {
    pub color: Color,
    pub position: f32,
    pub transition_hint: Option<f32>,
}

/// Resolve a stop list to monotonically nondecreasing positions.
///
/// 1. An unpositioned first stop resolves to 0; an unpositioned last stop
///    resolves to the full length (1).
/// 2. Walking in order, a resolved position below the maximum seen so far is
///    clamped up to that maximum.
/// 3. Each remaining run of unpositioned interior stops is evenly spaced
///    between the nearest positioned stops on either side.
pub fn normalize_color_stops(stops: &[ColorStop]) -> Result<Vec<ResolvedColorStop>> {
    if stops.len() < 2 {
        return Err(RenderError::NotEnoughGradientStops(stops.len()));
    }

    let n = stops.len();
    let mut positions: Vec<Option<f32>> = stops.iter().map(|s| s.position).collect();
    if positions[0].is_none() {
        positions[0] = Some(0.0);
    }
    if positions[n - 1].is_none() {
        positions[n - 1] = Some(1.0);
    }

    // Monotonic nondecreasing enforcement over the positioned stops.
    let mut max_so_far = f32::MIN;
    for slot in positions.iter_mut() {
        if let Some(p) = *slot {
            let p = if p < max_so_far { max_so_far } else { p };
            *slot = Some(p);
            max_so_far = p;
        }
    }

    // Evenly space runs of unpositioned interior stops.
    let mut i = 1;
    while i < n {
        if positions[i].is_some() {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut run_end = i;
        while positions[run_end].is_none() {
            run_end += 1;
        }
        let before = positions[run_start - 1].unwrap();
        let after = positions[run_end].unwrap();
        let steps = (run_end - run_start + 1) as f32;
        for (k, slot) in positions[run_start..run_end].iter_mut().enumerate() {
            *slot = Some(before + (after - before) * (k as f32 + 1.0) / steps);
        }
        i = run_end + 1;
    }

    Ok(stops
        .iter()
        .zip(&positions)
        .map(|(s, p)| ResolvedColorStop {
            color: s.color,
            position: p.unwrap(),
            transition_hint: s.transition_hint,
        })
        .collect())
}

// ============================================================================
// PaintSampler
// ============================================================================

enum ResolvedStyle {
    Solid(Color),
    Linear {
        dir: PointD,
        center: PointD,
        length: f64,
        stops: Vec<ResolvedColorStop>,
    },
    Conic {
        center: PointD,
        start_angle: f64,
        stops: Vec<ResolvedColorStop>,
    },
    Radial {
        center: PointD,
        size: PointD,
        stops: Vec<ResolvedColorStop>,
    },
}

/// Per-pixel color source for one paint operation.
pub struct PaintSampler {
    resolved: ResolvedStyle,
}

impl PaintSampler {
    /// Sample the color at (x, y), in coordinates relative to the painted
    /// rect's origin.
    pub fn sample(&self, x: f64, y: f64) -> Color {
        match &self.resolved {
            ResolvedStyle::Solid(c) => *c,
            ResolvedStyle::Linear {
                dir,
                center,
                length,
                stops,
            } => {
                if *length <= 0.0 {
                    return stops.last().map(|s| s.color).unwrap_or(Color::TRANSPARENT);
                }
                // Project the pixel center onto the gradient axis; the axis
                // runs through the rect center with extent [0, length].
                let px = x + 0.5 - center.x;
                let py = y + 0.5 - center.y;
                let along = px * dir.x + py * dir.y + length / 2.0;
                sample_stops(stops, (along / length) as f32)
            }
            ResolvedStyle::Conic {
                center,
                start_angle,
                stops,
            } => {
                let dx = x + 0.5 - center.x;
                let dy = y + 0.5 - center.y;
                // 0° points up, increasing clockwise.
                let degrees = dx.atan2(-dy).to_degrees();
                let frac = (degrees - start_angle).rem_euclid(360.0) / 360.0;
                sample_stops(stops, frac as f32)
            }
            ResolvedStyle::Radial {
                center,
                size,
                stops,
            } => {
                if size.x <= 0.0 || size.y <= 0.0 {
                    return stops.last().map(|s| s.color).unwrap_or(Color::TRANSPARENT);
                }
                let dx = (x + 0.5 - center.x) / size.x;
                let dy = (y + 0.5 - center.y) / size.y;
                sample_stops(stops, ((dx * dx + dy * dy).sqrt()) as f32)
            }
        }
    }
}

/// Compose the stop list left to right with clamped linear steps.
///
/// Each adjacent pair contributes `mix(acc, next, clamp(t))`; a transition
/// hint on the left stop bends `t` through the CSS midpoint exponent.
fn sample_stops(stops: &[ResolvedColorStop], position: f32) -> Color {
    let mut color = stops[0].color;
    for pair in stops.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        let span = right.position - left.position;
        let mut t = if span > 0.0 {
            ((position - left.position) / span).clamp(0.0, 1.0)
        } else if position < left.position {
            0.0
        } else {
            1.0
        };
        if let Some(hint) = left.transition_hint {
            if hint > 0.0 && hint < 1.0 && t > 0.0 && t < 1.0 {
                t = t.powf(0.5f32.ln() / hint.ln());
            }
        }
        color = color.mix(&right.color, t);
    }
    color
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::from_rgb(255, 0, 0);
    const GREEN: Color = Color::from_rgb(0, 255, 0);
    const BLUE: Color = Color::from_rgb(0, 0, 255);

    #[test]
    fn test_normalize_endpoints_default() {
        let stops = [
            ColorStop::unpositioned(RED),
            ColorStop::new(GREEN, 0.5),
            ColorStop::unpositioned(BLUE),
        ];
        let r = normalize_color_stops(&stops).unwrap();
        assert_eq!(r[0].position, 0.0);
        assert_eq!(r[1].position, 0.5);
        assert_eq!(r[2].position, 1.0);
    }

    #[test]
    fn test_normalize_monotonic_clamp() {
        let stops = [ColorStop::new(RED, 0.8), ColorStop::new(GREEN, 0.3)];
        let r = normalize_color_stops(&stops).unwrap();
        assert_eq!(r[0].position, 0.8);
        assert_eq!(r[1].position, 0.8);
    }

    #[test]
    fn test_normalize_spaces_interior_run() {
        let stops = [
            ColorStop::new(RED, 0.0),
            ColorStop::unpositioned(GREEN),
            ColorStop::unpositioned(BLUE),
            ColorStop::new(Color::WHITE, 0.9),
        ];
        let r = normalize_color_stops(&stops).unwrap();
        assert!((r[1].position - 0.3).abs() < 1e-6);
        assert!((r[2].position - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_rejects_short_lists() {
        assert_eq!(
            normalize_color_stops(&[ColorStop::new(RED, 0.0)]),
            Err(RenderError::NotEnoughGradientStops(1))
        );
    }

    #[test]
    fn test_solid_sampler_is_constant() {
        let style = PaintStyle::Solid(RED);
        let s = style.sampler(RectD::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(s.sample(0.0, 0.0), RED);
        assert_eq!(s.sample(9.0, 9.0), RED);
    }

    #[test]
    fn test_linear_gradient_pointing_up() {
        // 0° points up: first color at the bottom, last at the top.
        let style = PaintStyle::LinearGradient {
            angle_degrees: 0.0,
            stops: vec![ColorStop::new(RED, 0.0), ColorStop::new(BLUE, 1.0)],
        };
        let s = style.sampler(RectD::new(0.0, 0.0, 10.0, 100.0)).unwrap();
        let bottom = s.sample(5.0, 99.0);
        let top = s.sample(5.0, 0.0);
        assert!(bottom.r > 200 && bottom.b < 55, "bottom should be red: {bottom:?}");
        assert!(top.b > 200 && top.r < 55, "top should be blue: {top:?}");
    }

    #[test]
    fn test_linear_gradient_90_degrees_left_to_right() {
        let style = PaintStyle::LinearGradient {
            angle_degrees: 90.0,
            stops: vec![ColorStop::new(RED, 0.0), ColorStop::new(BLUE, 1.0)],
        };
        let s = style.sampler(RectD::new(0.0, 0.0, 100.0, 10.0)).unwrap();
        assert!(s.sample(0.0, 5.0).r > 200);
        assert!(s.sample(99.0, 5.0).b > 200);
        let mid = s.sample(49.5, 5.0);
        assert!((mid.r as i32 - 128).abs() < 8, "midpoint: {mid:?}");
    }

    #[test]
    fn test_gradient_midpoint_is_raw_channel_average() {
        let style = PaintStyle::LinearGradient {
            angle_degrees: 90.0,
            stops: vec![
                ColorStop::new(Color::BLACK, 0.0),
                ColorStop::new(Color::WHITE, 1.0),
            ],
        };
        let s = style.sampler(RectD::new(0.0, 0.0, 101.0, 1.0)).unwrap();
        let mid = s.sample(50.0, 0.0);
        // Plain linear interpolation in raw channel space, not gamma-corrected.
        assert!((mid.r as i32 - 128).abs() <= 2, "mid: {mid:?}");
    }

    #[test]
    fn test_transition_hint_shifts_midpoint() {
        let mut first = ColorStop::new(Color::BLACK, 0.0);
        first.transition_hint = Some(0.25);
        let style = PaintStyle::LinearGradient {
            angle_degrees: 90.0,
            stops: vec![first, ColorStop::new(Color::WHITE, 1.0)],
        };
        let s = style.sampler(RectD::new(0.0, 0.0, 100.0, 1.0)).unwrap();
        // At the hint position the blend reaches 50%.
        let at_hint = s.sample(24.5, 0.0);
        assert!((at_hint.r as i32 - 128).abs() <= 4, "at hint: {at_hint:?}");
    }

    #[test]
    fn test_conic_gradient_angles() {
        let style = PaintStyle::ConicGradient {
            center: PointD::new(50.0, 50.0),
            start_angle_degrees: 0.0,
            stops: vec![ColorStop::new(RED, 0.0), ColorStop::new(BLUE, 1.0)],
        };
        let s = style.sampler(RectD::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        // Just clockwise of straight up: near the first stop.
        let near_start = s.sample(51.0, 10.0);
        assert!(near_start.r > 240, "{near_start:?}");
        // Straight right is a quarter turn.
        let quarter = s.sample(90.0, 49.5);
        assert!((quarter.r as i32 - 191).abs() < 12, "{quarter:?}");
    }

    #[test]
    fn test_radial_gradient_distance() {
        let style = PaintStyle::RadialGradient {
            center: PointD::new(50.0, 50.0),
            size: PointD::new(50.0, 50.0),
            stops: vec![ColorStop::new(RED, 0.0), ColorStop::new(BLUE, 1.0)],
        };
        let s = style.sampler(RectD::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        assert!(s.sample(49.5, 49.5).r > 240);
        // At and beyond the radius: the last stop.
        assert!(s.sample(99.5, 49.5).b > 240);
        assert!(s.sample(0.0, 0.0).b > 240);
    }

    #[test]
    fn test_hard_stop_pair() {
        let style = PaintStyle::LinearGradient {
            angle_degrees: 90.0,
            stops: vec![
                ColorStop::new(RED, 0.0),
                ColorStop::new(RED, 0.5),
                ColorStop::new(BLUE, 0.5),
                ColorStop::new(BLUE, 1.0),
            ],
        };
        let s = style.sampler(RectD::new(0.0, 0.0, 100.0, 1.0)).unwrap();
        assert!(s.sample(10.0, 0.0).r > 240);
        assert!(s.sample(90.0, 0.0).b > 240);
    }
}
