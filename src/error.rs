//! Error taxonomy for fallible rendering operations.
//!
//! Every failure is local to the operation that raised it: a draw call that
//! errors out leaves previously composited pixels untouched.

use thiserror::Error;

use crate::fill::WindingRule;

/// Errors surfaced by rendering operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A bitmap allocation failed under memory pressure, or the requested
    /// dimensions do not describe a representable buffer. The caller skips
    /// the single paint operation; rendered content stays intact.
    #[error("failed to allocate a {width}x{height} bitmap")]
    AllocationFailed { width: i32, height: i32 },

    /// A gradient needs at least two color stops to resolve.
    #[error("gradient requires at least two color stops, got {0}")]
    NotEnoughGradientStops(usize),

    /// The edge-flag fill path only realizes even-odd coverage; nonzero
    /// winding is rejected rather than silently ignored.
    #[error("winding rule {0:?} is not supported by the edge-flag rasterizer")]
    UnsupportedWindingRule(WindingRule),
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = RenderError::AllocationFailed {
            width: 100,
            height: 50,
        };
        assert_eq!(e.to_string(), "failed to allocate a 100x50 bitmap");

        let e = RenderError::NotEnoughGradientStops(1);
        assert!(e.to_string().contains("at least two color stops"));

        let e = RenderError::UnsupportedWindingRule(WindingRule::NonZero);
        assert!(e.to_string().contains("NonZero"));
    }
}
