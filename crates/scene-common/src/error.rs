//! Error types for scene rendering and boundary computation.

use thiserror::Error;

/// Result type alias using SceneError.
pub type SceneResult<T> = Result<T, SceneError>;

/// Boxed cause carried by errors raised from external collaborators.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for image synthesis and geodetic boundary operations.
///
/// Every variant is fail-fast: an operation returning one of these has not
/// handed out a partially written image.
#[derive(Debug, Error)]
pub enum SceneError {
    // === Display range / palette errors ===
    #[error("Invalid display range: min ({min}) must be less than max ({max})")]
    InvalidRange { min: f64, max: f64 },

    #[error("Invalid gamma: {0} (must be finite and > 0)")]
    InvalidGamma(f64),

    #[error("Color palette is empty")]
    PaletteEmpty,

    #[error("Palette breakpoints must be strictly increasing (violated at point {index})")]
    UnsortedPalette { index: usize },

    #[error("Category table has {categories} entries, no slot left for the no-data color")]
    PaletteOverflow { categories: usize },

    // === Raster argument errors ===
    #[error("Raster dimensions differ: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Expected 1 or 3 rasters, got {0}")]
    ArgumentCount(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // === Overlay errors ===
    #[error("Illegal bitmask expression '{expression}': {source}")]
    PredicateEvaluation {
        expression: String,
        #[source]
        source: BoxedCause,
    },

    // === Geocoding errors ===
    #[error("Raster has no usable geo-coding")]
    NoGeoCoding,

    // === Control flow ===
    #[error("Process terminated by user")]
    UserCancelled,
}

impl SceneError {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Wrap an evaluator failure for the given expression.
    pub fn predicate(expression: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        Self::PredicateEvaluation {
            expression: expression.into(),
            source: source.into(),
        }
    }

    /// True for cooperative aborts, which callers usually report differently.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SceneError::UserCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_predicate_error_keeps_cause() {
        let err = SceneError::predicate("flags & ", "unexpected end of expression");
        assert!(err.to_string().contains("flags & "));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_is_cancelled() {
        assert!(SceneError::UserCancelled.is_cancelled());
        assert!(!SceneError::PaletteEmpty.is_cancelled());
    }
}
