//! Shared test utilities for the scene-quicklook workspace.
//!
//! - Synthetic band generators
//! - Boundary and polygon fixtures, including antimeridian crossings
//! - Approximate equality macros
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of two geographic positions, longitude and latitude.
///
/// ```ignore
/// use test_utils::assert_geo_approx_eq;
///
/// assert_geo_approx_eq!(GeoPos::new(10.0001, 2.0), GeoPos::new(10.0, 2.0), 0.001);
/// ```
#[macro_export]
macro_rules! assert_geo_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        $crate::assert_approx_eq!(left.lon, right.lon, $epsilon);
        $crate::assert_approx_eq!(left.lat, right.lat, $epsilon);
    }};
}

/// Macro for approximate equality of coordinate pairs.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($x1:expr, $y1:expr), ($x2:expr, $y2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($x1, $x2, $epsilon);
        $crate::assert_approx_eq!($y1, $y2, $epsilon);
    }};
}
