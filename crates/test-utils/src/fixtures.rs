//! Common fixtures for boundary and rendering tests.

use scene_common::{GeoPos, GridSpec};

/// Regular lat/lon grids.
pub mod grid {
    use super::GridSpec;

    /// 1 degree square sampled 100x100
    pub const ONE_DEGREE_100: GridSpec = GridSpec {
        nx: 100,
        ny: 100,
        dx: 0.01,
        dy: -0.01,
        first_x: 10.005,
        first_y: 50.995,
    };

    /// Pacific swath 170E..170W sampled every 0.5 degrees
    pub const PACIFIC_SWATH: GridSpec = GridSpec {
        nx: 40,
        ny: 20,
        dx: 0.5,
        dy: -0.5,
        first_x: 170.25,
        first_y: 9.75,
    };
}

fn polygon(points: &[(f64, f64)]) -> Vec<GeoPos> {
    points.iter().map(|&(lon, lat)| GeoPos::new(lon, lat)).collect()
}

/// Square over central Europe, never near the antimeridian.
pub fn europe_square() -> Vec<GeoPos> {
    polygon(&[(0.0, 50.0), (10.0, 50.0), (10.0, 40.0), (0.0, 40.0)])
}

/// Square 170E..170W as seen by a geocoding, longitudes jump from 180 to -180.
pub fn pacific_square() -> Vec<GeoPos> {
    polygon(&[(170.0, 10.0), (-170.0, 10.0), (-170.0, 0.0), (170.0, 0.0)])
}

/// Same area as [`pacific_square`] but starting west of the antimeridian.
pub fn pacific_square_from_west() -> Vec<GeoPos> {
    polygon(&[(-170.0, 10.0), (-170.0, 0.0), (170.0, 0.0), (170.0, 10.0)])
}

/// Ring around the pole; longitudes wrap once per revolution.
pub fn polar_cap() -> Vec<GeoPos> {
    polygon(&[
        (-180.0, 80.0),
        (-90.0, 80.0),
        (0.0, 80.0),
        (90.0, 80.0),
        (179.0, 80.0),
        (-120.0, 80.0),
    ])
}

/// Strip along the equator that wraps once eastwards and then overshoots
/// westwards at its closing vertex, so it spans more than 360 degrees.
pub fn equatorial_ribbon() -> Vec<GeoPos> {
    polygon(&[
        (-175.0, 0.0),
        (-90.0, 0.0),
        (0.0, 0.0),
        (90.0, 0.0),
        (175.0, 0.0),
        (-175.0, 0.0),
        (-175.0, 10.0),
        (175.0, 10.0),
        (90.0, 10.0),
        (0.0, 10.0),
        (-90.0, 10.0),
        (-175.0, 10.0),
        (175.0, 5.0),
    ])
}
