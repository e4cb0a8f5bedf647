//! Splitting of normalized polygons at the antimeridian.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon, Rect, Translate};
use scene_common::GeoPos;
use tracing::debug;

/// Part of a boundary lying inside one 360 degree longitude window,
/// translated back into [-180, 180].
pub type BoundaryFragment = MultiPolygon<f64>;

/// Closed polygon through the valid vertices of `polygon`, with its
/// longitude range. `None` for fewer than two vertices or no valid ones.
fn closed_path(polygon: &[GeoPos]) -> Option<(Polygon<f64>, f64, f64)> {
    if polygon.len() < 2 {
        return None;
    }
    let coords: Vec<Coord<f64>> = polygon
        .iter()
        .filter(|p| !p.lon.is_nan())
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect();
    if coords.is_empty() {
        return None;
    }
    let (min_lon, max_lon) = coords
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c.x), hi.max(c.x)));
    // LineString -> Polygon closes the ring
    Some((Polygon::new(LineString::new(coords), vec![]), min_lon, max_lon))
}

/// Split a normalized polygon into fragments, one per 360 degree
/// longitude band it touches, ordered west to east.
///
/// Band `k` covers `[k*360 - 180, k*360 + 180] x [-90, 90]`. Each non-empty
/// intersection with a band is shifted by `-k*360` so that every fragment
/// is drawable without wraparound. NaN longitudes are skipped.
pub fn split_at_antimeridian(polygon: &[GeoPos]) -> Vec<BoundaryFragment> {
    let Some((path, min_lon, max_lon)) = closed_path(polygon) else {
        return Vec::new();
    };
    let band_min = ((min_lon + 180.0) / 360.0).floor() as i64;
    let band_max = ((max_lon + 180.0) / 360.0).floor() as i64;

    let mut fragments = Vec::new();
    for k in band_min..=band_max {
        let offset = k as f64 * 360.0;
        let window = Rect::new(
            Coord { x: offset - 180.0, y: -90.0 },
            Coord { x: offset + 180.0, y: 90.0 },
        )
        .to_polygon();
        let part = window.intersection(&path);
        if part.0.is_empty() {
            continue;
        }
        fragments.push(part.translate(-offset, 0.0));
    }
    debug!(
        vertices = polygon.len(),
        band_min,
        band_max,
        fragments = fragments.len(),
        "split boundary"
    );
    fragments
}
