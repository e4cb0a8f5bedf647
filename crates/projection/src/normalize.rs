//! Longitude normalization of closed geographic polygons.

use scene_common::GeoPos;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Outcome of [`normalize_polygon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// No vertex was shifted.
    Unchanged,
    /// Longitudes dropped below -180 and the polygon was shifted by +360.
    ShiftedEast,
    /// Longitudes exceed +180.
    ExceedsEast,
    /// Both directions overflowed; the polygon spans more than 360 degrees.
    Ambiguous,
}

impl Normalization {
    /// Numeric code: 0, -1, 1 and 2 respectively.
    pub fn code(self) -> i32 {
        match self {
            Normalization::Unchanged => 0,
            Normalization::ShiftedEast => -1,
            Normalization::ExceedsEast => 1,
            Normalization::Ambiguous => 2,
        }
    }

    pub fn is_normalized(self) -> bool {
        self != Normalization::Unchanged
    }
}

/// Remove 360 degree jumps between consecutive vertices in place.
///
/// Whenever the original longitude difference between two neighbours is
/// above +180 or below -180 a running offset of -360 or +360 is applied to
/// every following vertex. Only longitudes change.
pub fn normalize_polygon(polygon: &mut [GeoPos]) -> Normalization {
    let Some(first) = polygon.first() else {
        return Normalization::Unchanged;
    };
    let mut previous = first.lon;
    let mut increment = 0.0;
    let mut min_lon = f64::MAX;
    let mut max_lon = f64::MIN;

    for pos in polygon.iter_mut().skip(1) {
        let original = pos.lon;
        let diff = original - previous;
        previous = original;
        if diff > 180.0 {
            increment -= 360.0;
        } else if diff < -180.0 {
            increment += 360.0;
        }
        pos.lon += increment;
        min_lon = min_lon.min(pos.lon);
        max_lon = max_lon.max(pos.lon);
    }

    let below = min_lon < -180.0;
    let above = max_lon > 180.0;
    match (below, above) {
        (false, false) => Normalization::Unchanged,
        (true, false) => {
            for pos in polygon.iter_mut() {
                pos.lon += 360.0;
            }
            Normalization::ShiftedEast
        }
        (false, true) => Normalization::ExceedsEast,
        (true, true) => {
            warn!(min_lon, max_lon, "polygon spans more than 360 degrees of longitude");
            Normalization::Ambiguous
        }
    }
}

/// Bring a normalized longitude back into [-180, 180].
pub fn denormalize_geo_pos(pos: &mut GeoPos) {
    let factor = if pos.lon >= 0.0 {
        ((pos.lon + 180.0) / 360.0).trunc()
    } else {
        ((pos.lon - 180.0) / 360.0).trunc()
    };
    pos.lon -= factor * 360.0;
}

/// Inverse of [`normalize_polygon`] for each vertex.
pub fn denormalize_polygon(polygon: &mut [GeoPos]) {
    polygon.iter_mut().for_each(denormalize_geo_pos);
}

/// Sum of the turning angles of the closed polygon, in radians.
pub fn angle_sum(polygon: &[GeoPos]) -> f64 {
    let n = polygon.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p1 = polygon[i];
        let p2 = polygon[(i + 1) % n];
        let p3 = polygon[(i + 2) % n];
        let (ax, ay) = (p2.lon - p1.lon, p2.lat - p1.lat);
        let (bx, by) = (p3.lon - p2.lon, p3.lat - p2.lat);
        let norm = ax.hypot(ay) * bx.hypot(by);
        let cos = (ax * bx + ay * by) / norm;
        let sin = (ax * by - ay * bx) / norm;
        sum += sin.atan2(cos);
    }
    sum
}

/// 1 for counter-clockwise polygons (in lon/lat axes), -1 otherwise.
pub fn rotation_direction(polygon: &[GeoPos]) -> i32 {
    if angle_sum(polygon) > 0.0 {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lons(polygon: &[GeoPos]) -> Vec<f64> {
        polygon.iter().map(|p| p.lon).collect()
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(normalize_polygon(&mut []), Normalization::Unchanged);
        let mut one = [GeoPos::new(200.0, 0.0)];
        assert_eq!(normalize_polygon(&mut one), Normalization::Unchanged);
        assert_eq!(one[0].lon, 200.0);
    }

    #[test]
    fn test_exceeds_east() {
        let mut polygon = vec![
            GeoPos::new(170.0, 10.0),
            GeoPos::new(-170.0, 10.0),
            GeoPos::new(-170.0, 0.0),
            GeoPos::new(170.0, 0.0),
        ];
        assert_eq!(normalize_polygon(&mut polygon), Normalization::ExceedsEast);
        assert_eq!(lons(&polygon), vec![170.0, 190.0, 190.0, 170.0]);
    }

    #[test]
    fn test_shifted_east() {
        let mut polygon = vec![
            GeoPos::new(-170.0, 10.0),
            GeoPos::new(-170.0, 0.0),
            GeoPos::new(170.0, 0.0),
            GeoPos::new(170.0, 10.0),
        ];
        let result = normalize_polygon(&mut polygon);
        assert_eq!(result.code(), -1);
        assert_eq!(lons(&polygon), vec![190.0, 190.0, 170.0, 170.0]);
    }

    #[test]
    fn test_ambiguous() {
        // west across the antimeridian, back, then east across it
        let mut polygon: Vec<GeoPos> = [0.0, -170.0, 170.0, -170.0, 0.0, 170.0, -170.0]
            .iter()
            .enumerate()
            .map(|(i, &lon)| GeoPos::new(lon, i as f64))
            .collect();
        assert_eq!(normalize_polygon(&mut polygon), Normalization::Ambiguous);
        assert_eq!(lons(&polygon), vec![0.0, -170.0, -190.0, -170.0, 0.0, 170.0, 190.0]);
    }

    #[test]
    fn test_denormalize() {
        let mut pos = GeoPos::new(190.0, 5.0);
        denormalize_geo_pos(&mut pos);
        assert_eq!(pos, GeoPos::new(-170.0, 5.0));

        let mut pos = GeoPos::new(-190.0, 5.0);
        denormalize_geo_pos(&mut pos);
        assert_eq!(pos.lon, 170.0);

        let mut pos = GeoPos::new(550.0, 5.0);
        denormalize_geo_pos(&mut pos);
        assert_eq!(pos.lon, -170.0);
    }

    #[test]
    fn test_rotation_direction() {
        let clockwise = [
            GeoPos::new(0.0, 50.0),
            GeoPos::new(10.0, 50.0),
            GeoPos::new(10.0, 40.0),
            GeoPos::new(0.0, 40.0),
        ];
        assert!((angle_sum(&clockwise) + 2.0 * std::f64::consts::PI).abs() < 1e-9);
        assert_eq!(rotation_direction(&clockwise), -1);

        let mut counter = clockwise;
        counter.reverse();
        assert_eq!(rotation_direction(&counter), 1);
    }
}
