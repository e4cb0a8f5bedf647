//! Geocoding of regular latitude/longitude grids.

use scene_common::{GeoCoding, GeoPos, GridSpec, PixelPos};

/// Affine geocoding of a [`GridSpec`] in degrees.
///
/// Pixel `(x, y)` with `(0.5, 0.5)` at the center of the first grid point.
/// Longitudes are reported in [-180, 180), so grids that cross the
/// antimeridian jump from +180 to -180 like real swath geocodings do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonGridGeoCoding {
    grid: GridSpec,
}

impl LatLonGridGeoCoding {
    pub fn new(grid: GridSpec) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }
}

/// Wrap a longitude into [-180, 180).
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

impl GeoCoding for LatLonGridGeoCoding {
    fn can_get_geo_pos(&self) -> bool {
        self.grid.dx != 0.0 && self.grid.dy != 0.0
    }

    fn can_get_pixel_pos(&self) -> bool {
        self.can_get_geo_pos()
    }

    fn geo_pos(&self, pixel: PixelPos) -> GeoPos {
        if !pixel.is_valid() {
            return GeoPos::invalid();
        }
        let lon = self.grid.first_x + (pixel.x - 0.5) * self.grid.dx;
        let lat = self.grid.first_y + (pixel.y - 0.5) * self.grid.dy;
        GeoPos::new(wrap_longitude(lon), lat)
    }

    fn pixel_pos(&self, geo: GeoPos) -> PixelPos {
        if !geo.is_valid() || !self.can_get_pixel_pos() {
            return PixelPos::new(f64::NAN, f64::NAN);
        }
        // Longitude offset east of the first column, measured from its western edge.
        let half = 0.5 * self.grid.dx.abs();
        let dlon = if self.grid.dx > 0.0 {
            (geo.lon - self.grid.first_x + half).rem_euclid(360.0) - half
        } else {
            half - (self.grid.first_x - geo.lon + half).rem_euclid(360.0)
        };
        PixelPos::new(
            dlon / self.grid.dx + 0.5,
            (geo.lat - self.grid.first_y) / self.grid.dy + 0.5,
        )
    }
}
