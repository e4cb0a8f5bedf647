//! Lambert Conformal Conic projection.
//!
//! Used by regional model and satellite products. The cone is tangent or
//! secant to the sphere at one or two standard parallels.
//!
//! As a [`MapTransform`] it maps geographic positions to metres relative to
//! the first grid point. As a [`GeoCoding`] pixel `(x, y)` addresses grid
//! point `(x - 0.5, y - 0.5)`; rows follow the grid's j axis.

use std::f64::consts::PI;

use geo::Coord;
use scene_common::{GeoCoding, GeoPos, PixelPos, PixelRect};

use crate::boundary::create_rect_boundary;
use crate::envelope::MapTransform;

/// Mean earth radius used by GRIB2 spherical grids (metres).
const EARTH_RADIUS: f64 = 6371229.0;

/// Lambert Conformal Conic projection on a regular grid.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian (LoV) in radians
    pub lon0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Grid spacing in X direction (meters)
    pub dx: f64,
    /// Grid spacing in Y direction (meters)
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
    pub earth_radius: f64,
    /// Cone constant
    n: f64,
    f: f64,
    /// Rho at the first grid point
    rho0: f64,
    /// First grid point in projection coordinates
    x0: f64,
    y0: f64,
}

fn wrap_pi(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

impl LambertConformal {
    /// Projection from GRIB2 grid parameters, angles in degrees.
    #[allow(clippy::too_many_arguments)]
    pub fn from_grib2(
        lat1_deg: f64,
        lon1_deg: f64,
        lov_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        dx: f64,
        dy: f64,
        nx: usize,
        ny: usize,
    ) -> Self {
        let lat1 = lat1_deg.to_radians();
        let lon1 = lon1_deg.to_radians();
        let lon0 = lov_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio = ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };
        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = EARTH_RADIUS * f / (PI / 4.0 + lat1 / 2.0).tan().powf(n);

        let theta0 = n * wrap_pi(lon1 - lon0);
        let x0 = rho0 * theta0.sin();
        let y0 = rho0 - rho0 * theta0.cos();

        Self {
            lon0,
            latin1,
            latin2,
            dx,
            dy,
            nx,
            ny,
            earth_radius: EARTH_RADIUS,
            n,
            f,
            rho0,
            x0,
            y0,
        }
    }

    /// The 3 km CONUS grid of the HRRR model.
    pub fn hrrr() -> Self {
        Self::from_grib2(
            21.138123,   // lat1
            -122.719528, // lon1 (237.280472 - 360)
            -97.5,       // LoV (262.5 - 360)
            38.5,        // latin1
            38.5,        // latin2
            3000.0,
            3000.0,
            1799,
            1059,
        )
    }

    /// Projection coordinates in metres relative to the first grid point.
    pub fn project(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let dlon = wrap_pi(lon_deg.to_radians() - self.lon0);
        let rho = self.earth_radius * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;
        (rho * theta.sin() - self.x0, self.rho0 - rho * theta.cos() - self.y0)
    }

    /// Inverse of [`project`](Self::project); returns (lat, lon) in degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x + self.x0;
        let y = y + self.y0;
        let rho = (x * x + (self.rho0 - y) * (self.rho0 - y)).sqrt();
        let rho = if self.n < 0.0 { -rho } else { rho };
        let theta = (x / (self.rho0 - y)).atan();

        let lat = 2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0;
        let lon = wrap_pi(self.lon0 + theta / self.n);
        (lat.to_degrees(), lon.to_degrees())
    }

    /// Geographic coordinates to fractional grid indices (i, j).
    pub fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let (x, y) = self.project(lat_deg, lon_deg);
        (x / self.dx, y / self.dy)
    }

    /// Grid indices (i, j) to (lat, lon) in degrees.
    pub fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        self.unproject(i * self.dx, j * self.dy)
    }

    /// Approximate geographic bounding box `(min_lon, min_lat, max_lon, max_lat)`
    /// from grid edges sampled every tenth of their length.
    pub fn geographic_bounds(&self) -> (f64, f64, f64, f64) {
        let step = (self.nx.min(self.ny) / 10).max(1);
        let edges = create_rect_boundary(PixelRect::full(self.nx, self.ny), step, true);
        edges.iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(min_lon, min_lat, max_lon, max_lat), p| {
                let (lat, lon) = self.grid_to_geo(p.x - 0.5, p.y - 0.5);
                (min_lon.min(lon), min_lat.min(lat), max_lon.max(lon), max_lat.max(lat))
            },
        )
    }

    /// Whether a geographic point falls inside the grid.
    pub fn contains(&self, lat_deg: f64, lon_deg: f64) -> bool {
        let (i, j) = self.geo_to_grid(lat_deg, lon_deg);
        i >= 0.0 && i < self.nx as f64 && j >= 0.0 && j < self.ny as f64
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
}

impl GeoCoding for LambertConformal {
    fn can_get_geo_pos(&self) -> bool {
        true
    }

    fn can_get_pixel_pos(&self) -> bool {
        true
    }

    fn geo_pos(&self, pixel: PixelPos) -> GeoPos {
        if !pixel.is_valid() {
            return GeoPos::invalid();
        }
        let (lat, lon) = self.grid_to_geo(pixel.x - 0.5, pixel.y - 0.5);
        GeoPos::new(lon, lat)
    }

    fn pixel_pos(&self, geo: GeoPos) -> PixelPos {
        if !geo.is_valid() {
            return PixelPos::new(f64::NAN, f64::NAN);
        }
        let (i, j) = self.geo_to_grid(geo.lat, geo.lon);
        PixelPos::new(i + 0.5, j + 0.5)
    }
}

impl MapTransform for LambertConformal {
    fn forward(&self, geo: GeoPos) -> Coord<f64> {
        let (x, y) = self.project(geo.lat, geo.lon);
        Coord { x, y }
    }

    fn inverse(&self, map: Coord<f64>) -> GeoPos {
        let (lat, lon) = self.unproject(map.x, map.y);
        GeoPos::new(lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hrrr_first_grid_point() {
        let proj = LambertConformal::hrrr();
        let (i, j) = proj.geo_to_grid(21.138123, -122.719528);
        assert!(i.abs() < 0.1, "i should be ~0, got {}", i);
        assert!(j.abs() < 0.1, "j should be ~0, got {}", j);
    }

    #[test]
    fn test_hrrr_roundtrip() {
        let proj = LambertConformal::hrrr();
        let (lat, lon) = proj.grid_to_geo(900.0, 500.0);
        let (i, j) = proj.geo_to_grid(lat, lon);
        assert!((i - 900.0).abs() < 0.01, "i roundtrip failed: {}", i);
        assert!((j - 500.0).abs() < 0.01, "j roundtrip failed: {}", j);
    }

    #[test]
    fn test_hrrr_geographic_bounds() {
        let proj = LambertConformal::hrrr();
        let (min_lon, min_lat, max_lon, max_lat) = proj.geographic_bounds();
        assert!(min_lon < -120.0, "min_lon should be < -120, got {}", min_lon);
        assert!(max_lon > -65.0, "max_lon should be > -65, got {}", max_lon);
        assert!(min_lat > 20.0 && min_lat < 25.0, "min_lat should be ~21-25, got {}", min_lat);
        assert!(max_lat > 45.0, "max_lat should be > 45, got {}", max_lat);
    }

    #[test]
    fn test_geocoding_and_map_transform_agree() {
        let proj = LambertConformal::hrrr();
        let geo = proj.geo_pos(PixelPos::new(900.5, 500.5));
        let pixel = proj.pixel_pos(geo);
        assert!((pixel.x - 900.5).abs() < 0.01 && (pixel.y - 500.5).abs() < 0.01);

        let map = proj.forward(geo);
        assert!((map.x - 900.0 * 3000.0).abs() < 30.0);
        let back = proj.inverse(map);
        assert!((back.lon - geo.lon).abs() < 1e-6 && (back.lat - geo.lat).abs() < 1e-6);
    }

    #[test]
    fn test_contains_kansas_city() {
        let proj = LambertConformal::hrrr();
        assert!(proj.contains(39.0, -94.5));
        assert!(!proj.contains(-10.0, 20.0));
    }
}
