//! Pixel and geographic positions, pixel rectangles.

use serde::{Deserialize, Serialize};

/// A position in raster pixel space. `(0.5, 0.5)` is the center of the
/// upper-left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f64,
    pub y: f64,
}

impl PixelPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_valid(&self) -> bool {
        !self.x.is_nan() && !self.y.is_nan()
    }
}

/// A geographic position in degrees.
///
/// Longitude is nominally in [-180, 180] but boundary processing may
/// temporarily shift it by multiples of 360.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPos {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPos {
    /// Create a position from longitude and latitude (x, y order).
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// An invalid position, returned by geocodings that cannot map a pixel.
    pub fn invalid() -> Self {
        Self {
            lon: f64::NAN,
            lat: f64::NAN,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.lon.is_nan() && !self.lat.is_nan()
    }
}

/// An integer rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` raster.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
