//! Planar envelopes (min/max corners) for projected or pixel coordinates.

use serde::{Deserialize, Serialize};

/// An axis-aligned envelope in a planar coordinate system.
///
/// For geographic output the coordinates are degrees, for projected map
/// transforms they are metres, for boundaries in raster space they are pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Create a new envelope from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest envelope containing all given points.
    ///
    /// NaN coordinates are ignored. Returns `None` when no finite point is given.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut env: Option<Envelope> = None;
        for (x, y) in points {
            if x.is_nan() || y.is_nan() {
                continue;
            }
            match env.as_mut() {
                Some(e) => e.expand_to_include(x, y),
                None => env = Some(Envelope::new(x, y, x, y)),
            }
        }
        env
    }

    /// Grow the envelope to include a point.
    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Width of the envelope in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the envelope in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if this envelope intersects another.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Check if a point is contained within this envelope.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
