//! Regular grid specifications.

use crate::Envelope;
use serde::{Deserialize, Serialize};

/// Specification of a regular grid: pixel `(i, j)` has its center at
/// `(first_x + i * dx, first_y + j * dy)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of points in X (longitude) direction
    pub nx: usize,
    /// Number of points in Y (latitude) direction
    pub ny: usize,
    /// Grid resolution in X direction (degrees or meters depending on CRS)
    pub dx: f64,
    /// Grid resolution in Y direction, negative for north-up rasters
    pub dy: f64,
    /// X of the first grid point center
    pub first_x: f64,
    /// Y of the first grid point center
    pub first_y: f64,
}

impl GridSpec {
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64, first_x: f64, first_y: f64) -> Self {
        Self {
            nx,
            ny,
            dx,
            dy,
            first_x,
            first_y,
        }
    }

    /// North-up geographic grid whose pixel edges span the given envelope.
    pub fn covering(envelope: &Envelope, nx: usize, ny: usize) -> Self {
        let dx = envelope.width() / nx.max(1) as f64;
        let dy = -envelope.height() / ny.max(1) as f64;
        Self::new(
            nx,
            ny,
            dx,
            dy,
            envelope.min_x + 0.5 * dx,
            envelope.max_y + 0.5 * dy,
        )
    }

    /// Envelope of the grid point centers.
    pub fn envelope(&self) -> Envelope {
        let last_x = self.first_x + (self.nx.max(1) - 1) as f64 * self.dx;
        let last_y = self.first_y + (self.ny.max(1) - 1) as f64 * self.dy;

        Envelope {
            min_x: self.first_x.min(last_x),
            min_y: self.first_y.min(last_y),
            max_x: self.first_x.max(last_x),
            max_y: self.first_y.max(last_y),
        }
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }
}
