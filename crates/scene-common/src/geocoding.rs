//! Geocoding capability: bidirectional pixel <-> geographic mapping.

use crate::geom::{GeoPos, PixelPos};

/// Maps raster pixel coordinates to geographic coordinates and back.
///
/// Implementations are read-only for the duration of a call and may be
/// shared across threads.
pub trait GeoCoding: Send + Sync {
    /// Whether `geo_pos` produces meaningful results.
    fn can_get_geo_pos(&self) -> bool;

    /// Whether `pixel_pos` produces meaningful results.
    fn can_get_pixel_pos(&self) -> bool;

    /// Pixel to geographic position. May return `GeoPos::invalid()` for
    /// pixels outside the mapped area.
    fn geo_pos(&self, pixel: PixelPos) -> GeoPos;

    /// Geographic to pixel position. May return NaN coordinates for
    /// positions outside the mapped area.
    fn pixel_pos(&self, geo: GeoPos) -> PixelPos;
}
