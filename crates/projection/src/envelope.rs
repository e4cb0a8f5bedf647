//! Map boundaries, envelopes and best-fit output grids.

use geo::Coord;
use scene_common::{Envelope, GeoPos, PixelRect, RasterView, SceneError, SceneResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boundary::create_geo_boundary;
use crate::normalize::normalize_polygon;

/// Forward/inverse transform between geographic and map coordinates.
pub trait MapTransform: Send + Sync {
    /// Geographic position to map coordinates.
    fn forward(&self, geo: GeoPos) -> Coord<f64>;

    /// Map coordinates to geographic position.
    fn inverse(&self, map: Coord<f64>) -> GeoPos;
}

/// Geographic "projection": map coordinates are longitude and latitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityMapTransform;

impl MapTransform for IdentityMapTransform {
    fn forward(&self, geo: GeoPos) -> Coord<f64> {
        Coord { x: geo.lon, y: geo.lat }
    }

    fn inverse(&self, map: Coord<f64>) -> GeoPos {
        GeoPos::new(map.x, map.y)
    }
}

/// No-data value of output grids that do not specify one.
pub const DEFAULT_NO_DATA_VALUE: f64 = f64::NAN;

/// Boundary of `rect` in map coordinates: geographic boundary, normalized,
/// then transformed.
pub fn create_map_boundary(
    raster: &dyn RasterView,
    rect: PixelRect,
    step: usize,
    transform: &dyn MapTransform,
) -> SceneResult<Vec<Coord<f64>>> {
    let mut geo = create_geo_boundary(raster, Some(rect), step, true)?;
    normalize_polygon(&mut geo);
    Ok(geo.into_iter().map(|p| transform.forward(p)).collect())
}

/// Bounding box of a point list; `None` when it is empty or all NaN.
pub fn min_max(points: &[Coord<f64>]) -> Option<Envelope> {
    Envelope::from_points(points.iter().map(|c| (c.x, c.y)))
}

/// Map envelope of `rect`, sampled every `step` pixels. The default step
/// (`None`) is half the shorter raster side.
pub fn create_map_envelope(
    raster: &dyn RasterView,
    rect: PixelRect,
    step: Option<usize>,
    transform: &dyn MapTransform,
) -> SceneResult<Envelope> {
    let step = step.unwrap_or(raster.width().min(raster.height()) / 2);
    let boundary = create_map_boundary(raster, rect, step, transform)?;
    min_max(&boundary).ok_or(SceneError::NoGeoCoding)
}

/// Output raster size covering `envelope` at the given pixel sizes.
pub fn output_raster_size(envelope: &Envelope, pixel_size_x: f64, pixel_size_y: f64) -> SceneResult<(usize, usize)> {
    if !(pixel_size_x > 0.0 && pixel_size_y > 0.0) {
        return Err(SceneError::invalid_argument(format!(
            "pixel sizes must be positive, got {} x {}",
            pixel_size_x, pixel_size_y
        )));
    }
    Ok((
        grid_extent(envelope.width(), pixel_size_x)?,
        grid_extent(envelope.height(), pixel_size_y)?,
    ))
}

/// `1 + floor(extent / pixel_size)`, failing for non-finite or unrepresentable sizes.
fn grid_extent(extent: f64, pixel_size: f64) -> SceneResult<usize> {
    let cells = (extent / pixel_size).floor();
    if !cells.is_finite() || cells < 0.0 || cells >= usize::MAX as f64 {
        return Err(SceneError::invalid_argument(format!(
            "map extent {} at pixel size {} does not give a finite grid",
            extent, pixel_size
        )));
    }
    (cells as usize)
        .checked_add(1)
        .ok_or_else(|| SceneError::invalid_argument(format!("grid extent {} overflows", cells)))
}

/// Where the reference pixel of an output grid sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "anchor", rename_all = "snake_case")]
pub enum GridAnchor {
    /// Center of the upper-left pixel, `(0.5, 0.5)`.
    UpperLeft,
    /// Center of the output grid, with orientation and no-data value.
    SceneCenter { orientation: f64, no_data_value: f64 },
}

/// Fully specified output grid in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputGrid {
    pub reference_pixel_x: f64,
    pub reference_pixel_y: f64,
    /// Map x of the reference pixel.
    pub easting: f64,
    /// Map y of the reference pixel.
    pub northing: f64,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    pub width: usize,
    pub height: usize,
    pub orientation: f64,
    pub no_data_value: f64,
}

/// Fit a square-pixel grid to `envelope` for a source raster of
/// `source_width` x `source_height` pixels.
///
/// `pixel_size = min(map_width / source_width, map_height / source_height)`,
/// replaced by 1.0 when it is zero, and the grid is
/// `1 + floor(extent / pixel_size)` pixels in each direction.
pub fn fit_output_grid(
    envelope: &Envelope,
    source_width: usize,
    source_height: usize,
    anchor: GridAnchor,
) -> SceneResult<OutputGrid> {
    if source_width == 0 || source_height == 0 {
        return Err(SceneError::invalid_argument(format!(
            "source raster must not be empty, got {}x{}",
            source_width, source_height
        )));
    }
    let map_w = envelope.width().abs();
    let map_h = envelope.height().abs();
    if !map_w.is_finite() || !map_h.is_finite() {
        return Err(SceneError::invalid_argument(format!(
            "map envelope must be finite, got {} x {}",
            map_w, map_h
        )));
    }
    let mut pixel_size = (map_w / source_width as f64).min(map_h / source_height as f64);
    if pixel_size.abs() < 1e-6 || !pixel_size.is_finite() {
        pixel_size = 1.0;
    }
    let width = grid_extent(map_w, pixel_size)?;
    let height = grid_extent(map_h, pixel_size)?;

    let grid = match anchor {
        GridAnchor::UpperLeft => OutputGrid {
            reference_pixel_x: 0.5,
            reference_pixel_y: 0.5,
            easting: envelope.min_x,
            northing: envelope.max_y,
            pixel_size_x: pixel_size,
            pixel_size_y: pixel_size,
            width,
            height,
            orientation: 0.0,
            no_data_value: DEFAULT_NO_DATA_VALUE,
        },
        GridAnchor::SceneCenter {
            orientation,
            no_data_value,
        } => {
            let pixel_x = 0.5 * width as f64;
            let pixel_y = 0.5 * height as f64;
            OutputGrid {
                reference_pixel_x: pixel_x,
                reference_pixel_y: pixel_y,
                easting: envelope.min_x + pixel_x * pixel_size,
                northing: envelope.max_y - pixel_y * pixel_size,
                pixel_size_x: pixel_size,
                pixel_size_y: pixel_size,
                width,
                height,
                orientation,
                no_data_value,
            }
        }
    };
    debug!(width, height, pixel_size, ?anchor, "fitted output grid");
    Ok(grid)
}

/// Output grid for `rect` of `raster` in the map coordinates of `transform`.
///
/// The upper-left anchor covers `rect`; the scene-center anchor always
/// covers the whole raster.
pub fn suitable_output_grid(
    raster: &dyn RasterView,
    rect: PixelRect,
    transform: &dyn MapTransform,
    anchor: GridAnchor,
) -> SceneResult<OutputGrid> {
    let rect = match anchor {
        GridAnchor::UpperLeft => rect,
        GridAnchor::SceneCenter { .. } => PixelRect::full(raster.width(), raster.height()),
    };
    let envelope = create_map_envelope(raster, rect, None, transform)?;
    fit_output_grid(&envelope, raster.width(), raster.height(), anchor)
}
