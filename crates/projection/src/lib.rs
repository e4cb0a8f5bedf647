//! Geographic boundaries of raster regions.
//!
//! Samples the perimeter of a pixel rectangle, maps it through the raster's
//! geocoding, removes antimeridian jumps and splits the result into fragments
//! that can be drawn without wraparound. Also derives map envelopes and
//! best-fit output grids from those boundaries.

pub mod boundary;
pub mod envelope;
pub mod geocoding;
pub mod lambert;
pub mod normalize;
pub mod split;

pub use boundary::{
    center_geo_pos, create_geo_boundary, create_rect_boundary, default_boundary_step, project,
    usable_geocoding,
};
pub use envelope::{
    create_map_boundary, create_map_envelope, fit_output_grid, min_max, output_raster_size,
    suitable_output_grid, GridAnchor, IdentityMapTransform, MapTransform, OutputGrid,
    DEFAULT_NO_DATA_VALUE,
};
pub use geocoding::{wrap_longitude, LatLonGridGeoCoding};
pub use lambert::LambertConformal;
pub use normalize::{
    angle_sum, denormalize_geo_pos, denormalize_polygon, normalize_polygon, rotation_direction,
    Normalization,
};
pub use split::{split_at_antimeridian, BoundaryFragment};

use scene_common::{PixelRect, RasterView, SceneResult};
use tracing::debug;

/// Antimeridian-safe boundary fragments of `region` (the whole raster when
/// `None`), sampled every `step` pixels along the pixel centers.
///
/// Without a step, [`default_boundary_step`] of the raster size is used.
pub fn create_geo_boundary_paths(
    raster: &dyn RasterView,
    region: Option<PixelRect>,
    step: Option<usize>,
) -> SceneResult<Vec<BoundaryFragment>> {
    let step = step.unwrap_or_else(|| default_boundary_step(raster.width(), raster.height()));
    let mut polygon = create_geo_boundary(raster, region, step, true)?;
    let normalization = normalize_polygon(&mut polygon);
    let fragments = split_at_antimeridian(&polygon);
    debug!(
        step,
        normalization = normalization.code(),
        fragments = fragments.len(),
        "boundary paths"
    );
    Ok(fragments)
}
