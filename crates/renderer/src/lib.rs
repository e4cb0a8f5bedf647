//! Color image synthesis for remote-sensing rasters.
//!
//! Pipeline stages:
//! - [`quantize`]: sample values to bytes against a display range
//! - [`palette`]: color ramps and categorical index tables
//! - [`assemble`]: one band through a palette, or three bands as RGB
//! - [`histogram`]: optional equalization or normalization
//! - [`overlay`]: predicate-driven bitmask layers blended on top
//!
//! [`create_image`] runs them in that order.

pub mod assemble;
pub mod expr;
pub mod histogram;
pub mod image;
pub mod overlay;
pub mod palette;
pub mod png;
pub mod quantize;
pub mod style;
pub mod validity;

pub use assemble::{assemble, create_color_indexed_image, ImageInfo};
pub use expr::{ExprError, ThresholdEvaluator};
pub use histogram::{HistogramMatching, HistogramTransform, TiledHistogramTransform};
pub use image::{ChannelLayout, ImageBuffer, IndexedImage};
pub use overlay::{composite, CompiledPredicate, OverlayLayer, PixelContext, PredicateEvaluator};
pub use palette::{CategoryIndexMap, ColorPalette, PaletteMode, PalettePoint};
pub use quantize::{DisplayRange, QuantizeExt};
pub use style::{ImageInfoConfig, StyleError};
pub use validity::Validity;

use scene_common::{ProgressMonitor, RasterView, SceneResult, SubProgressMonitor};
use tracing::debug;

/// Assemble `rasters`, apply the histogram mode of `info`, then blend
/// `layers` on top.
pub fn create_image(
    rasters: &[&dyn RasterView],
    info: &ImageInfo,
    layers: &[OverlayLayer],
    evaluator: &dyn PredicateEvaluator,
    pm: &dyn ProgressMonitor,
) -> SceneResult<ImageBuffer> {
    debug!(
        bands = rasters.len(),
        layers = layers.len(),
        histogram = ?info.histogram_matching,
        "creating image"
    );
    pm.begin_task("Creating image", 6 + layers.len() as u32);
    let result = (|| -> SceneResult<ImageBuffer> {
        let image = assemble(rasters, info, &SubProgressMonitor::new(pm, 3))?;
        let image = histogram::adjust(
            image,
            info.histogram_matching,
            &TiledHistogramTransform::default(),
            &SubProgressMonitor::new(pm, 3),
        )?;
        composite(image, layers, evaluator, &SubProgressMonitor::new(pm, layers.len() as u32))
    })();
    pm.done();
    result
}
