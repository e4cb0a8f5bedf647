//! Band loading, rendering and boundary export for the quicklook CLI.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use geo::CoordsIter;
use projection::BoundaryFragment;
use renderer::png::{encode_image, encode_indexed};
use renderer::{
    create_color_indexed_image, create_image, ColorPalette, ImageInfo, OverlayLayer, PaletteMode,
    PredicateEvaluator,
};
use scene_common::{ProgressMonitor, RasterView, SampleBand};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Read a band of little-endian `f32` samples, row-major.
pub fn read_raw_band(path: &Path, name: &str, width: usize, height: usize) -> Result<SampleBand> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read band {}", path.display()))?;
    let expected = width * height * 4;
    if bytes.len() != expected {
        bail!(
            "{} holds {} bytes, expected {} for {}x{} float32 samples",
            path.display(),
            bytes.len(),
            expected,
            width,
            height
        );
    }
    let data = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    debug!(path = %path.display(), width, height, "read raw band");
    Ok(SampleBand::new(name, width, height, data)?)
}

/// Brightness-temperature-like demo scene: cold north, warm south, a
/// diagonal front.
pub fn synthetic_band(name: &str, width: usize, height: usize) -> Result<SampleBand> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let lat = y as f32 / height.max(1) as f32;
            let front = ((x as f32 + y as f32) / 24.0).sin();
            data.push(230.0 + 70.0 * lat + 4.0 * front);
        }
    }
    Ok(SampleBand::new(name, width, height, data)?)
}

/// Grey ramp over the finite sample range of `band`.
pub fn default_image_info(band: &SampleBand) -> Result<ImageInfo> {
    let (min, max) = (0..band.num_pixels())
        .filter(|&i| band.is_pixel_valid(i))
        .map(|i| band.sample(i))
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (min, max) = if min > max {
        (0.0, 1.0)
    } else if min == max {
        (min, min + 1.0)
    } else {
        (min, max)
    };
    info!(min, max, "no style given, using grey ramp");
    Ok(ImageInfo::with_palette(PaletteMode::Ramp(ColorPalette::grey(min, max)?)))
}

/// Bands handed to the renderer: `primary` alone for palette styles,
/// `primary` followed by the green and blue `channels` for RGB styles.
pub fn select_rasters<'a>(
    info: &ImageInfo,
    primary: &'a SampleBand,
    channels: &'a [SampleBand],
) -> Result<Vec<&'a dyn RasterView>> {
    match (info.rgb_ranges.is_some(), channels) {
        (false, []) => Ok(vec![primary as &dyn RasterView]),
        (false, _) => bail!("style defines a palette; --green and --blue are only used with RGB ranges"),
        (true, [green, blue]) => Ok(vec![
            primary as &dyn RasterView,
            green as &dyn RasterView,
            blue as &dyn RasterView,
        ]),
        (true, _) => bail!("style defines RGB ranges; pass --green and --blue bands along with --input"),
    }
}

/// Render the quicklook PNG.
///
/// `indexed` writes the palette image of a single ramp band directly,
/// without overlays or histogram matching.
pub fn render_png(
    rasters: &[&dyn RasterView],
    info: &ImageInfo,
    layers: &[OverlayLayer],
    evaluator: &dyn PredicateEvaluator,
    indexed: bool,
    pm: &dyn ProgressMonitor,
) -> Result<Vec<u8>> {
    if indexed {
        let (Some(PaletteMode::Ramp(palette)), [raster]) = (&info.palette, rasters) else {
            bail!("indexed output needs one band and a non-categorical palette");
        };
        let image = create_color_indexed_image(*raster, palette, pm)?;
        return Ok(encode_indexed(&image)?);
    }
    let image = create_image(rasters, info, layers, evaluator, pm)?;
    Ok(encode_image(&image)?)
}

/// Boundary fragments as a GeoJSON feature collection, one multi-polygon
/// feature per fragment.
pub fn boundary_geojson(fragments: &[BoundaryFragment]) -> Value {
    let features: Vec<Value> = fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| {
            let polygons: Vec<Value> = fragment
                .0
                .iter()
                .map(|polygon| {
                    let ring: Vec<[f64; 2]> = polygon.exterior_coords_iter().map(|c| [c.x, c.y]).collect();
                    json!([ring])
                })
                .collect();
            json!({
                "type": "Feature",
                "properties": { "fragment": i },
                "geometry": { "type": "MultiPolygon", "coordinates": polygons },
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

/// Progress monitor that logs task starts and every tenth of the work.
#[derive(Default)]
pub struct TracingProgress {
    task: Mutex<String>,
    total: AtomicU32,
    worked: AtomicU32,
}

impl ProgressMonitor for TracingProgress {
    fn begin_task(&self, name: &str, total_work: u32) {
        if let Ok(mut task) = self.task.lock() {
            *task = name.to_string();
        }
        self.total.store(total_work, Ordering::Relaxed);
        self.worked.store(0, Ordering::Relaxed);
        debug!(task = name, total_work, "task started");
    }

    fn worked(&self, units: u32) {
        let total = self.total.load(Ordering::Relaxed).max(1);
        let before = self.worked.fetch_add(units, Ordering::Relaxed);
        let after = before + units;
        if before * 10 / total != after * 10 / total {
            let task = self.task.lock().map(|t| t.clone()).unwrap_or_default();
            debug!(task = %task, percent = (after * 100 / total).min(100), "progress");
        }
    }

    fn set_sub_task_name(&self, name: &str) {
        debug!(sub_task = name, "progress");
    }

    fn is_cancelled(&self) -> bool {
        false
    }

    fn done(&self) {
        let task = self.task.lock().map(|t| t.clone()).unwrap_or_default();
        debug!(task = %task, "task done");
    }
}
