//! Image assembly: one band through a palette, or three bands as RGB.

use rayon::prelude::*;
use scene_common::{
    check_cancelled, Color, NullProgressMonitor, ProgressMonitor, RasterView, SceneError,
    SceneResult, SubProgressMonitor,
};
use tracing::debug;

use crate::histogram::HistogramMatching;
use crate::image::{ChannelLayout, ImageBuffer, IndexedImage};
use crate::palette::{CategoryIndexMap, ColorPalette, PaletteMode};
use crate::quantize::{DisplayRange, QuantizeExt};
use crate::validity::Validity;

const MSG_CREATING_IMAGE: &str = "Creating image";

const CHANNEL_TASKS: [&str; 3] = [
    "Computing red channel",
    "Computing green channel",
    "Computing blue channel",
];

/// Display settings for turning rasters into an image.
///
/// Single-band images need `palette`, three-band images need `rgb_ranges`
/// (red, green, blue order).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub layout: ChannelLayout,
    pub no_data_color: Color,
    pub histogram_matching: HistogramMatching,
    pub palette: Option<PaletteMode>,
    pub rgb_ranges: Option<[DisplayRange; 3]>,
}

impl ImageInfo {
    pub fn with_palette(mode: PaletteMode) -> Self {
        Self {
            layout: ChannelLayout::Bgr,
            no_data_color: Color::transparent(),
            histogram_matching: HistogramMatching::None,
            palette: Some(mode),
            rgb_ranges: None,
        }
    }

    pub fn with_rgb_ranges(ranges: [DisplayRange; 3]) -> Self {
        Self {
            layout: ChannelLayout::Bgr,
            no_data_color: Color::transparent(),
            histogram_matching: HistogramMatching::None,
            palette: None,
            rgb_ranges: Some(ranges),
        }
    }

    pub fn layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn no_data_color(mut self, color: Color) -> Self {
        self.no_data_color = color;
        self
    }

    pub fn histogram_matching(mut self, matching: HistogramMatching) -> Self {
        self.histogram_matching = matching;
        self
    }
}

/// Assemble one band (palette image) or three bands (RGB image).
///
/// Invalid pixels receive `info.no_data_color`. Valid RGB pixels of a
/// four-channel image are fully opaque.
pub fn assemble(
    rasters: &[&dyn RasterView],
    info: &ImageInfo,
    pm: &dyn ProgressMonitor,
) -> SceneResult<ImageBuffer> {
    match rasters {
        [raster] => assemble_single(*raster, info, pm),
        [red, green, blue] => assemble_rgb([*red, *green, *blue], info, pm),
        _ => Err(SceneError::ArgumentCount(rasters.len())),
    }
}

fn assemble_single(
    raster: &dyn RasterView,
    info: &ImageInfo,
    pm: &dyn ProgressMonitor,
) -> SceneResult<ImageBuffer> {
    let mode = info
        .palette
        .as_ref()
        .ok_or_else(|| SceneError::invalid_argument("single-band image requires a color palette"))?;
    let (width, height) = (raster.width(), raster.height());
    debug!(
        width,
        height,
        categorical = matches!(mode, PaletteMode::Categorical(_)),
        "assembling single-band image"
    );

    pm.begin_task(MSG_CREATING_IMAGE, 100);
    let result = (|| -> SceneResult<ImageBuffer> {
        let (indices, lookup, no_data_index) = match mode {
            PaletteMode::Ramp(palette) => {
                let range = palette.display_range();
                let indices = raster.quantize(&range, &SubProgressMonitor::new(pm, 50))?;
                (indices, palette.create_lookup(&range), None)
            }
            PaletteMode::Categorical(palette) => {
                let (indices, map) = resolve_categories(raster, palette, pm)?;
                pm.worked(50);
                let mut lookup: Vec<Color> = palette.points().iter().map(|p| p.color).collect();
                lookup.push(Color::transparent());
                (indices, lookup, Some(map.no_data_index()))
            }
        };
        check_cancelled(pm)?;

        let validity = Validity::single_band(raster, no_data_index.map(|nd| (&indices[..], nd)));
        let image = paint_indices(width, height, info, &indices, &lookup, &validity);
        pm.worked(50);
        check_cancelled(pm)?;
        Ok(image)
    })();
    pm.done();
    result
}

/// Look integer samples up in the category table; unmapped codes get the
/// reserved no-data index.
fn resolve_categories(
    raster: &dyn RasterView,
    palette: &ColorPalette,
    pm: &dyn ProgressMonitor,
) -> SceneResult<(Vec<u8>, CategoryIndexMap)> {
    let map = CategoryIndexMap::from_points(palette.points())?;
    let no_data_index = map.no_data_index();
    let width = raster.width();
    let mut indices = vec![no_data_index; raster.num_pixels()];
    for (y, row) in indices.chunks_mut(width.max(1)).enumerate() {
        for (x, index) in row.iter_mut().enumerate() {
            let sample = raster.sample(y * width + x);
            *index = map.get(sample as i64).unwrap_or(no_data_index);
        }
        check_cancelled(pm)?;
    }
    Ok((indices, map))
}

fn paint_indices(
    width: usize,
    height: usize,
    info: &ImageInfo,
    indices: &[u8],
    lookup: &[Color],
    validity: &Validity<'_>,
) -> ImageBuffer {
    let mut image = ImageBuffer::new(width, height, info.layout);
    let layout = info.layout;
    let n = layout.channels();
    let row_len = image.row_len();
    if row_len == 0 {
        return image;
    }
    image
        .data_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.chunks_exact_mut(n).enumerate() {
                let i = y * width + x;
                let color = if validity.is_valid(i) {
                    lookup
                        .get(indices[i] as usize)
                        .copied()
                        .unwrap_or(info.no_data_color)
                } else {
                    info.no_data_color
                };
                layout.write(pixel, color);
            }
        });
    image
}

fn assemble_rgb(
    rasters: [&dyn RasterView; 3],
    info: &ImageInfo,
    pm: &dyn ProgressMonitor,
) -> SceneResult<ImageBuffer> {
    let ranges = info
        .rgb_ranges
        .ok_or_else(|| SceneError::invalid_argument("RGB image requires three display ranges"))?;
    let expected = (rasters[0].width(), rasters[0].height());
    for raster in &rasters[1..] {
        let found = (raster.width(), raster.height());
        if found != expected {
            return Err(SceneError::DimensionMismatch { expected, found });
        }
    }
    for range in &ranges {
        range.validate()?;
    }
    let (width, height) = expected;
    debug!(width, height, "assembling RGB image");

    pm.begin_task(MSG_CREATING_IMAGE, 100);
    let result = (|| -> SceneResult<ImageBuffer> {
        // Bands write disjoint channel slots, so they are quantized independently.
        let channels: Vec<Vec<u8>> = (0..3)
            .into_par_iter()
            .map(|band| {
                debug!(task = CHANNEL_TASKS[band], "quantizing");
                let sub = SubProgressMonitor::new(pm, 30);
                rasters[band].quantize(&ranges[band], &sub)
            })
            .collect::<SceneResult<_>>()?;
        check_cancelled(pm)?;

        let layout = info.layout;
        let n = layout.channels();
        let offsets = [layout.band_offset(0), layout.band_offset(1), layout.band_offset(2)];
        let validity = Validity::three_band(rasters);
        let mut image = ImageBuffer::new(width, height, layout);
        let row_len = image.row_len();
        if row_len > 0 {
            image
                .data_mut()
                .par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, pixel) in row.chunks_exact_mut(n).enumerate() {
                        let i = y * width + x;
                        if validity.is_valid(i) {
                            for (band, &offset) in offsets.iter().enumerate() {
                                pixel[offset] = channels[band][i];
                            }
                            if layout.has_alpha() {
                                pixel[0] = 255;
                            }
                        } else {
                            layout.write(pixel, info.no_data_color);
                        }
                    }
                });
        }
        pm.worked(10);
        check_cancelled(pm)?;
        Ok(image)
    })();
    pm.done();
    result
}

/// Quantize one band against a palette's display range into an indexed
/// image carrying the palette's 256-color lookup table.
pub fn create_color_indexed_image(
    raster: &dyn RasterView,
    palette: &ColorPalette,
    pm: &dyn ProgressMonitor,
) -> SceneResult<IndexedImage> {
    let range = palette.display_range();
    let indices = raster.quantize(&range, pm)?;
    Ok(IndexedImage {
        width: raster.width(),
        height: raster.height(),
        indices,
        palette: palette.create_lookup(&range),
    })
}

/// Assemble without progress reporting.
pub fn assemble_quiet(rasters: &[&dyn RasterView], info: &ImageInfo) -> SceneResult<ImageBuffer> {
    assemble(rasters, info, &NullProgressMonitor)
}
