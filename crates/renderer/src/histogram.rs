//! Histogram equalization and normalization of assembled images.
//!
//! Both operations build a per-channel 256-bin histogram, turn it into a
//! cumulative distribution and map every byte to the bin of a target
//! distribution with the same cumulative value: a uniform one for
//! equalization, a Gaussian with the channel's own mean and standard
//! deviation for normalization. The alpha channel is never touched.

use rayon::prelude::*;
use scene_common::{check_cancelled, ProgressMonitor, SceneError, SceneResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::image::ImageBuffer;

const BINS: usize = 256;

/// Tonal post-processing applied to an assembled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistogramMatching {
    #[default]
    None,
    Equalize,
    Normalize,
}

/// Histogram transform over 8-bit images.
pub trait HistogramTransform: Sync {
    fn equalize(&self, image: &mut ImageBuffer, pm: &dyn ProgressMonitor) -> SceneResult<()>;

    fn normalize(&self, image: &mut ImageBuffer, pm: &dyn ProgressMonitor) -> SceneResult<()>;
}

/// Apply `mode` to `image`; `HistogramMatching::None` returns it unchanged.
pub fn adjust(
    mut image: ImageBuffer,
    mode: HistogramMatching,
    transform: &dyn HistogramTransform,
    pm: &dyn ProgressMonitor,
) -> SceneResult<ImageBuffer> {
    match mode {
        HistogramMatching::None => return Ok(image),
        HistogramMatching::Equalize => transform.equalize(&mut image, pm)?,
        HistogramMatching::Normalize => transform.normalize(&mut image, pm)?,
    }
    Ok(image)
}

/// Histogram transform that processes the image in square tiles.
///
/// Tiles are a unit of parallel work and cancellation; the histogram
/// itself is global, so the result does not depend on the tile size.
#[derive(Debug, Clone, Copy)]
pub struct TiledHistogramTransform {
    pub tile_size: usize,
}

impl Default for TiledHistogramTransform {
    fn default() -> Self {
        Self { tile_size: 512 }
    }
}

type Histogram = [u64; BINS];

#[derive(Clone, Copy)]
struct Tile {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl TiledHistogramTransform {
    pub fn new(tile_size: usize) -> SceneResult<Self> {
        if tile_size == 0 {
            return Err(SceneError::invalid_argument("histogram tile size must be positive"));
        }
        Ok(Self { tile_size })
    }

    fn tiles(&self, width: usize, height: usize) -> Vec<Tile> {
        let ts = self.tile_size.max(1);
        let mut tiles = Vec::new();
        for y0 in (0..height).step_by(ts) {
            for x0 in (0..width).step_by(ts) {
                tiles.push(Tile {
                    x0,
                    y0,
                    x1: (x0 + ts).min(width),
                    y1: (y0 + ts).min(height),
                });
            }
        }
        tiles
    }

    /// One histogram per color channel, in the image's byte order.
    fn histograms(&self, image: &ImageBuffer, pm: &dyn ProgressMonitor) -> SceneResult<Vec<Histogram>> {
        let layout = image.layout();
        let offsets: Vec<usize> = layout.color_offsets().collect();
        let n = layout.channels();
        let row_len = image.row_len();
        let data = image.data();

        let per_tile: Vec<Vec<Histogram>> = self
            .tiles(image.width(), image.height())
            .into_par_iter()
            .map(|tile| -> SceneResult<Vec<Histogram>> {
                check_cancelled(pm)?;
                let mut local = vec![[0u64; BINS]; offsets.len()];
                for y in tile.y0..tile.y1 {
                    let row = &data[y * row_len..(y + 1) * row_len];
                    for pixel in row[tile.x0 * n..tile.x1 * n].chunks_exact(n) {
                        for (hist, &offset) in local.iter_mut().zip(&offsets) {
                            hist[pixel[offset] as usize] += 1;
                        }
                    }
                }
                Ok(local)
            })
            .collect::<SceneResult<_>>()?;

        let mut total = vec![[0u64; BINS]; offsets.len()];
        for tile in per_tile {
            for (sum, hist) in total.iter_mut().zip(tile) {
                for (s, h) in sum.iter_mut().zip(hist.iter()) {
                    *s += h;
                }
            }
        }
        Ok(total)
    }

    fn apply<F>(&self, image: &mut ImageBuffer, pm: &dyn ProgressMonitor, target_cdf: F) -> SceneResult<()>
    where
        F: Fn(&Histogram) -> Option<[f64; BINS]>,
    {
        if image.width() == 0 || image.height() == 0 {
            return Ok(());
        }
        pm.begin_task("Matching histogram", 2);
        let result = (|| -> SceneResult<()> {
            let histograms = self.histograms(image, pm)?;
            pm.worked(1);

            let luts: Vec<[u8; BINS]> = histograms
                .iter()
                .map(|hist| match target_cdf(hist) {
                    Some(target) => match_cdf(&cumulative(hist), &target),
                    None => identity_lut(),
                })
                .collect();

            let layout = image.layout();
            let offsets: Vec<usize> = layout.color_offsets().collect();
            let n = layout.channels();
            let band_len = image.row_len() * self.tile_size.max(1);
            image
                .data_mut()
                .par_chunks_mut(band_len)
                .try_for_each(|band| -> SceneResult<()> {
                    check_cancelled(pm)?;
                    for pixel in band.chunks_exact_mut(n) {
                        for (lut, &offset) in luts.iter().zip(&offsets) {
                            pixel[offset] = lut[pixel[offset] as usize];
                        }
                    }
                    Ok(())
                })?;
            pm.worked(1);
            Ok(())
        })();
        pm.done();
        result
    }
}

impl HistogramTransform for TiledHistogramTransform {
    fn equalize(&self, image: &mut ImageBuffer, pm: &dyn ProgressMonitor) -> SceneResult<()> {
        debug!(width = image.width(), height = image.height(), "equalizing histogram");
        self.apply(image, pm, |_| Some(uniform_cdf()))
    }

    fn normalize(&self, image: &mut ImageBuffer, pm: &dyn ProgressMonitor) -> SceneResult<()> {
        debug!(width = image.width(), height = image.height(), "normalizing histogram");
        self.apply(image, pm, gaussian_cdf)
    }
}

/// Cumulative distribution of a histogram, ending at 1.0.
fn cumulative(hist: &Histogram) -> [f64; BINS] {
    let total: u64 = hist.iter().sum();
    let mut cdf = [0.0; BINS];
    if total == 0 {
        return cdf;
    }
    let mut running = 0u64;
    for (c, &h) in cdf.iter_mut().zip(hist.iter()) {
        running += h;
        *c = running as f64 / total as f64;
    }
    cdf
}

fn uniform_cdf() -> [f64; BINS] {
    let mut cdf = [0.0; BINS];
    for (i, c) in cdf.iter_mut().enumerate() {
        *c = (i + 1) as f64 / BINS as f64;
    }
    cdf
}

/// Gaussian target with the histogram's mean and standard deviation;
/// `None` for an empty or single-valued histogram.
fn gaussian_cdf(hist: &Histogram) -> Option<[f64; BINS]> {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return None;
    }
    let n = total as f64;
    let mean = hist.iter().enumerate().map(|(i, &h)| i as f64 * h as f64).sum::<f64>() / n;
    let variance = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| (i as f64 - mean).powi(2) * h as f64)
        .sum::<f64>()
        / n;
    if variance <= 0.0 {
        return None;
    }

    let two_sigma_sq = 2.0 * variance;
    let mut cdf = [0.0; BINS];
    let mut running = 0.0;
    for (i, c) in cdf.iter_mut().enumerate() {
        let d = i as f64 - mean;
        running += (-d * d / two_sigma_sq).exp();
        *c = running;
    }
    let last = cdf[BINS - 1];
    for c in cdf.iter_mut() {
        *c /= last;
    }
    cdf[BINS - 1] = 1.0;
    Some(cdf)
}

/// For each source bin, the first target bin whose cumulative value reaches
/// the source's.
fn match_cdf(source: &[f64; BINS], target: &[f64; BINS]) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    for (l, &s) in lut.iter_mut().zip(source.iter()) {
        let j = target.partition_point(|&t| t < s - 1e-12);
        *l = j.min(BINS - 1) as u8;
    }
    lut
}

fn identity_lut() -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    for (i, l) in lut.iter_mut().enumerate() {
        *l = i as u8;
    }
    lut
}
