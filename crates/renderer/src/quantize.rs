//! Sample quantization against a display range.
//!
//! A [`DisplayRange`] maps geophysical sample values onto the byte range
//! `[0, 255]`. Samples outside the range clamp, NaN quantizes to 0.

use scene_common::{check_cancelled, ProgressMonitor, RasterView, SceneError, SceneResult};
use serde::{Deserialize, Serialize};

/// Linear (optionally gamma-corrected) mapping from sample value to byte.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_gamma")]
    pub gamma: f64,
}

fn default_gamma() -> f64 {
    1.0
}

impl DisplayRange {
    /// Linear range, `gamma == 1`. Use [`validate`](Self::validate) before quantizing.
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            gamma: 1.0,
        }
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Check `min < max` and `gamma` finite and positive.
    pub fn validate(&self) -> SceneResult<()> {
        let ordered = self.min < self.max;
        if !ordered || !self.min.is_finite() || !self.max.is_finite() {
            return Err(SceneError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(SceneError::InvalidGamma(self.gamma));
        }
        Ok(())
    }

    /// Position of `sample` within the range, clamped to [0, 1], gamma applied.
    ///
    /// Returns NaN for a NaN sample.
    pub fn normalize(&self, sample: f64) -> f64 {
        let t = ((sample - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        if self.gamma == 1.0 {
            t
        } else {
            t.powf(1.0 / self.gamma)
        }
    }

    /// Byte index of `sample`: `round(255 * normalize(sample))`.
    #[inline]
    pub fn quantize(&self, sample: f64) -> u8 {
        let t = self.normalize(sample);
        if t.is_nan() {
            return 0;
        }
        (255.0 * t).round() as u8
    }

    /// Sample value represented by byte index `index` (inverse of the linear part).
    pub fn sample_at(&self, index: u8) -> f64 {
        self.min + (self.max - self.min) * index as f64 / 255.0
    }
}

/// Quantization of a whole raster into a caller-supplied byte buffer.
pub trait QuantizeExt: RasterView {
    /// Write the quantized index of pixel `i` to `buffer[offset + i * stride]`.
    ///
    /// The stride/offset pair lets callers fill one channel of an
    /// interleaved image. Cancellation is polled once per scan line.
    fn quantize_into(
        &self,
        range: &DisplayRange,
        buffer: &mut [u8],
        offset: usize,
        stride: usize,
        pm: &dyn ProgressMonitor,
    ) -> SceneResult<()> {
        range.validate()?;
        let width = self.width();
        let height = self.height();
        let num_pixels = width * height;
        if num_pixels == 0 {
            return Ok(());
        }
        if stride == 0 || offset + (num_pixels - 1) * stride >= buffer.len() {
            return Err(SceneError::invalid_argument(format!(
                "buffer of {} bytes too small for {} pixels at offset {} stride {}",
                buffer.len(),
                num_pixels,
                offset,
                stride
            )));
        }

        pm.begin_task("Quantizing raster data", height as u32);
        for y in 0..height {
            let row_start = y * width;
            for x in 0..width {
                let pixel = row_start + x;
                buffer[offset + pixel * stride] = range.quantize(self.sample(pixel));
            }
            pm.worked(1);
            if let Err(e) = check_cancelled(pm) {
                pm.done();
                return Err(e);
            }
        }
        pm.done();
        Ok(())
    }

    /// Quantize into a fresh one-byte-per-pixel buffer.
    fn quantize(&self, range: &DisplayRange, pm: &dyn ProgressMonitor) -> SceneResult<Vec<u8>> {
        let mut buffer = vec![0u8; self.num_pixels()];
        self.quantize_into(range, &mut buffer, 0, 1, pm)?;
        Ok(buffer)
    }
}

impl<R: RasterView + ?Sized> QuantizeExt for R {}
