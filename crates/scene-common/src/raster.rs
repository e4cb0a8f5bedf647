//! Read-only raster band access.

use std::fmt;
use std::sync::Arc;

use crate::error::{SceneError, SceneResult};
use crate::geocoding::GeoCoding;

/// Read-only view of one band's samples.
///
/// Pixels are addressed by row-major index `y * width + x`. The core never
/// mutates a raster; it is borrowed for the duration of a single call.
pub trait RasterView: Sync {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn num_pixels(&self) -> usize {
        self.width() * self.height()
    }

    /// Geophysical sample value at the given pixel index.
    fn sample(&self, pixel_index: usize) -> f64;

    /// Whether the pixel holds valid data (no-data value, NaN and
    /// region-of-interest rules applied).
    fn is_pixel_valid(&self, pixel_index: usize) -> bool;

    /// Whether any validity masking applies to this band at all.
    fn valid_mask_used(&self) -> bool;

    /// Optional geocoding of the band.
    fn geocoding(&self) -> Option<&dyn GeoCoding> {
        None
    }
}

/// In-memory band of `f32` samples.
#[derive(Clone)]
pub struct SampleBand {
    name: String,
    width: usize,
    height: usize,
    data: Vec<f32>,
    no_data_value: Option<f64>,
    roi: Option<Vec<bool>>,
    has_nan: bool,
    geocoding: Option<Arc<dyn GeoCoding>>,
}

impl SampleBand {
    /// Create a band from row-major samples; `data.len()` must equal `width * height`.
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        data: Vec<f32>,
    ) -> SceneResult<Self> {
        if data.len() != width * height {
            return Err(SceneError::invalid_argument(format!(
                "band holds {} samples, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        let has_nan = data.iter().any(|v| v.is_nan());
        Ok(Self {
            name: name.into(),
            width,
            height,
            data,
            no_data_value: None,
            roi: None,
            has_nan,
            geocoding: None,
        })
    }

    /// Band filled with a single value.
    pub fn constant(name: impl Into<String>, width: usize, height: usize, value: f32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            data: vec![value; width * height],
            no_data_value: None,
            roi: None,
            has_nan: value.is_nan(),
            geocoding: None,
        }
    }

    /// Samples equal to `value` are treated as invalid.
    pub fn with_no_data_value(mut self, value: f64) -> Self {
        self.no_data_value = Some(value);
        self
    }

    /// Restrict valid pixels to those where `mask` is true.
    pub fn with_roi_mask(mut self, mask: Vec<bool>) -> SceneResult<Self> {
        if mask.len() != self.data.len() {
            return Err(SceneError::invalid_argument(format!(
                "ROI mask holds {} entries, expected {}",
                mask.len(),
                self.data.len()
            )));
        }
        self.roi = Some(mask);
        Ok(self)
    }

    pub fn with_geocoding(mut self, geocoding: Arc<dyn GeoCoding>) -> Self {
        self.geocoding = Some(geocoding);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn no_data_value(&self) -> Option<f64> {
        self.no_data_value
    }
}

impl fmt::Debug for SampleBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBand")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("no_data_value", &self.no_data_value)
            .field("roi", &self.roi.is_some())
            .field("geocoding", &self.geocoding.is_some())
            .finish()
    }
}

impl RasterView for SampleBand {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn sample(&self, pixel_index: usize) -> f64 {
        self.data.get(pixel_index).copied().unwrap_or(f32::NAN) as f64
    }

    fn is_pixel_valid(&self, pixel_index: usize) -> bool {
        let Some(&value) = self.data.get(pixel_index) else {
            return false;
        };
        if value.is_nan() {
            return false;
        }
        if let Some(no_data) = self.no_data_value {
            if value as f64 == no_data {
                return false;
            }
        }
        match &self.roi {
            Some(mask) => mask[pixel_index],
            None => true,
        }
    }

    fn valid_mask_used(&self) -> bool {
        self.no_data_value.is_some() || self.roi.is_some() || self.has_nan
    }

    fn geocoding(&self) -> Option<&dyn GeoCoding> {
        self.geocoding.as_deref()
    }
}
