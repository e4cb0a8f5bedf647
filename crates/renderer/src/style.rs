//! Image-info configuration loaded from JSON.
//!
//! ```json
//! {
//!   "palette": {
//!     "categorical": false,
//!     "points": [
//!       { "sample": 270.0, "color": "#0000FF", "label": "cold" },
//!       { "sample": 310.0, "color": "#FF0000" }
//!     ]
//!   },
//!   "layout": "abgr",
//!   "no_data_color": "#00000000",
//!   "histogram_matching": "equalize",
//!   "bitmasks": [
//!     { "name": "cloud", "expr": "flags & 0x04", "color": "white", "alpha": 0.5 }
//!   ]
//! }
//! ```
//!
//! RGB images use `"rgb": [{ "min": 0, "max": 1, "gamma": 1.0 }, ...]`
//! (red, green, blue) instead of `palette`.

use std::path::Path;

use scene_common::{Color, ColorSpec, SceneError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assemble::ImageInfo;
use crate::histogram::HistogramMatching;
use crate::image::ChannelLayout;
use crate::overlay::OverlayLayer;
use crate::palette::{ColorPalette, PaletteMode, PalettePoint};
use crate::quantize::DisplayRange;

/// Errors raised while loading or converting an [`ImageInfoConfig`].
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("Failed to read style file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse style JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid color for {field}: {value:?}")]
    InvalidColor { field: String, value: ColorSpec },

    #[error("Style defines neither a palette nor RGB display ranges")]
    MissingDisplay,

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Image display configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageInfoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<PaletteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<[DisplayRange; 3]>,
    #[serde(default)]
    pub layout: ChannelLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_data_color: Option<ColorSpec>,
    #[serde(default)]
    pub histogram_matching: HistogramMatching,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bitmasks: Vec<BitmaskConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaletteConfig {
    pub points: Vec<PalettePointConfig>,
    #[serde(default)]
    pub categorical: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PalettePointConfig {
    pub sample: f64,
    pub color: ColorSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One overlay layer definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BitmaskConfig {
    pub name: String,
    pub expr: String,
    pub color: ColorSpec,
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

fn default_alpha() -> f32 {
    0.5
}

fn resolve_color(field: impl Into<String>, spec: &ColorSpec) -> Result<Color, StyleError> {
    spec.to_color().ok_or_else(|| StyleError::InvalidColor {
        field: field.into(),
        value: spec.clone(),
    })
}

impl ImageInfoConfig {
    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, StyleError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StyleError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Palette mode, or `None` when the configuration has no palette.
    pub fn to_palette_mode(&self) -> Result<Option<PaletteMode>, StyleError> {
        let Some(config) = &self.palette else {
            return Ok(None);
        };
        let points = config
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let color = resolve_color(format!("palette point {}", i), &p.color)?;
                let point = PalettePoint::new(p.sample, color);
                Ok(match &p.label {
                    Some(label) => point.with_label(label.clone()),
                    None => point,
                })
            })
            .collect::<Result<Vec<_>, StyleError>>()?;
        let palette = ColorPalette::new(points)?;
        Ok(Some(if config.categorical {
            PaletteMode::Categorical(palette)
        } else {
            PaletteMode::Ramp(palette)
        }))
    }

    /// Build the assembler settings; a palette takes precedence over RGB ranges.
    pub fn to_image_info(&self) -> Result<ImageInfo, StyleError> {
        let mut info = match (self.to_palette_mode()?, self.rgb) {
            (Some(mode), _) => ImageInfo::with_palette(mode),
            (None, Some(ranges)) => {
                for range in &ranges {
                    range.validate()?;
                }
                ImageInfo::with_rgb_ranges(ranges)
            }
            (None, None) => return Err(StyleError::MissingDisplay),
        };
        if let Some(spec) = &self.no_data_color {
            info = info.no_data_color(resolve_color("no_data_color", spec)?);
        }
        Ok(info
            .layout(self.layout)
            .histogram_matching(self.histogram_matching))
    }

    /// Overlay layers in declaration order.
    pub fn to_overlay_layers(&self) -> Result<Vec<OverlayLayer>, StyleError> {
        self.bitmasks
            .iter()
            .map(|mask| {
                let color = resolve_color(format!("bitmask '{}'", mask.name), &mask.color)?;
                if !(0.0..=1.0).contains(&mask.alpha) {
                    return Err(SceneError::invalid_argument(format!(
                        "alpha of bitmask '{}' must be within [0, 1], got {}",
                        mask.name, mask.alpha
                    ))
                    .into());
                }
                Ok(OverlayLayer::new(&mask.name, &mask.expr, color, mask.alpha))
            })
            .collect()
    }
}
