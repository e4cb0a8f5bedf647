//! Color palettes: continuous color ramps and categorical index tables.

use std::collections::HashMap;

use scene_common::{Color, SceneError, SceneResult};
use serde::{Deserialize, Serialize};

use crate::quantize::DisplayRange;

/// Number of entries in a quantized color lookup table.
pub const PALETTE_SIZE: usize = 256;

/// Category value ranges up to this width use a dense lookup table.
const DENSE_CATEGORY_RANGE: i64 = 4098;

/// A color breakpoint of a palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalettePoint {
    pub sample: f64,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl PalettePoint {
    pub fn new(sample: f64, color: Color) -> Self {
        Self {
            sample,
            color,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Ordered list of breakpoints with strictly increasing sample values.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPalette {
    points: Vec<PalettePoint>,
}

impl ColorPalette {
    pub fn new(points: Vec<PalettePoint>) -> SceneResult<Self> {
        if points.is_empty() {
            return Err(SceneError::PaletteEmpty);
        }
        for (i, pair) in points.windows(2).enumerate() {
            let ordered = pair[0].sample < pair[1].sample;
            if !ordered {
                return Err(SceneError::UnsortedPalette { index: i + 1 });
            }
        }
        Ok(Self { points })
    }

    /// Two-point grey ramp from black at `min` to white at `max`.
    pub fn grey(min: f64, max: f64) -> SceneResult<Self> {
        Self::new(vec![
            PalettePoint::new(min, Color::BLACK),
            PalettePoint::new(max, Color::WHITE),
        ])
    }

    pub fn points(&self) -> &[PalettePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Display range spanned by the first and last breakpoint.
    pub fn display_range(&self) -> DisplayRange {
        let first = self.points[0].sample;
        let last = self.points[self.points.len() - 1].sample;
        DisplayRange::new(first, last)
    }

    /// Color of `sample`, interpolated between the bracketing breakpoints and
    /// clamped to the end colors outside the breakpoint range.
    pub fn color_at(&self, sample: f64) -> Color {
        let first = &self.points[0];
        if sample.is_nan() || sample <= first.sample {
            return first.color;
        }
        let last = &self.points[self.points.len() - 1];
        if sample >= last.sample {
            return last.color;
        }
        // partition_point: first breakpoint strictly above sample
        let upper = self.points.partition_point(|p| p.sample <= sample);
        let lo = &self.points[upper - 1];
        let hi = &self.points[upper];
        let t = (sample - lo.sample) / (hi.sample - lo.sample);
        lo.color.lerp(&hi.color, t)
    }

    /// 256-entry lookup table: entry `i` holds the color of the sample that
    /// quantizes to index `i` under `range`.
    pub fn create_lookup(&self, range: &DisplayRange) -> Vec<Color> {
        (0..PALETTE_SIZE)
            .map(|i| self.color_at(range.sample_at(i as u8)))
            .collect()
    }
}

/// Maps raw integer category codes to palette indices.
///
/// Compact code ranges are served from a dense table, wide or scattered
/// code sets from a hash map, so memory is bounded by the number of
/// categories rather than the code range.
#[derive(Debug, Clone)]
pub struct CategoryIndexMap {
    repr: CategoryRepr,
    categories: usize,
}

#[derive(Debug, Clone)]
enum CategoryRepr {
    Dense { offset: i64, table: Vec<Option<u8>> },
    Sparse(HashMap<i64, u8>),
}

impl CategoryIndexMap {
    /// Build the map from categorical palette points; point `i` gets index `i`.
    ///
    /// One slot after the last category is reserved for no-data, so at most
    /// 255 categories are accepted.
    pub fn from_points(points: &[PalettePoint]) -> SceneResult<Self> {
        if points.is_empty() {
            return Err(SceneError::PaletteEmpty);
        }
        if points.len() >= PALETTE_SIZE {
            return Err(SceneError::PaletteOverflow {
                categories: points.len(),
            });
        }

        let codes: Vec<i64> = points.iter().map(|p| p.sample as i64).collect();
        for (index, code) in codes.iter().enumerate() {
            if let Some(first) = codes[..index].iter().position(|c| c == code) {
                return Err(SceneError::invalid_argument(format!(
                    "category points {} ({}) and {} ({}) share code {}",
                    first, points[first].sample, index, points[index].sample, code
                )));
            }
        }
        let min = codes.iter().copied().min().unwrap_or(0);
        let max = codes.iter().copied().max().unwrap_or(0);

        let span = max
            .checked_sub(min)
            .filter(|span| *span < DENSE_CATEGORY_RANGE);
        let repr = if let Some(span) = span {
            let mut table = vec![None; span as usize + 1];
            for (index, code) in codes.iter().enumerate() {
                table[(code - min) as usize] = Some(index as u8);
            }
            CategoryRepr::Dense { offset: min, table }
        } else {
            let map = codes
                .iter()
                .enumerate()
                .map(|(index, &code)| (code, index as u8))
                .collect();
            CategoryRepr::Sparse(map)
        };

        Ok(Self {
            repr,
            categories: points.len(),
        })
    }

    /// Palette index of a category code, `None` if the code is unmapped.
    #[inline]
    pub fn get(&self, code: i64) -> Option<u8> {
        match &self.repr {
            CategoryRepr::Dense { offset, table } => {
                let slot = code.checked_sub(*offset)?;
                if slot < 0 {
                    return None;
                }
                table.get(slot as usize).copied().flatten()
            }
            CategoryRepr::Sparse(map) => map.get(&code).copied(),
        }
    }

    /// Index of the entry reserved for unmapped codes.
    pub fn no_data_index(&self) -> u8 {
        self.categories as u8
    }

    pub fn len(&self) -> usize {
        self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories == 0
    }

    pub fn is_dense(&self) -> bool {
        matches!(self.repr, CategoryRepr::Dense { .. })
    }
}

/// How a single band is turned into palette indices.
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteMode {
    /// Quantize against the palette's display range and look up the ramp.
    Ramp(ColorPalette),
    /// Look integer samples up as category codes; each point is one category.
    Categorical(ColorPalette),
}

impl PaletteMode {
    pub fn palette(&self) -> &ColorPalette {
        match self {
            PaletteMode::Ramp(p) | PaletteMode::Categorical(p) => p,
        }
    }
}
