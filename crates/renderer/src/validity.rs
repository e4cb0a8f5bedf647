//! Per-pixel validity of assembled images.

use scene_common::RasterView;

/// Decides whether a pixel receives its palette color or the no-data color.
pub enum Validity<'a> {
    /// Every pixel is valid.
    Always,
    /// Validity is decided per pixel index.
    PerPixel(Box<dyn Fn(usize) -> bool + Send + Sync + 'a>),
}

impl<'a> Validity<'a> {
    /// Validity of a single band, optionally combined with categorical
    /// indices where `no_data_index` marks an unmapped code.
    pub fn single_band(
        raster: &'a dyn RasterView,
        categorical: Option<(&'a [u8], u8)>,
    ) -> Self {
        match categorical {
            Some((indices, no_data_index)) => Validity::PerPixel(Box::new(move |i| {
                raster.is_pixel_valid(i) && indices[i] != no_data_index
            })),
            None if raster.valid_mask_used() => {
                Validity::PerPixel(Box::new(move |i| raster.is_pixel_valid(i)))
            }
            None => Validity::Always,
        }
    }

    /// Validity of an RGB triple: if no band uses masking every pixel is
    /// valid, otherwise a pixel is valid only where all three bands are.
    pub fn three_band(rasters: [&'a dyn RasterView; 3]) -> Self {
        if !rasters.iter().any(|r| r.valid_mask_used()) {
            return Validity::Always;
        }
        Validity::PerPixel(Box::new(move |i| rasters.iter().all(|r| r.is_pixel_valid(i))))
    }

    #[inline]
    pub fn is_valid(&self, pixel_index: usize) -> bool {
        match self {
            Validity::Always => true,
            Validity::PerPixel(f) => f(pixel_index),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Validity::Always)
    }
}

impl std::fmt::Debug for Validity<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validity::Always => f.write_str("Always"),
            Validity::PerPixel(_) => f.write_str("PerPixel(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_common::SampleBand;

    #[test]
    fn test_single_band_without_mask_is_always() {
        let band = SampleBand::constant("b", 2, 2, 1.0);
        assert!(Validity::single_band(&band, None).is_always());
    }

    #[test]
    fn test_single_band_categorical() {
        let band = SampleBand::new("b", 3, 1, vec![1.0, 2.0, f32::NAN]).unwrap();
        let indices = [0u8, 4, 1];
        let validity = Validity::single_band(&band, Some((&indices[..], 4)));
        assert!(validity.is_valid(0));
        assert!(!validity.is_valid(1));
        assert!(!validity.is_valid(2));
    }

    #[test]
    fn test_three_band_requires_all_valid() {
        let r = SampleBand::new("r", 2, 1, vec![1.0, 1.0]).unwrap();
        let g = SampleBand::new("g", 2, 1, vec![1.0, -1.0])
            .unwrap()
            .with_no_data_value(-1.0);
        let b = SampleBand::new("b", 2, 1, vec![1.0, 1.0]).unwrap();
        let validity = Validity::three_band([&r, &g, &b]);
        assert!(validity.is_valid(0));
        assert!(!validity.is_valid(1));

        let plain = Validity::three_band([&r, &r, &b]);
        assert!(plain.is_always());
    }
}
