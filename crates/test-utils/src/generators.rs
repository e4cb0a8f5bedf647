//! Synthetic band generators.
//!
//! The patterns are deterministic so that tests can compute expected pixel
//! values by hand.

use std::io::Write;

use scene_common::SampleBand;
use tempfile::NamedTempFile;

/// Row-major grid where each cell holds `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Horizontal ramp from `min` in the first column to `max` in the last.
pub fn ramp_band(name: &str, width: usize, height: usize, min: f32, max: f32) -> SampleBand {
    let span = (width.max(2) - 1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for _ in 0..height {
        for col in 0..width {
            data.push(min + (max - min) * col as f32 / span);
        }
    }
    band(name, width, height, data)
}

/// Brightness-temperature-like band in Kelvin, cold at the top rows and
/// warm at the bottom, with a longitudinal wave.
pub fn temperature_band(name: &str, width: usize, height: usize) -> SampleBand {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let lat = row as f32 / height.max(1) as f32;
            let wave = (col as f32 / width.max(1) as f32 * std::f32::consts::TAU).sin();
            data.push(250.0 + 60.0 * lat + 3.0 * wave);
        }
    }
    band(name, width, height, data)
}

/// Quality-flag band: bit 0 set on even columns, bit 2 on the lower half.
pub fn flag_band(name: &str, width: usize, height: usize) -> SampleBand {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let mut flags = 0u32;
            if col % 2 == 0 {
                flags |= 0x01;
            }
            if row >= height / 2 {
                flags |= 0x04;
            }
            data.push(flags as f32);
        }
    }
    band(name, width, height, data)
}

/// Grid of `value` with NaN at the given `(col, row)` positions.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    value: f32,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![value; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Band from row-major data; panics on a length mismatch.
pub fn band(name: &str, width: usize, height: usize, data: Vec<f32>) -> SampleBand {
    match SampleBand::new(name, width, height, data) {
        Ok(band) => band,
        Err(e) => panic!("invalid test band '{name}': {e}"),
    }
}

/// Write samples as little-endian `f32` into a temporary file.
pub fn write_raw_band(data: &[f32]) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    for value in data {
        file.write_all(&value.to_le_bytes())?;
    }
    file.flush()?;
    Ok(file)
}
