//! PNG export of assembled images.
//!
//! Two encodings are produced:
//! - **Indexed PNG (color type 3)** for [`IndexedImage`]s and for images
//!   with at most 256 distinct colors.
//! - **RGBA PNG (color type 6)** otherwise.
//!
//! [`encode_image`] picks the encoding automatically.

use std::collections::HashMap;
use std::io::Write;

use rayon::prelude::*;
use scene_common::Color;
use thiserror::Error;

use crate::image::{ImageBuffer, IndexedImage};

/// Maximum number of palette entries of an indexed PNG.
const MAX_PALETTE_SIZE: usize = 256;

/// Pixel count above which palette extraction runs in parallel.
const PARALLEL_THRESHOLD: usize = 4096;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

#[derive(Debug, Error)]
pub enum PngError {
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Palette has {0} entries, at most 256 are allowed")]
    PaletteTooLarge(usize),

    #[error("Palette index {index} out of range for {len} entries")]
    IndexOutOfRange { index: u8, len: usize },

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// Encode an image, using an indexed PNG when it has few enough colors.
pub fn encode_image(image: &ImageBuffer) -> Result<Vec<u8>, PngError> {
    create_png_auto(&image.to_rgba(), image.width(), image.height())
}

/// Encode a color-indexed image with its palette.
pub fn encode_indexed(image: &IndexedImage) -> Result<Vec<u8>, PngError> {
    create_png_indexed(image.width, image.height, &image.palette, &image.indices)
}

/// Encode RGBA bytes, choosing indexed encoding for at most 256 colors.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_len(pixels, width, height, 4)?;
    let extracted = if width * height >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };
    match extracted {
        Some((palette, indices)) => create_png_indexed(width, height, &palette, &indices),
        None => create_png(pixels, width, height),
    }
}

fn check_len(data: &[u8], width: usize, height: usize, bytes_per_pixel: usize) -> Result<(), PngError> {
    let expected = width * height * bytes_per_pixel;
    if data.len() != expected {
        return Err(PngError::BufferSize {
            width,
            height,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

#[inline(always)]
fn pack(pixel: &[u8]) -> u32 {
    u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]])
}

#[inline(always)]
fn unpack(packed: u32) -> Color {
    let [r, g, b, a] = packed.to_le_bytes();
    Color::new(r, g, b, a)
}

/// Distinct colors in first-seen order plus one index per pixel; `None`
/// when there are more than 256 colors.
fn extract_palette_sequential(pixels: &[u8]) -> Option<(Vec<Color>, Vec<u8>)> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for pixel in pixels.chunks_exact(4) {
        let packed = pack(pixel);
        let index = match lookup.get(&packed) {
            Some(&i) => i,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let i = palette.len() as u8;
                lookup.insert(packed, i);
                palette.push(unpack(packed));
                i
            }
        };
        indices.push(index);
    }
    Some((palette, indices))
}

/// Parallel variant: gather distinct colors per chunk, merge, then map
/// pixels to indices.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Vec<Color>, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let per_chunk: Vec<Vec<u32>> = pixels
        .par_chunks(chunk_pixels * 4)
        .map(|chunk| {
            let mut seen: Vec<u32> = Vec::new();
            let mut set = std::collections::HashSet::with_capacity(MAX_PALETTE_SIZE);
            for pixel in chunk.chunks_exact(4) {
                let packed = pack(pixel);
                if set.insert(packed) {
                    seen.push(packed);
                    if seen.len() > MAX_PALETTE_SIZE {
                        break;
                    }
                }
            }
            seen
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    for packed in per_chunk.into_iter().flatten() {
        if lookup.contains_key(&packed) {
            continue;
        }
        if palette.len() >= MAX_PALETTE_SIZE {
            return None;
        }
        lookup.insert(packed, palette.len() as u8);
        palette.push(unpack(packed));
    }

    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(chunk_pixels)
        .zip(pixels.par_chunks(chunk_pixels * 4))
        .for_each(|(out, chunk)| {
            for (index, pixel) in out.iter_mut().zip(chunk.chunks_exact(4)) {
                *index = lookup.get(&pack(pixel)).copied().unwrap_or(0);
            }
        });
    Some((palette, indices))
}

/// Indexed PNG (color type 3); a tRNS chunk is written when any palette
/// entry is not fully opaque.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[Color],
    indices: &[u8],
) -> Result<Vec<u8>, PngError> {
    if palette.len() > MAX_PALETTE_SIZE {
        return Err(PngError::PaletteTooLarge(palette.len()));
    }
    check_len(indices, width, height, 1)?;
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= palette.len()) {
        return Err(PngError::IndexOutOfRange {
            index,
            len: palette.len(),
        });
    }

    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|c| c.a < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c.a).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(indices, width, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// RGBA PNG (color type 6) from R,G,B,A bytes.
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PngError> {
    check_len(pixels, width, height, 4)?;
    let mut png = Vec::new();
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width * 4, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn ihdr(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&(width as u32).to_be_bytes());
    data.extend_from_slice(&(height as u32).to_be_bytes());
    // bit depth, color type, compression, filter, interlace
    data.extend_from_slice(&[8, color_type, 0, 0, 0]);
    data
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each scanline with filter type 0 and zlib-compress the result.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> Result<Vec<u8>, PngError> {
    let mut raw = Vec::with_capacity(height * (1 + row_bytes));
    if row_bytes > 0 {
        for row in data.chunks_exact(row_bytes).take(height) {
            raw.push(0);
            raw.extend_from_slice(row);
        }
    } else {
        raw.resize(height, 0);
    }
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}
