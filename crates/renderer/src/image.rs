//! Interleaved 8-bit image buffers.

use scene_common::{Color, SceneError, SceneResult};
use serde::{Deserialize, Serialize};

/// Byte order of the channels of one pixel.
///
/// The order is least-significant-first: three-channel images store
/// B,G,R and four-channel images store A,B,G,R.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    #[default]
    Bgr,
    Abgr,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Bgr => 3,
            ChannelLayout::Abgr => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        self == ChannelLayout::Abgr
    }

    /// Byte offsets of the color channels (alpha excluded).
    pub fn color_offsets(self) -> std::ops::Range<usize> {
        match self {
            ChannelLayout::Bgr => 0..3,
            ChannelLayout::Abgr => 1..4,
        }
    }

    /// Offset of the red, green or blue channel (`band` 0, 1, 2) in a pixel.
    pub fn band_offset(self, band: usize) -> usize {
        self.channels() - 1 - band
    }

    /// Write `color` into one pixel's bytes.
    #[inline]
    pub fn write(self, pixel: &mut [u8], color: Color) {
        match self {
            ChannelLayout::Bgr => {
                pixel[0] = color.b;
                pixel[1] = color.g;
                pixel[2] = color.r;
            }
            ChannelLayout::Abgr => {
                pixel[0] = color.a;
                pixel[1] = color.b;
                pixel[2] = color.g;
                pixel[3] = color.r;
            }
        }
    }

    /// Read one pixel's bytes; three-channel pixels are opaque.
    #[inline]
    pub fn read(self, pixel: &[u8]) -> Color {
        match self {
            ChannelLayout::Bgr => Color::rgb(pixel[2], pixel[1], pixel[0]),
            ChannelLayout::Abgr => Color::new(pixel[3], pixel[2], pixel[1], pixel[0]),
        }
    }
}

/// Row-major interleaved image; `data.len() == width * height * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: usize,
    height: usize,
    layout: ChannelLayout,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Zero-filled image.
    pub fn new(width: usize, height: usize, layout: ChannelLayout) -> Self {
        Self {
            width,
            height,
            layout,
            data: vec![0; width * height * layout.channels()],
        }
    }

    /// Wrap existing bytes, checking their length.
    pub fn from_raw(
        width: usize,
        height: usize,
        layout: ChannelLayout,
        data: Vec<u8>,
    ) -> SceneResult<Self> {
        let expected = width * height * layout.channels();
        if data.len() != expected {
            return Err(SceneError::invalid_argument(format!(
                "image data holds {} bytes, expected {}",
                data.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Bytes per scan line.
    pub fn row_len(&self) -> usize {
        self.width * self.layout.channels()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.layout.channels()
    }

    /// Color at `(x, y)`. Panics when out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Color {
        let o = self.offset(x, y);
        self.layout.read(&self.data[o..o + self.layout.channels()])
    }

    /// Set the color at `(x, y)`. Panics when out of bounds.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        let o = self.offset(x, y);
        let n = self.layout.channels();
        self.layout.write(&mut self.data[o..o + n], color);
    }

    /// Convert to RGBA bytes, as expected by the PNG encoders.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width * self.height * 4);
        for pixel in self.data.chunks_exact(self.layout.channels()) {
            let c = self.layout.read(pixel);
            rgba.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        rgba
    }
}

/// Single-band image of palette indices with its 256-entry palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub indices: Vec<u8>,
    pub palette: Vec<Color>,
}

impl IndexedImage {
    /// Expand the indices into an interleaved color image.
    pub fn to_image_buffer(&self, layout: ChannelLayout) -> ImageBuffer {
        let mut image = ImageBuffer::new(self.width, self.height, layout);
        let n = layout.channels();
        for (pixel, &index) in image.data.chunks_exact_mut(n).zip(&self.indices) {
            let color = self.palette.get(index as usize).copied().unwrap_or_default();
            layout.write(pixel, color);
        }
        image
    }
}
