use std::{fmt, sync::Arc};

use image::{DynamicImage, GrayImage, ImageBuffer, RgbImage, RgbaImage};

use crate::error::DecodeError;

// Pixel format
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PixelFormat {
    Luma8,
    Rgb8,
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Luma8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

// Raster image
//------------------------------------------------------------------------------

/// Immutable pixel grid. Clones share the underlying buffer; a new image is
/// built for every change instead of editing pixels in place.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Arc<[u8]>,
}

impl RasterImage {
    /// Wraps a pixel buffer without checking it. Call [`RasterImage::validate`]
    /// before handing untrusted data to a decoder.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Arc<[u8]>>) -> Self {
        Self { width, height, format, data: data.into() }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True when both images point at the same pixel buffer.
    pub fn shares_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.width == 0 || self.height == 0 {
            return Err(DecodeError::InvalidImage);
        }
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.format.bytes_per_pixel()))
            .ok_or(DecodeError::InvalidImage)?;
        if expected != self.data.len() {
            return Err(DecodeError::InvalidImage);
        }
        Ok(())
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage, DecodeError> {
        self.validate()?;
        let (w, h) = (self.width, self.height);
        let buf = self.data.to_vec();
        let img = match self.format {
            PixelFormat::Luma8 => GrayImage::from_raw(w, h, buf).map(DynamicImage::ImageLuma8),
            PixelFormat::Rgb8 => RgbImage::from_raw(w, h, buf).map(DynamicImage::ImageRgb8),
            PixelFormat::Rgba8 => RgbaImage::from_raw(w, h, buf).map(DynamicImage::ImageRgba8),
            PixelFormat::Bgra8 => {
                let rgba = buf.chunks_exact(4).flat_map(|p| [p[2], p[1], p[0], p[3]]).collect();
                RgbaImage::from_raw(w, h, rgba).map(DynamicImage::ImageRgba8)
            }
        };
        img.ok_or(DecodeError::InvalidImage)
    }
}

impl From<GrayImage> for RasterImage {
    fn from(img: GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self::new(w, h, PixelFormat::Luma8, img.into_raw())
    }
}

impl From<RgbImage> for RasterImage {
    fn from(img: RgbImage) -> Self {
        let (w, h) = img.dimensions();
        Self::new(w, h, PixelFormat::Rgb8, img.into_raw())
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(img: RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        Self::new(w, h, PixelFormat::Rgba8, img.into_raw())
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(img: DynamicImage) -> Self {
        match img {
            DynamicImage::ImageLuma8(i) => i.into(),
            DynamicImage::ImageRgb8(i) => i.into(),
            DynamicImage::ImageRgba8(i) => i.into(),
            other => other.into_rgba8().into(),
        }
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// Render size
//------------------------------------------------------------------------------

/// Side length in pixels of an encoded QR image. Always non-zero.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct RenderSize(u16);

impl RenderSize {
    pub const DEFAULT: Self = Self(320);

    pub fn new(px: u16) -> Option<Self> {
        (px > 0).then_some(Self(px))
    }

    /// Anything that is not an integer in `1..=65535` falls back to
    /// [`RenderSize::DEFAULT`], so an edit always leaves a renderable size.
    pub fn parse_lenient(text: &str) -> Self {
        Self::parse_or(text, Self::DEFAULT)
    }

    pub fn parse_or(text: &str, fallback: Self) -> Self {
        text.trim().parse::<u16>().ok().and_then(Self::new).unwrap_or(fallback)
    }

    pub fn get(self) -> u32 {
        self.0 as u32
    }
}

impl Default for RenderSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for RenderSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.0, self.0)
    }
}

pub(crate) fn blank(size: RenderSize) -> GrayImage {
    ImageBuffer::from_pixel(size.get(), size.get(), image::Luma([255]))
}
