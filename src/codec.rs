use image::{
    imageops::{self, FilterType},
    DynamicImage, GrayImage,
};
use imageproc::contrast::equalize_histogram;
use qrism::{reader::detect_qr, QRBuilder};
use tracing::{debug, trace};

use crate::{
    config::{CodecOptions, ErrorCorrection},
    error::{DecodeError, EncodeError},
    raster::{blank, RasterImage, RenderSize},
};

/// Builder messages that mean the payload does not fit any version.
const OVERFLOW_MESSAGES: [&str; 2] = ["Data too long", "Capacity overflow"];

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Decoded {
    Found(String),
    NotFound,
}

/// Black-box QR encoder/decoder used by the sync engine.
pub trait Codec: Send + Sync {
    /// Renders `payload` as a `size` x `size` image. Same input, same pixels.
    fn encode(&self, payload: &str, size: RenderSize) -> Result<RasterImage, EncodeError>;

    /// Looks for a QR symbol in `image`. Fails only on malformed pixel data.
    fn decode(&self, image: &RasterImage) -> Result<Decoded, DecodeError>;
}

// Qrism codec
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct QrismCodec {
    opts: CodecOptions,
}

impl QrismCodec {
    pub fn new(opts: CodecOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> CodecOptions {
        self.opts
    }

    fn scan(img: &DynamicImage) -> Option<String> {
        let mut res = detect_qr(img);
        for sym in res.symbols().iter_mut() {
            match sym.decode() {
                Ok((_meta, msg)) => return Some(msg.to_string()),
                Err(e) => trace!("Symbol rejected: {e}"),
            }
        }
        None
    }

    fn scan_harder(gray: &GrayImage) -> Option<String> {
        let variants: [&dyn Fn() -> GrayImage; 5] = [
            &|| equalize_histogram(gray),
            &|| {
                let mut inv = gray.clone();
                imageops::invert(&mut inv);
                inv
            },
            &|| imageops::rotate90(gray),
            &|| imageops::rotate180(gray),
            &|| imageops::rotate270(gray),
        ];
        variants.iter().enumerate().find_map(|(i, variant)| {
            trace!("Retrying decode with variant {i}");
            Self::scan(&DynamicImage::ImageLuma8(variant()))
        })
    }
}

impl Codec for QrismCodec {
    fn encode(&self, payload: &str, size: RenderSize) -> Result<RasterImage, EncodeError> {
        if payload.is_empty() {
            return Err(EncodeError::Empty);
        }

        let qr = QRBuilder::new(payload.as_bytes())
            .ec_level(self.opts.ec_level.into())
            .build()
            .map_err(|e| build_error(&e.to_string(), payload.len(), self.opts.ec_level))?;
        // Already framed by its quiet zone
        let symbol = DynamicImage::ImageRgb8(qr.to_image(1)).into_luma8();

        let side = size.get();
        let sym_w = symbol.width();
        let scale = side / sym_w;
        let img = if scale == 0 {
            // Too small to hold every module; squeeze it
            imageops::resize(&symbol, side, side, FilterType::Nearest)
        } else {
            let scaled = imageops::resize(&symbol, sym_w * scale, symbol.height() * scale, FilterType::Nearest);
            let mut canvas = blank(size);
            let x = (side - scaled.width()) / 2;
            let y = (side - scaled.height()) / 2;
            imageops::replace(&mut canvas, &scaled, x as i64, y as i64);
            canvas
        };

        debug!("Encoded {} bytes at {size} (scale {scale})", payload.len());
        Ok(img.into())
    }

    fn decode(&self, image: &RasterImage) -> Result<Decoded, DecodeError> {
        let img = image.to_dynamic()?;
        if let Some(msg) = Self::scan(&img) {
            return Ok(Decoded::Found(msg));
        }
        if self.opts.try_harder {
            if let Some(msg) = Self::scan_harder(&img.to_luma8()) {
                return Ok(Decoded::Found(msg));
            }
        }
        Ok(Decoded::NotFound)
    }
}

fn build_error(msg: &str, len: usize, ec_level: ErrorCorrection) -> EncodeError {
    if len > ec_level.byte_capacity() || OVERFLOW_MESSAGES.contains(&msg) {
        EncodeError::Capacity
    } else {
        EncodeError::Unsupported(msg.to_string())
    }
}
