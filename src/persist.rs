use std::{io::Cursor, path::Path};

use chrono::{DateTime, Local, TimeZone};
use image::{DynamicImage, ImageFormat};
use tracing::info;

use crate::{
    error::{SaveError, SyncResult},
    raster::RasterImage,
};

pub const FILE_NAME_PREFIX: &str = "QRCode-Helper";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
}

impl SaveFormat {
    /// `.jpg`/`.jpeg` save as JPEG, everything else as PNG.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("jpg" | "jpeg") => Self::Jpeg,
            _ => Self::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// `QRCode-Helper_<YYYYMMDD>_<HHMMSS>.<ext>`
pub fn suggested_file_name<Tz: TimeZone>(at: &DateTime<Tz>, format: SaveFormat) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{FILE_NAME_PREFIX}_{}.{}", at.format("%Y%m%d_%H%M%S"), format.extension())
}

pub fn suggested_file_name_now() -> String {
    suggested_file_name(&Local::now(), SaveFormat::Png)
}

pub fn encode_image(image: &RasterImage, format: SaveFormat) -> Result<Vec<u8>, SaveError> {
    let img = image.to_dynamic()?;
    // JPEG has no alpha channel
    let img = match (format, img) {
        (SaveFormat::Jpeg, img @ (DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_))) => img,
        (SaveFormat::Jpeg, img) => DynamicImage::ImageRgb8(img.into_rgb8()),
        (SaveFormat::Png, img) => img,
    };

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format.image_format())?;
    Ok(buf.into_inner())
}

pub async fn save(image: &RasterImage, path: &Path) -> SyncResult<()> {
    let format = SaveFormat::from_path(path);
    let bytes = encode_image(image, format)?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| SaveError::Io { path: path.to_path_buf(), source })?;
    info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
