use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    error::{DecodeError, LoadError, SyncResult},
    raster::RasterImage,
};

/// Extensions offered by the open dialog.
pub const OPEN_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "txt"];

// Canonical input
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    TextLoaded(String),
    ImageLoaded(RasterImage),
    Noop,
}

// Data package
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bitmap {
    /// Pixels as handed over by the platform
    Raw(RasterImage),
    /// Bytes of an image file (PNG, JPEG, ...)
    Encoded(Vec<u8>),
}

/// Everything a clipboard read or a drop offers at once. Any combination of
/// representations may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataPackage {
    pub bitmap: Option<Bitmap>,
    pub storage_items: Vec<PathBuf>,
    pub text: Option<String>,
}

impl DataPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bitmap(mut self, bitmap: Bitmap) -> Self {
        self.bitmap = Some(bitmap);
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_items.push(path.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.is_none() && self.storage_items.is_empty() && self.text.is_none()
    }
}

// File kind
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FileKind {
    Image,
    Text,
}

impl FileKind {
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

// Normalization
//------------------------------------------------------------------------------

/// Picks the most direct representation in `pkg`: raw bitmap data first,
/// then the first supported file reference, then plain text.
pub async fn normalize(pkg: DataPackage) -> SyncResult<Normalized> {
    let DataPackage { bitmap, storage_items, text } = pkg;

    if let Some(bitmap) = bitmap {
        debug!("Using bitmap representation");
        let img = match bitmap {
            Bitmap::Raw(img) => img,
            Bitmap::Encoded(bytes) => decode_bitmap_async(bytes).await?,
        };
        return Ok(Normalized::ImageLoaded(img));
    }

    if let Some(path) = storage_items.iter().find(|p| FileKind::classify(p).is_some()) {
        debug!("Using file reference {}", path.display());
        return load_file(path).await;
    }
    if !storage_items.is_empty() {
        debug!("No supported file among {} item(s)", storage_items.len());
    }

    match text {
        Some(text) => Ok(Normalized::TextLoaded(text)),
        None => Ok(Normalized::Noop),
    }
}

pub async fn load_file(path: &Path) -> SyncResult<Normalized> {
    let Some(kind) = FileKind::classify(path) else {
        debug!("Ignoring unsupported file {}", path.display());
        return Ok(Normalized::Noop);
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;

    match kind {
        FileKind::Image => Ok(Normalized::ImageLoaded(decode_bitmap_async(bytes).await?)),
        FileKind::Text => Ok(Normalized::TextLoaded(decode_text(&bytes))),
    }
}

pub fn decode_bitmap(bytes: &[u8]) -> Result<RasterImage, DecodeError> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        warn!("Cannot read image data: {e}");
        DecodeError::InvalidImage
    })?;
    Ok(img.into_rgba8().into())
}

async fn decode_bitmap_async(bytes: Vec<u8>) -> Result<RasterImage, DecodeError> {
    tokio::task::spawn_blocking(move || decode_bitmap(&bytes)).await.map_err(|e| {
        warn!("Image decoding task failed: {e}");
        DecodeError::InvalidImage
    })?
}

/// UTF-8 with an optional BOM. Malformed sequences become U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    let (text, enc, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        warn!("Replaced malformed {} sequences in text file", enc.name());
    }
    text.into_owned()
}
