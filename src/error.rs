use std::{io, path::PathBuf};

use thiserror::Error;

// Encode
//------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EncodeError {
    #[error("Nothing to encode")]
    Empty,
    #[error("Text is too long to fit in a QR code")]
    Capacity,
    #[error("Text cannot be encoded: {0}")]
    Unsupported(String),
}

// Decode
//------------------------------------------------------------------------------

/// Structurally unusable image data. A readable image without a QR symbol is
/// not an error, see [`crate::codec::Decoded::NotFound`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("Invalid image")]
    InvalidImage,
}

// Load & save
//------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to read clipboard: {0}")]
    Clipboard(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("There is no QR code to save")]
    NothingToSave,
    #[error("Cannot save malformed image: {0}")]
    Invalid(#[from] DecodeError),
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

// Sync
//------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

pub type SyncResult<T> = Result<T, SyncError>;
