use crate::{input::DataPackage, raster::RasterImage};

/// User-originated events coming from the presentation layer.
#[derive(Debug, Clone)]
pub enum UiEvent {
    TextChanged(String),
    SizeChanged(String),
    SaveRequested,
    LoadRequested,
    PasteRequested,
    Dropped(DataPackage),
}

/// Instructions for the presentation layer.
///
/// `DisplayText` is a push update: applying it must not produce a
/// [`UiEvent::TextChanged`], otherwise a decoded payload would be re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DisplayImage(RasterImage),
    DisplayText(String),
    ClearDisplay,
    ShowError(String),
}

impl Command {
    pub fn error(msg: impl ToString) -> Self {
        Self::ShowError(msg.to_string())
    }
}
