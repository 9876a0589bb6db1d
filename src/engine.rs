use std::{sync::Arc, time::Instant};

use tracing::{debug, info, warn};

use crate::{
    codec::{Codec, Decoded},
    config::SyncConfig,
    debounce::Debouncer,
    error::{DecodeError, SyncError},
    event::Command,
    input::Normalized,
    raster::{RasterImage, RenderSize},
};

pub const NO_CODE_DETECTED: &str = "No QRCode detected";

// State
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SyncState {
    /// Displayed artifact matches the current text and size
    Idle,
    /// An edit is waiting for the debounce to fire
    PendingEncode,
    /// A loaded image is being decoded
    Decoding,
}

/// What is currently on screen, and which side produced it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Artifact {
    Encoded(RasterImage),
    Loaded(RasterImage),
}

impl Artifact {
    pub fn image(&self) -> &RasterImage {
        match self {
            Self::Encoded(img) | Self::Loaded(img) => img,
        }
    }
}

#[derive(Debug, Clone)]
struct EncodeRequest {
    payload: String,
    size: RenderSize,
}

/// Image handed to the codec, plus the edit it displaced.
#[derive(Debug)]
struct InFlight {
    image: RasterImage,
    superseded: Option<EncodeRequest>,
}

/// An accepted image waiting for the codec. Hand the result back through
/// [`SyncEngine::finish_decode`].
#[derive(Debug)]
pub struct DecodeJob {
    image: RasterImage,
}

impl DecodeJob {
    pub fn image(&self) -> &RasterImage {
        &self.image
    }

    pub fn run<C: Codec + ?Sized>(&self, codec: &C) -> Result<Decoded, DecodeError> {
        codec.decode(&self.image)
    }
}

// Engine
//------------------------------------------------------------------------------

/// Owns the payload, the render size and the displayed artifact, and decides
/// which direction (text to image, image to text) drives the display.
///
/// Every operation returns the commands to apply, in order. The engine never
/// blocks on time: deadlines are exposed through [`SyncEngine::next_deadline`]
/// and delivered back with [`SyncEngine::timer_fired`].
pub struct SyncEngine<C> {
    codec: Arc<C>,
    cfg: SyncConfig,
    state: SyncState,
    payload: String,
    size: RenderSize,
    artifact: Option<Artifact>,
    pending: Debouncer<EncodeRequest>,
    decoding: Option<InFlight>,
}

impl<C: Codec> SyncEngine<C> {
    pub fn new(codec: C, cfg: SyncConfig) -> Self {
        Self {
            codec: Arc::new(codec),
            cfg,
            state: SyncState::Idle,
            payload: String::new(),
            size: cfg.default_size,
            artifact: None,
            pending: Debouncer::new(),
            decoding: None,
        }
    }

    pub fn codec(&self) -> Arc<C> {
        Arc::clone(&self.codec)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.cfg
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn size(&self) -> RenderSize {
        self.size
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    // Text to image
    //--------------------------------------------------------------------------

    pub fn text_changed(&mut self, text: impl Into<String>, now: Instant) -> Vec<Command> {
        self.payload = text.into();
        self.edited(now)
    }

    pub fn size_changed(&mut self, text: &str, now: Instant) -> Vec<Command> {
        self.size = RenderSize::parse_or(text, self.cfg.default_size);
        debug!("Render size set to {}", self.size);
        self.edited(now)
    }

    pub fn timer_fired(&mut self, now: Instant) -> Vec<Command> {
        let Some(req) = self.pending.fire(now) else {
            return Vec::new();
        };
        self.encode(req)
    }

    /// Renders a pending edit right away, e.g. before saving.
    pub fn flush(&mut self) -> Vec<Command> {
        match self.pending.cancel() {
            Some(req) => self.encode(req),
            None => Vec::new(),
        }
    }

    /// Text from a file or the clipboard. Encoded without waiting for the
    /// debounce since it arrives in one piece.
    pub fn text_loaded(&mut self, text: impl Into<String>) -> Vec<Command> {
        self.pending.cancel();
        self.payload = text.into();
        let mut cmds = vec![Command::DisplayText(self.payload.clone())];
        if self.payload.is_empty() {
            cmds.extend(self.clear());
        } else {
            cmds.extend(self.encode(EncodeRequest { payload: self.payload.clone(), size: self.size }));
        }
        cmds
    }

    fn edited(&mut self, now: Instant) -> Vec<Command> {
        if self.payload.is_empty() {
            self.pending.cancel();
            return self.clear();
        }
        let req = EncodeRequest { payload: self.payload.clone(), size: self.size };
        self.pending.schedule(req, self.cfg.debounce, now);
        self.state = SyncState::PendingEncode;
        debug!("Encode scheduled in {:?}", self.cfg.debounce);
        Vec::new()
    }

    fn encode(&mut self, req: EncodeRequest) -> Vec<Command> {
        let res = self.codec.encode(&req.payload, req.size);
        self.settle();
        match res {
            Ok(img) => {
                info!("Rendered QR code at {}", req.size);
                self.artifact = Some(Artifact::Encoded(img.clone()));
                vec![Command::DisplayImage(img)]
            }
            Err(e) => {
                warn!("Encode failed: {e}");
                self.artifact = None;
                vec![Command::ClearDisplay, Command::error(e)]
            }
        }
    }

    fn clear(&mut self) -> Vec<Command> {
        self.artifact = None;
        self.settle();
        vec![Command::ClearDisplay]
    }

    // Image to text
    //--------------------------------------------------------------------------

    /// Accepts a loaded image. A pending edit is dropped once the image is
    /// accepted: the loaded image takes over the display even if the edit was
    /// never rendered. Rejected images leave the pending edit armed.
    pub fn begin_decode(&mut self, image: RasterImage) -> (Vec<Command>, Option<DecodeJob>) {
        if let Err(e) = image.validate() {
            warn!("Rejected image {image:?}");
            return (vec![Command::error(e)], None);
        }

        let superseded = self.pending.cancel();
        if superseded.is_some() {
            debug!("Pending encode superseded by image load");
        }
        debug!("Decoding {image:?}");
        self.state = SyncState::Decoding;
        self.decoding = Some(InFlight { image: image.clone(), superseded });
        (vec![Command::DisplayImage(image.clone())], Some(DecodeJob { image }))
    }

    pub fn finish_decode(&mut self, res: Result<Decoded, DecodeError>) -> Vec<Command> {
        let Some(InFlight { image, superseded }) = self.decoding.take() else {
            warn!("Decode result with no image in flight");
            return Vec::new();
        };
        self.settle();

        match res {
            Ok(Decoded::Found(text)) => {
                info!("Decoded {} bytes from image", text.len());
                self.artifact = Some(Artifact::Loaded(image));
                self.payload = text.clone();
                vec![Command::DisplayText(text)]
            }
            Ok(Decoded::NotFound) => {
                info!("No QR code in loaded image");
                self.artifact = Some(Artifact::Loaded(image));
                vec![Command::error(NO_CODE_DETECTED)]
            }
            Err(e) => {
                warn!("Decode failed: {e}");
                // The displaced edit was never rendered; render it now
                let mut cmds = if let Some(req) = superseded {
                    self.encode(req)
                } else {
                    match &self.artifact {
                        Some(a) => vec![Command::DisplayImage(a.image().clone())],
                        None => vec![Command::ClearDisplay],
                    }
                };
                cmds.push(Command::error(e));
                cmds
            }
        }
    }

    /// Both decode phases on the calling thread.
    pub fn image_loaded(&mut self, image: RasterImage) -> Vec<Command> {
        let (mut cmds, job) = self.begin_decode(image);
        if let Some(job) = job {
            let res = job.run(&*self.codec);
            cmds.extend(self.finish_decode(res));
        }
        cmds
    }

    // Misc
    //--------------------------------------------------------------------------

    pub fn apply(&mut self, input: Normalized) -> Vec<Command> {
        match input {
            Normalized::TextLoaded(text) => self.text_loaded(text),
            Normalized::ImageLoaded(img) => self.image_loaded(img),
            Normalized::Noop => Vec::new(),
        }
    }

    /// Surfaces a failed boundary operation. State is left untouched.
    pub fn report(&self, err: &SyncError) -> Vec<Command> {
        warn!("{err}");
        vec![Command::error(err)]
    }

    fn settle(&mut self) {
        self.state = if self.pending.is_armed() { SyncState::PendingEncode } else { SyncState::Idle };
    }
}
