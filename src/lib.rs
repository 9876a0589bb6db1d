//! # qrsync
//!
//! Keeps a text payload and its QR code image in sync, in both directions:
//! typing produces a QR image, loading an image decodes it back into text.
//!
//! ## Features
//!
//! - **Debounced encoding**: bursts of text or size edits render once, after 300 ms of quiet
//! - **Decoding of loaded images**: files, clipboard content and drag-and-drop payloads
//! - **One owner for the display**: the engine decides whether the text or a loaded image
//!   drives what is shown, and never interleaves a decode with a stale encode
//! - **Try-harder decoding**: retries on contrast-equalized, inverted and rotated variants
//! - **Saving**: PNG or JPEG with a timestamped suggested file name
//!
//! ## Quick Start
//!
//! ### Driving the engine directly
//!
//! ```rust
//! use std::time::{Duration, Instant};
//!
//! use qrsync::{Command, QrismCodec, SyncConfig, SyncEngine};
//!
//! let mut engine = SyncEngine::new(QrismCodec::default(), SyncConfig::default());
//! let t0 = Instant::now();
//!
//! // Edits only arm the debounce
//! assert!(engine.text_changed("https://example.com", t0).is_empty());
//!
//! // Once the delay has passed the QR code is rendered
//! let cmds = engine.timer_fired(t0 + Duration::from_millis(300));
//! assert!(matches!(cmds.as_slice(), [Command::DisplayImage(img)] if img.width() == 320));
//! ```
//!
//! ### Running the event loop
//!
//! [`SyncRuntime`] owns an engine plus the file picker and clipboard
//! collaborators. The presentation layer sends [`UiEvent`]s and applies the
//! [`Command`]s it gets back:
//!
//! ```rust,ignore
//! let engine = SyncEngine::new(QrismCodec::default(), SyncConfig::default());
//! let (runtime, mut ui) = SyncRuntime::new(engine, my_picker, my_clipboard);
//! tokio::task::spawn_local(runtime.run());
//!
//! ui.events.send(UiEvent::TextChanged("hello".into()))?;
//! while let Some(cmd) = ui.commands.recv().await {
//!     // DisplayText must not be echoed back as TextChanged
//! }
//! ```
//!
//! ## Display states
//!
//! - **Idle**: the display matches the current text and size
//! - **PendingEncode**: an edit is waiting for the debounce
//! - **Decoding**: a loaded image is with the decoder; other events queue behind it

pub mod codec;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod event;
pub mod input;
pub mod persist;
pub mod raster;
pub mod runtime;

pub use codec::{Codec, Decoded, QrismCodec};
pub use config::{CodecOptions, ErrorCorrection, SyncConfig};
pub use engine::{Artifact, SyncEngine, SyncState};
pub use error::{DecodeError, EncodeError, LoadError, SaveError, SyncError, SyncResult};
pub use event::{Command, UiEvent};
pub use input::{Bitmap, DataPackage, Normalized};
pub use raster::{PixelFormat, RasterImage, RenderSize};
pub use runtime::{Clipboard, FilePicker, Frontend, SyncRuntime};
