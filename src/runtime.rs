use std::path::PathBuf;

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::{self, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    codec::Codec,
    engine::SyncEngine,
    error::{DecodeError, LoadError, SaveError, SyncError},
    event::{Command, UiEvent},
    input::{self, DataPackage, Normalized, OPEN_EXTENSIONS},
    persist,
    raster::RasterImage,
};

// Collaborators
//------------------------------------------------------------------------------

#[allow(async_fn_in_trait)]
pub trait FilePicker {
    /// `None` when the user dismisses the dialog.
    async fn pick_open(&mut self, extensions: &[&str]) -> Option<PathBuf>;

    async fn pick_save(&mut self, suggested_name: &str) -> Option<PathBuf>;
}

#[allow(async_fn_in_trait)]
pub trait Clipboard {
    async fn read(&mut self) -> Result<DataPackage, LoadError>;
}

/// Presentation side of the runtime's queues.
pub struct Frontend {
    pub events: UnboundedSender<UiEvent>,
    pub commands: UnboundedReceiver<Command>,
}

// Runtime
//------------------------------------------------------------------------------

/// Drives a [`SyncEngine`] from one task. Events are handled strictly one at
/// a time; anything that arrives while a file, the clipboard or the decoder is
/// awaited waits in the queue.
pub struct SyncRuntime<C, P, K> {
    engine: SyncEngine<C>,
    picker: P,
    clipboard: K,
    events: UnboundedReceiver<UiEvent>,
    commands: UnboundedSender<Command>,
    closed: bool,
}

impl<C, P, K> SyncRuntime<C, P, K>
where
    C: Codec + 'static,
    P: FilePicker,
    K: Clipboard,
{
    pub fn new(engine: SyncEngine<C>, picker: P, clipboard: K) -> (Self, Frontend) {
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let rt = Self { engine, picker, clipboard, events: ev_rx, commands: cmd_tx, closed: false };
        (rt, Frontend { events: ev_tx, commands: cmd_rx })
    }

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    /// Runs until every event sender is dropped or the command receiver goes
    /// away, then hands the engine back.
    pub async fn run(mut self) -> SyncEngine<C> {
        info!("Sync runtime started");
        while !self.closed {
            let deadline = self.engine.next_deadline().map(Instant::from_std);
            tokio::select! {
                biased;
                ev = self.events.recv() => match ev {
                    Some(ev) => self.dispatch(ev).await,
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    let cmds = self.engine.timer_fired(Instant::now().into_std());
                    self.emit(cmds);
                }
            }
        }
        info!("Sync runtime stopped");
        self.engine
    }

    async fn dispatch(&mut self, ev: UiEvent) {
        debug!("Handling {ev:?}");
        let now = Instant::now().into_std();
        match ev {
            UiEvent::TextChanged(text) => {
                let cmds = self.engine.text_changed(text, now);
                self.emit(cmds);
            }
            UiEvent::SizeChanged(text) => {
                let cmds = self.engine.size_changed(&text, now);
                self.emit(cmds);
            }
            UiEvent::SaveRequested => self.save().await,
            UiEvent::LoadRequested => {
                let Some(path) = self.picker.pick_open(&OPEN_EXTENSIONS).await else {
                    return;
                };
                let res = input::load_file(&path).await;
                self.load(res).await;
            }
            UiEvent::PasteRequested => {
                let res = match self.clipboard.read().await {
                    Ok(pkg) => input::normalize(pkg).await,
                    Err(e) => Err(e.into()),
                };
                self.load(res).await;
            }
            UiEvent::Dropped(pkg) => {
                let res = input::normalize(pkg).await;
                self.load(res).await;
            }
        }
    }

    async fn load(&mut self, res: Result<Normalized, SyncError>) {
        match res {
            Ok(Normalized::ImageLoaded(img)) => self.decode(img).await,
            Ok(other) => {
                let cmds = self.engine.apply(other);
                self.emit(cmds);
            }
            Err(e) => self.report(&e),
        }
    }

    async fn decode(&mut self, img: RasterImage) {
        let (cmds, job) = self.engine.begin_decode(img);
        // Loaded image goes on screen before the decoder is done with it
        self.emit(cmds);
        let Some(job) = job else {
            return;
        };

        let codec = self.engine.codec();
        let res = tokio::task::spawn_blocking(move || job.run(&*codec)).await.unwrap_or_else(|e| {
            warn!("Decoder task failed: {e}");
            Err(DecodeError::InvalidImage)
        });
        let cmds = self.engine.finish_decode(res);
        self.emit(cmds);
    }

    async fn save(&mut self) {
        let cmds = self.engine.flush();
        self.emit(cmds);

        let Some(img) = self.engine.artifact().map(|a| a.image().clone()) else {
            self.report(&SaveError::NothingToSave.into());
            return;
        };
        let name = persist::suggested_file_name_now();
        let Some(path) = self.picker.pick_save(&name).await else {
            return;
        };
        if let Err(e) = persist::save(&img, &path).await {
            self.report(&e);
        }
    }

    fn report(&mut self, err: &SyncError) {
        let cmds = self.engine.report(err);
        self.emit(cmds);
    }

    fn emit(&mut self, cmds: Vec<Command>) {
        for cmd in cmds {
            if self.commands.send(cmd).is_err() {
                debug!("Command receiver dropped");
                self.closed = true;
                return;
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
