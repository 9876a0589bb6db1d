use std::{
    io::Cursor,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use image::ImageFormat;
use qrsync::{
    input::DataPackage, Bitmap, Clipboard, Codec, Command, DecodeError, Decoded, EncodeError, FilePicker, Frontend,
    LoadError, QrismCodec, RasterImage, RenderSize, SyncConfig, SyncEngine, SyncRuntime, UiEvent,
};

// Helpers
//------------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Real codec that counts how often it is asked to do work.
#[derive(Default)]
struct CountingCodec {
    inner: QrismCodec,
    encodes: AtomicUsize,
    decodes: AtomicUsize,
}

impl CountingCodec {
    fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl Codec for CountingCodec {
    fn encode(&self, payload: &str, size: RenderSize) -> Result<RasterImage, EncodeError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(payload, size)
    }

    fn decode(&self, image: &RasterImage) -> Result<Decoded, DecodeError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(image)
    }
}

struct NoPicker;

impl FilePicker for NoPicker {
    async fn pick_open(&mut self, _extensions: &[&str]) -> Option<PathBuf> {
        None
    }

    async fn pick_save(&mut self, _suggested_name: &str) -> Option<PathBuf> {
        None
    }
}

struct NoClipboard;

impl Clipboard for NoClipboard {
    async fn read(&mut self) -> Result<DataPackage, LoadError> {
        Ok(DataPackage::new())
    }
}

fn qr_raster(text: &str) -> RasterImage {
    QrismCodec::default().encode(text, RenderSize::DEFAULT).unwrap()
}

fn qr_png(text: &str) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    qr_raster(text).to_dynamic().unwrap().write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn decode(img: &RasterImage) -> Decoded {
    QrismCodec::default().decode(img).unwrap()
}

/// Feeds `script` into a runtime on paused time, sleeping before each event,
/// then waits `settle` and closes the event queue.
async fn drive(script: Vec<(Duration, UiEvent)>, settle: Duration) -> (SyncEngine<CountingCodec>, Vec<Command>) {
    init_tracing();
    let engine = SyncEngine::new(CountingCodec::default(), SyncConfig::default());
    let (rt, ui) = SyncRuntime::new(engine, NoPicker, NoClipboard);
    let Frontend { events, mut commands } = ui;

    let driver = async move {
        for (wait, ev) in script {
            tokio::time::sleep(wait).await;
            events.send(ev).unwrap();
        }
        tokio::time::sleep(settle).await;
    };
    let (engine, ()) = tokio::join!(rt.run(), driver);

    let mut cmds = Vec::new();
    while let Ok(cmd) = commands.try_recv() {
        cmds.push(cmd);
    }
    (engine, cmds)
}

fn text(s: &str) -> UiEvent {
    UiEvent::TextChanged(s.to_string())
}

const NOW: Duration = Duration::ZERO;
const MS_100: Duration = Duration::from_millis(100);
const SETTLE: Duration = Duration::from_secs(1);

#[cfg(test)]
mod sync_proptests {
    use proptest::prelude::*;

    use super::{decode, QrismCodec};
    use qrsync::{Codec, Decoded, RenderSize};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn proptest_round_trip(data in "[a-zA-Z0-9 .:/?=&-]{1,64}", px in 200u16..=480) {
            let img = QrismCodec::default().encode(&data, RenderSize::new(px).unwrap()).unwrap();
            prop_assert_eq!((img.width(), img.height()), (px as u32, px as u32));
            prop_assert_eq!(decode(&img), Decoded::Found(data));
        }
    }
}

#[cfg(test)]
mod sync_tests {
    use std::time::Instant;

    use rand::{rngs::StdRng, Rng, SeedableRng};
    use test_case::test_case;

    use super::*;
    use qrsync::{engine::NO_CODE_DETECTED, PixelFormat, SyncState};

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_renders_once() {
        let script = vec![(NOW, text("h")), (MS_100, text("https://")), (MS_100, text("https://example.com"))];
        let (engine, cmds) = drive(script, SETTLE).await;

        assert_eq!(engine.codec().encodes(), 1);
        let [Command::DisplayImage(img)] = cmds.as_slice() else {
            panic!("unexpected commands {cmds:?}");
        };
        assert_eq!((img.width(), img.height()), (320, 320));
        assert_eq!(decode(img), Decoded::Found("https://example.com".to_string()));
        assert_eq!(engine.state(), SyncState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_spaced_beyond_delay_render_each() {
        let gap = Duration::from_millis(400);
        let script = vec![(NOW, text("one")), (gap, text("two"))];
        let (engine, cmds) = drive(script, SETTLE).await;

        assert_eq!(engine.codec().encodes(), 2);
        assert_eq!(cmds.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_text_is_immediate() {
        let script = vec![(NOW, text("abc")), (MS_100, text(""))];
        let (engine, cmds) = drive(script, SETTLE).await;

        assert_eq!(cmds, vec![Command::ClearDisplay]);
        assert_eq!(engine.codec().encodes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoded_image_is_not_reencoded() {
        let dropped = UiEvent::Dropped(DataPackage::new().bitmap(Bitmap::Encoded(qr_png("HELLO"))));
        let (engine, cmds) = drive(vec![(NOW, dropped)], SETTLE).await;

        assert_eq!(cmds.len(), 2);
        assert!(matches!(&cmds[0], Command::DisplayImage(img) if img.format() == PixelFormat::Rgba8));
        assert_eq!(cmds[1], Command::DisplayText("HELLO".to_string()));
        assert_eq!(engine.payload(), "HELLO");
        assert_eq!(engine.codec().encodes(), 0);
        assert_eq!(engine.codec().decodes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_noise_image_keeps_payload() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise: Vec<u8> = (0..160 * 120).map(|_| rng.random::<u8>()).collect();
        let noise = RasterImage::new(160, 120, PixelFormat::Luma8, noise);

        let script = vec![(NOW, text("previous")), (SETTLE, UiEvent::Dropped(DataPackage::new().bitmap(Bitmap::Raw(noise.clone()))))];
        let (engine, cmds) = drive(script, SETTLE).await;

        assert_eq!(&cmds[1..], &[Command::DisplayImage(noise), Command::ShowError(NO_CODE_DETECTED.to_string())]);
        assert_eq!(engine.payload(), "previous");
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_load_supersedes_pending_edit() {
        let dropped = UiEvent::Dropped(DataPackage::new().bitmap(Bitmap::Raw(qr_raster("LOADED"))));
        let script = vec![(NOW, text("typed")), (MS_100, dropped)];
        let (engine, cmds) = drive(script, SETTLE).await;

        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1], Command::DisplayText("LOADED".to_string()));
        assert_eq!(engine.codec().encodes(), 0);
        assert_eq!(engine.payload(), "LOADED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_loads_do_not_interleave() {
        let first = UiEvent::Dropped(DataPackage::new().bitmap(Bitmap::Raw(qr_raster("FIRST"))));
        let second = UiEvent::Dropped(DataPackage::new().bitmap(Bitmap::Raw(qr_raster("SECOND"))));
        let (engine, cmds) = drive(vec![(NOW, first), (NOW, second)], SETTLE).await;

        let kinds: Vec<_> = cmds
            .iter()
            .map(|c| match c {
                Command::DisplayImage(_) => "image".to_string(),
                Command::DisplayText(t) => t.clone(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(kinds, ["image", "FIRST", "image", "SECOND"]);
        assert_eq!(engine.payload(), "SECOND");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_prefers_bitmap_over_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let note = dir.path().join("note.txt");
        std::fs::write(&note, "FROM FILE").unwrap();

        let pkg = DataPackage::new().file(&note).bitmap(Bitmap::Encoded(qr_png("FROM BITMAP")));
        let (engine, _) = drive(vec![(NOW, UiEvent::Dropped(pkg))], SETTLE).await;
        assert_eq!(engine.payload(), "FROM BITMAP");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_text_file_renders_without_delay() {
        let dir = tempfile::tempdir().unwrap();
        let note = dir.path().join("note.txt");
        std::fs::write(&note, "\u{feff}FROM FILE").unwrap();

        let (engine, cmds) = drive(vec![(NOW, UiEvent::Dropped(DataPackage::new().file(&note)))], NOW).await;
        assert_eq!(cmds[0], Command::DisplayText("FROM FILE".to_string()));
        assert!(matches!(&cmds[1], Command::DisplayImage(img) if decode(img) == Decoded::Found("FROM FILE".to_string())));
        assert_eq!(engine.codec().encodes(), 1);
        assert_eq!(engine.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_bitmap_reports_invalid_image() {
        let pkg = DataPackage::new().bitmap(Bitmap::Encoded(b"\x89PNG garbage".to_vec()));
        let script = vec![(NOW, text("kept")), (SETTLE, UiEvent::Dropped(pkg))];
        let (engine, cmds) = drive(script, SETTLE).await;

        assert_eq!(cmds.last(), Some(&Command::ShowError("Invalid image".to_string())));
        assert_eq!(engine.payload(), "kept");
        assert_eq!(engine.codec().decodes(), 0);
    }

    async fn assert_broken_bitmap_keeps_pending_edit(bitmap: Bitmap) {
        let dropped = UiEvent::Dropped(DataPackage::new().bitmap(bitmap));
        let script = vec![(NOW, text("typed")), (MS_100, dropped)];
        let (engine, cmds) = drive(script, SETTLE).await;

        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], Command::ShowError("Invalid image".to_string()));
        assert!(matches!(&cmds[1], Command::DisplayImage(img) if decode(img) == Decoded::Found("typed".to_string())));
        assert_eq!(engine.codec().encodes(), 1);
        assert_eq!(engine.codec().decodes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_bitmap_keeps_pending_edit() {
        assert_broken_bitmap_keeps_pending_edit(Bitmap::Encoded(b"\x89PNG garbage".to_vec())).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_raw_bitmap_keeps_pending_edit() {
        let raw = RasterImage::new(4, 4, PixelFormat::Rgb8, vec![0u8; 5]);
        assert_broken_bitmap_keeps_pending_edit(Bitmap::Raw(raw)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_clipboard_is_noop() {
        let (_, cmds) = drive(vec![(NOW, UiEvent::PasteRequested)], SETTLE).await;
        assert!(cmds.is_empty());
    }

    #[test_case("0"; "zero")]
    #[test_case("-5"; "negative")]
    #[test_case("abc"; "letters")]
    fn test_bad_size_renders_default(size: &str) {
        let t0 = Instant::now();
        let mut engine = SyncEngine::new(QrismCodec::default(), SyncConfig::default());
        engine.text_changed("sized", t0);
        engine.size_changed("100", t0);
        engine.size_changed(size, t0);
        assert_eq!(engine.size(), RenderSize::DEFAULT);

        let cmds = engine.timer_fired(t0 + Duration::from_millis(300));
        assert!(matches!(cmds.as_slice(), [Command::DisplayImage(img)] if img.width() == 320));
    }

    #[test_case(128; "small")]
    #[test_case(320; "default")]
    #[test_case(777; "odd")]
    fn test_rendered_size_follows_edit(px: u32) {
        let t0 = Instant::now();
        let mut engine = SyncEngine::new(QrismCodec::default(), SyncConfig::default());
        engine.size_changed(&px.to_string(), t0);
        engine.text_changed("QR", t0);
        let cmds = engine.timer_fired(t0 + Duration::from_millis(300));
        let [Command::DisplayImage(img)] = cmds.as_slice() else {
            panic!("unexpected commands {cmds:?}");
        };
        assert_eq!((img.width(), img.height()), (px, px));
        assert_eq!(decode(img), Decoded::Found("QR".to_string()));
    }
}
