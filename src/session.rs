//! The capture session loop.
//!
//! One tick = one bounded input poll, one camera poll, one trigger
//! decision, one render. The loop is single-threaded and
//! frame-synchronous; the only waits are the input poll (tick pacing)
//! and the one-second timelapse throttle.

use crate::camera::{CameraSource, LensCorrection};
use crate::naming::timestamp_label;
use crate::sink::FrameSink;
use crate::storage::CaptureDir;
use crate::trigger::{Timelapse, TriggerInputs, TriggerPolicy};
use crate::ui::{Scene, Surface, TickInput};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Immutable session settings. Fixed at start, never mutated after.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Persist the raw frame instead of the corrected one.
    pub save_raw: bool,
    /// Preview display scale, layout only.
    pub scale: f32,
    /// Timelapse settings when timelapse mode is on.
    pub timelapse: Option<Timelapse>,
    /// Input poll budget per tick.
    pub poll_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_raw: false,
            scale: 0.75,
            timelapse: None,
            poll_timeout: Duration::from_millis(10),
        }
    }
}

pub struct Session<C, L, S, W> {
    camera: C,
    lens: L,
    surface: S,
    sink: W,
    dir: CaptureDir,
    config: SessionConfig,
    policy: TriggerPolicy,
    notice: Option<String>,
    ticks: u64,
}

impl<C, L, S, W> Session<C, L, S, W>
where
    C: CameraSource,
    L: LensCorrection,
    S: Surface,
    W: FrameSink,
{
    pub fn new(camera: C, lens: L, surface: S, sink: W, dir: CaptureDir, config: SessionConfig) -> Self {
        let policy = TriggerPolicy::new(config.timelapse);
        Self {
            camera,
            lens,
            surface,
            sink,
            dir,
            config,
            policy,
            notice: None,
            ticks: 0,
        }
    }

    pub fn saved(&self) -> usize {
        self.dir.saved()
    }

    /// Drive ticks until the operator quits.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Session started: {} captured images already on disk",
            self.dir.saved()
        );
        while self.tick(Utc::now())? {}
        tracing::info!("Session ended after {} ticks", self.ticks);
        Ok(())
    }

    /// One iteration of the session loop. Returns false once the
    /// operator has requested exit.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<bool> {
        self.ticks += 1;
        let input = self.surface.poll(self.config.poll_timeout)?;
        if input.quit {
            return Ok(false);
        }

        // Live vs idle is decided fresh every tick from the camera.
        let frame_available = self.camera.update();
        let mut frame_size = None;

        if frame_available {
            let raw = self.camera.read()?;
            let corrected = self.lens.correct(&raw);
            frame_size = Some(raw.dimensions());

            self.evaluate_capture(&input, &raw, &corrected, now);

            // Save is sequenced before erase: a same-tick save lands in
            // the pre-erase directory and is then wiped with the rest.
            if input.erase {
                self.dir.reset()?;
                tracing::info!("Capture directory erased");
            }

            // Timelapse throttle, applied after the decision whether or
            // not a save happened.
            if self.policy.timelapse_enabled() {
                std::thread::sleep(Duration::from_secs(1));
            }
        }

        let scene = Scene {
            live: frame_available,
            saved: self.dir.saved(),
            frame_size,
            scale: self.config.scale,
            notice: self.notice.clone(),
        };
        self.surface.render(&scene)?;
        Ok(true)
    }

    fn evaluate_capture(
        &mut self,
        input: &TickInput,
        raw: &image::RgbImage,
        corrected: &image::RgbImage,
        now: DateTime<Utc>,
    ) {
        let inputs = TriggerInputs {
            button: input.capture_button,
            key: input.capture_key,
            frame_available: true,
        };
        let decision = self.policy.evaluate(inputs, now);

        if decision.timelapse_fired {
            tracing::info!(
                "Timelapse capture: count={}, time={}",
                self.dir.saved(),
                now.to_rfc3339()
            );
        }
        if !decision.save {
            return;
        }

        let frame = if self.config.save_raw { raw } else { corrected };
        let path = self.dir.frame_path(&timestamp_label(now));
        match self.sink.write(frame, &path) {
            Ok(()) => {
                self.dir.record_saved();
                self.notice = None;
                tracing::info!("Saved frame {}", path.display());
            }
            Err(err) => {
                // Reported and dropped; the failed save is not retried.
                tracing::warn!("Frame save failed: {err:#}");
                self.notice = Some(format!("save failed: {err:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::PngSink;
    use anyhow::anyhow;
    use chrono::TimeZone;
    use image::RgbImage;
    use std::collections::VecDeque;
    use std::path::Path;

    struct FakeCamera {
        frames: VecDeque<Option<RgbImage>>,
        pending: Option<RgbImage>,
    }

    impl FakeCamera {
        fn with_frames(count: usize) -> Self {
            Self {
                frames: (0..count).map(|_| Some(RgbImage::new(4, 3))).collect(),
                pending: None,
            }
        }

        fn from_script(script: Vec<Option<RgbImage>>) -> Self {
            Self {
                frames: script.into(),
                pending: None,
            }
        }
    }

    impl CameraSource for FakeCamera {
        fn update(&mut self) -> bool {
            self.pending = self.frames.pop_front().flatten();
            self.pending.is_some()
        }

        fn read(&mut self) -> Result<RgbImage> {
            self.pending.take().ok_or_else(|| anyhow!("no frame"))
        }
    }

    struct PassThrough;

    impl LensCorrection for PassThrough {
        fn correct(&self, frame: &RgbImage) -> RgbImage {
            frame.clone()
        }
    }

    #[derive(Default)]
    struct ScriptSurface {
        inputs: VecDeque<TickInput>,
        scenes: Vec<Scene>,
    }

    impl Surface for ScriptSurface {
        fn poll(&mut self, _timeout: Duration) -> Result<TickInput> {
            Ok(self.inputs.pop_front().unwrap_or_default())
        }

        fn render(&mut self, scene: &Scene) -> Result<()> {
            self.scenes.push(scene.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl FrameSink for FailingSink {
        fn write(&mut self, _frame: &RgbImage, _path: &Path) -> Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    fn capture_press() -> TickInput {
        TickInput {
            capture_button: true,
            ..Default::default()
        }
    }

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 34, second).unwrap()
    }

    fn new_session(
        camera: FakeCamera,
        surface: ScriptSurface,
        dir: CaptureDir,
    ) -> Session<FakeCamera, PassThrough, ScriptSurface, PngSink> {
        Session::new(camera, PassThrough, surface, PngSink, dir, SessionConfig::default())
    }

    #[test]
    fn manual_ticks_save_one_file_each_then_erase_clears() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CaptureDir::open(tmp.path().join("captures")).unwrap();
        let surface = ScriptSurface {
            inputs: vec![capture_press(), capture_press(), capture_press()].into(),
            scenes: Vec::new(),
        };
        let mut session = new_session(FakeCamera::with_frames(4), surface, dir);

        for s in 0..3 {
            assert!(session.tick(at(s)).unwrap());
        }
        assert_eq!(session.saved(), 3);
        assert_eq!(session.dir.recount().unwrap(), 3);

        session.surface.inputs.push_back(TickInput {
            erase: true,
            ..Default::default()
        });
        assert!(session.tick(at(3)).unwrap());
        assert_eq!(session.saved(), 0);
        assert_eq!(session.dir.recount().unwrap(), 0);
    }

    #[test]
    fn quit_ends_the_loop_without_touching_the_camera_state() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CaptureDir::open(tmp.path().join("captures")).unwrap();
        let surface = ScriptSurface {
            inputs: vec![TickInput {
                quit: true,
                capture_button: true,
                ..Default::default()
            }]
            .into(),
            scenes: Vec::new(),
        };
        let mut session = new_session(FakeCamera::with_frames(1), surface, dir);
        assert!(!session.tick(at(0)).unwrap());
        assert_eq!(session.saved(), 0, "quit tick does not save");
    }

    #[test]
    fn idle_tick_ignores_capture_press() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CaptureDir::open(tmp.path().join("captures")).unwrap();
        let surface = ScriptSurface {
            inputs: vec![capture_press(), capture_press()].into(),
            scenes: Vec::new(),
        };
        // Frame drops on tick 1, returns on tick 2: not sticky.
        let script = vec![None, Some(RgbImage::new(4, 3))];
        let mut session = new_session(FakeCamera::from_script(script), surface, dir);

        assert!(session.tick(at(0)).unwrap());
        assert_eq!(session.saved(), 0);
        assert!(!session.surface.scenes[0].live);

        assert!(session.tick(at(1)).unwrap());
        assert_eq!(session.saved(), 1);
        assert!(session.surface.scenes[1].live);
    }

    #[test]
    fn same_tick_save_and_erase_leaves_directory_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CaptureDir::open(tmp.path().join("captures")).unwrap();
        let surface = ScriptSurface {
            inputs: vec![TickInput {
                capture_button: true,
                erase: true,
                ..Default::default()
            }]
            .into(),
            scenes: Vec::new(),
        };
        let mut session = new_session(FakeCamera::with_frames(1), surface, dir);
        assert!(session.tick(at(0)).unwrap());
        // Save ran first (against the pre-erase directory), then the
        // erase wiped it.
        assert_eq!(session.saved(), 0);
        assert_eq!(session.dir.recount().unwrap(), 0);
    }

    #[test]
    fn failed_write_reports_a_notice_and_keeps_running() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CaptureDir::open(tmp.path().join("captures")).unwrap();
        let surface = ScriptSurface {
            inputs: vec![capture_press(), TickInput::default()].into(),
            scenes: Vec::new(),
        };
        let mut session = Session::new(
            FakeCamera::with_frames(2),
            PassThrough,
            surface,
            FailingSink,
            dir,
            SessionConfig::default(),
        );

        assert!(session.tick(at(0)).unwrap());
        assert_eq!(session.saved(), 0);
        let notice = session.surface.scenes[0].notice.as_deref();
        assert!(notice.is_some_and(|n| n.contains("save failed")));

        // The next tick still runs and the notice persists until a
        // save succeeds.
        assert!(session.tick(at(1)).unwrap());
    }

    #[test]
    fn raw_vs_corrected_switch_selects_frame() {
        struct Invert;
        impl LensCorrection for Invert {
            fn correct(&self, frame: &RgbImage) -> RgbImage {
                let mut out = frame.clone();
                out.pixels_mut().for_each(|p| p.0 = [255 - p.0[0], 255 - p.0[1], 255 - p.0[2]]);
                out
            }
        }

        struct CapturingSink(Vec<RgbImage>);
        impl FrameSink for CapturingSink {
            fn write(&mut self, frame: &RgbImage, _path: &Path) -> Result<()> {
                self.0.push(frame.clone());
                Ok(())
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        for save_raw in [true, false] {
            let dir = CaptureDir::open(tmp.path().join(format!("captures-{save_raw}"))).unwrap();
            let surface = ScriptSurface {
                inputs: vec![capture_press()].into(),
                scenes: Vec::new(),
            };
            let config = SessionConfig {
                save_raw,
                ..Default::default()
            };
            let mut session = Session::new(
                FakeCamera::with_frames(1),
                Invert,
                surface,
                CapturingSink(Vec::new()),
                dir,
                config,
            );
            assert!(session.tick(at(0)).unwrap());
            let written = &session.sink.0[0];
            let expected = if save_raw { 0 } else { 255 };
            assert_eq!(written.get_pixel(0, 0).0[0], expected);
        }
    }
}
