mod camera;
mod naming;
mod profile;
mod session;
mod sink;
mod storage;
mod trigger;
mod ui;

use anyhow::{ensure, Context, Result};
use camera::{NokhwaCamera, Undistorter};
use clap::Parser;
use profile::ProfileStore;
use session::{Session, SessionConfig};
use sink::PngSink;
use std::path::PathBuf;
use std::time::Duration;
use storage::CaptureDir;
use trigger::Timelapse;
use ui::TerminalSurface;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera profile TOML file
    #[arg(short = 't', long, default_value = "cfg/camera_parameter.toml")]
    config: PathBuf,

    /// Profile key of the camera to use
    #[arg(long, default_value = "see3cam")]
    camera: String,

    /// Capture device index
    #[arg(short, long, default_value_t = 0)]
    device: u32,

    /// Directory captured frames are saved to
    #[arg(short, long, default_value = "data")]
    save_dir: PathBuf,

    /// Save the raw frame instead of the lens-corrected one
    #[arg(long)]
    save_raw: bool,

    /// Preview display scale
    #[arg(long, default_value_t = 0.75)]
    scale: f32,

    /// Enable timelapse mode
    #[arg(short = 'l', long)]
    timelapse: bool,

    /// Minutes between timelapse captures
    #[arg(short, long, default_value_t = 5)]
    interval_minutes: u32,

    /// Fire at most one timelapse capture per interval boundary
    /// (otherwise fast ticks inside the same second each save a frame)
    #[arg(long)]
    timelapse_single_fire: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    ensure!(args.scale > 0.0, "scale must be positive");
    ensure!(
        args.interval_minutes > 0,
        "interval-minutes must be positive"
    );

    tracing::info!("camsnap starting");
    tracing::info!(
        "Camera profile: {} from {}",
        args.camera,
        args.config.display()
    );
    tracing::info!("Save directory: {}", args.save_dir.display());

    // Startup check: refuse to run against an incompatible camera
    // operating mode. Every violation is logged before aborting.
    let profiles = ProfileStore::load(&args.config).context("Failed to load camera profiles")?;
    let profile = profiles.get(&args.camera)?;
    if let Err(err) = profile.validate() {
        if let profile::ProfileError::Rejected(messages) = &err {
            for message in messages {
                tracing::error!("{message}");
            }
        }
        return Err(err).context("Camera configuration check failed");
    }

    let dir = CaptureDir::open(&args.save_dir).context("Failed to open capture directory")?;

    let camera = NokhwaCamera::new(args.device).context("Failed to initialize camera capture")?;
    let lens = Undistorter::new(profile.intrinsics);
    let sink = PngSink;

    let timelapse = args.timelapse.then_some(Timelapse {
        interval_minutes: args.interval_minutes,
        single_fire: args.timelapse_single_fire,
    });
    if let Some(lapse) = &timelapse {
        tracing::info!(
            "Timelapse mode: every {} minute(s), single_fire={}",
            lapse.interval_minutes,
            lapse.single_fire
        );
    }

    let config = SessionConfig {
        save_raw: args.save_raw,
        scale: args.scale,
        timelapse,
        poll_timeout: Duration::from_millis(10),
    };

    // The surface comes up last: it flips the terminal into raw mode
    // and restores it on drop.
    let surface = TerminalSurface::new().context("Failed to initialize terminal surface")?;

    let mut session = Session::new(camera, lens, surface, sink, dir, config);
    session.run()
}
