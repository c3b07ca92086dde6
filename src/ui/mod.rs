mod terminal;

pub use terminal::TerminalSurface;

use anyhow::Result;
use std::time::Duration;

/// Operator input gathered during one tick's bounded poll.
///
/// Capture and erase come from disjoint controls; both may be set on
/// the same tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Capture control (button equivalent) pressed.
    pub capture_button: bool,
    /// Designated capture shortcut key pressed.
    pub capture_key: bool,
    /// Erase control pressed.
    pub erase: bool,
    /// Quit requested (Esc or the quit key).
    pub quit: bool,
}

/// What the surface shows for the current tick.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// A frame is available this tick.
    pub live: bool,
    /// Number of captured images so far.
    pub saved: usize,
    /// Dimensions of the current frame, when live.
    pub frame_size: Option<(u32, u32)>,
    /// Display scale factor, layout only.
    pub scale: f32,
    /// Most recent per-tick problem (e.g. a failed write), if any.
    pub notice: Option<String>,
}

/// Trait for the interactive surface the session renders to.
pub trait Surface {
    /// Wait up to `timeout` for operator input. This bounded wait is
    /// the tick's pacing mechanism.
    fn poll(&mut self, timeout: Duration) -> Result<TickInput>;

    /// Present the current tick's scene.
    fn render(&mut self, scene: &Scene) -> Result<()>;
}
