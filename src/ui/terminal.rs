use super::{Scene, Surface, TickInput};
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    style::Print,
    terminal::{self, Clear, ClearType},
    QueueableCommand,
};
use std::io::{self, Write};
use std::time::Duration;

/// Raw-mode terminal surface.
///
/// Controls: Enter or space = capture button, `s` = capture key,
/// `e` = erase, `q` or Esc = quit. The status line shows live state,
/// the capture counter, and the last notice.
pub struct TerminalSurface {
    stdout: io::Stdout,
}

impl TerminalSurface {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw terminal mode")?;
        let mut stdout = io::stdout();
        stdout
            .queue(Print(
                "camsnap: [enter/space] capture  [s] capture  [e] erase  [q/esc] quit\r\n",
            ))
            .and_then(|s| s.flush())
            .context("Failed to write to terminal")?;
        Ok(Self { stdout })
    }
}

impl Surface for TerminalSurface {
    fn poll(&mut self, timeout: Duration) -> Result<TickInput> {
        let mut input = TickInput::default();

        // First wait is bounded by the tick budget; afterwards drain
        // whatever else is already queued without blocking.
        let mut wait = timeout;
        while event::poll(wait).context("Failed to poll terminal input")? {
            if let Event::Key(key) = event::read().context("Failed to read terminal input")? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Enter | KeyCode::Char(' ') => input.capture_button = true,
                        KeyCode::Char('s') => input.capture_key = true,
                        KeyCode::Char('e') => input.erase = true,
                        KeyCode::Char('q') | KeyCode::Esc => input.quit = true,
                        _ => {}
                    }
                }
            }
            wait = Duration::ZERO;
        }

        Ok(input)
    }

    fn render(&mut self, scene: &Scene) -> Result<()> {
        let state = if scene.live {
            match scene.frame_size {
                Some((w, h)) => {
                    let sw = (w as f32 * scene.scale) as u32;
                    let sh = (h as f32 * scene.scale) as u32;
                    format!("live {sw}x{sh}")
                }
                None => "live".to_string(),
            }
        } else {
            "waiting for camera".to_string()
        };

        let mut line = format!("[{state}] captured images: {}", scene.saved);
        if let Some(notice) = &scene.notice {
            line.push_str(&format!("  !! {notice}"));
        }

        self.stdout
            .queue(cursor::MoveToColumn(0))
            .and_then(|s| s.queue(Clear(ClearType::CurrentLine)))
            .and_then(|s| s.queue(Print(line)))
            .and_then(|s| s.flush())
            .context("Failed to write to terminal")?;
        Ok(())
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = self.stdout.queue(Print("\r\n")).and_then(|s| s.flush());
        let _ = terminal::disable_raw_mode();
    }
}
