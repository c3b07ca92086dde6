//! Capture output directory lifecycle and the saved-frame counter.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Owns the on-disk capture directory for one session.
///
/// The counter is kept in memory: reconciled against a directory scan
/// once when the session opens, incremented on each successful write,
/// and zeroed by `reset`. External deletions made while a session is
/// running are picked up on the next session start.
pub struct CaptureDir {
    root: PathBuf,
    saved: usize,
}

impl CaptureDir {
    /// Open (creating if absent) the capture directory and count the
    /// images already in it. Never deletes existing content.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create capture dir {}", root.display()))?;
        let saved = count_images(&root)?;
        Ok(Self { root, saved })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of frames saved so far (existing files at open plus
    /// writes recorded since).
    pub fn saved(&self) -> usize {
        self.saved
    }

    /// Destination path for a frame labelled `label`.
    pub fn frame_path(&self, label: &str) -> PathBuf {
        self.root.join(format!("{label}.png"))
    }

    /// Record that a frame was successfully written.
    pub fn record_saved(&mut self) {
        self.saved += 1;
    }

    /// Erase everything under the capture directory and recreate it
    /// empty. After this returns the counter, and any recount, is zero.
    pub fn reset(&mut self) -> Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)
                .with_context(|| format!("failed to erase capture dir {}", self.root.display()))?;
        }
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to recreate capture dir {}", self.root.display()))?;
        self.saved = 0;
        Ok(())
    }

    /// Rescan the directory. Used at open and by tests; the per-tick
    /// counter never rescans.
    pub fn recount(&mut self) -> Result<usize> {
        self.saved = count_images(&self.root)?;
        Ok(self.saved)
    }
}

fn count_images(root: &Path) -> Result<usize> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("failed to scan capture dir {}", root.display()))?;
    let mut count = 0;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("png") {
            count += 1;
        }
    }
    Ok(count)
}
