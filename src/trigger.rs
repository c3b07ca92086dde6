//! Per-tick save trigger decisions.
//!
//! Each tick the session builds fresh [`TriggerInputs`] and asks the
//! policy whether the current frame should be persisted. Nothing is
//! queued: a trigger that fires on a tick with no frame is dropped.

use chrono::{DateTime, Timelike, Utc};

/// Operator input observed this tick. Ephemeral, rebuilt every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerInputs {
    /// On-screen capture control was pressed.
    pub button: bool,
    /// Designated capture key was pressed.
    pub key: bool,
    /// The camera produced a valid frame this tick.
    pub frame_available: bool,
}

/// Timelapse settings, present only when timelapse mode is on.
#[derive(Debug, Clone, Copy)]
pub struct Timelapse {
    /// Whole minutes between firings.
    pub interval_minutes: u32,
    /// Fire at most once per 1-second window. Off by default, in which
    /// case the stateless predicate fires on every tick that lands
    /// inside the window.
    pub single_fire: bool,
}

/// Outcome of one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Persist the current frame this tick.
    pub save: bool,
    /// The timelapse clock caused (or would have caused) the save;
    /// the session logs count and timestamp before writing.
    pub timelapse_fired: bool,
}

/// Stateless wall-clock predicate: fires during the first second of
/// every `interval_minutes`-th minute.
fn timelapse_window_open(now: DateTime<Utc>, interval_minutes: u32) -> bool {
    interval_minutes > 0 && now.minute() % interval_minutes == 0 && now.second() == 0
}

pub struct TriggerPolicy {
    timelapse: Option<Timelapse>,
    // Minute-resolution id of the last window that fired, for the
    // single-fire latch.
    last_window: Option<i64>,
}

impl TriggerPolicy {
    pub fn new(timelapse: Option<Timelapse>) -> Self {
        Self {
            timelapse,
            last_window: None,
        }
    }

    pub fn timelapse_enabled(&self) -> bool {
        self.timelapse.is_some()
    }

    /// Decide whether to persist the current frame.
    ///
    /// `button || key` is the baseline; a firing timelapse window
    /// forces the decision true on top of it. Frame availability
    /// gates everything: no frame, no save, and the trigger is not
    /// deferred.
    pub fn evaluate(&mut self, inputs: TriggerInputs, now: DateTime<Utc>) -> Decision {
        let mut save = inputs.button || inputs.key;
        let mut timelapse_fired = false;

        if let Some(lapse) = self.timelapse {
            if timelapse_window_open(now, lapse.interval_minutes) {
                let window = now.timestamp() / 60;
                let already_fired = lapse.single_fire && self.last_window == Some(window);
                if !already_fired {
                    save = true;
                    timelapse_fired = true;
                    self.last_window = Some(window);
                }
            }
        }

        if !inputs.frame_available {
            save = false;
        }

        Decision {
            save,
            timelapse_fired,
        }
    }
}
