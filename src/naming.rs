use chrono::{DateTime, Utc};
use chrono_tz::Asia::Tokyo;

/// Filename stem for a frame captured at `now`.
///
/// The instant is taken in UTC and converted to a fixed reference zone
/// (Asia/Tokyo, where the rig lives) so labels read the same no matter
/// which host's local zone the app runs under. Labels sort
/// lexicographically in capture order; two saves inside the same whole
/// second collide and the last write wins.
pub fn timestamp_label(now: DateTime<Utc>) -> String {
    now.with_timezone(&Tokyo)
        .format("%Y-%m-%d_%H:%M:%S")
        .to_string()
}
