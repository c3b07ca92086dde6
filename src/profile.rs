//! Camera operating profiles and the startup configuration check.
//!
//! Profiles live in a TOML file keyed by camera identifier. Before a
//! session starts, the selected profile must describe a WDR-enabled,
//! RGB-disabled sensor configuration; anything else aborts startup.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse profile file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no profile for camera {0:?} in the config file")]
    UnknownCamera(String),

    /// The profile loaded but describes an operating mode this app
    /// cannot run under. All violated conditions are listed.
    #[error("camera configuration rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),
}

/// Lens intrinsics used by the undistorter. Pinhole model with two
/// radial and two tangential coefficients.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub k1: f64,
    #[serde(default)]
    pub k2: f64,
    #[serde(default)]
    pub p1: f64,
    #[serde(default)]
    pub p2: f64,
}

/// One camera's operating profile as written by the vendor tooling.
///
/// `range1`/`range2` are exposure range bounds; both being
/// non-negative means wide-dynamic-range mode is active.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraProfile {
    pub range1: i64,
    pub range2: i64,
    pub rgb_image: i64,
    pub intrinsics: Option<Intrinsics>,
}

impl CameraProfile {
    fn wdr_enabled(&self) -> bool {
        self.range1 >= 0 && self.range2 >= 0
    }

    fn rgb_enabled(&self) -> bool {
        self.rgb_image == 1
    }

    /// Startup check: WDR must be on and RGB mode off. Both conditions
    /// are evaluated so the operator sees every violation at once.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut violations = Vec::new();
        if !self.wdr_enabled() {
            violations.push(
                "camera is in WDR-disabled mode; this app requires WDR enabled".to_string(),
            );
        }
        if self.rgb_enabled() {
            violations
                .push("camera is in RGB-enabled mode; this app requires RGB disabled".to_string());
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ProfileError::Rejected(violations))
        }
    }
}

/// All profiles from one config file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: HashMap<String, CameraProfile>,
}

impl ProfileStore {
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ProfileError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents).map_err(|e| ProfileError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let profiles: HashMap<String, CameraProfile> = toml::from_str(contents)?;
        Ok(Self { profiles })
    }

    /// Look up a camera's profile. A missing key is a configuration
    /// error distinct from validation failure: the profile cannot even
    /// be evaluated.
    pub fn get(&self, camera_id: &str) -> Result<&CameraProfile, ProfileError> {
        self.profiles
            .get(camera_id)
            .ok_or_else(|| ProfileError::UnknownCamera(camera_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(contents: &str) -> ProfileStore {
        ProfileStore::parse(contents).expect("parse profile toml")
    }

    #[test]
    fn valid_profile_passes() {
        let s = store("[cam]\nrange1 = 0\nrange2 = 4\nrgb_image = 0\n");
        s.get("cam").unwrap().validate().unwrap();
    }

    #[test]
    fn wdr_disabled_rejected() {
        let s = store("[cam]\nrange1 = -1\nrange2 = 4\nrgb_image = 0\n");
        let err = s.get("cam").unwrap().validate().unwrap_err();
        match err {
            ProfileError::Rejected(msgs) => {
                assert_eq!(msgs.len(), 1);
                assert!(msgs[0].contains("WDR"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rgb_enabled_rejected() {
        let s = store("[cam]\nrange1 = 1\nrange2 = 1\nrgb_image = 1\n");
        let err = s.get("cam").unwrap().validate().unwrap_err();
        match err {
            ProfileError::Rejected(msgs) => {
                assert_eq!(msgs.len(), 1);
                assert!(msgs[0].contains("RGB"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn both_violations_reported_together() {
        let s = store("[cam]\nrange1 = -2\nrange2 = -2\nrgb_image = 1\n");
        let err = s.get("cam").unwrap().validate().unwrap_err();
        match err {
            ProfileError::Rejected(msgs) => assert_eq!(msgs.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_camera_is_a_distinct_error() {
        let s = store("[cam]\nrange1 = 0\nrange2 = 0\nrgb_image = 0\n");
        assert!(matches!(
            s.get("other"),
            Err(ProfileError::UnknownCamera(_))
        ));
    }

    #[test]
    fn intrinsics_are_optional() {
        let s = store(
            "[cam]\nrange1 = 0\nrange2 = 0\nrgb_image = 0\n\
             [cam.intrinsics]\nfx = 900.0\nfy = 900.0\ncx = 640.0\ncy = 360.0\nk1 = -0.1\n",
        );
        let p = s.get("cam").unwrap();
        let intr = p.intrinsics.expect("intrinsics present");
        assert_eq!(intr.fx, 900.0);
        assert_eq!(intr.k2, 0.0);
    }
}
