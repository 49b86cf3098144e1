//! Runtime settings
//!
//! Settings come from `DRIVE_GRADE_*` environment variables or a YAML file. Every field
//! has a default, so an empty environment yields a usable configuration.
//!
//! | variable | field |
//! |---|---|
//! | `DRIVE_GRADE_CALIBRATION_DIR` | `calibration_dir` |
//! | `DRIVE_GRADE_CALIBRATION_PROFILE` | `calibration_profile` |
//! | `DRIVE_GRADE_SESSION_ARCHIVE_DIR` | `session_archive_dir` |
//! | `DRIVE_GRADE_REALTIME_BASE_URL` | `realtime_base_url` |
//! | `DRIVE_GRADE_REALTIME_SESSION_NAME` | `realtime_session_name` |
//! | `DRIVE_GRADE_LEGACY_BASE_URL` | `legacy_base_url` |
//! | `DRIVE_GRADE_HTTP_TIMEOUT_SECS` | `http_timeout_secs` |
//! | `DRIVE_GRADE_SESSION_TIMEOUT_SECS` | `session_timeout_secs` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::calibration::DEFAULT_PROFILE_NAME;
use crate::{DriveGradeError, Result};

pub const ENV_PREFIX: &str = "DRIVE_GRADE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub calibration_dir: PathBuf,
    pub calibration_profile: String,
    pub session_archive_dir: PathBuf,
    pub realtime_base_url: String,
    /// Session name requested from the real-time API
    pub realtime_session_name: String,
    pub legacy_base_url: String,
    pub http_timeout_secs: u64,
    pub session_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            calibration_dir: PathBuf::from("configs/calibration"),
            calibration_profile: DEFAULT_PROFILE_NAME.to_string(),
            session_archive_dir: PathBuf::from("data/sessions"),
            realtime_base_url: "https://api.openf1.org/v1".to_string(),
            realtime_session_name: "Race".to_string(),
            legacy_base_url: "https://api.jolpi.ca/ergast/f1".to_string(),
            http_timeout_secs: 30,
            session_timeout_secs: 45,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup (full variable names).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let seconds = |name: &str, default: u64| -> Result<u64> {
            match var(name) {
                Some(value) => value.parse().map_err(|_| {
                    DriveGradeError::validation(
                        "settings",
                        format!("{}{} must be a whole number of seconds, got '{}'", ENV_PREFIX, name, value),
                    )
                }),
                None => Ok(default),
            }
        };

        let defaults = Self::default();
        Ok(Self {
            calibration_dir: var("CALIBRATION_DIR").map(PathBuf::from).unwrap_or(defaults.calibration_dir),
            calibration_profile: var("CALIBRATION_PROFILE").unwrap_or(defaults.calibration_profile),
            session_archive_dir: var("SESSION_ARCHIVE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_archive_dir),
            realtime_base_url: var("REALTIME_BASE_URL").unwrap_or(defaults.realtime_base_url),
            realtime_session_name: var("REALTIME_SESSION_NAME")
                .unwrap_or(defaults.realtime_session_name),
            legacy_base_url: var("LEGACY_BASE_URL").unwrap_or(defaults.legacy_base_url),
            http_timeout_secs: seconds("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            session_timeout_secs: seconds("SESSION_TIMEOUT_SECS", defaults.session_timeout_secs)?,
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| DriveGradeError::file_error(path, e))?;
        serde_yaml_ng::from_str(&text)
            .map_err(|e| DriveGradeError::parse(format!("settings file {}", path.display()), e))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(Settings::from_lookup(|_| None).unwrap(), Settings::default());
    }

    #[test]
    fn environment_overrides_fields() {
        let settings = Settings::from_lookup(lookup(&[
            ("DRIVE_GRADE_CALIBRATION_PROFILE", "wet"),
            ("DRIVE_GRADE_SESSION_TIMEOUT_SECS", " 90 "),
            ("DRIVE_GRADE_LEGACY_BASE_URL", ""),
        ]))
        .unwrap();
        assert_eq!(settings.calibration_profile, "wet");
        assert_eq!(settings.session_timeout(), Duration::from_secs(90));
        assert_eq!(settings.legacy_base_url, Settings::default().legacy_base_url);
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let error =
            Settings::from_lookup(lookup(&[("DRIVE_GRADE_HTTP_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(error.to_string().contains("DRIVE_GRADE_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn yaml_file_defaults_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "session_archive_dir: /srv/sessions\nhttp_timeout_secs: 5\n").unwrap();
        let settings = Settings::from_yaml_file(&path).unwrap();
        assert_eq!(settings.session_archive_dir, PathBuf::from("/srv/sessions"));
        assert_eq!(settings.http_timeout_secs, 5);
        assert_eq!(settings.calibration_profile, "baseline");
    }
}
