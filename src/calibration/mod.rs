//! Calibration profiles controlling component tolerances.
//!
//! A [`CalibrationProfile`] is plain data. Profiles come from a [`CalibrationStore`], from
//! JSON/YAML files in a calibration directory (see [`CalibrationLoader`]) or from the
//! built-in defaults. Pipelines hold an explicit `Arc<CalibrationProfile>`; the
//! [`ActiveCalibration`] handle lets an application swap the profile used for pipelines
//! it builds afterwards.

mod active;
mod loader;
mod store;

pub use active::ActiveCalibration;
pub use loader::CalibrationLoader;
pub use store::{CalibrationStore, InMemoryCalibrationStore};

use serde::{Deserialize, Serialize};

use crate::{DriveGradeError, Result};

/// Name used when no profile is configured.
pub const DEFAULT_PROFILE_NAME: &str = "baseline";
/// Version recorded for profiles that do not carry one.
pub const DEFAULT_PROFILE_VERSION: &str = "v1";

/// Tunables for the consistency, strategy and penalty sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(default)]
pub struct CalibrationProfile {
    pub name: String,
    pub version: String,
    /// Mean lap offset (seconds) at which consistency reaches zero
    pub consistency_tolerance: f64,
    pub pace_advantage_scale: f64,
    pub pace_boost_cap: f64,
    /// Seconds of pace advantage before the pace bonus starts
    pub pace_min_advantage: f64,
    pub stint_target_laps: f64,
    pub stint_boost_cap: f64,
    /// Mean pit-lap drift at which strategy reaches zero
    pub strategy_lap_tolerance: f64,
    /// Seconds of lost time that saturate the penalty component
    pub penalty_normalizer: f64,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            version: DEFAULT_PROFILE_VERSION.to_string(),
            consistency_tolerance: 4.1,
            pace_advantage_scale: 3.0,
            pace_boost_cap: 0.25,
            pace_min_advantage: 0.2,
            stint_target_laps: 15.0,
            stint_boost_cap: 0.35,
            strategy_lap_tolerance: 6.0,
            penalty_normalizer: 12.0,
        }
    }
}

impl CalibrationProfile {
    /// Default tunables under a different name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Reject profiles whose divisors would make scores meaningless.
    pub fn validate(&self) -> Result<()> {
        let divisors = [
            ("consistency_tolerance", self.consistency_tolerance),
            ("pace_advantage_scale", self.pace_advantage_scale),
            ("strategy_lap_tolerance", self.strategy_lap_tolerance),
            ("penalty_normalizer", self.penalty_normalizer),
        ];
        for (field, value) in divisors {
            if !(value.is_finite() && value > 0.0) {
                return Err(DriveGradeError::validation(
                    format!("calibration profile '{}'", self.name),
                    format!("{} must be a positive number, got {}", field, value),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_defaults_missing_fields() {
        let profile: CalibrationProfile =
            serde_json::from_str(r#"{"consistency_tolerance": 3.0}"#).unwrap();
        assert_eq!(profile.consistency_tolerance, 3.0);
        assert_eq!(profile.penalty_normalizer, 12.0);
        assert_eq!(profile.name, DEFAULT_PROFILE_NAME);
        assert_eq!(profile.version, DEFAULT_PROFILE_VERSION);
    }

    #[test]
    fn validate_rejects_zero_divisors() {
        let mut profile = CalibrationProfile::named("broken");
        profile.strategy_lap_tolerance = 0.0;
        let message = profile.validate().unwrap_err().to_string();
        assert!(message.contains("strategy_lap_tolerance"), "{message}");
        assert!(CalibrationProfile::default().validate().is_ok());
    }
}
