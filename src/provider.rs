//! Provider traits for race data sources
//!
//! Providers abstract over structurally different upstream sources (archived timing
//! sessions, a real-time REST API, a legacy results API) and reduce each of them to the
//! canonical [`WeekendDescriptor`]. They are object safe so a resolver can hold an ordered
//! `Vec<Arc<dyn RaceDataProvider>>`.

use serde::{Deserialize, Serialize};

use crate::schema::{RaceDescriptor, WeekendDescriptor};
use crate::{DriveGradeError, Result};

/// Identity and availability shared by every provider.
pub trait ProviderInfo: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the provider can serve requests at all (configured, reachable backing store).
    ///
    /// Unavailable providers are skipped by resolvers without being called.
    fn is_available(&self) -> bool;
}

/// Source of season schedules and full race weekends.
#[async_trait::async_trait]
pub trait RaceDataProvider: ProviderInfo {
    /// Races of a season, sorted by round.
    ///
    /// Returns:
    /// - `Ok(races)` - Schedule, possibly empty when the provider has nothing for the season
    /// - `Err(e)` - The provider failed
    async fn fetch_schedule(&self, season: i32) -> Result<Vec<RaceDescriptor>>;

    /// Canonical weekend with team-anchored car pace for every classified driver.
    async fn fetch_weekend(&self, season: i32, round: u32) -> Result<WeekendDescriptor>;
}

/// Source of lap-level timing rows.
#[async_trait::async_trait]
pub trait LapDataProvider: ProviderInfo {
    async fn load_laps(&self, season: i32, round: u32, session_type: &str) -> Result<Vec<LapRecord>>;
}

/// One timed lap as reported by a lap provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct LapRecord {
    pub driver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<u32>,
    pub lap_number: u32,
    /// Lap time in seconds, missing for laps without a valid time
    #[serde(default)]
    pub lap_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stint: Option<u32>,
    #[serde(default)]
    pub pit_in: bool,
    #[serde(default)]
    pub pit_out: bool,
}

/// Classified result of asking one provider for data.
///
/// Resolvers branch on this instead of on error types, so "no data" and "failed" are
/// handled the same way while still being logged differently.
#[derive(Debug)]
pub enum ProviderOutcome<T> {
    Data(T),
    Unavailable,
    Empty,
    Failed(DriveGradeError),
}

impl<T> ProviderOutcome<T> {
    /// Classify a provider call, treating results for which `is_empty` holds as empty.
    pub fn classify(result: Result<T>, is_empty: impl FnOnce(&T) -> bool) -> Self {
        match result {
            Ok(value) if is_empty(&value) => ProviderOutcome::Empty,
            Ok(value) => ProviderOutcome::Data(value),
            Err(error) => ProviderOutcome::Failed(error),
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, ProviderOutcome::Data(_))
    }

    /// The error to remember for fallback reporting, if this outcome carries one.
    ///
    /// Empty outcomes are turned into [`DriveGradeError::EmptyResult`].
    pub fn into_error(self, provider: &str, operation: &str) -> Option<DriveGradeError> {
        match self {
            ProviderOutcome::Data(_) | ProviderOutcome::Unavailable => None,
            ProviderOutcome::Empty => Some(DriveGradeError::EmptyResult {
                provider: provider.to_string(),
                operation: operation.to_string(),
            }),
            ProviderOutcome::Failed(error) => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn classify_separates_empty_from_data() {
        let empty = ProviderOutcome::classify(Ok(Vec::<u32>::new()), Vec::is_empty);
        assert!(matches!(empty, ProviderOutcome::Empty));
        let data = ProviderOutcome::classify(Ok(vec![1u32]), Vec::is_empty);
        assert!(data.is_data());
        let failed = ProviderOutcome::<Vec<u32>>::classify(
            Err(DriveGradeError::provider_failed("legacy", "503")),
            Vec::is_empty,
        );
        assert!(matches!(failed, ProviderOutcome::Failed(_)));
    }

    #[test]
    fn empty_outcome_becomes_empty_result_error() {
        let error = ProviderOutcome::<()>::Empty.into_error("realtime", "fetch race").unwrap();
        assert_eq!(error.kind(), ErrorKind::Provider);
        assert!(error.to_string().contains("realtime"));
        assert!(ProviderOutcome::<()>::Unavailable.into_error("x", "y").is_none());
    }
}
