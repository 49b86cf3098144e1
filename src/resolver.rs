//! Multi-source fetching with ordered fallback
//!
//! Providers are tried in priority order. A provider that is unavailable is skipped; one
//! that fails or returns nothing is recorded and the next is tried. Only when every
//! provider has been exhausted does the caller see an error: the last recorded failure,
//! or [`DriveGradeError::NoProviderAvailable`] when no provider could be asked at all.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::provider::{LapDataProvider, LapRecord, ProviderOutcome, RaceDataProvider};
use crate::providers::{ArchiveTelemetryProvider, LegacyResultsProvider, RealtimeApiProvider};
use crate::schema::{RaceDescriptor, WeekendDescriptor};
use crate::{DriveGradeError, Result};

/// Laps together with the name of the provider that supplied them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapProviderResult {
    pub provider_name: String,
    pub laps: Vec<LapRecord>,
}

/// Ordered set of race data providers.
#[derive(Clone)]
pub struct MultiSourceFetcher {
    providers: Vec<Arc<dyn RaceDataProvider>>,
}

impl std::fmt::Debug for MultiSourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSourceFetcher").field("providers", &self.provider_names()).finish()
    }
}

impl MultiSourceFetcher {
    pub fn new(providers: Vec<Arc<dyn RaceDataProvider>>) -> Self {
        Self { providers }
    }

    /// Archive, real-time and legacy providers configured from `settings`, in that order.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(default_providers(settings)?))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Providers currently able to serve requests, in priority order.
    pub fn available_providers(&self) -> Vec<Arc<dyn RaceDataProvider>> {
        self.providers.iter().filter(|provider| provider.is_available()).cloned().collect()
    }

    /// First non-empty schedule among the providers.
    pub async fn fetch_schedule(&self, season: i32) -> Result<Vec<RaceDescriptor>> {
        let operation = format!("fetch schedule for {season}");
        let mut last_error = None;
        for provider in &self.providers {
            let outcome = if provider.is_available() {
                ProviderOutcome::classify(provider.fetch_schedule(season).await, Vec::is_empty)
            } else {
                ProviderOutcome::Unavailable
            };
            match outcome {
                ProviderOutcome::Data(schedule) => {
                    info!(provider = provider.name(), season, races = schedule.len(), "Schedule resolved");
                    return Ok(schedule);
                }
                other => {
                    if let Some(error) = record(provider.name(), &operation, other) {
                        last_error = Some(error);
                    }
                }
            }
        }
        Err(exhausted(last_error, operation))
    }

    /// First weekend with at least one driver, trying providers one after another.
    pub async fn fetch_race(&self, season: i32, round: u32) -> Result<WeekendDescriptor> {
        let operation = format!("fetch race {season} round {round}");
        let mut last_error = None;
        for provider in &self.providers {
            let outcome = if provider.is_available() {
                ProviderOutcome::classify(provider.fetch_weekend(season, round).await, |weekend| {
                    weekend.drivers.is_empty()
                })
            } else {
                ProviderOutcome::Unavailable
            };
            match outcome {
                ProviderOutcome::Data(weekend) => {
                    info!(provider = provider.name(), season, round, "Race resolved");
                    return Ok(weekend);
                }
                other => {
                    if let Some(error) = record(provider.name(), &operation, other) {
                        last_error = Some(error);
                    }
                }
            }
        }
        Err(exhausted(last_error, operation))
    }

    /// Ask every available provider at once and take the first usable weekend to arrive.
    ///
    /// Slower providers are dropped once a weekend has been accepted.
    pub async fn race_weekend(&self, season: i32, round: u32) -> Result<WeekendDescriptor> {
        let operation = format!("fetch race {season} round {round}");
        let mut pending: FuturesUnordered<_> = self
            .available_providers()
            .into_iter()
            .map(|provider| async move {
                let result = provider.fetch_weekend(season, round).await;
                (provider, result)
            })
            .collect();

        let mut last_error = None;
        while let Some((provider, result)) = pending.next().await {
            match ProviderOutcome::classify(result, |weekend| weekend.drivers.is_empty()) {
                ProviderOutcome::Data(weekend) => {
                    info!(provider = provider.name(), season, round, "Race resolved concurrently");
                    return Ok(weekend);
                }
                other => {
                    if let Some(error) = record(provider.name(), &operation, other) {
                        last_error = Some(error);
                    }
                }
            }
        }
        Err(exhausted(last_error, operation))
    }
}

/// Laps for a session from the first provider that has any.
pub async fn resolve_lap_provider(
    season: i32,
    round: u32,
    session_type: &str,
    providers: &[Arc<dyn LapDataProvider>],
) -> Result<LapProviderResult> {
    let operation = format!("load {session_type} laps for {season} round {round}");
    let mut last_error = None;
    for provider in providers {
        let outcome = if provider.is_available() {
            ProviderOutcome::classify(provider.load_laps(season, round, session_type).await, Vec::is_empty)
        } else {
            ProviderOutcome::Unavailable
        };
        match outcome {
            ProviderOutcome::Data(laps) => {
                debug!(provider = provider.name(), laps = laps.len(), "Laps resolved");
                return Ok(LapProviderResult { provider_name: provider.name().to_string(), laps });
            }
            other => {
                if let Some(error) = record(provider.name(), &operation, other) {
                    last_error = Some(error);
                }
            }
        }
    }
    Err(exhausted(last_error, operation))
}

/// Race data providers in priority order: archive, real-time, legacy.
pub fn default_providers(settings: &Settings) -> Result<Vec<Arc<dyn RaceDataProvider>>> {
    Ok(vec![
        Arc::new(ArchiveTelemetryProvider::from_settings(settings)),
        Arc::new(RealtimeApiProvider::from_settings(settings)?),
        Arc::new(LegacyResultsProvider::from_settings(settings)?),
    ])
}

/// Lap providers in priority order: archive, real-time.
pub fn default_lap_providers(settings: &Settings) -> Result<Vec<Arc<dyn LapDataProvider>>> {
    Ok(vec![
        Arc::new(ArchiveTelemetryProvider::from_settings(settings)),
        Arc::new(RealtimeApiProvider::from_settings(settings)?),
    ])
}

fn record<T>(provider: &str, operation: &str, outcome: ProviderOutcome<T>) -> Option<DriveGradeError> {
    match &outcome {
        ProviderOutcome::Unavailable => debug!(provider, operation, "Provider unavailable, skipping"),
        ProviderOutcome::Empty => warn!(provider, operation, "Provider returned no data, trying next"),
        ProviderOutcome::Failed(error) => warn!(provider, operation, error = %error, "Provider failed, trying next"),
        ProviderOutcome::Data(_) => {}
    }
    outcome.into_error(provider, operation)
}

fn exhausted(last_error: Option<DriveGradeError>, operation: String) -> DriveGradeError {
    last_error.unwrap_or(DriveGradeError::NoProviderAvailable { operation })
}
