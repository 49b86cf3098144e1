//! Provider for the legacy (Ergast-compatible) results API
//!
//! The legacy API has classification, lap timings and pit stops but no telemetry, so
//! form is derived from lap deltas to the per-lap field median and strategy is taken
//! at face value.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::http::{HttpTransport, JsonTransport, join_url};
use super::metrics::{legacy_form, mean};
use super::track::{lap_time_to_seconds, slugify_race};
use crate::config::Settings;
use crate::provider::{ProviderInfo, RaceDataProvider};
use crate::schema::{DriverEntry, RaceDescriptor, StrategyEntry, WeekendDescriptor};
use crate::types::{anchor_car_pace_to_team, median};
use crate::{DriveGradeError, Result};

pub const LEGACY_PROVIDER: &str = "legacy";

pub struct LegacyResultsProvider {
    base_url: String,
    transport: Arc<dyn JsonTransport>,
}

impl LegacyResultsProvider {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn JsonTransport>) -> Self {
        Self { base_url: base_url.into(), transport }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = HttpTransport::new(LEGACY_PROVIDER, settings.http_timeout())?;
        Ok(Self::new(settings.legacy_base_url.clone(), Arc::new(transport)))
    }

    async fn races(&self, path: &str, limit: Option<u32>) -> Result<Vec<LegacyRace>> {
        let url = join_url(&self.base_url, path);
        let query: Vec<(&str, String)> =
            limit.map(|limit| vec![("limit", limit.to_string())]).unwrap_or_default();
        let payload = self.transport.get_json(&url, &query).await?;
        let envelope: Envelope = serde_json::from_value(payload)
            .map_err(|e| DriveGradeError::parse(format!("{LEGACY_PROVIDER} response {url}"), e))?;
        Ok(envelope.data.race_table.races)
    }
}

impl ProviderInfo for LegacyResultsProvider {
    fn name(&self) -> &str {
        LEGACY_PROVIDER
    }

    fn is_available(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

#[async_trait::async_trait]
impl RaceDataProvider for LegacyResultsProvider {
    async fn fetch_schedule(&self, season: i32) -> Result<Vec<RaceDescriptor>> {
        let races = self.races(&format!("{season}.json"), None).await?;
        let mut schedule: Vec<RaceDescriptor> = races
            .iter()
            .filter_map(|race| {
                let round = parse_positive(Some(&race.round))?;
                Some(RaceDescriptor {
                    season,
                    round,
                    race_name: race.race_name.clone(),
                    circuit: race.circuit.circuit_name.clone(),
                    slug: slugify_race(&race.race_name),
                })
            })
            .collect();
        schedule.sort_by_key(|race| race.round);
        debug!(season, races = schedule.len(), "Loaded legacy schedule");
        Ok(schedule)
    }

    async fn fetch_weekend(&self, season: i32, round: u32) -> Result<WeekendDescriptor> {
        let base = format!("{season}/{round}");
        let race = self
            .races(&format!("{base}/results.json"), Some(300))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriveGradeError::EmptyResult {
                provider: LEGACY_PROVIDER.to_string(),
                operation: format!("results for {season} round {round}"),
            })?;
        let laps = first_race(self.races(&format!("{base}/laps.json"), Some(6000)).await?)
            .map(|race| race.laps)
            .unwrap_or_default();
        let pit_stops = first_race(self.races(&format!("{base}/pitstops.json"), Some(2000)).await?)
            .map(|race| race.pit_stops)
            .unwrap_or_default();

        let weekend = build_weekend(season, round, race, &laps, &pit_stops);
        info!(season, round, drivers = weekend.drivers.len(), "Built legacy weekend");
        Ok(weekend)
    }
}

fn first_race(races: Vec<LegacyRace>) -> Option<LegacyRace> {
    races.into_iter().next()
}

fn build_weekend(
    season: i32,
    round: u32,
    race: LegacyRace,
    laps: &[LegacyLap],
    pit_stops: &[LegacyPitStop],
) -> WeekendDescriptor {
    let deltas = lap_deltas_to_field_median(laps);

    let mut pit_laps: HashMap<&str, Vec<u32>> = HashMap::new();
    for stop in pit_stops {
        if let Some(lap) = parse_positive(Some(&stop.lap)) {
            pit_laps.entry(stop.driver_id.as_str()).or_default().push(lap);
        }
    }

    let mut drivers: Vec<DriverEntry> = race
        .results
        .iter()
        .map(|result| {
            let driver_id = result.driver.driver_id.as_str();
            let driver_deltas = deltas.get(driver_id).cloned().unwrap_or_default();
            let grid = parse_positive(result.grid.as_ref());
            let finish = parse_positive(result.position.as_ref());
            let mut stops = pit_laps.get(driver_id).cloned().unwrap_or_default();
            stops.sort_unstable();

            let team = result
                .constructor
                .as_ref()
                .map(|constructor| constructor.name.trim())
                .filter(|name| !name.is_empty())
                .unwrap_or("Unknown");

            let mut entry =
                DriverEntry::new(result.driver.display_name(), team, mean(&driver_deltas).unwrap_or(0.0));
            entry.driver_number = parse_positive(result.number.as_ref());
            entry.grid_position = grid;
            entry.finish_position = finish;
            entry.classification_status = result.status.clone();
            entry.form = legacy_form(&driver_deltas, grid, finish);
            entry.lap_deltas = driver_deltas;
            entry.strategy = StrategyEntry {
                optimal_pit_laps: stops.clone(),
                actual_pit_laps: stops,
                degradation_penalty: 0.0,
            };
            entry
        })
        .collect();
    anchor_car_pace_to_team(&mut drivers);

    let descriptor = RaceDescriptor {
        season,
        round,
        slug: slugify_race(&race.race_name),
        race_name: race.race_name,
        circuit: race.circuit.circuit_name,
    };
    WeekendDescriptor::new(descriptor, LEGACY_PROVIDER, drivers)
}

/// Per-driver deltas of every timed lap to that lap's field median.
fn lap_deltas_to_field_median(laps: &[LegacyLap]) -> HashMap<String, Vec<f64>> {
    let mut deltas: HashMap<String, Vec<f64>> = HashMap::new();
    for lap in laps {
        let times: Vec<(&str, f64)> = lap
            .timings
            .iter()
            .filter_map(|timing| Some((timing.driver_id.as_str(), lap_time_to_seconds(&timing.time)?)))
            .collect();
        let values: Vec<f64> = times.iter().map(|(_, seconds)| *seconds).collect();
        let Some(reference) = median(&values) else { continue };
        for (driver_id, seconds) in times {
            deltas.entry(driver_id.to_string()).or_default().push(seconds - reference);
        }
    }
    deltas
}

fn parse_positive(text: Option<&String>) -> Option<u32> {
    text.and_then(|value| value.trim().parse::<u32>().ok()).filter(|value| *value > 0)
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(rename = "MRData", default)]
    data: MrData,
}

#[derive(Debug, Default, Deserialize)]
struct MrData {
    #[serde(rename = "RaceTable", default)]
    race_table: RaceTable,
}

#[derive(Debug, Default, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<LegacyRace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRace {
    #[serde(default)]
    round: String,
    #[serde(default)]
    race_name: String,
    #[serde(rename = "Circuit", default)]
    circuit: LegacyCircuit,
    #[serde(rename = "Results", default)]
    results: Vec<LegacyResult>,
    #[serde(rename = "Laps", default)]
    laps: Vec<LegacyLap>,
    #[serde(rename = "PitStops", default)]
    pit_stops: Vec<LegacyPitStop>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCircuit {
    #[serde(default)]
    circuit_name: String,
}

#[derive(Debug, Deserialize)]
struct LegacyResult {
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    grid: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "Driver")]
    driver: LegacyDriver,
    #[serde(rename = "Constructor", default)]
    constructor: Option<LegacyConstructor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDriver {
    driver_id: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

impl LegacyDriver {
    /// Three-letter code when published, otherwise "M. Verstappen" style.
    fn display_name(&self) -> String {
        if let Some(code) = self.code.as_deref().map(str::trim).filter(|code| !code.is_empty()) {
            return code.to_string();
        }
        match self.given_name.trim().chars().next() {
            Some(initial) => format!("{}. {}", initial, self.family_name.trim()),
            None if !self.family_name.trim().is_empty() => self.family_name.trim().to_string(),
            None => self.driver_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LegacyConstructor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct LegacyLap {
    #[serde(rename = "Timings", default)]
    timings: Vec<LegacyTiming>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTiming {
    driver_id: String,
    time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPitStop {
    driver_id: String,
    lap: String,
}
