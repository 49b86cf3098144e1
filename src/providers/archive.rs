//! Provider over archived timing sessions with lap-level telemetry
//!
//! Archived sessions are the richest source: per-lap positions, tyre data, pit timing
//! and throttle traces. Overtakes are detected from the lap-by-lap classification and
//! strategy is compared against the field's median stop laps.
//!
//! Sessions are loaded through a [`SessionArchive`]. The directory-backed archive reads:
//!
//! ```text
//! {root}/{season}/schedule.json
//! {root}/{season}/round_{round:02}/{session}.json     e.g. round_08/race.json
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::metrics::{archive_form, clean_median, field_pit_targets, race_phase, reference_strategy};
use super::overtakes::detect_overtakes;
use super::track::{slugify_race, track_difficulty};
use crate::config::Settings;
use crate::provider::{LapDataProvider, LapRecord, ProviderInfo, RaceDataProvider};
use crate::schema::{DriverEntry, OvertakeEntry, RaceDescriptor, WeekendDescriptor};
use crate::timeout::run_with_timeout;
use crate::types::{OvertakeContext, PenaltyEvent, anchor_car_pace_to_team, median};
use crate::{DriveGradeError, Result};

pub const ARCHIVE_PROVIDER: &str = "archive";

/// Session loaded for race weekends.
pub const RACE_SESSION: &str = "Race";

/// Exposure assumed for detected overtakes.
const DETECTED_EXPOSURE_TIME: f64 = 2.0;

/// Laps slower than the driver's median by more than this count as mistakes.
const LAP_ERROR_THRESHOLD: f64 = 1.5;

/// One event of an archived season schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedEvent {
    pub round: u32,
    pub event_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub circuit: String,
}

/// Final classification row of an archived session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub abbreviation: String,
    #[serde(default)]
    pub driver_number: Option<u32>,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub grid_position: Option<u32>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub laps_completed: Option<u32>,
}

/// One timed lap of an archived session. Times are session seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLap {
    pub driver: String,
    #[serde(default)]
    pub driver_number: Option<u32>,
    pub lap_number: u32,
    #[serde(default)]
    pub lap_time: Option<f64>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub lap_start_time: Option<f64>,
    /// Session time at the end of the lap
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub pit_in_time: Option<f64>,
    #[serde(default)]
    pub pit_out_time: Option<f64>,
    #[serde(default)]
    pub tyre_life: Option<f64>,
    #[serde(default)]
    pub compound: Option<String>,
    #[serde(default)]
    pub stint: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrottleSample {
    pub session_time: f64,
    /// Throttle application, 0-100
    pub throttle: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivedSession {
    pub total_laps: Option<u32>,
    pub results: Vec<SessionResult>,
    pub laps: Vec<TimedLap>,
    /// Throttle traces keyed by driver abbreviation
    pub throttle: HashMap<String, Vec<ThrottleSample>>,
}

/// Blocking access to archived sessions.
pub trait SessionArchive: Send + Sync {
    fn is_available(&self) -> bool;
    fn events(&self, season: i32) -> Result<Vec<ArchivedEvent>>;
    fn load_session(&self, season: i32, round: u32, session_type: &str) -> Result<ArchivedSession>;
}

/// Archive stored as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySessionArchive {
    root: PathBuf,
}

impl DirectorySessionArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_path(&self, season: i32, round: u32, session_type: &str) -> PathBuf {
        self.root
            .join(season.to_string())
            .join(format!("round_{round:02}"))
            .join(format!("{}.json", session_file_stem(session_type)))
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let text = std::fs::read_to_string(path).map_err(|e| DriveGradeError::file_error(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| DriveGradeError::parse(format!("archived session {}", path.display()), e))
    }
}

impl SessionArchive for DirectorySessionArchive {
    fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn events(&self, season: i32) -> Result<Vec<ArchivedEvent>> {
        Self::read_json(&self.root.join(season.to_string()).join("schedule.json"))
    }

    fn load_session(&self, season: i32, round: u32, session_type: &str) -> Result<ArchivedSession> {
        Self::read_json(&self.session_path(season, round, session_type))
    }
}

/// File stem for a session type: `R`/`Race` -> `race`, `Q` -> `qualifying`, `S` -> `sprint`.
pub fn session_file_stem(session_type: &str) -> String {
    match session_type.trim().to_lowercase().as_str() {
        "r" | "race" => "race".to_string(),
        "q" | "qualifying" => "qualifying".to_string(),
        "s" | "sprint" => "sprint".to_string(),
        other => slugify_race(other),
    }
}

pub struct ArchiveTelemetryProvider {
    archive: Arc<dyn SessionArchive>,
    timeout: Duration,
}

impl ArchiveTelemetryProvider {
    pub fn new(archive: Arc<dyn SessionArchive>, timeout: Duration) -> Self {
        Self { archive, timeout }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let archive = DirectorySessionArchive::new(settings.session_archive_dir.clone());
        Self::new(Arc::new(archive), settings.session_timeout())
    }

    async fn events(&self, season: i32) -> Result<Vec<ArchivedEvent>> {
        let archive = Arc::clone(&self.archive);
        let description = format!("{ARCHIVE_PROVIDER} schedule {season}");
        run_with_timeout(&description, self.timeout, move |_| archive.events(season)).await
    }

    async fn session(&self, season: i32, round: u32, session_type: &str) -> Result<ArchivedSession> {
        let archive = Arc::clone(&self.archive);
        let session_type = session_type.to_string();
        let description = format!("{ARCHIVE_PROVIDER} session {season} round {round} {session_type}");
        run_with_timeout(&description, self.timeout, move |cancel| {
            if cancel.is_cancelled() {
                return Ok(ArchivedSession::default());
            }
            archive.load_session(season, round, &session_type)
        })
        .await
    }
}

impl ProviderInfo for ArchiveTelemetryProvider {
    fn name(&self) -> &str {
        ARCHIVE_PROVIDER
    }

    fn is_available(&self) -> bool {
        self.archive.is_available()
    }
}

#[async_trait::async_trait]
impl RaceDataProvider for ArchiveTelemetryProvider {
    async fn fetch_schedule(&self, season: i32) -> Result<Vec<RaceDescriptor>> {
        let mut schedule: Vec<RaceDescriptor> = self
            .events(season)
            .await?
            .into_iter()
            .filter(|event| event.round > 0)
            .map(|event| race_descriptor(season, event))
            .collect();
        schedule.sort_by_key(|race| race.round);
        Ok(schedule)
    }

    async fn fetch_weekend(&self, season: i32, round: u32) -> Result<WeekendDescriptor> {
        let event = self
            .events(season)
            .await?
            .into_iter()
            .find(|event| event.round == round)
            .ok_or_else(|| DriveGradeError::EmptyResult {
                provider: ARCHIVE_PROVIDER.to_string(),
                operation: format!("schedule entry for {season} round {round}"),
            })?;
        let session = self.session(season, round, RACE_SESSION).await?;
        let weekend = build_weekend(race_descriptor(season, event), &session);
        info!(season, round, drivers = weekend.drivers.len(), "Built archived weekend");
        Ok(weekend)
    }
}

#[async_trait::async_trait]
impl LapDataProvider for ArchiveTelemetryProvider {
    async fn load_laps(&self, season: i32, round: u32, session_type: &str) -> Result<Vec<LapRecord>> {
        let session = self.session(season, round, session_type).await?;
        let laps: Vec<LapRecord> = session
            .laps
            .into_iter()
            .map(|lap| LapRecord {
                driver: lap.driver,
                driver_number: lap.driver_number,
                lap_number: lap.lap_number,
                lap_time: lap.lap_time,
                position: lap.position,
                compound: lap.compound,
                stint: lap.stint,
                pit_in: lap.pit_in_time.is_some(),
                pit_out: lap.pit_out_time.is_some(),
            })
            .collect();
        debug!(season, round, session_type, laps = laps.len(), "Loaded archived laps");
        Ok(laps)
    }
}

fn race_descriptor(season: i32, event: ArchivedEvent) -> RaceDescriptor {
    let circuit = if event.circuit.is_empty() { event.location } else { event.circuit };
    RaceDescriptor {
        season,
        round: event.round,
        slug: slugify_race(&event.event_name),
        race_name: event.event_name,
        circuit,
    }
}

fn build_weekend(race: RaceDescriptor, session: &ArchivedSession) -> WeekendDescriptor {
    let mut laps_by_driver: HashMap<&str, Vec<&TimedLap>> = HashMap::new();
    for lap in &session.laps {
        laps_by_driver.entry(lap.driver.as_str()).or_default().push(lap);
    }

    let total_laps = session
        .results
        .iter()
        .filter_map(|result| result.laps_completed)
        .max()
        .filter(|laps| *laps > 0)
        .or(session.total_laps)
        .or_else(|| session.laps.iter().map(|lap| lap.lap_number).max())
        .unwrap_or(0);

    let mut pit_plans: Vec<Vec<u32>> = Vec::with_capacity(session.results.len());
    let mut drivers: Vec<DriverEntry> = session
        .results
        .iter()
        .map(|result| {
            let laps = laps_by_driver.get(result.abbreviation.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let times: Vec<f64> = laps.iter().filter_map(|lap| lap.lap_time).filter(|t| *t > 0.0).collect();
            let own_median = median(&times).unwrap_or(0.0);
            let deltas: Vec<f64> = times.iter().map(|t| t - own_median).collect();

            let mut stops: Vec<u32> =
                laps.iter().filter(|lap| lap.pit_in_time.is_some()).map(|lap| lap.lap_number).collect();
            stops.sort_unstable();
            stops.dedup();
            pit_plans.push(stops);

            let grid = result.grid_position.filter(|p| *p > 0);
            let finish = result.position.filter(|p| *p > 0);
            let team = if result.team_name.trim().is_empty() { "Unknown" } else { result.team_name.trim() };

            let mut entry =
                DriverEntry::new(&result.abbreviation, team, clean_median(&deltas).unwrap_or(0.0));
            entry.driver_number = result.driver_number;
            entry.grid_position = grid;
            entry.finish_position = finish;
            entry.classification_status = result.status.clone();
            entry.form = archive_form(&deltas, grid, finish);
            entry.penalties = deltas
                .iter()
                .filter(|delta| **delta > LAP_ERROR_THRESHOLD)
                .map(|delta| PenaltyEvent::new("lap_error", *delta))
                .collect();
            entry.lap_deltas = deltas;
            entry
        })
        .collect();

    let targets = field_pit_targets(&pit_plans);
    for (entry, stops) in drivers.iter_mut().zip(&pit_plans) {
        entry.strategy = reference_strategy(stops, &targets);
    }
    anchor_car_pace_to_team(&mut drivers);

    let difficulty = track_difficulty(&race.slug);
    for detected in detect_overtakes(&session.laps, &session.throttle) {
        let attacker = drivers.iter().position(|entry| entry.driver == detected.overtaking_driver);
        let defender = drivers.iter().position(|entry| entry.driver == detected.overtaken_driver);
        let (Some(attacker), Some(defender)) = (attacker, defender) else {
            continue;
        };
        let context = OvertakeContext {
            delta_cpi: drivers[attacker].car_pace.base_delta - drivers[defender].car_pace.base_delta,
            tire_delta: detected.tire_delta.unwrap_or(0.0),
            tire_compound_diff: detected.tire_compound_diff.unwrap_or(0),
            ers_delta: detected.ers_delta.unwrap_or(0.0),
            track_difficulty: difficulty,
            race_phase_pressure: race_phase(Some(detected.lap_number), total_laps),
        };
        let mut event = OvertakeEntry::new(context, true, DETECTED_EXPOSURE_TIME);
        event.lap_number = Some(detected.lap_number);
        event.opponent_driver = Some(drivers[defender].driver.clone());
        event.opponent_team = Some(drivers[defender].team.clone());
        event.event_type = detected.event_type.as_str().to_string();
        event.event_source = ARCHIVE_PROVIDER.to_string();
        drivers[attacker].overtakes.push(event);
    }

    WeekendDescriptor::new(race, ARCHIVE_PROVIDER, drivers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(driver: &str, lap_number: u32, position: u32, lap_time: f64) -> TimedLap {
        TimedLap {
            driver: driver.to_string(),
            driver_number: None,
            lap_number,
            lap_time: Some(lap_time),
            position: Some(position),
            lap_start_time: None,
            time: Some(lap_number as f64 * 90.0),
            pit_in_time: None,
            pit_out_time: None,
            tyre_life: None,
            compound: None,
            stint: None,
        }
    }

    fn result(abbreviation: &str, team: &str, grid: u32, position: u32) -> SessionResult {
        SessionResult {
            abbreviation: abbreviation.to_string(),
            driver_number: None,
            team_name: team.to_string(),
            grid_position: Some(grid),
            position: Some(position),
            status: Some("Finished".to_string()),
            laps_completed: Some(3),
        }
    }

    fn session() -> ArchivedSession {
        let mut laps = vec![
            timed("VER", 1, 1, 90.0),
            timed("NOR", 1, 2, 90.5),
            timed("VER", 2, 2, 93.0),
            timed("NOR", 2, 1, 90.4),
            timed("VER", 3, 2, 90.1),
            timed("NOR", 3, 1, 90.6),
        ];
        laps[2].pit_in_time = Some(178.0);
        ArchivedSession {
            total_laps: None,
            results: vec![result("NOR", "McLaren", 2, 1), result("VER", "Red Bull Racing", 1, 2)],
            laps,
            throttle: HashMap::new(),
        }
    }

    fn race() -> RaceDescriptor {
        race_descriptor(
            2024,
            ArchivedEvent {
                round: 6,
                event_name: "Miami Grand Prix".to_string(),
                location: "Miami".to_string(),
                circuit: String::new(),
            },
        )
    }

    #[test]
    fn weekend_derives_strategy_penalties_and_overtakes() {
        let weekend = build_weekend(race(), &session());
        assert_eq!(weekend.source, ARCHIVE_PROVIDER);
        assert_eq!(weekend.circuit, "Miami");

        let norris = &weekend.drivers[0];
        let verstappen = &weekend.drivers[1];
        assert_eq!(verstappen.strategy.actual_pit_laps, vec![2]);
        assert_eq!(verstappen.strategy.optimal_pit_laps, vec![2]);
        assert_eq!(norris.strategy.actual_pit_laps, Vec::<u32>::new());

        // VER lap 2 is 2.9 s off his own median
        assert_eq!(verstappen.penalties.len(), 1);
        assert_eq!(verstappen.penalties[0].kind, "lap_error");

        assert_eq!(norris.overtakes.len(), 1);
        let pass = &norris.overtakes[0];
        assert_eq!(pass.event_type, "pit_cycle");
        assert_eq!(pass.opponent_driver.as_deref(), Some("VER"));
        assert_eq!(pass.context.track_difficulty, 0.45);
        assert!((pass.context.race_phase_pressure - 2.0 / 3.0).abs() < 1e-9);

        // Two teams: anchored deltas are symmetric around zero
        let sum = norris.car_pace.base_delta + verstappen.car_pace.base_delta;
        assert!(sum.abs() < 1e-9);
    }

    #[test]
    fn session_stems() {
        assert_eq!(session_file_stem("R"), "race");
        assert_eq!(session_file_stem("Qualifying"), "qualifying");
        assert_eq!(session_file_stem("Sprint Shootout"), "sprint_shootout");
    }

    #[tokio::test]
    async fn directory_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DirectorySessionArchive::new(dir.path());
        let season_dir = dir.path().join("2024");
        std::fs::create_dir_all(season_dir.join("round_06")).unwrap();
        let events = vec![
            ArchivedEvent {
                round: 0,
                event_name: "Pre-Season Testing".to_string(),
                location: "Sakhir".to_string(),
                circuit: String::new(),
            },
            race_event(),
        ];
        std::fs::write(season_dir.join("schedule.json"), serde_json::to_string(&events).unwrap()).unwrap();
        std::fs::write(
            archive.session_path(2024, 6, "Race"),
            serde_json::to_string(&session()).unwrap(),
        )
        .unwrap();

        let provider = ArchiveTelemetryProvider::new(Arc::new(archive), Duration::from_secs(5));
        assert!(provider.is_available());

        let schedule = provider.fetch_schedule(2024).await.unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].slug, "miami_grand_prix");

        let weekend = provider.fetch_weekend(2024, 6).await.unwrap();
        assert_eq!(weekend.drivers.len(), 2);

        let laps = provider.load_laps(2024, 6, "R").await.unwrap();
        assert_eq!(laps.len(), 6);
        assert!(laps[2].pit_in);

        let missing = provider.fetch_weekend(2024, 9).await.unwrap_err();
        assert!(matches!(missing, DriveGradeError::EmptyResult { .. }));
    }

    #[test]
    fn missing_root_is_unavailable() {
        let archive = DirectorySessionArchive::new("/nonexistent/drivegrade/sessions");
        assert!(!archive.is_available());
    }

    fn race_event() -> ArchivedEvent {
        ArchivedEvent {
            round: 6,
            event_name: "Miami Grand Prix".to_string(),
            location: "Miami".to_string(),
            circuit: String::new(),
        }
    }
}
