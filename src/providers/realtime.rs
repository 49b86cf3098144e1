//! Provider for the real-time timing REST API (OpenF1-compatible)
//!
//! The real-time API publishes loosely typed rows whose field names drift between
//! endpoints and seasons, so rows are read as [`serde_json::Value`] and searched for
//! each of the known aliases.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::http::{HttpTransport, JsonTransport, join_url};
use super::metrics::{even_spacing_strategy, mean, race_phase, realtime_form, round4};
use super::track::{lap_time_to_seconds, slugify_race, track_difficulty};
use crate::config::Settings;
use crate::provider::{LapDataProvider, LapRecord, ProviderInfo, RaceDataProvider};
use crate::schema::{DriverEntry, OvertakeEntry, RaceDescriptor, WeekendDescriptor};
use crate::types::{EventType, OvertakeContext, PenaltyEvent, anchor_car_pace_to_team, median};
use crate::{DriveGradeError, Result};

pub const REALTIME_PROVIDER: &str = "realtime";

/// Exposure assumed for API overtakes without a duration.
const DEFAULT_EXPOSURE_TIME: f64 = 2.0;

#[derive(Debug, Clone)]
struct SessionMeta {
    race: RaceDescriptor,
    session_key: Option<i64>,
    total_laps: Option<u32>,
    location: String,
}

pub struct RealtimeApiProvider {
    base_url: String,
    session_name: String,
    transport: Arc<dyn JsonTransport>,
    sessions: Mutex<HashMap<(i32, u32), SessionMeta>>,
}

impl RealtimeApiProvider {
    pub fn new(
        base_url: impl Into<String>,
        session_name: impl Into<String>,
        transport: Arc<dyn JsonTransport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            session_name: session_name.into(),
            transport,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let transport = HttpTransport::new(REALTIME_PROVIDER, settings.http_timeout())?;
        Ok(Self::new(
            settings.realtime_base_url.clone(),
            settings.realtime_session_name.clone(),
            Arc::new(transport),
        ))
    }

    async fn rows(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let url = join_url(&self.base_url, endpoint);
        let payload = self.transport.get_json(&url, query).await?;
        Ok(rows_from(payload))
    }

    async fn session_meta(&self, season: i32, round: u32) -> Result<SessionMeta> {
        let cached = self.sessions.lock().get(&(season, round)).cloned();
        if let Some(meta) = cached {
            return Ok(meta);
        }
        self.fetch_schedule(season).await?;
        self.sessions.lock().get(&(season, round)).cloned().ok_or_else(|| {
            DriveGradeError::EmptyResult {
                provider: REALTIME_PROVIDER.to_string(),
                operation: format!("session metadata for {season} round {round}"),
            }
        })
    }

    async fn session_key(&self, season: i32, round: u32) -> Result<(SessionMeta, i64)> {
        let meta = self.session_meta(season, round).await?;
        let key = meta.session_key.ok_or_else(|| {
            DriveGradeError::provider_failed(
                REALTIME_PROVIDER,
                format!("session key missing for {season} round {round}"),
            )
        })?;
        Ok((meta, key))
    }
}

impl ProviderInfo for RealtimeApiProvider {
    fn name(&self) -> &str {
        REALTIME_PROVIDER
    }

    fn is_available(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

#[async_trait::async_trait]
impl RaceDataProvider for RealtimeApiProvider {
    async fn fetch_schedule(&self, season: i32) -> Result<Vec<RaceDescriptor>> {
        let query = [("year", season.to_string()), ("session_name", self.session_name.clone())];
        let mut rows = self.rows("sessions", &query).await?;
        rows.sort_by(|a, b| text(a, &["date_start"]).cmp(&text(b, &["date_start"])));

        let metas: Vec<SessionMeta> = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let round = match integer(row, &["round", "meeting_round"]) {
                    Some(round) => u32::try_from(round).ok()?,
                    None => u32::try_from(index + 1).ok()?,
                };
                if round == 0 {
                    return None;
                }
                let location = text(row, &["location"]).unwrap_or_default();
                let race_name = text(row, &["meeting_name", "event_name"])
                    .or_else(|| text(row, &["country_name"]).map(|country| format!("{country} Grand Prix")))
                    .or_else(|| text(row, &["session_name"]))
                    .unwrap_or_else(|| format!("Round {round}"));
                Some(SessionMeta {
                    race: RaceDescriptor {
                        season,
                        round,
                        slug: slugify_race(&race_name),
                        race_name,
                        circuit: text(row, &["circuit_full_name", "circuit_short_name"])
                            .unwrap_or_else(|| location.clone()),
                    },
                    session_key: integer(row, &["session_key"]),
                    total_laps: unsigned(row, &["laps", "total_laps"]),
                    location,
                })
            })
            .collect();

        let mut schedule: Vec<RaceDescriptor> = metas.iter().map(|meta| meta.race.clone()).collect();
        schedule.sort_by_key(|race| race.round);
        {
            let mut cache = self.sessions.lock();
            for meta in metas {
                cache.insert((season, meta.race.round), meta);
            }
        }
        debug!(season, races = schedule.len(), "Loaded real-time schedule");
        Ok(schedule)
    }

    async fn fetch_weekend(&self, season: i32, round: u32) -> Result<WeekendDescriptor> {
        let (meta, session_key) = self.session_key(season, round).await?;
        let by_session = [("session_key", session_key.to_string())];

        let results = self.rows("session_result", &by_session).await?;
        if results.is_empty() {
            return Err(DriveGradeError::EmptyResult {
                provider: REALTIME_PROVIDER.to_string(),
                operation: format!("results for {season} round {round}"),
            });
        }
        let laps = self.rows("laps", &by_session).await?;
        let pit_stops = self.rows("pit", &by_session).await?;
        let overtakes = match self.rows("overtakes", &by_session).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(season, round, error = %e, "Overtakes unavailable, continuing without them");
                Vec::new()
            }
        };

        let weekend = build_weekend(&meta, &results, &laps, &pit_stops, &overtakes);
        info!(season, round, drivers = weekend.drivers.len(), "Built real-time weekend");
        Ok(weekend)
    }
}

#[async_trait::async_trait]
impl LapDataProvider for RealtimeApiProvider {
    async fn load_laps(&self, season: i32, round: u32, session_type: &str) -> Result<Vec<LapRecord>> {
        let (_, session_key) = self.session_key(season, round).await?;
        let by_session = [("session_key", session_key.to_string())];
        let rows = self.rows("laps", &by_session).await?;
        let numbers = HashMap::new();
        let laps: Vec<LapRecord> = rows
            .iter()
            .filter_map(|row| {
                let lap_number = unsigned(row, &["lap_number", "lap"])?;
                Some(LapRecord {
                    driver: driver_code(row, &numbers)?,
                    driver_number: unsigned(row, &["driver_number"]),
                    lap_number,
                    lap_time: lap_seconds(row),
                    position: unsigned(row, &["position"]),
                    compound: text(row, &["compound"]),
                    stint: unsigned(row, &["stint", "stint_number"]),
                    pit_in: boolean(row, &["is_pit_in_lap", "pit_in"]),
                    pit_out: boolean(row, &["is_pit_out_lap", "pit_out"]),
                })
            })
            .collect();
        debug!(season, round, session_type, laps = laps.len(), "Loaded real-time laps");
        Ok(laps)
    }
}

fn build_weekend(
    meta: &SessionMeta,
    results: &[Value],
    laps: &[Value],
    pit_stops: &[Value],
    overtakes: &[Value],
) -> WeekendDescriptor {
    let numbers: HashMap<i64, String> = results
        .iter()
        .filter_map(|row| Some((integer(row, &["driver_number"])?, driver_code(row, &HashMap::new())?)))
        .collect();

    let mut lap_times: HashMap<String, Vec<f64>> = HashMap::new();
    let mut max_lap_number = 0u32;
    for row in laps {
        if let Some(lap) = unsigned(row, &["lap_number", "lap"]) {
            max_lap_number = max_lap_number.max(lap);
        }
        let (Some(code), Some(seconds)) = (driver_code(row, &numbers), lap_seconds(row)) else {
            continue;
        };
        lap_times.entry(code).or_default().push(seconds);
    }
    let all_times: Vec<f64> = lap_times.values().flatten().copied().collect();
    let reference = median(&all_times).unwrap_or(0.0);

    let mut pit_laps: HashMap<String, Vec<u32>> = HashMap::new();
    for row in pit_stops {
        let (Some(code), Some(lap)) = (driver_code(row, &numbers), positive(row, &["lap_number", "lap"]))
        else {
            continue;
        };
        pit_laps.entry(code).or_default().push(lap);
    }

    let total_laps = meta
        .total_laps
        .filter(|laps| *laps > 0)
        .or_else(|| {
            results
                .iter()
                .filter_map(|row| unsigned(row, &["number_of_laps", "laps"]))
                .max()
                .filter(|laps| *laps > 0)
        })
        .unwrap_or(max_lap_number);

    let field_size = results.len();
    let mut drivers: Vec<DriverEntry> = results
        .iter()
        .filter_map(|row| {
            let code = driver_code(row, &numbers)?;
            let times = lap_times.get(&code).cloned().unwrap_or_default();
            let deltas: Vec<f64> = times.iter().map(|t| round4(t - reference)).collect();
            let base_delta = mean(&times).map(|avg| round4(avg - reference)).unwrap_or(0.0);
            let grid = positive(row, &["grid_position", "grid"]);
            let finish = positive(row, &["position", "finish_position"]);
            let mut stops = pit_laps.get(&code).cloned().unwrap_or_default();
            stops.sort_unstable();

            let team = text(row, &["team_name", "team"]).unwrap_or_else(|| "Unknown".to_string());
            let mut entry = DriverEntry::new(code, team, base_delta);
            entry.driver_number = unsigned(row, &["driver_number"]);
            entry.grid_position = grid;
            entry.finish_position = finish;
            entry.classification_status = text(row, &["status", "classification_status"]);
            entry.form = realtime_form(&deltas, grid, finish, field_size);
            entry.lap_deltas = deltas;
            entry.strategy = even_spacing_strategy(&stops, total_laps);
            if let Some(seconds) = number(row, &["time_penalty", "penalties"]).filter(|s| *s > 0.0) {
                entry.penalties.push(PenaltyEvent::new("official", seconds));
            }
            Some(entry)
        })
        .collect();
    anchor_car_pace_to_team(&mut drivers);

    inject_overtakes(&mut drivers, overtakes, meta, total_laps);
    WeekendDescriptor::new(meta.race.clone(), REALTIME_PROVIDER, drivers)
}

/// Attach API-reported overtakes to the attacking driver.
///
/// Events whose attacker or defender cannot be matched to a classified driver are dropped.
fn inject_overtakes(drivers: &mut [DriverEntry], overtakes: &[Value], meta: &SessionMeta, total_laps: u32) {
    let find = |drivers: &[DriverEntry], value: &Value| -> Option<usize> {
        let code = value_text(value)?.to_uppercase();
        let number = value_integer(value);
        drivers.iter().position(|entry| {
            entry.driver.to_uppercase() == code
                || (number.is_some() && entry.driver_number.map(i64::from) == number)
        })
    };

    for row in overtakes {
        let field_of = |keys: &[&str]| field(row, keys).and_then(|value| find(&*drivers, value));
        let attacker = field_of(&["overtaking_driver_number", "overtaking_driver", "attacker"]);
        let defender = field_of(&["overtaken_driver_number", "overtaken_driver", "defender"]);
        let (Some(attacker), Some(defender)) = (attacker, defender) else {
            continue;
        };
        if attacker == defender {
            continue;
        }

        let location = text(row, &["location"]).unwrap_or_else(|| meta.location.clone());
        let lap_number = positive(row, &["lap_number", "lap"]);
        let context = OvertakeContext {
            delta_cpi: drivers[attacker].car_pace.base_delta - drivers[defender].car_pace.base_delta,
            tire_delta: 0.0,
            tire_compound_diff: 0,
            ers_delta: 0.0,
            track_difficulty: track_difficulty(&slugify_race(&location)),
            race_phase_pressure: race_phase(lap_number, total_laps),
        };
        let exposure = number(row, &["duration", "elapsed_time"])
            .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
            .unwrap_or(DEFAULT_EXPOSURE_TIME);

        let mut event = OvertakeEntry::new(context, true, exposure);
        event.lap_number = lap_number;
        event.opponent_driver = Some(drivers[defender].driver.clone());
        event.opponent_team = Some(drivers[defender].team.clone());
        event.event_type = EventType::OnTrack.as_str().to_string();
        event.event_source = REALTIME_PROVIDER.to_string();
        drivers[attacker].overtakes.push(event);
    }
}

/// Rows of a response: a bare array, or an object wrapping `data` or `results`.
fn rows_from(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(rows) => rows,
        Value::Object(mut object) => match object.remove("data").or_else(|| object.remove("results")) {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// First present, non-null, non-blank field among `keys`.
fn field<'a>(row: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| row.get(*key)).find(|value| match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    })
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn value_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|f| f as i64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn text(row: &Value, keys: &[&str]) -> Option<String> {
    field(row, keys).and_then(value_text)
}

fn integer(row: &Value, keys: &[&str]) -> Option<i64> {
    field(row, keys).and_then(value_integer)
}

/// Integer field that fits a `u32`; negative or oversized values count as absent.
fn unsigned(row: &Value, keys: &[&str]) -> Option<u32> {
    integer(row, keys).and_then(|value| u32::try_from(value).ok())
}

fn positive(row: &Value, keys: &[&str]) -> Option<u32> {
    unsigned(row, keys).filter(|value| *value > 0)
}

fn number(row: &Value, keys: &[&str]) -> Option<f64> {
    match field(row, keys)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn boolean(row: &Value, keys: &[&str]) -> bool {
    matches!(field(row, keys), Some(Value::Bool(true)))
}

/// Lap time in seconds from any of the known fields; non-positive times are dropped.
fn lap_seconds(row: &Value) -> Option<f64> {
    let seconds = match field(row, &["lap_time", "lap_duration", "duration"])? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => lap_time_to_seconds(text),
        _ => None,
    }?;
    (seconds > 0.0).then_some(seconds)
}

/// Driver code of a row: explicit code fields first, then the car number lookup.
fn driver_code(row: &Value, numbers: &HashMap<i64, String>) -> Option<String> {
    if let Some(code) = text(row, &["driver_code", "driver_id", "driver", "name_acronym"]) {
        return Some(code.to_uppercase());
    }
    let number = integer(row, &["driver_number"])?;
    Some(numbers.get(&number).cloned().unwrap_or_else(|| number.to_string()))
}
