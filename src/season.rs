//! Season runs: score many races and fold them into per-driver averages
//!
//! Testing events are excluded by name. Races are scored sequentially in input order,
//! so a season run is deterministic for a given input list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ingest::WeekendTableLoader;
use crate::pipeline::{DriveGradePipeline, RaceGrades};
use crate::{DriveGradeError, Result};

pub const RACE_RESULTS_FILE: &str = "race_results.csv";
pub const SEASON_SUMMARY_FILE: &str = "season_summary.csv";

/// On-disk shape of a race weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Single JSON weekend file
    Json,
    /// Directory of CSV tables
    Tables,
}

impl InputFormat {
    /// Directories hold tables; anything else is read as JSON.
    pub fn detect(path: &Path) -> Self {
        if path.is_dir() { InputFormat::Tables } else { InputFormat::Json }
    }
}

/// Whether a race name or slug refers to pre-season testing.
pub fn is_preseason_slug(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.contains("pre-season") || lowered.contains("pre_season")
}

/// One driver's breakdown in one race, flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceRow {
    pub race: String,
    pub driver: String,
    pub consistency: f64,
    pub team_strategy: f64,
    pub racecraft: f64,
    pub penalties: f64,
    pub on_track_overtakes: u32,
    pub pit_cycle_overtakes: u32,
    pub total_grade: f64,
}

/// A driver's season totals and per-race averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSeasonRow {
    pub driver: String,
    pub races: u32,
    pub total_grade: f64,
    pub average_grade: f64,
    pub average_consistency: f64,
    pub average_team_strategy: f64,
    pub average_racecraft: f64,
    pub average_penalties: f64,
    pub average_on_track_events: f64,
    pub average_pit_cycle_events: f64,
}

#[derive(Debug, Default)]
struct DriverTotals {
    races: u32,
    grade: f64,
    consistency: f64,
    team_strategy: f64,
    racecraft: f64,
    penalties: f64,
    on_track_events: f64,
    pit_cycle_events: f64,
}

/// Per-driver season rows, in first-seen order and then sorted by average grade
/// (highest first, ties keep first-seen order).
pub fn aggregate_season(races: &[(String, RaceGrades)]) -> Vec<DriverSeasonRow> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, DriverTotals> = HashMap::new();
    for (_, grades) in races {
        for grade in grades {
            let entry = totals.entry(grade.driver.clone()).or_insert_with(|| {
                order.push(grade.driver.clone());
                DriverTotals::default()
            });
            let breakdown = &grade.breakdown;
            entry.races += 1;
            entry.grade += breakdown.total_grade();
            entry.consistency += breakdown.consistency_score();
            entry.team_strategy += breakdown.team_strategy_score();
            entry.racecraft += breakdown.racecraft_score();
            entry.penalties += breakdown.penalty_score();
            entry.on_track_events += breakdown.on_track_events() as f64;
            entry.pit_cycle_events += breakdown.pit_cycle_events() as f64;
        }
    }

    let mut rows: Vec<DriverSeasonRow> = order
        .into_iter()
        .filter_map(|driver| {
            let totals = totals.remove(&driver)?;
            let races = totals.races.max(1) as f64;
            Some(DriverSeasonRow {
                races: totals.races,
                total_grade: totals.grade,
                average_grade: totals.grade / races,
                average_consistency: totals.consistency / races,
                average_team_strategy: totals.team_strategy / races,
                average_racecraft: totals.racecraft / races,
                average_penalties: totals.penalties / races,
                average_on_track_events: totals.on_track_events / races,
                average_pit_cycle_events: totals.pit_cycle_events / races,
                driver,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.average_grade.total_cmp(&a.average_grade));
    rows
}

/// Scored races of a season and their aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonResults {
    races: Vec<(String, RaceGrades)>,
    season_rows: Vec<DriverSeasonRow>,
}

impl SeasonResults {
    pub fn new(races: Vec<(String, RaceGrades)>) -> Self {
        let season_rows = aggregate_season(&races);
        Self { races, season_rows }
    }

    pub fn races(&self) -> &[(String, RaceGrades)] {
        &self.races
    }

    pub fn race(&self, name: &str) -> Option<&RaceGrades> {
        self.races.iter().find(|(race, _)| race == name).map(|(_, grades)| grades)
    }

    pub fn summary_rows(&self) -> &[DriverSeasonRow] {
        &self.season_rows
    }

    pub fn driver(&self, driver: &str) -> Option<&DriverSeasonRow> {
        self.season_rows.iter().find(|row| row.driver == driver)
    }

    /// Every driver breakdown of every race, in race then driver order.
    pub fn race_rows(&self) -> Vec<RaceRow> {
        self.races
            .iter()
            .flat_map(|(race, grades)| {
                grades.iter().map(move |grade| {
                    let breakdown = &grade.breakdown;
                    RaceRow {
                        race: race.clone(),
                        driver: grade.driver.clone(),
                        consistency: breakdown.consistency_score(),
                        team_strategy: breakdown.team_strategy_score(),
                        racecraft: breakdown.racecraft_score(),
                        penalties: breakdown.penalty_score(),
                        on_track_overtakes: breakdown.on_track_events(),
                        pit_cycle_overtakes: breakdown.pit_cycle_events(),
                        total_grade: breakdown.total_grade(),
                    }
                })
            })
            .collect()
    }

    /// Write `race_results.csv` and `season_summary.csv` into `directory`.
    ///
    /// Tables without rows are not written. Returns the paths written.
    pub fn save_outputs(&self, directory: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory).map_err(|e| DriveGradeError::file_error(directory, e))?;

        let mut written = Vec::new();
        let race_rows = self.race_rows();
        if !race_rows.is_empty() {
            let path = directory.join(RACE_RESULTS_FILE);
            write_csv(&path, &race_rows)?;
            written.push(path);
        }
        if !self.season_rows.is_empty() {
            let path = directory.join(SEASON_SUMMARY_FILE);
            write_csv(&path, &self.season_rows)?;
            written.push(path);
        }
        debug!(directory = %directory.display(), files = written.len(), "Saved season outputs");
        Ok(written)
    }

    /// Races and summary as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DriveGradeError::parse("season results", e))
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| DriveGradeError::file_error(path, e))
}

fn csv_error(path: &Path, error: csv::Error) -> DriveGradeError {
    DriveGradeError::parse(format!("writing {}", path.display()), error)
}

/// Scores races with one pipeline and aggregates them.
#[derive(Debug, Clone)]
pub struct SeasonRunner {
    pipeline: DriveGradePipeline,
}

impl SeasonRunner {
    pub fn new(pipeline: DriveGradePipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &DriveGradePipeline {
        &self.pipeline
    }

    /// Score one race from a JSON file or a table directory.
    ///
    /// When `format` is `None` it is detected from the path.
    pub fn run_race(&self, path: impl AsRef<Path>, format: Option<InputFormat>) -> Result<RaceGrades> {
        let path = path.as_ref();
        match format.unwrap_or_else(|| InputFormat::detect(path)) {
            InputFormat::Tables => {
                let inputs = WeekendTableLoader::new(path)?.build_driver_inputs()?;
                Ok(self.pipeline.score_inputs(&inputs))
            }
            InputFormat::Json => self.pipeline.run_from_json(path),
        }
    }

    /// Score every non-testing race in order and aggregate the results.
    ///
    /// Returns an aggregation error when nothing was left to score.
    pub fn run_season<I, S, P>(&self, races: I) -> Result<SeasonResults>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: AsRef<Path>,
    {
        let mut scored = Vec::new();
        for (name, path) in races {
            let name = name.into();
            let path = path.as_ref();
            if is_preseason_slug(&name) || path_stem(path).is_some_and(is_preseason_slug) {
                debug!(race = %name, "Skipping pre-season testing");
                continue;
            }
            let grades = self.run_race(path, None)?;
            info!(race = %name, drivers = grades.len(), "Scored race");
            scored.push((name, grades));
        }

        if scored.is_empty() {
            return Err(DriveGradeError::aggregation("no championship races to aggregate"));
        }
        Ok(SeasonResults::new(scored))
    }
}

/// Directory name for directories, file stem for files.
fn path_stem(path: &Path) -> Option<&str> {
    let stem = if path.is_dir() { path.file_name() } else { path.file_stem() };
    stem.and_then(|stem| stem.to_str())
}
