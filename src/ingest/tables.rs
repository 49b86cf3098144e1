//! Tabular weekend directories
//!
//! A weekend directory holds five tables, one Parquet or CSV file each. When both
//! `<table>.parquet` and `<table>.csv` exist the Parquet file wins.
//!
//! | table | one row per |
//! |---|---|
//! | `driver_baseline` | driver (defines driver order) |
//! | `telemetry` | lap |
//! | `strategy` | driver, pit laps joined with `|` |
//! | `penalties` | penalty |
//! | `overtakes` | overtake attempt |

use csv::StringRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::columnar;
use super::validate::{ensure_unique_drivers, validate_input};
use crate::types::{
    CarPaceIndex, DriverFormModifier, DriverRaceInput, EventType, OvertakeContext, OvertakeEvent,
    PenaltyEvent, StrategyPlan,
};
use crate::{DriveGradeError, Result};

pub const DRIVER_BASELINE: &str = "driver_baseline";
pub const TELEMETRY: &str = "telemetry";
pub const STRATEGY: &str = "strategy";
pub const PENALTIES: &str = "penalties";
pub const OVERTAKES: &str = "overtakes";

/// Table stems in load order.
pub const TABLE_NAMES: [&str; 5] = [DRIVER_BASELINE, TELEMETRY, STRATEGY, PENALTIES, OVERTAKES];

/// On-disk encoding of a weekend table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TableFormat {
    /// Columnar Parquet file
    #[default]
    Parquet,
    /// Comma-separated text with a header row
    Csv,
}

impl TableFormat {
    /// Formats in lookup order when loading a directory.
    pub const PREFERENCE: [TableFormat; 2] = [TableFormat::Parquet, TableFormat::Csv];

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Parquet => "parquet",
            TableFormat::Csv => "csv",
        }
    }

    /// `<directory>/<stem>.<extension>`
    pub fn path(self, directory: &Path, stem: &str) -> PathBuf {
        directory.join(format!("{}.{}", stem, self.extension()))
    }
}

/// Columns every table must carry. Extra columns are ignored.
pub fn required_columns(table: &str) -> &'static [&'static str] {
    match table {
        DRIVER_BASELINE => &[
            "driver",
            "team",
            "base_delta",
            "track_adjustment",
            "form_consistency",
            "form_error_rate",
            "form_start_precision",
        ],
        TELEMETRY => &["driver", "lap_number", "lap_delta"],
        STRATEGY => &["driver", "optimal_pits", "actual_pits", "degradation_penalty"],
        PENALTIES => &["driver", "type", "time_loss"],
        OVERTAKES => &[
            "driver",
            "success",
            "exposure_time",
            "penalized",
            "delta_cpi",
            "tire_delta",
            "tire_compound_diff",
            "ers_delta",
            "track_difficulty",
            "race_phase_pressure",
        ],
        _ => &[],
    }
}

/// A table held as raw string records, whatever format it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: Vec::new(),
        }
    }

    pub(crate) fn with_headers(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self { name: name.into(), headers, records: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push_row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field.as_ref());
        }
        self.records.push(record);
    }

    fn read_csv(name: &str, path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_error(name, path, e))?;
        let headers = reader
            .headers()
            .map_err(|e| csv_error(name, path, e))?
            .iter()
            .map(str::to_string)
            .collect();
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| csv_error(name, path, e))?;
        Ok(Self { name: name.to_string(), headers, records })
    }

    fn validate_columns(&self) -> Result<()> {
        let mut missing: Vec<String> = required_columns(&self.name)
            .iter()
            .filter(|column| !self.headers.iter().any(|h| h == *column))
            .map(|column| column.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(DriveGradeError::TableValidation { table: self.name.clone(), missing })
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records
            .iter()
            .enumerate()
            .map(move |(index, record)| Row { table: self, number: index + 1, record })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }
}

fn csv_error(table: &str, path: &Path, error: csv::Error) -> DriveGradeError {
    if error.is_io_error() {
        if let csv::ErrorKind::Io(io) = error.into_kind() {
            return DriveGradeError::file_error(path, io);
        }
        return DriveGradeError::parse(format!("{} table", table), "unreadable file");
    }
    DriveGradeError::parse(format!("{} table {}", table, path.display()), error)
}

/// One data row with column lookup by name.
struct Row<'a> {
    table: &'a Table,
    /// 1-based data row number (header excluded)
    number: usize,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn text(&self, column: &str) -> &'a str {
        self.table.column(column).and_then(|i| self.record.get(i)).unwrap_or("")
    }

    fn optional_text(&self, column: &str) -> Option<String> {
        let value = self.text(column);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn invalid(&self, column: &str, expected: &str) -> DriveGradeError {
        DriveGradeError::validation(
            format!("{} row {}", self.table.name, self.number),
            format!("column '{}' expected {}, got '{}'", column, expected, self.text(column)),
        )
    }

    fn number(&self, column: &str) -> Result<f64> {
        self.text(column).parse::<f64>().map_err(|_| self.invalid(column, "a number"))
    }

    fn number_or_zero(&self, column: &str) -> Result<f64> {
        if self.text(column).is_empty() { Ok(0.0) } else { self.number(column) }
    }

    /// Integers written either plainly or as whole floats (`12.0`).
    fn integer(&self, column: &str) -> Result<i64> {
        let text = self.text(column);
        if let Ok(value) = text.parse::<i64>() {
            return Ok(value);
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(value as i64),
            _ => Err(self.invalid(column, "an integer")),
        }
    }

    fn optional_lap(&self, column: &str) -> Result<Option<u32>> {
        if self.text(column).is_empty() {
            return Ok(None);
        }
        let value = self.integer(column)?;
        u32::try_from(value).map(Some).map_err(|_| self.invalid(column, "a lap number"))
    }

    fn boolean(&self, column: &str) -> bool {
        parse_bool(self.text(column))
    }
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

/// Split a `|`-joined pit lap list, skipping blanks.
pub(crate) fn parse_pit_list(value: &str, field: &str, driver: &str) -> Result<Vec<u32>> {
    value
        .split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>().map_err(|_| {
                DriveGradeError::validation(
                    "strategy table",
                    format!("Could not parse integer in {} for driver '{}': {}", field, driver, part),
                )
            })
        })
        .collect()
}

/// The five tables of one weekend.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekendTables {
    pub driver_baseline: Table,
    pub telemetry: Table,
    pub strategy: Table,
    pub penalties: Table,
    pub overtakes: Table,
}

impl WeekendTables {
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        [&self.driver_baseline, &self.telemetry, &self.strategy, &self.penalties, &self.overtakes]
            .into_iter()
    }

    /// Validate and convert the tables into pipeline inputs in `driver_baseline` order.
    pub fn to_driver_inputs(&self) -> Result<Vec<DriverRaceInput>> {
        for table in self.iter() {
            table.validate_columns()?;
        }

        let mut laps: HashMap<String, Vec<(f64, f64)>> = HashMap::new();
        for row in self.telemetry.rows() {
            let lap = row.number("lap_number")?;
            let delta = row.number("lap_delta")?;
            laps.entry(row.text("driver").to_string()).or_default().push((lap, delta));
        }

        let mut strategies: HashMap<String, StrategyPlan> = HashMap::new();
        for row in self.strategy.rows() {
            let driver = row.text("driver");
            let optimal = parse_pit_list(row.text("optimal_pits"), "optimal_pits", driver)?;
            let actual = parse_pit_list(row.text("actual_pits"), "actual_pits", driver)?;
            let degradation = row.number_or_zero("degradation_penalty")?;
            strategies
                .insert(driver.to_string(), StrategyPlan::new(driver, optimal, actual, degradation)?);
        }

        let mut penalties: HashMap<String, Vec<PenaltyEvent>> = HashMap::new();
        for row in self.penalties.rows() {
            let event = PenaltyEvent::new(row.text("type"), row.number("time_loss")?);
            penalties.entry(row.text("driver").to_string()).or_default().push(event);
        }

        let mut overtakes: HashMap<String, Vec<OvertakeEvent>> = HashMap::new();
        for row in self.overtakes.rows() {
            let event = overtake_from_row(&row)?;
            overtakes.entry(row.text("driver").to_string()).or_default().push(event);
        }

        let drivers: Vec<&str> = self.driver_baseline.rows().map(|row| row.text("driver")).collect();
        ensure_unique_drivers("driver_baseline table", drivers)?;

        self.driver_baseline
            .rows()
            .map(|row| {
                let driver = row.text("driver").to_string();
                let team = row.text("team").to_string();
                let car_pace = CarPaceIndex::new(&driver, &team, row.number("base_delta")?)
                    .with_track_adjustment(row.number_or_zero("track_adjustment")?);
                let form = DriverFormModifier::new(
                    row.number("form_consistency")?,
                    row.number("form_error_rate")?,
                    row.number("form_start_precision")?,
                );

                let mut driver_laps = laps.remove(&driver).unwrap_or_default();
                driver_laps.sort_by(|a, b| a.0.total_cmp(&b.0));

                let input = DriverRaceInput {
                    team,
                    car_pace,
                    form,
                    lap_deltas: driver_laps.into_iter().map(|(_, delta)| delta).collect(),
                    strategy: strategies.remove(&driver).unwrap_or_default(),
                    penalties: penalties.remove(&driver).unwrap_or_default(),
                    overtakes: overtakes.remove(&driver).unwrap_or_default(),
                    driver,
                };
                validate_input(&input)?;
                Ok(input)
            })
            .collect()
    }
}

fn overtake_from_row(row: &Row<'_>) -> Result<OvertakeEvent> {
    let tire_compound_diff = i32::try_from(row.integer("tire_compound_diff")?)
        .map_err(|_| row.invalid("tire_compound_diff", "a small integer"))?;
    let context = OvertakeContext {
        delta_cpi: row.number("delta_cpi")?,
        tire_delta: row.number("tire_delta")?,
        tire_compound_diff,
        ers_delta: row.number("ers_delta")?,
        track_difficulty: row.number("track_difficulty")?,
        race_phase_pressure: row.number("race_phase_pressure")?,
    };
    let event_type: EventType = row.text("event_type").parse()?;

    let mut event = OvertakeEvent::new(context, row.boolean("success"), row.number("exposure_time")?)
        .penalized(row.boolean("penalized"))
        .with_event_type(event_type);
    event.lap_number = row.optional_lap("lap_number")?;
    event.opponent = row.optional_text("opponent_driver");
    event.opponent_team = row.optional_text("opponent_team");
    if let Some(source) = row.optional_text("event_source") {
        event.event_source = source;
    }
    Ok(event)
}

/// Loads a weekend directory of Parquet or CSV tables.
#[derive(Debug, Clone)]
pub struct WeekendTableLoader {
    directory: PathBuf,
}

impl WeekendTableLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        if !directory.is_dir() {
            let error = std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Directory not found: {}", directory.display()),
            );
            return Err(DriveGradeError::file_error(directory, error));
        }
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn load_tables(&self) -> Result<WeekendTables> {
        Ok(WeekendTables {
            driver_baseline: self.read_table(DRIVER_BASELINE)?,
            telemetry: self.read_table(TELEMETRY)?,
            strategy: self.read_table(STRATEGY)?,
            penalties: self.read_table(PENALTIES)?,
            overtakes: self.read_table(OVERTAKES)?,
        })
    }

    pub fn build_driver_inputs(&self) -> Result<Vec<DriverRaceInput>> {
        let inputs = self.load_tables()?.to_driver_inputs()?;
        debug!(directory = %self.directory.display(), drivers = inputs.len(), "Loaded weekend tables");
        Ok(inputs)
    }

    fn read_table(&self, stem: &str) -> Result<Table> {
        let found = TableFormat::PREFERENCE
            .into_iter()
            .map(|format| (format, format.path(&self.directory, stem)))
            .find(|(_, path)| path.is_file());
        let Some((format, path)) = found else {
            let error = std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Missing {0}.parquet or {0}.csv in {1}", stem, self.directory.display()),
            );
            return Err(DriveGradeError::file_error(TableFormat::Csv.path(&self.directory, stem), error));
        };
        let table = match format {
            TableFormat::Parquet => columnar::read_table(stem, &path)?,
            TableFormat::Csv => Table::read_csv(stem, &path)?,
        };
        debug!(table = stem, format = format.extension(), rows = table.len(), "Read table");
        table.validate_columns()?;
        Ok(table)
    }
}
