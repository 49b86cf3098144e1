//! Conversion of driver inputs into weekend tables

use std::path::Path;
use tracing::debug;

use super::columnar;
use super::tables::{
    DRIVER_BASELINE, OVERTAKES, PENALTIES, STRATEGY, TELEMETRY, Table, TableFormat, WeekendTables,
};
use crate::types::DriverRaceInput;
use crate::{DriveGradeError, Result};

const OVERTAKE_COLUMNS: [&str; 15] = [
    "driver",
    "lap_number",
    "opponent_driver",
    "opponent_team",
    "event_type",
    "event_source",
    "success",
    "exposure_time",
    "penalized",
    "delta_cpi",
    "tire_delta",
    "tire_compound_diff",
    "ers_delta",
    "track_difficulty",
    "race_phase_pressure",
];

/// Flatten driver inputs into the five weekend tables read by
/// [`WeekendTableLoader`](super::WeekendTableLoader).
///
/// Laps are numbered from 1 in input order.
pub fn build_tables(drivers: &[DriverRaceInput]) -> WeekendTables {
    let mut driver_baseline = Table::new(
        DRIVER_BASELINE,
        &[
            "driver",
            "team",
            "base_delta",
            "track_adjustment",
            "form_consistency",
            "form_error_rate",
            "form_start_precision",
        ],
    );
    let mut telemetry = Table::new(TELEMETRY, &["driver", "lap_number", "lap_delta"]);
    let mut strategy =
        Table::new(STRATEGY, &["driver", "optimal_pits", "actual_pits", "degradation_penalty"]);
    let mut penalties = Table::new(PENALTIES, &["driver", "type", "time_loss"]);
    let mut overtakes = Table::new(OVERTAKES, &OVERTAKE_COLUMNS);

    for input in drivers {
        let driver = input.driver.as_str();
        driver_baseline.push_row([
            driver.to_string(),
            input.team.clone(),
            input.car_pace.base_delta.to_string(),
            input.car_pace.track_adjustment.to_string(),
            input.form.consistency.to_string(),
            input.form.error_rate.to_string(),
            input.form.start_precision.to_string(),
        ]);

        for (index, delta) in input.lap_deltas.iter().enumerate() {
            telemetry.push_row([driver.to_string(), (index + 1).to_string(), delta.to_string()]);
        }

        strategy.push_row([
            driver.to_string(),
            join_laps(input.strategy.optimal_pit_laps()),
            join_laps(input.strategy.actual_pit_laps()),
            input.strategy.degradation_penalty().to_string(),
        ]);

        for penalty in &input.penalties {
            penalties.push_row([driver.to_string(), penalty.kind.clone(), penalty.time_loss.to_string()]);
        }

        for event in &input.overtakes {
            let ctx = &event.context;
            overtakes.push_row([
                driver.to_string(),
                event.lap_number.map(|lap| lap.to_string()).unwrap_or_default(),
                event.opponent.clone().unwrap_or_default(),
                event.opponent_team.clone().unwrap_or_default(),
                event.event_type.to_string(),
                event.event_source.clone(),
                event.success.to_string(),
                event.exposure_time.to_string(),
                event.penalized.to_string(),
                ctx.delta_cpi.to_string(),
                ctx.tire_delta.to_string(),
                ctx.tire_compound_diff.to_string(),
                ctx.ers_delta.to_string(),
                ctx.track_difficulty.to_string(),
                ctx.race_phase_pressure.to_string(),
            ]);
        }
    }

    WeekendTables { driver_baseline, telemetry, strategy, penalties, overtakes }
}

/// Write every table as `<dir>/<table>.<ext>`, creating the directory if needed.
pub fn write_tables(
    tables: &WeekendTables,
    directory: impl AsRef<Path>,
    format: TableFormat,
) -> Result<()> {
    let directory = directory.as_ref();
    std::fs::create_dir_all(directory).map_err(|e| DriveGradeError::file_error(directory, e))?;

    for table in tables.iter() {
        let path = format.path(directory, table.name());
        match format {
            TableFormat::Parquet => columnar::write_table(table, &path)?,
            TableFormat::Csv => write_csv(table, &path)?,
        }
        debug!(table = table.name(), rows = table.len(), path = %path.display(), "Wrote table");
    }
    Ok(())
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let context = || format!("writing {}", path.display());
    let mut writer = csv::Writer::from_path(path).map_err(|e| DriveGradeError::parse(context(), e))?;
    writer.write_record(table.headers()).map_err(|e| DriveGradeError::parse(context(), e))?;
    for record in table.records() {
        writer.write_record(record).map_err(|e| DriveGradeError::parse(context(), e))?;
    }
    writer.flush().map_err(|e| DriveGradeError::file_error(path, e))
}

fn join_laps(laps: &[u32]) -> String {
    laps.iter().map(u32::to_string).collect::<Vec<_>>().join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::WeekendTableLoader;
    use crate::test_utils::sample_input;
    use crate::types::{EventType, OvertakeContext, OvertakeEvent, PenaltyEvent, StrategyPlan};

    fn two_drivers() -> Vec<DriverRaceInput> {
        let mut first = sample_input("OCO", "Haas", 0.35);
        first.strategy = StrategyPlan::new("OCO", vec![14, 38], vec![16, 37], 0.05).unwrap();
        first.penalties = vec![PenaltyEvent::new("five_second", 5.0)];
        let mut pass = OvertakeEvent::new(OvertakeContext::default(), true, 2.5);
        pass.lap_number = Some(9);
        pass.opponent = Some("BEA".to_string());
        first.overtakes = vec![
            pass,
            OvertakeEvent::new(OvertakeContext::default(), false, 1.0)
                .with_event_type(EventType::PitCycle),
        ];
        let second = sample_input("BEA", "Haas", 0.45);
        vec![first, second]
    }

    fn reload(directory: &Path) -> Vec<DriverRaceInput> {
        WeekendTableLoader::new(directory).unwrap().build_driver_inputs().unwrap()
    }

    #[test]
    fn exported_tables_reload_identically() {
        let inputs = two_drivers();
        for format in TableFormat::PREFERENCE {
            let dir = tempfile::tempdir().unwrap();
            write_tables(&build_tables(&inputs), dir.path(), format).unwrap();
            assert!(dir.path().join(format!("overtakes.{}", format.extension())).is_file());
            assert_eq!(reload(dir.path()), inputs, "{:?}", format);
        }
    }

    #[test]
    fn parquet_is_preferred_over_csv() {
        let inputs = two_drivers();
        let dir = tempfile::tempdir().unwrap();
        write_tables(&build_tables(&inputs[..1]), dir.path(), TableFormat::Csv).unwrap();
        write_tables(&build_tables(&inputs), dir.path(), TableFormat::Parquet).unwrap();
        assert_eq!(reload(dir.path()), inputs);

        // a table present only as CSV is still found
        std::fs::remove_file(dir.path().join("penalties.parquet")).unwrap();
        let mixed = reload(dir.path());
        assert_eq!(mixed[0].penalties, inputs[0].penalties);
    }

    #[test]
    fn empty_parquet_weekend_reloads_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(&build_tables(&[]), dir.path(), TableFormat::Parquet).unwrap();
        assert!(reload(dir.path()).is_empty());
    }

    #[test]
    fn empty_weekend_writes_headers_only() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(&build_tables(&[]), dir.path(), TableFormat::Csv).unwrap();
        let text = std::fs::read_to_string(dir.path().join("penalties.csv")).unwrap();
        assert_eq!(text.trim(), "driver,type,time_loss");
    }
}
