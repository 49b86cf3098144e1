//! JSON weekend files and canonical descriptors

use std::path::Path;

use super::validate::{ensure_unique_drivers, validate_input};
use crate::schema::{DriverEntry, OvertakeEntry, WeekendDescriptor, WeekendFile};
use crate::types::{CarPaceIndex, DriverFormModifier, DriverRaceInput, OvertakeEvent, StrategyPlan};
use crate::{DriveGradeError, Result};

/// Parse a JSON weekend file into validated driver inputs, in file order.
pub fn load_weekend_file(path: impl AsRef<Path>) -> Result<Vec<DriverRaceInput>> {
    let path = path.as_ref();
    let text =
        std::fs::read_to_string(path).map_err(|e| DriveGradeError::file_error(path, e))?;
    let file: WeekendFile = serde_json::from_str(&text)
        .map_err(|e| DriveGradeError::parse(format!("weekend file {}", path.display()), e))?;
    ensure_unique_drivers(
        &format!("weekend file {}", path.display()),
        file.drivers.iter().map(|entry| entry.driver.as_str()),
    )?;
    file.drivers.iter().map(parse_driver_entry).collect()
}

/// Convert every driver of a provider-built weekend into pipeline inputs.
pub fn driver_inputs_from_descriptor(weekend: &WeekendDescriptor) -> Result<Vec<DriverRaceInput>> {
    ensure_unique_drivers(
        &format!("{} weekend", weekend.source),
        weekend.drivers.iter().map(|entry| entry.driver.as_str()),
    )?;
    weekend.drivers.iter().map(parse_driver_entry).collect()
}

/// Validate a raw driver entry and build its pipeline input.
pub fn parse_driver_entry(entry: &DriverEntry) -> Result<DriverRaceInput> {
    let car_pace = CarPaceIndex::new(&entry.driver, &entry.team, entry.car_pace.base_delta)
        .with_track_adjustment(entry.car_pace.track_adjustment);
    let form = DriverFormModifier::new(
        entry.form.consistency,
        entry.form.error_rate,
        entry.form.start_precision,
    );
    let strategy = StrategyPlan::new(
        &entry.driver,
        entry.strategy.optimal_pit_laps.clone(),
        entry.strategy.actual_pit_laps.clone(),
        entry.strategy.degradation_penalty,
    )?;
    let overtakes = entry.overtakes.iter().map(build_overtake).collect::<Result<Vec<_>>>()?;

    let input = DriverRaceInput {
        driver: entry.driver.clone(),
        team: entry.team.clone(),
        car_pace,
        form,
        lap_deltas: entry.lap_deltas.clone(),
        strategy,
        penalties: entry.penalties.clone(),
        overtakes,
    };
    validate_input(&input)?;
    Ok(input)
}

pub fn build_overtake(raw: &OvertakeEntry) -> Result<OvertakeEvent> {
    let mut event = OvertakeEvent::new(raw.context, raw.success, raw.exposure_time)
        .penalized(raw.penalized)
        .with_event_type(raw.event_type.parse()?);
    event.lap_number = raw.lap_number;
    event.opponent = raw.opponent_driver.clone().filter(|name| !name.is_empty());
    event.opponent_team = raw.opponent_team.clone().filter(|name| !name.is_empty());
    event.event_source = if raw.event_source.is_empty() {
        "unknown".to_string()
    } else {
        raw.event_source.clone()
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::types::EventType;

    fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("weekend.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    const ONE_DRIVER: &str = r#"{"drivers": [{
        "driver": "RUS", "team": "Mercedes",
        "car_pace": {"base_delta": -0.2, "track_adjustment": 0.05},
        "form": {"consistency": 0.6, "error_rate": 0.02, "start_precision": 0.7},
        "lap_deltas": [-0.1, -0.2, -0.15],
        "strategy": {"optimal_pit_laps": [18], "actual_pit_laps": [20], "degradation_penalty": 0.1},
        "penalties": [{"type": "track_limits", "time_loss": 5.0}],
        "overtakes": [
            {"success": true, "exposure_time": 3.0, "lap_number": 12, "opponent_driver": "ALB",
             "context": {"delta_cpi": -0.3, "tire_delta": 4, "tire_compound_diff": 1}},
            {"event_type": "pit_cycle", "event_source": "timing"}
        ]
    }]}"#;

    #[test]
    fn loads_full_entry() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = load_weekend_file(write(&dir, ONE_DRIVER)).unwrap();
        assert_eq!(inputs.len(), 1);

        let input = &inputs[0];
        assert_eq!(input.car_pace.expected_delta(), -0.2 + 0.05);
        assert_eq!(input.strategy.optimal_pit_laps(), &[18]);
        assert_eq!(input.penalties[0].kind, "track_limits");
        assert_eq!(input.overtakes[0].opponent.as_deref(), Some("ALB"));
        assert_eq!(input.overtakes[0].lap_number, Some(12));
        assert_eq!(input.overtakes[1].event_type, EventType::PitCycle);
        assert_eq!(input.overtakes[1].event_source, "timing");
        assert_eq!(input.pit_cycle_events(), 1);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = load_weekend_file(write(&dir, "{\"drivers\": [")).unwrap_err();
        assert!(matches!(error, DriveGradeError::Parse { .. }));
    }

    #[test]
    fn strategy_mismatch_names_driver() {
        let dir = tempfile::tempdir().unwrap();
        let body = ONE_DRIVER.replace(r#""actual_pit_laps": [20]"#, r#""actual_pit_laps": [20, 41]"#);
        let error = load_weekend_file(write(&dir, &body)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(error.to_string().contains("RUS"));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = ONE_DRIVER.replace("pit_cycle", "safety_car");
        let error = load_weekend_file(write(&dir, &body)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[test]
    fn duplicate_driver_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{"drivers": [
            {"driver": "VER", "team": "Red Bull", "car_pace": {"base_delta": -0.3}, "form": FORM},
            {"driver": "NOR", "team": "McLaren", "car_pace": {"base_delta": -0.25}, "form": FORM},
            {"driver": "VER", "team": "Red Bull", "car_pace": {"base_delta": -0.3}, "form": FORM}
        ]}"#
        .replace("FORM", r#"{"consistency": 0.5, "error_rate": 0.0, "start_precision": 0.5}"#);
        let error = load_weekend_file(write(&dir, &body)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(error.to_string().contains("Duplicate driver 'VER'"), "{error}");
    }

    #[test]
    fn out_of_range_values_name_driver_and_field() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            (r#""consistency": 0.6"#, r#""consistency": 7.0"#, "form.consistency"),
            (r#""error_rate": 0.02"#, r#""error_rate": -3.0"#, "form.error_rate"),
            (r#""start_precision": 0.7"#, r#""start_precision": 1.5"#, "form.start_precision"),
            (r#""degradation_penalty": 0.1"#, r#""degradation_penalty": 2.0"#, "strategy.degradation_penalty"),
            (r#""time_loss": 5.0"#, r#""time_loss": -20.0"#, "penalties.time_loss"),
            (r#""exposure_time": 3.0"#, r#""exposure_time": -10.0"#, "overtakes.exposure_time"),
            (r#""tire_compound_diff": 1}"#, r#""tire_compound_diff": 1, "track_difficulty": 1.5}"#, "overtakes.context.track_difficulty"),
            (r#""tire_compound_diff": 1}"#, r#""tire_compound_diff": 1, "race_phase_pressure": -0.2}"#, "overtakes.context.race_phase_pressure"),
        ];
        for (original, replacement, field) in cases {
            let body = ONE_DRIVER.replace(original, replacement);
            assert_ne!(body, ONE_DRIVER, "{field}");
            let error = load_weekend_file(write(&dir, &body)).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Validation, "{field}");
            let message = error.to_string();
            assert!(message.contains("RUS") && message.contains(field), "{message}");
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let error = load_weekend_file("/definitely/not/here.json").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Io);
    }
}
