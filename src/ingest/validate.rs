//! Range and uniqueness checks applied to every ingested weekend

use std::collections::HashSet;

use crate::types::DriverRaceInput;
use crate::{DriveGradeError, Result};

/// Check the documented value ranges of one driver's input.
///
/// Form fields, degradation, track difficulty and race phase must lie in `[0, 1]`;
/// time losses and exposure times must be finite and non-negative.
pub fn validate_input(input: &DriverRaceInput) -> Result<()> {
    let driver = input.driver.as_str();
    unit(driver, "form.consistency", input.form.consistency)?;
    unit(driver, "form.error_rate", input.form.error_rate)?;
    unit(driver, "form.start_precision", input.form.start_precision)?;
    unit(driver, "strategy.degradation_penalty", input.strategy.degradation_penalty())?;

    for penalty in &input.penalties {
        non_negative(driver, "penalties.time_loss", penalty.time_loss)?;
    }
    for event in &input.overtakes {
        non_negative(driver, "overtakes.exposure_time", event.exposure_time)?;
        unit(driver, "overtakes.context.track_difficulty", event.context.track_difficulty)?;
        unit(driver, "overtakes.context.race_phase_pressure", event.context.race_phase_pressure)?;
    }
    Ok(())
}

/// Reject a weekend that lists the same driver more than once.
pub fn ensure_unique_drivers<'a, I>(source: &str, drivers: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for driver in drivers {
        if !seen.insert(driver) {
            return Err(DriveGradeError::validation(
                source,
                format!("Duplicate driver '{}' in weekend", driver),
            ));
        }
    }
    Ok(())
}

fn unit(driver: &str, field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(driver, field, "within [0, 1]", value))
    }
}

fn non_negative(driver: &str, field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(driver, field, "a non-negative number", value))
    }
}

fn out_of_range(driver: &str, field: &str, expected: &str, value: f64) -> DriveGradeError {
    DriveGradeError::validation(
        format!("driver '{}'", driver),
        format!("{} must be {}, got {}", field, expected, value),
    )
}
