//! Scoring pipeline turning race inputs into Drive Grade breakdowns.
//!
//! ```rust
//! use std::sync::Arc;
//! use drivegrade::{CalibrationProfile, CarPaceIndex, DriveGradePipeline, DriverRaceInput};
//!
//! let pipeline = DriveGradePipeline::new(Arc::new(CalibrationProfile::default()));
//! let mut input = DriverRaceInput::new(CarPaceIndex::new("NOR", "McLaren", -0.4));
//! input.lap_deltas = vec![-0.35, -0.42, -0.40];
//!
//! let breakdown = pipeline.score_driver(&input);
//! assert!(breakdown.consistency_score() > 0.5);
//! ```

mod scoring;

pub use scoring::{
    average_stint_length, compute_consistency_score, compute_penalty_score,
    compute_strategy_score,
};

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::Result;
use crate::calculator::DriveGradeCalculator;
use crate::calibration::CalibrationProfile;
use crate::ingest;
use crate::schema::WeekendDescriptor;
use crate::types::{DriveGradeBreakdown, DriverRaceInput};

/// Coordinates metric creation and final scoring for a fixed calibration.
#[derive(Debug, Clone)]
pub struct DriveGradePipeline {
    calculator: DriveGradeCalculator,
    calibration: Arc<CalibrationProfile>,
}

impl DriveGradePipeline {
    pub fn new(calibration: Arc<CalibrationProfile>) -> Self {
        Self { calculator: DriveGradeCalculator::new(), calibration }
    }

    pub fn with_calculator(mut self, calculator: DriveGradeCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn calibration(&self) -> &CalibrationProfile {
        &self.calibration
    }

    pub fn score_driver(&self, input: &DriverRaceInput) -> DriveGradeBreakdown {
        let cal = self.calibration.as_ref();
        let expected_delta = input.car_pace.expected_delta() + input.form.adjustment();
        let consistency = compute_consistency_score(
            &input.lap_deltas,
            expected_delta,
            input.strategy.actual_pit_laps(),
            cal,
        );
        let strategy = compute_strategy_score(&input.strategy, cal);
        let penalties = compute_penalty_score(&input.penalties, cal);

        self.calculator.build_breakdown(
            consistency,
            strategy,
            penalties,
            &input.overtakes,
            input.on_track_events(),
            input.pit_cycle_events(),
        )
    }

    pub fn score_inputs(&self, inputs: &[DriverRaceInput]) -> RaceGrades {
        inputs
            .iter()
            .map(|input| DriverGrade {
                driver: input.driver.clone(),
                team: input.team.clone(),
                breakdown: self.score_driver(input),
            })
            .collect()
    }

    /// Score every driver in a JSON weekend file.
    pub fn run_from_json(&self, path: impl AsRef<Path>) -> Result<RaceGrades> {
        let path = path.as_ref();
        let inputs = ingest::load_weekend_file(path)?;
        debug!(path = %path.display(), drivers = inputs.len(), "Scoring weekend file");
        Ok(self.score_inputs(&inputs))
    }

    /// Score every driver in a canonical weekend, usually obtained from a provider.
    pub fn run_weekend(&self, weekend: &WeekendDescriptor) -> Result<RaceGrades> {
        let inputs = ingest::driver_inputs_from_descriptor(weekend)?;
        debug!(
            season = weekend.season,
            round = weekend.round,
            source = %weekend.source,
            drivers = inputs.len(),
            "Scoring weekend descriptor"
        );
        Ok(self.score_inputs(&inputs))
    }
}

/// Breakdown for one driver in one race.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverGrade {
    pub driver: String,
    pub team: String,
    pub breakdown: DriveGradeBreakdown,
}

/// Per-driver breakdowns for a race, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RaceGrades {
    grades: Vec<DriverGrade>,
}

impl RaceGrades {
    pub fn get(&self, driver: &str) -> Option<&DriveGradeBreakdown> {
        self.grades.iter().find(|grade| grade.driver == driver).map(|grade| &grade.breakdown)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DriverGrade> {
        self.grades.iter()
    }

    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.grades.iter().map(|grade| grade.driver.as_str())
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }
}

impl FromIterator<DriverGrade> for RaceGrades {
    fn from_iter<I: IntoIterator<Item = DriverGrade>>(iter: I) -> Self {
        Self { grades: iter.into_iter().collect() }
    }
}

impl IntoIterator for RaceGrades {
    type Item = DriverGrade;
    type IntoIter = std::vec::IntoIter<DriverGrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.grades.into_iter()
    }
}

impl<'a> IntoIterator for &'a RaceGrades {
    type Item = &'a DriverGrade;
    type IntoIter = std::slice::Iter<'a, DriverGrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.grades.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_input;
    use crate::types::{EventType, OvertakeContext, OvertakeEvent, PenaltyEvent, StrategyPlan};

    fn pipeline() -> DriveGradePipeline {
        DriveGradePipeline::new(Arc::new(CalibrationProfile::default()))
    }

    #[test]
    fn clean_race_scores_above_penalized_race() {
        let clean = sample_input("VER", "Red Bull", -0.6);
        let mut penalized = sample_input("PER", "Red Bull", -0.6);
        penalized.penalties = vec![PenaltyEvent::new("unsafe_release", 10.0)];

        let pipeline = pipeline();
        let clean_grade = pipeline.score_driver(&clean);
        let penalized_grade = pipeline.score_driver(&penalized);
        assert!(clean_grade.total_grade() > penalized_grade.total_grade());
        assert_eq!(clean_grade.penalty_score(), 0.0);
    }

    #[test]
    fn event_counts_split_on_track_and_pit_cycle() {
        let mut input = sample_input("HAM", "Ferrari", -0.2);
        input.overtakes = vec![
            OvertakeEvent::new(OvertakeContext::default(), true, 4.0),
            OvertakeEvent::new(OvertakeContext::default(), true, 2.0)
                .with_event_type(EventType::PitCycle),
            OvertakeEvent::new(OvertakeContext::default(), false, 6.0),
        ];
        let breakdown = pipeline().score_driver(&input);
        assert_eq!(breakdown.on_track_events(), 2);
        assert_eq!(breakdown.pit_cycle_events(), 1);
    }

    #[test]
    fn calibration_changes_scores() {
        let mut input = sample_input("ALO", "Aston Martin", 0.1);
        input.strategy = StrategyPlan::new("ALO", vec![20], vec![23], 0.0).unwrap();

        let mut strict = CalibrationProfile::named("strict");
        strict.strategy_lap_tolerance = 3.0;
        let relaxed_grade = pipeline().score_driver(&input);
        let strict_grade = DriveGradePipeline::new(Arc::new(strict)).score_driver(&input);
        assert!(relaxed_grade.team_strategy_score() > strict_grade.team_strategy_score());
    }

    #[test]
    fn race_grades_keep_input_order() {
        let inputs = vec![
            sample_input("LEC", "Ferrari", -0.3),
            sample_input("SAI", "Williams", 0.4),
        ];
        let grades = pipeline().score_inputs(&inputs);
        assert_eq!(grades.drivers().collect::<Vec<_>>(), vec!["LEC", "SAI"]);
        assert!(grades.get("SAI").is_some());
        assert!(grades.get("BOT").is_none());
    }
}
