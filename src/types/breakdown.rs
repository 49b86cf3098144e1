//! Drive Grade component breakdown

use serde::{Deserialize, Serialize};

pub const CONSISTENCY_WEIGHT: f64 = 0.55;
pub const RACECRAFT_WEIGHT: f64 = 0.45;
pub const PENALTY_WEIGHT: f64 = 0.10;

/// Normalized component scores for one driver in one race.
///
/// `total_grade` is derived at construction and cannot be set independently.
/// `team_strategy_score` is reported but not weighted into the total. Deserializing
/// ignores any stored total and recomputes it from the components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BreakdownComponents")]
pub struct DriveGradeBreakdown {
    consistency_score: f64,
    team_strategy_score: f64,
    racecraft_score: f64,
    penalty_score: f64,
    on_track_events: u32,
    pit_cycle_events: u32,
    total_grade: f64,
}

impl DriveGradeBreakdown {
    pub fn new(
        consistency_score: f64,
        team_strategy_score: f64,
        racecraft_score: f64,
        penalty_score: f64,
        on_track_events: u32,
        pit_cycle_events: u32,
    ) -> Self {
        let total_grade = CONSISTENCY_WEIGHT * consistency_score
            + RACECRAFT_WEIGHT * racecraft_score
            - PENALTY_WEIGHT * penalty_score;
        Self {
            consistency_score,
            team_strategy_score,
            racecraft_score,
            penalty_score,
            on_track_events,
            pit_cycle_events,
            total_grade,
        }
    }

    pub fn consistency_score(&self) -> f64 {
        self.consistency_score
    }

    pub fn team_strategy_score(&self) -> f64 {
        self.team_strategy_score
    }

    pub fn racecraft_score(&self) -> f64 {
        self.racecraft_score
    }

    pub fn penalty_score(&self) -> f64 {
        self.penalty_score
    }

    pub fn on_track_events(&self) -> u32 {
        self.on_track_events
    }

    pub fn pit_cycle_events(&self) -> u32 {
        self.pit_cycle_events
    }

    pub fn total_grade(&self) -> f64 {
        self.total_grade
    }
}

#[derive(Deserialize)]
struct BreakdownComponents {
    consistency_score: f64,
    team_strategy_score: f64,
    racecraft_score: f64,
    penalty_score: f64,
    #[serde(default)]
    on_track_events: u32,
    #[serde(default)]
    pit_cycle_events: u32,
}

impl From<BreakdownComponents> for DriveGradeBreakdown {
    fn from(raw: BreakdownComponents) -> Self {
        DriveGradeBreakdown::new(
            raw.consistency_score,
            raw.team_strategy_score,
            raw.racecraft_score,
            raw.penalty_score,
            raw.on_track_events,
            raw.pit_cycle_events,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_grade_follows_weights() {
        let breakdown = DriveGradeBreakdown::new(0.8, 0.3, 0.6, 0.2, 2, 1);
        let expected = 0.55 * 0.8 + 0.45 * 0.6 - 0.10 * 0.2;
        assert!((breakdown.total_grade() - expected).abs() < 1e-12);
    }

    #[test]
    fn strategy_does_not_move_total() {
        let low = DriveGradeBreakdown::new(0.5, 0.0, 0.5, 0.0, 0, 0);
        let high = DriveGradeBreakdown::new(0.5, 1.0, 0.5, 0.0, 0, 0);
        assert_eq!(low.total_grade(), high.total_grade());
    }

    #[test]
    fn deserializing_recomputes_total() {
        let json = r#"{"consistency_score":1.0,"team_strategy_score":0.5,"racecraft_score":1.0,
            "penalty_score":0.0,"on_track_events":3,"pit_cycle_events":0,"total_grade":42.0}"#;
        let breakdown: DriveGradeBreakdown = serde_json::from_str(json).unwrap();
        assert!((breakdown.total_grade() - 1.0).abs() < 1e-12);
        assert_eq!(breakdown.on_track_events(), 3);
    }

    #[test]
    fn total_grade_extremes() {
        assert!((DriveGradeBreakdown::new(1.0, 1.0, 1.0, 0.0, 0, 0).total_grade() - 1.0).abs() < 1e-12);
        assert!((DriveGradeBreakdown::new(0.0, 0.0, 0.0, 1.0, 0, 0).total_grade() + 0.1).abs() < 1e-12);
    }
}
