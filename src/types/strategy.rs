//! Pit strategy plans and penalty records

use serde::{Deserialize, Serialize};

use crate::{DriveGradeError, Result};

/// Intended and executed pit strategy.
///
/// When both stop lists are non-empty they always have equal length: each actual stop
/// maps to one planned stop by index. The only way to build a plan is [`StrategyPlan::new`],
/// which rejects mismatched lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct StrategyPlan {
    optimal_pit_laps: Vec<u32>,
    actual_pit_laps: Vec<u32>,
    degradation_penalty: f64,
}

impl StrategyPlan {
    /// Build a plan for `driver`, validating that the stop lists line up.
    pub fn new(
        driver: &str,
        optimal_pit_laps: Vec<u32>,
        actual_pit_laps: Vec<u32>,
        degradation_penalty: f64,
    ) -> Result<Self> {
        if !optimal_pit_laps.is_empty()
            && !actual_pit_laps.is_empty()
            && optimal_pit_laps.len() != actual_pit_laps.len()
        {
            return Err(DriveGradeError::validation(
                "strategy",
                format!(
                    "Strategy plan mismatch for driver '{}': {} optimal vs {} actual pit entries",
                    driver,
                    optimal_pit_laps.len(),
                    actual_pit_laps.len()
                ),
            ));
        }
        Ok(Self { optimal_pit_laps, actual_pit_laps, degradation_penalty })
    }

    /// A plan with no stops, scored as neutral.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn optimal_pit_laps(&self) -> &[u32] {
        &self.optimal_pit_laps
    }

    pub fn actual_pit_laps(&self) -> &[u32] {
        &self.actual_pit_laps
    }

    pub fn degradation_penalty(&self) -> f64 {
        self.degradation_penalty
    }

    /// Whether both lists carry stops, i.e. the plan can be compared stop by stop.
    pub fn is_comparable(&self) -> bool {
        !self.optimal_pit_laps.is_empty() && !self.actual_pit_laps.is_empty()
    }
}

/// Time lost to an error or sanction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct PenaltyEvent {
    #[serde(rename = "type")]
    pub kind: String,
    /// Seconds lost
    pub time_loss: f64,
}

impl PenaltyEvent {
    pub fn new(kind: impl Into<String>, time_loss: f64) -> Self {
        Self { kind: kind.into(), time_loss }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn mismatched_stop_lists_name_the_driver() {
        let error = StrategyPlan::new("A. Leader", vec![15, 40], vec![16], 0.0).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        let message = error.to_string();
        assert!(message.contains("A. Leader"), "{message}");
        assert!(message.contains("Strategy plan mismatch"));
    }

    #[test]
    fn one_sided_plans_are_allowed() {
        let plan = StrategyPlan::new("B. Chaser", vec![], vec![22], 0.0).unwrap();
        assert!(!plan.is_comparable());
        assert!(StrategyPlan::new("B. Chaser", vec![20], vec![], 0.0).is_ok());
    }

    #[test]
    fn matching_plans_expose_their_laps() {
        let plan = StrategyPlan::new("C. Third", vec![15, 40], vec![15, 41], 0.1).unwrap();
        assert!(plan.is_comparable());
        assert_eq!(plan.actual_pit_laps(), &[15, 41]);
        assert_eq!(plan.degradation_penalty(), 0.1);
    }
}
