//! Raw component metrics computed from a driver's race input

use crate::calibration::CalibrationProfile;
use crate::types::{PenaltyEvent, StrategyPlan, clamp_unit};

/// Higher when lap deltas stay near the expectation, with pace and stint bonuses.
///
/// An empty lap list is neutral (0.5).
pub fn compute_consistency_score(
    lap_deltas: &[f64],
    expected_delta: f64,
    actual_pit_laps: &[u32],
    calibration: &CalibrationProfile,
) -> f64 {
    if lap_deltas.is_empty() {
        return 0.5;
    }
    let average_offset = lap_deltas.iter().map(|delta| (delta - expected_delta).abs()).sum::<f64>()
        / lap_deltas.len() as f64;
    let base_score = clamp_unit(1.0 - average_offset / calibration.consistency_tolerance);

    let pace_advantage = (-expected_delta - calibration.pace_min_advantage).max(0.0);
    let pace_boost =
        (pace_advantage / calibration.pace_advantage_scale).min(calibration.pace_boost_cap);
    let pace_factor = 1.0 + pace_boost;

    let target = calibration.stint_target_laps;
    let avg_stint = average_stint_length(lap_deltas.len(), actual_pit_laps);
    let stint_factor = if target > 0.0 && avg_stint > target {
        1.0 + ((avg_stint - target) / target).min(calibration.stint_boost_cap)
    } else {
        1.0
    };

    clamp_unit(base_score * pace_factor * stint_factor)
}

/// Mean stint length in laps for a race of `total_laps` with the given pit laps.
///
/// Stints start at lap 1. Non-positive and non-increasing pit laps are ignored.
pub fn average_stint_length(total_laps: usize, pit_laps: &[u32]) -> f64 {
    if total_laps == 0 {
        return 0.0;
    }
    let total = total_laps as i64;
    if pit_laps.is_empty() {
        return total as f64;
    }

    let mut pits: Vec<i64> = pit_laps.iter().map(|&lap| i64::from(lap)).filter(|&lap| lap > 0).collect();
    pits.sort_unstable();

    let mut stints = Vec::with_capacity(pits.len() + 1);
    let mut prev = 1i64;
    for pit in pits {
        if pit <= prev {
            continue;
        }
        stints.push(pit - prev);
        prev = pit;
    }
    if prev <= total {
        stints.push(total - prev + 1);
    }

    if stints.is_empty() {
        return total as f64;
    }
    stints.iter().sum::<i64>() as f64 / stints.len() as f64
}

/// Reward pit timing that tracks the optimal plan while avoiding degradation.
pub fn compute_strategy_score(plan: &StrategyPlan, calibration: &CalibrationProfile) -> f64 {
    let base_score = if plan.is_comparable() {
        let diffs: Vec<f64> = plan
            .optimal_pit_laps()
            .iter()
            .zip(plan.actual_pit_laps())
            .map(|(&optimal, &actual)| (f64::from(optimal) - f64::from(actual)).abs())
            .collect();
        let avg_diff = diffs.iter().sum::<f64>() / diffs.len() as f64;
        clamp_unit(1.0 - avg_diff / calibration.strategy_lap_tolerance)
    } else {
        0.5
    };
    let degradation_hit = clamp_unit(plan.degradation_penalty());
    clamp_unit(base_score - 0.5 * degradation_hit)
}

/// Map cumulative time loss onto the `[0, 1]` penalty component.
pub fn compute_penalty_score(penalties: &[PenaltyEvent], calibration: &CalibrationProfile) -> f64 {
    if penalties.is_empty() {
        return 0.0;
    }
    let total_loss: f64 = penalties.iter().map(|event| event.time_loss).sum();
    clamp_unit(total_loss / calibration.penalty_normalizer)
}
