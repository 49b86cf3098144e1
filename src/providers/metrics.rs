//! Form, strategy and pace metrics derived from raw lap data
//!
//! Each upstream source carries different raw material, so each provider derives form
//! with the heuristic its data supports. The heuristics live here side by side.

use crate::schema::{FormEntry, StrategyEntry};
use crate::types::{clamp_unit, median};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation; 0 for fewer than two values.
pub fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Median ignoring outliers of 10 s or more (pit laps, safety car laps).
///
/// Falls back to the plain median when every value is an outlier.
pub fn clean_median(values: &[f64]) -> Option<f64> {
    let filtered: Vec<f64> = values.iter().copied().filter(|v| v.abs() < 10.0).collect();
    if filtered.is_empty() { median(values) } else { median(&filtered) }
}

/// Launch quality from places gained: neutral when either position is unknown.
pub fn start_precision(grid: Option<u32>, finish: Option<u32>, field_scale: f64) -> f64 {
    match (grid, finish) {
        (Some(grid), Some(finish)) if grid > 0 && finish > 0 => {
            clamp_unit(0.5 + (grid as f64 - finish as f64) / field_scale)
        }
        _ => 0.5,
    }
}

/// Form from deltas to the per-lap field median (legacy results API).
pub fn legacy_form(deltas: &[f64], grid: Option<u32>, finish: Option<u32>) -> FormEntry {
    let (consistency, error_rate) = if deltas.is_empty() {
        (0.5, 0.5)
    } else {
        let consistency = clamp_unit(1.0 - population_std(deltas) / 0.8);
        let errors = deltas.iter().filter(|delta| **delta > 0.6).count();
        (consistency, errors as f64 / deltas.len() as f64)
    };
    FormEntry { consistency, error_rate, start_precision: start_precision(grid, finish, 20.0) }
}

/// Form from deltas to the session reference lap (real-time API).
pub fn realtime_form(
    deltas: &[f64],
    grid: Option<u32>,
    finish: Option<u32>,
    field_size: usize,
) -> FormEntry {
    let (consistency, error_rate) = if deltas.is_empty() {
        (0.5, 0.1)
    } else {
        let mean_abs = deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64;
        let consistency = clamp_unit(1.0 - mean_abs / 1.5);
        let threshold = population_std(deltas).max(0.001);
        let errors = deltas.iter().filter(|delta| delta.abs() > 2.0 * threshold).count();
        (consistency, errors as f64 / deltas.len() as f64)
    };
    let field_scale = field_size.max(20) as f64;
    FormEntry { consistency, error_rate, start_precision: start_precision(grid, finish, field_scale) }
}

/// Form from deltas to the driver's own median lap (archived sessions).
pub fn archive_form(deltas: &[f64], grid: Option<u32>, finish: Option<u32>) -> FormEntry {
    let (consistency, error_rate) = if deltas.is_empty() {
        (0.5, 0.5)
    } else {
        let max = deltas.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = deltas.iter().copied().fold(f64::INFINITY, f64::min);
        let consistency = clamp_unit(1.0 - (max - min) / 3.0);
        let errors = deltas.iter().filter(|delta| **delta > 1.0).count();
        (consistency, errors as f64 / deltas.len() as f64)
    };
    FormEntry { consistency, error_rate, start_precision: start_precision(grid, finish, 20.0) }
}

/// Even-spacing strategy estimate for sources without a reference plan.
///
/// Optimal stops are spread evenly over the race distance; the degradation penalty is the
/// total distance of the actual stops from that plan as a fraction of race length.
pub fn even_spacing_strategy(pit_laps: &[u32], total_laps: u32) -> StrategyEntry {
    if pit_laps.is_empty() || total_laps == 0 {
        return StrategyEntry {
            optimal_pit_laps: Vec::new(),
            actual_pit_laps: pit_laps.to_vec(),
            degradation_penalty: 0.0,
        };
    }
    let spacing = total_laps as f64 / (pit_laps.len() + 1) as f64;
    let optimal: Vec<u32> =
        (0..pit_laps.len()).map(|i| ((spacing * (i + 1) as f64).round() as u32).max(1)).collect();
    let distance: f64 =
        pit_laps.iter().zip(&optimal).map(|(act, opt)| (*act as f64 - *opt as f64).abs()).sum();
    StrategyEntry {
        optimal_pit_laps: optimal,
        actual_pit_laps: pit_laps.to_vec(),
        degradation_penalty: clamp_unit(distance / total_laps as f64),
    }
}

/// Field reference plan: the rounded median lap of each stop index across drivers.
pub fn field_pit_targets<'a, I>(pit_plans: I) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Vec<u32>>,
{
    let mut by_index: Vec<Vec<f64>> = Vec::new();
    for plan in pit_plans {
        for (index, lap) in plan.iter().enumerate() {
            if by_index.len() <= index {
                by_index.push(Vec::new());
            }
            by_index[index].push(*lap as f64);
        }
    }
    by_index
        .iter()
        .filter_map(|laps| median(laps))
        .map(|value| value.round() as u32)
        .collect()
}

/// Compare a driver's stops to the field reference plan.
///
/// The plan is truncated or padded with its last stop to match the driver's stop count.
/// Stops more than 4 laps late cost up to 0.15 each.
pub fn reference_strategy(actual: &[u32], targets: &[u32]) -> StrategyEntry {
    if actual.is_empty() {
        return StrategyEntry::default();
    }
    let Some(last_target) = targets.last().copied() else {
        return StrategyEntry {
            optimal_pit_laps: actual.to_vec(),
            actual_pit_laps: actual.to_vec(),
            degradation_penalty: 0.0,
        };
    };
    let optimal: Vec<u32> =
        (0..actual.len()).map(|i| targets.get(i).copied().unwrap_or(last_target)).collect();
    let penalty: f64 = actual
        .iter()
        .zip(&optimal)
        .map(|(act, target)| *act as f64 - *target as f64)
        .filter(|late| *late > 4.0)
        .map(|late| (late / 50.0).min(0.15))
        .sum();
    StrategyEntry {
        optimal_pit_laps: optimal,
        actual_pit_laps: actual.to_vec(),
        degradation_penalty: clamp_unit(penalty),
    }
}

/// Race phase of a lap; mid-race when the lap or race length is unknown.
pub fn race_phase(lap_number: Option<u32>, total_laps: u32) -> f64 {
    match lap_number {
        Some(lap) if total_laps > 0 => (lap as f64 / total_laps as f64).clamp(0.05, 1.0),
        _ => 0.5,
    }
}
