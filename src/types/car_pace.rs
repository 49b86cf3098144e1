//! Car pace baselines anchored at the team level

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expected lap delta of a car versus the median car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct CarPaceIndex {
    pub driver: String,
    pub team: String,
    /// Seconds per lap versus the field median (negative = faster)
    pub base_delta: f64,
    #[serde(default)]
    pub track_adjustment: f64,
}

impl CarPaceIndex {
    pub fn new(driver: impl Into<String>, team: impl Into<String>, base_delta: f64) -> Self {
        Self { driver: driver.into(), team: team.into(), base_delta, track_adjustment: 0.0 }
    }

    pub fn with_track_adjustment(mut self, track_adjustment: f64) -> Self {
        self.track_adjustment = track_adjustment;
        self
    }

    pub fn expected_delta(&self) -> f64 {
        self.base_delta + self.track_adjustment
    }
}

/// Anything carrying a team name and a car pace base delta.
pub trait TeamPace {
    /// Team name, or `None` when the entry cannot be attributed to a team.
    fn team(&self) -> Option<&str>;
    fn base_delta(&self) -> f64;
    fn set_base_delta(&mut self, value: f64);
}

impl TeamPace for CarPaceIndex {
    fn team(&self) -> Option<&str> {
        Some(&self.team)
    }

    fn base_delta(&self) -> f64 {
        self.base_delta
    }

    fn set_base_delta(&mut self, value: f64) {
        self.base_delta = value;
    }
}

/// Assign each driver their team's average base delta and recenter the field median to zero.
///
/// Teammates end up sharing one anchor, so driver-level noise is removed and the value
/// isolates car performance. Entries without a team are left untouched.
pub fn anchor_car_pace_to_team<T: TeamPace>(entries: &mut [T]) {
    let mut samples: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for entry in entries.iter() {
        if let Some(team) = entry.team() {
            let slot = samples.entry(team.to_string()).or_insert((0.0, 0));
            slot.0 += entry.base_delta();
            slot.1 += 1;
        }
    }

    let anchors: BTreeMap<String, f64> = samples
        .into_iter()
        .map(|(team, (sum, count))| (team, sum / count as f64))
        .collect();

    let anchor_values: Vec<f64> = anchors.values().copied().collect();
    let field_median = median(&anchor_values).unwrap_or(0.0);

    for entry in entries.iter_mut() {
        let anchored = match entry.team() {
            Some(team) => anchors.get(team).copied().unwrap_or(0.0) - field_median,
            None => continue,
        };
        entry.set_base_delta(anchored);
    }
}

/// Median of a slice; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn anchoring_averages_teammates_and_recenters() {
        let mut field = vec![
            CarPaceIndex::new("A1", "Team A", -0.3),
            CarPaceIndex::new("A2", "Team A", 0.1),
            CarPaceIndex::new("B1", "Team B", 0.5),
        ];

        anchor_car_pace_to_team(&mut field);

        assert!(approx(field[0].base_delta, -0.3));
        assert!(approx(field[1].base_delta, -0.3));
        assert!(approx(field[2].base_delta, 0.3));
    }

    #[test]
    fn anchoring_is_idempotent() {
        let mut field = vec![
            CarPaceIndex::new("A1", "Team A", -0.3),
            CarPaceIndex::new("A2", "Team A", 0.1),
            CarPaceIndex::new("B1", "Team B", 0.5),
            CarPaceIndex::new("C1", "Team C", 0.9),
        ];
        anchor_car_pace_to_team(&mut field);
        let first: Vec<f64> = field.iter().map(|entry| entry.base_delta).collect();
        anchor_car_pace_to_team(&mut field);
        for (entry, before) in field.iter().zip(first) {
            assert!(approx(entry.base_delta, before));
        }
    }

    #[test]
    fn single_team_collapses_to_zero() {
        let mut field =
            vec![CarPaceIndex::new("A1", "Solo", -0.5), CarPaceIndex::new("A2", "Solo", -0.1)];
        anchor_car_pace_to_team(&mut field);
        assert!(approx(field[0].base_delta, 0.0));
        assert!(approx(field[1].base_delta, 0.0));
    }

    #[test]
    fn expected_delta_includes_track_adjustment() {
        let pace = CarPaceIndex::new("VER", "Red Bull", -0.25).with_track_adjustment(0.05);
        assert!(approx(pace.expected_delta(), -0.2));
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }
}
