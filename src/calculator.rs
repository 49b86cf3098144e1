//! Aggregation of raw component metrics into a [`DriveGradeBreakdown`].

use crate::types::{DriveGradeBreakdown, OvertakeEvent, clamp_unit};

/// Band centre used when normalizing raw components.
pub const DEFAULT_COMPONENT_MEAN: f64 = 0.5;
/// Spread used when normalizing raw components.
pub const DEFAULT_COMPONENT_STD: f64 = 0.15;

/// Derives normalized scores from intermediate race metrics.
///
/// Stateless; a single calculator can be shared by any number of pipelines.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveGradeCalculator;

impl DriveGradeCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Map a raw value onto the `[0, 1]` band using a z-score around `mean`.
    ///
    /// A non-positive `std` disables scaling and only clamps.
    pub fn normalize_component(value: f64, mean: f64, std: f64) -> f64 {
        if std <= 0.0 {
            return clamp_unit(value);
        }
        clamp_unit(0.5 + (value - mean) / (4.0 * std))
    }

    /// Sum of on-track overtake values, clamped to `[0, 1]`. Pit-cycle gains are ignored.
    pub fn racecraft_score<'a, I>(events: I) -> f64
    where
        I: IntoIterator<Item = &'a OvertakeEvent>,
    {
        let total: f64 = events
            .into_iter()
            .filter(|event| event.is_on_track())
            .map(OvertakeEvent::value)
            .sum();
        clamp_unit(total)
    }

    /// Normalize every raw component and assemble the breakdown.
    pub fn build_breakdown(
        &self,
        consistency: f64,
        strategy: f64,
        penalties: f64,
        events: &[OvertakeEvent],
        on_track_events: u32,
        pit_cycle_events: u32,
    ) -> DriveGradeBreakdown {
        let racecraft = Self::racecraft_score(events);
        DriveGradeBreakdown::new(
            Self::normalize(consistency),
            Self::normalize(strategy),
            Self::normalize(racecraft),
            Self::normalize(penalties),
            on_track_events,
            pit_cycle_events,
        )
    }

    fn normalize(value: f64) -> f64 {
        Self::normalize_component(value, DEFAULT_COMPONENT_MEAN, DEFAULT_COMPONENT_STD)
    }
}
