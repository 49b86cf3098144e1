//! Core value types for Drive Grade scoring.
//!
//! Everything in this module is a plain value record: built once, never mutated by the
//! scoring pipeline, and owned by simple containment.
//!
//! ## Overview
//!
//! - [`CarPaceIndex`] expected lap delta of a car versus the field median
//! - [`DriverFormModifier`] small signed pace adjustment from recent execution form
//! - [`OvertakeContext`] / [`OvertakeEvent`] a single wheel-to-wheel interaction and its value
//! - [`StrategyPlan`] / [`PenaltyEvent`] pit strategy and time lost to sanctions or errors
//! - [`DriverRaceInput`] everything the pipeline needs for one driver in one race
//! - [`DriveGradeBreakdown`] normalized component scores and the derived total grade
//!
//! ## Usage Example
//!
//! ```rust
//! use drivegrade::types::{OvertakeContext, OvertakeEvent};
//!
//! let event = OvertakeEvent::new(OvertakeContext::default(), true, 10.0);
//! let difficulty = event.difficulty();
//! assert!((0.05..=0.95).contains(&difficulty));
//! assert!(event.value() > 0.0);
//! ```

mod breakdown;
mod car_pace;
mod form;
mod overtake;
mod race_input;
mod strategy;

pub use breakdown::{CONSISTENCY_WEIGHT, DriveGradeBreakdown, PENALTY_WEIGHT, RACECRAFT_WEIGHT};
pub use car_pace::{CarPaceIndex, TeamPace, anchor_car_pace_to_team, median};
pub use form::DriverFormModifier;
pub use overtake::{EventType, OvertakeContext, OvertakeEvent};
pub use race_input::DriverRaceInput;
pub use strategy::{PenaltyEvent, StrategyPlan};

/// Keep a value within inclusive bounds.
///
/// NaN collapses to `lower`.
pub fn clamp(value: f64, lower: f64, upper: f64) -> f64 {
    value.max(lower).min(upper)
}

/// Keep a value within `[0, 1]`.
pub fn clamp_unit(value: f64) -> f64 {
    clamp(value, 0.0, 1.0)
}
