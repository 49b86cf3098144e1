//! Driver execution form

use serde::{Deserialize, Serialize};

/// Recent execution form for a driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct DriverFormModifier {
    /// 0-1, higher is steadier
    pub consistency: f64,
    /// Fraction of laps with notable mistakes
    pub error_rate: f64,
    /// 0-1, higher is better launches
    pub start_precision: f64,
}

impl Default for DriverFormModifier {
    fn default() -> Self {
        Self { consistency: 0.5, error_rate: 0.0, start_precision: 0.5 }
    }
}

impl DriverFormModifier {
    pub fn new(consistency: f64, error_rate: f64, start_precision: f64) -> Self {
        Self { consistency, error_rate, start_precision }
    }

    /// Seconds added to the car pace expectation.
    pub fn adjustment(&self) -> f64 {
        let consistency_bonus = (self.consistency - 0.5) * 0.2;
        let error_penalty = self.error_rate * 0.15;
        let start_bonus = (self.start_precision - 0.5) * 0.05;
        consistency_bonus + start_bonus - error_penalty
    }
}
