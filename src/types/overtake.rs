//! Wheel-to-wheel overtake events and their scoring value

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::clamp;
use crate::{DriveGradeError, Result};

/// How a position change came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Passed a car on circuit
    #[default]
    OnTrack,
    /// Gained purely through pit-stop timing
    PitCycle,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::OnTrack => "on_track",
            EventType::PitCycle => "pit_cycle",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DriveGradeError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "on_track" => Ok(EventType::OnTrack),
            "pit_cycle" => Ok(EventType::PitCycle),
            other => Err(DriveGradeError::validation(
                "overtake event_type",
                format!("unknown event type '{}' (expected on_track or pit_cycle)", other),
            )),
        }
    }
}

/// Context surrounding an overtake attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(default)]
pub struct OvertakeContext {
    /// Attacker CPI minus defender CPI (negative = attacker faster)
    pub delta_cpi: f64,
    /// Attacker tire age advantage in laps (positive = fresher)
    pub tire_delta: f64,
    /// Attacker compound rank minus defender compound rank (positive = softer)
    pub tire_compound_diff: i32,
    /// Attacker deploy minus defender deploy in percentage points
    pub ers_delta: f64,
    /// 0 easy, 1 impossible
    pub track_difficulty: f64,
    /// 0-1, 1 on the last lap
    pub race_phase_pressure: f64,
}

impl Default for OvertakeContext {
    fn default() -> Self {
        Self {
            delta_cpi: 0.0,
            tire_delta: 0.0,
            tire_compound_diff: 0,
            ers_delta: 0.0,
            track_difficulty: 0.5,
            race_phase_pressure: 0.5,
        }
    }
}

/// Result of a single wheel-to-wheel interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct OvertakeEvent {
    pub context: OvertakeContext,
    pub success: bool,
    /// Seconds spent side-by-side or defending
    pub exposure_time: f64,
    pub penalized: bool,
    pub lap_number: Option<u32>,
    pub opponent: Option<String>,
    pub opponent_team: Option<String>,
    pub event_type: EventType,
    pub event_source: String,
}

impl OvertakeEvent {
    pub fn new(context: OvertakeContext, success: bool, exposure_time: f64) -> Self {
        Self {
            context,
            success,
            exposure_time,
            penalized: false,
            lap_number: None,
            opponent: None,
            opponent_team: None,
            event_type: EventType::OnTrack,
            event_source: "unknown".to_string(),
        }
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn penalized(mut self, penalized: bool) -> Self {
        self.penalized = penalized;
        self
    }

    pub fn is_on_track(&self) -> bool {
        self.event_type == EventType::OnTrack
    }

    /// Logistic difficulty of the move, bounded to `[0.05, 0.95]`.
    pub fn difficulty(&self) -> f64 {
        let ctx = &self.context;
        let base = -1.2 * ctx.delta_cpi - 0.05 * ctx.tire_delta
            - 0.15 * f64::from(ctx.tire_compound_diff)
            - 0.01 * ctx.ers_delta
            + 1.5 * ctx.track_difficulty
            + 0.5 * ctx.race_phase_pressure;
        clamp(1.0 / (1.0 + (-base).exp()), 0.05, 0.95)
    }

    /// Signed racecraft value. A failed attempt costs half of what success would earn.
    pub fn value(&self) -> f64 {
        let exposure_multiplier = 1.0 - (-self.exposure_time / 5.0).exp();
        let mut magnitude = self.difficulty() * exposure_multiplier;
        if self.penalized {
            magnitude *= 0.2;
        }
        if self.success { magnitude } else { -0.5 * magnitude }
    }
}
