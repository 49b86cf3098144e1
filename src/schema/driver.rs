//! Per-driver entries of a canonical weekend
//!
//! These are the raw serde shapes shared by weekend JSON files and provider output.
//! They are converted into validated [`DriverRaceInput`](crate::DriverRaceInput)s by
//! [`crate::ingest`].

use serde::{Deserialize, Serialize};

use crate::types::{OvertakeContext, PenaltyEvent, TeamPace};

/// One driver's raw race data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct DriverEntry {
    pub driver: String,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_status: Option<String>,
    pub car_pace: CarPaceEntry,
    pub form: FormEntry,
    #[serde(default)]
    pub lap_deltas: Vec<f64>,
    #[serde(default)]
    pub strategy: StrategyEntry,
    #[serde(default)]
    pub penalties: Vec<PenaltyEvent>,
    #[serde(default)]
    pub overtakes: Vec<OvertakeEntry>,
}

impl DriverEntry {
    /// Entry with neutral form and no race data.
    pub fn new(driver: impl Into<String>, team: impl Into<String>, base_delta: f64) -> Self {
        Self {
            driver: driver.into(),
            team: team.into(),
            driver_number: None,
            grid_position: None,
            finish_position: None,
            classification_status: None,
            car_pace: CarPaceEntry { base_delta, track_adjustment: 0.0 },
            form: FormEntry::default(),
            lap_deltas: Vec::new(),
            strategy: StrategyEntry::default(),
            penalties: Vec::new(),
            overtakes: Vec::new(),
        }
    }
}

impl TeamPace for DriverEntry {
    fn team(&self) -> Option<&str> {
        let team = self.team.trim();
        (!team.is_empty()).then_some(team)
    }

    fn base_delta(&self) -> f64 {
        self.car_pace.base_delta
    }

    fn set_base_delta(&mut self, value: f64) {
        self.car_pace.base_delta = value;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct CarPaceEntry {
    pub base_delta: f64,
    #[serde(default)]
    pub track_adjustment: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct FormEntry {
    pub consistency: f64,
    pub error_rate: f64,
    pub start_precision: f64,
}

impl Default for FormEntry {
    fn default() -> Self {
        Self { consistency: 0.5, error_rate: 0.0, start_precision: 0.5 }
    }
}

/// Pit stop plan as written in a weekend file. Length checks happen on conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(default)]
pub struct StrategyEntry {
    pub optimal_pit_laps: Vec<u32>,
    pub actual_pit_laps: Vec<u32>,
    pub degradation_penalty: f64,
}

/// Overtake as written in a weekend file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct OvertakeEntry {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default = "default_exposure_time")]
    pub exposure_time: f64,
    #[serde(default)]
    pub penalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_number: Option<u32>,
    #[serde(default, alias = "opponent", skip_serializing_if = "Option::is_none")]
    pub opponent_driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_team: Option<String>,
    /// `on_track` or `pit_cycle`; validated on conversion
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_event_source")]
    pub event_source: String,
    #[serde(default)]
    pub context: OvertakeContext,
}

impl OvertakeEntry {
    pub fn new(context: OvertakeContext, success: bool, exposure_time: f64) -> Self {
        Self {
            success,
            exposure_time,
            penalized: false,
            lap_number: None,
            opponent_driver: None,
            opponent_team: None,
            event_type: default_event_type(),
            event_source: default_event_source(),
            context,
        }
    }
}

fn default_success() -> bool {
    true
}

fn default_exposure_time() -> f64 {
    5.0
}

fn default_event_type() -> String {
    "on_track".to_string()
}

fn default_event_source() -> String {
    "unknown".to_string()
}
