//! Per-driver race inputs consumed by the scoring pipeline

use serde::Serialize;

use super::{CarPaceIndex, DriverFormModifier, OvertakeEvent, PenaltyEvent, StrategyPlan};

/// All intermediate values required to grade one driver in one race.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverRaceInput {
    pub driver: String,
    pub team: String,
    pub car_pace: CarPaceIndex,
    pub form: DriverFormModifier,
    /// Per-lap seconds versus the reference, in lap order
    pub lap_deltas: Vec<f64>,
    pub strategy: StrategyPlan,
    pub penalties: Vec<PenaltyEvent>,
    pub overtakes: Vec<OvertakeEvent>,
}

impl DriverRaceInput {
    /// Input with neutral form, no laps, no stops and no events.
    pub fn new(car_pace: CarPaceIndex) -> Self {
        Self {
            driver: car_pace.driver.clone(),
            team: car_pace.team.clone(),
            car_pace,
            form: DriverFormModifier::default(),
            lap_deltas: Vec::new(),
            strategy: StrategyPlan::empty(),
            penalties: Vec::new(),
            overtakes: Vec::new(),
        }
    }

    pub fn on_track_events(&self) -> u32 {
        self.overtakes.iter().filter(|event| event.is_on_track()).count() as u32
    }

    pub fn pit_cycle_events(&self) -> u32 {
        self.overtakes.iter().filter(|event| !event.is_on_track()).count() as u32
    }
}
