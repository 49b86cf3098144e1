//! Race weekend descriptors

use serde::{Deserialize, Serialize};

use super::DriverEntry;

/// A scheduled race, as listed by a provider's season schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct RaceDescriptor {
    pub season: i32,
    pub round: u32,
    pub race_name: String,
    #[serde(default)]
    pub circuit: String,
    pub slug: String,
}

/// Canonical race weekend produced by every provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct WeekendDescriptor {
    pub season: i32,
    pub round: u32,
    pub race_name: String,
    #[serde(default)]
    pub circuit: String,
    pub slug: String,
    /// Name of the provider that produced this weekend
    pub source: String,
    #[serde(default)]
    pub drivers: Vec<DriverEntry>,
}

impl WeekendDescriptor {
    pub fn new(race: RaceDescriptor, source: impl Into<String>, drivers: Vec<DriverEntry>) -> Self {
        Self {
            season: race.season,
            round: race.round,
            race_name: race.race_name,
            circuit: race.circuit,
            slug: race.slug,
            source: source.into(),
            drivers,
        }
    }

    pub fn race(&self) -> RaceDescriptor {
        RaceDescriptor {
            season: self.season,
            round: self.round,
            race_name: self.race_name.clone(),
            circuit: self.circuit.clone(),
            slug: self.slug.clone(),
        }
    }

    /// The weekend as a standalone weekend file.
    pub fn to_weekend_file(&self) -> WeekendFile {
        WeekendFile { drivers: self.drivers.clone() }
    }
}

/// On-disk JSON weekend file: `{"drivers": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
#[serde(default)]
pub struct WeekendFile {
    pub drivers: Vec<DriverEntry>,
}
