//! Canonical weekend schema
//!
//! Every data source, local file or remote provider, is reduced to the same
//! [`WeekendDescriptor`]: race identity plus one [`DriverEntry`] per classified driver.
//!
//! # Layout
//!
//! - [`weekend`]: race identity ([`RaceDescriptor`]) and the weekend container
//! - [`driver`]: per-driver pace, form, laps, strategy, penalties and overtakes

pub mod driver;
pub mod weekend;

pub use driver::{CarPaceEntry, DriverEntry, FormEntry, OvertakeEntry, StrategyEntry};
pub use weekend::{RaceDescriptor, WeekendDescriptor, WeekendFile};
