//! Weekend ingestion: JSON files, Parquet or CSV table directories and table export.
//!
//! Both on-disk formats produce the same `Vec<DriverRaceInput>`; a weekend exported with
//! [`build_tables`] and [`write_tables`] reloads to identical inputs. Every path checks
//! value ranges and rejects weekends naming a driver twice.

mod columnar;
mod export;
mod json;
mod tables;
mod validate;

pub use export::{build_tables, write_tables};
pub use json::{build_overtake, driver_inputs_from_descriptor, load_weekend_file, parse_driver_entry};
pub use tables::{
    DRIVER_BASELINE, OVERTAKES, PENALTIES, STRATEGY, TABLE_NAMES, TELEMETRY, Table, TableFormat,
    WeekendTableLoader, WeekendTables, required_columns,
};
pub use validate::{ensure_unique_drivers, validate_input};
