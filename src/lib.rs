//! Calibratable Formula 1 driver performance grading.
//!
//! Drive Grade turns race telemetry (lap deltas, pit strategy, penalties and
//! wheel-to-wheel overtakes) into a bounded, reproducible per-driver score, and
//! reconciles several unreliable upstream data sources into one canonical weekend.
//!
//! # Features
//!
//! - **Scoring**: consistency, strategy, penalty and racecraft components combined into a
//!   total grade under an explicit, swappable calibration
//! - **Ingestion**: JSON weekend files and Parquet or CSV table directories with schema
//!   and range validation
//! - **Multi-source**: archived sessions, a real-time API and a legacy results API with
//!   ordered fallback
//! - **Seasons**: per-driver averages across races with CSV export
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drivegrade::{CalibrationProfile, DriveGradePipeline, MultiSourceFetcher, Settings};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> drivegrade::Result<()> {
//!     drivegrade::logging::init_tracing();
//!     let settings = Settings::from_env()?;
//!     let fetcher = MultiSourceFetcher::from_settings(&settings)?;
//!
//!     let weekend = fetcher.fetch_race(2024, 8).await?;
//!     let pipeline = DriveGradePipeline::new(Arc::new(CalibrationProfile::default()));
//!     for grade in &pipeline.run_weekend(&weekend)? {
//!         println!("{:>4} {:.3}", grade.driver, grade.breakdown.total_grade());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Scoring
pub mod calculator;
pub mod calibration;
pub mod pipeline;

// Data sources
pub mod ingest;
pub mod provider;
pub mod providers;
pub mod resolver;
pub mod schema;

// Runtime support
pub mod config;
pub mod logging;
pub mod season;
pub mod timeout;

// Core exports
pub use error::*;
pub use types::*;

pub use calculator::DriveGradeCalculator;
pub use calibration::{ActiveCalibration, CalibrationLoader, CalibrationProfile, CalibrationStore};
pub use config::Settings;
pub use pipeline::{DriveGradePipeline, DriverGrade, RaceGrades};
pub use provider::{LapDataProvider, LapRecord, ProviderInfo, ProviderOutcome, RaceDataProvider};
pub use resolver::{LapProviderResult, MultiSourceFetcher, resolve_lap_provider};
pub use schema::{RaceDescriptor, WeekendDescriptor};
pub use season::{DriverSeasonRow, SeasonResults, SeasonRunner, is_preseason_slug};
pub use timeout::run_with_timeout;
