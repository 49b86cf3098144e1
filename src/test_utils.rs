//! Test utilities for fixture resolution and canned inputs
//!
//! Used by unit tests, integration tests and benchmarks (with the `benchmark` feature).

#![cfg(any(test, feature = "benchmark"))]

use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::providers::JsonTransport;
use crate::types::{CarPaceIndex, DriverFormModifier, DriverRaceInput, StrategyPlan};

/// Guidance shown when race fixtures are missing from the checkout.
pub const FIXTURE_INSTALL_GUIDANCE: &str =
    "Race fixtures are stored under test-data/. Make sure the directory was checked out with the crate.";

/// Error returned when a required fixture cannot be located.
#[derive(Debug, Clone)]
pub struct FixtureError {
    message: String,
}

impl FixtureError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for FixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FixtureError {}

/// Require that a specific fixture exists on disk.
pub fn require_fixture<P: AsRef<Path>>(path: P) -> Result<PathBuf, FixtureError> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        Ok(path_ref.to_path_buf())
    } else {
        Err(FixtureError::new(format!(
            "Missing race fixture: {}. {}",
            path_ref.display(),
            FIXTURE_INSTALL_GUIDANCE
        )))
    }
}

/// `test-data/` of this crate, independent of the working directory.
pub fn test_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data")
}

/// Require a file or directory inside `test-data/` by relative path.
pub fn require_test_data(relative: &str) -> Result<PathBuf, FixtureError> {
    require_fixture(test_data_dir().join(relative))
}

/// A plausible driver input with a few laps scattered around `base_delta`.
pub fn sample_input(driver: &str, team: &str, base_delta: f64) -> DriverRaceInput {
    let mut input = DriverRaceInput::new(CarPaceIndex::new(driver, team, base_delta));
    input.form = DriverFormModifier::new(0.6, 0.05, 0.55);
    input.lap_deltas = [0.05, -0.1, 0.0, 0.12, -0.04, 0.08]
        .iter()
        .map(|offset| base_delta + offset)
        .collect();
    input.strategy = StrategyPlan::new(driver, vec![18, 38], vec![19, 37], 0.05)
        .unwrap_or_else(|_| StrategyPlan::empty());
    input
}

/// [`JsonTransport`] answering from canned documents keyed by URL suffix.
#[derive(Default)]
pub struct StubTransport {
    responses: Vec<(String, Value)>,
    failures: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL ends with `suffix`.
    pub fn with_response(mut self, suffix: impl Into<String>, body: Value) -> Self {
        self.responses.push((suffix.into(), body));
        self
    }

    /// Fail requests whose URL ends with `suffix`.
    pub fn failing(mut self, suffix: impl Into<String>) -> Self {
        self.failures.push(suffix.into());
        self
    }

    /// URLs requested so far, with query strings.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl JsonTransport for StubTransport {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let rendered: Vec<String> = query.iter().map(|(key, value)| format!("{key}={value}")).collect();
        self.requests.lock().push(format!("{url}?{}", rendered.join("&")));

        if self.failures.iter().any(|suffix| url.ends_with(suffix.as_str())) {
            return Err(crate::DriveGradeError::provider_failed("stub", format!("{url} unavailable")));
        }
        self.responses
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| crate::DriveGradeError::provider_failed("stub", format!("no response for {url}")))
    }
}
