//! Persisted calibration profiles

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::CalibrationProfile;
use crate::Result;

/// Storage for named calibration profiles with a single active entry.
///
/// Implementations backed by a database or remote service return errors for I/O
/// failures; [`CalibrationLoader`](super::CalibrationLoader) logs those and falls back
/// to files.
pub trait CalibrationStore: Send + Sync {
    fn fetch(&self, name: &str) -> Result<Option<CalibrationProfile>>;

    /// Insert or replace the profile stored under `profile.name`.
    fn upsert(&self, profile: CalibrationProfile, activate: bool) -> Result<()>;

    /// Mark `name` as the only active profile. Returns `false` if it does not exist.
    fn activate(&self, name: &str) -> Result<bool>;

    fn active_name(&self) -> Result<Option<String>>;
}

#[derive(Debug, Default)]
struct StoreState {
    profiles: BTreeMap<String, CalibrationProfile>,
    active: Option<String>,
}

/// Process-local [`CalibrationStore`].
#[derive(Debug, Default)]
pub struct InMemoryCalibrationStore {
    state: RwLock<StoreState>,
}

impl InMemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().profiles.is_empty()
    }
}

impl CalibrationStore for InMemoryCalibrationStore {
    fn fetch(&self, name: &str) -> Result<Option<CalibrationProfile>> {
        Ok(self.state.read().profiles.get(name).cloned())
    }

    fn upsert(&self, profile: CalibrationProfile, activate: bool) -> Result<()> {
        let mut state = self.state.write();
        let name = profile.name.clone();
        state.profiles.insert(name.clone(), profile);
        if activate {
            state.active = Some(name);
        }
        Ok(())
    }

    fn activate(&self, name: &str) -> Result<bool> {
        let mut state = self.state.write();
        if !state.profiles.contains_key(name) {
            return Ok(false);
        }
        state.active = Some(name.to_string());
        Ok(true)
    }

    fn active_name(&self) -> Result<Option<String>> {
        Ok(self.state.read().active.clone())
    }
}
