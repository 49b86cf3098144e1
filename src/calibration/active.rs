//! Swappable handle to the calibration used for new pipelines

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::{CalibrationLoader, CalibrationProfile};
use crate::Result;
use crate::pipeline::DriveGradePipeline;

/// Owned handle to the profile an application currently scores with.
///
/// The profile is loaded lazily on first [`get`](Self::get). [`set`](Self::set) swaps it
/// atomically; pipelines built before a swap keep the profile they were built with.
/// Consumers that cache pipelines can [`subscribe`](Self::subscribe) to rebuild on swap.
#[derive(Debug)]
pub struct ActiveCalibration {
    loader: CalibrationLoader,
    profile_name: String,
    current: watch::Sender<Option<Arc<CalibrationProfile>>>,
}

impl ActiveCalibration {
    pub fn new(loader: CalibrationLoader, profile_name: impl Into<String>) -> Self {
        let (current, _) = watch::channel(None);
        Self { loader, profile_name: profile_name.into(), current }
    }

    /// A handle that starts with `profile` already loaded.
    pub fn with_profile(loader: CalibrationLoader, profile: CalibrationProfile) -> Self {
        let name = profile.name.clone();
        let (current, _) = watch::channel(Some(Arc::new(profile)));
        Self { loader, profile_name: name, current }
    }

    pub fn get(&self) -> Result<Arc<CalibrationProfile>> {
        if let Some(profile) = self.current.borrow().clone() {
            return Ok(profile);
        }

        let loaded = Arc::new(self.loader.load(&self.profile_name)?);
        let mut winner = Arc::clone(&loaded);
        // Another caller may have loaded or set a profile meanwhile; keep theirs.
        self.current.send_if_modified(|slot| match slot {
            Some(existing) => {
                winner = Arc::clone(existing);
                false
            }
            None => {
                *slot = Some(Arc::clone(&loaded));
                true
            }
        });
        Ok(winner)
    }

    pub fn set(&self, profile: CalibrationProfile) -> Arc<CalibrationProfile> {
        info!(profile = %profile.name, version = %profile.version, "Active calibration replaced");
        let profile = Arc::new(profile);
        self.current.send_replace(Some(Arc::clone(&profile)));
        profile
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CalibrationProfile>>> {
        self.current.subscribe()
    }

    /// Build a pipeline bound to the current profile.
    pub fn pipeline(&self) -> Result<DriveGradePipeline> {
        Ok(DriveGradePipeline::new(self.get()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_loads_once_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("baseline.json"), r#"{"penalty_normalizer": 6.0}"#)
            .unwrap();
        let active = ActiveCalibration::new(CalibrationLoader::new(dir.path()), "baseline");

        let first = active.get().unwrap();
        std::fs::remove_file(dir.path().join("baseline.json")).unwrap();
        let second = active.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.penalty_normalizer, 6.0);
    }

    #[test]
    fn set_does_not_touch_existing_pipelines() {
        let active = ActiveCalibration::with_profile(
            CalibrationLoader::new("unused"),
            CalibrationProfile::default(),
        );
        let before = active.pipeline().unwrap();

        let mut strict = CalibrationProfile::named("strict");
        strict.penalty_normalizer = 1.0;
        active.set(strict);

        assert_eq!(before.calibration().name, "baseline");
        assert_eq!(active.pipeline().unwrap().calibration().name, "strict");
    }

    #[tokio::test]
    async fn subscribers_observe_swaps() {
        let active = ActiveCalibration::new(CalibrationLoader::new("unused"), "baseline");
        let mut updates = active.subscribe();
        active.set(CalibrationProfile::named("wet"));
        updates.changed().await.unwrap();
        let seen = updates.borrow_and_update().clone().unwrap();
        assert_eq!(seen.name, "wet");
    }
}
