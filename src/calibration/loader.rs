//! Resolution of calibration profiles from a store, files or defaults

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CalibrationProfile, CalibrationStore};
use crate::config::Settings;
use crate::{DriveGradeError, Result};

const PROFILE_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Loads [`CalibrationProfile`]s by name.
///
/// Lookup order: the store (if any), then `<dir>/<name>.{json,yaml,yml}` or `name` as a
/// literal path, then the default tunables under the requested name.
#[derive(Clone)]
pub struct CalibrationLoader {
    dir: PathBuf,
    store: Option<Arc<dyn CalibrationStore>>,
}

impl std::fmt::Debug for CalibrationLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationLoader")
            .field("dir", &self.dir)
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl CalibrationLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), store: None }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.calibration_dir)
    }

    pub fn with_store(mut self, store: Arc<dyn CalibrationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, name: &str) -> Result<CalibrationProfile> {
        if let Some(profile) = self.fetch_from_store(name) {
            debug!(profile = %name, "Calibration loaded from store");
            return Ok(profile);
        }

        match self.profile_path(name) {
            Some(path) => {
                debug!(profile = %name, path = %path.display(), "Calibration loaded from file");
                load_profile_file(&path, name)
            }
            None => {
                debug!(profile = %name, "No calibration file found, using defaults");
                Ok(CalibrationProfile::named(name))
            }
        }
    }

    /// Read a profile file, store it under `name` and optionally make it active.
    pub fn import_file(
        &self,
        name: &str,
        path: impl AsRef<Path>,
        activate: bool,
    ) -> Result<CalibrationProfile> {
        let store = self.store.as_ref().ok_or_else(|| {
            DriveGradeError::validation("calibration import", "no calibration store configured")
        })?;
        let mut profile = load_profile_file(path.as_ref(), name)?;
        profile.name = name.to_string();
        store.upsert(profile.clone(), activate)?;
        Ok(profile)
    }

    fn fetch_from_store(&self, name: &str) -> Option<CalibrationProfile> {
        let store = self.store.as_ref()?;
        match store.fetch(name) {
            Ok(profile) => profile,
            Err(error) => {
                warn!(profile = %name, error = %error, "Calibration store lookup failed");
                None
            }
        }
    }

    fn profile_path(&self, name: &str) -> Option<PathBuf> {
        let literal = Path::new(name);
        if literal.is_file() {
            return Some(literal.to_path_buf());
        }
        PROFILE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", name, ext)))
            .find(|candidate| candidate.is_file())
    }
}

fn load_profile_file(path: &Path, name: &str) -> Result<CalibrationProfile> {
    let text =
        std::fs::read_to_string(path).map_err(|e| DriveGradeError::file_error(path, e))?;
    let context = format!("calibration file {}", path.display());

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let mut document: serde_json::Value = if is_yaml {
        serde_yaml_ng::from_str(&text).map_err(|e| DriveGradeError::parse(&context, e))?
    } else {
        serde_json::from_str(&text).map_err(|e| DriveGradeError::parse(&context, e))?
    };

    let Some(fields) = document.as_object_mut() else {
        return Err(DriveGradeError::parse(context, "expected an object of calibration fields"));
    };
    fields
        .entry("name")
        .or_insert_with(|| serde_json::Value::String(name.to_string()));

    let profile: CalibrationProfile =
        serde_json::from_value(document).map_err(|e| DriveGradeError::parse(&context, e))?;
    profile.validate()?;
    Ok(profile)
}
