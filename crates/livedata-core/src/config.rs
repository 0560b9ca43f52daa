//! Runtime configuration.
//!
//! ```toml
//! [logging]
//! profile = "production"
//!
//! [detector]
//! validate_snapshots = true
//! track_relations = true
//! ```
//!
//! Every section and key is optional; unknown keys are rejected.

use std::path::Path;

use serde::Deserialize;

use crate::diff::ChangeDetector;
use crate::errors::{LiveDataError, Result};
use crate::logging_facility::Profile;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiveDataConfig {
    pub logging: LoggingConfig,
    pub detector: DetectorConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Reject snapshots whose changed collections repeat an id
    pub validate_snapshots: bool,
    /// Report stale embedded references
    pub track_relations: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            validate_snapshots: true,
            track_relations: true,
        }
    }
}

impl DetectorConfig {
    pub fn detector(&self) -> ChangeDetector {
        ChangeDetector::new()
            .with_validation(self.validate_snapshots)
            .with_relation_tracking(self.track_relations)
    }
}

impl LiveDataConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for malformed TOML, wrong value types or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// `ConfigIo` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LiveDataError::ConfigIo {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}
