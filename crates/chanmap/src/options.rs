use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use chanmap_core::Customization;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-mapping state that outlives a restart.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MappingOptions {
    /// Set once the provider has been switched away from the configured one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,

    #[serde(flatten)]
    pub customization: Customization,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Options {
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingOptions>,
}

#[derive(Clone, Debug)]
pub struct OptionsStore {
    path: PathBuf,
}

impl OptionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the stored options. A file that does not exist yet is an empty store.
    pub fn load(&self) -> anyhow::Result<Options> {
        let file = match std::fs::read_to_string(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Options::default()),
            Err(err) => return Err(err.into()),
        };

        toml::from_str(&file)
            .with_context(|| format!("Invalid options file: {}", self.path.display()))
    }

    pub fn save(&self, options: &Options) -> anyhow::Result<()> {
        let file = toml::to_string_pretty(options)?;
        std::fs::write(&self.path, file)
            .with_context(|| format!("Couldn't write options file: {}", self.path.display()))?;

        debug!(path = ?self.path, "Saved options");

        Ok(())
    }
}
