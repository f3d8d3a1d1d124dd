use std::path::{Path, PathBuf};

use anyhow::Context;
use chanmap_core::ChannelRecord;
use serde::Deserialize;
use tracing::debug;

#[derive(Clone, Debug, Deserialize)]
pub struct Lineup {
    pub channels: Vec<ChannelRecord>,
}

/// Directory of provider lineups, one `<slug>.json` file per provider.
#[derive(Clone, Debug)]
pub struct Providers {
    dir: PathBuf,
}

impl Providers {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// "HU One" is stored as `hu_one.json`.
    pub fn path(&self, provider: &str) -> PathBuf {
        let slug = provider.to_lowercase().replace(' ', "_");
        self.dir.join(format!("{slug}.json"))
    }

    pub fn load(&self, provider: &str) -> anyhow::Result<Lineup> {
        let path = self.path(provider);
        debug!(?path, provider, "Loading lineup");

        Lineup::load_from_file(&path)
    }
}

impl Lineup {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::read_to_string(path)
            .with_context(|| format!("Provider data file not found: {}", path.display()))?;
        let lineup = serde_json::from_str(&file)
            .with_context(|| format!("Invalid JSON in provider data file: {}", path.display()))?;

        Ok(lineup)
    }
}
