use std::net::{Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::ensure;
use chanmap_core::{Resolver, SimilarityMetric};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv6Addr::LOCALHOST, 3001)),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub metric: SimilarityMetric,

    /// Minimum similarity for a fuzzy match.
    pub cutoff: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::default(),
            cutoff: Resolver::<SimilarityMetric>::DEFAULT_CUTOFF,
        }
    }
}

impl From<&ResolverConfig> for Resolver {
    fn from(value: &ResolverConfig) -> Self {
        Resolver::new(value.metric, value.cutoff)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerKind {
    Log,
    Command {
        program: String,

        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlayerConfig {
    pub id: String,

    #[serde(flatten)]
    pub kind: PlayerKind,
}

/// Binds a provider lineup to the player of one television.
#[derive(Clone, Debug, Deserialize)]
pub struct MappingConfig {
    pub id: String,
    pub provider: String,
    pub player: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default = "default_providers_dir")]
    pub providers_dir: PathBuf,

    /// Where customizations are persisted. Edits only live in memory when unset.
    pub options_file: Option<PathBuf>,

    #[serde(default)]
    pub players: Vec<PlayerConfig>,

    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

fn default_providers_dir() -> PathBuf {
    PathBuf::from("./providers")
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = std::fs::read_to_string(path)?;

        Self::parse(&file)
    }

    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(source)?;

        let cutoff = config.resolver.cutoff;
        ensure!(
            (0.0..=1.0).contains(&cutoff),
            "resolver.cutoff must be between 0 and 1, got {cutoff}",
        );

        for (i, mapping) in config.mappings.iter().enumerate() {
            ensure!(
                !config.mappings[..i].iter().any(|other| other.id == mapping.id),
                "Mapping {} is defined more than once",
                mapping.id,
            );
        }

        Ok(config)
    }
}
