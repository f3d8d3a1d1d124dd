use std::sync::RwLock;

use chanmap_core::{
    ActiveChannel, ChannelNumber, ChannelRecord, ChannelSource, ResolveError, Resolved, Resolver,
    normalize,
};
use tracing::{debug, error, info};

use crate::config::{Config, MappingConfig};
use crate::options::{MappingOptions, Options, OptionsStore};
use crate::player::Players;
use crate::provider::Providers;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Mapping '{0}' not found.")]
    MappingNotFound(String),

    #[error("Channel '{0}' not found.")]
    ChannelNotFound(String),

    #[error("Player '{0}' not found.")]
    PlayerNotFound(String),

    #[error("{0:#}")]
    ProviderUnavailable(anyhow::Error),

    #[error("Channel name is empty.")]
    EmptyName,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Player '{player}' failed: {error:#}")]
    PlayerFailed {
        player: String,
        error: anyhow::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A channel as listed to the user.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelEntry {
    pub id: String,
    pub name: String,
    pub number: ChannelNumber,
    pub source: ChannelSource,
}

impl From<&ActiveChannel<'_>> for ChannelEntry {
    fn from(value: &ActiveChannel<'_>) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name.to_string(),
            number: value.number.clone(),
            source: value.source,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MappingSummary {
    pub id: String,
    pub provider: String,
    pub player: String,
    pub channels: usize,
}

/// Outcome of a successful switch: which television was tuned to what.
#[derive(Clone, Debug)]
pub struct Switched {
    pub mapping: String,
    pub player: String,
    pub channel: Resolved,
}

struct Mapping {
    config: MappingConfig,
    options: MappingOptions,
    base: Vec<ChannelRecord>,
}

impl Mapping {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn provider(&self) -> &str {
        self.options
            .provider
            .as_deref()
            .unwrap_or(self.config.provider.as_str())
    }

    fn player(&self) -> &str {
        self.options
            .player
            .as_deref()
            .unwrap_or(self.config.player.as_str())
    }

    /// Rebuilt on every call so that edits apply immediately.
    fn active(&self) -> Vec<ActiveChannel<'_>> {
        self.options.customization.active_view(&self.base)
    }

    fn is_active(&self, channel_id: &str) -> bool {
        self.active().iter().any(|channel| channel.id == channel_id)
    }
}

pub struct Workspace {
    providers: Providers,
    players: Players,
    resolver: Resolver,
    store: Option<OptionsStore>,
    mappings: RwLock<Vec<Mapping>>,
}

impl Workspace {
    pub fn new(config: &Config, players: Players) -> anyhow::Result<Self> {
        let providers = Providers::new(&config.providers_dir);
        let store = config.options_file.as_ref().map(OptionsStore::new);
        let mut stored = match &store {
            Some(store) => store.load()?,
            None => Options::default(),
        };

        let mut mappings = Vec::with_capacity(config.mappings.len());
        for mapping_config in &config.mappings {
            let options = stored
                .mappings
                .remove(&mapping_config.id)
                .unwrap_or_default();

            let mut mapping = Mapping {
                config: mapping_config.clone(),
                options,
                base: vec![],
            };

            if !players.contains(mapping.player()) {
                anyhow::bail!(
                    "Mapping {} refers to an unknown player: {}",
                    mapping.id(),
                    mapping.player(),
                );
            }

            mapping.base = providers.load(mapping.provider())?.channels;

            info!(
                mapping = mapping.id(),
                provider = mapping.provider(),
                player = mapping.player(),
                channels = mapping.active().len(),
                "Loaded a mapping",
            );

            mappings.push(mapping);
        }

        Ok(Self {
            providers,
            players,
            resolver: (&config.resolver).into(),
            store,
            mappings: RwLock::new(mappings),
        })
    }

    pub fn mappings(&self) -> Vec<MappingSummary> {
        let mappings = self.mappings.read().unwrap();

        mappings
            .iter()
            .map(|mapping| MappingSummary {
                id: mapping.id().to_string(),
                provider: mapping.provider().to_string(),
                player: mapping.player().to_string(),
                channels: mapping.active().len(),
            })
            .collect()
    }

    pub fn channels(&self, mapping_id: &str) -> Result<Vec<ChannelEntry>, WorkspaceError> {
        self.read(mapping_id, |mapping| {
            Ok(mapping.active().iter().map(ChannelEntry::from).collect())
        })
    }

    pub fn rename_channel(
        &self,
        mapping_id: &str,
        channel_id: &str,
        name: &str,
    ) -> Result<(), WorkspaceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::EmptyName);
        }

        self.edit(mapping_id, |mapping| {
            if !mapping.is_active(channel_id) {
                return Err(WorkspaceError::ChannelNotFound(channel_id.to_string()));
            }

            mapping
                .options
                .customization
                .overrides
                .insert(channel_id.to_string(), name.to_string());

            info!(mapping = mapping.id(), channel_id, name, "Renamed a channel");

            Ok(())
        })
    }

    /// Adds a user-defined channel and returns its generated id.
    pub fn add_channel(
        &self,
        mapping_id: &str,
        name: &str,
        number: ChannelNumber,
    ) -> Result<String, WorkspaceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::EmptyName);
        }

        self.edit(mapping_id, |mapping| {
            let id = loop {
                let id = format!("custom-{:08x}", rand::random::<u32>());
                let taken = mapping.base.iter().any(|channel| channel.id == id)
                    || mapping.options.customization.is_custom(&id);

                if !taken {
                    break id;
                }
            };

            info!(mapping = mapping.id(), %id, name, %number, "Added a custom channel");

            mapping
                .options
                .customization
                .custom_channels
                .push(ChannelRecord::new(id.clone(), name, number));

            Ok(id)
        })
    }

    /// Removes a custom channel outright, or hides a lineup channel.
    pub fn delete_channel(&self, mapping_id: &str, channel_id: &str) -> Result<(), WorkspaceError> {
        self.edit(mapping_id, |mapping| {
            let customization = &mut mapping.options.customization;

            if customization.is_custom(channel_id) {
                customization
                    .custom_channels
                    .retain(|channel| channel.id != channel_id);
            } else if mapping.is_active(channel_id) {
                mapping
                    .options
                    .customization
                    .deleted_channels
                    .insert(channel_id.to_string());
            } else {
                return Err(WorkspaceError::ChannelNotFound(channel_id.to_string()));
            }

            info!(mapping = mapping.id(), channel_id, "Deleted a channel");

            Ok(())
        })
    }

    /// Switches the lineup (and optionally the player) of a mapping, discarding its
    /// customization.
    pub fn select_provider(
        &self,
        mapping_id: &str,
        provider: &str,
        player: Option<&str>,
    ) -> Result<(), WorkspaceError> {
        if let Some(player) = player {
            if !self.players.contains(player) {
                return Err(WorkspaceError::PlayerNotFound(player.to_string()));
            }
        }

        let lineup = self
            .providers
            .load(provider)
            .map_err(WorkspaceError::ProviderUnavailable)?;

        self.edit(mapping_id, |mapping| {
            let player = player.unwrap_or(mapping.player()).to_string();

            mapping.base = lineup.channels;
            mapping.options = MappingOptions {
                provider: Some(provider.to_string()),
                player: Some(player),
                ..Default::default()
            };

            info!(
                mapping = mapping.id(),
                provider,
                player = mapping.player(),
                "Selected a provider",
            );

            Ok(())
        })
    }

    /// Resolves a channel name within one mapping without tuning anything.
    pub fn resolve(&self, mapping_id: &str, input: &str) -> Result<Resolved, WorkspaceError> {
        self.read(mapping_id, |mapping| {
            Ok(self.resolver.resolve(input, &mapping.active())?)
        })
    }

    /// Handles a structured request, such as a service or tool call. The name is used as is.
    pub fn switch_channel(
        &self,
        input: &str,
        mapping_id: Option<&str>,
    ) -> Result<Switched, WorkspaceError> {
        let (mapping, player, channel) = match mapping_id {
            Some(mapping_id) => self.read(mapping_id, |mapping| {
                let channel = self.resolver.resolve(input, &mapping.active())?;
                Ok((mapping.id().to_string(), mapping.player().to_string(), channel))
            })?,
            None => self.find_in_any(input)?,
        };

        self.dispatch(mapping, player, channel)
    }

    /// Handles a spoken request. A channel named exactly as heard wins; otherwise inflection is
    /// stripped from the name and every mapping is searched.
    pub fn handle_voice(&self, raw: &str) -> Result<Switched, WorkspaceError> {
        let input = normalize(raw);
        debug!(raw, cleaned = %input, "Received a voice request");

        let (mapping, player, channel) = match self.find_exact_in_any(raw) {
            Some(found) => found,
            None => self.find_in_any(&input)?,
        };

        self.dispatch(mapping, player, channel)
    }

    fn find_exact_in_any(&self, input: &str) -> Option<(String, String, Resolved)> {
        let mappings = self.mappings.read().unwrap();

        mappings.iter().find_map(|mapping| {
            let channel = self.resolver.exact(input, &mapping.active())?;
            Some((mapping.id().to_string(), mapping.player().to_string(), channel))
        })
    }

    /// Resolves against each mapping in order; the first one that knows the channel wins.
    fn find_in_any(&self, input: &str) -> Result<(String, String, Resolved), WorkspaceError> {
        let mappings = self.mappings.read().unwrap();
        let mut last_error = ResolveError::NotFound {
            input: input.trim().to_lowercase(),
        };

        for mapping in mappings.iter() {
            match self.resolver.resolve(input, &mapping.active()) {
                Ok(channel) => {
                    return Ok((mapping.id().to_string(), mapping.player().to_string(), channel));
                }
                Err(ResolveError::EmptyInput) => return Err(ResolveError::EmptyInput.into()),
                Err(err) => last_error = err,
            }
        }

        Err(last_error.into())
    }

    fn dispatch(
        &self,
        mapping: String,
        player_id: String,
        channel: Resolved,
    ) -> Result<Switched, WorkspaceError> {
        let player = self
            .players
            .get_player(&player_id)
            .ok_or_else(|| WorkspaceError::PlayerNotFound(player_id.clone()))?;

        info!(
            "Switching {} to channel {} ({})",
            player_id, channel.name, channel.number,
        );

        player
            .play_channel(&channel.number)
            .map_err(|error| WorkspaceError::PlayerFailed {
                player: player_id.clone(),
                error,
            })?;

        Ok(Switched {
            mapping,
            player: player_id,
            channel,
        })
    }

    fn read<T>(
        &self,
        mapping_id: &str,
        f: impl FnOnce(&Mapping) -> Result<T, WorkspaceError>,
    ) -> Result<T, WorkspaceError> {
        let mappings = self.mappings.read().unwrap();
        let mapping = mappings
            .iter()
            .find(|mapping| mapping.id() == mapping_id)
            .ok_or_else(|| WorkspaceError::MappingNotFound(mapping_id.to_string()))?;

        f(mapping)
    }

    fn edit<T>(
        &self,
        mapping_id: &str,
        f: impl FnOnce(&mut Mapping) -> Result<T, WorkspaceError>,
    ) -> Result<T, WorkspaceError> {
        let mut mappings = self.mappings.write().unwrap();
        let index = mappings
            .iter()
            .position(|mapping| mapping.id() == mapping_id)
            .ok_or_else(|| WorkspaceError::MappingNotFound(mapping_id.to_string()))?;

        let previous = (mappings[index].options.clone(), mappings[index].base.clone());
        let value = f(&mut mappings[index])?;

        if let Some(store) = &self.store {
            let options = Options {
                mappings: mappings
                    .iter()
                    .map(|mapping| (mapping.id().to_string(), mapping.options.clone()))
                    .collect(),
            };

            if let Err(err) = store.save(&options) {
                error!("Couldn't persist options, discarding the edit: {err:#}");
                (mappings[index].options, mappings[index].base) = previous;
                return Err(err.into());
            }
        }

        Ok(value)
    }
}
