mod command;
mod log;

use std::collections::BTreeMap;
use std::sync::Arc;

use chanmap_core::ChannelNumber;

use crate::config::{PlayerConfig, PlayerKind};

/// The device a mapping tunes. Implementations own their retry and failure semantics.
pub trait Player: Send + Sync {
    fn play_channel(&self, number: &ChannelNumber) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct Players {
    players: BTreeMap<String, Arc<dyn Player>>,
}

impl Players {
    pub fn get_player(&self, id: &str) -> Option<Arc<dyn Player>> {
        self.players.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn add_player<P: Player + 'static>(&mut self, id: impl Into<String>, player: P) {
        self.players.insert(id.into(), Arc::new(player));
    }

    pub fn add_player_from_config(&mut self, config: &PlayerConfig) {
        match &config.kind {
            PlayerKind::Log => {
                self.add_player(&config.id, log::LogPlayer::new(&config.id));
            }

            PlayerKind::Command { program, args } => {
                self.add_player(&config.id, command::CommandPlayer::new(program, args));
            }
        }
    }
}
