use chanmap_core::ChannelNumber;
use tracing::warn;

use super::Player;

/// A player without a device behind it.
pub struct LogPlayer {
    id: String,
}

impl LogPlayer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Player for LogPlayer {
    fn play_channel(&self, number: &ChannelNumber) -> anyhow::Result<()> {
        warn!(player = %self.id, %number, "This player does not support tuning.");
        Ok(())
    }
}
