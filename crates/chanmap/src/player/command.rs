use std::process::Command;

use anyhow::bail;
use chanmap_core::ChannelNumber;
use tracing::{debug, error};

use super::Player;

const NUMBER_PLACEHOLDER: &str = "{number}";

/// Tunes by running an external program, e.g. a remote-control CLI.
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: &[String]) -> Self {
        Self {
            program: program.into(),
            args: args.to_vec(),
        }
    }

    fn command(&self, number: &ChannelNumber) -> Command {
        let mut command = Command::new(&self.program);
        command.args(
            self.args
                .iter()
                .map(|arg| arg.replace(NUMBER_PLACEHOLDER, number.as_str())),
        );

        command
    }
}

impl Player for CommandPlayer {
    fn play_channel(&self, number: &ChannelNumber) -> anyhow::Result<()> {
        let mut command = self.command(number);
        debug!(?command, "Running player command");

        let status = command.status()?;
        if !status.success() {
            error!(program = %self.program, %status, "Player command failed");
            bail!("{} exited with {}", self.program, status);
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_number() {
        let player = CommandPlayer::new("echo", &["key".to_string(), "ch{number}".to_string()]);
        let command = player.command(&ChannelNumber::from("12"));
        let args = command.get_args().collect::<Vec<_>>();

        assert_eq!(args, ["key", "ch12"]);
    }

    #[test]
    fn test_success() {
        let player = CommandPlayer::new("true", &[]);

        assert!(player.play_channel(&ChannelNumber::from("1")).is_ok());
    }

    #[test]
    fn test_failure() {
        let player = CommandPlayer::new("false", &[]);

        assert!(player.play_channel(&ChannelNumber::from("1")).is_err());
    }

    #[test]
    fn test_missing_program() {
        let player = CommandPlayer::new("/nonexistent/remote-control", &[]);

        assert!(player.play_channel(&ChannelNumber::from("1")).is_err());
    }
}
