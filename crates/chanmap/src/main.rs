mod config;
mod options;
mod player;
mod provider;
mod server;
mod workspace;

use std::path::PathBuf;
use std::sync::Arc;

use bpaf::Bpaf;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::config::Config;
use crate::player::Players;
use crate::server::serve;
use crate::workspace::Workspace;

#[derive(Bpaf, Clone, Debug)]
#[bpaf(options)]
struct Options {
    /// Perform verbose logging
    #[bpaf(short, long)]
    verbose: bool,

    /// Path to the configuration file
    #[bpaf(short, long, argument("PATH"), fallback(PathBuf::from("./config.toml")))]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = options().run();

    let env_filter = EnvFilter::builder()
        .with_default_directive(
            match options.verbose {
                true => LevelFilter::TRACE,
                _ => LevelFilter::INFO,
            }
            .into(),
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    let config = Config::load_from_file(&options.config)?;

    let players = {
        let mut players = Players::default();

        for player in &config.players {
            players.add_player_from_config(player);
        }

        players
    };

    if config.mappings.is_empty() {
        warn!("No mappings are defined in the config. Every channel lookup will fail.");
    }

    let address = config.server.address;
    let state = Arc::new(Workspace::new(&config, players)?);

    serve(address, state).await
}
