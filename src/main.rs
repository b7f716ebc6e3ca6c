use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use kalah_agent::{
    agent_provider::AgentProvider,
    agents::kalah_dqn::KalahDqnProvider,
    session::{run_session, GameOptions},
};
use std::error::Error;
use tracing::info;

const AGENT_PATH: &str = "agents/kalah-dqn";

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the protocol
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    init_tracing();

    let config = Figment::new()
        .merge(Toml::file(format!("{AGENT_PATH}/config.toml")))
        .merge(Env::prefixed("KALAH_").split("__"));
    let game = GameOptions::extract(&config)?;

    let provider = KalahDqnProvider;
    let mut agent = provider.create_agent(&config)?;
    info!(agent = %provider.name(), holes = game.holes, "waiting for the game server");

    let summary = run_session(
        agent.as_mut(),
        game,
        std::io::stdin().lock(),
        std::io::stdout(),
    )?;

    info!(
        moves_sent = summary.moves_sent,
        finished = summary.finished,
        "session closed"
    );

    Ok(())
}
