//! Shitbrix game process: bootstraps a local, client or server coordinator
//! from CLI flags and drives it at the fixed 30 TPS tick rate.

use std::fs;
use std::time::Duration;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use shitbrix::config::{Config, NetworkMode};
use shitbrix::game::{GameMeta, LocalCoordinator};
use shitbrix::network::{GameServer, ServerConfig};
use shitbrix::replay::Replay;
use shitbrix::{TICK_RATE, VERSION};

#[tokio::main]
async fn main() {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install tracing subscriber");
    }

    info!("shitbrix v{VERSION}, tick rate {TICK_RATE} Hz");

    let result = match config.network_mode {
        NetworkMode::Local => run_local(&config).await,
        NetworkMode::Server => run_server(&config).await,
        NetworkMode::WithServer => run_with_server(&config).await,
        NetworkMode::Client => {
            error!("client mode requires a running server and a UI event loop; not runnable headless");
            Err(anyhow::anyhow!("client mode unsupported in this binary"))
        }
    };

    if let Err(e) = result {
        error!("fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run_local(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = &config.replay_path {
        return run_replay(path);
    }

    info!("starting local match");
    let mut coordinator = LocalCoordinator::new(GameMeta::new(rand_seed(), 2));
    coordinator.game_start();

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / TICK_RATE as f64));
    loop {
        ticker.tick().await;
        coordinator.poll();
        let next_time = coordinator.state.game_time + 1;
        coordinator.advance_to(next_time);
        if coordinator.switches.winner.is_some() {
            info!(winner = ?coordinator.switches.winner, "match over");
            break;
        }
    }

    Ok(())
}

async fn run_server(config: &Config) -> anyhow::Result<()> {
    info!(port = config.port, "starting server");
    let server_config = ServerConfig { bind_addr: config.bind_addr(), ..ServerConfig::default() };
    let meta = GameMeta::new(rand_seed(), 2);
    let server = GameServer::new(server_config, meta);
    server.run().await?;
    Ok(())
}

/// Hosts a server in the background while this process also plays a local
/// match, so a host can start a game immediately and let others join over
/// the network without running a second process.
async fn run_with_server(config: &Config) -> anyhow::Result<()> {
    info!(port = config.port, "starting server and local match together");
    let server_config = ServerConfig { bind_addr: config.bind_addr(), ..ServerConfig::default() };
    let meta = GameMeta::new(rand_seed(), 2);
    let server = GameServer::new(server_config, meta.clone());
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("server task ended: {e:#}");
        }
    });

    let mut coordinator = LocalCoordinator::new(meta);
    coordinator.game_start();

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / TICK_RATE as f64));
    loop {
        ticker.tick().await;
        coordinator.poll();
        let next_time = coordinator.state.game_time + 1;
        coordinator.advance_to(next_time);
        if coordinator.switches.winner.is_some() {
            info!(winner = ?coordinator.switches.winner, "match over");
            break;
        }
    }

    Ok(())
}

fn run_replay(path: &str) -> anyhow::Result<()> {
    info!(path, "replaying match");
    let text = fs::read_to_string(path)?;
    let replay = Replay::parse(&text)?;

    let mut coordinator = LocalCoordinator::new(replay.meta.clone());
    for input in &replay.inputs {
        coordinator.game_input(shitbrix::game::Input::Player(*input));
    }
    coordinator.game_start();

    let target_time = replay.inputs.iter().map(|i| i.game_time).max().unwrap_or(0) + 1;
    coordinator.advance_to(target_time);

    info!(final_time = coordinator.state.game_time, winner = ?coordinator.switches.winner, "replay finished");
    Ok(())
}

/// Not used when replaying (the replay's own seed governs determinism); a
/// fresh match needs some seed, and the core has no wall-clock access by
/// design, so the process boundary supplies one.
fn rand_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(1)
}
