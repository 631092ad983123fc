//! jukebox-daemon: group jukebox coordination daemon.
//!
//! This binary can run in two modes:
//! - Probe mode: Print the duration of a single audio file
//! - Daemon mode: JSON-RPC server over stdin/stdout

use std::path::Path;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jukebox_daemon::cli::Cli;
use jukebox_daemon::config::JukeboxConfig;
use jukebox_daemon::rpc::{run_server, ServerState};
use jukebox_daemon::store::probe_duration;
use jukebox_daemon::sweep::Sweeper;

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays reserved for JSON-RPC responses.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    if let Some(ref path) = cli.probe {
        return run_probe_mode(path);
    }

    let config = cli.apply_to(JukeboxConfig::from_env());
    if let Some(problem) = config.validate() {
        bail!("Invalid configuration: {}", problem);
    }
    run_daemon_mode(config)
}

/// Prints the duration of one audio file.
fn run_probe_mode(path: &Path) -> anyhow::Result<()> {
    let duration = probe_duration(path)
        .with_context(|| format!("Failed to probe {}", path.display()))?;
    println!("{}\t{:.3}s", path.display(), duration.as_secs_f64());
    Ok(())
}

/// Runs the daemon mode (JSON-RPC server).
fn run_daemon_mode(config: JukeboxConfig) -> anyhow::Result<()> {
    info!(
        score_policy = config.score_policy.as_str(),
        seeded = config.seed.is_some(),
        "Starting jukebox daemon"
    );

    let state = ServerState::new(config.clone()).context("Failed to open track storage")?;

    let mut sweeper = match config.sweep_interval() {
        Some(interval) => {
            info!(interval_secs = interval.as_secs(), "Background sweep enabled");
            Some(Sweeper::spawn(
                state.registry.clone(),
                state.clock.clone(),
                interval,
            ))
        }
        None => None,
    };

    let result = run_server(state);

    if let Some(ref mut sweeper) = sweeper {
        sweeper.shutdown();
    }
    if let Err(ref e) = result {
        warn!(error = %e, "Server exited with error");
    }
    result.context("JSON-RPC server failed")
}
