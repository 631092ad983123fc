//! CLI argument parser.
//!
//! Command-line flags override the `JUKEBOX_*` environment configuration.
//! `--probe` runs a standalone duration check without starting the server.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{JukeboxConfig, ScorePolicy};

/// Score behavior on rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScorePolicyArg {
    /// Leave scores untouched when the track changes
    Keep,
    /// Set every member's score to 0 when the track changes
    Reset,
}

impl From<ScorePolicyArg> for ScorePolicy {
    fn from(arg: ScorePolicyArg) -> Self {
        match arg {
            ScorePolicyArg::Keep => ScorePolicy::Keep,
            ScorePolicyArg::Reset => ScorePolicy::Reset,
        }
    }
}

/// jukebox-daemon: group jukebox coordination over JSON-RPC
#[derive(Parser, Debug)]
#[command(name = "jukebox-daemon")]
#[command(about = "Group jukebox coordination daemon with score-based playlist rotation")]
#[command(version)]
pub struct Cli {
    /// Directory holding one catalog directory per device
    #[arg(short = 'd', long)]
    pub storage_dir: Option<PathBuf>,

    /// What happens to member scores when a new track starts
    #[arg(long, value_enum)]
    pub score_policy: Option<ScorePolicyArg>,

    /// Seed for reproducible track selection
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Refresh every group on this interval (seconds) instead of only on reads
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval: Option<u64>,

    /// Print the duration of an audio file and exit
    #[arg(long, value_name = "FILE")]
    pub probe: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true if running the standalone probe instead of the server.
    pub fn is_probe_mode(&self) -> bool {
        self.probe.is_some()
    }

    /// Applies command-line overrides on top of `config`.
    pub fn apply_to(&self, mut config: JukeboxConfig) -> JukeboxConfig {
        if let Some(ref dir) = self.storage_dir {
            config.storage_path = Some(dir.clone());
        }
        if let Some(policy) = self.score_policy {
            config.score_policy = policy.into();
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(interval) = self.sweep_interval {
            config.sweep_interval_secs = Some(interval);
        }
        config
    }
}
