//! Skizzobot CLI: chat with the bot on a simulated console channel.
//!
//! Thin wrapper over the `skizzobot` library crate.

mod console;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use skizzobot::{BotConfig, Brain, BrainError, Controller, MemoryStore, train_store};
use tracing::{Level, info};

use crate::console::Console;

/// Skizzobot: a chat bot that learns word triplets and babbles them back.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Brain file, overriding the configured path.
    #[arg(long)]
    brain: Option<PathBuf>,

    /// Training file, one sentence per line.
    #[arg(long)]
    train: Option<PathBuf>,

    /// PRNG seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Console channel. Default: the first configured channel.
    #[arg(long)]
    channel: Option<String>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => BotConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BotConfig::default(),
    };

    let brain_path = args.brain.clone().unwrap_or_else(|| config.brain.path.clone());
    let mut brain = load_brain(&brain_path)?;

    let channel = args
        .channel
        .clone()
        .or_else(|| config.channels.active.first().cloned())
        .unwrap_or_else(|| "#skizzo".to_string());

    if let Some(path) = &args.train {
        info!(path = %path.display(), channel = channel.as_str(), "training");
        train_store(brain.channel_mut(&channel), path)
            .with_context(|| format!("failed to train from {}", path.display()))?;
    }

    let rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let nick = config.user.nick.clone();
    let mut console = Console::new(stdin.lock(), stdout.lock(), &channel, &nick);

    let mut controller = Controller::new(config, brain, rng);
    // Whatever was learned before a transport failure is still saved.
    let session = controller.run(&mut console);

    controller
        .into_brain()
        .save(&brain_path)
        .with_context(|| format!("failed to save brain {}", brain_path.display()))?;
    session.context("console session failed")
}

/// Load the brain at `path`, starting fresh when the file does not exist.
fn load_brain(path: &Path) -> Result<Brain<MemoryStore>> {
    match Brain::load(path) {
        Ok(brain) => Ok(brain),
        Err(BrainError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no brain file, starting fresh");
            Ok(Brain::new())
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to load brain {}", path.display()))
        }
    }
}
