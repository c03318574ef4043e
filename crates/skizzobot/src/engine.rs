//! The conversational engine: one store, one RNG, learn first and reply second.

use std::fs;
use std::io;
use std::path::Path;

use chat_tokenizer::{detokenize, tokenize};
use rand::Rng;
use seed_select::{SeedPolicy, select_seed};
use thiserror::Error;
use tracing::{debug, info};
use triplet_chain::learn;
use triplet_gen::{Generation, WalkLimit, generate};
use triplet_store::{StoreError, TripletStore};

/// Tunables for reply generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub limit: WalkLimit,
    pub seed: SeedPolicy,
}

/// What the bot says back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A freshly generated sentence.
    Sentence(String),
    /// The model knew nothing useful, so the input line is repeated verbatim.
    Echo(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Sentence(text) | Reply::Echo(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Reply::Sentence(text) | Reply::Echo(text) => text,
        }
    }
}

/// Errors from training on a text file.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("cannot read training file: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Tokenize `line` and learn it. Returns the number of triplets recorded.
pub fn learn_line<S: TripletStore>(store: &mut S, line: &str) -> Result<usize, StoreError> {
    learn(store, &tokenize(line))
}

/// Build a reply to an already tokenized line.
///
/// Picks a seed from `words`, generates around it and falls back to echoing
/// `original` when the store cannot produce a sentence.
pub fn compose_reply<S, R>(
    store: &S,
    words: &[String],
    original: &str,
    settings: &Settings,
    rng: &mut R,
) -> Result<Reply, StoreError>
where
    S: TripletStore,
    R: Rng,
{
    let Some(seed) = select_seed(store, words, &settings.seed, rng)? else {
        debug!("no seed available, echoing");
        return Ok(Reply::Echo(original.to_string()));
    };

    match generate(store, &seed, &settings.limit, rng)? {
        Generation::Sentence(sentence) => Ok(Reply::Sentence(detokenize(&sentence))),
        Generation::InsufficientData => Ok(Reply::Echo(original.to_string())),
    }
}

/// Learn every line of a text file, one sentence per line.
///
/// Blank lines and lines starting with `#` are skipped. Returns the number of
/// lines learned.
pub fn train_store<S: TripletStore>(store: &mut S, path: &Path) -> Result<usize, TrainError> {
    let content = fs::read_to_string(path)?;
    let mut lines = 0;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        learn_line(store, trimmed)?;
        lines += 1;
    }
    info!(path = %path.display(), lines, "training complete");
    Ok(lines)
}

/// A single-store conversational engine.
///
/// Generic over the store `S` and the PRNG `R`; a seeded `SmallRng` over a fixed
/// store gives reproducible replies.
pub struct Engine<S: TripletStore, R: Rng> {
    store: S,
    rng: R,
    settings: Settings,
}

impl<S: TripletStore, R: Rng> Engine<S, R> {
    pub fn new(store: S, rng: R) -> Self {
        Engine {
            store,
            rng,
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Learn from a line without replying.
    pub fn learn(&mut self, line: &str) -> Result<usize, StoreError> {
        learn_line(&mut self.store, line)
    }

    /// Generate a sentence through `seed`.
    pub fn generate(&mut self, seed: &str) -> Result<Generation, StoreError> {
        generate(&self.store, seed, &self.settings.limit, &mut self.rng)
    }

    /// Learn from a line, then reply to it.
    pub fn respond(&mut self, line: &str) -> Result<Reply, StoreError> {
        let words = tokenize(line);
        learn(&mut self.store, &words)?;
        compose_reply(&self.store, &words, line, &self.settings, &mut self.rng)
    }

    /// Train from a text file (one sentence per line).
    pub fn train_from_file(&mut self, path: &Path) -> Result<usize, TrainError> {
        train_store(&mut self.store, path)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
