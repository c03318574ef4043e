//! Per-channel stores and their persistence.
//!
//! Every channel learns into its own store, so one channel's chatter never
//! leaks into another's replies. The whole brain is saved as a single JSON
//! document.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use triplet_store::{StoreError, TripletStore};

/// Errors from loading, saving or resetting a brain.
#[derive(Error, Debug)]
pub enum BrainError {
    #[error("brain file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("brain file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One store per channel, keyed by channel name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brain<S> {
    channels: BTreeMap<String, S>,
}

impl<S> Default for Brain<S> {
    fn default() -> Self {
        Brain {
            channels: BTreeMap::new(),
        }
    }
}

impl<S> Brain<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store of `channel`, if it has learned anything yet.
    pub fn channel(&self, channel: &str) -> Option<&S> {
        self.channels.get(channel)
    }

    /// Names of all channels with a store, in order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl<S: TripletStore + Default> Brain<S> {
    /// The store of `channel`, created empty on first use.
    pub fn channel_mut(&mut self, channel: &str) -> &mut S {
        self.channels.entry(channel.to_string()).or_default()
    }

    /// Forget everything `channel` has learned. Returns whether the channel
    /// had a store.
    pub fn reset(&mut self, channel: &str) -> Result<bool, BrainError> {
        match self.channels.get_mut(channel) {
            Some(store) => {
                store.reset()?;
                info!(channel, "channel store reset");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<S: Serialize> Brain<S> {
    /// Write the brain to `path` as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), BrainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(fs::File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), channels = self.channels.len(), "brain saved");
        Ok(())
    }
}

impl<S: DeserializeOwned> Brain<S> {
    /// Read a brain written by [`Brain::save`]. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, BrainError> {
        let reader = BufReader::new(fs::File::open(path)?);
        let brain: Self = serde_json::from_reader(reader)?;
        info!(path = %path.display(), channels = brain.channels.len(), "brain loaded");
        Ok(brain)
    }
}
