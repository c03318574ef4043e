//! Skizzobot, a chat bot that learns word triplets and babbles them back.
//!
//! This is the facade crate that wires together the lower-level components:
//! - [`token_core`]: Token type with out-of-band sentence sentinels
//! - [`triplet_store`]: Store trait, sampling and the in-memory backend
//! - [`chat_tokenizer`]: Chat line tokenization
//! - [`triplet_chain`]: Triplet derivation and learning
//! - [`seed_select`]: Seed word selection
//! - [`triplet_gen`]: Bidirectional sentence generation
//!
//! On top of those it provides the [`Engine`] (one store, learn-then-reply),
//! the per-channel [`Brain`], the TOML [`BotConfig`] and the event-driven
//! [`Controller`].
//!
//! # Quick Start
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//! use skizzobot::{Engine, MemoryStore};
//!
//! let mut bot = Engine::new(MemoryStore::new(), SmallRng::seed_from_u64(42));
//! bot.learn("the cat sat on the mat").unwrap();
//! let reply = bot.respond("tell me about the cat").unwrap();
//! println!("{}", reply.text());
//! ```

pub mod brain;
pub mod config;
pub mod controller;
pub mod engine;

pub use brain::{Brain, BrainError};
pub use config::{BotConfig, ConfigError};
pub use controller::{
    Action, Controller, Event, ModeChange, Transport, TransportError, parse_channel_modes,
};
pub use engine::{Engine, Reply, Settings, TrainError, compose_reply, learn_line, train_store};

// Re-export types that consumers (like the CLI) need.
pub use chat_tokenizer::{detokenize, strip_address, tokenize};
pub use seed_select::{SeedPolicy, TieBreak};
pub use token_core::Token;
pub use triplet_gen::{Generation, WalkLimit};
pub use triplet_store::{Direction, Key, MemoryStore, StoreError, TripletStore};
