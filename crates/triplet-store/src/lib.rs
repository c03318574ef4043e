//! Forward and backward word-triplet count tables.
//!
//! A triplet `(w1, w2, w3)` observed in chat is recorded twice: in the forward
//! table under key `(w1, w2)` with candidate `w3`, and in the backward table under
//! key `(w2, w3)` with candidate `w1`. The [`TripletStore`] trait is the seam
//! between the learning/generation engine and whatever holds the counts;
//! [`MemoryStore`] is the in-process implementation, serializable with serde.
//!
//! Counts only grow. A key that was never observed is absent, never an empty
//! distribution.

mod memory;

use rand::Rng;
use thiserror::Error;
use token_core::Token;

pub use memory::MemoryStore;

/// Which of the two tables an operation addresses.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Direction {
    /// Key `(w1, w2)`, candidates are the following token `w3`.
    Forward,
    /// Key `(w2, w3)`, candidates are the preceding token `w1`.
    Backward,
}

/// A two-token context: a ForwardKey `(w1, w2)` or a BackwardKey `(w2, w3)`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Key(pub Token, pub Token);

impl Key {
    pub fn new(first: Token, second: Token) -> Self {
        Key(first, second)
    }
}

/// One candidate token with its observation count.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Candidate {
    pub token: Token,
    pub count: u64,
}

impl Candidate {
    pub fn new(token: Token, count: u64) -> Self {
        Candidate { token, count }
    }
}

/// The candidate distribution recorded for one key.
///
/// Never empty. Candidates keep the store's order, which is stable for a given
/// store state, so sampling with a seeded RNG is reproducible.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Candidates {
    entries: Vec<Candidate>,
}

impl Candidates {
    /// Wrap a candidate list. Returns `None` for an empty list.
    pub fn new(entries: Vec<Candidate>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Candidates { entries })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded count for `token`, 0 if it is not a candidate.
    pub fn count_of(&self, token: &Token) -> u64 {
        self.entries
            .iter()
            .find(|c| &c.token == token)
            .map_or(0, |c| c.count)
    }

    /// Sum of all counts. Zero only for a corrupt record.
    pub fn total(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.count))
    }

    /// Pick a candidate with probability proportional to its count.
    ///
    /// Exact integer sampling: draws `r` uniformly from `0..total` and walks the
    /// cumulative counts. Zero-count entries can never be drawn; if no entry has a
    /// positive count the result is `None`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<&Token> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        let mut remaining = rng.random_range(0..total);
        for candidate in &self.entries {
            if remaining < candidate.count {
                return Some(&candidate.token);
            }
            remaining -= candidate.count;
        }
        None
    }
}

/// Errors raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistent mapping from two-token contexts to candidate counts.
///
/// Implementations must be read-your-writes consistent within a process: a `get`
/// after an `increment` observes it.
pub trait TripletStore {
    /// Add one observation of `token` under `key`, creating the record if needed.
    fn increment(&mut self, direction: Direction, key: &Key, token: &Token)
    -> Result<(), StoreError>;

    /// The candidates recorded for `key`, or `None` if the key was never observed.
    fn get(&self, direction: Direction, key: &Key) -> Result<Option<Candidates>, StoreError>;

    /// Tokens observed immediately before `word` (the `w1` of every forward key
    /// `(w1, word)`), each with the total count of that key. Empty when `word`
    /// never appeared as context.
    fn anchors(&self, word: &str) -> Result<Vec<Candidate>, StoreError>;

    /// Words observed as the first word of a sentence, with counts.
    fn starters(&self) -> Result<Vec<Candidate>, StoreError>;

    /// Forget everything.
    fn reset(&mut self) -> Result<(), StoreError>;

    /// A random ForwardKey `(BEGIN, w)`, weighted by how often `w` opened a
    /// sentence. `None` when nothing has been learned.
    fn random_key<R: Rng>(&self, rng: &mut R) -> Result<Option<Key>, StoreError> {
        let starters = self.starters()?;
        Ok(Candidates::new(starters)
            .and_then(|candidates| candidates.sample(rng).cloned())
            .map(|word| Key(Token::Begin, word)))
    }
}
