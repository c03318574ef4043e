//! Seed word selection for reply generation.
//!
//! A reply should stay on topic, so the seed is preferably a word from the line
//! being answered that the store already knows as context. Selection works in
//! two stages:
//!
//! 1. **Topical**: with probability [`SeedPolicy::topical_chance`], collect the
//!    line's words that are not ignored and have at least one anchor in the
//!    store, and pick one according to [`TieBreak`].
//! 2. **Random**: otherwise, or if no word qualified, take the second word of
//!    [`TripletStore::random_key`], i.e. a word that has opened a sentence.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use triplet_store::{StoreError, TripletStore};

/// How to choose among several known words of the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Every known word is equally likely.
    #[default]
    Uniform,
    /// The word observed least often wins; ties are broken uniformly. Rare
    /// words tend to carry the topic of a line.
    Rarest,
}

/// Seed selection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedPolicy {
    /// Probability of trying a topical seed at all, clamped to `0.0..=1.0`.
    pub topical_chance: f64,
    pub tie_break: TieBreak,
    /// Words never used as seeds (typically the bot's own nick).
    pub ignored: HashSet<String>,
}

impl Default for SeedPolicy {
    fn default() -> Self {
        SeedPolicy {
            topical_chance: 1.0,
            tie_break: TieBreak::Uniform,
            ignored: HashSet::new(),
        }
    }
}

/// Choose a seed word for a reply to `words`.
///
/// Returns `None` only when the line offers no known word and the store has no
/// sentence starters, i.e. nothing has been learned.
pub fn select_seed<S, R>(
    store: &S,
    words: &[String],
    policy: &SeedPolicy,
    rng: &mut R,
) -> Result<Option<String>, StoreError>
where
    S: TripletStore,
    R: Rng,
{
    let chance = if policy.topical_chance.is_nan() {
        0.0
    } else {
        policy.topical_chance.clamp(0.0, 1.0)
    };
    if !words.is_empty() && rng.random_bool(chance) {
        if let Some(word) = topical_seed(store, words, policy, rng)? {
            return Ok(Some(word));
        }
    }

    Ok(store
        .random_key(rng)?
        .and_then(|key| key.1.as_word().map(str::to_string)))
}

/// A known, non-ignored word of the line, or `None`.
fn topical_seed<S, R>(
    store: &S,
    words: &[String],
    policy: &SeedPolicy,
    rng: &mut R,
) -> Result<Option<String>, StoreError>
where
    S: TripletStore,
    R: Rng,
{
    let mut seen = HashSet::new();
    let mut known: Vec<(&String, u64)> = Vec::new();

    for word in words {
        if policy.ignored.contains(word) || !seen.insert(word) {
            continue;
        }
        let anchors = store.anchors(word)?;
        if anchors.is_empty() {
            continue;
        }
        let occurrences = anchors
            .iter()
            .fold(0u64, |acc, a| acc.saturating_add(a.count));
        known.push((word, occurrences));
    }

    let pool: Vec<&String> = match policy.tie_break {
        TieBreak::Uniform => known.iter().map(|&(w, _)| w).collect(),
        TieBreak::Rarest => {
            let Some(fewest) = known.iter().map(|&(_, n)| n).min() else {
                return Ok(None);
            };
            known
                .iter()
                .filter(|&&(_, n)| n == fewest)
                .map(|&(w, _)| w)
                .collect()
        }
    };

    Ok(pool.choose(rng).map(|w| (*w).clone()))
}
