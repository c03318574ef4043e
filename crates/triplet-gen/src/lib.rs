//! Sentence generation by a bidirectional weighted walk over a triplet store.
//!
//! Given a seed word:
//!
//! 1. **Anchor**: sample a token that preceded the seed, weighted by how often
//!    each predecessor was observed. A seed that never appeared as context is
//!    [`Generation::InsufficientData`].
//! 2. **Forward phase**: from the window `(anchor, seed)`, repeatedly look up the
//!    ForwardKey, sample the next token by count, slide right. Stops at END.
//! 3. **Backward phase**: from the same window, look up BackwardKeys, sample the
//!    preceding token, slide left. Stops at BEGIN.
//! 4. Both phases stop early on a missing or unsampleable record, on a repeated
//!    `(key, token)` state, or when the sentence reaches the word cap.
//!
//! All randomness comes from the caller's RNG, so a seeded RNG over a fixed
//! store state always produces the same sentence.

use std::collections::HashSet;

use rand::Rng;
use token_core::Token;
use tracing::{debug, trace};
use triplet_chain::Window;
use triplet_store::{Candidates, Direction, Key, StoreError, TripletStore};

/// Bounds a single generated sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimit {
    /// Maximum number of words in the sentence, seed included. Treated as at
    /// least 1.
    pub max_words: usize,
}

impl Default for WalkLimit {
    fn default() -> Self {
        WalkLimit { max_words: 48 }
    }
}

/// Outcome of a generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Words of the generated sentence, left to right. Never contains sentinels.
    Sentence(Vec<String>),
    /// The store knows nothing around the seed.
    InsufficientData,
}

/// Generate a sentence passing through `seed`.
pub fn generate<S, R>(
    store: &S,
    seed: &str,
    limit: &WalkLimit,
    rng: &mut R,
) -> Result<Generation, StoreError>
where
    S: TripletStore,
    R: Rng,
{
    let anchors = store.anchors(seed)?;
    let Some(anchor) = Candidates::new(anchors).and_then(|c| c.sample(rng).cloned()) else {
        debug!(seed, "no usable context for seed");
        return Ok(Generation::InsufficientData);
    };
    let seed_token = Token::word(seed);

    let mut room = limit.max_words.max(1) - 1;
    let anchor_word = match &anchor {
        Token::Word(word) if room > 0 => {
            room -= 1;
            Some(word.clone())
        }
        _ => None,
    };

    let window = Window::new(anchor, seed_token);
    let after = walk(store, Direction::Forward, window.clone(), room, rng)?;
    room -= after.len();

    let mut before = Vec::new();
    if let Some(word) = anchor_word {
        before.push(word);
        before.extend(walk(store, Direction::Backward, window, room, rng)?);
        before.reverse();
    }

    let mut words = before;
    words.push(seed.to_string());
    words.extend(after);

    debug!(seed, words = words.len(), "generated sentence");
    Ok(Generation::Sentence(words))
}

/// Walk one direction from `window`, returning at most `budget` words, nearest
/// to the window first.
fn walk<S, R>(
    store: &S,
    direction: Direction,
    mut window: Window,
    budget: usize,
    rng: &mut R,
) -> Result<Vec<String>, StoreError>
where
    S: TripletStore,
    R: Rng,
{
    let mut visited: HashSet<(Key, Token)> = HashSet::new();
    let mut words = Vec::new();

    while words.len() < budget {
        let key = window.key();
        let Some(candidates) = store.get(direction, &key)? else {
            break;
        };
        let Some(next) = candidates.sample(rng).cloned() else {
            break;
        };
        let Token::Word(word) = &next else {
            break;
        };
        if !visited.insert((key, next.clone())) {
            trace!(?direction, word = word.as_str(), "walk revisited a state");
            break;
        }

        words.push(word.clone());
        match direction {
            Direction::Forward => window.slide_forward(next),
            Direction::Backward => window.slide_backward(next),
        }
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use triplet_chain::learn;
    use triplet_store::{Candidate, MemoryStore};

    fn make_rng(s: u64) -> SmallRng {
        SmallRng::seed_from_u64(s)
    }

    fn trained(sentences: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for sentence in sentences {
            let words: Vec<&str> = sentence.split_whitespace().collect();
            learn(&mut store, &words).unwrap();
        }
        store
    }

    fn sentence(outcome: Generation) -> Vec<String> {
        match outcome {
            Generation::Sentence(words) => words,
            Generation::InsufficientData => panic!("expected a sentence"),
        }
    }

    /// Store double with hand-written records.
    #[derive(Default)]
    struct FixedStore {
        forward: HashMap<Key, Vec<Candidate>>,
        backward: HashMap<Key, Vec<Candidate>>,
        anchors: HashMap<String, Vec<Candidate>>,
    }

    impl TripletStore for FixedStore {
        fn increment(&mut self, _: Direction, _: &Key, _: &Token) -> Result<(), StoreError> {
            Ok(())
        }

        fn get(&self, direction: Direction, key: &Key) -> Result<Option<Candidates>, StoreError> {
            let table = match direction {
                Direction::Forward => &self.forward,
                Direction::Backward => &self.backward,
            };
            Ok(table.get(key).cloned().and_then(Candidates::new))
        }

        fn anchors(&self, word: &str) -> Result<Vec<Candidate>, StoreError> {
            Ok(self.anchors.get(word).cloned().unwrap_or_default())
        }

        fn starters(&self) -> Result<Vec<Candidate>, StoreError> {
            Ok(Vec::new())
        }

        fn reset(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn w(text: &str) -> Token {
        Token::word(text)
    }

    #[test]
    fn default_limit() {
        assert_eq!(WalkLimit::default().max_words, 48);
    }

    #[test]
    fn empty_store_has_insufficient_data() {
        let store = MemoryStore::new();
        let outcome = generate(&store, "hello", &WalkLimit::default(), &mut make_rng(1)).unwrap();
        assert_eq!(outcome, Generation::InsufficientData);
    }

    #[test]
    fn unknown_seed_has_insufficient_data() {
        let store = trained(&["the cat sat"]);
        let outcome = generate(&store, "dog", &WalkLimit::default(), &mut make_rng(1)).unwrap();
        assert_eq!(outcome, Generation::InsufficientData);
    }

    #[test]
    fn seed_matching_is_case_sensitive() {
        let store = trained(&["the cat sat"]);
        let outcome = generate(&store, "Cat", &WalkLimit::default(), &mut make_rng(1)).unwrap();
        assert_eq!(outcome, Generation::InsufficientData);
    }

    #[test]
    fn single_sentence_is_reproduced_from_any_seed() {
        let store = trained(&["one two three four five"]);
        for seed in ["one", "three", "five"] {
            let words = sentence(
                generate(&store, seed, &WalkLimit::default(), &mut make_rng(9)).unwrap(),
            );
            assert_eq!(words.join(" "), "one two three four five", "seed {seed}");
        }
    }

    #[test]
    fn one_word_sentence() {
        let store = trained(&["hello"]);
        let words = sentence(generate(&store, "hello", &WalkLimit::default(), &mut make_rng(2)).unwrap());
        assert_eq!(words, vec!["hello"]);
    }

    #[test]
    fn lookalike_sentinel_words_are_ordinary() {
        let store = trained(&["BEGIN here END"]);
        let words = sentence(generate(&store, "here", &WalkLimit::default(), &mut make_rng(2)).unwrap());
        assert_eq!(words, vec!["BEGIN", "here", "END"]);
    }

    #[test]
    fn generation_is_deterministic() {
        let store = trained(&[
            "the cat sat on the mat",
            "the dog sat on the rug",
            "a cat ran to the dog",
            "the mat was red",
        ]);
        let run = |s| generate(&store, "sat", &WalkLimit::default(), &mut make_rng(s)).unwrap();
        assert_eq!(run(42), run(42));
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn output_words_come_from_training() {
        let store = trained(&[
            "the cat sat on the mat",
            "the dog sat on the rug",
            "a cat ran to the dog",
        ]);
        let vocabulary: HashSet<&str> = "the cat sat on mat dog rug a ran to"
            .split(' ')
            .collect();
        for s in 0..50 {
            let words = sentence(
                generate(&store, "the", &WalkLimit::default(), &mut make_rng(s)).unwrap(),
            );
            assert!(words.iter().any(|w| w == "the"));
            for word in &words {
                assert!(vocabulary.contains(word.as_str()), "stray word {word:?}");
            }
        }
    }

    #[test]
    fn word_cap_is_respected() {
        let text: Vec<String> = (0..30).map(|i| format!("w{i}")).collect();
        let mut store = MemoryStore::new();
        learn(&mut store, &text).unwrap();

        let limit = WalkLimit { max_words: 5 };
        let words = sentence(generate(&store, "w15", &limit, &mut make_rng(3)).unwrap());
        assert_eq!(words.len(), 5);
        assert!(words.contains(&"w15".to_string()));
        // Contiguous run of the training sentence.
        let joined = words.join(" ");
        assert!(text.join(" ").contains(&joined));
    }

    #[test]
    fn cap_of_one_returns_only_the_seed() {
        let store = trained(&["a b c"]);
        let limit = WalkLimit { max_words: 1 };
        let words = sentence(generate(&store, "b", &limit, &mut make_rng(3)).unwrap());
        assert_eq!(words, vec!["b"]);
    }

    #[test]
    fn self_referential_cycle_terminates() {
        let mut store = FixedStore::default();
        store.forward.insert(Key(w("X"), w("Y")), vec![Candidate::new(w("X"), 1)]);
        store.forward.insert(Key(w("Y"), w("X")), vec![Candidate::new(w("Y"), 1)]);
        store.anchors.insert("Y".into(), vec![Candidate::new(w("X"), 1)]);

        let limit = WalkLimit { max_words: 1000 };
        let words = sentence(generate(&store, "Y", &limit, &mut make_rng(5)).unwrap());
        assert_eq!(words, vec!["X", "Y", "X", "Y"]);
    }

    #[test]
    fn cycle_in_learned_text_terminates() {
        let store = trained(&["la la la la la la la la"]);
        let limit = WalkLimit { max_words: 10_000 };
        for s in 0..20 {
            let words = sentence(generate(&store, "la", &limit, &mut make_rng(s)).unwrap());
            assert!(words.len() < 20, "walk ran away: {} words", words.len());
        }
    }

    #[test]
    fn zero_count_anchors_are_insufficient() {
        let mut store = FixedStore::default();
        store.anchors.insert("ghost".into(), vec![Candidate::new(Token::Begin, 0)]);
        let outcome = generate(&store, "ghost", &WalkLimit::default(), &mut make_rng(5)).unwrap();
        assert_eq!(outcome, Generation::InsufficientData);
    }

    #[test]
    fn zero_count_record_truncates_walk() {
        let mut store = FixedStore::default();
        store.anchors.insert("a".into(), vec![Candidate::new(Token::Begin, 1)]);
        store.forward.insert(
            Key(Token::Begin, w("a")),
            vec![Candidate::new(w("b"), 0), Candidate::new(Token::End, 0)],
        );
        let words = sentence(generate(&store, "a", &WalkLimit::default(), &mut make_rng(5)).unwrap());
        assert_eq!(words, vec!["a"]);
    }

    #[test]
    fn backward_walk_extends_left() {
        let mut store = FixedStore::default();
        store.anchors.insert("c".into(), vec![Candidate::new(w("b"), 1)]);
        store.forward.insert(Key(w("b"), w("c")), vec![Candidate::new(Token::End, 1)]);
        store.backward.insert(Key(w("b"), w("c")), vec![Candidate::new(w("a"), 1)]);
        store.backward.insert(Key(w("a"), w("b")), vec![Candidate::new(Token::Begin, 1)]);

        let words = sentence(generate(&store, "c", &WalkLimit::default(), &mut make_rng(1)).unwrap());
        assert_eq!(words, vec!["a", "b", "c"]);
    }

    #[test]
    fn weighted_anchor_choice_prefers_frequent_context() {
        let store = trained(&[
            "big cat", "big cat", "big cat", "small cat",
        ]);
        let mut big = 0;
        let mut small = 0;
        let mut rng = make_rng(11);
        for _ in 0..4000 {
            let words = sentence(generate(&store, "cat", &WalkLimit::default(), &mut rng).unwrap());
            match words[0].as_str() {
                "big" => big += 1,
                "small" => small += 1,
                other => panic!("unexpected first word {other}"),
            }
        }
        let ratio = big as f64 / small as f64;
        assert!((2.6..3.4).contains(&ratio), "ratio was {ratio}");
    }
}
