//! Triplet derivation, learning, and the sliding context window.
//!
//! A sentence of words is framed as `BEGIN w1 … wn END` and cut into every
//! overlapping triple. Each triple `(a, b, c)` is written twice: forward key
//! `(a, b)` gains candidate `c`, backward key `(b, c)` gains candidate `a`. A
//! one-word sentence `W` still yields `(BEGIN, W, END)`, so even minimal input is
//! learnable.
//!
//! [`Window`] is the two-token context the generator slides along a sentence in
//! either direction.

use token_core::Token;
use tracing::debug;
use triplet_store::{Direction, Key, StoreError, TripletStore};

/// Three consecutive tokens of a framed sentence.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Triplet {
    pub left: Token,
    pub middle: Token,
    pub right: Token,
}

impl Triplet {
    /// ForwardKey `(left, middle)`.
    pub fn forward_key(&self) -> Key {
        Key(self.left.clone(), self.middle.clone())
    }

    /// BackwardKey `(middle, right)`.
    pub fn backward_key(&self) -> Key {
        Key(self.middle.clone(), self.right.clone())
    }
}

/// Surround words with the sentence sentinels.
pub fn frame<S: AsRef<str>>(words: &[S]) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(words.len() + 2);
    tokens.push(Token::Begin);
    tokens.extend(words.iter().map(|w| Token::word(w.as_ref())));
    tokens.push(Token::End);
    tokens
}

/// Every overlapping triplet of the framed sentence, left to right.
///
/// An empty word list has no sentence and yields no triplets.
pub fn triplets<S: AsRef<str>>(words: &[S]) -> Vec<Triplet> {
    if words.is_empty() {
        return Vec::new();
    }
    frame(words)
        .windows(3)
        .map(|w| Triplet {
            left: w[0].clone(),
            middle: w[1].clone(),
            right: w[2].clone(),
        })
        .collect()
}

/// Learn one sentence, returning how many triplets were recorded.
///
/// Both tables receive every triplet. Learning the same sentence again increases
/// the same counts.
pub fn learn<S, W>(store: &mut S, words: &[W]) -> Result<usize, StoreError>
where
    S: TripletStore,
    W: AsRef<str>,
{
    let triplets = triplets(words);
    for t in &triplets {
        store.increment(Direction::Forward, &t.forward_key(), &t.right)?;
        store.increment(Direction::Backward, &t.backward_key(), &t.left)?;
    }
    debug!(words = words.len(), triplets = triplets.len(), "learned sentence");
    Ok(triplets.len())
}

/// A two-token context window over a sentence being generated.
///
/// Holds `(first, second)` as they appear left to right. Walking forward looks up
/// the ForwardKey and appends on the right; walking backward looks up the
/// BackwardKey and prepends on the left. Both keys are the same pair; only the
/// table differs.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Window {
    first: Token,
    second: Token,
}

impl Window {
    pub fn new(first: Token, second: Token) -> Self {
        Window { first, second }
    }

    /// The pair to look up, in whichever table the walk is using.
    pub fn key(&self) -> Key {
        Key(self.first.clone(), self.second.clone())
    }

    /// Shift right: `(a, b)` becomes `(b, next)`.
    pub fn slide_forward(&mut self, next: Token) {
        self.first = std::mem::replace(&mut self.second, next);
    }

    /// Shift left: `(a, b)` becomes `(prior, a)`.
    pub fn slide_backward(&mut self, prior: Token) {
        self.second = std::mem::replace(&mut self.first, prior);
    }

    pub fn first(&self) -> &Token {
        &self.first
    }

    pub fn second(&self) -> &Token {
        &self.second
    }
}
