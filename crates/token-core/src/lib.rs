//! Core token type and compact token identifiers for triplet models.
//!
//! A [`Token`] is either a word observed in chat, exactly as it was typed, or one
//! of the two sentence sentinels. Sentinels are enum variants rather than reserved
//! strings, so a user typing `BEGIN` or `<END>` in a channel produces an ordinary
//! word that can never be confused with a sentence edge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unit of chat text, or a sentence boundary marker.
///
/// The derived ordering places `Begin` before `End` before every word, and words
/// compare byte-wise (case-sensitive). Dictionaries rely on this ordering for
/// their sorted index.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub enum Token {
    /// Start of a sentence.
    Begin,
    /// End of a sentence.
    End,
    /// A word as observed, punctuation included.
    Word(String),
}

impl Token {
    /// Build a word token.
    pub fn word(text: impl Into<String>) -> Self {
        Token::Word(text.into())
    }

    /// The word text, or `None` for a sentinel.
    #[inline]
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Token::Word(text) => Some(text),
            Token::Begin | Token::End => None,
        }
    }

    /// Whether this is `Begin` or `End`.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Token::Word(_))
    }
}

impl From<&str> for Token {
    fn from(text: &str) -> Self {
        Token::Word(text.to_string())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Begin => f.write_str("<begin>"),
            Token::End => f.write_str("<end>"),
            Token::Word(text) => f.write_str(text),
        }
    }
}

/// Compact identifier assigned to a token by a `TokenDict`.
///
/// IDs 0 and 1 are reserved for the sentinels.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl TokenId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a TokenId from a usize index. Panics if index > u32::MAX.
    #[inline]
    pub fn from_usize(index: usize) -> Self {
        assert!(index <= u32::MAX as usize, "TokenId overflow: {index}");
        TokenId(index as u32)
    }

    /// Convert to usize for indexing.
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Whether this is [`BEGIN_ID`] or [`END_ID`].
    #[inline]
    pub fn is_sentinel(self) -> bool {
        self == BEGIN_ID || self == END_ID
    }
}

/// Sentinel TokenId for start-of-sentence. Always ID 0.
pub const BEGIN_ID: TokenId = TokenId(0);

/// Sentinel TokenId for end-of-sentence. Always ID 1.
pub const END_ID: TokenId = TokenId(1);
