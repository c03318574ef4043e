//! Token interning for triplet stores.
//!
//! Stores key their records by [`TokenId`] rather than by string, and those ids
//! are written into brain snapshots. That gives this dictionary three jobs a
//! plain string interner does not have:
//!
//! - the sentinels own fixed ids (`BEGIN_ID` = 0, `END_ID` = 1) in every
//!   dictionary, so a record can name a sentence edge without any reserved text;
//! - a chat word can be looked up by `&str` ([`TokenDict::find_word`]) on the
//!   hot seed-selection path without building a [`Token`];
//! - a loaded snapshot is checked before use: the sentinel slots must hold the
//!   sentinels, and the lookup index is rebuilt from the entries instead of
//!   being trusted from disk.
//!
//! Ids are positions in `entries`; `sorted_index` orders those positions by
//! token for binary search.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use token_core::{BEGIN_ID, END_ID, Token, TokenId};

/// Bidirectional `Token ↔ TokenId` map with stable, append-only ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DictData")]
pub struct TokenDict {
    entries: Vec<Token>,
    /// Positions in `entries`, ordered by token. Derived, never persisted.
    #[serde(skip)]
    sorted_index: Vec<TokenId>,
}

/// Persisted form: the entries alone.
#[derive(Deserialize)]
struct DictData {
    entries: Vec<Token>,
}

impl TryFrom<DictData> for TokenDict {
    type Error = String;

    fn try_from(data: DictData) -> Result<Self, Self::Error> {
        let entries = data.entries;
        if entries.get(BEGIN_ID.as_usize()) != Some(&Token::Begin)
            || entries.get(END_ID.as_usize()) != Some(&Token::End)
        {
            return Err("dictionary does not start with the sentence sentinels".to_string());
        }

        let mut sorted_index: Vec<TokenId> = (0..entries.len()).map(TokenId::from_usize).collect();
        sorted_index.sort_by(|&a, &b| {
            entries[a.as_usize()]
                .cmp(&entries[b.as_usize()])
                .then(a.cmp(&b))
        });
        // A repeated token keeps its first id; later copies stay resolvable
        // but are never found.
        sorted_index.dedup_by(|later, kept| entries[later.as_usize()] == entries[kept.as_usize()]);

        Ok(TokenDict {
            entries,
            sorted_index,
        })
    }
}

impl TokenDict {
    /// A dictionary holding only the two sentinels.
    pub fn new() -> Self {
        // Begin orders before End, so the index starts sorted.
        TokenDict {
            entries: vec![Token::Begin, Token::End],
            sorted_index: vec![BEGIN_ID, END_ID],
        }
    }

    fn search(&self, compare: impl Fn(&Token) -> Ordering) -> Result<usize, usize> {
        self.sorted_index
            .binary_search_by(|&id| compare(&self.entries[id.as_usize()]))
    }

    /// The id of `token`, assigning the next free one on first sight.
    pub fn intern(&mut self, token: &Token) -> TokenId {
        match self.search(|t| t.cmp(token)) {
            Ok(pos) => self.sorted_index[pos],
            Err(pos) => {
                let id = TokenId::from_usize(self.entries.len());
                self.entries.push(token.clone());
                self.sorted_index.insert(pos, id);
                id
            }
        }
    }

    pub fn find(&self, token: &Token) -> Option<TokenId> {
        self.search(|t| t.cmp(token))
            .ok()
            .map(|pos| self.sorted_index[pos])
    }

    /// Like [`find`](Self::find) for a word, without allocating a [`Token`].
    /// Sentinels never match, whatever the text.
    pub fn find_word(&self, word: &str) -> Option<TokenId> {
        self.search(|t| match t {
            Token::Word(text) => text.as_str().cmp(word),
            Token::Begin | Token::End => Ordering::Less,
        })
        .ok()
        .map(|pos| self.sorted_index[pos])
    }

    /// The token behind `id`.
    ///
    /// # Panics
    /// Panics if `id` was not issued by this dictionary. Stores validate the
    /// ids of loaded snapshots, so only ids from `intern` or `find` reach here.
    #[inline]
    pub fn resolve(&self, id: TokenId) -> &Token {
        &self.entries[id.as_usize()]
    }

    /// Number of ids issued, sentinels included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True until the first word is interned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 2
    }
}

impl Default for TokenDict {
    fn default() -> Self {
        Self::new()
    }
}
