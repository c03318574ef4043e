//! Arena-based in-memory triplet store.
//!
//! Each table keeps its records in a contiguous `Vec<Record>` addressed by
//! `RecordRef` indices, with hash indices from key, first token and second
//! token to records. Candidates inside a record are kept sorted by [`TokenId`]
//! for binary search. Only the records are serialized; indices are rebuilt when
//! a snapshot is deserialized, and records pointing at token ids the snapshot's
//! dictionary never issued are discarded on the way in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use token_core::{BEGIN_ID, Token, TokenId};
use token_dict::TokenDict;

use crate::{Candidate, Candidates, Direction, Key, StoreError, TripletStore};

/// Handle into a table's record arena.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
struct RecordRef(u32);

impl RecordRef {
    #[inline]
    fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn from_usize(index: usize) -> Self {
        RecordRef(index as u32)
    }
}

/// One key and its candidate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    key: (TokenId, TokenId),
    /// `(candidate, count)`, sorted by candidate id.
    candidates: Vec<(TokenId, u64)>,
}

impl Record {
    fn new(key: (TokenId, TokenId)) -> Self {
        Record {
            key,
            candidates: Vec::new(),
        }
    }

    /// Count one more observation of `token`. Counts saturate at `u64::MAX`.
    fn observe(&mut self, token: TokenId) {
        match self.candidates.binary_search_by(|(id, _)| id.cmp(&token)) {
            Ok(idx) => {
                let count = &mut self.candidates[idx].1;
                *count = count.saturating_add(1);
            }
            Err(idx) => self.candidates.insert(idx, (token, 1)),
        }
    }

    fn total(&self) -> u64 {
        self.candidates
            .iter()
            .fold(0u64, |acc, &(_, count)| acc.saturating_add(count))
    }
}

#[derive(Deserialize)]
struct TableData {
    records: Vec<Record>,
}

/// One direction's records plus lookup indices.
#[derive(Debug, Clone, Default, Serialize)]
struct Table {
    records: Vec<Record>,
    #[serde(skip)]
    by_key: HashMap<(TokenId, TokenId), RecordRef>,
    #[serde(skip)]
    by_first: HashMap<TokenId, Vec<RecordRef>>,
    #[serde(skip)]
    by_second: HashMap<TokenId, Vec<RecordRef>>,
}

impl Table {
    /// Rebuild a table from snapshot records over a dictionary of `vocabulary`
    /// tokens.
    ///
    /// Records keyed by unknown ids are dropped, as are candidates with unknown
    /// ids. Candidates are re-sorted and duplicates merged. A record left
    /// without candidates, or repeating an earlier key, is dropped.
    fn restore(data: TableData, vocabulary: usize) -> Self {
        let known = |id: TokenId| id.as_usize() < vocabulary;
        let mut table = Table::default();
        for mut record in data.records {
            let (first, second) = record.key;
            if !known(first) || !known(second) || table.by_key.contains_key(&record.key) {
                continue;
            }
            record.candidates.retain(|&(id, _)| known(id));
            record.candidates.sort_by_key(|&(id, _)| id);
            record.candidates.dedup_by(|later, kept| {
                if later.0 != kept.0 {
                    return false;
                }
                kept.1 = kept.1.saturating_add(later.1);
                true
            });
            if record.candidates.is_empty() {
                continue;
            }
            table.push(record);
        }
        table
    }

    fn push(&mut self, record: Record) -> RecordRef {
        let r = RecordRef::from_usize(self.records.len());
        let (first, second) = record.key;
        self.by_key.insert(record.key, r);
        self.by_first.entry(first).or_default().push(r);
        self.by_second.entry(second).or_default().push(r);
        self.records.push(record);
        r
    }

    fn find(&self, key: (TokenId, TokenId)) -> Option<&Record> {
        self.by_key
            .get(&key)
            .map(|r| &self.records[r.as_usize()])
    }

    fn observe(&mut self, key: (TokenId, TokenId), token: TokenId) {
        let r = match self.by_key.get(&key) {
            Some(&r) => r,
            None => self.push(Record::new(key)),
        };
        self.records[r.as_usize()].observe(token);
    }

    fn with_first(&self, first: TokenId) -> impl Iterator<Item = &Record> {
        self.by_first
            .get(&first)
            .into_iter()
            .flatten()
            .map(|r| &self.records[r.as_usize()])
    }

    fn with_second(&self, second: TokenId) -> impl Iterator<Item = &Record> {
        self.by_second
            .get(&second)
            .into_iter()
            .flatten()
            .map(|r| &self.records[r.as_usize()])
    }
}

/// In-memory [`TripletStore`] with a shared token dictionary.
///
/// # Example
///
/// ```
/// use token_core::Token;
/// use triplet_store::{Direction, Key, MemoryStore, TripletStore};
///
/// let mut store = MemoryStore::new();
/// let key = Key::new(Token::word("the"), Token::word("cat"));
/// store.increment(Direction::Forward, &key, &Token::word("sat")).unwrap();
/// store.increment(Direction::Forward, &key, &Token::word("sat")).unwrap();
///
/// let candidates = store.get(Direction::Forward, &key).unwrap().unwrap();
/// assert_eq!(candidates.count_of(&Token::word("sat")), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoreData")]
pub struct MemoryStore {
    dictionary: TokenDict,
    forward: Table,
    backward: Table,
}

#[derive(Deserialize)]
struct StoreData {
    dictionary: TokenDict,
    forward: TableData,
    backward: TableData,
}

impl From<StoreData> for MemoryStore {
    fn from(data: StoreData) -> Self {
        let vocabulary = data.dictionary.len();
        MemoryStore {
            forward: Table::restore(data.forward, vocabulary),
            backward: Table::restore(data.backward, vocabulary),
            dictionary: data.dictionary,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys recorded in one table.
    pub fn key_count(&self, direction: Direction) -> usize {
        self.table(direction).records.len()
    }

    /// Number of distinct tokens seen, sentinels included.
    pub fn vocabulary(&self) -> usize {
        self.dictionary.len()
    }

    /// Whether nothing has been learned yet.
    pub fn is_empty(&self) -> bool {
        self.forward.records.is_empty() && self.backward.records.is_empty()
    }

    fn table(&self, direction: Direction) -> &Table {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }

    fn resolve_key(&self, key: &Key) -> Option<(TokenId, TokenId)> {
        Some((self.dictionary.find(&key.0)?, self.dictionary.find(&key.1)?))
    }

    fn candidate(&self, id: TokenId, count: u64) -> Candidate {
        Candidate::new(self.dictionary.resolve(id).clone(), count)
    }
}

impl TripletStore for MemoryStore {
    fn increment(
        &mut self,
        direction: Direction,
        key: &Key,
        token: &Token,
    ) -> Result<(), StoreError> {
        let first = self.dictionary.intern(&key.0);
        let second = self.dictionary.intern(&key.1);
        let id = self.dictionary.intern(token);
        let table = match direction {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
        };
        table.observe((first, second), id);
        Ok(())
    }

    fn get(&self, direction: Direction, key: &Key) -> Result<Option<Candidates>, StoreError> {
        let Some(ids) = self.resolve_key(key) else {
            return Ok(None);
        };
        let Some(record) = self.table(direction).find(ids) else {
            return Ok(None);
        };
        let entries = record
            .candidates
            .iter()
            .map(|&(id, count)| self.candidate(id, count))
            .collect();
        Ok(Candidates::new(entries))
    }

    fn anchors(&self, word: &str) -> Result<Vec<Candidate>, StoreError> {
        let Some(id) = self.dictionary.find_word(word) else {
            return Ok(Vec::new());
        };
        Ok(self
            .forward
            .with_second(id)
            .map(|record| self.candidate(record.key.0, record.total()))
            .collect())
    }

    fn starters(&self) -> Result<Vec<Candidate>, StoreError> {
        Ok(self
            .forward
            .with_first(BEGIN_ID)
            .map(|record| self.candidate(record.key.1, record.total()))
            .collect())
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        *self = MemoryStore::default();
        Ok(())
    }
}
