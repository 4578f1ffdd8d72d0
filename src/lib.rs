//! # 🐕 Dachound: Double-Array Aho-Corasick over UTF-16
//!
//! A multi-pattern string matcher implementing the Aho-Corasick algorithm
//! on top of the double-array trie encoding of Aoe. Transitions are
//! constant-time lookups into two parallel integer arrays, so scanning is
//! a single cache-friendly left-to-right pass that reports every
//! occurrence of every pattern, including overlapping ones.
//!
//! Patterns and haystacks are treated as sequences of UTF-16 code units;
//! all reported positions are code-unit offsets.
//!
//! ## Examples
//!
//! ```
//! use dachound::AhoCorasickDoubleArrayTrie;
//!
//! let patterns = vec!["he", "she", "his", "hers"];
//! let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();
//!
//! let mut it = pma.find_overlapping_iter("ushers");
//!
//! let m = it.next().unwrap();
//! assert_eq!((1, 4, 1), (m.begin(), m.end(), m.pattern()));
//!
//! let m = it.next().unwrap();
//! assert_eq!((2, 4, 0), (m.begin(), m.end(), m.pattern()));
//!
//! let m = it.next().unwrap();
//! assert_eq!((2, 6, 3), (m.begin(), m.end(), m.pattern()));
//!
//! assert_eq!(None, it.next());
//! ```
//!
//! Patterns can carry typed values, which are reported with each hit and
//! survive serialization:
//!
//! ```
//! use dachound::AhoCorasickDoubleArrayTrie;
//!
//! let patvals = vec![("five", 5i32), ("six", 6i32)];
//! let pma = AhoCorasickDoubleArrayTrie::with_values(patvals).unwrap();
//!
//! let hit = pma.find_first("high five").unwrap();
//! assert_eq!(Some(&5), hit.value());
//! ```

mod builder;
pub mod errors;
pub mod iter;
mod serializer;
mod utils;

use core::fmt;
use core::mem;

pub use builder::AhoCorasickDoubleArrayTrieBuilder;
pub use serializer::SerializableValue;

use errors::{DachoundError, Result};
use iter::FindOverlappingIterator;
use utils::to_upper_code_unit;

// The root state index.
pub(crate) const ROOT_STATE_IDX: usize = 0;
// Trailing BASE/CHECK slots kept after compaction so that `base[s] + c + 1`
// stays in range for any code unit `c`.
pub(crate) const TAIL_PADDING: usize = 65535;

/// Match result: one occurrence of one pattern.
///
/// `begin` is inclusive and `end` is exclusive, both in UTF-16 code units.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Hit<'a, V> {
    pub(crate) begin: usize,
    pub(crate) end: usize,
    pub(crate) index: usize,
    pub(crate) value: Option<&'a V>,
}

impl<'a, V> Hit<'a, V> {
    /// Starting position of the match.
    #[inline(always)]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// Ending position of the match.
    #[inline(always)]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Length of the match in code units.
    #[inline(always)]
    pub const fn length(&self) -> usize {
        self.end - self.begin
    }

    /// Pattern index, i.e. the position of the pattern in insertion order.
    #[inline(always)]
    pub const fn pattern(&self) -> usize {
        self.index
    }

    /// Value associated with the pattern, or [`None`] when the automaton
    /// carries no values.
    #[inline(always)]
    pub const fn value(&self) -> Option<&'a V> {
        self.value
    }
}

impl<'a, V> fmt::Display for Hit<'a, V>
where
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "[{}:{}]={}", self.begin, self.end, value),
            None => write!(f, "[{}:{}]", self.begin, self.end),
        }
    }
}

/// Pattern match automaton implemented with the Aho-Corasick algorithm and
/// the double-array trie.
///
/// The automaton is deeply immutable once built and can be shared across
/// threads freely. It is created with [`AhoCorasickDoubleArrayTrieBuilder`]
/// or one of the convenience constructors, and persisted with
/// [`save`](Self::save)/[`load`](Self::load).
#[derive(Clone, PartialEq)]
pub struct AhoCorasickDoubleArrayTrie<V> {
    pub(crate) base: Vec<i32>,
    pub(crate) check: Vec<i32>,
    pub(crate) fail: Vec<u32>,
    pub(crate) output: Vec<Option<Box<[u32]>>>,
    pub(crate) key_lengths: Vec<u32>,
    pub(crate) values: Option<Vec<V>>,
    pub(crate) ignore_case: bool,
}

impl AhoCorasickDoubleArrayTrie<u32> {
    /// Creates a new [`AhoCorasickDoubleArrayTrie`] from input patterns.
    /// The value `i` is automatically associated with `patterns[i]`.
    ///
    /// # Arguments
    ///
    /// * `patterns` - List of patterns.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when
    ///   - `patterns` contains entries of length zero, or
    ///   - the scale of the resulting automaton exceeds the expected one.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let patterns = vec!["foo", "bar"];
    /// let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();
    ///
    /// let hits = pma.parse("foobar");
    /// assert_eq!(2, hits.len());
    /// ```
    pub fn new<I, P>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut builder = AhoCorasickDoubleArrayTrieBuilder::new(false);
        for (i, pattern) in patterns.into_iter().enumerate() {
            let value = u32::try_from(i)
                .map_err(|_| DachoundError::automaton_scale("pattern index must fit in u32"))?;
            builder.add(pattern.as_ref(), value)?;
        }
        builder.build()
    }
}

impl<V> AhoCorasickDoubleArrayTrie<V> {
    /// Creates a new [`AhoCorasickDoubleArrayTrie`] from input
    /// pattern-value pairs.
    ///
    /// # Arguments
    ///
    /// * `patvals` - List of pattern-value pairs.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when
    ///   - `patvals` contains patterns of length zero, or
    ///   - the scale of the resulting automaton exceeds the expected one.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let patvals = vec![("he", 'h'), ("she", 's')];
    /// let pma = AhoCorasickDoubleArrayTrie::with_values(patvals).unwrap();
    ///
    /// assert_eq!(Some(&'s'), pma.get("she"));
    /// ```
    pub fn with_values<I, P>(patvals: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<str>,
    {
        let mut builder = AhoCorasickDoubleArrayTrieBuilder::new(false);
        builder.add_all(patvals)?;
        builder.build()
    }

    /// Returns the number of patterns in the automaton.
    #[must_use]
    pub fn num_patterns(&self) -> usize {
        self.key_lengths.len()
    }

    /// Returns `true` when the automaton was built with case-insensitive
    /// matching.
    #[must_use]
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Returns the value of the pattern with the given index.
    ///
    /// Returns [`None`] when the automaton carries no values, which happens
    /// after loading a stream written with `save_values = false` and no
    /// restore function.
    ///
    /// # Panics
    ///
    /// Panics when `index >= self.num_patterns()` and values are present.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&V> {
        self.values.as_ref().map(|values| &values[index])
    }

    /// Searches the exact pattern equal to `key`, returning its pattern
    /// index.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let patterns = vec!["he", "she"];
    /// let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();
    ///
    /// assert_eq!(Some(1), pma.exact_match("she"));
    /// assert_eq!(None, pma.exact_match("sh"));
    /// ```
    #[must_use]
    pub fn exact_match(&self, key: &str) -> Option<usize> {
        let mut b = self.base[ROOT_STATE_IDX];
        for c in key.encode_utf16() {
            let c = self.fold(c);
            let p = b as usize + usize::from(c) + 1;
            match self.check.get(p) {
                Some(&chk) if chk == b => b = self.base[p],
                _ => return None,
            }
        }
        // The terminal slot sits at offset 0 of the block and stores the
        // negated pattern index.
        let p = b as usize;
        match self.check.get(p) {
            Some(&chk) if chk == b && self.base[p] < 0 => Some((-self.base[p] - 1) as usize),
            _ => None,
        }
    }

    /// Returns the value of the exact pattern equal to `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.exact_match(key).and_then(|i| self.value_at(i))
    }

    /// Scans `text` and collects every match, including overlapping ones.
    ///
    /// Hits are reported in increasing order of their ending position.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let patterns = vec!["he", "hers"];
    /// let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();
    ///
    /// let hits = pma.parse("uhers");
    /// assert_eq!(2, hits.len());
    /// assert_eq!((1, 3, 0), (hits[0].begin(), hits[0].end(), hits[0].pattern()));
    /// assert_eq!((1, 5, 1), (hits[1].begin(), hits[1].end(), hits[1].pattern()));
    /// ```
    #[must_use]
    pub fn parse<'a>(&'a self, text: &'a str) -> Vec<Hit<'a, V>> {
        self.find_overlapping_iter(text).collect()
    }

    /// Scans `text` and invokes `visitor` for every match.
    ///
    /// The scan stops as soon as `visitor` returns `false`; no further
    /// hits are reported.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let patterns = vec!["foo", "bar"];
    /// let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();
    ///
    /// let mut first = None;
    /// pma.parse_with("wtfoowbar", |hit| {
    ///     first = Some((hit.begin(), hit.end()));
    ///     false
    /// });
    /// assert_eq!(Some((2, 5)), first);
    /// ```
    pub fn parse_with<F>(&self, text: &str, mut visitor: F)
    where
        F: FnMut(Hit<V>) -> bool,
    {
        for hit in self.find_overlapping_iter(text) {
            if !visitor(hit) {
                return;
            }
        }
    }

    /// Scans `length` code units of `units` starting at `start` and invokes
    /// `visitor` for every match.
    ///
    /// Reported positions are absolute offsets into `units`.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when `start + length` overflows or
    /// exceeds the buffer.
    pub fn parse_slice<F>(
        &self,
        units: &[u16],
        start: usize,
        length: usize,
        mut visitor: F,
    ) -> Result<()>
    where
        F: FnMut(Hit<V>) -> bool,
    {
        let end = start
            .checked_add(length)
            .filter(|&end| end <= units.len())
            .ok_or_else(|| {
                DachoundError::invalid_argument(
                    "length",
                    format!("start + length must be within a buffer of {} units", units.len()),
                )
            })?;
        let it = FindOverlappingIterator {
            pma: self,
            haystack: units[start..end].iter().copied().enumerate(),
            offset: start,
            state: ROOT_STATE_IDX,
            end: 0,
            pending: &[],
        };
        for hit in it {
            if !visitor(hit) {
                break;
            }
        }
        Ok(())
    }

    /// Returns `true` when at least one pattern occurs in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.find_overlapping_iter(text).next().is_some()
    }

    /// Returns the first hit in `text` by ending position, or [`None`].
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrie;
    ///
    /// let patterns = vec!["space", "keyword", "ch"];
    /// let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();
    ///
    /// let hit = pma.find_first("oooospace2").unwrap();
    /// assert_eq!((4, 9, 0), (hit.begin(), hit.end(), hit.pattern()));
    /// ```
    #[must_use]
    pub fn find_first<'a>(&'a self, text: &'a str) -> Option<Hit<'a, V>> {
        self.find_overlapping_iter(text).next()
    }

    /// Returns an iterator of overlapping matches in the given haystack.
    pub fn find_overlapping_iter<'a>(
        &'a self,
        haystack: &'a str,
    ) -> FindOverlappingIterator<'a, core::str::EncodeUtf16<'a>, V> {
        FindOverlappingIterator {
            pma: self,
            haystack: haystack.encode_utf16().enumerate(),
            offset: 0,
            state: ROOT_STATE_IDX,
            end: 0,
            pending: &[],
        }
    }

    /// Returns an iterator of overlapping matches in the given code-unit
    /// iterator.
    pub fn find_overlapping_iter_from_iter<I>(
        &self,
        haystack: I,
    ) -> FindOverlappingIterator<'_, I, V>
    where
        I: Iterator<Item = u16>,
    {
        FindOverlappingIterator {
            pma: self,
            haystack: haystack.enumerate(),
            offset: 0,
            state: ROOT_STATE_IDX,
            end: 0,
            pending: &[],
        }
    }

    /// Returns the total amount of heap used by this automaton in bytes,
    /// not counting heap owned by the values themselves.
    #[must_use]
    pub fn heap_bytes(&self) -> usize {
        self.base.len() * mem::size_of::<i32>()
            + self.check.len() * mem::size_of::<i32>()
            + self.fail.len() * mem::size_of::<u32>()
            + self
                .output
                .iter()
                .map(|out| {
                    mem::size_of::<Option<Box<[u32]>>>()
                        + out.as_ref().map_or(0, |l| l.len() * mem::size_of::<u32>())
                })
                .sum::<usize>()
            + self.key_lengths.len() * mem::size_of::<u32>()
            + self.values.as_ref().map_or(0, |v| v.len() * mem::size_of::<V>())
    }

    #[inline(always)]
    pub(crate) fn fold(&self, c: u16) -> u16 {
        if self.ignore_case {
            to_upper_code_unit(c)
        } else {
            c
        }
    }

    /// Follows the edge labeled `c` out of `state`, or returns [`None`]
    /// when the double array has no such edge.
    #[inline(always)]
    fn transition(&self, state: usize, c: u16) -> Option<usize> {
        let b = self.base[state];
        let p = b as usize + usize::from(c) + 1;
        match self.check.get(p) {
            Some(&chk) if chk == b => Some(p),
            _ => None,
        }
    }

    /// Advances the automaton by one code unit, following failure links
    /// until a transition succeeds. The root consumes every unit.
    #[inline(always)]
    pub(crate) fn next_state(&self, mut state: usize, c: u16) -> usize {
        loop {
            if let Some(next) = self.transition(state, c) {
                return next;
            }
            if state == ROOT_STATE_IDX {
                return ROOT_STATE_IDX;
            }
            state = self.fail[state] as usize;
        }
    }

    #[inline(always)]
    pub(crate) fn hit(&self, index: usize, end: usize) -> Hit<'_, V> {
        Hit {
            begin: end - self.key_lengths[index] as usize,
            end,
            index,
            value: self.values.as_ref().map(|values| &values[index]),
        }
    }
}
