//! Builder of [`AhoCorasickDoubleArrayTrie`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::errors::{DachoundError, Result};
use crate::utils::to_upper_code_unit;
use crate::{AhoCorasickDoubleArrayTrie, ROOT_STATE_IDX, TAIL_PADDING};

// The root node id of the temporary trie.
const ROOT_NODE_ID: u32 = 0;
// The initial number of BASE/CHECK slots allocated for construction.
const INIT_CAPACITY: usize = 65536 * 32;
// The hard limit on BASE/CHECK slots: 95% of i32::MAX.
const CAPACITY_LIMIT: usize = 2_040_109_464;
// Free-slot scans whose miss ratio reaches this threshold make the scanned
// region permanently skipped.
const DENSITY_THRESHOLD: f64 = 0.95;

/// Node of the temporary trie built during pattern insertion.
///
/// The arena owns every node; `failure` back-references are arena indices,
/// so the trie forms no ownership cycles and is dropped as a whole once
/// the flat arrays are materialized.
struct Node {
    depth: u32,
    success: BTreeMap<u16, u32>,
    emits: BTreeSet<u32>,
    failure: u32,
    index: u32,
}

impl Node {
    fn new(depth: u32) -> Self {
        Self {
            depth,
            success: BTreeMap::new(),
            emits: BTreeSet::new(),
            failure: ROOT_NODE_ID,
            index: 0,
        }
    }

    /// A node is accepting iff it is not the root and a pattern terminates
    /// at it.
    fn is_acceptable(&self) -> bool {
        self.depth > 0 && !self.emits.is_empty()
    }

    fn largest_emit(&self) -> Option<u32> {
        self.emits.iter().next_back().copied()
    }
}

/// One entry of a sibling group: a real child edge, or the synthetic
/// terminator edge at offset 0 recording an accepting parent.
#[derive(Clone, Copy)]
enum Sibling {
    Node(u32),
    Terminator(u32),
}

type SiblingGroup = Vec<(u32, Sibling)>;

/// Builder of [`AhoCorasickDoubleArrayTrie`].
///
/// Patterns are inserted one by one into a temporary pointer trie, which
/// [`build`](Self::build) encodes into the double array, resolves failure
/// links over, and discards. `build` consumes the builder, so an automaton
/// can never observe later mutation.
///
/// # Examples
///
/// ```
/// use dachound::AhoCorasickDoubleArrayTrieBuilder;
///
/// let mut builder = AhoCorasickDoubleArrayTrieBuilder::new(false);
/// builder.add("he", 0).unwrap();
/// builder.add("hers", 1).unwrap();
/// let pma = builder.build().unwrap();
///
/// let hits = pma.parse("uhers");
/// assert_eq!(2, hits.len());
/// ```
pub struct AhoCorasickDoubleArrayTrieBuilder<V> {
    nodes: Vec<Node>,
    key_lengths: Vec<u32>,
    values: Vec<V>,
    ignore_case: bool,
    base: Vec<i32>,
    check: Vec<i32>,
    used: Vec<bool>,
    size: usize,
    progress: usize,
    next_check_pos: usize,
}

impl<V> AhoCorasickDoubleArrayTrieBuilder<V> {
    /// Creates a new [`AhoCorasickDoubleArrayTrieBuilder`].
    ///
    /// # Arguments
    ///
    /// * `ignore_case` - When `true`, patterns and haystacks are mapped
    ///   code-unit-wise to their invariant upper-case form. The flag
    ///   freezes at construction and is remembered by the built automaton
    ///   and its serialized form.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrieBuilder;
    ///
    /// let mut builder = AhoCorasickDoubleArrayTrieBuilder::new(true);
    /// builder.add("doLor", "0").unwrap();
    /// builder.add("iT", "1").unwrap();
    /// let pma = builder.build().unwrap();
    ///
    /// assert!(pma.matches("Dolor sit amet"));
    /// ```
    #[must_use]
    pub fn new(ignore_case: bool) -> Self {
        Self {
            nodes: vec![Node::new(0)],
            key_lengths: vec![],
            values: vec![],
            ignore_case,
            base: vec![],
            check: vec![],
            used: vec![],
            size: 0,
            progress: 0,
            next_check_pos: 0,
        }
    }

    /// Inserts a pattern and its associated value.
    ///
    /// The pattern index reported in match results is the number of
    /// patterns inserted before this one. Duplicate keys are allowed and
    /// keep their own indices; every one of them is reported on a match.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when `key` is empty or the number of
    /// patterns exceeds the supported scale.
    pub fn add(&mut self, key: &str, value: V) -> Result<()> {
        if key.is_empty() {
            return Err(DachoundError::invalid_argument(
                "key",
                "patterns must not be empty",
            ));
        }
        // Pattern indices are negated into BASE slots, so they must fit
        // in a non-negative i32.
        if self.key_lengths.len() >= i32::MAX as usize {
            return Err(DachoundError::automaton_scale(
                "the number of patterns must be less than i32::MAX",
            ));
        }
        let index = self.key_lengths.len() as u32;

        let mut node_id = ROOT_NODE_ID;
        let mut length = 0u32;
        for c in key.encode_utf16() {
            let c = if self.ignore_case {
                to_upper_code_unit(c)
            } else {
                c
            };
            node_id = self.add_state(node_id, c)?;
            length += 1;
        }
        self.nodes[node_id as usize].emits.insert(index);
        self.key_lengths.push(length);
        self.values.push(value);
        Ok(())
    }

    /// Inserts every pattern-value pair of `entries`.
    ///
    /// When the iterator reports its size, the pattern-indexed arrays are
    /// reserved up front.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned on the first entry that
    /// [`add`](Self::add) rejects; earlier entries stay inserted.
    pub fn add_all<I, P>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<str>,
    {
        let entries = entries.into_iter();
        let (low, _) = entries.size_hint();
        self.key_lengths.reserve(low);
        self.values.reserve(low);
        for (key, value) in entries {
            self.add(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Builds and returns a new [`AhoCorasickDoubleArrayTrie`], consuming
    /// the builder.
    ///
    /// # Errors
    ///
    /// [`DachoundError`] is returned when the double array would exceed
    /// 95% of `i32::MAX` slots.
    ///
    /// # Examples
    ///
    /// ```
    /// use dachound::AhoCorasickDoubleArrayTrieBuilder;
    ///
    /// let mut builder = AhoCorasickDoubleArrayTrieBuilder::new(false);
    /// builder.add("he", 'a').unwrap();
    /// let pma = builder.build().unwrap();
    ///
    /// assert_eq!(Some(&'a'), pma.get("he"));
    /// ```
    pub fn build(mut self) -> Result<AhoCorasickDoubleArrayTrie<V>> {
        self.build_double_array()?;
        let (fail, output) = self.build_failure_links();

        // Compaction: exactly `size + TAIL_PADDING` slots remain, so every
        // transition target `base[s] + c + 1` stays addressable.
        self.base.resize(self.size + TAIL_PADDING, 0);
        self.check.resize(self.size + TAIL_PADDING, 0);
        self.base.shrink_to_fit();
        self.check.shrink_to_fit();

        Ok(AhoCorasickDoubleArrayTrie {
            base: self.base,
            check: self.check,
            fail,
            output,
            key_lengths: self.key_lengths,
            values: Some(self.values),
            ignore_case: self.ignore_case,
        })
    }

    fn add_state(&mut self, parent: u32, c: u16) -> Result<u32> {
        if let Some(&child) = self.nodes[parent as usize].success.get(&c) {
            return Ok(child);
        }
        let child = u32::try_from(self.nodes.len())
            .map_err(|_| DachoundError::automaton_scale("a trie node id must fit in u32"))?;
        let depth = self.nodes[parent as usize].depth + 1;
        self.nodes.push(Node::new(depth));
        self.nodes[parent as usize].success.insert(c, child);
        Ok(child)
    }

    /// Collects the sibling group of `parent`: the terminator edge first
    /// when the node is accepting, then every real child edge in ascending
    /// code-unit order. Edge offsets are `code unit + 1`; offset 0 is the
    /// terminator.
    fn fetch(&self, parent: u32) -> SiblingGroup {
        let node = &self.nodes[parent as usize];
        let mut siblings = Vec::with_capacity(node.success.len() + 1);
        if node.is_acceptable() {
            if let Some(largest) = node.largest_emit() {
                siblings.push((0, Sibling::Terminator(largest)));
            }
        }
        for (&c, &child) in &node.success {
            siblings.push((u32::from(c) + 1, Sibling::Node(child)));
        }
        siblings
    }

    fn build_double_array(&mut self) -> Result<()> {
        self.resize(INIT_CAPACITY)?;
        self.base[ROOT_STATE_IDX] = 1;
        self.next_check_pos = 0;

        let siblings = self.fetch(ROOT_NODE_ID);
        if siblings.is_empty() {
            // No patterns: every transition must be invalid, and 0 would
            // read as a valid CHECK for a block at offset 0.
            for chk in &mut self.check {
                *chk = -1;
            }
            return Ok(());
        }

        let mut queue: VecDeque<(Option<usize>, SiblingGroup)> = VecDeque::new();
        queue.push_back((None, siblings));
        while let Some((parent_slot, siblings)) = queue.pop_front() {
            let begin = self.insert_siblings(&siblings, &mut queue)?;
            // The root keeps its seeded base; the first block lands at 1.
            if let Some(slot) = parent_slot {
                self.base[slot] = begin as i32;
            }
        }
        Ok(())
    }

    /// Places one sibling group into the double array and enqueues the
    /// groups of its non-terminator children. Returns the block origin.
    fn insert_siblings(
        &mut self,
        siblings: &[(u32, Sibling)],
        queue: &mut VecDeque<(Option<usize>, SiblingGroup)>,
    ) -> Result<usize> {
        let first_offset = siblings[0].0 as usize;
        let last_offset = siblings[siblings.len() - 1].0 as usize;

        let mut pos = (first_offset + 1).max(self.next_check_pos) - 1;
        let mut nonzero_num = 0usize;
        let mut first_free_seen = false;

        let begin = loop {
            pos += 1;
            if self.base.len() <= pos {
                self.resize(pos + 1)?;
            }
            if self.check[pos] != 0 {
                nonzero_num += 1;
                continue;
            }
            if !first_free_seen {
                self.next_check_pos = pos;
                first_free_seen = true;
            }

            let begin = pos - first_offset;
            if self.base.len() <= begin + last_offset {
                let keys = self.key_lengths.len();
                let ratio = (keys as f64 / (self.progress as f64 + 1.0)).max(1.05);
                let grown = (self.base.len() as f64 * ratio) as usize;
                self.resize(grown.max(begin + last_offset + 1))?;
            }
            if self.used[begin] {
                continue;
            }
            if siblings[1..]
                .iter()
                .any(|&(offset, _)| self.check[begin + offset as usize] != 0)
            {
                continue;
            }
            break begin;
        };

        // A region whose slots were almost all occupied is skipped by
        // later scans, keeping construction near-linear.
        if nonzero_num as f64 / (pos - self.next_check_pos + 1) as f64 >= DENSITY_THRESHOLD {
            self.next_check_pos = pos;
        }

        self.used[begin] = true;
        self.size = self.size.max(begin + last_offset + 1);
        for &(offset, _) in siblings {
            self.check[begin + offset as usize] = begin as i32;
        }
        for &(offset, sibling) in siblings {
            let slot = begin + offset as usize;
            match sibling {
                Sibling::Terminator(emit) => {
                    self.base[slot] = -(emit as i32) - 1;
                    self.progress += 1;
                }
                Sibling::Node(child) => {
                    self.nodes[child as usize].index = slot as u32;
                    let child_siblings = self.fetch(child);
                    // Every real trie node is accepting or has children.
                    debug_assert!(!child_siblings.is_empty());
                    queue.push_back((Some(slot), child_siblings));
                }
            }
        }
        Ok(begin)
    }

    /// Assigns suffix-failure links breadth-first over the trie and
    /// materializes the flat `fail` and `output` arrays indexed by
    /// double-array slot. A state's output list keeps its own emits ahead
    /// of everything inherited over failure links.
    fn build_failure_links(&mut self) -> (Vec<u32>, Vec<Option<Box<[u32]>>>) {
        let mut fail = vec![0u32; self.size + 1];
        let mut output: Vec<Option<Box<[u32]>>> = vec![None; self.size + 1];

        // Depth-1 states fail to the root.
        let mut queue: VecDeque<u32> = VecDeque::new();
        let root_children: Vec<u32> = self.nodes[ROOT_NODE_ID as usize]
            .success
            .values()
            .copied()
            .collect();
        for child in root_children {
            self.nodes[child as usize].failure = ROOT_NODE_ID;
            self.materialize_output(child, &mut output);
            queue.push_back(child);
        }

        while let Some(node_id) = queue.pop_front() {
            let transitions: Vec<(u16, u32)> = self.nodes[node_id as usize]
                .success
                .iter()
                .map(|(&c, &child)| (c, child))
                .collect();
            for (c, target) in transitions {
                let mut trace = self.nodes[node_id as usize].failure;
                let new_failure = loop {
                    if let Some(&next) = self.nodes[trace as usize].success.get(&c) {
                        break next;
                    }
                    if trace == ROOT_NODE_ID {
                        // The root consumes every unit by looping on
                        // itself, so the walk always terminates.
                        break ROOT_NODE_ID;
                    }
                    trace = self.nodes[trace as usize].failure;
                };
                self.nodes[target as usize].failure = new_failure;
                fail[self.nodes[target as usize].index as usize] =
                    self.nodes[new_failure as usize].index;
                self.materialize_output(target, &mut output);
                queue.push_back(target);
            }
        }
        (fail, output)
    }

    /// Freezes a node's output list: its own emits first (descending
    /// pattern-index order), then every pattern inherited over the failure
    /// link. The failure state is shallower, so its list is already
    /// complete when the BFS reaches this node and inheriting is a single
    /// concatenation. Empty lists stay `None`.
    fn materialize_output(&self, node_id: u32, output: &mut [Option<Box<[u32]>>]) {
        let node = &self.nodes[node_id as usize];
        let failure_idx = self.nodes[node.failure as usize].index as usize;
        let mut list: Vec<u32> = node.emits.iter().rev().copied().collect();
        if let Some(inherited) = &output[failure_idx] {
            list.extend_from_slice(inherited);
        }
        if !list.is_empty() {
            output[node.index as usize] = Some(list.into_boxed_slice());
        }
    }

    fn resize(&mut self, new_len: usize) -> Result<()> {
        if new_len > CAPACITY_LIMIT {
            return Err(DachoundError::automaton_scale(format!(
                "the double array must not exceed {CAPACITY_LIMIT} slots"
            )));
        }
        self.base.resize(new_len, 0);
        self.check.resize(new_len, 0);
        self.used.resize(new_len, false);
        Ok(())
    }
}
