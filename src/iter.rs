//! Iterators for [`AhoCorasickDoubleArrayTrie`].

use core::iter::Enumerate;

use crate::{AhoCorasickDoubleArrayTrie, Hit};

/// Iterator created by
/// [`AhoCorasickDoubleArrayTrie::find_overlapping_iter()`].
///
/// A state can emit several patterns at once (the pattern ending there plus
/// every pattern inherited over failure links); those hits share the same
/// ending position and are drained before the scan advances.
pub struct FindOverlappingIterator<'a, I, V> {
    pub(crate) pma: &'a AhoCorasickDoubleArrayTrie<V>,
    pub(crate) haystack: Enumerate<I>,
    pub(crate) offset: usize,
    pub(crate) state: usize,
    pub(crate) end: usize,
    pub(crate) pending: &'a [u32],
}

impl<'a, I, V> Iterator for FindOverlappingIterator<'a, I, V>
where
    I: Iterator<Item = u16>,
{
    type Item = Hit<'a, V>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if let Some((&index, rest)) = self.pending.split_first() {
            self.pending = rest;
            return Some(self.pma.hit(index as usize, self.end));
        }
        for (pos, c) in self.haystack.by_ref() {
            let c = self.pma.fold(c);
            self.state = self.pma.next_state(self.state, c);
            if let Some(out) = &self.pma.output[self.state] {
                // Output lists are materialized only when non-empty.
                if let Some((&first, rest)) = out.split_first() {
                    self.end = self.offset + pos + 1;
                    self.pending = rest;
                    return Some(self.pma.hit(first as usize, self.end));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::AhoCorasickDoubleArrayTrie;

    #[test]
    fn test_multiple_emits_share_end_position() {
        let patterns = vec!["he", "she"];
        let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();

        let hits = pma.parse("she");
        assert_eq!(2, hits.len());
        assert_eq!(hits[0].end(), hits[1].end());
        assert_ne!(hits[0].pattern(), hits[1].pattern());
    }

    #[test]
    fn test_from_iter_matches_str_scan() {
        let patterns = vec!["ab", "bc"];
        let pma = AhoCorasickDoubleArrayTrie::new(patterns).unwrap();

        let text = "xabcx";
        let from_str: Vec<_> = pma
            .find_overlapping_iter(text)
            .map(|h| (h.begin(), h.end(), h.pattern()))
            .collect();
        let units: Vec<u16> = text.encode_utf16().collect();
        let from_iter: Vec<_> = pma
            .find_overlapping_iter_from_iter(units.into_iter())
            .map(|h| (h.begin(), h.end(), h.pattern()))
            .collect();
        assert_eq!(from_str, from_iter);
    }
}
