use std::collections::{HashMap, HashSet};

use rand::Rng;

use dachound::{AhoCorasickDoubleArrayTrie, AhoCorasickDoubleArrayTrieBuilder};

/// Generates a random string consisting of `size` characters from
/// `charset`.
fn generate_random_string(size: usize, charset: &[char]) -> String {
    let mut rng = rand::thread_rng();
    (0..size)
        .map(|_| charset[rng.gen_range(0..charset.len())])
        .collect()
}

/// Finds all overlapped occurrences in a naive manner, returning
/// `(begin, end) => pattern index` mappings over UTF-16 code-unit
/// positions.
fn naive_find_overlapping(patterns: &[String], haystack: &str) -> HashMap<(usize, usize), usize> {
    let units: Vec<u16> = haystack.encode_utf16().collect();
    let mut answers = HashMap::new();
    for (index, pattern) in patterns.iter().enumerate() {
        let pat: Vec<u16> = pattern.encode_utf16().collect();
        for pos in 0..units.len() {
            if units[pos..].starts_with(&pat) {
                answers.insert((pos, pos + pat.len()), index);
            }
        }
    }
    answers
}

fn unique_random_patterns(charset: &[char]) -> Vec<String> {
    let mut patterns = HashSet::new();
    for _ in 0..6 {
        patterns.insert(generate_random_string(1, charset));
    }
    for _ in 0..20 {
        patterns.insert(generate_random_string(2, charset));
    }
    for _ in 0..50 {
        patterns.insert(generate_random_string(3, charset));
    }
    for _ in 0..100 {
        patterns.insert(generate_random_string(4, charset));
    }
    patterns.into_iter().collect()
}

#[test]
fn test_find_overlapping_random() {
    let charset: Vec<char> = "random".chars().collect();
    for _ in 0..100 {
        let patterns = unique_random_patterns(&charset);
        let haystack = generate_random_string(100, &charset);

        let expected = naive_find_overlapping(&patterns, &haystack);

        let pma = AhoCorasickDoubleArrayTrie::new(&patterns).unwrap();
        let mut actual = HashMap::new();
        for m in pma.parse(&haystack) {
            let found = actual.insert((m.begin(), m.end()), m.pattern());
            assert_eq!(None, found, "every occurrence is reported exactly once");
        }
        assert_eq!(expected, actual, "haystack: {haystack}");
    }
}

#[test]
fn test_find_overlapping_cjk_random() {
    let charset: Vec<char> = "双数组字典树".chars().collect();
    for _ in 0..100 {
        let patterns = unique_random_patterns(&charset);
        let haystack = generate_random_string(100, &charset);

        let expected = naive_find_overlapping(&patterns, &haystack);

        let pma = AhoCorasickDoubleArrayTrie::new(&patterns).unwrap();
        let mut actual = HashMap::new();
        for m in pma.parse(&haystack) {
            actual.insert((m.begin(), m.end()), m.pattern());
        }
        assert_eq!(expected, actual, "haystack: {haystack}");
    }
}

#[test]
fn test_exact_match_random() {
    let charset: Vec<char> = "random".chars().collect();
    for _ in 0..100 {
        let patterns = unique_random_patterns(&charset);
        let pma = AhoCorasickDoubleArrayTrie::new(&patterns).unwrap();

        for (i, p) in patterns.iter().enumerate() {
            assert_eq!(Some(i), pma.exact_match(p));
            assert_eq!(Some(&(i as u32)), pma.get(p));
        }
    }
}

#[test]
fn test_exact_match_rejects_non_patterns() {
    let charset: Vec<char> = "random".chars().collect();
    for _ in 0..100 {
        let patterns = unique_random_patterns(&charset);
        let inserted: HashSet<&str> = patterns.iter().map(String::as_str).collect();
        let pma = AhoCorasickDoubleArrayTrie::new(&patterns).unwrap();

        for _ in 0..100 {
            let probe = generate_random_string(4, &charset);
            if !inserted.contains(probe.as_str()) {
                assert_eq!(None, pma.exact_match(&probe));
            }
        }
    }
}

#[test]
fn test_ignore_case_equals_uppercased_scan() {
    let charset: Vec<char> = "rAnDoM".chars().collect();
    for _ in 0..100 {
        let patterns = unique_random_patterns(&charset);
        let haystack = generate_random_string(100, &charset);

        let mut builder = AhoCorasickDoubleArrayTrieBuilder::new(true);
        builder
            .add_all(patterns.iter().map(|p| (p.as_str(), ())))
            .unwrap();
        let pma = builder.build().unwrap();

        let folded: Vec<_> = pma
            .parse(&haystack)
            .iter()
            .map(|h| (h.begin(), h.end(), h.pattern()))
            .collect();
        let uppercased: Vec<_> = pma
            .parse(&haystack.to_uppercase())
            .iter()
            .map(|h| (h.begin(), h.end(), h.pattern()))
            .collect();
        assert_eq!(folded, uppercased);
    }
}

#[test]
fn test_num_patterns_random() {
    let charset: Vec<char> = "random".chars().collect();
    for _ in 0..10 {
        let patterns = unique_random_patterns(&charset);
        let pma = AhoCorasickDoubleArrayTrie::new(&patterns).unwrap();
        assert_eq!(patterns.len(), pma.num_patterns());
    }
}
