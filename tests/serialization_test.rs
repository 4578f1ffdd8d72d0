use dachound::errors::DachoundError;
use dachound::{AhoCorasickDoubleArrayTrie, AhoCorasickDoubleArrayTrieBuilder};

fn sample_patvals() -> Vec<(&'static str, u32)> {
    vec![("he", 10), ("she", 11), ("his", 12), ("hers", 13)]
}

fn hits_of<V>(pma: &AhoCorasickDoubleArrayTrie<V>, text: &str) -> Vec<(usize, usize, usize)> {
    pma.parse(text)
        .iter()
        .map(|h| (h.begin(), h.end(), h.pattern()))
        .collect()
}

#[test]
fn test_roundtrip_with_values() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();

    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..]).unwrap();

    assert!(pma == other);
    assert_eq!(hits_of(&pma, "ushers"), hits_of(&other, "ushers"));
    assert_eq!(Some(&11), other.get("she"));
    assert_eq!(Some(&13), other.value_at(3));
}

#[test]
fn test_roundtrip_without_values() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();

    let mut buffer = vec![];
    pma.save(&mut buffer, false).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..]).unwrap();

    assert_eq!(hits_of(&pma, "ushers"), hits_of(&other, "ushers"));
    for hit in other.parse("ushers") {
        assert_eq!(None, hit.value());
    }
    assert_eq!(None, other.get("she"));
    assert_eq!(None, other.value_at(1));
}

#[test]
fn test_load_with_restores_values() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();

    let mut buffer = vec![];
    pma.save(&mut buffer, false).unwrap();
    let other =
        AhoCorasickDoubleArrayTrie::load_with(&buffer[..], |index| index as u32 + 10).unwrap();

    assert!(pma == other);
    assert_eq!(Some(&11), other.get("she"));
}

#[test]
fn test_load_with_prefers_serialized_values() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();

    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::load_with(&buffer[..], |_| 99u32).unwrap();

    assert_eq!(Some(&11), other.get("she"));
}

#[test]
fn test_save_is_deterministic() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();

    let mut first = vec![];
    pma.save(&mut first, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<u32>::load(&first[..]).unwrap();
    let mut second = vec![];
    other.save(&mut second, true).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_ignore_case_survives_roundtrip() {
    let mut builder = AhoCorasickDoubleArrayTrieBuilder::new(true);
    builder.add("doLor", 0u32).unwrap();
    let pma = builder.build().unwrap();

    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..]).unwrap();

    assert!(other.ignore_case());
    assert!(other.matches("DOLOR"));
    assert!(other.matches("dolor"));
}

#[test]
fn test_empty_automaton_roundtrip() {
    let pma = AhoCorasickDoubleArrayTrieBuilder::<u32>::new(false)
        .build()
        .unwrap();

    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..]).unwrap();

    assert_eq!(0, other.num_patterns());
    assert!(!other.matches("anything"));
}

#[test]
fn test_string_values_roundtrip() {
    let patvals = vec![
        ("he".to_string(), "pronoun".to_string()),
        ("hers".to_string(), "possessive".to_string()),
    ];
    let pma = AhoCorasickDoubleArrayTrie::with_values(patvals).unwrap();

    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<String>::load(&buffer[..]).unwrap();

    let hit = other.find_first("uhers").unwrap();
    assert_eq!(Some(&"pronoun".to_string()), hit.value());
}

#[test]
fn test_char_and_float_values_roundtrip() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(vec![("he", '♞')]).unwrap();
    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<char>::load(&buffer[..]).unwrap();
    assert_eq!(Some(&'♞'), other.get("he"));

    let pma = AhoCorasickDoubleArrayTrie::with_values(vec![("he", 0.5f64)]).unwrap();
    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();
    let other = AhoCorasickDoubleArrayTrie::<f64>::load(&buffer[..]).unwrap();
    assert_eq!(Some(&0.5), other.get("he"));
}

#[test]
fn test_unknown_properties_are_skipped() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();
    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();

    // Splice two properties with unknown names ahead of the known ones
    // and bump the property count, as a newer writer would.
    let mut patched = vec![buffer[0] + 2];
    // "futureFlag", a 64-bit integer (varint 300).
    patched.push(10);
    patched.extend_from_slice(b"futureFlag");
    patched.push(12);
    patched.extend_from_slice(&[0xac, 0x02]);
    // "note", a length-prefixed string.
    patched.push(4);
    patched.extend_from_slice(b"note");
    patched.push(18);
    patched.push(5);
    patched.extend_from_slice(b"later");
    patched.extend_from_slice(&buffer[1..]);

    let other = AhoCorasickDoubleArrayTrie::<u32>::load(&patched[..]).unwrap();
    assert!(pma == other);
    assert_eq!(hits_of(&pma, "ushers"), hits_of(&other, "ushers"));
    assert!(other.ignore_case() == pma.ignore_case());
}

#[test]
fn test_value_type_code_mismatch_is_corrupt() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(vec![("he", 1u32)]).unwrap();
    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();

    // Written as u32, read as i32.
    assert!(matches!(
        AhoCorasickDoubleArrayTrie::<i32>::load(&buffer[..]),
        Err(DachoundError::CorruptInput(_))
    ));
}

#[test]
fn test_truncated_stream_is_corrupt() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();
    let mut buffer = vec![];
    pma.save(&mut buffer, true).unwrap();

    for len in [0, 1, buffer.len() / 2, buffer.len() - 1] {
        assert!(
            matches!(
                AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..len]),
                Err(DachoundError::CorruptInput(_))
            ),
            "truncation at {len} must be detected"
        );
    }
}

#[test]
fn test_save_without_values_errors_when_requested_again() {
    let pma = AhoCorasickDoubleArrayTrie::with_values(sample_patvals()).unwrap();
    let mut buffer = vec![];
    pma.save(&mut buffer, false).unwrap();

    // The reloaded automaton has no values to write.
    let other = AhoCorasickDoubleArrayTrie::<u32>::load(&buffer[..]).unwrap();
    let mut sink = vec![];
    assert!(matches!(
        other.save(&mut sink, true),
        Err(DachoundError::InvalidArgument(_))
    ));
    assert!(other.save(&mut sink, false).is_ok());
}

#[test]
fn test_garbage_stream_is_rejected() {
    let garbage = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02];
    assert!(AhoCorasickDoubleArrayTrie::<u32>::load(&garbage[..]).is_err());
}
