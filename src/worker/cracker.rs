//! Brute-force search for hints and passwords
//!
//! Hints are hashes of a permutation of a candidate alphabet, so a hint is
//! cracked by hashing every permutation of the candidate. Each decrypted
//! hint lacks one character of the full alphabet, and the password only
//! uses characters no hint lacks; the password search enumerates every
//! word of the password length over that reduced set.

use crate::master::registry::PasswordRecord;
use crate::messages::HintTask;
use sha2::{Digest, Sha256};

/// The computation a worker runs for each task
pub trait Cracker: Send + Sync + 'static {
    /// Decrypted hint, if some permutation of the candidate matches
    fn crack_hint(&self, task: &HintTask) -> Option<String>;

    /// Decrypted password, if any word over the hint-derived characters
    /// matches
    fn crack_password(&self, record: &PasswordRecord) -> Option<String>;
}

/// Lowercase hex SHA-256 of a string
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Cracker for SHA-256 hex digests
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Cracker;

impl Cracker for Sha256Cracker {
    fn crack_hint(&self, task: &HintTask) -> Option<String> {
        let target = task.encrypted_hint.to_ascii_lowercase();
        let mut chars = task.candidate.to_vec();
        let mut buf = String::with_capacity(chars.len() * 4);

        let mut found = None;
        for_each_permutation(&mut chars, |perm| {
            buf.clear();
            buf.extend(perm);
            if sha256_hex(&buf) == target {
                found = Some(buf.clone());
                true
            } else {
                false
            }
        });
        found
    }

    fn crack_password(&self, record: &PasswordRecord) -> Option<String> {
        let target = record.encrypted_password().to_ascii_lowercase();
        let chars = password_characters(record);
        let mut buf = String::with_capacity(record.password_length() * 4);

        let mut found = None;
        for_each_word(&chars, record.password_length(), |word| {
            buf.clear();
            buf.extend(word);
            if sha256_hex(&buf) == target {
                found = Some(buf.clone());
                true
            } else {
                false
            }
        });
        found
    }
}

/// Alphabet characters present in every decrypted hint
///
/// Unresolved hints are skipped.
pub fn password_characters(record: &PasswordRecord) -> Vec<char> {
    let hints: Vec<&str> = record.decrypted_hints().flatten().collect();
    record
        .alphabet()
        .iter()
        .copied()
        .filter(|c| hints.iter().all(|h| h.contains(*c)))
        .collect()
}

/// Visit every permutation of `chars` (Heap's algorithm) until `visit`
/// returns true. Returns whether it did.
pub fn for_each_permutation(chars: &mut [char], mut visit: impl FnMut(&[char]) -> bool) -> bool {
    if visit(chars) {
        return true;
    }

    let n = chars.len();
    let mut counters = vec![0usize; n];
    let mut i = 1;
    while i < n {
        if counters[i] < i {
            if i % 2 == 0 {
                chars.swap(0, i);
            } else {
                chars.swap(counters[i], i);
            }
            if visit(chars) {
                return true;
            }
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
    false
}

/// Visit every word of `length` over `chars` in odometer order until
/// `visit` returns true. Returns whether it did.
pub fn for_each_word(chars: &[char], length: usize, mut visit: impl FnMut(&[char]) -> bool) -> bool {
    if chars.is_empty() {
        return length == 0 && visit(&[]);
    }

    let mut digits = vec![0usize; length];
    let mut word = vec![chars[0]; length];
    loop {
        if visit(&word) {
            return true;
        }

        // Advance the rightmost digit, carrying leftwards
        let mut pos = length;
        loop {
            if pos == 0 {
                return false;
            }
            pos -= 1;
            digits[pos] += 1;
            if digits[pos] < chars.len() {
                word[pos] = chars[digits[pos]];
                break;
            }
            digits[pos] = 0;
            word[pos] = chars[0];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn resolved(password: &str, hints: &[&str]) -> PasswordRecord {
        let mut registry = crate::master::registry::PasswordRegistry::new();
        registry
            .create(
                1,
                "alice".into(),
                sha256_hex(password),
                hints.iter().map(|h| sha256_hex(h)).collect(),
                Arc::from(vec!['A', 'B', 'C', 'D']),
                password.len(),
            )
            .unwrap();
        for hint in hints {
            registry.record_hint(1, &sha256_hex(hint), hint).unwrap();
        }
        registry.snapshot(1).unwrap()
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_permutations_are_complete_and_distinct() {
        let mut chars = vec!['A', 'B', 'C', 'D'];
        let mut seen = HashSet::new();
        for_each_permutation(&mut chars, |p| {
            seen.insert(p.iter().collect::<String>());
            false
        });
        assert_eq!(seen.len(), 24);
    }

    #[test]
    fn test_words_in_odometer_order() {
        let mut words = Vec::new();
        for_each_word(&['A', 'B'], 2, |w| {
            words.push(w.iter().collect::<String>());
            false
        });
        assert_eq!(words, vec!["AA", "AB", "BA", "BB"]);
    }

    #[test]
    fn test_search_stops_on_match() {
        let mut visited = 0;
        let found = for_each_word(&['A', 'B', 'C'], 3, |w| {
            visited += 1;
            w == ['A', 'B', 'A']
        });
        assert!(found);
        assert_eq!(visited, 4);
    }

    #[test]
    fn test_crack_hint() {
        let task = HintTask {
            record_id: 1,
            encrypted_hint: sha256_hex("DBA"),
            candidate: Arc::from(vec!['A', 'B', 'D']),
        };
        assert_eq!(Sha256Cracker.crack_hint(&task), Some("DBA".to_string()));

        let wrong = HintTask {
            candidate: Arc::from(vec!['A', 'B', 'C']),
            ..task
        };
        assert_eq!(Sha256Cracker.crack_hint(&wrong), None);
    }

    #[test]
    fn test_password_characters_exclude_missing_ones() {
        let record = resolved("ABA", &["DBA", "CAB"]);
        assert_eq!(password_characters(&record), vec!['A', 'B']);
    }

    #[test]
    fn test_crack_password() {
        let record = resolved("ABA", &["DBA", "CAB"]);
        assert_eq!(Sha256Cracker.crack_password(&record), Some("ABA".to_string()));

        // The password uses a character one hint lacks: not found
        let record = resolved("ABC", &["DBA", "CAB"]);
        assert_eq!(Sha256Cracker.crack_password(&record), None);
    }
}
