//! Candidate alphabet generation
//!
//! A hint is the hash of a permutation of the alphabet with one character
//! removed. The coordinator does not know which character is missing, so
//! it queues one hint task per candidate alphabet. Candidates are built by
//! removing one character at a time until the target length is reached.
//! Different removal orders can reach the same subset; those duplicates
//! are kept; they only cost redundant tasks.

use crate::error::CombinationError;
use std::sync::Arc;

/// Upper bound on the candidates one run may generate
pub const MAX_CANDIDATES: usize = 1_000_000;

/// An ordered subset of the run's alphabet tried against a hint
pub type CandidateAlphabet = Arc<[char]>;

/// Generate every candidate alphabet of `target_length` reachable by
/// repeatedly removing a single character from `alphabet`.
///
/// Output order is deterministic for a given input ordering. Fails when
/// the target is not shorter than the alphabet, or when more than
/// `MAX_CANDIDATES` would be emitted.
pub fn generate(
    alphabet: &[char],
    target_length: usize,
) -> Result<Vec<CandidateAlphabet>, CombinationError> {
    if target_length >= alphabet.len() {
        return Err(CombinationError::TargetTooLong {
            target: target_length,
            alphabet: alphabet.len(),
        });
    }

    let count = candidate_count(alphabet.len(), target_length);
    if count > MAX_CANDIDATES {
        return Err(CombinationError::TooManyCandidates {
            target: target_length,
            alphabet: alphabet.len(),
            max: MAX_CANDIDATES,
        });
    }

    let mut out = Vec::with_capacity(count);
    remove_one(alphabet, target_length, &mut out);
    Ok(out)
}

fn remove_one(chars: &[char], target_length: usize, out: &mut Vec<CandidateAlphabet>) {
    let mut reduced = Vec::with_capacity(chars.len() - 1);

    for skip in 0..chars.len() {
        reduced.clear();
        reduced.extend(
            chars
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, &c)| c),
        );

        if reduced.len() == target_length {
            out.push(Arc::from(reduced.as_slice()));
        } else {
            remove_one(&reduced, target_length, out);
        }
    }
}

/// Number of candidates `generate` emits for an alphabet of `alphabet_len`
/// characters, duplicates included.
///
/// Returns 0 when the target is not shorter than the alphabet. Saturates
/// instead of overflowing for absurd inputs.
pub fn candidate_count(alphabet_len: usize, target_length: usize) -> usize {
    if target_length >= alphabet_len {
        return 0;
    }
    ((target_length + 1)..=alphabet_len).fold(1usize, |acc, n| acc.saturating_mul(n))
}
