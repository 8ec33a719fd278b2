//! Trigram name similarity, computed the same way as PostgreSQL's `pg_trgm`
//! `similarity()` so in-memory and PostGIS stores agree on matches.

use std::collections::BTreeSet;

/// Trigram set of a string.
///
/// The input is split into words of alphanumeric characters, each word is
/// lower-cased and padded with two leading spaces and one trailing space,
/// and every run of three consecutive characters becomes a trigram.
#[must_use]
pub fn trigrams(input: &str) -> BTreeSet<[char; 3]> {
    let mut set = BTreeSet::new();
    for word in input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars().flat_map(char::to_lowercase))
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }
    set
}

/// Jaccard index of the trigram sets of `a` and `b`, in `0.0..=1.0`.
///
/// Two strings without any trigram score `0.0`.
#[must_use]
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    let shared = left.intersection(&right).count();
    let total = left.len() + right.len() - shared;
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let score = shared as f64 / total as f64;
    score
}
