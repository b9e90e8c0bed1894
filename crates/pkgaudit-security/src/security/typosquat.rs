//! Typosquatting detection.
//!
//! Only single-character substitutions between equal-length names are
//! caught. Insertions, deletions and transpositions are not. Names are
//! compared in normalised form, so `scikit_learn` is `scikit-learn` rather
//! than a near miss of it.

use super::rules::PatternRegistry;
use super::types::canonical_name;
use std::sync::Arc;

pub struct TyposquatDetector {
    registry: Arc<PatternRegistry>,
}

impl TyposquatDetector {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    /// One warning per legitimate name at Hamming distance exactly 1, in
    /// catalogue order.
    pub fn check_typosquatting(&self, name: &str) -> Vec<String> {
        let candidate = canonical_name(name);
        self.registry
            .legitimate_package_names()
            .iter()
            .filter(|legit| hamming_distance(&candidate, &canonical_name(legit)) == Some(1))
            .map(|legit| {
                format!(
                    "possible typosquatting: '{}' is very similar to '{}'",
                    name, legit
                )
            })
            .collect()
    }
}

/// Differing positions between two equal-length strings, by character.
/// `None` when the lengths differ.
pub fn hamming_distance(a: &str, b: &str) -> Option<usize> {
    if a.chars().count() != b.chars().count() {
        return None;
    }
    Some(a.chars().zip(b.chars()).filter(|(x, y)| x != y).count())
}
