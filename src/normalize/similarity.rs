use serde::Serialize;

/// Similarity function over two lowercased names, returning 0.0..=1.0.
/// Kept as a plain function pointer so tests can swap in a stub without
/// touching the merge logic.
pub type SimilarityFn = fn(&str, &str) -> f64;

/// Default similarity: normalized Levenshtein distance.
pub fn default_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// The quadratic pair scan only runs when the distinct-name count stays
/// within this bound.
pub const MAX_FUZZY_NAMES: usize = 500;

/// Similarity threshold above which a pair is reported for review.
pub const FUZZY_THRESHOLD: f64 = 0.80;

/// A likely-duplicate pair surfaced for human review. Never merged
/// automatically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuzzyCandidate {
    pub left: String,
    pub right: String,
    pub similarity: f64,
}

/// Scan all pairs of distinct names for likely duplicates.
pub fn find_candidates(names: &[String], similarity: SimilarityFn) -> Vec<FuzzyCandidate> {
    let mut candidates = Vec::new();
    if names.len() > MAX_FUZZY_NAMES {
        return candidates;
    }
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            let (left, right) = (&names[i], &names[j]);
            if left == right {
                continue;
            }
            let score = similarity(&left.to_lowercase(), &right.to_lowercase());
            if score > FUZZY_THRESHOLD {
                candidates.push(FuzzyCandidate {
                    left: left.clone(),
                    right: right.clone(),
                    similarity: (score * 100.0).round() / 100.0,
                });
            }
        }
    }
    candidates
}
