use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::model::AthleteResult;

pub mod similarity;

pub use similarity::{default_similarity, FuzzyCandidate, SimilarityFn};

// Last words that mark a name as the suffixed form of a gym
const MERGE_SUFFIXES: [&str; 11] = [
    "gymnastics",
    "gym",
    "gymnastic",
    "academy",
    "athletics",
    "center",
    "centre",
    "club",
    "training",
    "tumbling",
    "cheer",
];

/// Outcome of a normalization pass over one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    pub unique_gyms: Vec<String>,
    pub case_merged: BTreeMap<String, String>,
    pub suffix_merged: BTreeMap<String, String>,
    pub fuzzy_candidates: Vec<FuzzyCandidate>,
    pub alias_applied: usize,
}

impl NormalizeReport {
    /// Human-readable summary for the run output, truncated the way the
    /// rest of the console reporting is.
    pub fn print(&self) {
        let merged = self.case_merged.len() + self.suffix_merged.len();
        println!(
            "\nGym normalization: {} unique gyms, {} auto-merged ({} case, {} suffix), {} potential duplicates to review",
            self.unique_gyms.len(),
            merged,
            self.case_merged.len(),
            self.suffix_merged.len(),
            self.fuzzy_candidates.len()
        );
        print_merge_map("Case-merged", &self.case_merged);
        print_merge_map("Suffix-merged", &self.suffix_merged);
        if !self.fuzzy_candidates.is_empty() {
            println!("Potential duplicates (>80% similar):");
            for candidate in self.fuzzy_candidates.iter().take(15) {
                println!(
                    "  \"{}\" / \"{}\" ({}% similar)",
                    candidate.left,
                    candidate.right,
                    (candidate.similarity * 100.0) as i64
                );
            }
            if self.fuzzy_candidates.len() > 15 {
                println!("  ... and {} more", self.fuzzy_candidates.len() - 15);
            }
        }
        if self.alias_applied > 0 {
            println!("Gym map applied: {} athletes updated", self.alias_applied);
        }
    }
}

fn print_merge_map(label: &str, merges: &BTreeMap<String, String>) {
    if merges.is_empty() {
        return;
    }
    if merges.len() > 15 {
        println!("{label} (showing 15 of {}):", merges.len());
    } else {
        println!("{label}:");
    }
    for (from, to) in merges.iter().take(15) {
        println!("  \"{from}\" -> \"{to}\"");
    }
}

/// Canonicalizes gym names across a batch of athlete records.
///
/// Four ordered phases, each idempotent:
///   1. case/whitespace canonicalization (title-case, acronyms preserved)
///   2. suffix-aware merge ("All Pro" into "All Pro Gymnastics")
///   3. fuzzy duplicate detection (report only, never merged)
///   4. manual alias map, applied last and unconditionally
pub struct GymNormalizer {
    similarity: SimilarityFn,
    alias_map_path: Option<PathBuf>,
}

impl GymNormalizer {
    pub fn new() -> Self {
        Self {
            similarity: default_similarity,
            alias_map_path: None,
        }
    }

    pub fn with_alias_map(mut self, path: Option<PathBuf>) -> Self {
        self.alias_map_path = path;
        self
    }

    pub fn with_similarity(mut self, similarity: SimilarityFn) -> Self {
        self.similarity = similarity;
        self
    }

    /// Normalize gym names in place and report what changed.
    pub fn normalize(&self, athletes: &mut [AthleteResult]) -> NormalizeReport {
        let case_merged = canonicalize_spellings(athletes);
        let suffix_merged = merge_suffix_variants(athletes);

        let unique = unique_gyms(athletes);
        let fuzzy_candidates = similarity::find_candidates(&unique, self.similarity);

        let mut report = NormalizeReport {
            unique_gyms: unique,
            case_merged,
            suffix_merged,
            fuzzy_candidates,
            alias_applied: 0,
        };

        if let Some(path) = &self.alias_map_path {
            if let Some(applied) = apply_alias_map(athletes, path) {
                report.alias_applied = applied;
                report.unique_gyms = unique_gyms(athletes);
            }
        }

        info!(
            "gym normalization: {} unique gyms, {} case merges, {} suffix merges, {} fuzzy candidates, {} aliases applied",
            report.unique_gyms.len(),
            report.case_merged.len(),
            report.suffix_merged.len(),
            report.fuzzy_candidates.len(),
            report.alias_applied
        );
        report
    }
}

impl Default for GymNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase 1: group spellings case/whitespace/hyphen-insensitively and
/// rewrite every record to one title-cased canonical form per group.
/// The most frequent spelling wins; first appearance breaks ties.
fn canonicalize_spellings(athletes: &mut [AthleteResult]) -> BTreeMap<String, String> {
    // key -> spellings in first-seen order with athlete counts
    let mut groups: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();
    for athlete in athletes.iter() {
        let key = normalization_key(&athlete.gym);
        if key.is_empty() {
            continue;
        }
        let stripped = athlete.gym.trim().to_string();
        let variants = groups.entry(key).or_default();
        match variants.iter_mut().find(|(spelling, _)| *spelling == stripped) {
            Some((_, count)) => *count += 1,
            None => variants.push((stripped, 1)),
        }
    }

    let mut canonical_map: BTreeMap<String, String> = BTreeMap::new();
    let mut case_merged: BTreeMap<String, String> = BTreeMap::new();
    for variants in groups.values() {
        let canonical = title_case_gym(&first_max(variants).0);
        for (spelling, _) in variants {
            if *spelling != canonical {
                case_merged.insert(spelling.clone(), canonical.clone());
            }
            canonical_map.insert(spelling.clone(), canonical.clone());
        }
    }

    for athlete in athletes.iter_mut() {
        if let Some(canonical) = canonical_map.get(athlete.gym.trim()) {
            athlete.gym = canonical.clone();
        }
    }
    case_merged
}

/// Phase 2: merge bare prefixes into their suffixed forms. With several
/// suffixed variants over one prefix, the variant with the most athletes
/// becomes the target and the rest merge into it transitively.
fn merge_suffix_variants(athletes: &mut [AthleteResult]) -> BTreeMap<String, String> {
    let unique: BTreeSet<String> = athletes
        .iter()
        .filter(|a| !a.gym.is_empty())
        .map(|a| a.gym.clone())
        .collect();

    let mut base_to_suffixed: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for gym in &unique {
        let words: Vec<&str> = gym.split_whitespace().collect();
        if words.len() >= 2 && MERGE_SUFFIXES.contains(&words[words.len() - 1].to_lowercase().as_str())
        {
            let base = words[..words.len() - 1].join(" ");
            base_to_suffixed.entry(base).or_default().push(gym.clone());
        }
    }

    let mut merge_map: BTreeMap<String, String> = BTreeMap::new();
    let mut suffix_merged: BTreeMap<String, String> = BTreeMap::new();
    for (base, suffixed_forms) in &base_to_suffixed {
        if !unique.contains(base) {
            continue;
        }
        if suffixed_forms.len() == 1 {
            merge_map.insert(base.clone(), suffixed_forms[0].clone());
            suffix_merged.insert(base.clone(), suffixed_forms[0].clone());
        } else {
            // Several suffixed variants: count athletes per variant, keyed in
            // batch first-appearance order so ties resolve to the earliest
            let mut counts: Vec<(String, usize)> = Vec::new();
            for athlete in athletes.iter() {
                if !suffixed_forms.contains(&athlete.gym) {
                    continue;
                }
                match counts.iter_mut().find(|(form, _)| *form == athlete.gym) {
                    Some((_, count)) => *count += 1,
                    None => counts.push((athlete.gym.clone(), 1)),
                }
            }
            let target = first_max(&counts).0.clone();
            merge_map.insert(base.clone(), target.clone());
            suffix_merged.insert(base.clone(), target.clone());
            for form in suffixed_forms {
                if *form != target {
                    merge_map.insert(form.clone(), target.clone());
                    suffix_merged.insert(form.clone(), target.clone());
                }
            }
        }
    }

    if !merge_map.is_empty() {
        for athlete in athletes.iter_mut() {
            if let Some(target) = merge_map.get(&athlete.gym) {
                athlete.gym = target.clone();
            }
        }
    }
    suffix_merged
}

/// Phase 4: external JSON alias map, matched case-insensitively on the
/// trimmed gym value and applied unconditionally. Missing or malformed
/// maps are non-fatal; earlier phases stand.
fn apply_alias_map(athletes: &mut [AthleteResult], path: &Path) -> Option<usize> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("gym alias map not readable at {}: {e}", path.display());
            return None;
        }
    };
    let alias_map: BTreeMap<String, String> = match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(e) => {
            warn!("gym alias map at {} is not valid JSON: {e}", path.display());
            return None;
        }
    };

    // Keys match case-insensitively so the map holds regardless of what
    // the automatic phases did to the casing
    let lowered: BTreeMap<String, String> = alias_map
        .into_iter()
        .map(|(key, value)| (key.trim().to_lowercase(), value))
        .collect();

    let mut applied = 0;
    for athlete in athletes.iter_mut() {
        let key = athlete.gym.trim().to_lowercase();
        if let Some(target) = lowered.get(&key) {
            athlete.gym = target.clone();
            applied += 1;
        }
    }
    Some(applied)
}

/// Sorted distinct non-empty gym names in a batch.
pub fn unique_gyms(athletes: &[AthleteResult]) -> Vec<String> {
    athletes
        .iter()
        .filter(|a| !a.gym.is_empty())
        .map(|a| a.gym.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// First entry holding the maximum count, so ties resolve to the earliest
// spelling in the list.
fn first_max(entries: &[(String, usize)]) -> &(String, usize) {
    let mut best = &entries[0];
    for candidate in &entries[1..] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }
    best
}

/// Grouping key: trimmed, lowercased, hyphens as spaces, inner whitespace
/// collapsed.
fn normalization_key(gym: &str) -> String {
    collapse_whitespace(&gym.trim().to_lowercase().replace('-', " "))
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case a gym name, preserving acronyms and hyphenated segments.
pub fn title_case_gym(name: &str) -> String {
    let collapsed = collapse_whitespace(name.trim());
    if collapsed.is_empty() {
        return collapsed;
    }
    collapsed
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    // Hyphenated words title-case each segment: "win-win" -> "Win-Win"
    if word.contains('-') {
        return word
            .split('-')
            .map(title_case_word)
            .collect::<Vec<_>>()
            .join("-");
    }
    // All-caps words of 2-4 letters look like acronyms and stay as-is
    let length = word.chars().count();
    let is_acronym = (2..=4).contains(&length)
        && word.chars().any(|c| c.is_alphabetic())
        && !word.chars().any(|c| c.is_lowercase());
    if is_acronym {
        return word.to_string();
    }
    capitalize(word)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
