//! Per-entry scoring signals: keyword overlap, cosine similarity, and decay-aware
//! importance. Each function looks at one entry in isolation; combining them is the
//! ranker's job (see [`crate::memory::search`]).

use chrono::{DateTime, Utc};

use crate::memory::codec;
use crate::memory::types::MemoryEntry;

const CONTENT_WEIGHT: f64 = 0.4;
const TAG_WEIGHT: f64 = 0.3;
const TYPE_WEIGHT: f64 = 0.2;
const ALL_TERMS_BONUS: f64 = 0.1;

/// Floor of the age decay multiplier.
pub const MIN_DECAY: f64 = 0.3;
/// Ceiling of the access boost multiplier.
pub const MAX_ACCESS_BOOST: f64 = 2.0;
const DECAY_HORIZON_DAYS: f64 = 365.0;

/// Lowercased, whitespace-delimited query terms longer than one character.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Keyword relevance in `[0, 1]`.
///
/// Each term earns 0.4 for a content hit, 0.3 for a tag hit, and 0.2 for a type hit. The
/// sum is averaged over terms, +0.1 if every term matched somewhere, capped at 1.0.
pub fn keyword_score(terms: &[String], entry: &MemoryEntry) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }

    let content = entry.content.to_lowercase();
    let tags: Vec<String> = entry.tags.iter().map(|t| t.to_lowercase()).collect();
    let memory_type = entry.memory_type.as_str();

    let mut total = 0.0;
    let mut matched_terms = 0usize;
    for term in terms {
        let mut term_score = 0.0;
        if content.contains(term.as_str()) {
            term_score += CONTENT_WEIGHT;
        }
        if tags.iter().any(|t| t.contains(term.as_str())) {
            term_score += TAG_WEIGHT;
        }
        if memory_type.contains(term.as_str()) {
            term_score += TYPE_WEIGHT;
        }
        if term_score > 0.0 {
            matched_terms += 1;
        }
        total += term_score;
    }

    let mut score = total / terms.len() as f64;
    if matched_terms == terms.len() {
        score += ALL_TERMS_BONUS;
    }
    score.min(1.0)
}

/// Cosine similarity. Mismatched lengths, empty vectors, and zero norms give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Similarity between the query vector and the entry's embedding, if the entry has one.
pub fn semantic_score(query_vector: &[f32], entry: &MemoryEntry) -> Option<f64> {
    let vector = codec::embedding_f32(entry)?;
    Some(cosine_similarity(query_vector, &vector))
}

/// `max(0.3, 1 - age_days / 365)`, never above 1 for future timestamps.
pub fn decay_factor(age_days: f64) -> f64 {
    (1.0 - age_days / DECAY_HORIZON_DAYS).clamp(MIN_DECAY, 1.0)
}

/// `min(2.0, 1 + 0.1 * access_count)`.
pub fn access_boost(access_count: u32) -> f64 {
    (1.0 + 0.1 * access_count as f64).min(MAX_ACCESS_BOOST)
}

/// Raw importance scaled by age decay and access frequency.
///
/// An unparsable timestamp counts as age 0.
pub fn effective_importance(entry: &MemoryEntry, now: DateTime<Utc>) -> f64 {
    let age_days = codec::parse_timestamp(&entry.timestamp)
        .map(|created| (now - created).num_seconds() as f64 / 86_400.0)
        .unwrap_or(0.0);
    entry.importance as f64 * decay_factor(age_days) * access_boost(entry.access_count)
}
