use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::memory::relations::{expand_with_relations, RelatedEntry};
use crate::memory::scoring;
use crate::memory::types::{MemoryEntry, MemoryIndex, MemoryType};

// ── Public types ──────────────────────────────────────────────────────────────

const SEMANTIC_WEIGHT: f64 = 0.6;
const KEYWORD_WEIGHT: f64 = 0.4;
/// Scale applied to effective importance before it is added to a score.
const IMPORTANCE_WEIGHT: f64 = 0.1 / 10.0;

/// A ranked entry as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    /// Display path of the source document, `""` when the entry has none.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub date: String,
    pub importance: u8,
    pub score: f64,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedEntry>,
}

impl SearchResult {
    pub fn from_entry(entry: &MemoryEntry, score: f64) -> Self {
        Self {
            id: entry.id.clone(),
            path: display_path(entry.file.as_deref()),
            line: entry.line,
            memory_type: entry.memory_type,
            date: entry.date.clone().unwrap_or_default(),
            importance: entry.importance,
            score,
            content: entry.content.clone(),
            tags: entry.tags.clone(),
            related: Vec::new(),
        }
    }
}

/// Caller knobs for one query.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    pub min_score: f64,
    /// Relation hops to expand per result. 0 disables traversal, not access tracking.
    pub relation_depth: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_score: 0.25,
            relation_depth: 1,
        }
    }
}

impl From<&crate::config::RetrievalConfig> for SearchOptions {
    fn from(config: &crate::config::RetrievalConfig) -> Self {
        Self {
            max_results: config.max_results,
            min_score: config.min_score,
            relation_depth: config.relation_depth,
        }
    }
}

/// Score breakdown for one entry, pointing back into the index by position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub position: usize,
    pub score: f64,
    pub keyword: f64,
    pub semantic: Option<f64>,
}

/// Search output.
///
/// Searching records access on every returned entry, so `index` was mutated in place;
/// persist it with [`crate::memory::store::save_index`] when `touched` is non-empty.
#[must_use = "search mutates access tracking; save the index to persist it"]
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Whether semantic similarity contributed to ranking.
    pub semantic: bool,
    /// Ids whose `access_count`/`last_accessed` changed.
    #[serde(skip)]
    pub touched: Vec<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Map an entry's provenance to the path shown in results.
///
/// Absent or empty → `""`; `daily/...` → `memory/daily/...`; anything else unchanged.
pub fn display_path(file: Option<&str>) -> String {
    match file {
        None | Some("") => String::new(),
        Some(f) if f.starts_with("daily/") => format!("memory/{f}"),
        Some(f) => f.to_string(),
    }
}

/// Hybrid ranking: keyword + optional semantic + decayed importance → threshold → sort → truncate.
///
/// A query with no usable terms and no vector yields no results.
pub fn rank_entries(
    index: &MemoryIndex,
    query: &str,
    query_vector: Option<&[f32]>,
    options: &SearchOptions,
    now: DateTime<Utc>,
) -> Vec<ScoredEntry> {
    let terms = scoring::query_terms(query);
    if terms.is_empty() && query_vector.is_none() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredEntry> = index
        .entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let keyword = scoring::keyword_score(&terms, entry);
            let semantic = query_vector.and_then(|qv| scoring::semantic_score(qv, entry));

            let base = match semantic {
                Some(s) if terms.is_empty() => s,
                Some(s) => SEMANTIC_WEIGHT * s + KEYWORD_WEIGHT * keyword,
                None => keyword,
            };
            let score =
                base + scoring::effective_importance(entry, now) * IMPORTANCE_WEIGHT;

            (score >= options.min_score).then_some(ScoredEntry {
                position,
                score,
                keyword,
                semantic,
            })
        })
        .collect();

    // Stable sort: equal scores keep index order.
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(options.max_results);
    scored
}

/// Rank, build results, then expand each through the relation graph.
pub fn search(
    index: &mut MemoryIndex,
    query: &str,
    query_vector: Option<&[f32]>,
    options: &SearchOptions,
) -> SearchResponse {
    let ranked = rank_entries(index, query, query_vector, options, Utc::now());
    let semantic = ranked.iter().any(|s| s.semantic.is_some());

    let mut results: Vec<SearchResult> = ranked
        .iter()
        .map(|s| SearchResult::from_entry(&index.entries[s.position], s.score))
        .collect();

    expand_with_relations(index, &mut results, options.relation_depth);
    let touched = results.iter().map(|r| r.id.clone()).collect();

    tracing::debug!(
        query = %query,
        results = results.len(),
        semantic,
        "search complete"
    );

    SearchResponse {
        results,
        semantic,
        touched,
    }
}

/// Truncate content to `max_chars` characters, appending "..." if truncated.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::codec::encode_embedding;
    use crate::memory::types::StoredEmbedding;

    fn now() -> DateTime<Utc> {
        "2025-06-01T00:00:00Z".parse().unwrap()
    }

    fn entry(id: &str, content: &str, importance: u8) -> MemoryEntry {
        MemoryEntry {
            id: id.into(),
            timestamp: "2025-06-01T00:00:00Z".into(),
            date: Some("2025-06-01".into()),
            memory_type: MemoryType::Learning,
            importance,
            content: content.into(),
            file: None,
            line: None,
            tags: vec![],
            context: None,
            embedding: None,
            relations: vec![],
            access_count: 0,
            last_accessed: None,
        }
    }

    fn spike(i: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; 8];
        v[i] = 1.0;
        v
    }

    fn opts(min_score: f64) -> SearchOptions {
        SearchOptions {
            max_results: 10,
            min_score,
            relation_depth: 1,
        }
    }

    #[test]
    fn display_path_rules() {
        assert_eq!(display_path(None), "");
        assert_eq!(display_path(Some("")), "");
        assert_eq!(display_path(Some("daily/2024-01-01.md")), "memory/daily/2024-01-01.md");
        assert_eq!(display_path(Some("MEMORY.md")), "MEMORY.md");
    }

    #[test]
    fn empty_query_without_vector_returns_nothing() {
        let mut index = MemoryIndex::empty();
        index.entries.push(entry("a", "anything", 10));
        assert!(rank_entries(&index, "", None, &opts(0.0), now()).is_empty());
        assert!(rank_entries(&index, "a b", None, &opts(0.0), now()).is_empty());
    }

    #[test]
    fn keyword_only_score_includes_importance_term() {
        let mut index = MemoryIndex::empty();
        index.entries.push(entry("a", "rust ownership rules", 10));
        let ranked = rank_entries(&index, "ownership", None, &opts(0.0), now());
        // 0.5 keyword + 10 * 1.0 * 1.0 * 0.01
        assert!((ranked[0].score - 0.6).abs() < 1e-9);
        assert!(ranked[0].semantic.is_none());
    }

    #[test]
    fn hybrid_blend_when_both_signals_exist() {
        let mut index = MemoryIndex::empty();
        let mut e = entry("a", "rust ownership rules", 1);
        e.embedding = Some(StoredEmbedding::Binary(encode_embedding(&spike(0))));
        index.entries.push(e);

        let qv = spike(0);
        let ranked = rank_entries(&index, "ownership", Some(&qv), &opts(0.0), now());
        // 0.6 * 1.0 + 0.4 * 0.5 + 0.01
        assert!((ranked[0].score - 0.81).abs() < 1e-9);

        // vector-only query uses the semantic score directly
        let ranked = rank_entries(&index, "", Some(&qv), &opts(0.0), now());
        assert!((ranked[0].score - 1.01).abs() < 1e-9);
    }

    #[test]
    fn entry_without_vector_falls_back_to_keyword() {
        let mut index = MemoryIndex::empty();
        index.entries.push(entry("a", "rust ownership rules", 1));
        let qv = spike(0);
        let ranked = rank_entries(&index, "ownership", Some(&qv), &opts(0.0), now());
        assert!((ranked[0].score - 0.51).abs() < 1e-9);
    }

    #[test]
    fn threshold_sort_and_truncate() {
        let mut index = MemoryIndex::empty();
        index.entries.push(entry("low", "nothing relevant", 5));
        index.entries.push(entry("tie1", "deploy notes", 5));
        index.entries.push(entry("best", "deploy notes", 9));
        index.entries.push(entry("tie2", "deploy notes", 5));

        let ranked = rank_entries(&index, "deploy", None, &opts(0.3), now());
        let ids: Vec<&str> = ranked
            .iter()
            .map(|s| index.entries[s.position].id.as_str())
            .collect();
        assert_eq!(ids, vec!["best", "tie1", "tie2"]);

        let mut limited = opts(0.3);
        limited.max_results = 2;
        assert_eq!(rank_entries(&index, "deploy", None, &limited, now()).len(), 2);
    }

    #[test]
    fn search_marks_results_touched() {
        let mut index = MemoryIndex::empty();
        index.entries.push(entry("a", "deploy notes", 5));
        index.entries.push(entry("b", "unrelated", 5));
        let response = search(&mut index, "deploy", None, &opts(0.3));
        assert_eq!(response.touched, vec!["a".to_string()]);
        assert_eq!(index.entries[0].access_count, 1);
        assert_eq!(index.entries[1].access_count, 0);
    }

    #[test]
    fn truncate_preview_respects_char_boundaries() {
        assert_eq!(truncate_preview("short", 10), "short");
        assert_eq!(truncate_preview("héllo wörld", 5), "héllo...");
    }
}
