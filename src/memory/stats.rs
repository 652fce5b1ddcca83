use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::memory::codec;
use crate::memory::types::{MemoryIndex, MemoryType, StoredEmbedding};

/// Response from memory_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_memories: usize,
    pub by_type: BTreeMap<String, usize>,
    /// Entries whose embedding is in the compact encoding.
    pub embedded_binary: usize,
    /// Entries still carrying a legacy number-array embedding.
    pub embedded_legacy: usize,
    pub relation_edges: usize,
    /// Version tag from the header. `append` never refreshes it, so it can lag behind.
    pub format_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub file_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

/// Compute index statistics. `path` is used for the file size; pass `None` to skip it.
pub fn index_stats(index: &MemoryIndex, path: Option<&Path>) -> StatsResponse {
    let mut by_type: BTreeMap<String, usize> = MemoryType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    let mut embedded_binary = 0;
    let mut embedded_legacy = 0;
    let mut relation_edges = 0;

    for entry in &index.entries {
        *by_type.entry(entry.memory_type.as_str().to_string()).or_default() += 1;
        match entry.embedding {
            Some(StoredEmbedding::Binary(_)) => embedded_binary += 1,
            Some(StoredEmbedding::Vector(_)) => embedded_legacy += 1,
            None => {}
        }
        relation_edges += entry.relations.len();
    }

    // Unparseable timestamps are left out of the range.
    let dated = || {
        index
            .entries
            .iter()
            .filter_map(|e| codec::parse_timestamp(&e.timestamp).map(|t| (t, &e.timestamp)))
    };
    let oldest_memory = dated().min_by_key(|(t, _)| *t).map(|(_, ts)| ts.clone());
    let newest_memory = dated().max_by_key(|(t, _)| *t).map(|(_, ts)| ts.clone());

    let file_size_bytes = path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    StatsResponse {
        total_memories: index.entries.len(),
        by_type,
        embedded_binary,
        embedded_legacy,
        relation_edges,
        format_version: index.version.clone(),
        embedding_model: index.embedding_model.clone(),
        last_updated: index.last_updated.clone(),
        file_size_bytes,
        oldest_memory,
        newest_memory,
    }
}
