//! Auto-linking: connect a freshly embedded entry to its nearest neighbors.

use serde::Serialize;

use crate::memory::codec;
use crate::memory::relations::add_relation;
use crate::memory::scoring::cosine_similarity;
use crate::memory::types::{MemoryIndex, RelationType};

/// Neighbors must reach this cosine similarity to be linked.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.65;
/// At most this many neighbors are linked per entry.
pub const DEFAULT_MAX_LINKS: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AutoLink {
    pub source_id: String,
    pub target_id: String,
    pub similarity: f64,
}

/// Link `entry_id` to its most similar embedded neighbors with symmetric `related` edges.
///
/// Candidates below `threshold` are ignored; the best `max_links` (by similarity, ties in
/// index order) are linked. Returns the links whose forward edge was newly added.
pub fn auto_link(
    index: &mut MemoryIndex,
    entry_id: &str,
    threshold: f64,
    max_links: usize,
) -> Vec<AutoLink> {
    let Some(source_pos) = index.position(entry_id) else {
        return Vec::new();
    };
    let Some(source_vec) = codec::embedding_f32(&index.entries[source_pos]) else {
        return Vec::new();
    };

    let mut candidates: Vec<(usize, f64)> = index
        .entries
        .iter()
        .enumerate()
        .filter(|(pos, _)| *pos != source_pos)
        .filter_map(|(pos, entry)| {
            let vector = codec::embedding_f32(entry)?;
            let similarity = cosine_similarity(&source_vec, &vector);
            (similarity >= threshold).then_some((pos, similarity))
        })
        .collect();

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(max_links);

    let mut links = Vec::new();
    for (target_pos, similarity) in candidates {
        let target_id = index.entries[target_pos].id.clone();
        let added = add_relation(&mut index.entries[source_pos], &target_id, RelationType::Related);
        add_relation(
            &mut index.entries[target_pos],
            entry_id,
            RelationType::Related.inverse(),
        );
        if added {
            links.push(AutoLink {
                source_id: entry_id.to_string(),
                target_id,
                similarity,
            });
        }
    }

    if !links.is_empty() {
        tracing::debug!(id = %entry_id, links = links.len(), "auto-linked entry");
    }
    links
}
