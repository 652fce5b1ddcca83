//! Relation graph: typed, paired edges between entries.
//!
//! Edges live on the source entry's `relations` list. [`link_memories`] keeps them paired
//! by adding the inverse edge on the target; [`expand_with_relations`] walks them at query
//! time to surface related context and records access on every surfaced result.

use anyhow::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::memory::codec;
use crate::memory::search::{display_path, SearchResult};
use crate::memory::store::IndexStore;
use crate::memory::types::{MemoryEntry, MemoryIndex, MemoryType, Relation, RelationType};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("{}", not_found_message(.source_id, .target_id))]
    NotFound {
        source_id: Option<String>,
        target_id: Option<String>,
    },
    #[error("cannot link memory {0} to itself")]
    SelfLink(String),
}

fn not_found_message(source: &Option<String>, target: &Option<String>) -> String {
    match (source, target) {
        (Some(s), Some(t)) => format!("source memory {s} and target memory {t} not found"),
        (Some(s), None) => format!("source memory {s} not found"),
        (None, Some(t)) => format!("target memory {t} not found"),
        (None, None) => "memory not found".to_string(),
    }
}

/// What a successful link changed. Both flags are `false` when the pair already existed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkOutcome {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub inverse_type: RelationType,
    pub forward_added: bool,
    pub inverse_added: bool,
}

/// An entry reached by walking the relation graph from a ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedEntry {
    pub id: String,
    /// Type of the edge that reached this entry.
    pub relation: RelationType,
    /// Entry the edge starts from.
    pub via: String,
    /// Hops from the ranked result (1 = direct neighbor).
    pub depth: usize,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub path: String,
    pub content: String,
}

/// Append `(target_id, relation_type)` unless that exact pair is already present.
/// Returns `true` if the edge was added.
pub fn add_relation(entry: &mut MemoryEntry, target_id: &str, relation_type: RelationType) -> bool {
    let exists = entry
        .relations
        .iter()
        .any(|r| r.target_id == target_id && r.relation_type == relation_type);
    if exists {
        return false;
    }
    entry.relations.push(Relation {
        target_id: target_id.to_string(),
        relation_type,
    });
    true
}

/// Add `source --type--> target` and `target --inverse--> source`.
///
/// Both ids must exist; otherwise nothing is changed and the error names the missing side(s).
pub fn link_memories(
    index: &mut MemoryIndex,
    source_id: &str,
    target_id: &str,
    relation_type: RelationType,
) -> Result<LinkOutcome, LinkError> {
    if source_id == target_id {
        return Err(LinkError::SelfLink(source_id.to_string()));
    }

    let source_pos = index.position(source_id);
    let target_pos = index.position(target_id);
    let (source_pos, target_pos) = match (source_pos, target_pos) {
        (Some(s), Some(t)) => (s, t),
        (s, t) => {
            return Err(LinkError::NotFound {
                source_id: s.is_none().then(|| source_id.to_string()),
                target_id: t.is_none().then(|| target_id.to_string()),
            })
        }
    };

    let inverse_type = relation_type.inverse();
    let forward_added = add_relation(&mut index.entries[source_pos], target_id, relation_type);
    let inverse_added = add_relation(&mut index.entries[target_pos], source_id, inverse_type);

    Ok(LinkOutcome {
        source_id: source_id.to_string(),
        target_id: target_id.to_string(),
        relation_type,
        inverse_type,
        forward_added,
        inverse_added,
    })
}

/// Load → link → save. The file is written only when both ids were found.
pub fn link_and_save(
    store: &IndexStore,
    source_id: &str,
    target_id: &str,
    relation_type: RelationType,
) -> Result<LinkOutcome> {
    let mut index = store.load()?;
    let outcome = link_memories(&mut index, source_id, target_id, relation_type)?;
    if outcome.forward_added || outcome.inverse_added {
        store.save(&mut index)?;
    }
    tracing::info!(
        source = %source_id,
        target = %target_id,
        relation = %relation_type,
        "memories linked"
    );
    Ok(outcome)
}

/// Attach related entries to each ranked result by walking up to `depth` hops.
///
/// The visited set for each walk starts with every top-level result id, so ranked entries
/// never reappear as "related". Every result's `access_count` is incremented and its
/// `last_accessed` stamped; the caller must save `index` to persist that.
pub fn expand_with_relations(
    index: &mut MemoryIndex,
    results: &mut [SearchResult],
    depth: usize,
) {
    let positions: HashMap<&str, usize> = index
        .entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.as_str(), i))
        .collect();
    let top_level: HashSet<&str> = results.iter().map(|r| r.id.as_str()).collect();

    let mut expansions = Vec::with_capacity(results.len());
    for result in results.iter() {
        let mut visited = top_level.clone();
        visited.insert(result.id.as_str());

        let mut related = Vec::new();
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        if let Some(&start) = positions.get(result.id.as_str()) {
            queue.push_back((start, 0));
        }

        while let Some((pos, hops)) = queue.pop_front() {
            if hops >= depth {
                continue;
            }
            let from = &index.entries[pos];
            for rel in &from.relations {
                if visited.contains(rel.target_id.as_str()) {
                    continue;
                }
                let Some(&target_pos) = positions.get(rel.target_id.as_str()) else {
                    continue;
                };
                let target = &index.entries[target_pos];
                visited.insert(target.id.as_str());
                related.push(RelatedEntry {
                    id: target.id.clone(),
                    relation: rel.relation_type,
                    via: from.id.clone(),
                    depth: hops + 1,
                    memory_type: target.memory_type,
                    path: display_path(target.file.as_deref()),
                    content: target.content.clone(),
                });
                queue.push_back((target_pos, hops + 1));
            }
        }
        expansions.push(related);
    }

    let now = codec::now_iso();
    for (result, related) in results.iter_mut().zip(expansions) {
        result.related = related;
        if let Some(entry) = index.get_mut(&result.id) {
            entry.access_count = entry.access_count.saturating_add(1);
            entry.last_accessed = Some(now.clone());
        }
    }
}
