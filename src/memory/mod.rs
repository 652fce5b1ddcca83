pub mod autolink;
pub mod codec;
pub mod embed;
pub mod migrate;
pub mod relations;
pub mod scoring;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

/// Caller-supplied fields for a new record.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub memory_type: types::MemoryType,
    pub importance: u8,
    pub content: String,
    pub tags: Vec<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub context: Option<String>,
}

/// Build a record with a fresh id and timestamp. Blank tags are dropped.
pub fn create_entry(new: NewEntry) -> types::MemoryEntry {
    let mut entry = types::MemoryEntry::new(new.memory_type, new.importance, new.content);
    entry.tags = new
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    entry.file = new.file.filter(|f| !f.is_empty());
    entry.line = new.line;
    entry.context = new.context;
    entry
}

/// Find an entry and describe its outgoing edges with a short preview of each target.
pub fn inspect_entry(index: &types::MemoryIndex, id: &str) -> Option<InspectResponse> {
    let entry = index.get(id)?;
    let relations = entry
        .relations
        .iter()
        .map(|rel| InspectRelation {
            relation_type: rel.relation_type,
            target_id: rel.target_id.clone(),
            preview: index
                .get(&rel.target_id)
                .map(|t| search::truncate_preview(&t.content, 100)),
        })
        .collect();
    Some(InspectResponse {
        memory: entry.clone(),
        path: search::display_path(entry.file.as_deref()),
        relations,
    })
}

/// Full inspection response for a single entry.
#[derive(Debug, serde::Serialize)]
pub struct InspectResponse {
    pub memory: types::MemoryEntry,
    pub path: String,
    pub relations: Vec<InspectRelation>,
}

#[derive(Debug, serde::Serialize)]
pub struct InspectRelation {
    #[serde(rename = "type")]
    pub relation_type: types::RelationType,
    pub target_id: String,
    /// `None` when the edge points at an id no longer in the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}
