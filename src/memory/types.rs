//! Core index type definitions.
//!
//! Defines [`MemoryType`] (the closed set of record kinds), [`RelationType`]
//! (typed graph edges with a compile-time inverse), [`MemoryEntry`] (one record as
//! stored on disk), [`StoredEmbedding`] (legacy array vs compact text), and
//! [`MemoryIndex`] (the whole collection plus header metadata).

use serde::{Deserialize, Deserializer, Serialize};

/// Format tag written by the current line-oriented store.
pub const CURRENT_FORMAT_VERSION: &str = "3.0";

/// Kind of knowledge a record captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Learning,
    Decision,
    Interaction,
    Event,
    Insight,
}

impl MemoryType {
    pub const ALL: [MemoryType; 5] = [
        Self::Learning,
        Self::Decision,
        Self::Interaction,
        Self::Event,
        Self::Insight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learning => "learning",
            Self::Decision => "decision",
            Self::Interaction => "interaction",
            Self::Event => "event",
            Self::Insight => "insight",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learning" => Ok(Self::Learning),
            "decision" => Ok(Self::Decision),
            "interaction" => Ok(Self::Interaction),
            "event" => Ok(Self::Event),
            "insight" => Ok(Self::Insight),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// Typed edge between two entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Caused,
    CausedBy,
    Related,
    Supersedes,
    Contradicts,
    Elaborates,
}

impl RelationType {
    /// The edge type stored on the target when an edge of this type is added to the source.
    pub fn inverse(self) -> RelationType {
        match self {
            Self::Caused => Self::CausedBy,
            Self::CausedBy => Self::Caused,
            Self::Related => Self::Related,
            Self::Supersedes => Self::Supersedes,
            Self::Contradicts => Self::Contradicts,
            Self::Elaborates => Self::Elaborates,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Caused => "caused",
            Self::CausedBy => "caused_by",
            Self::Related => "related",
            Self::Supersedes => "supersedes",
            Self::Contradicts => "contradicts",
            Self::Elaborates => "elaborates",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caused" => Ok(Self::Caused),
            "caused_by" => Ok(Self::CausedBy),
            "related" => Ok(Self::Related),
            "supersedes" => Ok(Self::Supersedes),
            "contradicts" => Ok(Self::Contradicts),
            "elaborates" => Ok(Self::Elaborates),
            _ => Err(format!("unknown relation type: {s}")),
        }
    }
}

/// One outgoing edge on an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub target_id: String,
    pub relation_type: RelationType,
}

/// Embedding as persisted: older writers stored a plain number array, current ones a
/// base64 blob of little-endian `f32`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEmbedding {
    Vector(Vec<f32>),
    Binary(String),
}

impl StoredEmbedding {
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

/// A single knowledge record, one JSON object per line in the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    /// Stable unique identifier. Uniqueness is assumed, not checked.
    pub id: String,
    /// ISO 8601 creation instant.
    pub timestamp: String,
    /// Calendar day (`YYYY-MM-DD`) derived from `timestamp` on first read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Caller-assigned raw weight, 1–10.
    pub importance: u8,
    pub content: String,
    /// Provenance: source document relative to the memory root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<StoredEmbedding>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relations: Vec<Relation>,
    /// Times this entry surfaced in a graph-expanded search.
    #[serde(default, deserialize_with = "null_as_default")]
    pub access_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
}

/// Older writers emit `null` for empty collections and counters.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MemoryEntry {
    /// A fresh record: UUID v7 id, current timestamp and date, importance clamped to 1–10.
    pub fn new(memory_type: MemoryType, importance: u8, content: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            timestamp: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            date: Some(now.format("%Y-%m-%d").to_string()),
            memory_type,
            importance: importance.clamp(1, 10),
            content: content.into(),
            file: None,
            line: None,
            tags: Vec::new(),
            context: None,
            embedding: None,
            relations: Vec::new(),
            access_count: 0,
            last_accessed: None,
        }
    }
}

/// The whole collection. Entry order is insertion order and breaks score ties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryIndex {
    pub version: String,
    pub last_updated: Option<String>,
    pub entries: Vec<MemoryEntry>,
    /// Model that produced the stored vectors, if known.
    pub embedding_model: Option<String>,
}

impl MemoryIndex {
    /// An index with no entries, tagged with the current format version.
    pub fn empty() -> Self {
        Self {
            version: CURRENT_FORMAT_VERSION.to_string(),
            ..Default::default()
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&MemoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut MemoryEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}
