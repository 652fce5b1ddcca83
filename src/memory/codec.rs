//! Entry codec: one record in, one line out.
//!
//! Handles date normalization, the compact base64 embedding encoding, the metadata
//! header line, and upgrading the oldest whole-file JSON format into a [`MemoryIndex`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::EMBEDDING_DIM;
use crate::memory::types::{MemoryEntry, MemoryIndex, StoredEmbedding, CURRENT_FORMAT_VERSION};

/// Label written to the header describing the compact embedding encoding.
pub const EMBEDDING_FORMAT: &str = "base64-f32le";

/// Key that marks a line as the metadata header.
const META_KEY: &str = "_meta";

/// Key that identifies the legacy whole-file format.
const LEGACY_COLLECTION_KEY: &str = "\"memories\"";

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("embedding is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("embedding byte length {0} is not a multiple of 4")]
    BadLength(usize),
}

/// Current instant as an ISO 8601 string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Parse a timestamp into an instant. Accepts RFC 3339, naive date-times, and bare dates.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Calendar day (`YYYY-MM-DD`) of `ts`, or today's date when `ts` does not parse.
pub fn normalize_date(ts: &str) -> String {
    match parse_timestamp(ts) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => today(),
    }
}

/// Attach `date` if missing. An existing `date` is never overwritten.
pub fn ensure_date(mut entry: MemoryEntry) -> MemoryEntry {
    if entry.date.is_none() {
        entry.date = Some(normalize_date(&entry.timestamp));
    }
    entry
}

/// Encode a float vector as base64 of its little-endian `f32` bytes.
pub fn encode_embedding(vector: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

/// Decode text produced by [`encode_embedding`]. Bit-exact for every `f32`.
pub fn decode_embedding(text: &str) -> Result<Vec<f32>, CodecError> {
    let bytes = STANDARD.decode(text.trim())?;
    if bytes.len() % 4 != 0 {
        return Err(CodecError::BadLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Uniform vector view of an entry's embedding, whichever form it was stored in.
pub fn embedding_f32(entry: &MemoryEntry) -> Option<Vec<f32>> {
    match entry.embedding.as_ref()? {
        StoredEmbedding::Vector(v) => Some(v.clone()),
        StoredEmbedding::Binary(text) => match decode_embedding(text) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(id = %entry.id, "unreadable embedding: {e}");
                None
            }
        },
    }
}

/// Rewrite a legacy array embedding in the compact form. Returns `true` if it changed.
pub fn to_binary(entry: &mut MemoryEntry) -> bool {
    if let Some(StoredEmbedding::Vector(v)) = &entry.embedding {
        entry.embedding = Some(StoredEmbedding::Binary(encode_embedding(v)));
        true
    } else {
        false
    }
}

/// The metadata record on the first line of a line-oriented index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHeader {
    #[serde(rename = "_meta")]
    pub meta: bool,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

impl IndexHeader {
    /// Header describing `index` as written by the current store.
    pub fn for_index(index: &MemoryIndex) -> Self {
        let version = if index.version.is_empty() {
            CURRENT_FORMAT_VERSION.to_string()
        } else {
            index.version.clone()
        };
        Self {
            meta: true,
            version,
            last_updated: index.last_updated.clone(),
            embedding_model: index.embedding_model.clone(),
            embedding_format: Some(EMBEDDING_FORMAT.to_string()),
            dimensions: Some(EMBEDDING_DIM),
        }
    }
}

/// One parsed line of a line-oriented index.
#[derive(Debug)]
pub enum IndexLine {
    Header(IndexHeader),
    Entry(MemoryEntry),
}

/// Parse one non-blank line. The returned entry has its `date` ensured.
pub fn parse_line(line: &str) -> Result<IndexLine, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get(META_KEY).and_then(|v| v.as_bool()) == Some(true) {
        return Ok(IndexLine::Header(serde_json::from_value(value)?));
    }
    let entry: MemoryEntry = serde_json::from_value(value)?;
    Ok(IndexLine::Entry(ensure_date(entry)))
}

pub fn serialize_header(header: &IndexHeader) -> Result<String, serde_json::Error> {
    serde_json::to_string(header)
}

/// Serialize an entry as a single line, applying the compact embedding encoding.
pub fn serialize_entry(entry: &MemoryEntry) -> Result<String, serde_json::Error> {
    if matches!(entry.embedding, Some(StoredEmbedding::Vector(_))) {
        let mut entry = entry.clone();
        to_binary(&mut entry);
        serde_json::to_string(&entry)
    } else {
        serde_json::to_string(entry)
    }
}

/// `true` when `content` could be the legacy whole-file format.
pub fn looks_like_legacy(content: &str) -> bool {
    content.contains(LEGACY_COLLECTION_KEY)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyIndex {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
    memories: Vec<serde_json::Value>,
    #[serde(default)]
    embedding_model: Option<String>,
}

/// Convert the legacy `{version, lastUpdated, memories: [...], embeddingModel}` blob.
///
/// Individual records that do not fit the entry shape are skipped with a warning.
pub fn parse_legacy(content: &str) -> Result<MemoryIndex, serde_json::Error> {
    let legacy: LegacyIndex = serde_json::from_str(content)?;
    let mut entries = Vec::with_capacity(legacy.memories.len());
    for (i, raw) in legacy.memories.into_iter().enumerate() {
        match serde_json::from_value::<MemoryEntry>(raw) {
            Ok(entry) => entries.push(ensure_date(entry)),
            Err(e) => tracing::warn!(position = i, "skipping malformed legacy memory: {e}"),
        }
    }
    Ok(MemoryIndex {
        version: legacy
            .version
            .unwrap_or_else(|| CURRENT_FORMAT_VERSION.to_string()),
        last_updated: legacy.last_updated,
        entries,
        embedding_model: legacy.embedding_model,
    })
}
