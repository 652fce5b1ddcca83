#![allow(dead_code)]

use memdex::memory::codec;
use memdex::memory::store::IndexStore;
use memdex::memory::types::{MemoryEntry, MemoryType, StoredEmbedding};
use tempfile::TempDir;

/// A store backed by `memory.jsonl` in a fresh temp dir. Keep the `TempDir` alive.
pub fn temp_store() -> (TempDir, IndexStore) {
    let tmp = TempDir::new().unwrap();
    let store = IndexStore::open(tmp.path().join("memory.jsonl")).unwrap();
    (tmp, store)
}

/// Generate a deterministic 384-dim embedding with a spike at position `seed`.
/// Distinct seeds produce orthogonal vectors.
pub fn test_embedding(seed: u16) -> Vec<f32> {
    let mut v = vec![0.0f32; 384];
    v[seed as usize % 384] = 1.0;
    v
}

/// An embedding close to `base` (cosine similarity well above 0.9).
pub fn similar_embedding(base: &[f32]) -> Vec<f32> {
    let mut v = base.to_vec();
    for i in 0..5 {
        v[(i * 37 + 1) % 384] += 0.05;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// An entry with a fixed id and a fresh timestamp.
pub fn entry(id: &str, memory_type: MemoryType, content: &str) -> MemoryEntry {
    let mut e = MemoryEntry::new(memory_type, 5, content);
    e.id = id.to_string();
    e
}

/// An entry carrying `vector` in the compact encoding.
pub fn embedded_entry(id: &str, content: &str, vector: &[f32]) -> MemoryEntry {
    let mut e = entry(id, MemoryType::Learning, content);
    e.embedding = Some(StoredEmbedding::Binary(codec::encode_embedding(vector)));
    e
}

/// An entry carrying `vector` as a legacy numeric array.
pub fn legacy_embedded_entry(id: &str, content: &str, vector: &[f32]) -> MemoryEntry {
    let mut e = entry(id, MemoryType::Learning, content);
    e.embedding = Some(StoredEmbedding::Vector(vector.to_vec()));
    e
}
