mod helpers;

use helpers::{embedded_entry, entry, temp_store, test_embedding};
use memdex::memory::codec;
use memdex::memory::store::load_index;
use memdex::memory::types::{MemoryIndex, MemoryType, CURRENT_FORMAT_VERSION};
use std::fs;

#[test]
fn missing_file_loads_as_empty_index() {
    let (_tmp, store) = temp_store();
    assert!(!store.path().exists());

    let index = store.load().unwrap();
    assert!(index.entries.is_empty());
    assert_eq!(index.version, CURRENT_FORMAT_VERSION);
}

#[test]
fn save_then_load_preserves_entries_and_header() {
    let (_tmp, store) = temp_store();

    let mut index = MemoryIndex::empty();
    index.embedding_model = Some("all-MiniLM-L6-v2".into());
    index.entries.push(entry("a", MemoryType::Decision, "use line-oriented storage"));
    index.entries.push(embedded_entry("b", "vectors are base64", &test_embedding(3)));
    store.save(&mut index).unwrap();
    assert!(index.last_updated.is_some());

    let raw = fs::read_to_string(store.path()).unwrap();
    let first = raw.lines().next().unwrap();
    let header: serde_json::Value = serde_json::from_str(first).unwrap();
    assert_eq!(header["_meta"], true);
    assert_eq!(header["version"], CURRENT_FORMAT_VERSION);
    assert_eq!(header["embeddingFormat"], "base64-f32le");
    assert_eq!(header["dimensions"], 384);
    assert_eq!(raw.lines().count(), 3);

    let loaded = store.load().unwrap();
    assert_eq!(loaded.entries.len(), 2);
    assert_eq!(loaded.entries[0].id, "a");
    assert_eq!(loaded.entries[1].id, "b");
    assert_eq!(loaded.embedding_model.as_deref(), Some("all-MiniLM-L6-v2"));
    assert_eq!(loaded.last_updated, index.last_updated);
    assert_eq!(
        codec::embedding_f32(&loaded.entries[1]).unwrap(),
        test_embedding(3)
    );
}

#[test]
fn append_to_missing_file_writes_header_first() {
    let (_tmp, store) = temp_store();
    store.append(entry("a", MemoryType::Event, "first")).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"_meta\":true"));

    let index = store.load().unwrap();
    assert_eq!(index.entries.len(), 1);
    assert_eq!(index.entries[0].content, "first");
}

#[test]
fn append_leaves_existing_header_untouched() {
    let (_tmp, store) = temp_store();
    let mut index = MemoryIndex::empty();
    index.version = "2.0".into();
    index.entries.push(entry("a", MemoryType::Learning, "one"));
    store.save(&mut index).unwrap();
    let header_before = fs::read_to_string(store.path())
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string();

    store.append(entry("b", MemoryType::Learning, "two")).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    assert_eq!(raw.lines().next().unwrap(), header_before);
    let loaded = store.load().unwrap();
    assert_eq!(loaded.version, "2.0");
    assert_eq!(loaded.entries.len(), 2);
}

#[test]
fn append_repairs_missing_trailing_newline() {
    let (_tmp, store) = temp_store();
    let a = serde_json::to_string(&entry("a", MemoryType::Learning, "one")).unwrap();
    fs::write(store.path(), format!("{{\"_meta\":true,\"version\":\"3.0\"}}\n{a}")).unwrap();

    store.append(entry("b", MemoryType::Learning, "two")).unwrap();

    let ids: Vec<String> = store.load().unwrap().entries.into_iter().map(|e| e.id).collect();
    assert_eq!(ids, ["a", "b"]);
}

#[test]
fn malformed_and_blank_lines_are_skipped() {
    let (_tmp, store) = temp_store();
    let a = serde_json::to_string(&entry("a", MemoryType::Learning, "one")).unwrap();
    let b = serde_json::to_string(&entry("b", MemoryType::Insight, "two")).unwrap();
    let content = format!(
        "{{\"_meta\":true,\"version\":\"3.0\"}}\n{a}\n\n{{not json at all\n   \n{b}\n{{\"id\":\"no-type\"}}\n"
    );
    fs::write(store.path(), content).unwrap();

    let index = store.load().unwrap();
    let ids: Vec<&str> = index.entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}

#[test]
fn entries_without_optional_fields_load_with_defaults() {
    let (_tmp, store) = temp_store();
    fs::write(
        store.path(),
        "{\"id\":\"bare\",\"timestamp\":\"2024-03-09T08:00:00Z\",\"type\":\"event\",\"importance\":3,\"content\":\"bare entry\"}\n",
    )
    .unwrap();

    let index = store.load().unwrap();
    let e = &index.entries[0];
    assert_eq!(e.date.as_deref(), Some("2024-03-09"));
    assert!(e.file.is_none());
    assert!(e.line.is_none());
    assert!(e.tags.is_empty());
    assert!(e.relations.is_empty());
    assert_eq!(e.access_count, 0);
}

#[test]
fn legacy_single_json_file_is_read() {
    let (_tmp, store) = temp_store();
    let legacy = r#"{
  "version": "1.0",
  "lastUpdated": "2024-01-02T00:00:00Z",
  "embeddingModel": "old-model",
  "memories": [
    {"id": "m1", "timestamp": "2024-01-01T12:00:00Z", "type": "learning",
     "importance": 6, "content": "legacy one", "embedding": [0.5, -0.25]},
    {"id": "m2", "timestamp": "2024-01-02T09:30:00Z", "type": "decision",
     "importance": 4, "content": "legacy two"}
  ]
}"#;
    fs::write(store.path(), legacy).unwrap();

    let index = store.load().unwrap();
    assert_eq!(index.version, "1.0");
    assert_eq!(index.embedding_model.as_deref(), Some("old-model"));
    assert_eq!(index.entries.len(), 2);
    assert_eq!(index.entries[0].date.as_deref(), Some("2024-01-01"));
    assert_eq!(
        codec::embedding_f32(&index.entries[0]).unwrap(),
        vec![0.5f32, -0.25]
    );
}

#[test]
fn unparsable_legacy_file_loads_as_empty() {
    let (_tmp, store) = temp_store();
    fs::write(store.path(), "{\"memories\": [ {\"id\": \"m1\", ").unwrap();

    let index = load_index(store.path()).unwrap();
    assert!(index.entries.is_empty());
}

#[test]
fn save_creates_missing_parent_directories() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("deeper").join("memory.jsonl");
    let store = memdex::memory::store::IndexStore::open(&path).unwrap();

    let mut index = MemoryIndex::empty();
    index.entries.push(entry("a", MemoryType::Learning, "x"));
    store.save(&mut index).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn invalid_utf8_line_is_skipped_not_fatal() {
    let (_tmp, store) = temp_store();
    let a = serde_json::to_string(&entry("a", MemoryType::Learning, "survives")).unwrap();
    let mut bytes = b"{\"_meta\":true,\"version\":\"3.0\"}\n".to_vec();
    bytes.extend_from_slice(a.as_bytes());
    bytes.extend_from_slice(b"\n{\"id\":\"bad\xff\"}\n");
    fs::write(store.path(), bytes).unwrap();

    let index = store.load().unwrap();
    assert_eq!(index.entries.len(), 1);
    assert_eq!(index.entries[0].id, "a");

    // The file stays writable after the bad line.
    store.append(entry("b", MemoryType::Event, "after")).unwrap();
    assert_eq!(store.load().unwrap().entries.len(), 2);
}

#[test]
fn null_collections_from_older_writers_keep_the_entry() {
    let (_tmp, store) = temp_store();
    fs::write(
        store.path(),
        "{\"_meta\":true,\"version\":\"2.0\"}\n\
         {\"id\":\"old\",\"timestamp\":\"2024-01-05T00:00:00Z\",\"type\":\"learning\",\"importance\":5,\
         \"content\":\"null fields\",\"tags\":null,\"relations\":null,\"file\":null,\"line\":null}\n",
    )
    .unwrap();

    let index = store.load().unwrap();
    assert_eq!(index.entries.len(), 1);
    let e = &index.entries[0];
    assert!(e.tags.is_empty());
    assert!(e.relations.is_empty());
    assert!(e.file.is_none());
}
