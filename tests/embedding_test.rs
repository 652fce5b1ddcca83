mod helpers;

use helpers::{embedded_entry, entry, similar_embedding, temp_store, test_embedding};
use memdex::embedding::{Embedder, EmbedderStatus, EmbeddingProvider};
use memdex::memory::autolink::auto_link;
use memdex::memory::codec;
use memdex::memory::embed::{embed_entries, EmbedOptions};
use memdex::memory::scoring::cosine_similarity;
use memdex::memory::search::{search, SearchOptions};
use memdex::memory::types::{MemoryIndex, MemoryType, RelationType};
use std::collections::HashMap;
use std::sync::Arc;

/// `e0 + t·e(k)`, normalized: cosine similarity to `e0` is `1 / sqrt(1 + t²)`.
fn tilted(t: f32, k: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; 384];
    v[0] = 1.0;
    v[k] = t;
    let norm = (1.0 + t * t).sqrt();
    v.iter().map(|x| x / norm).collect()
}

/// Returns a fixed vector per known text.
struct Lookup(HashMap<String, Vec<f32>>);

impl EmbeddingProvider for Lookup {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.0
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no vector for {text:?}"))
    }
}

fn lookup_embedder(pairs: Vec<(&str, Vec<f32>)>) -> Embedder {
    let table: HashMap<String, Vec<f32>> =
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(Lookup(table));
    Embedder::with_loader("lookup", move || Ok(Arc::clone(&provider)))
}

#[test]
fn auto_link_takes_at_most_three_above_threshold() {
    let mut index = MemoryIndex::empty();
    index.entries.push(embedded_entry("new", "new", &test_embedding(0)));
    for (i, t) in [1.0f32, 0.1, 0.8, 0.3, 1.5, 0.5].into_iter().enumerate() {
        let id = format!("n{i}");
        index.entries.push(embedded_entry(&id, &id, &tilted(t, 10 + i)));
    }
    index.entries.push(entry("plain", MemoryType::Event, "no vector"));

    let links = auto_link(&mut index, "new", 0.65, 3);
    let targets: Vec<&str> = links.iter().map(|l| l.target_id.as_str()).collect();
    // t = 0.1, 0.3, 0.5 are the three closest.
    assert_eq!(targets, ["n1", "n3", "n5"]);
    assert!(links.iter().all(|l| l.similarity >= 0.65));

    let source = index.get("new").unwrap();
    assert_eq!(source.relations.len(), 3);
    for target in targets {
        let t = index.get(target).unwrap();
        assert_eq!(t.relations.len(), 1);
        assert_eq!(t.relations[0].target_id, "new");
        assert_eq!(t.relations[0].relation_type, RelationType::Related);
    }
    // 0.78 qualifies but lost the cut; 0.55 never qualified.
    assert!(index.get("n2").unwrap().relations.is_empty());
    assert!(index.get("n4").unwrap().relations.is_empty());
}

#[test]
fn auto_link_ignores_entries_below_threshold() {
    let mut index = MemoryIndex::empty();
    index.entries.push(embedded_entry("new", "new", &test_embedding(0)));
    index.entries.push(embedded_entry("far", "far", &tilted(1.5, 20)));
    index.entries.push(embedded_entry("orthogonal", "o", &test_embedding(5)));

    assert!(cosine_similarity(&test_embedding(0), &tilted(1.5, 20)) < 0.65);
    assert!(auto_link(&mut index, "new", 0.65, 3).is_empty());
    assert!(index.entries.iter().all(|e| e.relations.is_empty()));
}

#[tokio::test]
async fn embedding_pass_persists_vectors_model_and_links() {
    let (_tmp, store) = temp_store();
    let mut index = MemoryIndex::empty();
    index.entries.push(entry("a", MemoryType::Learning, "tune the pool size"));
    index.entries.push(entry("b", MemoryType::Learning, "pool size of twenty works"));
    index.entries.push(embedded_entry("c", "already done", &test_embedding(7)));
    store.save(&mut index).unwrap();

    let base = test_embedding(1);
    let embedder = lookup_embedder(vec![
        ("tune the pool size", base.clone()),
        ("pool size of twenty works", similar_embedding(&base)),
    ]);

    let mut index = store.load().unwrap();
    let report = embed_entries(&mut index, &embedder, &EmbedOptions::default(), || {}).await;
    assert_eq!(report.embedded, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    // a→b is created while embedding a; b's pass finds the pair already linked.
    assert_eq!(report.links_created, 1);
    store.save(&mut index).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.embedding_model.as_deref(), Some("lookup"));
    assert_eq!(codec::embedding_f32(reloaded.get("a").unwrap()).unwrap(), base);
    assert_eq!(reloaded.get("a").unwrap().relations[0].target_id, "b");
    assert_eq!(reloaded.get("b").unwrap().relations[0].target_id, "a");
    assert!(reloaded.get("c").unwrap().relations.is_empty());
}

#[tokio::test]
async fn provider_errors_count_as_failures() {
    let mut index = MemoryIndex::empty();
    index.entries.push(entry("known", MemoryType::Learning, "known text"));
    index.entries.push(entry("unknown", MemoryType::Learning, "unknown text"));
    let embedder = lookup_embedder(vec![("known text", test_embedding(3))]);

    let report = embed_entries(&mut index, &embedder, &EmbedOptions::default(), || {}).await;
    assert_eq!(report.embedded, 1);
    assert_eq!(report.failed, 1);
    assert!(index.get("unknown").unwrap().embedding.is_none());
}

#[tokio::test]
async fn failed_provider_degrades_search_to_keywords() {
    let embedder = Embedder::with_loader("broken", || -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        anyhow::bail!("model.onnx not found")
    });

    assert!(!embedder.initialize().await);
    assert!(matches!(embedder.status(), EmbedderStatus::Failed(_)));
    let message = embedder.status().unavailable_message().unwrap();
    assert!(message.contains("failed to load"));
    assert!(message.contains("model.onnx not found"));

    let query_vector = embedder.embed("retry budget").await;
    assert!(query_vector.is_none());

    let mut index = MemoryIndex::empty();
    index.entries.push(embedded_entry("r", "retry budget exhausted", &test_embedding(2)));
    let response = search(
        &mut index,
        "retry budget",
        query_vector.as_deref(),
        &SearchOptions::default(),
    );
    assert_eq!(response.results.len(), 1);
    assert!(!response.semantic);
}

#[tokio::test]
async fn unconfigured_provider_reports_distinct_message() {
    let embedder = Embedder::disabled();
    assert_eq!(embedder.status(), EmbedderStatus::NotConfigured);
    assert!(embedder.embed("anything").await.is_none());

    let message = embedder.status().unavailable_message().unwrap();
    assert!(message.contains("not configured"));
    assert!(!message.contains("failed to load"));
}

/// Claims 384 dimensions but produces 8.
struct Short;

impl EmbeddingProvider for Short {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.25; 8])
    }
}

#[tokio::test]
async fn vectors_of_wrong_dimensionality_are_never_stored() {
    let mut index = MemoryIndex::empty();
    index.entries.push(entry("a", MemoryType::Learning, "short vector"));
    let embedder = Embedder::with_loader("short", || {
        Ok(Arc::new(Short) as Arc<dyn EmbeddingProvider>)
    });

    let report = embed_entries(&mut index, &embedder, &EmbedOptions::default(), || {}).await;
    assert_eq!(report.embedded, 0);
    assert_eq!(report.failed, 1);
    assert!(index.get("a").unwrap().embedding.is_none());
    assert!(index.embedding_model.is_none());
}
