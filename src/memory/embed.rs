//! Embedding generation pass: fill in missing vectors, then auto-link the new ones.

use anyhow::Result;
use serde::Serialize;

use crate::config::LinkingConfig;
use crate::embedding::Embedder;
use crate::memory::autolink::{auto_link, AutoLink};
use crate::memory::codec;
use crate::memory::store::IndexStore;
use crate::memory::types::{MemoryEntry, MemoryIndex, StoredEmbedding};

#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Re-embed entries that already have a vector.
    pub force: bool,
    pub auto_link: bool,
    pub similarity_threshold: f64,
    pub max_links: usize,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        LinkingConfig::default().into()
    }
}

impl From<LinkingConfig> for EmbedOptions {
    fn from(config: LinkingConfig) -> Self {
        Self {
            force: false,
            auto_link: config.auto_link,
            similarity_threshold: config.similarity_threshold,
            max_links: config.max_links,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct EmbedReport {
    pub embedded: usize,
    pub failed: usize,
    /// Entries that already had a vector and were left alone.
    pub skipped: usize,
    pub links_created: usize,
    /// Why nothing was embedded, when the provider is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

/// Embed entries that lack a vector (all entries with `force`) and auto-link them.
///
/// `on_progress` is called once per processed entry. The index is modified in place and
/// must be saved by the caller when `embedded > 0`.
pub async fn embed_entries(
    index: &mut MemoryIndex,
    embedder: &Embedder,
    options: &EmbedOptions,
    mut on_progress: impl FnMut(),
) -> EmbedReport {
    let mut report = EmbedReport::default();

    if !embedder.initialize().await {
        report.unavailable = embedder.status().unavailable_message();
        return report;
    }

    let mut newly_embedded = Vec::new();
    for entry in &mut index.entries {
        if entry.embedding.is_some() && !options.force {
            report.skipped += 1;
            on_progress();
            continue;
        }
        match embedder.embed(&entry.content).await {
            Some(vector) => {
                entry.embedding = Some(StoredEmbedding::Binary(codec::encode_embedding(&vector)));
                newly_embedded.push(entry.id.clone());
                report.embedded += 1;
            }
            None => report.failed += 1,
        }
        on_progress();
    }

    if report.embedded > 0 {
        if let Some(model) = embedder.model() {
            index.embedding_model = Some(model.to_string());
        }
    }

    if options.auto_link {
        for id in &newly_embedded {
            report.links_created +=
                auto_link(index, id, options.similarity_threshold, options.max_links).len();
        }
    }

    tracing::info!(
        embedded = report.embedded,
        failed = report.failed,
        skipped = report.skipped,
        links = report.links_created,
        "embedding pass complete"
    );
    report
}

/// Result of persisting one new entry.
#[derive(Debug, Serialize)]
pub struct StoreOutcome {
    pub id: String,
    pub embedded: bool,
    pub links: Vec<AutoLink>,
}

/// Embed a new entry when a provider is available and persist it.
///
/// Without a vector (or with auto-linking off) the entry is appended. Otherwise the index
/// is loaded, the entry pushed and linked to its neighbors, and the whole file rewritten.
pub async fn store_new_entry(
    store: &IndexStore,
    mut entry: MemoryEntry,
    embedder: &Embedder,
    options: &EmbedOptions,
) -> Result<StoreOutcome> {
    let id = entry.id.clone();
    let vector = embedder.embed(&entry.content).await;
    let embedded = vector.is_some();
    if let Some(vector) = &vector {
        entry.embedding = Some(StoredEmbedding::Binary(codec::encode_embedding(vector)));
    }

    if !(embedded && options.auto_link) {
        store.append(entry)?;
        tracing::info!(id = %id, embedded, "memory appended");
        return Ok(StoreOutcome {
            id,
            embedded,
            links: Vec::new(),
        });
    }

    let mut index = store.load()?;
    index.entries.push(entry);
    if let Some(model) = embedder.model() {
        index.embedding_model = Some(model.to_string());
    }
    let links = auto_link(&mut index, &id, options.similarity_threshold, options.max_links);
    store.save(&mut index)?;
    tracing::info!(id = %id, links = links.len(), "memory stored and linked");

    Ok(StoreOutcome {
        id,
        embedded,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingProvider;
    use crate::memory::types::{MemoryEntry, MemoryType};
    use std::sync::Arc;

    /// Maps text to a vector by its first byte so equal prefixes are identical.
    struct FirstByte;

    impl EmbeddingProvider for FirstByte {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let mut v = vec![0.0f32; 8];
            v[text.as_bytes()[0] as usize % 8] = 1.0;
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    fn embedder() -> Embedder {
        Embedder::with_loader("first-byte", || {
            Ok(Arc::new(FirstByte) as Arc<dyn EmbeddingProvider>)
        })
    }

    #[tokio::test]
    async fn embeds_missing_and_links_similar() {
        let mut index = MemoryIndex::empty();
        index.entries.push(MemoryEntry::new(MemoryType::Learning, 5, "alpha"));
        index.entries.push(MemoryEntry::new(MemoryType::Learning, 5, "apple"));
        index.entries.push(MemoryEntry::new(MemoryType::Learning, 5, "berry"));

        let mut ticks = 0;
        let report = embed_entries(&mut index, &embedder(), &EmbedOptions::default(), || {
            ticks += 1
        })
        .await;

        assert_eq!(report.embedded, 3);
        assert_eq!(ticks, 3);
        assert_eq!(index.embedding_model.as_deref(), Some("first-byte"));
        // "alpha" and "apple" share a vector; "berry" stands alone.
        assert_eq!(report.links_created, 1);
        assert_eq!(index.entries[0].relations.len(), 1);
        assert_eq!(index.entries[1].relations.len(), 1);
        assert!(index.entries[2].relations.is_empty());
        assert!(index.entries.iter().all(|e| e.embedding.as_ref().unwrap().is_binary()));

        let again = embed_entries(&mut index, &embedder(), &EmbedOptions::default(), || {}).await;
        assert_eq!(again.embedded, 0);
        assert_eq!(again.skipped, 3);
    }

    #[tokio::test]
    async fn unavailable_provider_changes_nothing() {
        let mut index = MemoryIndex::empty();
        index.entries.push(MemoryEntry::new(MemoryType::Event, 5, "x"));
        let before = index.clone();

        let report =
            embed_entries(&mut index, &Embedder::disabled(), &EmbedOptions::default(), || {})
                .await;
        assert_eq!(report.embedded, 0);
        assert!(report.unavailable.unwrap().contains("not configured"));
        assert_eq!(index, before);
    }

    #[tokio::test]
    async fn store_links_new_entry_to_similar_neighbor() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("memory.jsonl")).unwrap();
        let embedder = embedder();

        let first = MemoryEntry::new(MemoryType::Learning, 5, "alpha");
        let first_out =
            store_new_entry(&store, first, &embedder, &EmbedOptions::default()).await.unwrap();
        assert!(first_out.embedded);
        assert!(first_out.links.is_empty());

        let second = MemoryEntry::new(MemoryType::Learning, 5, "apple");
        let out = store_new_entry(&store, second, &embedder, &EmbedOptions::default())
            .await
            .unwrap();
        assert_eq!(out.links.len(), 1);
        assert_eq!(out.links[0].target_id, first_out.id);

        let index = store.load().unwrap();
        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.entries[0].relations[0].target_id, out.id);
    }

    #[tokio::test]
    async fn store_without_provider_appends_plain_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("memory.jsonl")).unwrap();
        let entry = MemoryEntry::new(MemoryType::Event, 4, "deploy finished");

        let out = store_new_entry(&store, entry, &Embedder::disabled(), &EmbedOptions::default())
            .await
            .unwrap();
        assert!(!out.embedded);

        let index = store.load().unwrap();
        assert_eq!(index.entries.len(), 1);
        assert!(index.entries[0].embedding.is_none());
    }
}
