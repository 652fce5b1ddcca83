pub mod memory_embed;
pub mod memory_link;
pub mod memory_migrate;
pub mod memory_search;
pub mod memory_stats;
pub mod memory_store;

use memory_embed::MemoryEmbedParams;
use memory_link::MemoryLinkParams;
use memory_migrate::MemoryMigrateParams;
use memory_search::MemorySearchParams;
use memory_stats::MemoryStatsParams;
use memory_store::MemoryStoreParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::MemdexConfig;
use crate::embedding::Embedder;
use crate::memory::embed::{embed_entries, store_new_entry, EmbedOptions};
use crate::memory::search::SearchOptions;
use crate::memory::store::IndexStore;
use crate::memory::types::{MemoryType, RelationType};
use crate::memory::{create_entry, NewEntry};

/// The memdex MCP tool handler. Holds the index handle, the shared embedder, and config,
/// and exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct MemdexTools {
    tool_router: ToolRouter<Self>,
    store: IndexStore,
    embedder: Arc<Embedder>,
    config: Arc<MemdexConfig>,
    /// Serializes load-modify-save cycles within this process.
    write_lock: Arc<Mutex<()>>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl MemdexTools {
    pub fn new(store: IndexStore, embedder: Arc<Embedder>, config: Arc<MemdexConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
            embedder,
            config,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Hybrid search over the index with relation expansion.
    #[tool(description = "Search memories by natural language query. Ranks by keyword overlap blended with semantic similarity when an embedding model is available, plus importance. Each result lists related memories found by following relation edges.")]
    async fn memory_search(
        &self,
        Parameters(params): Parameters<MemorySearchParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "memory_search called");

        let query_vector = self.embedder.embed(&params.query).await;
        let notice = self.embedder.status().unavailable_message();

        let mut options = SearchOptions::from(&self.config.retrieval);
        if let Some(n) = params.max_results {
            options.max_results = n;
        }
        if let Some(s) = params.min_score {
            options.min_score = s;
        }
        if let Some(d) = params.relation_depth {
            options.relation_depth = d;
        }

        let _guard = self.write_lock.lock().await;
        let store = self.store.clone();
        let query = params.query;
        let response = tokio::task::spawn_blocking(move || {
            let mut index = store.load()?;
            let response = crate::memory::search::search(
                &mut index,
                &query,
                query_vector.as_deref(),
                &options,
            );
            if !response.touched.is_empty() {
                store.save(&mut index)?;
            }
            anyhow::Ok(response)
        })
        .await
        .map_err(|e| format!("search task failed: {e}"))?
        .map_err(|e| format!("search failed: {e:#}"))?;

        let mode = if response.semantic { "hybrid" } else { "keyword" };
        let mut body = serde_json::json!({
            "results": response.results,
            "total": response.results.len(),
            "mode": mode,
        });
        if let Some(notice) = notice {
            body["notice"] = notice.into();
        }
        Ok(body.to_string())
    }

    /// Create and persist a new memory.
    #[tool(description = "Store a new memory. Types: learning (something found out), decision (a choice and its reason), interaction (a notable exchange), event (something that happened), insight (a conclusion). Similar memories are linked automatically when embeddings are available.")]
    async fn memory_store(
        &self,
        Parameters(params): Parameters<MemoryStoreParams>,
    ) -> Result<String, String> {
        let memory_type: MemoryType = params.r#type.parse().map_err(|e: String| e)?;

        if params.content.trim().is_empty() {
            return Err("content must not be empty".into());
        }
        let importance = params.importance.unwrap_or(5);
        if !(1..=10).contains(&importance) {
            return Err("importance must be between 1 and 10".into());
        }

        tracing::info!(
            content_len = params.content.len(),
            memory_type = %memory_type,
            importance,
            "memory_store called"
        );

        let entry = create_entry(NewEntry {
            memory_type,
            importance,
            content: params.content,
            tags: params.tags.unwrap_or_default(),
            file: params.file,
            line: params.line,
            context: params.context,
        });

        let _guard = self.write_lock.lock().await;
        let options = EmbedOptions::from(self.config.linking.clone());
        let outcome = store_new_entry(&self.store, entry, &self.embedder, &options)
            .await
            .map_err(|e| format!("store failed: {e:#}"))?;

        to_json(&outcome)
    }

    /// Add a typed edge and its inverse between two memories.
    #[tool(description = "Link two memories with a typed relation (caused, caused_by, related, supersedes, contradicts, elaborates). The inverse edge is added to the target automatically.")]
    async fn memory_link(
        &self,
        Parameters(params): Parameters<MemoryLinkParams>,
    ) -> Result<String, String> {
        let relation_type: RelationType = match params.relation.as_deref() {
            Some(r) => r.parse().map_err(|e: String| e)?,
            None => RelationType::Related,
        };

        tracing::info!(
            source = %params.source_id,
            target = %params.target_id,
            relation = %relation_type,
            "memory_link called"
        );

        let _guard = self.write_lock.lock().await;
        let store = self.store.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            crate::memory::relations::link_and_save(
                &store,
                &params.source_id,
                &params.target_id,
                relation_type,
            )
        })
        .await
        .map_err(|e| format!("link task failed: {e}"))?
        .map_err(|e| {
            tracing::warn!("memory_link failed: {e:#}");
            format!("{e:#}")
        })?;

        to_json(&outcome)
    }

    /// Generate missing embeddings and auto-link the newly embedded memories.
    #[tool(description = "Generate embeddings for memories that lack one (or all with force=true), then link each newly embedded memory to its most similar neighbors.")]
    async fn memory_embed(
        &self,
        Parameters(params): Parameters<MemoryEmbedParams>,
    ) -> Result<String, String> {
        let options = EmbedOptions {
            force: params.force.unwrap_or(false),
            ..EmbedOptions::from(self.config.linking.clone())
        };
        tracing::info!(force = options.force, "memory_embed called");

        let _guard = self.write_lock.lock().await;
        let mut index = self
            .store
            .load()
            .map_err(|e| format!("load failed: {e:#}"))?;
        let report = embed_entries(&mut index, &self.embedder, &options, || {}).await;
        if report.embedded > 0 {
            self.store
                .save(&mut index)
                .map_err(|e| format!("save failed: {e:#}"))?;
        }

        to_json(&report)
    }

    /// Convert legacy array embeddings to the compact encoding.
    #[tool(description = "Rewrite legacy numeric-array embeddings in the compact base64 encoding and bump the index format version. Safe to run repeatedly.")]
    async fn memory_migrate(
        &self,
        Parameters(_params): Parameters<MemoryMigrateParams>,
    ) -> Result<String, String> {
        tracing::info!("memory_migrate called");

        let _guard = self.write_lock.lock().await;
        let store = self.store.clone();
        let report = tokio::task::spawn_blocking(move || {
            let mut index = store.load()?;
            let report = crate::memory::migrate::migrate_to_binary(&mut index);
            store.save(&mut index)?;
            anyhow::Ok(report)
        })
        .await
        .map_err(|e| format!("migrate task failed: {e}"))?
        .map_err(|e| format!("migrate failed: {e:#}"))?;

        to_json(&report)
    }

    /// Index statistics, optionally with one entry inspected in full.
    #[tool(description = "Get index statistics: counts by type, embedding coverage, relation edges, format version, file size. Pass inspect_id to also return one memory in full with its relations.")]
    async fn memory_stats(
        &self,
        Parameters(params): Parameters<MemoryStatsParams>,
    ) -> Result<String, String> {
        tracing::info!(inspect = ?params.inspect_id, "memory_stats called");

        let index = self
            .store
            .load()
            .map_err(|e| format!("load failed: {e:#}"))?;
        let stats = crate::memory::stats::index_stats(&index, Some(self.store.path()));

        match params.inspect_id {
            None => to_json(&stats),
            Some(id) => {
                let inspected = crate::memory::inspect_entry(&index, &id)
                    .ok_or_else(|| format!("memory not found: {id}"))?;
                to_json(&serde_json::json!({ "stats": stats, "memory": inspected }))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for MemdexTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "memdex is a file-backed knowledge index. Use memory_store to save memories, \
                 memory_search to find them, and memory_link to connect related ones."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
