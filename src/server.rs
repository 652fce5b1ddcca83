//! MCP server initialization over stdio.
//!
//! [`serve_stdio`] resolves the index file, builds the lazily loaded embedder, and hands
//! both to the MCP tool handler.

use crate::config::MemdexConfig;
use crate::embedding::Embedder;
use crate::memory::store::IndexStore;
use crate::tools::MemdexTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: MemdexConfig) -> Result<()> {
    tracing::info!("starting memdex MCP server on stdio");

    let store = IndexStore::open(config.resolved_index_path())?;
    tracing::info!(index = %store.path().display(), "index ready");

    let index = store.load()?;
    if let Some(stored) = index.embedding_model.as_deref() {
        if stored != config.embedding.model {
            tracing::warn!(
                stored = %stored,
                configured = %config.embedding.model,
                "embedding model changed; run `memdex embed --force` to update all vectors"
            );
        }
    }

    // The model is loaded on the first call that needs it, not here.
    let embedder = Arc::new(Embedder::from_config(&config.embedding));

    let tools = MemdexTools::new(store, embedder, Arc::new(config));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
