use anyhow::{anyhow, Result};

use crate::config::MemdexConfig;
use crate::embedding::Embedder;
use crate::memory::embed::{store_new_entry, EmbedOptions};
use crate::memory::types::MemoryType;
use crate::memory::{create_entry, NewEntry};

pub struct AddArgs {
    pub content: String,
    pub memory_type: String,
    pub importance: u8,
    pub tags: Vec<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub context: Option<String>,
}

/// Create a memory, embed it when a provider is available, and persist it.
pub async fn add(config: &MemdexConfig, args: AddArgs) -> Result<()> {
    let memory_type: MemoryType = args.memory_type.parse().map_err(|e: String| anyhow!(e))?;
    anyhow::ensure!(!args.content.trim().is_empty(), "content must not be empty");

    let entry = create_entry(NewEntry {
        memory_type,
        importance: args.importance,
        content: args.content,
        tags: args.tags,
        file: args.file,
        line: args.line,
        context: args.context,
    });

    let store = super::open_store(config)?;
    let embedder = Embedder::from_config(&config.embedding);
    let outcome = store_new_entry(
        &store,
        entry,
        &embedder,
        &EmbedOptions::from(config.linking.clone()),
    )
    .await?;

    println!("Stored {}", outcome.id);
    if !outcome.embedded {
        if let Some(message) = embedder.status().unavailable_message() {
            println!("  (no embedding: {message})");
        }
    }
    for link in &outcome.links {
        println!("  related to {} (similarity {:.2})", link.target_id, link.similarity);
    }
    Ok(())
}
