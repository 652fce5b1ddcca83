use anyhow::Result;

use crate::config::MemdexConfig;
use crate::memory::types::MemoryType;

/// Display index statistics in the terminal.
pub fn stats(config: &MemdexConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let index = store.load()?;
    let response = crate::memory::stats::index_stats(&index, Some(store.path()));

    println!("Index Statistics");
    println!("{}", "=".repeat(40));
    println!("  File:                {}", store.path().display());
    println!("  Format version:      {}", response.format_version);
    println!("  Total memories:      {}", response.total_memories);
    println!();

    println!("By Type:");
    for t in MemoryType::ALL {
        let count = response.by_type.get(t.as_str()).copied().unwrap_or(0);
        println!("  {:<12} {}", t, count);
    }
    println!();

    println!("Embeddings:");
    println!("  compact              {}", response.embedded_binary);
    println!("  legacy array         {}", response.embedded_legacy);
    if let Some(ref model) = response.embedding_model {
        println!("  model                {model}");
    }
    if response.embedded_legacy > 0 {
        println!("  (run `memdex migrate` to convert legacy embeddings)");
    }
    println!();

    println!("Relation edges:        {}", response.relation_edges);
    println!("File size:             {} bytes", response.file_size_bytes);
    if let Some(ref updated) = response.last_updated {
        println!("Last updated:          {updated}");
    }
    if let Some(ref oldest) = response.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = response.newest_memory {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
