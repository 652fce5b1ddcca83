//! CLI `inspect` command: full details for a single memory.

use anyhow::Result;

use crate::config::MemdexConfig;

/// Inspect a single memory by ID and display full details.
pub fn inspect(config: &MemdexConfig, id: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let index = store.load()?;

    let Some(response) = crate::memory::inspect_entry(&index, id) else {
        anyhow::bail!("memory not found: {id}");
    };

    let m = &response.memory;
    println!("Memory: {}", m.id);
    println!("{}", "=".repeat(50));
    println!("  Type:           {}", m.memory_type);
    println!("  Importance:     {}", m.importance);
    println!("  Created:        {}", m.timestamp);
    if !response.path.is_empty() {
        match m.line {
            Some(line) => println!("  Source:         {}:{}", response.path, line),
            None => println!("  Source:         {}", response.path),
        }
    }
    if !m.tags.is_empty() {
        println!("  Tags:           {}", m.tags.join(", "));
    }
    println!("  Access count:   {}", m.access_count);
    if let Some(ref la) = m.last_accessed {
        println!("  Last accessed:  {la}");
    }
    println!(
        "  Embedding:      {}",
        match &m.embedding {
            Some(e) if e.is_binary() => "compact",
            Some(_) => "legacy array",
            None => "none",
        }
    );
    if let Some(ref ctx) = m.context {
        println!("  Context:        {ctx}");
    }
    println!();
    println!("Content:");
    println!("  {}", m.content);

    if !response.relations.is_empty() {
        println!();
        println!("Relations:");
        for rel in &response.relations {
            println!(
                "  --[{}]--> {} ({})",
                rel.relation_type,
                rel.target_id,
                rel.preview.as_deref().unwrap_or("missing"),
            );
        }
    }

    Ok(())
}
