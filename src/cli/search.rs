use anyhow::Result;

use crate::config::MemdexConfig;
use crate::embedding::Embedder;
use crate::memory::search::{truncate_preview, SearchOptions};

/// Run a search from the terminal and persist the access counters it bumps.
pub async fn search(
    config: &MemdexConfig,
    query: &str,
    limit: Option<usize>,
    min_score: Option<f64>,
    depth: Option<usize>,
) -> Result<()> {
    let store = super::open_store(config)?;
    let mut index = store.load()?;

    let embedder = Embedder::from_config(&config.embedding);
    let query_vector = embedder.embed(query).await;
    if let Some(message) = embedder.status().unavailable_message() {
        eprintln!("note: {message}");
    }

    let mut options = SearchOptions::from(&config.retrieval);
    if let Some(limit) = limit {
        options.max_results = limit;
    }
    if let Some(min_score) = min_score {
        options.min_score = min_score;
    }
    if let Some(depth) = depth {
        options.relation_depth = depth;
    }

    let response =
        crate::memory::search::search(&mut index, query, query_vector.as_deref(), &options);
    if !response.touched.is_empty() {
        store.save(&mut index)?;
    }

    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!(
        "Found {} result(s) ({})\n",
        response.results.len(),
        if response.semantic { "hybrid" } else { "keyword only" }
    );

    for (i, result) in response.results.iter().enumerate() {
        println!(
            "  {}. [{}] {} (importance: {}, score: {:.4})",
            i + 1,
            result.memory_type,
            result.id,
            result.importance,
            result.score,
        );
        if !result.path.is_empty() {
            match result.line {
                Some(line) => println!("     {}:{}", result.path, line),
                None => println!("     {}", result.path),
            }
        }
        println!("     {}", truncate_preview(&result.content, 120));
        for rel in &result.related {
            println!(
                "       {}--[{}]--> {} ({}): {}",
                "  ".repeat(rel.depth.saturating_sub(1)),
                rel.relation,
                rel.id,
                rel.memory_type,
                truncate_preview(&rel.content, 80),
            );
        }
        println!();
    }

    Ok(())
}
