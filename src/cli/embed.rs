//! CLI `embed` command: fill in missing vectors and auto-link the new ones.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::MemdexConfig;
use crate::embedding::Embedder;
use crate::memory::embed::{embed_entries, EmbedOptions};

/// Embed every memory lacking a vector (all of them with `force`) and save the index.
pub async fn embed(config: &MemdexConfig, force: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let mut index = store.load()?;

    let total = index.entries.len();
    if total == 0 {
        println!("No memories to embed.");
        return Ok(());
    }

    let embedder = Embedder::from_config(&config.embedding);
    let options = EmbedOptions {
        force,
        ..EmbedOptions::from(config.linking.clone())
    };

    println!(
        "Embedding {total} memories with model '{}'...",
        config.embedding.model
    );

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let report = embed_entries(&mut index, &embedder, &options, || pb.inc(1)).await;
    pb.finish_and_clear();

    if let Some(message) = report.unavailable {
        anyhow::bail!(message);
    }

    if report.embedded > 0 {
        store.save(&mut index)?;
    }

    println!(
        "Embedded {}, skipped {}, failed {}; created {} link(s).",
        report.embedded, report.skipped, report.failed, report.links_created
    );
    Ok(())
}
