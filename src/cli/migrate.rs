use anyhow::Result;

use crate::config::MemdexConfig;
use crate::memory::migrate::migrate_to_binary;

/// Rewrite legacy array embeddings in the compact encoding.
pub fn migrate(config: &MemdexConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let mut index = store.load()?;

    let report = migrate_to_binary(&mut index);
    store.save(&mut index)?;

    println!("Migrated:           {}", report.migrated);
    println!("Already compact:    {}", report.already_binary);
    println!("Without embedding:  {}", report.without_embedding);
    println!("Index written to {}", store.path().display());
    Ok(())
}
