pub mod add;
pub mod embed;
pub mod inspect;
pub mod link;
pub mod migrate;
pub mod search;
pub mod stats;

use anyhow::Result;

use crate::config::MemdexConfig;
use crate::memory::store::IndexStore;

/// Open the configured index, running the `.json` → `.jsonl` migration if needed.
pub fn open_store(config: &MemdexConfig) -> Result<IndexStore> {
    IndexStore::open(config.resolved_index_path())
}
