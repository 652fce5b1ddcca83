use anyhow::{anyhow, Result};

use crate::config::MemdexConfig;
use crate::memory::relations::link_and_save;
use crate::memory::types::RelationType;

/// Link `source` to `target`; the inverse edge is stored on `target`.
pub fn link(config: &MemdexConfig, source: &str, target: &str, relation: &str) -> Result<()> {
    let relation_type: RelationType = relation.parse().map_err(|e: String| anyhow!(e))?;
    let store = super::open_store(config)?;

    let outcome = link_and_save(&store, source, target, relation_type)?;
    if outcome.forward_added || outcome.inverse_added {
        println!(
            "{} --[{}]--> {}  (and {} --[{}]--> {})",
            outcome.source_id,
            outcome.relation_type,
            outcome.target_id,
            outcome.target_id,
            outcome.inverse_type,
            outcome.source_id,
        );
    } else {
        println!("Link already present; nothing changed.");
    }
    Ok(())
}
