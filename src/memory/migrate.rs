//! Embedding format migration: legacy number arrays → compact base64.

use serde::Serialize;

use crate::memory::codec;
use crate::memory::types::{MemoryIndex, StoredEmbedding, CURRENT_FORMAT_VERSION};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MigrationReport {
    /// Entries converted by this run.
    pub migrated: usize,
    /// Entries that were already in the compact encoding.
    pub already_binary: usize,
    pub without_embedding: usize,
}

/// Convert every legacy array embedding in place and tag the index with the current version.
///
/// Idempotent: a second run reports `migrated = 0`.
pub fn migrate_to_binary(index: &mut MemoryIndex) -> MigrationReport {
    let mut report = MigrationReport {
        migrated: 0,
        already_binary: 0,
        without_embedding: 0,
    };
    for entry in &mut index.entries {
        match entry.embedding {
            None => report.without_embedding += 1,
            Some(StoredEmbedding::Binary(_)) => report.already_binary += 1,
            Some(StoredEmbedding::Vector(_)) => {
                codec::to_binary(entry);
                report.migrated += 1;
            }
        }
    }
    index.version = CURRENT_FORMAT_VERSION.to_string();

    tracing::info!(
        migrated = report.migrated,
        already_binary = report.already_binary,
        "embedding migration complete"
    );
    report
}
