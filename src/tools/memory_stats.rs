//! MCP `memory_stats` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_stats` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStatsParams {
    /// Include the entry with this id in full, with its relations.
    #[schemars(description = "Optional memory ID to inspect in full alongside the statistics")]
    pub inspect_id: Option<String>,
}
