//! MCP `memory_embed` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_embed` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryEmbedParams {
    #[schemars(description = "Re-embed memories that already have a vector. Defaults to false.")]
    pub force: Option<bool>,
}
