//! MCP `memory_link` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_link` MCP tool.
///
/// The inverse edge is stored on the target automatically.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryLinkParams {
    #[schemars(description = "ID of the source memory")]
    pub source_id: String,

    #[schemars(description = "ID of the target memory")]
    pub target_id: String,

    #[schemars(description = "Relation type: 'caused', 'caused_by', 'related', 'supersedes', 'contradicts', or 'elaborates'. Defaults to 'related'.")]
    pub relation: Option<String>,
}
