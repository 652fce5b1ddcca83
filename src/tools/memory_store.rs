//! MCP `memory_store` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_store` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStoreParams {
    /// The knowledge to remember.
    #[schemars(description = "The content to remember")]
    pub content: String,

    /// One of `learning`, `decision`, `interaction`, `event`, `insight`.
    #[schemars(description = "Memory type: 'learning', 'decision', 'interaction', 'event', or 'insight'")]
    pub r#type: String,

    #[schemars(description = "Importance from 1 (trivial) to 10 (critical). Defaults to 5.")]
    pub importance: Option<u8>,

    #[schemars(description = "Free-form tags used by keyword search")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Source document relative to the memory root, e.g. 'daily/2024-05-01.md'")]
    pub file: Option<String>,

    #[schemars(description = "Line number within the source document")]
    pub line: Option<u32>,

    #[schemars(description = "Optional surrounding context")]
    pub context: Option<String>,
}
