//! MCP `memory_search` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MemorySearchParams {
    #[schemars(description = "Natural language query. Matched by keywords and, when a model is available, by meaning.")]
    pub query: String,

    #[schemars(description = "Maximum number of results to return. Defaults to the configured max_results (10).")]
    pub max_results: Option<usize>,

    #[schemars(description = "Minimum score a result must reach. Defaults to the configured min_score (0.25).")]
    pub min_score: Option<f64>,

    #[schemars(description = "How many relation hops to follow from each result (0 disables). Defaults to 1.")]
    pub relation_depth: Option<usize>,
}
