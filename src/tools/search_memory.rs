//! MCP `search_memory` / `search_memory_ranked` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters shared by the plain and time-aware search tools.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchMemoryParams {
    /// Natural language search query.
    #[schemars(description = "Natural language search query")]
    pub query: String,

    /// Maximum number of results to return.
    #[schemars(description = "Maximum number of results to return. Defaults to the configured top-k.")]
    pub limit: Option<usize>,

    /// Filter by memory type or tag (e.g. `"WELLNESS"` or `"sleep"`).
    #[schemars(
        description = "Optional filter: a memory type (WELLNESS, LIFESTYLE, PERSONAL) or a tag (e.g. sleep, mood, work)"
    )]
    pub memory_type: Option<String>,

    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID to search for. Defaults to the configured user.")]
    pub user_id: Option<String>,
}
