//! MCP `store_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `store_memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoreMemoryParams {
    /// The memory content to store.
    #[schemars(description = "The memory content to store, written in third person")]
    pub text: String,

    /// Memory type: `"WELLNESS"`, `"LIFESTYLE"`, or `"PERSONAL"`. Defaults to `"PERSONAL"`.
    #[schemars(
        description = "Memory type - one of: WELLNESS, LIFESTYLE, PERSONAL. Defaults to PERSONAL."
    )]
    pub r#type: Option<String>,

    /// Structured side payload associated with the memory.
    #[schemars(description = "Optional structured data associated with the memory (JSON object)")]
    pub data: Option<serde_json::Value>,

    /// Tags from the closed tag vocabulary (e.g. `"sleep"`, `"mood"`, `"work"`).
    #[schemars(
        description = "Optional tags, e.g. sleep, mood, nutrition, goal, routine, work, relationship"
    )]
    pub tags: Option<Vec<String>>,

    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID to store the memory for. Defaults to the configured user.")]
    pub user_id: Option<String>,
}
