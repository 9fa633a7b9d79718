//! MCP user-entity tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `add_user_entity` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddUserEntityParams {
    /// Collection bucket: identity, social, professional, health,
    /// lifestyle, pursuits, resources, milestones, misc.
    #[schemars(
        description = "Collection bucket - one of: identity, social, professional, health, lifestyle, pursuits, resources, milestones, misc. Unknown values fall back to misc."
    )]
    pub collection: String,

    /// Category within the collection (e.g. `"father"`, `"goal"`).
    #[schemars(description = "Entity category within the collection, e.g. father, goal, friend")]
    pub entity_type: String,

    /// Human-readable identifier. Use `"user/{type}"` for unique
    /// entities, `"user/{type}.{identifier}"` for multi-instance ones.
    #[schemars(
        description = "Human-readable identifier. Use 'user/{entity_type}' for unique entities (father, birth_date), 'user/{entity_type}.{identifier}' for multi-instance entities (goals, friends)."
    )]
    pub slug: String,

    /// JSON data describing the entity.
    #[schemars(description = "JSON object describing the entity")]
    pub entity_data: serde_json::Value,

    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID owning the entity. Defaults to the configured user.")]
    pub user_id: Option<String>,
}

/// Parameters for the `update_user_entity` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateUserEntityParams {
    /// Slug of the entity to update.
    #[schemars(description = "Slug of the entity to update, e.g. 'user/father'")]
    pub slug: String,

    /// JSON merge patch: null removes a key, objects merge deeply,
    /// everything else replaces.
    #[schemars(
        description = "JSON merge patch for the entity data: null removes a key, nested objects merge, other values replace"
    )]
    pub entity_data: serde_json::Value,

    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID owning the entity. Defaults to the configured user.")]
    pub user_id: Option<String>,
}

/// Parameters for the `list_user_entities` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListUserEntitiesParams {
    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID to list entities for. Defaults to the configured user.")]
    pub user_id: Option<String>,
}

/// Parameters for the `get_user_entity_by_id` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetUserEntityByIdParams {
    /// UUID of the entity to fetch.
    #[schemars(description = "UUID of the entity to fetch")]
    pub entity_id: String,

    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID owning the entity. Defaults to the configured user.")]
    pub user_id: Option<String>,
}

/// Parameters for the `get_user_entity_by_slug` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetUserEntityBySlugParams {
    /// Slug of the entity to fetch.
    #[schemars(description = "Slug of the entity to fetch, e.g. 'user/father'")]
    pub slug: String,

    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID owning the entity. Defaults to the configured user.")]
    pub user_id: Option<String>,
}

/// Parameters for the `delete_user_entity` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteUserEntityParams {
    /// UUID of the entity to archive.
    #[schemars(description = "UUID of the entity to delete")]
    pub entity_id: String,

    /// Optional deletion reason, kept in the entity's metadata.
    #[schemars(description = "Optional deletion reason")]
    pub reason: Option<String>,

    /// Acting user. Falls back to the configured default user.
    #[schemars(description = "User ID owning the entity. Defaults to the configured user.")]
    pub user_id: Option<String>,
}
