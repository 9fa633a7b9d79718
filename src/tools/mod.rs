pub mod format;
pub mod search_memory;
pub mod store_memory;
pub mod user_entity;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use search_memory::SearchMemoryParams;
use store_memory::StoreMemoryParams;
use user_entity::{
    AddUserEntityParams, DeleteUserEntityParams, GetUserEntityByIdParams,
    GetUserEntityBySlugParams, ListUserEntitiesParams, UpdateUserEntityParams,
};

use crate::config::KeepsakeConfig;
use crate::db::Db;
use crate::embedding::EmbeddingProvider;
use crate::entity;
use crate::entity::EntityCollection;
use crate::index::VectorIndex;
use crate::memory;
use crate::memory::{
    MemoryCreate, MemoryTag, MemoryType, RankedSearchOptions, SearchOptions, SearchResponse,
};
use format::{format_user_entities, format_user_entity};

/// The Keepsake MCP tool handler. Holds shared state (relational store,
/// vector index, embedding provider, config) and exposes all MCP tools
/// via the `#[tool_router]` macro.
///
/// Store and search failures never leak raw errors into the
/// conversation — tools log them and reply with a short friendly
/// message. Validation failures (unknown enum strings, missing user)
/// surface as tool errors so the model can correct itself.
#[derive(Clone)]
pub struct KeepsakeTools {
    tool_router: ToolRouter<Self>,
    db: Db,
    index: Arc<dyn VectorIndex>,
    embedding: Arc<dyn EmbeddingProvider>,
    config: Arc<KeepsakeConfig>,
}

#[tool_router]
impl KeepsakeTools {
    pub fn new(
        db: Db,
        index: Arc<dyn VectorIndex>,
        embedding: Arc<dyn EmbeddingProvider>,
        config: Arc<KeepsakeConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            index,
            embedding,
            config,
        }
    }

    fn resolve_user(&self, user_id: Option<String>) -> Result<String, String> {
        match user_id {
            Some(user_id) if !user_id.trim().is_empty() => Ok(user_id),
            _ if !self.config.storage.default_user.is_empty() => {
                Ok(self.config.storage.default_user.clone())
            }
            _ => Err("no user_id provided and no default user configured".into()),
        }
    }

    /// Store a user memory.
    #[tool(description = "Store a user memory. Types: WELLNESS (health, mood, sleep), LIFESTYLE (routines, goals, achievements), PERSONAL (identity, relationships, work, preferences).")]
    async fn store_memory(
        &self,
        Parameters(params): Parameters<StoreMemoryParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;

        if params.text.trim().is_empty() {
            return Err("text must not be empty".into());
        }

        let memory_type = match params.r#type.as_deref() {
            Some(raw) => raw.parse::<MemoryType>()?,
            None => MemoryType::Personal,
        };
        let tags = params
            .tags
            .unwrap_or_default()
            .iter()
            .map(|raw| raw.parse::<MemoryTag>())
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            user_id = %user_id,
            memory_type = %memory_type,
            text_len = params.text.len(),
            "store_memory called"
        );

        let create = MemoryCreate::new(&user_id, memory_type, &params.text)
            .with_data(params.data.unwrap_or_else(|| serde_json::json!({})))
            .with_tags(tags);

        match memory::insert_memories(&self.db, &self.index, &self.embedding, vec![create]).await
        {
            Ok(inserted) => {
                tracing::info!(id = %inserted[0].id, "memory stored");
                Ok("Memory stored successfully.".into())
            }
            Err(err) => {
                tracing::error!(error = %err, "store_memory failed");
                Ok("Failed to store memory.".into())
            }
        }
    }

    /// Search user memories by semantic similarity.
    #[tool(description = "Search user memories using semantic similarity. Returns a numbered context block of the most relevant memories.")]
    async fn search_memory(
        &self,
        Parameters(params): Parameters<SearchMemoryParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;
        let type_filter = validate_type_filter(params.memory_type)?;

        let opts = SearchOptions {
            top_k: params.limit.unwrap_or(self.config.retrieval.default_top_k),
            type_filter,
        };

        tracing::info!(user_id = %user_id, query = %params.query, "search_memory called");

        match memory::search_memories(&self.index, &self.embedding, &user_id, &params.query, &opts)
            .await
        {
            Ok(response) if response.documents.is_empty() => Ok(format!(
                "I couldn't find any relevant memories for: {}",
                response.query.text
            )),
            Ok(response) => Ok(response.to_rag_context(self.config.retrieval.rag_max_length)),
            Err(err) => {
                tracing::error!(error = %err, "search_memory failed");
                Ok("I had trouble searching your memories. Please try again.".into())
            }
        }
    }

    /// Search user memories with time-aware ranking.
    #[tool(description = "Search user memories with time-aware ranking - recent memories get a gentle boost over older ones at similar relevance.")]
    async fn search_memory_ranked(
        &self,
        Parameters(params): Parameters<SearchMemoryParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;
        let type_filter = validate_type_filter(params.memory_type)?;

        let retrieval = &self.config.retrieval;
        let opts = RankedSearchOptions {
            top_k: params.limit.unwrap_or(retrieval.ranked_top_k),
            candidate_multiplier: retrieval.candidate_multiplier,
            type_filter,
            recency_weight: retrieval.recency_weight,
            recency_decay_days: retrieval.recency_decay_days,
        };

        tracing::info!(user_id = %user_id, query = %params.query, "search_memory_ranked called");

        match memory::search_memories_ranked(
            &self.index,
            &self.embedding,
            &user_id,
            &params.query,
            &opts,
        )
        .await
        {
            Ok(documents) if documents.is_empty() => Ok(format!(
                "I couldn't find any relevant memories for: {}",
                params.query
            )),
            Ok(documents) => {
                let response = SearchResponse {
                    query: memory::search::SearchQuery {
                        text: params.query,
                        top_k: opts.top_k,
                        type_filter: opts.type_filter.clone(),
                    },
                    total_found: documents.len(),
                    documents,
                };
                Ok(response.to_rag_context(retrieval.rag_max_length))
            }
            Err(err) => {
                tracing::error!(error = %err, "search_memory_ranked failed");
                Ok("I had trouble searching your memories. Please try again.".into())
            }
        }
    }

    /// Create a new user entity (or upsert by slug).
    #[tool(description = "Create a user entity (or upsert by slug). Unique entities use slug 'user/{type}' (father, birth_date, primary_job); multi-instance entities use 'user/{type}.{identifier}' (goals, friends, skills).")]
    async fn add_user_entity(
        &self,
        Parameters(params): Parameters<AddUserEntityParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;
        // Unknown buckets land in misc rather than failing the call
        let collection = EntityCollection::parse_or_misc(&params.collection);

        tracing::info!(user_id = %user_id, slug = %params.slug, "add_user_entity called");

        match entity::create_entity(
            &self.db,
            &user_id,
            &params.entity_type,
            params.entity_data,
            Some(params.slug),
            collection,
            true,
        )
        .await
        {
            Ok(entity) => Ok(format_user_entity(Some(&entity))),
            Err(err) => {
                tracing::error!(error = %err, "add_user_entity failed");
                Ok("Failed to save entity.".into())
            }
        }
    }

    /// Update an existing entity's data (JSON merge patch).
    #[tool(description = "Update an existing entity's data by slug. Applies a JSON merge patch: null removes a key, nested objects merge, other values replace. Confirm the entity exists first; use add_user_entity if it does not.")]
    async fn update_user_entity(
        &self,
        Parameters(params): Parameters<UpdateUserEntityParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;

        tracing::info!(user_id = %user_id, slug = %params.slug, "update_user_entity called");

        match entity::update_entity_by_slug(&self.db, &user_id, &params.slug, params.entity_data)
            .await
        {
            Ok(entity) => Ok(format_user_entity(entity.as_ref())),
            Err(err) => {
                tracing::error!(error = %err, "update_user_entity failed");
                Ok("Failed to update entity.".into())
            }
        }
    }

    /// List all non-archived entities for the user.
    #[tool(description = "List all non-archived entities for the user as a markdown table.")]
    async fn list_user_entities(
        &self,
        Parameters(params): Parameters<ListUserEntitiesParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;

        match entity::list_entities(&self.db, &user_id, None, None, false, 1000, 0).await {
            Ok(entities) => Ok(format_user_entities(&entities)),
            Err(err) => {
                tracing::error!(error = %err, "list_user_entities failed");
                Ok("Failed to list entities.".into())
            }
        }
    }

    /// Retrieve a single entity by its UUID.
    #[tool(description = "Retrieve a single entity by its UUID.")]
    async fn get_user_entity_by_id(
        &self,
        Parameters(params): Parameters<GetUserEntityByIdParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;

        match entity::get_entity_by_id(&self.db, &user_id, &params.entity_id, false).await {
            Ok(entity) => Ok(format_user_entity(entity.as_ref())),
            Err(err) => {
                tracing::error!(error = %err, "get_user_entity_by_id failed");
                Ok("Failed to fetch entity.".into())
            }
        }
    }

    /// Retrieve a single entity by its slug.
    #[tool(description = "Retrieve a single entity by its slug identifier, e.g. 'user/father' or 'user/goal.marathon-2026'.")]
    async fn get_user_entity_by_slug(
        &self,
        Parameters(params): Parameters<GetUserEntityBySlugParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;

        match entity::get_entity_by_slug(&self.db, &user_id, &params.slug, false).await {
            Ok(entity) => Ok(format_user_entity(entity.as_ref())),
            Err(err) => {
                tracing::error!(error = %err, "get_user_entity_by_slug failed");
                Ok("Failed to fetch entity.".into())
            }
        }
    }

    /// Delete (archive) an entity.
    #[tool(description = "Delete (archive) an entity by UUID. The entity is soft-deleted and stays addressable for audit.")]
    async fn delete_user_entity(
        &self,
        Parameters(params): Parameters<DeleteUserEntityParams>,
    ) -> Result<String, String> {
        let user_id = self.resolve_user(params.user_id)?;

        match entity::archive_entity(&self.db, &user_id, &params.entity_id, params.reason).await {
            Ok(true) => Ok("Successfully deleted entity".into()),
            Ok(false) => Ok("Failed to delete entity".into()),
            Err(err) => {
                tracing::error!(error = %err, "delete_user_entity failed");
                Ok("Failed to delete entity".into())
            }
        }
    }
}

/// Accept a memory type or tag string as the search filter; anything
/// else is a validation error the model can correct.
fn validate_type_filter(raw: Option<String>) -> Result<Option<String>, String> {
    match raw {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => {
            if raw.parse::<MemoryType>().is_ok() || raw.parse::<MemoryTag>().is_ok() {
                Ok(Some(raw))
            } else {
                Err(format!(
                    "unknown memory type or tag: {raw}. Types: WELLNESS, LIFESTYLE, PERSONAL."
                ))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for KeepsakeTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Keepsake is a voice-agent memory server. Use store_memory to save what the \
                 user shares, search_memory / search_memory_ranked to recall it, and the \
                 user-entity tools to maintain structured facts (relationships, goals, health)."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_filter_accepts_types_and_tags() {
        assert_eq!(
            validate_type_filter(Some("WELLNESS".into())).unwrap(),
            Some("WELLNESS".into())
        );
        assert_eq!(
            validate_type_filter(Some("sleep".into())).unwrap(),
            Some("sleep".into())
        );
        assert_eq!(validate_type_filter(None).unwrap(), None);
        assert_eq!(validate_type_filter(Some("  ".into())).unwrap(), None);
        assert!(validate_type_filter(Some("bogus".into())).is_err());
    }
}
