//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up
//! the relational store, vector index, embedding provider, and MCP tool
//! handler into a running server.

use crate::config::KeepsakeConfig;
use crate::db::{self, Db};
use crate::embedding;
use crate::index::sqlite_vec::SqliteVecIndex;
use crate::index::VectorIndex;
use crate::tools::KeepsakeTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

/// Shared setup: open both stores, create the embedding provider, check
/// the stored model identifier. Everything is constructed here and
/// injected — no global handles.
fn setup_shared_state(
    config: KeepsakeConfig,
) -> Result<(
    Db,
    Arc<dyn VectorIndex>,
    Arc<dyn embedding::EmbeddingProvider>,
    Arc<KeepsakeConfig>,
)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "relational store ready");

    // Warn when the configured model no longer matches stored vectors
    if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed - existing vectors were built with a different model"
            );
        }
    }

    let db = db::shared(conn);

    let provider = embedding::create_provider(&config.embedding)?;
    let embedding: Arc<dyn embedding::EmbeddingProvider> = Arc::from(provider);
    tracing::info!("embedding provider ready");

    let vector_path = config.resolved_vector_db_path();
    let index: Arc<dyn VectorIndex> = Arc::new(SqliteVecIndex::open(
        &vector_path,
        &config.storage.collection,
        embedding.dimensions(),
    )?);
    tracing::info!(index = %vector_path.display(), "vector index ready");

    let config = Arc::new(config);

    Ok((db, index, embedding, config))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: KeepsakeConfig) -> Result<()> {
    tracing::info!("starting Keepsake MCP server on stdio");

    let (db, index, embedding, config) = setup_shared_state(config)?;

    let tools = KeepsakeTools::new(db, index, embedding, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running - waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP.
pub async fn serve_http(config: KeepsakeConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting Keepsake MCP server on HTTP");

    let (db, index, embedding, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || {
            Ok(KeepsakeTools::new(
                db.clone(),
                index.clone(),
                embedding.clone(),
                config.clone(),
            ))
        },
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
