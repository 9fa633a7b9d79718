//! Memory engine for conversational voice agents.
//!
//! Keepsake stores what a voice agent learns about its user and gets it
//! back out when the conversation needs grounding. Two kinds of record:
//!
//! | Record | Shape | Lifecycle |
//! |--------|-------|-----------|
//! | **Entity** | structured fact addressed by slug (`dave/father`, `dave/goal.marathon-2026`) | upsert by slug, merge-patch updates, soft-delete via archive |
//! | **Memory** | episodic/semantic text fragment with tags and a structured payload | batch-inserted once, embedded, never edited in place |
//!
//! # Architecture
//!
//! - **Relational store**: SQLite (entities, memories, profiles) — the
//!   authoritative copy
//! - **Vector index**: [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   in its own database, written after the relational commit and keyed
//!   by the same IDs
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dims)
//! - **Retrieval**: user-scoped KNN with a client-side type/tag filter,
//!   plus a time-aware ranker (`similarity * (1 + 0.15 * exp(-age/90d))`)
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, and migrations
//! - [`embedding`] — Text-to-vector pipeline via ONNX Runtime
//! - [`index`] — Vector index trait and sqlite-vec implementation
//! - [`entity`] — Slug-addressed entity store (create/update/archive/list)
//! - [`memory`] — Dual-write insert, hybrid search, time-aware ranking
//! - [`tasks`] — Supervised background writes with a bounded queue
//! - [`profile`] — Read-only user profile lookups

pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod index;
pub mod memory;
pub mod profile;
pub(crate) mod retry;
pub mod server;
pub mod tasks;
pub mod tools;

pub use error::StoreError;
