//! Data persistence layer (adapters for store ports).
//!
//! This module provides concrete implementations of the store ports
//! defined in [`crate::ports::store`] and the cache port in
//! [`crate::ports::cache`]:
//!
//! - [`PostgresStore`] - relational persistence for positions, pools,
//!   subscriber rows and durable indexer progress, via `SQLx`.
//! - [`MemoryCache`] - moka/dashmap-backed implementation of
//!   [`crate::ports::Cache`] for progress tracking and rule dedup gates.
//!
//! # Usage
//!
//! ```ignore
//! use ingest_core::store::PostgresStore;
//! use sqlx::postgres::PgPoolOptions;
//!
//! let pool = PgPoolOptions::new()
//!     .max_connections(10)
//!     .connect("postgres://localhost/ingest")
//!     .await?;
//!
//! // Run migrations
//! sqlx::migrate!("./migrations").run(&pool).await?;
//!
//! // Create store
//! let store = PostgresStore::new(pool);
//!
//! // Use via trait methods
//! let position = store.get_position(chain_id, "42").await?;
//! ```
//!
//! # Migrations
//!
//! Migrations are located in `migrations/` and run via `sqlx migrate run`.

mod cache;
mod postgres;

pub use cache::MemoryCache;
pub use postgres::PostgresStore;

// Re-export commonly used types for convenience
pub use sqlx::postgres::PgPool;
