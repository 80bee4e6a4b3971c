//! PostgreSQL integration
//!
//! Exposes stored procedures and views of one schema through
//! [`SourceClient`](crate::adapters::database::SourceClient) and loads sync
//! tables through [`TableLoader`](crate::adapters::database::TableLoader).

pub mod adapter;
pub mod client;
pub mod loader;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use loader::PostgreSQLLoader;
