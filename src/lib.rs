//! Stowage - cluster-aware persistence for node allocations and session state.
//!
//! A node registers itself as an *allocation*; presences and resource bindings
//! it creates are owned by that allocation. When a node leaves, one
//! all-or-nothing cascade removes everything it owned.
//!
//! # Modules
//!
//! - [`domain`] - Backend-agnostic records: allocations, presences, resources, users
//! - [`port`] - Store traits every backend implements
//! - [`adapter`] - Backends (memory, SQLite, MySQL, PostgreSQL) and the CLI
//! - [`application`] - The [`Storage`](application::storage::Storage) facade
//! - [`infrastructure`] - Configuration and backend construction
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `mysql` - MySQL backend
//! - `postgres` - PostgreSQL backend
//! - `testkit` - Test fixtures and in-memory fault injection
//!
//! # Example
//!
//! ```no_run
//! use stowage::application::storage::Storage;
//! use stowage::domain::AllocationId;
//! use stowage::infrastructure::config::storage::StorageConfig;
//! use stowage::port::outbound::store::AllocationStore;
//!
//! # async fn demo() -> stowage::error::Result<()> {
//! let storage = Storage::initialize(&StorageConfig::Memory).await?;
//! storage.register_allocation(&AllocationId::new("node-a")).await?;
//! storage.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
