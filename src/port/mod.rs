//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points in the hexagonal architecture.
//! Every storage backend implements the outbound store ports; the rest of
//! the server only ever talks to them through [`Storage`](crate::application::storage::Storage).
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │     Storage facade      │
//!                    │   (one backend, fixed)  │
//!                    └────────────┬────────────┘
//!                                 │ StorageBackend
//!          ┌──────────────┬───────┴───────┬──────────────┐
//!          ▼              ▼               ▼              ▼
//!     ┌─────────┐   ┌──────────┐    ┌─────────┐    ┌─────────┐
//!     │  MySQL  │   │PostgreSQL│    │ SQLite  │    │ Memory  │
//!     └─────────┘   └──────────┘    └─────────┘    └─────────┘
//! ```

pub mod outbound;
