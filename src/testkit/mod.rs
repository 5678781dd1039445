//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for allocations, presences, resources and users,
//!   plus seeding of an allocation with owned state.
//! - [`config`] - Canonical storage configurations and TOML documents.

pub mod config;
pub mod domain;
