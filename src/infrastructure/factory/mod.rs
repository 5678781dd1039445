//! Factory modules for building infrastructure components.
//!
//! Factories turn configuration into fully wired components.
//!
//! # Submodules
//!
//! - [`persistence`] - Storage backend construction

pub mod persistence;
