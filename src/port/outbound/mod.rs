//! Outbound ports (driven side): interfaces implemented by storage backends.

pub mod store;
