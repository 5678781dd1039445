//! CLI module graph.

pub mod allocation;
pub mod check;
pub mod command;
pub mod output;
