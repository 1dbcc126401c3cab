//! Subcommand implementations for the `rowguard` CLI.

pub mod compliance;
pub mod keys;
pub mod probe;
pub mod token;
