//! CLI command implementations.

pub mod columns;
pub mod config;
pub mod run;
pub mod types;
