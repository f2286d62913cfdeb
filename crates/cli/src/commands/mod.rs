//! Subcommand implementations

pub mod export;
pub mod service;
pub mod train;
