//! LED prediction service: HTTP router and configuration

pub mod api;
pub mod config;
