//! Shared utilities for stock-rag
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and environment-variable configuration helpers.

pub mod config;
pub mod logging;

pub use config::{EnvError, env_duration_secs, env_or, env_string};
pub use logging::{LogFormat, init_tracing_with};
