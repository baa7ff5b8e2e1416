//! AWS-oriented adapters and handlers for the user registry.
//!
//! This crate owns runtime integration details (DynamoDB access, API Gateway
//! event handling, the local HTTP server and environment configuration). The
//! registration workflow itself lives in `registry_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod server;
