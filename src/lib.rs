//! krc-assistant library
//!
//! Chat, web-search and image-proxy API for the KRC customer assistant.
//! Everything is exported so integration tests can drive the pieces directly.

pub mod config;
pub mod directory;
pub mod llm;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod preview;
pub mod retry;
pub mod search;
pub mod server;
