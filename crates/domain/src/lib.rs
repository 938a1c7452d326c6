//! Shared types for the imolink workspace: the error enum every crate
//! returns, the TOML configuration tree, structured trace events, and the
//! function-tool schema advertised to the remote assistant.

pub mod config;
pub mod error;
pub mod tool;
pub mod trace;
