//! imolink gateway: the conversation engine and its CLI.
//!
//! [`runtime::Engine`] maps inbound chat messages to assistant threads,
//! drives each run to completion, services `lead` tool calls and evicts
//! idle sessions in the background.

pub mod bootstrap;
pub mod cli;
pub mod runtime;
