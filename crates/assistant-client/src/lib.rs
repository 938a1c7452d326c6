//! `imo-assistant`: client crate for the remote LLM assistant.
//!
//! Provides the [`AssistantProvider`] trait the engine drives (threads,
//! messages, runs, run steps, tool outputs), a production REST
//! implementation ([`RestAssistantClient`]), and typed DTOs for the
//! threads / runs API.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use imo_domain::config::AssistantConfig;
//! use imo_assistant::{AssistantProvider, RestAssistantClient, Role};
//!
//! # async fn example() -> imo_domain::error::Result<()> {
//! let cfg = AssistantConfig::default();
//! let client = RestAssistantClient::new(&cfg)?;
//!
//! let thread = client.create_thread().await?;
//! client.add_message(&thread.id, Role::User, "Quero um apartamento").await?;
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use provider::AssistantProvider;
pub use rest::{from_reqwest, RestAssistantClient};
pub use types::{
    ContentPart, FunctionCall, RequiredAction, Role, Run, RunError, RunStatus, RunStep,
    RunStepList, Thread, ThreadMessage, ThreadMessageList, ToolCall, ToolOutput,
};
