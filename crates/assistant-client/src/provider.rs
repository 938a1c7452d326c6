//! The `AssistantProvider` trait defines the interface for every assistant
//! backend (REST, test doubles).

use async_trait::async_trait;
use imo_domain::error::Result;

use crate::types::{Role, Run, RunStepList, Thread, ThreadMessageList, ToolOutput};

/// Abstraction over the remote assistant's threads / runs API surface.
///
/// The engine calls these synchronously per message; retry policy, if
/// any, lives inside the implementation.
#[async_trait]
pub trait AssistantProvider: Send + Sync {
    /// Create an empty conversation thread (POST /threads).
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a message to a thread (POST /threads/{t}/messages).
    async fn add_message(&self, thread_id: &str, role: Role, content: &str) -> Result<()>;

    /// Start a run of `assistant_id` on a thread (POST /threads/{t}/runs).
    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run (GET /threads/{t}/runs/{r}).
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Fetch a run's step history, most recent first
    /// (GET /threads/{t}/runs/{r}/steps).
    async fn get_run_steps(&self, thread_id: &str, run_id: &str) -> Result<RunStepList>;

    /// Resume a paused run (POST /threads/{t}/runs/{r}/submit_tool_outputs).
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<()>;

    /// List a thread's messages, most recent first (GET /threads/{t}/messages).
    async fn get_messages(&self, thread_id: &str) -> Result<ThreadMessageList>;
}
