//! Tool-call dispatch for paused runs.
//!
//! A run in `requires_action` asks the engine to execute one or more
//! function calls.  Known function names map onto a closed handler table;
//! everything else is ignored.  Arguments for every call are parsed before
//! any handler runs, so a malformed call aborts the cycle without side
//! effects and without submitting outputs.

use std::sync::Arc;

use serde::Deserialize;

use imo_assistant::{AssistantProvider, RequiredAction, ToolCall, ToolOutput};
use imo_domain::error::{Error, Result, ResultExt};
use imo_domain::tool::LEAD_TOOL_NAME;
use imo_domain::trace::TraceEvent;
use imo_leads::LeadSink;
use imo_sessions::{contact_address, SessionStore};

/// Output reported back to the assistant for a captured lead.
pub const LEAD_CREATED: &str = "Lead created successfully";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A tool call whose arguments have been parsed for its handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    Lead { name: String },
}

#[derive(Debug, Deserialize)]
struct LeadArgs {
    name: String,
}

impl ToolInvocation {
    /// Match `function_name` against the handler table and parse its
    /// arguments.  `Ok(None)` for names with no handler.
    pub fn parse(function_name: &str, arguments: &str) -> Result<Option<Self>> {
        match function_name {
            LEAD_TOOL_NAME => {
                let args: LeadArgs =
                    serde_json::from_str(arguments).map_err(|e| Error::ToolArguments {
                        tool: LEAD_TOOL_NAME.into(),
                        message: e.to_string(),
                    })?;
                Ok(Some(Self::Lead { name: args.name }))
            }
            _ => Ok(None),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatcher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ToolDispatcher {
    provider: Arc<dyn AssistantProvider>,
    sessions: Arc<SessionStore>,
    leads: Arc<dyn LeadSink>,
}

impl ToolDispatcher {
    pub fn new(
        provider: Arc<dyn AssistantProvider>,
        sessions: Arc<SessionStore>,
        leads: Arc<dyn LeadSink>,
    ) -> Self {
        Self {
            provider,
            sessions,
            leads,
        }
    }

    /// Service one `requires_action` pause of `run_id`.
    ///
    /// Tool calls come from the required action; when it lists none, the
    /// most recent run step is consulted instead.  All produced outputs
    /// are submitted in a single call.  Returns the submitted outputs
    /// (empty when there was nothing to do).
    pub async fn dispatch(
        &self,
        thread_id: &str,
        run_id: &str,
        action: &RequiredAction,
    ) -> Result<Vec<ToolOutput>> {
        let steps;
        let mut calls: &[ToolCall] = action.tool_calls();
        let from_steps = calls.is_empty();
        if from_steps {
            steps = self
                .provider
                .get_run_steps(thread_id, run_id)
                .await
                .stage("could not get run steps")?;
            calls = steps.latest_tool_calls();
        }

        if calls.is_empty() {
            tracing::debug!(run_id, "requires_action with no tool calls");
            return Ok(Vec::new());
        }

        let mut planned = Vec::with_capacity(calls.len());
        for call in calls {
            let Some(function) = call.function.as_ref().filter(|_| call.is_function()) else {
                tracing::debug!(run_id, call_id = %call.id, kind = %call.kind, "skipping non-function tool call");
                continue;
            };
            match ToolInvocation::parse(&function.name, &function.arguments)? {
                Some(invocation) => planned.push((call.id.as_str(), invocation)),
                None => {
                    tracing::warn!(run_id, tool = %function.name, "ignoring call to unknown tool");
                }
            }
        }

        let mut outputs = Vec::with_capacity(planned.len());
        for (call_id, invocation) in planned {
            let output = self.invoke(thread_id, invocation).await?;
            outputs.push(ToolOutput {
                tool_call_id: call_id.to_owned(),
                output,
            });
        }

        if !outputs.is_empty() {
            self.provider
                .submit_tool_outputs(thread_id, run_id, &outputs)
                .await
                .stage("could not submit tool outputs")?;
        }

        TraceEvent::ToolDispatched {
            run_id: run_id.to_owned(),
            requested: calls.len(),
            outputs: outputs.len(),
            from_steps,
        }
        .emit();

        Ok(outputs)
    }

    async fn invoke(&self, thread_id: &str, invocation: ToolInvocation) -> Result<String> {
        match invocation {
            ToolInvocation::Lead { name } => self.capture_lead(thread_id, &name).await,
        }
    }

    async fn capture_lead(&self, thread_id: &str, name: &str) -> Result<String> {
        let session = self
            .sessions
            .find_by_thread(thread_id)
            .ok_or_else(|| Error::SessionNotFound {
                thread_id: thread_id.to_owned(),
            })?;

        self.sessions.record_captured_name(&session.user_id, name);

        let contact = contact_address(&session.user_id);
        self.leads
            .create_lead(name, contact)
            .await
            .stage("could not create lead")?;

        TraceEvent::LeadCaptured {
            thread_id: thread_id.to_owned(),
            contact: contact.to_owned(),
        }
        .emit();

        Ok(LEAD_CREATED.to_owned())
    }
}
