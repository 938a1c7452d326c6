//! Run orchestration: poll a started run until it reaches a terminal
//! status, servicing tool calls whenever it pauses for action.

use std::time::{Duration, Instant as StdInstant};

use tokio::time::Instant;

use imo_assistant::{AssistantProvider, Run, RunStatus};
use imo_domain::config::RuntimeConfig;
use imo_domain::error::{Error, Result, ResultExt};
use imo_domain::trace::TraceEvent;

use super::tools::ToolDispatcher;

/// Delays used by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    /// Sleep between polls while the run is queued or in progress.
    pub poll_interval: Duration,
    /// Sleep after submitting tool outputs, before polling again.
    pub action_settle: Duration,
}

impl RunPolicy {
    pub fn from_config(cfg: &RuntimeConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            action_settle: cfg.action_settle(),
        }
    }
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

/// Drive `run_id` on `thread_id` to completion.
///
/// Returns the completed run.  A run ending `failed`, `cancelled` or
/// `expired` yields [`Error::RunFailed`]; reaching `deadline` first
/// yields [`Error::Timeout`].  Side effects of tool calls already
/// dispatched are not rolled back on either failure.
pub async fn drive_run(
    provider: &dyn AssistantProvider,
    dispatcher: &ToolDispatcher,
    thread_id: &str,
    run_id: &str,
    policy: RunPolicy,
    deadline: Instant,
) -> Result<Run> {
    match tokio::time::timeout_at(deadline, poll_loop(provider, dispatcher, thread_id, run_id, policy)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!(
            "run {run_id} did not finish before the deadline"
        ))),
    }
}

async fn poll_loop(
    provider: &dyn AssistantProvider,
    dispatcher: &ToolDispatcher,
    thread_id: &str,
    run_id: &str,
    policy: RunPolicy,
) -> Result<Run> {
    let started = StdInstant::now();
    let mut polls: u32 = 0;
    let mut action_cycles: u32 = 0;

    loop {
        let run = provider
            .get_run(thread_id, run_id)
            .await
            .stage("could not get run status")?;
        polls += 1;

        TraceEvent::RunPolled {
            run_id: run_id.to_owned(),
            status: run.status.to_string(),
            poll: polls,
        }
        .emit();

        if run.status.is_terminal() {
            TraceEvent::RunFinished {
                run_id: run_id.to_owned(),
                status: run.status.to_string(),
                polls,
                action_cycles,
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();

            if matches!(run.status, RunStatus::Completed) {
                return Ok(run);
            }
            tracing::warn!(
                run_id,
                status = %run.status,
                polls,
                "run ended without completing"
            );
            return Err(Error::RunFailed {
                run_id: run_id.to_owned(),
                status: run.status.to_string(),
                detail: run.last_error.as_ref().map(ToString::to_string),
            });
        }

        match run.status {
            RunStatus::RequiresAction => {
                let action = run.required_action.as_ref().ok_or_else(|| {
                    Error::Protocol(format!(
                        "run {run_id} is requires_action but carries no required action"
                    ))
                })?;

                dispatcher
                    .dispatch(thread_id, run_id, action)
                    .await
                    .stage("could not handle function calling")?;
                action_cycles += 1;

                tokio::time::sleep(policy.action_settle).await;
            }

            RunStatus::Unknown => {
                return Err(Error::Protocol(format!(
                    "run {run_id} reported an unrecognised status"
                )));
            }

            // queued, in_progress, cancelling
            _ => tokio::time::sleep(policy.poll_interval).await,
        }
    }
}
