//! In-memory doubles for the assistant API and the lead sink.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use imo_assistant::types::{StepDetails, TextValue};
use imo_assistant::{
    AssistantProvider, ContentPart, RequiredAction, Role, Run, RunError, RunStatus, RunStep,
    RunStepList, Thread, ThreadMessage, ThreadMessageList, ToolCall, ToolOutput,
};
use imo_domain::error::{Error, Result};
use imo_gateway::runtime::{Engine, EngineOptions, RunPolicy};
use imo_leads::LeadSink;

// ── Run builders ────────────────────────────────────────────────────────

pub fn run_with(status: RunStatus) -> Run {
    Run {
        id: "run_1".into(),
        thread_id: String::new(),
        status,
        required_action: None,
        last_error: None,
    }
}

pub fn requires_action(calls: Vec<ToolCall>) -> Run {
    Run {
        required_action: Some(RequiredAction {
            kind: "submit_tool_outputs".into(),
            submit_tool_outputs: None,
            tool_calls: calls,
        }),
        ..run_with(RunStatus::RequiresAction)
    }
}

pub fn failed(code: &str, message: &str) -> Run {
    Run {
        last_error: Some(RunError {
            code: code.into(),
            message: message.into(),
        }),
        ..run_with(RunStatus::Failed)
    }
}

pub fn assistant_says(parts: &[&str]) -> ThreadMessage {
    ThreadMessage {
        id: "msg_reply".into(),
        role: Role::Assistant,
        content: parts
            .iter()
            .map(|p| ContentPart::Text {
                text: TextValue {
                    value: (*p).to_owned(),
                },
            })
            .collect(),
    }
}

// ── Fake assistant ──────────────────────────────────────────────────────

/// Scripted assistant.  `get_run` pops from `script`; once the script is
/// exhausted every run reads as completed (or in progress, when `stuck`).
#[derive(Default)]
pub struct FakeAssistant {
    pub threads_created: AtomicUsize,
    pub create_delay: Mutex<Duration>,
    pub script: Mutex<VecDeque<Run>>,
    pub steps: Mutex<Vec<ToolCall>>,
    pub steps_fetched: AtomicUsize,
    pub stuck: AtomicBool,
    pub fail_submit: AtomicBool,
    pub added: Mutex<Vec<(String, String)>>,
    pub submitted: Mutex<Vec<(String, Vec<ToolOutput>)>>,
    pub reply: Mutex<Vec<ThreadMessage>>,
}

impl FakeAssistant {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        *fake.reply.lock() = vec![assistant_says(&["Olá!"])];
        Arc::new(fake)
    }

    pub fn script(&self, runs: impl IntoIterator<Item = Run>) {
        self.script.lock().extend(runs);
    }
}

#[async_trait]
impl AssistantProvider for FakeAssistant {
    async fn create_thread(&self) -> Result<Thread> {
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst);
        let delay = *self.create_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Thread {
            id: format!("thread_{n}"),
            created_at: 0,
        })
    }

    async fn add_message(&self, thread_id: &str, _role: Role, content: &str) -> Result<()> {
        self.added
            .lock()
            .push((thread_id.to_owned(), content.to_owned()));
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, _assistant_id: &str) -> Result<Run> {
        Ok(Run {
            thread_id: thread_id.to_owned(),
            ..run_with(RunStatus::Queued)
        })
    }

    async fn get_run(&self, thread_id: &str, _run_id: &str) -> Result<Run> {
        if self.stuck.load(Ordering::SeqCst) {
            return Ok(run_with(RunStatus::InProgress));
        }
        let next = self.script.lock().pop_front();
        let mut run = next.unwrap_or_else(|| run_with(RunStatus::Completed));
        run.thread_id = thread_id.to_owned();
        Ok(run)
    }

    async fn get_run_steps(&self, _thread_id: &str, _run_id: &str) -> Result<RunStepList> {
        self.steps_fetched.fetch_add(1, Ordering::SeqCst);
        Ok(RunStepList {
            data: vec![RunStep {
                id: "step_1".into(),
                status: "in_progress".into(),
                step_details: Some(StepDetails {
                    kind: "tool_calls".into(),
                    tool_calls: self.steps.lock().clone(),
                }),
            }],
        })
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<()> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(Error::Assistant("submit rejected".into()));
        }
        self.submitted
            .lock()
            .push((run_id.to_owned(), outputs.to_vec()));
        Ok(())
    }

    async fn get_messages(&self, _thread_id: &str) -> Result<ThreadMessageList> {
        Ok(ThreadMessageList {
            data: self.reply.lock().clone(),
        })
    }
}

// ── Recording lead sink ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingLeads {
    pub leads: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl LeadSink for RecordingLeads {
    async fn create_lead(&self, name: &str, contact: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::LeadSink("crm down".into()));
        }
        self.leads
            .lock()
            .push((name.to_owned(), contact.to_owned()));
        Ok(())
    }
}

// ── Engine wiring ───────────────────────────────────────────────────────

pub fn fast_options() -> EngineOptions {
    EngineOptions {
        assistant_id: "asst_test".into(),
        policy: RunPolicy {
            poll_interval: Duration::from_millis(1),
            action_settle: Duration::from_millis(1),
        },
        message_timeout: Duration::from_secs(5),
        inject_collected_name: true,
        idle_timeout: Duration::from_secs(24 * 3600),
        cleanup_interval: Duration::from_secs(3600),
    }
}

pub fn engine_with(
    assistant: &Arc<FakeAssistant>,
    leads: &Arc<RecordingLeads>,
    options: EngineOptions,
) -> Engine {
    Engine::new(assistant.clone(), leads.clone(), options)
}
