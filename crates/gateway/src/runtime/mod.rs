//! Conversation engine: the orchestrator that ties sessions, the remote
//! assistant, tool dispatch and idle cleanup into one message pipeline.
//!
//! Entry point: [`Engine::process_message`] takes a user ID and message
//! text and returns the assistant's reply.  Each call is independent and
//! may run concurrently with any other.

pub mod cleanup;
pub mod runs;
pub mod tools;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use imo_assistant::{AssistantProvider, Role};
use imo_domain::config::Config;
use imo_domain::error::{Error, Result, ResultExt};
use imo_leads::LeadSink;
use imo_sessions::{Session, SessionStore};

pub use cleanup::{CleanupHandle, CleanupScheduler};
pub use imo_domain::tool::lead_tool_definition;
pub use runs::{drive_run, RunPolicy};
pub use tools::{ToolDispatcher, ToolInvocation, LEAD_CREATED};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-engine settings, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub assistant_id: String,
    pub policy: RunPolicy,
    /// Upper bound on one `process_message` call.
    pub message_timeout: Duration,
    /// Prefix user messages with the captured lead name, once known.
    pub inject_collected_name: bool,
    pub idle_timeout: Duration,
    pub cleanup_interval: Duration,
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            assistant_id: config.assistant.assistant_id.clone(),
            policy: RunPolicy::from_config(&config.runtime),
            message_timeout: config.runtime.message_timeout(),
            inject_collected_name: config.runtime.inject_collected_name,
            idle_timeout: config.sessions.idle_timeout(),
            cleanup_interval: config.sessions.cleanup_interval(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The conversation engine.  Construction inside a tokio runtime starts
/// the idle-session cleanup loop; dropping the engine stops it.
pub struct Engine {
    provider: Arc<dyn AssistantProvider>,
    sessions: Arc<SessionStore>,
    dispatcher: ToolDispatcher,
    options: EngineOptions,
    cleanup: Mutex<Option<CleanupHandle>>,
}

impl Engine {
    pub fn new(
        provider: Arc<dyn AssistantProvider>,
        leads: Arc<dyn LeadSink>,
        options: EngineOptions,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let dispatcher = ToolDispatcher::new(provider.clone(), sessions.clone(), leads);
        let engine = Self {
            provider,
            sessions,
            dispatcher,
            options,
            cleanup: Mutex::new(None),
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            engine.start();
        } else {
            tracing::warn!("no tokio runtime at engine construction; call start() to begin session cleanup");
        }
        engine
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Start the idle-session cleanup loop.  [`Engine::new`] already does
    /// this when called inside a tokio runtime; calling it again while the
    /// loop is running does nothing.
    pub fn start(&self) {
        let mut slot = self.cleanup.lock();
        if slot.as_ref().is_some_and(CleanupHandle::is_running) {
            return;
        }
        let scheduler = CleanupScheduler::new(
            self.sessions.clone(),
            self.options.idle_timeout,
            self.options.cleanup_interval,
        );
        *slot = Some(scheduler.spawn());
    }

    /// Stop the cleanup loop and wait for it to exit.
    pub async fn shutdown(&self) {
        let handle = self.cleanup.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    /// Handle one inbound message within the configured message timeout.
    pub async fn process_message(&self, user_id: &str, text: &str) -> Result<String> {
        let deadline = Instant::now() + self.options.message_timeout;
        self.process_message_until(user_id, text, deadline).await
    }

    /// Handle one inbound message, giving up at `deadline`.
    ///
    /// Either the full assistant reply is returned or an error; never a
    /// partial reply.  Lead side effects that happened before a failure
    /// are kept.
    pub async fn process_message_until(
        &self,
        user_id: &str,
        text: &str,
        deadline: Instant,
    ) -> Result<String> {
        match tokio::time::timeout_at(deadline, self.pipeline(user_id, text, deadline)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "message from {user_id} was not answered before the deadline"
            ))),
        }
    }

    async fn pipeline(&self, user_id: &str, text: &str, deadline: Instant) -> Result<String> {
        let session = self.resolve_session(user_id).await?;
        let thread_id = session.thread_id.as_str();

        let content = self.compose(&session, text);
        self.provider
            .add_message(thread_id, Role::User, &content)
            .await
            .stage("could not add message")?;

        let run = self
            .provider
            .start_run(thread_id, &self.options.assistant_id)
            .await
            .stage("could not run thread")?;

        tracing::debug!(user_id, thread_id, run_id = %run.id, status = %run.status, "run started");

        drive_run(
            self.provider.as_ref(),
            &self.dispatcher,
            thread_id,
            &run.id,
            self.options.policy,
            deadline,
        )
        .await?;

        self.latest_reply(thread_id).await
    }

    async fn resolve_session(&self, user_id: &str) -> Result<Session> {
        let provider = self.provider.clone();
        let (session, is_new) = self
            .sessions
            .get_or_create(user_id, move || async move {
                provider.create_thread().await.map(|thread| thread.id)
            })
            .await
            .stage("could not create thread")?;

        if is_new {
            tracing::info!(user_id, thread_id = %session.thread_id, "new conversation");
        }
        Ok(session)
    }

    fn compose(&self, session: &Session, text: &str) -> String {
        match session.collected_name() {
            Some(name) if self.options.inject_collected_name => {
                format!("(Context: User's name is {name}) {text}")
            }
            _ => text.to_owned(),
        }
    }

    /// Text of the most recent message, if the assistant wrote it.
    async fn latest_reply(&self, thread_id: &str) -> Result<String> {
        let messages = self
            .provider
            .get_messages(thread_id)
            .await
            .stage("could not get messages")?;

        let latest = messages
            .data
            .first()
            .ok_or_else(|| Error::Other("no messages returned".into()))?;

        if latest.role != Role::Assistant {
            return Ok(String::new());
        }
        Ok(latest.text_lines())
    }
}
