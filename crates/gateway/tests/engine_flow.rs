//! End-to-end message pipeline against scripted doubles: session
//! creation, run polling, tool dispatch and failure propagation.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use imo_assistant::{Role, RunStatus, ThreadMessage, ToolCall, ToolOutput};
use imo_domain::error::Error;
use imo_gateway::runtime::{EngineOptions, ToolDispatcher, LEAD_CREATED};
use imo_sessions::SessionStore;

use support::*;

const USER: &str = "5511999990000:20@s.whatsapp.net";

// ── Happy path ──────────────────────────────────────────────────────────

#[tokio::test]
async fn new_user_gets_thread_and_reply() {
    let assistant = FakeAssistant::new();
    *assistant.reply.lock() = vec![assistant_says(&["Olá!", "Que tipo de imóvel procura?"])];
    assistant.script([
        run_with(RunStatus::Queued),
        run_with(RunStatus::InProgress),
        run_with(RunStatus::Completed),
    ]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let reply = engine
        .process_message(USER, "Quero um apartamento")
        .await
        .unwrap();

    assert_eq!(reply, "Olá!\nQue tipo de imóvel procura?\n");
    assert_eq!(assistant.threads_created.load(Ordering::SeqCst), 1);
    assert_eq!(
        assistant.added.lock().clone(),
        vec![("thread_0".to_string(), "Quero um apartamento".to_string())]
    );
    assert!(assistant.script.lock().is_empty());

    let session = engine.sessions().get(USER).unwrap();
    assert_eq!(session.thread_id, "thread_0");
    assert!(leads.leads.lock().is_empty());
}

#[tokio::test]
async fn second_message_reuses_thread() {
    let assistant = FakeAssistant::new();
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    engine.process_message(USER, "oi").await.unwrap();
    engine.process_message(USER, "tudo bem?").await.unwrap();

    assert_eq!(assistant.threads_created.load(Ordering::SeqCst), 1);
    let added = assistant.added.lock().clone();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|(thread, _)| thread == "thread_0"));
}

#[tokio::test]
async fn concurrent_first_messages_create_one_thread() {
    let assistant = FakeAssistant::new();
    *assistant.create_delay.lock() = Duration::from_millis(20);
    let leads = Arc::new(RecordingLeads::default());
    let engine = Arc::new(engine_with(&assistant, &leads, fast_options()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.process_message(USER, &format!("msg {i}")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(assistant.threads_created.load(Ordering::SeqCst), 1);
    assert_eq!(engine.sessions().len(), 1);
    assert!(assistant
        .added
        .lock()
        .iter()
        .all(|(thread, _)| thread == "thread_0"));
}

#[tokio::test]
async fn user_last_message_yields_empty_reply() {
    let assistant = FakeAssistant::new();
    *assistant.reply.lock() = vec![ThreadMessage {
        id: "m".into(),
        role: Role::User,
        content: Vec::new(),
    }];
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    assert_eq!(engine.process_message(USER, "oi").await.unwrap(), "");
}

#[tokio::test]
async fn empty_thread_is_an_error() {
    let assistant = FakeAssistant::new();
    assistant.reply.lock().clear();
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();
    assert!(matches!(err.root(), Error::Other(m) if m == "no messages returned"));
}

// ── Lead capture ────────────────────────────────────────────────────────

#[tokio::test]
async fn lead_call_captures_contact_and_submits_output() {
    let assistant = FakeAssistant::new();
    assistant.script([
        requires_action(vec![ToolCall::function(
            "call_1",
            "lead",
            r#"{"name":"Maria Souza"}"#,
        )]),
        run_with(RunStatus::InProgress),
        run_with(RunStatus::Completed),
    ]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    engine.process_message(USER, "Meu nome é Maria Souza").await.unwrap();

    assert_eq!(
        leads.leads.lock().clone(),
        vec![("Maria Souza".to_string(), "5511999990000".to_string())]
    );
    assert_eq!(
        assistant.submitted.lock().clone(),
        vec![(
            "run_1".to_string(),
            vec![ToolOutput {
                tool_call_id: "call_1".into(),
                output: LEAD_CREATED.into(),
            }]
        )]
    );

    let session = engine.sessions().get(USER).unwrap();
    assert_eq!(session.collected_name(), Some("Maria Souza"));

    // The captured name is injected into the next message.
    engine.process_message(USER, "Tem algo em Pinheiros?").await.unwrap();
    let last = assistant.added.lock().last().unwrap().1.clone();
    assert_eq!(
        last,
        "(Context: User's name is Maria Souza) Tem algo em Pinheiros?"
    );
}

#[tokio::test]
async fn name_injection_can_be_disabled() {
    let assistant = FakeAssistant::new();
    assistant.script([requires_action(vec![ToolCall::function(
        "call_1",
        "lead",
        r#"{"name":"Ana"}"#,
    )])]);
    let leads = Arc::new(RecordingLeads::default());
    let mut options = fast_options();
    options.inject_collected_name = false;
    let engine = engine_with(&assistant, &leads, options);

    engine.process_message(USER, "Sou a Ana").await.unwrap();
    engine.process_message(USER, "oi").await.unwrap();

    assert_eq!(assistant.added.lock().last().unwrap().1, "oi");
}

#[tokio::test]
async fn tool_calls_fall_back_to_run_steps() {
    let assistant = FakeAssistant::new();
    *assistant.steps.lock() = vec![ToolCall::function("call_s", "lead", r#"{"name":"João"}"#)];
    assistant.script([requires_action(Vec::new())]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    engine.process_message("5521988887777@s.whatsapp.net", "oi").await.unwrap();

    assert_eq!(assistant.steps_fetched.load(Ordering::SeqCst), 1);
    assert_eq!(
        leads.leads.lock().clone(),
        vec![("João".to_string(), "5521988887777".to_string())]
    );
    assert_eq!(assistant.submitted.lock()[0].1[0].tool_call_id, "call_s");
}

#[tokio::test]
async fn pause_without_tool_calls_keeps_polling() {
    let assistant = FakeAssistant::new();
    assistant.script([
        requires_action(Vec::new()),
        run_with(RunStatus::InProgress),
        run_with(RunStatus::Completed),
    ]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    assert_eq!(engine.process_message(USER, "oi").await.unwrap(), "Olá!\n");
    assert_eq!(assistant.steps_fetched.load(Ordering::SeqCst), 1);
    assert!(assistant.submitted.lock().is_empty());
}

#[tokio::test]
async fn unknown_and_builtin_tools_are_ignored() {
    let assistant = FakeAssistant::new();
    let builtin = ToolCall {
        id: "call_fs".into(),
        kind: "file_search".into(),
        function: None,
    };
    assistant.script([requires_action(vec![
        builtin,
        ToolCall::function("call_noop", "noop", "{}"),
    ])]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    engine.process_message(USER, "oi").await.unwrap();

    assert!(assistant.submitted.lock().is_empty());
    assert!(leads.leads.lock().is_empty());
}

#[tokio::test]
async fn malformed_arguments_abort_without_side_effects() {
    let assistant = FakeAssistant::new();
    assistant.script([requires_action(vec![
        ToolCall::function("call_ok", "lead", r#"{"name":"Ana"}"#),
        ToolCall::function("call_bad", "lead", r#"{"name": 5}"#),
    ])]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();

    assert!(matches!(err.root(), Error::ToolArguments { tool, .. } if tool == "lead"));
    assert!(assistant.submitted.lock().is_empty());
    assert!(leads.leads.lock().is_empty());
}

#[tokio::test]
async fn lead_call_on_thread_without_session_fails_cleanly() {
    let assistant = FakeAssistant::new();
    let leads = Arc::new(RecordingLeads::default());
    let dispatcher = ToolDispatcher::new(
        assistant.clone(),
        Arc::new(SessionStore::new()),
        leads.clone(),
    );
    let action = requires_action(vec![ToolCall::function(
        "call_1",
        "lead",
        r#"{"name":"Ana"}"#,
    )])
    .required_action
    .unwrap();

    let err = dispatcher
        .dispatch("thread_orphan", "run_1", &action)
        .await
        .unwrap_err();

    assert!(
        matches!(err.root(), Error::SessionNotFound { thread_id } if thread_id == "thread_orphan")
    );
    assert!(leads.leads.lock().is_empty());
    assert!(assistant.submitted.lock().is_empty());
}

#[tokio::test]
async fn lead_sink_failure_fails_the_message() {
    let assistant = FakeAssistant::new();
    assistant.script([requires_action(vec![ToolCall::function(
        "call_1",
        "lead",
        r#"{"name":"Ana"}"#,
    )])]);
    let leads = Arc::new(RecordingLeads::default());
    leads.fail.store(true, Ordering::SeqCst);
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();

    assert!(matches!(err.root(), Error::LeadSink(_)));
    assert!(err.to_string().contains("could not handle function calling"));
    assert!(assistant.submitted.lock().is_empty());
}

#[tokio::test]
async fn submit_failure_fails_the_message() {
    let assistant = FakeAssistant::new();
    assistant.fail_submit.store(true, Ordering::SeqCst);
    assistant.script([requires_action(vec![ToolCall::function(
        "call_1",
        "lead",
        r#"{"name":"Ana"}"#,
    )])]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();

    assert!(matches!(err.root(), Error::Assistant(_)));
    // The lead is already captured; side effects are not rolled back.
    assert_eq!(leads.leads.lock().len(), 1);
}

// ── Run failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_run_carries_error_detail() {
    let assistant = FakeAssistant::new();
    assistant.script([
        run_with(RunStatus::InProgress),
        failed("rate_limit_exceeded", "quota exhausted"),
        // Never polled: terminal states end the loop.
        run_with(RunStatus::Completed),
    ]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();

    match err.root() {
        Error::RunFailed { run_id, status, detail } => {
            assert_eq!(run_id, "run_1");
            assert_eq!(status, "failed");
            assert!(detail.as_deref().unwrap().contains("quota exhausted"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(assistant.script.lock().len(), 1);
}

#[tokio::test]
async fn expired_run_without_detail() {
    let assistant = FakeAssistant::new();
    assistant.script([run_with(RunStatus::Expired)]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();
    assert!(matches!(err.root(), Error::RunFailed { detail: None, .. }));
    assert!(err.to_string().contains("no error detail"));
}

#[tokio::test]
async fn requires_action_without_payload_is_protocol_error() {
    let assistant = FakeAssistant::new();
    assistant.script([run_with(RunStatus::RequiresAction)]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();
    assert!(matches!(err.root(), Error::Protocol(_)));
}

#[tokio::test]
async fn unrecognised_status_is_protocol_error() {
    let assistant = FakeAssistant::new();
    assistant.script([run_with(RunStatus::Unknown)]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();
    assert!(matches!(err.root(), Error::Protocol(_)));
}

#[tokio::test]
async fn cancelling_is_not_terminal() {
    let assistant = FakeAssistant::new();
    assistant.script([
        run_with(RunStatus::Cancelling),
        run_with(RunStatus::Cancelled),
    ]);
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    let err = engine.process_message(USER, "oi").await.unwrap_err();
    assert!(matches!(err.root(), Error::RunFailed { status, .. } if status == "cancelled"));
}

#[tokio::test]
async fn deadline_stops_a_stuck_run() {
    let assistant = FakeAssistant::new();
    assistant.stuck.store(true, Ordering::SeqCst);
    let leads = Arc::new(RecordingLeads::default());
    let mut options = fast_options();
    options.message_timeout = Duration::from_millis(100);
    let engine = engine_with(&assistant, &leads, options);

    let err = engine.process_message(USER, "oi").await.unwrap_err();
    assert!(err.is_timeout());

    // The session survives; the next message reuses the thread.
    assert_eq!(engine.sessions().get(USER).unwrap().thread_id, "thread_0");
}

// ── Lifecycle ───────────────────────────────────────────────────────────

#[tokio::test]
async fn start_and_shutdown_cleanup_loop() {
    let assistant = FakeAssistant::new();
    let leads = Arc::new(RecordingLeads::default());
    let engine = engine_with(&assistant, &leads, fast_options());

    engine.start();
    engine.start();
    tokio::time::timeout(Duration::from_secs(1), engine.shutdown())
        .await
        .unwrap();
    // A second shutdown is a no-op.
    engine.shutdown().await;
}

#[tokio::test]
async fn construction_alone_evicts_idle_sessions() {
    let assistant = FakeAssistant::new();
    let leads = Arc::new(RecordingLeads::default());
    let options = EngineOptions {
        idle_timeout: Duration::ZERO,
        cleanup_interval: Duration::from_millis(10),
        ..fast_options()
    };
    let engine = engine_with(&assistant, &leads, options);

    engine.process_message(USER, "oi").await.unwrap();

    for _ in 0..100 {
        if engine.sessions().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(engine.sessions().is_empty());

    engine.shutdown().await;
}
