use serde::Serialize;

/// Structured trace events emitted across all imolink crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        user_id: String,
        thread_id: String,
        is_new: bool,
    },
    SessionsEvicted {
        evicted: usize,
        remaining: usize,
    },
    RunPolled {
        run_id: String,
        status: String,
        poll: u32,
    },
    RunFinished {
        run_id: String,
        status: String,
        polls: u32,
        action_cycles: u32,
        duration_ms: u64,
    },
    ToolDispatched {
        run_id: String,
        requested: usize,
        outputs: usize,
        from_steps: bool,
    },
    LeadCaptured {
        thread_id: String,
        contact: String,
    },
    AssistantCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "imo_event");
    }
}
