/// Shared error type used across all imolink crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("assistant API: {0}")]
    Assistant(String),

    #[error("lead sink: {0}")]
    LeadSink(String),

    /// A tool call referenced a thread that no live session owns.
    #[error("no session found for thread {thread_id}")]
    SessionNotFound { thread_id: String },

    /// The run reached `failed`, `cancelled` or `expired`.
    #[error("run {run_id} ended with status {status}: {}", .detail.as_deref().unwrap_or("no error detail"))]
    RunFailed {
        run_id: String,
        status: String,
        detail: Option<String>,
    },

    #[error("invalid arguments for tool `{tool}`: {message}")]
    ToolArguments { tool: String, message: String },

    /// The upstream service broke its own contract (e.g. `requires_action`
    /// without an action payload).
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("config: {0}")]
    Config(String),

    /// Wraps an error with the pipeline stage that produced it.
    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Attach the name of the stage that failed.
    pub fn at(self, stage: &'static str) -> Self {
        Error::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, with every `Stage` layer peeled off.
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::Stage { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// `?`-friendly stage annotation for [`Result`].
pub trait ResultExt<T> {
    fn stage(self, stage: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn stage(self, stage: &'static str) -> Result<T> {
        self.map_err(|e| e.at(stage))
    }
}
