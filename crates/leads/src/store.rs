//! Append-only JSONL lead store.
//!
//! Every captured lead is appended to a single file as one JSON line.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use imo_domain::error::{Error, Result};

use crate::sink::Lead;

/// Durable storage for leads.
#[derive(Debug, Clone)]
pub struct JsonlLeadStore {
    path: PathBuf,
    /// Serializes appends from concurrent workers.
    write_lock: Arc<Mutex<()>>,
}

impl JsonlLeadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Append `lead` to the file, creating it (and its parent directory)
    /// if needed.
    pub async fn append(&self, lead: &Lead) -> Result<()> {
        let mut line = serde_json::to_string(lead)?;
        line.push('\n');

        let path = self.path.clone();
        let lock = self.write_lock.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            file.write_all(line.as_bytes())?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        tracing::debug!(lead_id = %lead.id, path = %self.path.display(), "lead stored");
        Ok(())
    }

    /// Read back every stored lead.  Malformed lines are skipped.
    pub fn load_all(&self) -> Result<Vec<Lead>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| match serde_json::from_str::<Lead>(l) {
                Ok(lead) => Some(lead),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed lead line");
                    None
                }
            })
            .collect())
    }
}
