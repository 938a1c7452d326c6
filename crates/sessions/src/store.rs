//! In-memory session store.
//!
//! Each user ID maps to a `Session` holding the assistant thread ID for
//! that user.  A reverse `thread_id → user_id` index lets tool dispatch
//! (which only knows the thread) recover the owning session.
//!
//! Creation is serialized per user: concurrent first messages from the
//! same user create exactly one thread.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use imo_domain::error::{Error, Result};
use imo_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One end-user's ongoing conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Transport identity, e.g. `5511999990000:20@s.whatsapp.net`.
    pub user_id: String,
    /// Remote thread; never changes once assigned.
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    pub name_collected: bool,
    #[serde(default)]
    pub collected_name: String,
}

impl Session {
    fn new(user_id: &str, thread_id: String, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_owned(),
            thread_id,
            created_at: now,
            last_accessed_at: now,
            name_collected: false,
            collected_name: String::new(),
        }
    }

    /// The captured lead name, if the `lead` tool has run for this user.
    pub fn collected_name(&self) -> Option<&str> {
        self.name_collected.then_some(self.collected_name.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct Index {
    by_user: HashMap<String, Session>,
    /// thread_id → user_id
    by_thread: HashMap<String, String>,
}

/// Owner of every live session.  Callers get clones, never references
/// into the map.
#[derive(Default)]
pub struct SessionStore {
    index: RwLock<Index>,
    /// Per-user gates held while a thread is being created.
    creating: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the session for `user_id`, creating it (and its remote
    /// thread, via `create_thread`) on first contact.  Returns
    /// `(session, is_new)`.
    ///
    /// `create_thread` runs at most once per user even when many callers
    /// race on the same first message; losers wait and then see the
    /// winner's session.  If thread creation fails nothing is stored and
    /// the next caller tries again.
    pub async fn get_or_create<F, Fut>(
        &self,
        user_id: &str,
        create_thread: F,
    ) -> Result<(Session, bool)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        // Fast path: session already exists.
        if let Some(session) = self.touch(user_id) {
            return Ok((session, false));
        }

        let gate = {
            let mut creating = self.creating.lock();
            creating
                .entry(user_id.to_owned())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let _permit = gate.lock().await;

        // Another caller may have created it while we waited.
        if let Some(session) = self.touch(user_id) {
            return Ok((session, false));
        }

        let thread_id = create_thread().await?;
        let session = self.insert(user_id, thread_id)?;

        // Only drop the gate once the session is visible; on failure the
        // gate stays so queued callers keep serializing.
        self.creating.lock().remove(user_id);

        TraceEvent::SessionResolved {
            user_id: user_id.to_owned(),
            thread_id: session.thread_id.clone(),
            is_new: true,
        }
        .emit();

        Ok((session, true))
    }

    fn insert(&self, user_id: &str, thread_id: String) -> Result<Session> {
        let mut index = self.index.write();

        if let Some(owner) = index.by_thread.get(&thread_id) {
            if owner != user_id {
                return Err(Error::Protocol(format!(
                    "thread {thread_id} is already assigned to another user"
                )));
            }
        }

        let session = Session::new(user_id, thread_id.clone(), Utc::now());
        if let Some(previous) = index.by_user.insert(user_id.to_owned(), session.clone()) {
            index.by_thread.remove(&previous.thread_id);
        }
        index.by_thread.insert(thread_id, user_id.to_owned());
        Ok(session)
    }

    /// Look up a session by user ID without touching it.
    pub fn get(&self, user_id: &str) -> Option<Session> {
        self.index.read().by_user.get(user_id).cloned()
    }

    /// Refresh `last_accessed_at` and return the updated session.
    pub fn touch(&self, user_id: &str) -> Option<Session> {
        let mut index = self.index.write();
        let session = index.by_user.get_mut(user_id)?;
        session.last_accessed_at = Utc::now();
        Some(session.clone())
    }

    /// Remember the name captured by the `lead` tool.  Returns `false`
    /// when the user has no session.
    pub fn record_captured_name(&self, user_id: &str, name: &str) -> bool {
        let mut index = self.index.write();
        match index.by_user.get_mut(user_id) {
            Some(session) => {
                session.name_collected = true;
                session.collected_name = name.to_owned();
                true
            }
            None => false,
        }
    }

    /// Recover the session that owns `thread_id`.
    pub fn find_by_thread(&self, thread_id: &str) -> Option<Session> {
        let index = self.index.read();
        let user_id = index.by_thread.get(thread_id)?;
        index.by_user.get(user_id).cloned()
    }

    /// Remove every session last accessed before `cutoff`.  Returns the
    /// number of sessions removed.
    pub fn evict_idle_since(&self, cutoff: DateTime<Utc>) -> usize {
        let (evicted, remaining) = {
            let mut index = self.index.write();
            let stale: Vec<Session> = index
                .by_user
                .values()
                .filter(|s| s.last_accessed_at < cutoff)
                .cloned()
                .collect();
            for session in &stale {
                index.by_user.remove(&session.user_id);
                index.by_thread.remove(&session.thread_id);
            }
            (stale.len(), index.by_user.len())
        };

        // Gates left behind by failed creations.
        self.creating
            .lock()
            .retain(|_, gate| Arc::strong_count(gate) > 1);

        if evicted > 0 {
            TraceEvent::SessionsEvicted { evicted, remaining }.emit();
        }
        evicted
    }

    /// List all sessions.
    pub fn list(&self) -> Vec<Session> {
        self.index.read().by_user.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.index.read().by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
