//! Session registry.
//!
//! Maps session identifiers to live connection handles plus their metadata.
//! Sessions are created on connect, touched on every lookup and destroyed on
//! explicit close or by the expiry sweep.
//!
//! # Expiry
//!
//! The sweep is lazy: it runs at the start of every [`SessionRegistry::get`],
//! under the map lock, and removes every session idle for longer than the
//! timeout before the lookup happens. Handles of swept sessions are closed
//! after the map lock is released, before `get` returns. A swept handle
//! still held by another request is closed in the background once released,
//! so a lookup never waits on an unrelated session.
//!
//! # Concurrency
//!
//! The map is guarded by one lock; sweep, lookup and the last-used update
//! happen atomically under it. Each handle additionally sits behind its own
//! mutex and `get` returns an owned guard, so two requests naming the same
//! session queue up for the full database round trip instead of interleaving
//! on one connection.

use crate::db::handle::{ConnectionHandle, Connector};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, QueryRecord, SessionInfo};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

/// Default idle timeout before a session is swept.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 3600;

/// Exclusive access to a session's handle, held for one database round trip.
///
/// Drop it before calling [`SessionRegistry::close`] on the same session.
pub type SessionGuard<H> = OwnedMutexGuard<H>;

type SharedHandle<H> = Arc<Mutex<H>>;

struct SessionEntry<H> {
    handle: SharedHandle<H>,
    created_at: DateTime<Utc>,
    last_used: Instant,
    current_db: Option<String>,
    history: Vec<QueryRecord>,
}

impl<H> SessionEntry<H> {
    fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_used) > timeout
    }
}

pub struct SessionRegistry<C: Connector> {
    connector: C,
    sessions: Arc<RwLock<HashMap<String, SessionEntry<C::Handle>>>>,
    timeout: Duration,
    /// System start time for converting Instant to DateTime
    system_start_instant: Instant,
    /// System start time as UTC DateTime
    system_start_datetime: DateTime<Utc>,
}

impl<C: Connector> SessionRegistry<C> {
    /// Create a registry with the default one-hour idle timeout.
    pub fn new(connector: C) -> Self {
        Self::with_timeout(connector, Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS))
    }

    pub fn with_timeout(connector: C, timeout: Duration) -> Self {
        Self {
            connector,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            timeout,
            system_start_instant: Instant::now(),
            system_start_datetime: Utc::now(),
        }
    }

    /// Open a new physical connection and register it as a session.
    ///
    /// Generates a fresh identifier when none is supplied. If the supplied
    /// identifier is already registered, its old handle is closed and
    /// replaced; connect never reuses existing state. On connection failure
    /// no session is created.
    pub async fn connect(
        &self,
        config: &ConnectionConfig,
        session_id: Option<String>,
    ) -> DbResult<(String, SessionGuard<C::Handle>)> {
        let handle = self.connector.connect(config).await?;
        let session_id = session_id.unwrap_or_else(generate_session_id);

        let handle = Arc::new(Mutex::new(handle));
        // Not yet visible to anyone else, so this never waits
        let guard = Arc::clone(&handle).lock_owned().await;

        let entry = SessionEntry {
            handle,
            created_at: Utc::now(),
            last_used: Instant::now(),
            current_db: config.database.clone(),
            history: Vec::new(),
        };

        let replaced = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id.clone(), entry)
        };

        if let Some(old) = replaced {
            warn!(session_id = %session_id, "Replacing existing session");
            old.handle.lock().await.close().await;
        }

        info!(
            session_id = %session_id,
            server = %config.display_target(),
            "Session opened"
        );

        Ok((session_id, guard))
    }

    /// Look up a live session.
    ///
    /// Runs the expiry sweep first, then updates the session's last-used
    /// time. A handle that fails its liveness check is reconnected once;
    /// the reconnect error is returned if that fails too.
    pub async fn get(&self, session_id: &str) -> DbResult<SessionGuard<C::Handle>> {
        let (handle, expired) = {
            let mut sessions = self.sessions.write().await;
            let expired = self.take_expired(&mut sessions);
            let handle = sessions.get_mut(session_id).map(|entry| {
                entry.last_used = Instant::now();
                Arc::clone(&entry.handle)
            });
            (handle, expired)
        };

        close_swept(expired).await;

        let handle = handle.ok_or_else(|| DbError::session_not_found(session_id))?;
        let mut guard = handle.lock_owned().await;

        if !guard.is_alive().await {
            guard.reconnect().await?;
            info!(session_id = %session_id, "Session reconnected");
        }

        Ok(guard)
    }

    /// Close and forget a session. Unknown identifiers are a no-op.
    pub async fn close(&self, session_id: &str) {
        let entry = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };

        if let Some(entry) = entry {
            let mut handle = entry.handle.lock().await;
            if handle.is_alive().await {
                handle.close().await;
            }
            info!(session_id = %session_id, "Session closed");
        }
    }

    /// Append a statement to the session's history.
    ///
    /// Returns false if the session is unknown.
    pub async fn record_query(&self, session_id: &str, query: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(entry) => {
                entry.history.push(QueryRecord {
                    query: query.to_string(),
                    timestamp: Utc::now(),
                });
                true
            }
            None => false,
        }
    }

    /// Run the expiry sweep on its own. Returns the number of sessions removed.
    pub async fn cleanup_expired(&self) -> usize {
        let expired = {
            let mut sessions = self.sessions.write().await;
            self.take_expired(&mut sessions)
        };
        let count = expired.len();
        close_swept(expired).await;
        count
    }

    /// Close every session, e.g. on shutdown.
    pub async fn close_all(&self) {
        let drained: Vec<(String, SharedHandle<C::Handle>)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(id, entry)| (id, entry.handle)).collect()
        };
        if !drained.is_empty() {
            info!(count = drained.len(), "Closing all sessions");
        }
        close_handles(drained, "shutdown").await;
    }

    /// Metadata snapshot for one session.
    pub async fn session_info(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|entry| {
            // Convert Instant to DateTime by calculating offset from system start
            let offset_from_start = entry
                .last_used
                .saturating_duration_since(self.system_start_instant);
            SessionInfo {
                session_id: session_id.to_string(),
                created_at: entry.created_at,
                last_used: self.system_start_datetime + offset_from_start,
                current_db: entry.current_db.clone(),
                query_history: entry.history.clone(),
            }
        })
    }

    /// Get the number of registered sessions.
    pub async fn count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Remove expired entries from the map and hand back their handles.
    fn take_expired(
        &self,
        sessions: &mut HashMap<String, SessionEntry<C::Handle>>,
    ) -> Vec<(String, SharedHandle<C::Handle>)> {
        let now = Instant::now();
        let expired_ids: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.timeout))
            .map(|(id, _)| id.clone())
            .collect();

        if !expired_ids.is_empty() {
            debug!(count = expired_ids.len(), "Sweeping expired sessions");
        }

        expired_ids
            .into_iter()
            .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry.handle)))
            .collect()
    }
}

async fn close_handles<H: ConnectionHandle>(handles: Vec<(String, SharedHandle<H>)>, reason: &str) {
    for (id, handle) in handles {
        let mut handle = handle.lock().await;
        close_locked(&mut *handle, &id, reason).await;
    }
}

/// Close swept handles without waiting on busy ones.
///
/// A handle still held by an in-flight request is closed by a background
/// task once that request releases it.
async fn close_swept<H: ConnectionHandle>(handles: Vec<(String, SharedHandle<H>)>) {
    for (id, handle) in handles {
        match Arc::clone(&handle).try_lock_owned() {
            Ok(mut guard) => close_locked(&mut *guard, &id, "expired").await,
            Err(_) => {
                debug!(session_id = %id, "Expired session still in use, closing on release");
                tokio::spawn(async move {
                    let mut guard = handle.lock_owned().await;
                    close_locked(&mut *guard, &id, "expired").await;
                });
            }
        }
    }
}

async fn close_locked<H: ConnectionHandle>(handle: &mut H, id: &str, reason: &str) {
    if handle.is_alive().await {
        handle.close().await;
    }
    info!(session_id = %id, reason, "Session closed");
}

/// Generate a unique session ID.
fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
