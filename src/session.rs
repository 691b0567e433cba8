use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One user+kitchen pairing. All context scoping keys off this pair; history
/// from one key never influences resolution for another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    pub kitchen_id: i64,
    pub user: String,
}

/// Append-only element of a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub message: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_turns: usize,
    pub idle_timeout: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_turns: 10,
            idle_timeout: Duration::from_secs(30 * 60),
            max_sessions: 256,
        }
    }
}

#[derive(Debug)]
pub struct SessionState {
    history: VecDeque<Turn>,
    max_turns: usize,
}

impl SessionState {
    fn new(max_turns: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_turns.min(16)),
            max_turns,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    /// Most recent `limit` turns, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Turn> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn push(&mut self, turn: Turn) {
        if self.max_turns == 0 {
            return;
        }
        while self.history.len() >= self.max_turns {
            self.history.pop_front();
        }
        self.history.push_back(turn);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Locked view over one session. Holding the handle's guard is the per-key
/// mutual-exclusion region: a second request for the same key blocks until the
/// first one has appended its turn, so history stays in issue order.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct SessionEntry {
    state: Arc<Mutex<SessionState>>,
    last_active: Instant,
}

/// Process-wide store of per-session conversation history. The only mutable
/// shared resource in the engine; created at startup and dropped at shutdown.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionKey, SessionEntry>>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            limits,
        }
    }

    /// Fetch-or-create the session for `key`, refreshing its activity stamp.
    /// Eviction runs opportunistically here rather than on a timer.
    pub fn session(&self, key: &SessionKey) -> SessionHandle {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        sessions.retain(|_, entry| now.duration_since(entry.last_active) < self.limits.idle_timeout);

        let entry = sessions.entry(key.clone()).or_insert_with(|| SessionEntry {
            state: Arc::new(Mutex::new(SessionState::new(self.limits.max_turns))),
            last_active: now,
        });
        entry.last_active = now;
        let handle = SessionHandle {
            state: Arc::clone(&entry.state),
        };

        if sessions.len() > self.limits.max_sessions {
            let victim = sessions
                .iter()
                .filter(|(candidate, _)| *candidate != key)
                .min_by_key(|(_, entry)| entry.last_active)
                .map(|(candidate, _)| candidate.clone());
            if let Some(victim) = victim {
                sessions.remove(&victim);
            }
        }

        handle
    }

    /// Snapshot of the recent history for `key`; empty when the session does
    /// not exist yet.
    pub fn history(&self, key: &SessionKey) -> Vec<Turn> {
        let handle = {
            let sessions = self
                .sessions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            sessions.get(key).map(|entry| SessionHandle {
                state: Arc::clone(&entry.state),
            })
        };
        match handle {
            Some(handle) => handle.lock().recent(self.limits.max_turns),
            None => Vec::new(),
        }
    }

    pub fn append(&self, key: &SessionKey, turn: Turn) {
        self.session(key).lock().push(turn);
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(user: &str) -> SessionKey {
        SessionKey {
            kitchen_id: 1,
            user: user.to_string(),
        }
    }

    fn turn(message: &str) -> Turn {
        Turn {
            message: message.to_string(),
            action: None,
            outcome: None,
            timestamp: 0,
        }
    }

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let store = SessionStore::new(SessionLimits {
            max_turns: 3,
            ..SessionLimits::default()
        });
        let key = key("amy");
        for index in 0..4 {
            store.append(&key, turn(&format!("m{index}")));
        }
        let history = store.history(&key);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message, "m1");
        assert_eq!(history[2].message, "m3");
    }

    #[test]
    fn sessions_are_isolated_per_key() {
        let store = SessionStore::new(SessionLimits::default());
        store.append(&key("amy"), turn("apples"));
        assert_eq!(store.history(&key("amy")).len(), 1);
        assert!(store.history(&key("bob")).is_empty());
    }

    #[test]
    fn idle_sessions_are_evicted_on_access() {
        let store = SessionStore::new(SessionLimits {
            idle_timeout: Duration::from_millis(0),
            ..SessionLimits::default()
        });
        store.append(&key("amy"), turn("apples"));
        // Any access with a zero idle timeout sweeps existing sessions.
        store.session(&key("bob"));
        assert!(store.history(&key("amy")).is_empty());
    }

    #[test]
    fn capacity_evicts_least_recently_active() {
        let store = SessionStore::new(SessionLimits {
            max_sessions: 2,
            ..SessionLimits::default()
        });
        store.append(&key("amy"), turn("a"));
        std::thread::sleep(Duration::from_millis(2));
        store.append(&key("bob"), turn("b"));
        std::thread::sleep(Duration::from_millis(2));
        store.append(&key("cleo"), turn("c"));
        assert_eq!(store.session_count(), 2);
        assert!(store.history(&key("amy")).is_empty());
        assert_eq!(store.history(&key("cleo")).len(), 1);
    }

    #[test]
    fn handle_serializes_appends_in_issue_order() {
        let store = SessionStore::new(SessionLimits::default());
        let key = key("amy");
        let handle = store.session(&key);
        {
            let mut session = handle.lock();
            session.push(turn("first"));
            session.push(turn("second"));
        }
        let history = store.history(&key);
        assert_eq!(history[0].message, "first");
        assert_eq!(history[1].message, "second");
    }
}
