use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Conversation, Message};

/// Conversation memory keyed by session id, used only in memory mode.
///
/// Sessions idle for longer than the TTL are evicted on access, and each keeps
/// at most `max_turns` question/answer pairs.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Conversation>>,
    ttl: Duration,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            max_turns,
        }
    }

    pub fn from_seconds(ttl_seconds: u64, max_turns: usize) -> Self {
        let seconds = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        Self::new(Duration::seconds(seconds), max_turns)
    }

    pub fn history(&self, session_id: Uuid) -> Vec<Message> {
        self.evict_expired();
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(&session_id)
            .map(|conv| conv.messages.clone())
            .unwrap_or_default()
    }

    pub fn record(&self, session_id: Uuid, question: &str, answer: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id)
            .or_insert_with(|| Conversation::new(session_id))
            .add_turn(question, answer, self.max_turns);
    }

    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, conv| !conv.is_expired(self.ttl, now));

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "expired sessions evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
