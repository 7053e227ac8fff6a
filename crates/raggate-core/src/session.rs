//! Per-user conversation history
//!
//! Histories live behind a per-user `tokio::sync::Mutex` whose owned guard
//! is held for a whole chat turn. Two turns for the same user therefore
//! serialize (history reads and the final commit see a consistent
//! conversation), while different users never contend.

use crate::message::Message;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

type History = Arc<Mutex<Vec<Message>>>;

/// Counters surfaced on the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub sessions: usize,
    pub total_messages: usize,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, History>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// Lock a user's history for a whole turn
    pub async fn guard(&self, user: &str) -> OwnedMutexGuard<Vec<Message>> {
        let existing = self.sessions.read().await.get(user).cloned();
        let history = match existing {
            Some(history) => history,
            None => {
                let mut sessions = self.sessions.write().await;
                Arc::clone(sessions.entry(user.to_string()).or_default())
            }
        };
        history.lock_owned().await
    }

    /// Append and trim oldest-first past the cap of `2 × max_history`
    /// messages; `max_history` counts exchanges, the cap counts messages
    pub fn append(&self, history: &mut Vec<Message>, message: Message) {
        history.push(message);
        let cap = self.max_history * 2;
        if history.len() > cap {
            history.drain(..history.len() - cap);
        }
    }

    /// Append unless the stored tail already carries the same content;
    /// returns whether anything was appended
    pub fn append_unless_tail_duplicate(
        &self,
        history: &mut Vec<Message>,
        message: Message,
    ) -> bool {
        if history
            .last()
            .is_some_and(|tail| tail.content == message.content)
        {
            return false;
        }
        self.append(history, message);
        true
    }

    /// The slice of history that goes into a prompt: the newest
    /// `2 × max_history` messages, the same span the store keeps
    pub fn recent<'a>(&self, history: &'a [Message]) -> &'a [Message] {
        &history[history.len().saturating_sub(self.max_history * 2)..]
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Counters for the stats endpoint. Sessions currently locked by a turn
    /// in flight contribute their session count but not their messages.
    pub async fn stats(&self) -> SessionStats {
        let sessions = self.sessions.read().await;
        let total_messages = sessions
            .values()
            .filter_map(|history| history.try_lock().ok().map(|h| h.len()))
            .sum();
        SessionStats {
            sessions: sessions.len(),
            total_messages,
        }
    }
}
