/// Per-chat dialogue state
///
/// Sessions live in a keyed in-memory store with idle eviction. The host
/// request loop handles one update per chat at a time, so take/put round
/// trips do not race per user.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::models::DiscoveryCriteria;

/// Which slot of the fixed-order search dialogue is being filled next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchSlot {
    #[default]
    Genre,
    Year,
    Duration,
    Actor,
}

/// An in-progress four-slot movie search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchInProgress {
    pub slot: SearchSlot,
    pub criteria: DiscoveryCriteria,
}

/// An in-progress rating exchange
#[derive(Debug, Clone, PartialEq)]
pub enum RatingStep {
    AwaitingTitle,
    AwaitingValue { title: String },
}

#[derive(Debug, Clone, Default)]
pub struct DialogueState {
    pub search: Option<SearchInProgress>,
    pub rating: Option<RatingStep>,
}

struct Entry {
    state: DialogueState,
    last_active: Instant,
}

pub struct SessionStore {
    idle_timeout: Duration,
    sessions: RwLock<HashMap<i64, Entry>>,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Removes and returns the chat's dialogue state, or a fresh one if the
    /// chat has none or its session idled out.
    pub async fn take(&self, chat_id: i64) -> DialogueState {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(&chat_id) {
            Some(entry) if entry.last_active.elapsed() < self.idle_timeout => entry.state,
            _ => DialogueState::default(),
        }
    }

    /// Stores the chat's dialogue state, evicting idle sessions while the
    /// write lock is held.
    pub async fn put(&self, chat_id: i64, state: DialogueState) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| entry.last_active.elapsed() < self.idle_timeout);
        sessions.insert(
            chat_id,
            Entry {
                state,
                last_active: Instant::now(),
            },
        );
    }
}
