//! Session store — exclusive in-memory owner of all active sessions.
//!
//! Keyed by chat id. Sessions enter on `/start` and leave on completion
//! or cancellation; nothing survives a process restart. The store is
//! injectable so the dispatcher (and tests) receive it rather than
//! reaching for process-wide state.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::session::model::Session;

/// Snapshot statistics over the currently-active sessions.
///
/// Computed under a read lock; concurrent mutations from other chats
/// may or may not be visible, which is acceptable for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateStats {
    /// Number of active sessions.
    pub active_sessions: usize,
    /// Sessions started on the current calendar day.
    pub started_today: usize,
    /// Mean score across active sessions; 0.0 when none are active.
    pub average_score: f64,
    /// Percent of active sessions scoring strictly below the reference
    /// score; 100.0 when none are active.
    pub percentile: f64,
}

/// In-memory map from chat id to session.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session, returning any displaced one for the same chat.
    /// Starting over discards prior progress silently.
    pub async fn insert(&self, session: Session) -> Option<Session> {
        self.sessions.write().await.insert(session.chat_id, session)
    }

    /// Remove and return the session for a chat.
    pub async fn remove(&self, chat_id: i64) -> Option<Session> {
        self.sessions.write().await.remove(&chat_id)
    }

    /// Run a closure against the chat's session, if one exists.
    ///
    /// The closure is the only way to mutate a stored session; the
    /// write lock is held for its duration.
    pub async fn with_session<R>(
        &self,
        chat_id: i64,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        self.sessions.write().await.get_mut(&chat_id).map(f)
    }

    /// Whether a session exists for the chat.
    pub async fn contains(&self, chat_id: i64) -> bool {
        self.sessions.read().await.contains_key(&chat_id)
    }

    /// Number of active sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Aggregate statistics for the given reference score.
    pub async fn stats_for(&self, score: u32) -> AggregateStats {
        let sessions = self.sessions.read().await;
        let now = Utc::now();

        let active_sessions = sessions.len();
        let started_today = sessions.values().filter(|s| s.started_today(now)).count();

        if active_sessions == 0 {
            return AggregateStats {
                active_sessions: 0,
                started_today: 0,
                average_score: 0.0,
                percentile: 100.0,
            };
        }

        let total: u32 = sessions.values().map(|s| s.score).sum();
        let below = sessions.values().filter(|s| s.score < score).count();

        AggregateStats {
            active_sessions,
            started_today,
            average_score: f64::from(total) / active_sessions as f64,
            percentile: below as f64 / active_sessions as f64 * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Answer;

    fn session_with_score(chat_id: i64, score: u32) -> Session {
        let mut session = Session::new(chat_id, "user");
        for _ in 0..score / 2 {
            session.record_answer("q", Answer::Nobody);
        }
        if score % 2 == 1 {
            session.record_answer("q", Answer::Contacts);
        }
        session
    }

    #[tokio::test]
    async fn insert_returns_displaced_session() {
        let store = SessionStore::new();
        let mut first = Session::new(1, "Alice");
        first.record_answer("phone", Answer::Nobody);
        assert!(store.insert(first).await.is_none());

        let displaced = store.insert(Session::new(1, "Alice")).await.unwrap();
        assert_eq!(displaced.answers.len(), 1);

        // The fresh session replaced it entirely.
        let answers = store.with_session(1, |s| s.answers.len()).await.unwrap();
        assert_eq!(answers, 0);
    }

    #[tokio::test]
    async fn remove_empties_the_store() {
        let store = SessionStore::new();
        store.insert(Session::new(1, "Alice")).await;
        assert!(store.contains(1).await);

        let removed = store.remove(1).await;
        assert!(removed.is_some());
        assert!(!store.contains(1).await);
        assert!(store.remove(1).await.is_none());
    }

    #[tokio::test]
    async fn with_session_misses_unknown_chats() {
        let store = SessionStore::new();
        assert_eq!(store.with_session(99, |_| ()).await, None);
    }

    // ── Aggregate stats ─────────────────────────────────────────────

    #[tokio::test]
    async fn empty_store_defaults() {
        let store = SessionStore::new();
        let stats = store.stats_for(7).await;
        assert_eq!(stats.active_sessions, 0);
        assert_eq!(stats.started_today, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.percentile, 100.0);
    }

    #[tokio::test]
    async fn average_is_the_arithmetic_mean() {
        let store = SessionStore::new();
        store.insert(session_with_score(1, 10)).await;
        store.insert(session_with_score(2, 4)).await;
        store.insert(session_with_score(3, 1)).await;

        let stats = store.stats_for(0).await;
        assert_eq!(stats.active_sessions, 3);
        assert!((stats.average_score - 5.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn percentile_counts_strictly_lower_scores() {
        let store = SessionStore::new();
        store.insert(session_with_score(1, 2)).await;
        store.insert(session_with_score(2, 4)).await;
        store.insert(session_with_score(3, 4)).await;
        store.insert(session_with_score(4, 8)).await;

        // Ties don't count: only the score-2 session is below 4.
        let stats = store.stats_for(4).await;
        assert!((stats.percentile - 25.0).abs() < f64::EPSILON);

        // Nobody is below the minimum.
        assert_eq!(store.stats_for(0).await.percentile, 0.0);
        // Everybody is below a score above the maximum.
        assert_eq!(store.stats_for(9).await.percentile, 100.0);
    }

    #[tokio::test]
    async fn sessions_started_now_count_toward_today() {
        let store = SessionStore::new();
        store.insert(Session::new(1, "Alice")).await;
        store.insert(Session::new(2, "Bob")).await;

        let stats = store.stats_for(0).await;
        assert_eq!(stats.started_today, 2);
    }
}
