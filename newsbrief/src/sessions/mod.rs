//! In-memory browser sessions.
//!
//! Each browser gets a random id cookie. Everything a visitor builds up
//! (current analysis, histories, pasted keys) lives here and disappears with
//! the process.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::research::{Credentials, ResearchResult, ResearchSettings};

/// Severity of a flash notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

/// One-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// One completed research run, for the analytics history table.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchRecord {
    pub query: String,
    pub timestamp: DateTime<Local>,
    pub article_count: usize,
}

/// Sidebar search-history entry.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHistoryEntry {
    pub query: String,
    pub timestamp: DateTime<Local>,
    pub results_count: usize,
}

/// State of one browser session.
#[derive(Debug, Clone)]
pub struct ResearchSession {
    pub current: Option<ResearchResult>,
    pub research_history: Vec<ResearchRecord>,
    pub search_history: Vec<SearchHistoryEntry>,
    pub selected_query: String,
    pub settings: ResearchSettings,
    pub credentials: Credentials,
    pub notices: Vec<Notice>,
    last_seen: DateTime<Local>,
}

impl ResearchSession {
    pub fn new(settings: ResearchSettings) -> Self {
        Self {
            current: None,
            research_history: Vec::new(),
            search_history: Vec::new(),
            selected_query: String::new(),
            settings,
            credentials: Credentials::default(),
            notices: Vec::new(),
            last_seen: Local::now(),
        }
    }

    pub fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notices.push(Notice { kind, text: text.into() });
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Store a finished run and record it in both histories, keeping at most
    /// `history_limit` records of each.
    pub fn record_result(&mut self, result: ResearchResult, history_limit: usize) {
        self.research_history.push(ResearchRecord {
            query: result.query.clone(),
            timestamp: result.timestamp,
            article_count: result.articles.len(),
        });
        let overflow = self.research_history.len().saturating_sub(history_limit);
        self.research_history.drain(..overflow);
        self.add_search_history(&result.query, result.articles.len(), history_limit);
        self.current = Some(result);
    }

    /// Put `query` at the front of the search history, replacing any entry that
    /// differs only in case, and keep at most `limit` entries.
    pub fn add_search_history(&mut self, query: &str, results_count: usize, limit: usize) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let lowered = query.to_lowercase();
        self.search_history.retain(|h| h.query.to_lowercase() != lowered);
        self.search_history.insert(
            0,
            SearchHistoryEntry {
                query: query.to_string(),
                timestamp: Local::now(),
                results_count,
            },
        );
        self.search_history.truncate(limit);
    }

    pub fn remove_search_history(&mut self, index: usize) -> Option<SearchHistoryEntry> {
        (index < self.search_history.len()).then(|| self.search_history.remove(index))
    }

    pub fn clear_search_history(&mut self) {
        self.search_history.clear();
    }

    /// Drop the current analysis and the pre-filled query.
    pub fn clear(&mut self) {
        self.current = None;
        self.selected_query.clear();
    }

    /// Most recent research runs, newest first, at most `n`.
    pub fn recent_research(&self, n: usize) -> Vec<&ResearchRecord> {
        self.research_history.iter().rev().take(n).collect()
    }
}

/// Shared map of live sessions, bounded by `max_sessions`.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, ResearchSession>>>,
    max_sessions: usize,
    defaults: ResearchSettings,
}

impl SessionStore {
    pub fn new(max_sessions: usize, defaults: ResearchSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_sessions: max_sessions.max(1),
            defaults,
        }
    }

    /// Run `f` against the session `id`, creating it if needed. Evicts the least
    /// recently used session when the store is full.
    pub async fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut ResearchSession) -> R) -> R {
        let mut sessions = self.inner.lock().await;

        if !sessions.contains_key(&id) && sessions.len() >= self.max_sessions {
            if let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_seen)
                .map(|(k, _)| *k)
            {
                tracing::debug!(session = %oldest, "evicting least recently used session");
                sessions.remove(&oldest);
            }
        }

        let session = sessions
            .entry(id)
            .or_insert_with(|| ResearchSession::new(self.defaults.clone()));
        session.last_seen = Local::now();
        f(session)
    }

    /// Snapshot of a session, if it exists.
    pub async fn get(&self, id: Uuid) -> Option<ResearchSession> {
        self.inner.lock().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ResearchSettings {
        ResearchSettings::from_config(&common::Config::default())
    }

    #[test]
    fn search_history_dedupes_case_insensitively_and_caps() {
        let mut s = ResearchSession::new(settings());
        s.add_search_history("Tesla", 3, 3);
        s.add_search_history("Apple", 5, 3);
        s.add_search_history("tesla", 7, 3);

        let queries: Vec<&str> = s.search_history.iter().map(|h| h.query.as_str()).collect();
        assert_eq!(queries, vec!["tesla", "Apple"]);
        assert_eq!(s.search_history[0].results_count, 7);

        s.add_search_history("Bitcoin", 1, 3);
        s.add_search_history("Nvidia", 1, 3);
        assert_eq!(s.search_history.len(), 3);
        assert_eq!(s.search_history[2].query, "tesla");

        s.add_search_history("   ", 0, 3);
        assert_eq!(s.search_history.len(), 3);
    }

    #[test]
    fn remove_out_of_range_is_a_no_op() {
        let mut s = ResearchSession::new(settings());
        s.add_search_history("Tesla", 3, 20);
        assert!(s.remove_search_history(4).is_none());
        assert_eq!(s.remove_search_history(0).map(|h| h.query), Some("Tesla".to_string()));
        assert!(s.search_history.is_empty());
    }

    #[test]
    fn research_history_keeps_latest_runs() {
        let mut s = ResearchSession::new(settings());
        for query in ["Tesla", "Apple", "Nvidia", "Bitcoin"] {
            let result = ResearchResult {
                query: query.to_string(),
                summary: String::new(),
                articles: vec![],
                metadata: Default::default(),
                timestamp: Local::now(),
                settings: settings(),
                warnings: vec![],
            };
            s.record_result(result, 3);
        }

        assert_eq!(s.research_history.len(), 3);
        let recent: Vec<&str> = s.recent_research(5).iter().map(|r| r.query.as_str()).collect();
        assert_eq!(recent, vec!["Bitcoin", "Nvidia", "Apple"]);
        assert_eq!(s.current.as_ref().map(|r| r.query.as_str()), Some("Bitcoin"));
    }

    #[test]
    fn notices_are_drained_once() {
        let mut s = ResearchSession::new(settings());
        s.notify(NoticeKind::Error, "boom");
        assert_eq!(s.take_notices().len(), 1);
        assert!(s.take_notices().is_empty());
    }

    #[tokio::test]
    async fn store_evicts_least_recently_used() {
        let store = SessionStore::new(2, settings());
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.with_session(a, |s| s.selected_query = "a".into()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.with_session(b, |s| s.selected_query = "b".into()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.with_session(a, |_| ()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.with_session(c, |_| ()).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get(b).await.is_none());
        assert_eq!(store.get(a).await.map(|s| s.selected_query), Some("a".to_string()));
    }
}
