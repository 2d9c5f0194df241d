//! Persistence seams for sessions and the product catalog.
//!
//! The engine only talks to storage through these traits; the in-memory
//! implementations back the test suite and single-process deployments.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

use vita_common::{
    doc_search_text, doc_title, ChatMessage, Result, Session, VitaError,
};

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> Result<()>;
    async fn get(&self, session_id: &str) -> Result<Session>;
    /// All sessions for a user, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>>;
    async fn append_messages(&self, session_id: &str, messages: &[ChatMessage]) -> Result<()>;
    async fn update_metadata(&self, session_id: &str, key: &str, value: Value) -> Result<()>;
}

/// Product catalog search. Documents are the raw catalog records; the
/// recommender scores and converts them itself.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Candidate documents matching any of the message terms or health
    /// goals. With no criteria at all, returns an arbitrary slice of
    /// the catalog up to `limit`. When `include_titles` is given, only
    /// those products are considered.
    async fn search(
        &self,
        message_terms: &[String],
        health_goals: &[String],
        limit: usize,
        include_titles: Option<&[String]>,
    ) -> Result<Vec<Value>>;

    async fn find_by_title(&self, title: &str) -> Result<Option<Value>>;
}

/// In-memory session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<BTreeMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        debug!(session_id = %session.id, "session created");
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Session> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| VitaError::SessionNotFound(session_id.to_string()))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        let mut found: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found)
    }

    async fn append_messages(&self, session_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| VitaError::SessionNotFound(session_id.to_string()))?;
        session.messages.extend_from_slice(messages);
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn update_metadata(&self, session_id: &str, key: &str, value: Value) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| VitaError::SessionNotFound(session_id.to_string()))?;
        session.metadata.insert(key.to_string(), value);
        session.updated_at = chrono::Utc::now();
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> VitaError {
    VitaError::Store("session store lock poisoned".to_string())
}

/// In-memory catalog over a fixed set of documents.
pub struct InMemoryCatalog {
    docs: Vec<Value>,
}

impl InMemoryCatalog {
    pub fn new(docs: Vec<Value>) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl CatalogSearch for InMemoryCatalog {
    async fn search(
        &self,
        message_terms: &[String],
        health_goals: &[String],
        limit: usize,
        include_titles: Option<&[String]>,
    ) -> Result<Vec<Value>> {
        let goals_lower: Vec<String> = health_goals.iter().map(|g| g.to_lowercase()).collect();
        let matches = self
            .docs
            .iter()
            .filter(|doc| {
                if let Some(titles) = include_titles {
                    return titles.iter().any(|t| *t == doc_title(doc));
                }
                if message_terms.is_empty() && goals_lower.is_empty() {
                    return true;
                }
                let text = doc_search_text(doc).to_lowercase();
                goals_lower.iter().any(|g| text.contains(g.as_str()))
                    || message_terms.iter().any(|t| text.contains(t.as_str()))
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Value>> {
        Ok(self.docs.iter().find(|doc| doc_title(doc) == title).cloned())
    }
}
