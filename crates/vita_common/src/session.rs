//! Chat session and message types.
//!
//! The persistence collaborator owns the stored document format; these are
//! the in-memory shapes the engine reads and writes. The engine treats
//! `metadata["onboarding"]` as its exclusive sub-document and
//! `metadata["token_usage"]` as its usage ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message within a session.
///
/// `content` is `None` for the medical-treatment terminal turn, where a
/// recommendation is persisted but no chat text is returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            created_at: Utc::now(),
        }
    }

    /// Assistant turn with no visible text.
    pub fn assistant_silent() -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            created_at: Utc::now(),
        }
    }
}

/// A chat session as seen by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Fresh unsaved session with a new 32-char hex id.
    pub fn new(user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            messages: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The engine's onboarding sub-document, if any.
    pub fn onboarding_value(&self) -> Option<&Value> {
        self.metadata.get("onboarding")
    }

    /// Last assistant message with visible content, newest first.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .find_map(|m| m.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_hex_id() {
        let session = Session::new(None);
        assert_eq!(session.id.len(), 32);
        assert!(session.id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn last_assistant_text_skips_silent_turns() {
        let mut session = Session::new(None);
        session.messages.push(ChatMessage::assistant("first"));
        session.messages.push(ChatMessage::user("hi"));
        session.messages.push(ChatMessage::assistant_silent());
        assert_eq!(session.last_assistant_text(), Some("first"));
    }
}
