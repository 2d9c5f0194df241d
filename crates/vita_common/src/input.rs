//! Input validation and sanitization for transport-facing identifiers and
//! raw chat messages.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::VitaError;

const MAX_MESSAGE_LENGTH: usize = 2000;

fn session_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-f0-9]{32}$").unwrap())
}

fn user_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?i)[a-f0-9]{24}$").unwrap())
}

/// Session ids are 32-char lowercase hex (uuid4 without hyphens).
pub fn validate_session_id(session_id: &str) -> Result<String, VitaError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(VitaError::InvalidInput("Session ID cannot be empty".to_string()));
    }
    if !session_id_re().is_match(session_id) {
        return Err(VitaError::InvalidInput("Invalid session ID format".to_string()));
    }
    Ok(session_id.to_string())
}

/// User ids are 24-char hex object ids.
pub fn validate_user_id(user_id: &str) -> Result<String, VitaError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(VitaError::InvalidInput("User ID cannot be empty".to_string()));
    }
    if !user_id_re().is_match(user_id) {
        return Err(VitaError::InvalidInput(
            "Invalid user ID format. Must be a valid object id.".to_string(),
        ));
    }
    Ok(user_id.to_lowercase())
}

/// Trim, length-check, and strip control characters (keeping newlines and
/// tabs) from a raw user message.
pub fn sanitize_message(message: &str) -> Result<String, VitaError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(VitaError::InvalidInput("Message cannot be empty".to_string()));
    }
    if message.len() > MAX_MESSAGE_LENGTH {
        return Err(VitaError::InvalidInput(format!(
            "Message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    let cleaned: String = message
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    Ok(cleaned)
}
