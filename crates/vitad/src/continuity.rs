//! Cross-session continuity for returning users.
//!
//! Earlier completed interviews provide stable identity attributes and
//! the context needed for the repeat-concern check-in. Age is never
//! carried over; it is re-asked every interview.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use vita_common::Result;

use crate::concerns::ConcernKey;
use crate::onboarding::OnboardingState;
use crate::store::SessionStore;

const CARRIED_KEYS: &[&str] = &["name", "email", "gender"];

/// What a previous interview concluded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorInterview {
    pub concerns: Vec<ConcernKey>,
    pub product_titles: Vec<String>,
}

/// Identity attributes from earlier completed interviews, newest first.
/// Stops scanning once every carried key is found.
pub async fn prior_attributes(
    store: &dyn SessionStore,
    user_id: &str,
) -> Result<BTreeMap<String, Value>> {
    let mut found = BTreeMap::new();
    for session in store.list_for_user(user_id).await? {
        let state = OnboardingState::from_metadata(&session.metadata);
        if !state.complete {
            continue;
        }
        for key in CARRIED_KEYS {
            if !found.contains_key(*key) {
                if let Some(value) = state.responses.get(*key) {
                    found.insert(key.to_string(), value.clone());
                }
            }
        }
        if found.len() == CARRIED_KEYS.len() {
            break;
        }
    }
    debug!(user_id, carried = found.len(), "prior attributes resolved");
    Ok(found)
}

/// Concerns and recommended products of the most recent completed
/// interview that selected at least one concern.
pub async fn prior_concerns_and_products(
    store: &dyn SessionStore,
    user_id: &str,
    exclude_session: &str,
) -> Result<Option<PriorInterview>> {
    for session in store.list_for_user(user_id).await? {
        if session.id == exclude_session {
            continue;
        }
        let state = OnboardingState::from_metadata(&session.metadata);
        if !state.complete {
            continue;
        }
        let concerns = state.concerns();
        if concerns.is_empty() {
            continue;
        }

        let mut product_titles = state.recommended_product_titles.clone();
        if product_titles.is_empty() {
            // Older sessions only stored the recommendation text.
            if let Some(text) = session.last_assistant_text() {
                product_titles = extract_bold_titles(text);
            }
        }

        return Ok(Some(PriorInterview {
            concerns,
            product_titles,
        }));
    }
    Ok(None)
}

/// Whether the user's current top concern matches the one from their
/// most recent completed interview.
pub async fn same_top_concern(
    store: &dyn SessionStore,
    user_id: &str,
    exclude_session: &str,
    current: ConcernKey,
) -> Result<bool> {
    let prior = prior_concerns_and_products(store, user_id, exclude_session).await?;
    Ok(prior.is_some_and(|p| p.concerns.first() == Some(&current)))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap())
}

/// Product titles are emphasized in recommendation messages; pulling
/// the bold spans back out recovers them.
fn extract_bold_titles(text: &str) -> Vec<String> {
    let mut titles = Vec::new();
    for captures in bold_re().captures_iter(text) {
        let title = captures[1].trim().to_string();
        if !title.is_empty() && !titles.contains(&title) {
            titles.push(title);
        }
    }
    titles
}
