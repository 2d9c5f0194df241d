//! Interview state embedded in the session metadata.
//!
//! The state is a value: every transition consumes the old state and
//! returns a new one, and the service serializes it back into
//! `metadata["onboarding"]`. Field names in the stored document are
//! camelCase for compatibility with the session document format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::concerns::ConcernKey;

/// Onboarding interview state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnboardingState {
    /// Cursor into the dynamically computed step list. Never decreases,
    /// never exceeds the current list length.
    pub step: usize,
    pub awaiting_answer: bool,
    /// Normalized answers keyed by field storage key. `concern` holds a
    /// list; follow-ups are namespaced `concern|<key>|<questionId>`.
    pub responses: BTreeMap<String, Value>,
    pub complete: bool,
    /// Previous accepted answer and its field, for tone selection.
    pub last_answer: Option<String>,
    pub last_field: Option<String>,

    // Transient sub-dialog flags.
    pub awaiting_registration_confirmation: bool,
    pub awaiting_previous_concern_response: bool,
    pub previous_concern_resolved: Option<bool>,
    pub recommendations_shown: bool,
    pub recommended_product_titles: Vec<String>,
}

impl OnboardingState {
    /// Read the state out of a session metadata map, or start fresh.
    pub fn from_metadata(metadata: &BTreeMap<String, Value>) -> Self {
        metadata
            .get("onboarding")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Serialize the state into its metadata sub-document.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Normalized string answer for a field key, if present.
    pub fn answer_str(&self, key: &str) -> Option<&str> {
        self.responses.get(key).and_then(Value::as_str)
    }

    /// Selected concerns, in selection order.
    pub fn concerns(&self) -> Vec<ConcernKey> {
        self.responses
            .get("concern")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| s.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First-listed (primary) concern.
    pub fn top_concern(&self) -> Option<ConcernKey> {
        self.concerns().first().copied()
    }

    /// Whether the interview targets a family member rather than the
    /// respondent.
    pub fn is_for_family_member(&self) -> bool {
        self.answer_str("filling_for") == Some("family_member")
    }

    /// Name used when personalizing prompts: the family relation when the
    /// interview is for someone else.
    pub fn subject_name(&self) -> Option<&str> {
        if self.is_for_family_member() {
            self.answer_str("relation")
        } else {
            None
        }
    }
}
