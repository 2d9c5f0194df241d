//! Dialog orchestrator for the onboarding interview.
//!
//! The orchestrator is pure: it never touches the session store or the
//! LLM. Every turn recomputes the step list from the accumulated
//! responses, validates the incoming answer against the field the
//! cursor points at, and returns a new state plus the next action for
//! the service to present. Branching (gender, eating habits, alcohol,
//! selected concerns) falls out of the recomputed list rather than
//! explicit jump logic.

pub mod fields;
pub mod personalize;
pub mod state;
pub mod tone;
pub mod validate;

pub use fields::{
    compute_steps, first_unanswered, Field, FixedField, QuestionOption, QuestionType,
};
pub use state::OnboardingState;

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::concerns::{ConcernKey, ConcernTaxonomy};

/// What the service should present to the user after a transition.
#[derive(Debug, Clone, Default)]
pub struct NextAction {
    /// Assistant text to show. `None` on silent terminal turns.
    pub text: Option<String>,
    /// Selectable choices accompanying the question, when enumerated.
    pub options: Option<Vec<QuestionOption>>,
    pub question_type: Option<QuestionType>,
    /// The conversation should not continue after this turn.
    pub terminal: bool,
    /// Hand the user off to the registration flow.
    pub redirect_url: Option<String>,
    /// The interview finished this turn; the service should produce a
    /// recommendation.
    pub completed: bool,
}

/// Result of feeding one user answer through the orchestrator.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: OnboardingState,
    pub action: NextAction,
}

/// Pure interview state machine.
pub struct Orchestrator {
    taxonomy: ConcernTaxonomy,
    registration_url: String,
}

const REGISTRATION_QUESTION: &str =
    "Since this is for someone else: would they prefer to sign up and \
     answer for themselves? I can send a registration link.";

impl Orchestrator {
    pub fn new(registration_url: impl Into<String>) -> Self {
        Self {
            taxonomy: ConcernTaxonomy::standard(),
            registration_url: registration_url.into(),
        }
    }

    pub fn taxonomy(&self) -> &ConcernTaxonomy {
        &self.taxonomy
    }

    /// Start (or restart) an interview. `prior` carries attributes from
    /// earlier sessions; pre-filled fields are skipped automatically
    /// because the cursor lands on the first unanswered one.
    pub fn first_question(
        &self,
        prior: BTreeMap<String, Value>,
        returning_user: bool,
    ) -> Transition {
        let mut state = OnboardingState {
            responses: prior,
            awaiting_answer: true,
            ..OnboardingState::default()
        };
        let steps = compute_steps(&self.taxonomy, &state.responses, returning_user);
        let cursor = first_unanswered(&steps, &state.responses);
        state.step = cursor;
        match steps.get(cursor).copied() {
            Some(field) => {
                let action = self.ask(&state, field, None);
                Transition { state, action }
            }
            None => self.finish(state),
        }
    }

    /// Re-render the question the interview is currently waiting on.
    pub fn current_question(
        &self,
        state: &OnboardingState,
        returning_user: bool,
    ) -> Option<NextAction> {
        if state.awaiting_previous_concern_response {
            return state
                .top_concern()
                .map(|concern| self.yes_no_action(check_in_text(concern)));
        }
        if state.complete || !state.awaiting_answer {
            return None;
        }
        if state.awaiting_registration_confirmation {
            return Some(self.yes_no_action(REGISTRATION_QUESTION.to_string()));
        }
        let steps = compute_steps(&self.taxonomy, &state.responses, returning_user);
        let cursor = first_unanswered(&steps, &state.responses);
        steps.get(cursor).map(|field| self.ask(state, *field, None))
    }

    /// The post-completion check-in asked when a returning user reports
    /// the same top concern as last time.
    pub fn previous_concern_question(
        &self,
        mut state: OnboardingState,
        concern: ConcernKey,
    ) -> Transition {
        state.awaiting_previous_concern_response = true;
        state.awaiting_answer = true;
        let action = self.yes_no_action(check_in_text(concern));
        Transition { state, action }
    }

    /// Feed one user answer through the state machine.
    pub fn answer(
        &self,
        mut state: OnboardingState,
        raw: &str,
        returning_user: bool,
    ) -> Transition {
        if state.awaiting_registration_confirmation {
            return self.answer_registration(state, raw, returning_user);
        }
        if state.awaiting_previous_concern_response {
            return self.answer_previous_concern(state, raw);
        }
        if state.complete {
            // Post-interview turns are free-form chat; nothing to advance.
            return Transition {
                state,
                action: NextAction {
                    completed: true,
                    ..NextAction::default()
                },
            };
        }

        let steps = compute_steps(&self.taxonomy, &state.responses, returning_user);
        let cursor = first_unanswered(&steps, &state.responses);
        let Some(field) = steps.get(cursor).copied() else {
            return self.finish(state);
        };

        let value = match validate::normalize_answer(field, raw, &self.taxonomy) {
            Ok(value) => value,
            Err(message) => {
                debug!(field = %field.storage_key(), "answer rejected");
                let mut action = self.ask(&state, field, None);
                action.text = Some(message);
                return Transition { state, action };
            }
        };

        state.responses.insert(field.storage_key(), value.clone());
        state.last_answer = Some(raw.trim().to_string());
        state.last_field = Some(field.storage_key());

        if field == Field::Fixed(FixedField::FillingFor)
            && value.as_str() == Some("family_member")
        {
            state.awaiting_registration_confirmation = true;
            let action = self.yes_no_action(REGISTRATION_QUESTION.to_string());
            return Transition { state, action };
        }

        if field == Field::Fixed(FixedField::MedicalTreatment) {
            let under_treatment = value.as_str() == Some("yes");
            return self.finish_with_treatment(state, under_treatment);
        }

        self.advance(state, returning_user)
    }

    /// Move the cursor to the next unanswered field and ask it, or
    /// finish if none remain.
    fn advance(&self, mut state: OnboardingState, returning_user: bool) -> Transition {
        let steps = compute_steps(&self.taxonomy, &state.responses, returning_user);
        let cursor = first_unanswered(&steps, &state.responses);
        let Some(field) = steps.get(cursor).copied() else {
            return self.finish(state);
        };
        state.step = cursor;
        state.awaiting_answer = true;
        let ack = state
            .last_answer
            .as_deref()
            .and_then(|answer| tone::acknowledgment(answer, cursor));
        let action = self.ask(&state, field, ack);
        Transition { state, action }
    }

    fn answer_registration(
        &self,
        mut state: OnboardingState,
        raw: &str,
        returning_user: bool,
    ) -> Transition {
        match parse_yes_no(raw) {
            Some(true) => {
                state.awaiting_registration_confirmation = false;
                state.awaiting_answer = false;
                let action = NextAction {
                    text: Some(format!(
                        "Great, here is the registration link: {}. Once they have \
                         signed up I'm happy to help them directly.",
                        self.registration_url
                    )),
                    terminal: true,
                    redirect_url: Some(self.registration_url.clone()),
                    ..NextAction::default()
                };
                Transition { state, action }
            }
            Some(false) => {
                state.awaiting_registration_confirmation = false;
                self.advance(state, returning_user)
            }
            None => {
                let action = self.yes_no_action(
                    "A simple yes or no works best here. Would they prefer to \
                     sign up themselves?"
                        .to_string(),
                );
                Transition { state, action }
            }
        }
    }

    fn answer_previous_concern(&self, mut state: OnboardingState, raw: &str) -> Transition {
        match parse_yes_no(raw) {
            Some(resolved) => {
                state.awaiting_previous_concern_response = false;
                state.awaiting_answer = false;
                state.previous_concern_resolved = Some(resolved);
                Transition {
                    state,
                    action: NextAction {
                        completed: true,
                        ..NextAction::default()
                    },
                }
            }
            None => {
                let action =
                    self.yes_no_action("Just a yes or no: has it improved?".to_string());
                Transition { state, action }
            }
        }
    }

    fn finish(&self, state: OnboardingState) -> Transition {
        self.finish_with_treatment(state, false)
    }

    fn finish_with_treatment(
        &self,
        mut state: OnboardingState,
        under_treatment: bool,
    ) -> Transition {
        state.complete = true;
        state.awaiting_answer = false;
        debug!(responses = state.responses.len(), "interview complete");
        let action = NextAction {
            completed: true,
            terminal: under_treatment,
            ..NextAction::default()
        };
        Transition { state, action }
    }

    fn ask(&self, state: &OnboardingState, field: Field, ack: Option<&str>) -> NextAction {
        let spec = field.spec();
        let mut text = spec.prompt.to_string();
        if let Some(relation) = state.subject_name() {
            text = personalize::personalize(&text, &subject_phrase(relation));
        }
        if let Some(ack) = ack {
            text = format!("{ack} {text}");
        }
        NextAction {
            text: Some(text),
            options: field.question_options(),
            question_type: Some(spec.question_type),
            ..NextAction::default()
        }
    }

    fn yes_no_action(&self, text: String) -> NextAction {
        NextAction {
            text: Some(text),
            options: Some(vec![
                QuestionOption::from_value("yes"),
                QuestionOption::from_value("no"),
            ]),
            question_type: Some(QuestionType::YesNo),
            ..NextAction::default()
        }
    }
}

/// Turn a stated relation ("my mother", "mother") into the phrase the
/// assistant uses when talking to the respondent ("your mother").
fn check_in_text(concern: ConcernKey) -> String {
    format!(
        "Last time we spoke about {}. Has that improved since then?",
        concern.label().to_lowercase()
    )
}

fn subject_phrase(relation: &str) -> String {
    let trimmed = relation.trim();
    let lowered = trimmed.to_lowercase();
    if let Some(rest) = lowered.strip_prefix("my ") {
        format!("your {rest}")
    } else if lowered.starts_with("your ") {
        lowered
    } else {
        format!("your {lowered}")
    }
}

fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "yeah" | "yep" | "sure" => Some(true),
        "no" | "n" | "nope" | "not really" => Some(false),
        _ => None,
    }
}
