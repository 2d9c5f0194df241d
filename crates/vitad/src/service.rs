//! Chat service wiring the orchestrator, recommender and LLM together
//! over the storage seams.
//!
//! The service owns turn handling: sanitize the message, advance the
//! interview while it is active, produce the recommendation on
//! completion, then fall through to free-form LLM chat. Store writes
//! after the reply is decided are logged on failure, never fatal.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use vita_common::{
    doc_to_product, input, ChatMessage, EngineConfig, LlmClient, Result, Session, UsageInfo,
};

use crate::continuity;
use crate::onboarding::{
    NextAction, OnboardingState, Orchestrator, QuestionOption, QuestionType, Transition,
};
use crate::recommend::explain::{self, EscalationNotes};
use crate::recommend::Recommender;
use crate::store::{CatalogSearch, SessionStore};

const SYSTEM_PROMPT: &str =
    "You are Vita, a friendly supplement advisor. You already interviewed the user; \
     their answers and the recommended products are provided as context. Answer \
     follow-up questions helpfully, stay within supplement advice, and remind users \
     to consult a healthcare provider for medical questions.";

const APOLOGY: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

/// One reply to the user, plus the flags the frontend needs.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    /// `None` on silent terminal turns.
    pub content: Option<String>,
    pub options: Option<Vec<QuestionOption>>,
    pub question_type: Option<QuestionType>,
    pub completed: bool,
    pub terminal: bool,
    pub redirect_url: Option<String>,
}

impl ChatReply {
    fn from_action(action: NextAction) -> Self {
        Self {
            content: action.text,
            options: action.options,
            question_type: action.question_type,
            completed: action.completed,
            terminal: action.terminal,
            redirect_url: action.redirect_url,
        }
    }
}

pub struct ChatService {
    store: Arc<dyn SessionStore>,
    catalog: Arc<dyn CatalogSearch>,
    llm: Arc<dyn LlmClient>,
    orchestrator: Orchestrator,
    recommender: Recommender,
    config: EngineConfig,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<dyn CatalogSearch>,
        llm: Arc<dyn LlmClient>,
        config: EngineConfig,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(config.registration_url.clone()),
            recommender: Recommender::new(config.recommendation.clone()),
            store,
            catalog,
            llm,
            config,
        }
    }

    /// Create a session, optionally bound to a known user.
    pub async fn create_session(&self, user_id: Option<&str>) -> Result<Session> {
        let user_id = match user_id {
            Some(raw) => Some(input::validate_user_id(raw)?),
            None => None,
        };
        let session = Session::new(user_id);
        self.store.create(session.clone()).await?;
        Ok(session)
    }

    /// Initialize the interview and return its first prompt.
    pub async fn first_question(&self, session_id: &str) -> Result<ChatReply> {
        let session_id = input::validate_session_id(session_id)?;
        let session = self.store.get(&session_id).await?;

        let prior = match &session.user_id {
            Some(user_id) => continuity::prior_attributes(self.store.as_ref(), user_id).await?,
            None => Default::default(),
        };
        let returning = !prior.is_empty();
        let transition = self.orchestrator.first_question(prior, returning);

        self.persist_state(&session_id, &transition.state).await;
        if let Some(text) = &transition.action.text {
            self.append(&session_id, &[ChatMessage::assistant(text)]).await;
        }
        Ok(ChatReply::from_action(transition.action))
    }

    /// Handle one user message.
    pub async fn handle_message(&self, session_id: &str, raw: &str) -> Result<ChatReply> {
        let session_id = input::validate_session_id(session_id)?;
        let message = input::sanitize_message(raw)?;
        let session = self.store.get(&session_id).await?;
        let state = OnboardingState::from_metadata(&session.metadata);

        // The reply must not depend on this write succeeding.
        self.append(&session_id, &[ChatMessage::user(&message)])
            .await;

        let interviewing = !state.complete
            || state.awaiting_registration_confirmation
            || state.awaiting_previous_concern_response;
        if interviewing {
            let returning = self.is_returning(&session).await;
            let transition = self.orchestrator.answer(state, &message, returning);
            return self.after_transition(&session, transition).await;
        }

        self.freeform_reply(&session, &state, &message).await
    }

    /// Re-render the pending question without advancing state.
    pub async fn current_question(&self, session_id: &str) -> Result<ChatReply> {
        let session_id = input::validate_session_id(session_id)?;
        let session = self.store.get(&session_id).await?;
        let state = OnboardingState::from_metadata(&session.metadata);
        let returning = self.is_returning(&session).await;

        match self.orchestrator.current_question(&state, returning) {
            Some(action) => Ok(ChatReply::from_action(action)),
            None => Ok(ChatReply {
                completed: state.complete,
                ..ChatReply::default()
            }),
        }
    }

    /// Short display name for a session, with a deterministic fallback
    /// when the LLM is unavailable.
    pub async fn generate_session_name(&self, concern_label: &str) -> String {
        let prompt = format!(
            "Suggest a short title, five words at most, for a supplement advice \
             conversation about {concern_label}. Reply with the title only."
        );
        match self
            .llm
            .generate_reply("You name chat sessions.", &[], &prompt, None, &[])
            .await
        {
            Ok((text, _)) => {
                let name = text.trim().trim_matches('"').trim().to_string();
                if name.is_empty() {
                    fallback_session_name(concern_label)
                } else {
                    name
                }
            }
            Err(err) => {
                warn!(error = %err, "session name generation failed");
                fallback_session_name(concern_label)
            }
        }
    }

    async fn after_transition(
        &self,
        session: &Session,
        transition: Transition,
    ) -> Result<ChatReply> {
        let Transition { state, action } = transition;

        if action.completed && !state.recommendations_shown {
            // A returning user reporting the same top concern gets the
            // check-in question before any recommendation. A terminal
            // turn skips it and stays silent.
            if !action.terminal
                && state.previous_concern_resolved.is_none()
                && !state.awaiting_previous_concern_response
            {
                if let (Some(user_id), Some(top)) = (&session.user_id, state.top_concern()) {
                    let same = continuity::same_top_concern(
                        self.store.as_ref(),
                        user_id,
                        &session.id,
                        top,
                    )
                    .await
                    .unwrap_or(false);
                    if same {
                        let followup = self.orchestrator.previous_concern_question(state, top);
                        self.persist_state(&session.id, &followup.state).await;
                        if let Some(text) = &followup.action.text {
                            self.append(&session.id, &[ChatMessage::assistant(text)])
                                .await;
                        }
                        return Ok(ChatReply::from_action(followup.action));
                    }
                }
            }
            return self.deliver_recommendation(session, state, action.terminal).await;
        }

        self.persist_state(&session.id, &state).await;
        if let Some(text) = &action.text {
            self.append(&session.id, &[ChatMessage::assistant(text)]).await;
        }
        Ok(ChatReply::from_action(action))
    }

    async fn deliver_recommendation(
        &self,
        session: &Session,
        mut state: OnboardingState,
        terminal: bool,
    ) -> Result<ChatReply> {
        let unresolved = state.previous_concern_resolved == Some(false);
        let mut exclude = Vec::new();
        if unresolved {
            if let Some(user_id) = &session.user_id {
                if let Ok(Some(prior)) = continuity::prior_concerns_and_products(
                    self.store.as_ref(),
                    user_id,
                    &session.id,
                )
                .await
                {
                    exclude = prior.product_titles;
                }
            }
        }

        let recommendation = self
            .recommender
            .recommend(
                self.catalog.as_ref(),
                None,
                &state.responses,
                &exclude,
                None,
            )
            .await?;
        let notes = EscalationNotes {
            previous_concern_unresolved: unresolved,
        };
        let text = explain::build_message(&recommendation, &state.responses, notes);

        state.recommendations_shown = true;
        state.recommended_product_titles = recommendation.titles();
        self.persist_state(&session.id, &state).await;
        self.append(&session.id, &[ChatMessage::assistant(&text)])
            .await;

        info!(
            session_id = %session.id,
            products = recommendation.products.len(),
            terminal,
            "recommendation delivered"
        );
        Ok(ChatReply {
            // The recommendation lives in the transcript only; callers
            // fetch it from there rather than from the chat reply.
            content: None,
            completed: true,
            terminal,
            ..ChatReply::default()
        })
    }

    async fn freeform_reply(
        &self,
        session: &Session,
        state: &OnboardingState,
        message: &str,
    ) -> Result<ChatReply> {
        let products = self.product_snippets(state).await;
        let context = serde_json::to_value(&state.responses).unwrap_or(Value::Null);

        let keep = self.config.max_history_turns * 2;
        let start = session.messages.len().saturating_sub(keep);
        let history = &session.messages[start..];

        let content = match self
            .llm
            .generate_reply(SYSTEM_PROMPT, history, message, Some(&context), &products)
            .await
        {
            Ok((text, usage)) => {
                self.record_usage(session, usage).await;
                text
            }
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "llm reply failed");
                APOLOGY.to_string()
            }
        };

        self.append(&session.id, &[ChatMessage::assistant(&content)])
            .await;
        Ok(ChatReply {
            content: Some(content),
            completed: true,
            ..ChatReply::default()
        })
    }

    /// Catalog snippets for the products this session was recommended.
    async fn product_snippets(&self, state: &OnboardingState) -> Vec<String> {
        let mut snippets = Vec::new();
        for title in &state.recommended_product_titles {
            match self.catalog.find_by_title(title).await {
                Ok(Some(doc)) => snippets.push(doc_to_product(&doc).to_prompt_snippet()),
                Ok(None) => {}
                Err(err) => warn!(title, error = %err, "catalog lookup failed"),
            }
        }
        snippets
    }

    async fn is_returning(&self, session: &Session) -> bool {
        match &session.user_id {
            Some(user_id) => continuity::prior_attributes(self.store.as_ref(), user_id)
                .await
                .map(|attrs| !attrs.is_empty())
                .unwrap_or(false),
            None => false,
        }
    }

    async fn record_usage(&self, session: &Session, usage: UsageInfo) {
        let mut totals = session
            .metadata
            .get("token_usage")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let add = |totals: &mut Value, key: &str, amount: f64| {
            let current = totals.get(key).and_then(Value::as_f64).unwrap_or(0.0);
            totals[key] = json!(current + amount);
        };
        add(&mut totals, "input_tokens", usage.input_tokens as f64);
        add(&mut totals, "output_tokens", usage.output_tokens as f64);
        add(&mut totals, "total_tokens", usage.total_tokens as f64);
        add(&mut totals, "cost", usage.cost);
        totals["model"] = json!(usage.model);

        if let Err(err) = self
            .store
            .update_metadata(&session.id, "token_usage", totals)
            .await
        {
            warn!(session_id = %session.id, error = %err, "token usage write failed");
        }
    }

    async fn persist_state(&self, session_id: &str, state: &OnboardingState) {
        if let Err(err) = self
            .store
            .update_metadata(session_id, "onboarding", state.to_value())
            .await
        {
            warn!(session_id, error = %err, "state write failed");
        }
    }

    async fn append(&self, session_id: &str, messages: &[ChatMessage]) {
        if let Err(err) = self.store.append_messages(session_id, messages).await {
            warn!(session_id, error = %err, "message append failed");
        }
    }
}

fn fallback_session_name(concern_label: &str) -> String {
    format!("Supplement advice: {concern_label}")
}
