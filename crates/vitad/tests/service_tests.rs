//! Chat Service Tests
//!
//! End-to-end turns through the service with fake collaborators: an
//! in-memory session store, an in-memory catalog, and a scripted LLM.
//! Covers interview persistence, recommendation delivery, silent
//! terminal turns, free-form chat degradation, and session continuity.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use vita_common::{EngineConfig, FakeLlmClient, Session};
use vitad::onboarding::OnboardingState;
use vitad::{ChatService, InMemoryCatalog, InMemorySessionStore, SessionStore};

const USER_ID: &str = "507f1f77bcf86cd799439011";

fn catalog_docs() -> Vec<Value> {
    vec![
        json!({
            "title": {"en": "Night Rest"},
            "description": {"en": "Supports sleep, rest and relaxation"},
            "benefits": ["Fall asleep faster"],
            "healthGoals": ["Sleep"],
            "status": true,
        }),
        json!({
            "title": {"en": "Magnesium Forte"},
            "description": {"en": "Magnesium for relaxation and sleep quality"},
            "benefits": ["Sleep support"],
            "healthGoals": ["Sleep"],
            "status": true,
        }),
        json!({
            "title": {"en": "Evening Herbs"},
            "description": {"en": "Herbal blend for calm and sleep"},
            "benefits": ["Calm evenings"],
            "healthGoals": ["Sleep"],
            "status": true,
        }),
    ]
}

struct Harness {
    store: Arc<InMemorySessionStore>,
    service: ChatService,
}

fn harness(llm: FakeLlmClient) -> Harness {
    let store = Arc::new(InMemorySessionStore::new());
    let service = ChatService::new(
        store.clone(),
        Arc::new(InMemoryCatalog::new(catalog_docs())),
        Arc::new(llm),
        EngineConfig::default(),
    );
    Harness { store, service }
}

const NEW_USER_ANSWERS: &[&str] = &[
    "Ada",
    "myself",
    "ada@example.com",
    "male",
    "average",
    "0",
    "34",
    "omnivore",
    "rarely",
    "rarely",
    "no",
    "sleep",
    "falling asleep",
    "6-7",
    "no",
    "no preference",
    "no",
    "open to trying",
];

/// Feed all answers, returning the reply to the final one.
async fn drive(
    service: &ChatService,
    session_id: &str,
    answers: &[&str],
) -> vitad::ChatReply {
    let mut reply = service.first_question(session_id).await.unwrap();
    for answer in answers {
        reply = service.handle_message(session_id, answer).await.unwrap();
    }
    reply
}

#[tokio::test]
async fn interview_completion_persists_recommendation_without_chat_text() {
    let h = harness(FakeLlmClient::new(vec![]));
    let session = h.service.create_session(None).await.unwrap();

    let mut answers = NEW_USER_ANSWERS.to_vec();
    answers.push("no"); // medical treatment
    let reply = drive(&h.service, &session.id, &answers).await;

    // The completed turn never carries the recommendation in-band;
    // callers read it from the transcript.
    assert!(reply.completed);
    assert!(!reply.terminal);
    assert!(reply.content.is_none(), "got: {:?}", reply.content);

    let stored = h.store.get(&session.id).await.unwrap();
    let state = OnboardingState::from_metadata(&stored.metadata);
    assert!(state.complete);
    assert!(state.recommendations_shown);
    assert!(!state.recommended_product_titles.is_empty());
    let last = stored.last_assistant_text().expect("persisted text");
    assert!(last.contains("sleep"), "got: {last}");
    assert!(last.contains("**"), "no product mentioned: {last}");
}

#[tokio::test]
async fn medical_treatment_reply_is_silent_but_persisted() {
    let h = harness(FakeLlmClient::new(vec![]));
    let session = h.service.create_session(None).await.unwrap();

    let mut answers = NEW_USER_ANSWERS.to_vec();
    answers.push("yes"); // under medical treatment
    let reply = drive(&h.service, &session.id, &answers).await;

    assert!(reply.completed);
    assert!(reply.terminal);
    assert!(reply.content.is_none());

    // The recommendation still landed in the transcript.
    let stored = h.store.get(&session.id).await.unwrap();
    let last = stored.last_assistant_text().expect("persisted text");
    assert!(last.contains("medical treatment"), "got: {last}");
}

#[tokio::test]
async fn freeform_chat_uses_the_llm_and_accounts_tokens() {
    let h = harness(FakeLlmClient::new(vec![
        "Take Night Rest half an hour before bed.",
    ]));
    let session = h.service.create_session(None).await.unwrap();

    let mut answers = NEW_USER_ANSWERS.to_vec();
    answers.push("no");
    drive(&h.service, &session.id, &answers).await;

    let reply = h
        .service
        .handle_message(&session.id, "When should I take it?")
        .await
        .unwrap();
    assert_eq!(
        reply.content.as_deref(),
        Some("Take Night Rest half an hour before bed.")
    );

    let stored = h.store.get(&session.id).await.unwrap();
    let usage = stored.metadata.get("token_usage").expect("usage recorded");
    assert_eq!(usage["total_tokens"], json!(15.0));
}

#[tokio::test]
async fn llm_outage_degrades_to_an_apology() {
    let h = harness(FakeLlmClient::failing());
    let session = h.service.create_session(None).await.unwrap();

    let mut answers = NEW_USER_ANSWERS.to_vec();
    answers.push("no");
    drive(&h.service, &session.id, &answers).await;

    let reply = h
        .service
        .handle_message(&session.id, "Anything else?")
        .await
        .unwrap();
    let content = reply.content.expect("apology text");
    assert!(content.contains("trouble responding"), "got: {content}");
}

#[tokio::test]
async fn oversized_messages_are_rejected() {
    let h = harness(FakeLlmClient::new(vec![]));
    let session = h.service.create_session(None).await.unwrap();
    h.service.first_question(&session.id).await.unwrap();

    let huge = "a".repeat(3000);
    assert!(h.service.handle_message(&session.id, &huge).await.is_err());
}

#[tokio::test]
async fn session_name_falls_back_when_llm_fails() {
    let h = harness(FakeLlmClient::failing());
    let name = h.service.generate_session_name("Sleep").await;
    assert_eq!(name, "Supplement advice: Sleep");
}

// ============================================================================
// Continuity
// ============================================================================

/// A finished earlier session for USER_ID, with stored concern and
/// recommended titles.
async fn seed_prior_session(store: &InMemorySessionStore) {
    let mut session = Session::new(Some(USER_ID.to_string()));
    let mut state = OnboardingState::default();
    state.complete = true;
    for (key, value) in [
        ("name", json!("Ada")),
        ("email", json!("ada@example.com")),
        ("gender", json!("male")),
        ("age", json!("33")),
        ("concern", json!(["sleep"])),
    ] {
        state.responses.insert(key.to_string(), value);
    }
    state.recommendations_shown = true;
    state.recommended_product_titles = vec!["Night Rest".to_string()];
    session
        .metadata
        .insert("onboarding".to_string(), state.to_value());
    store.create(session).await.unwrap();
}

#[tokio::test]
async fn returning_user_skips_identity_questions() {
    let h = harness(FakeLlmClient::new(vec![]));
    seed_prior_session(&h.store).await;
    let session = h.service.create_session(Some(USER_ID)).await.unwrap();

    let first = h.service.first_question(&session.id).await.unwrap();
    let text = first.content.expect("question");
    assert!(
        text.to_lowercase().contains("filling this in"),
        "got: {text}"
    );

    // Age is re-asked right after, never carried over.
    let next = h.service.handle_message(&session.id, "myself").await.unwrap();
    let text = next.content.expect("question");
    assert!(text.to_lowercase().contains("old"), "got: {text}");
}

#[tokio::test]
async fn repeat_concern_asks_checkin_then_swaps_products() {
    let h = harness(FakeLlmClient::new(vec![]));
    seed_prior_session(&h.store).await;
    let session = h.service.create_session(Some(USER_ID)).await.unwrap();

    // Returning flow: identity fields are pre-filled.
    let answers = [
        "myself",
        "34",
        "omnivore",
        "rarely",
        "rarely",
        "no",
        "sleep",
        "falling asleep",
        "6-7",
        "no",
        "no preference",
        "no",
        "open to trying",
        "no", // medical treatment
    ];
    let reply = drive(&h.service, &session.id, &answers).await;

    // Same top concern as last time: check-in first, no recommendation yet.
    assert!(!reply.completed);
    let question = reply.content.expect("check-in question");
    assert!(question.contains("improved"), "got: {question}");

    let final_reply = h.service.handle_message(&session.id, "no").await.unwrap();
    assert!(final_reply.completed);
    assert!(final_reply.content.is_none());

    let stored = h.store.get(&session.id).await.unwrap();
    let last = stored.last_assistant_text().expect("persisted text");
    assert!(last.contains("doctor"), "got: {last}");
    assert!(
        !last.contains("Night Rest"),
        "previous product repeated: {last}"
    );
    let state = OnboardingState::from_metadata(&stored.metadata);
    assert_eq!(state.previous_concern_resolved, Some(false));
    assert!(!state
        .recommended_product_titles
        .contains(&"Night Rest".to_string()));
}

#[tokio::test]
async fn terminal_turn_skips_the_repeat_concern_checkin() {
    let h = harness(FakeLlmClient::new(vec![]));
    seed_prior_session(&h.store).await;
    let session = h.service.create_session(Some(USER_ID)).await.unwrap();

    let answers = [
        "myself",
        "34",
        "omnivore",
        "rarely",
        "rarely",
        "no",
        "sleep",
        "falling asleep",
        "6-7",
        "no",
        "no preference",
        "no",
        "open to trying",
        "yes", // under medical treatment
    ];
    let reply = drive(&h.service, &session.id, &answers).await;

    // No check-in question after the terminal answer; the turn stays
    // silent and the recommendation still lands in the transcript.
    assert!(reply.completed);
    assert!(reply.terminal);
    assert!(reply.content.is_none(), "got: {:?}", reply.content);

    let stored = h.store.get(&session.id).await.unwrap();
    let state = OnboardingState::from_metadata(&stored.metadata);
    assert!(!state.awaiting_previous_concern_response);
    assert!(state.recommendations_shown);
    let last = stored.last_assistant_text().expect("persisted text");
    assert!(last.contains("medical treatment"), "got: {last}");
}
