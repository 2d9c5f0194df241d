//! Interview Flow Tests
//!
//! Deterministic end-to-end runs through the onboarding state machine,
//! without storage or LLM. Covers step-list recomputation, branch
//! insertion/removal, cursor monotonicity, and the sub-dialogs.

use std::collections::BTreeMap;

use serde_json::json;
use vitad::onboarding::{compute_steps, first_unanswered, Field, FixedField};
use vitad::{ConcernTaxonomy, Orchestrator, Transition};

fn orchestrator() -> Orchestrator {
    Orchestrator::new("https://vita.example/register")
}

/// Drive a fresh interview through the given answers.
fn run(orc: &Orchestrator, answers: &[&str]) -> Transition {
    let mut transition = orc.first_question(BTreeMap::new(), false);
    for answer in answers {
        transition = orc.answer(transition.state, answer, false);
    }
    transition
}

const MALE_OMNIVORE_PREFIX: &[&str] = &[
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
];

// ============================================================================
// Step list properties
// ============================================================================

#[test]
fn same_responses_always_give_same_steps() {
    let taxonomy = ConcernTaxonomy::standard();
    let mut responses = BTreeMap::new();
    responses.insert("gender".to_string(), json!("female"));
    responses.insert("eating_habits".to_string(), json!("vegan"));
    responses.insert("concern".to_string(), json!(["sleep", "stress"]));

    for _ in 0..5 {
        assert_eq!(
            compute_steps(&taxonomy, &responses, false),
            compute_steps(&taxonomy, &responses, false)
        );
    }
}

#[test]
fn cursor_never_moves_backwards() {
    let orc = orchestrator();
    let taxonomy = ConcernTaxonomy::standard();
    let mut transition = orc.first_question(BTreeMap::new(), false);
    let mut last_cursor = 0;

    let answers = [
        "Ada",
        "myself",
        "ada@example.com",
        "female",
        "beginner",
        "1-2",
        "29",
        "no",
        "vegetarian",
        "yes",
        "weekly",
        "1-2",
        "energy, skin",
    ];
    for answer in answers {
        transition = orc.answer(transition.state, answer, false);
        let steps = compute_steps(&taxonomy, &transition.state.responses, false);
        let cursor = first_unanswered(&steps, &transition.state.responses);
        assert!(cursor >= last_cursor, "cursor regressed to {cursor}");
        assert!(cursor <= steps.len());
        last_cursor = cursor;
    }
}

#[test]
fn rejected_answer_does_not_advance_the_cursor() {
    let orc = orchestrator();
    let taxonomy = ConcernTaxonomy::standard();
    let valid = run(&orc, &["Ada", "myself"]);
    let steps = compute_steps(&taxonomy, &valid.state.responses, false);
    let before = first_unanswered(&steps, &valid.state.responses);

    let rejected = orc.answer(valid.state, "definitely-not-an-email", false);
    let after = first_unanswered(&steps, &rejected.state.responses);
    assert_eq!(before, after);
    assert!(!rejected.action.completed);
}

#[test]
fn conceive_branch_only_exists_for_female_and_neutral() {
    let taxonomy = ConcernTaxonomy::standard();
    for (gender, expected) in [("male", false), ("female", true), ("neutral", true)] {
        let mut responses = BTreeMap::new();
        responses.insert("gender".to_string(), json!(gender));
        let steps = compute_steps(&taxonomy, &responses, false);
        assert_eq!(
            steps.contains(&Field::Fixed(FixedField::Conceive)),
            expected,
            "gender {gender}"
        );
    }
}

#[test]
fn conceive_no_omits_situation_and_sleep_gets_three_followups() {
    let taxonomy = ConcernTaxonomy::standard();
    let mut responses = BTreeMap::new();
    responses.insert("gender".to_string(), json!("female"));
    responses.insert("conceive".to_string(), json!("no"));
    responses.insert("concern".to_string(), json!(["sleep"]));
    let steps = compute_steps(&taxonomy, &responses, false);

    assert!(!steps.contains(&Field::Fixed(FixedField::Situation)));
    let sleep_followups = steps
        .iter()
        .filter(|f| f.storage_key().starts_with("concern|sleep|"))
        .count();
    assert_eq!(sleep_followups, 3);
}

#[test]
fn switching_to_vegan_removes_pending_meat_questions() {
    let taxonomy = ConcernTaxonomy::standard();
    let mut responses = BTreeMap::new();
    responses.insert("eating_habits".to_string(), json!("omnivore"));
    let steps = compute_steps(&taxonomy, &responses, false);
    assert!(steps.contains(&Field::Fixed(FixedField::MeatIntake)));

    responses.insert("eating_habits".to_string(), json!("vegan"));
    let steps = compute_steps(&taxonomy, &responses, false);
    assert!(!steps.contains(&Field::Fixed(FixedField::MeatIntake)));
    assert!(!steps.contains(&Field::Fixed(FixedField::FishIntake)));
}

#[test]
fn medical_treatment_is_always_the_last_step() {
    let taxonomy = ConcernTaxonomy::standard();
    for responses in [
        BTreeMap::new(),
        BTreeMap::from([
            ("gender".to_string(), json!("female")),
            ("conceive".to_string(), json!("yes")),
            ("concern".to_string(), json!(["hormones", "skin"])),
        ]),
    ] {
        let steps = compute_steps(&taxonomy, &responses, false);
        assert_eq!(
            steps.last(),
            Some(&Field::Fixed(FixedField::MedicalTreatment))
        );
    }
}

// ============================================================================
// Whole-interview runs
// ============================================================================

#[test]
fn sleep_interview_reaches_completion() {
    let orc = orchestrator();
    let mut answers = MALE_OMNIVORE_PREFIX.to_vec();
    answers.extend([
        "sleep",
        "falling asleep",
        "less than 6",
        "yes",
        "no preference",
        "no",
        "open to trying",
        "no",
    ]);
    let t = run(&orc, &answers);
    assert!(t.state.complete);
    assert!(t.action.completed);
    assert!(!t.action.terminal);
    assert_eq!(
        t.state.responses.get("concern"),
        Some(&json!(["sleep"]))
    );
    assert!(t
        .state
        .responses
        .contains_key("concern|sleep|hours"));
}

#[test]
fn multi_concern_followups_run_in_selection_order() {
    let orc = orchestrator();
    let mut answers = MALE_OMNIVORE_PREFIX.to_vec();
    answers.push("stress and sleep");
    let t = run(&orc, &answers);

    // Stress was named first, so its follow-ups come first.
    let text = t.action.text.expect("question text");
    assert!(
        text.to_lowercase().contains("stress") || text.to_lowercase().contains("tense"),
        "got: {text}"
    );
}

#[test]
fn alcohol_yes_inserts_frequency_and_amount() {
    let orc = orchestrator();
    let t = run(
        &orc,
        &[
            "Ada",
            "myself",
            "ada@example.com",
            "male",
            "expert",
            "3-5",
            "40",
            "omnivore",
            "daily",
            "never",
            "yes",
        ],
    );
    let text = t.action.text.expect("question text").to_lowercase();
    assert!(text.contains("how often"), "got: {text}");
}

// ============================================================================
// Sub-dialogs
// ============================================================================

#[test]
fn registration_redirect_ends_the_conversation() {
    let orc = orchestrator();
    let t = run(&orc, &["Ada", "family member", "yes"]);
    assert!(t.action.terminal);
    assert!(!t.state.complete);
    assert_eq!(
        t.action.redirect_url.as_deref(),
        Some("https://vita.example/register")
    );
}

#[test]
fn registration_decline_personalizes_the_rest() {
    let orc = orchestrator();
    let t = run(&orc, &["Ada", "family member", "no", "my father", "ada@example.com"]);
    // Gender question, rewritten for the father.
    let text = t.action.text.expect("question text");
    assert!(text.contains("your father"), "got: {text}");
}

#[test]
fn unclear_registration_answer_is_reasked() {
    let orc = orchestrator();
    let t = run(&orc, &["Ada", "family member", "maybe later"]);
    assert!(t.state.awaiting_registration_confirmation);
    assert!(!t.action.terminal);
}

#[test]
fn medical_treatment_yes_completes_silently() {
    let orc = orchestrator();
    let mut answers = MALE_OMNIVORE_PREFIX.to_vec();
    answers.extend([
        "energy",
        "afternoon",
        "rarely",
        "no preference",
        "no",
        "i am enthusiastic",
        "yes",
    ]);
    let t = run(&orc, &answers);
    assert!(t.state.complete);
    assert!(t.action.terminal);
    assert!(t.action.text.is_none());
}
