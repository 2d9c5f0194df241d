//! Vitad - onboarding dialog orchestration and product recommendation engine.
//!
//! The engine drives a branching multi-turn interview, validates and
//! normalizes free-text answers, and at interview end ranks and explains
//! product matches from the collected responses. Persistence, catalog
//! search, and LLM completion are collaborator traits; the core itself is
//! deterministic and holds no shared mutable state.

pub mod concerns;
pub mod continuity;
pub mod onboarding;
pub mod recommend;
pub mod service;
pub mod store;

pub use concerns::{ConcernKey, ConcernTaxonomy};
pub use onboarding::{
    Field, FixedField, NextAction, OnboardingState, Orchestrator, QuestionOption, QuestionType,
    Transition,
};
pub use recommend::{Recommendation, Recommender};
pub use service::{ChatReply, ChatService};
pub use store::{CatalogSearch, InMemoryCatalog, InMemorySessionStore, SessionStore};
