//! Vita Common - Shared types and schemas for the Vita chat engine
//!
//! Data model (sessions, messages, products), the error taxonomy, engine
//! configuration, input sanitizers, and the LLM client abstraction shared
//! between the engine and its callers.

pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod product;
pub mod session;

pub use config::*;
pub use error::*;
pub use llm::*;
pub use product::*;
pub use session::*;
