//! Generation backend abstractions for Mockloop.
//!
//! - `LlmProvider`: RPITIT trait for concrete backend implementations
//! - `BoxLlmProvider`: type-erased provider with deadline-bounded calls
//! - `ProviderRegistry`: provider name -> constructor, validated at startup
//! - `ScriptedProvider`: deterministic canned-response backend

pub mod box_provider;
pub mod provider;
pub mod registry;
pub mod scripted;
