//! Shared domain types for Mockloop.
//!
//! This crate contains the core domain types used across the interview engine:
//! Interview, Question, InterviewQuestion, Answer, the cached session projection,
//! engine configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod interview;
pub mod llm;
pub mod session;
