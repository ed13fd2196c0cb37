//! Interview engine and repository trait definitions for Mockloop.
//!
//! This crate defines the "ports" (repository, session cache, generation
//! backend, clock) that the infrastructure layer implements, and the
//! session orchestrator built on top of them. It depends only on
//! `mockloop-types` -- never on `mockloop-infra` or any database/IO crate.

pub mod cache;
pub mod clock;
pub mod hash;
pub mod interview;
pub mod llm;
pub mod repository;
