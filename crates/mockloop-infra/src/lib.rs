//! Infrastructure layer for Mockloop.
//!
//! Contains implementations of the ports defined in `mockloop-core`:
//! SQLite record store and TTL session cache, cache backend selection,
//! SHA-256 question hashing, the OpenAI-compatible generation backend, and
//! the `config.toml` loader.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod llm;
pub mod sqlite;
