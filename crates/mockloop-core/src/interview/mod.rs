//! The interview engine: session orchestration and its building blocks.

pub mod classify;
pub mod history;
pub mod lock;
pub mod parser;
pub mod prompt;
pub mod recovery;
pub mod refresh;
pub mod service;
pub mod stream;
