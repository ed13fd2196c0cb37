//! HTTP request handlers for the REST API.

pub mod interview;
pub mod turn;
