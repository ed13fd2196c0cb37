//! SQLite storage layer.
//!
//! The durable interview record and the TTL session cache, both backed by
//! SQLite with WAL mode and split read/write connection pools.

pub mod interview;
pub mod pool;
pub mod session_cache;
