//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory store backs unit tests and throwaway sessions. Durable
//! backends (SQLite) live in separate crates.

pub mod memory_kv;
