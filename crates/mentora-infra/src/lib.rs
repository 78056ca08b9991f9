//! Infrastructure implementations for Mentora.
//!
//! Concrete implementations of the ports defined in `mentora-core`:
//! the five AI vendor adapters, the SQLite conversation store and event
//! logger, and the configuration loader.

pub mod ai;
pub mod config;
pub mod sqlite;
