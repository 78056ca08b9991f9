//! Business logic and port trait definitions for Mentora.
//!
//! This crate defines the "ports" (provider, store, event logger) that the
//! infrastructure layer implements, plus the conversation engine and AI
//! router. It depends only on `mentora-types` -- never on `mentora-infra`
//! or any database/HTTP crate.

pub mod agent;
pub mod ai;
