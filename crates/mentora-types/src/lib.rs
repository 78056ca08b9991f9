//! Shared domain types for Mentora.
//!
//! This crate contains the core domain types used across the Mentora
//! tutoring backend: AI completion shapes, conversations, chat-adapter
//! boundary types, analytics events, and configuration.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod ai;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
