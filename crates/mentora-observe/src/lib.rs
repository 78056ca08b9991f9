//! Observability setup for Mentora.

pub mod tracing_setup;
