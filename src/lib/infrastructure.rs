//! Adapters for external services

pub mod email;
