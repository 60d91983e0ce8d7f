//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep front ends decoupled from storage details.

pub mod error;
pub mod event_service;
pub mod ledger_service;
pub mod lifecycle_service;
pub mod slug;
