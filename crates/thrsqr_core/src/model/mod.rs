//! Domain model for recurring events and their response ledger.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep recurrence validation next to the descriptor it guards.
//!
//! # Invariants
//! - Every event and participant is identified by a stable opaque id.
//! - Occurrences are never stored; they are derived from `RecurrenceDescriptor`.

pub mod event;
pub mod recurrence;
pub mod response;
