//! Occurrence time engine.
//!
//! # Responsibility
//! - Turn a weekly `RecurrenceDescriptor` into concrete UTC instants.
//!
//! # Invariants
//! - All functions are pure; `now` is always passed in by the caller.

pub mod occurrence;
